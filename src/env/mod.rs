//! Build environment resolution.
//!
//! The active environment is picked from a tag. The tag comes from the first of
//! these that is set: an explicit in-process override, the `BUILD_ENV`
//! variable, the current git branch. Otherwise it is `local`. The tag is
//! matched against the predefined environments in priority order (production,
//! staging, testing, development, local) and the first match wins.

mod git;

use std::fmt;
use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::info;

use crate::Error;

pub use git::Repository;

/// Default name of the variable that overrides environment detection.
pub const ENV_VAR: &str = "BUILD_ENV";

/// Tag used when nothing else names an environment.
pub const FALLBACK_TAG: &str = "local";

/// A named build environment and the patterns that select it.
///
/// Patterns are regular expressions, joined as an alternation and matched
/// anywhere in the tag, so `release/*` selects `release/1.2`.
#[derive(Debug, Clone)]
pub struct Environment {
    id: String,
    patterns: Vec<String>,
    matcher: Option<Regex>,
    compiled: bool,
}

impl Environment {
    /// Creates an environment, compiling its patterns.
    pub fn new<I, S>(id: impl Into<String>, patterns: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        let matcher = compile(&patterns)?;
        Ok(Self {
            id: id.into(),
            patterns,
            matcher,
            compiled: false,
        })
    }

    fn predefined(id: &str, patterns: &[&str]) -> Self {
        Self::new(id, patterns.iter().copied())
            .expect("predefined environment patterns are valid")
    }

    pub fn production() -> Self {
        Self::predefined("production", &["production", "master"])
    }

    pub fn staging() -> Self {
        Self::predefined("staging", &["staging", "release/*", "hotfix/*"])
    }

    pub fn testing() -> Self {
        Self::predefined("testing", &["testing", "test", "feature/*"])
    }

    pub fn development() -> Self {
        Self::predefined("development", &["development", "develop", "dev"])
    }

    pub fn local() -> Self {
        Self::predefined("local", &["local"])
    }

    /// The environment id, also used in overlay file names (`svc.<id>.yml`).
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Whether `tag` selects this environment. An environment without
    /// patterns matches nothing.
    pub fn matches(&self, tag: &str) -> bool {
        self.matcher.as_ref().is_some_and(|re| re.is_match(tag))
    }

    /// Adds a pattern and recompiles the matcher.
    ///
    /// An invalid pattern is rejected and the environment is left unchanged.
    pub fn append_pattern(&mut self, pattern: impl Into<String>) -> Result<(), Error> {
        let mut patterns = self.patterns.clone();
        patterns.push(pattern.into());
        self.set_patterns(patterns)
    }

    /// Replaces all patterns and recompiles the matcher.
    pub fn set_patterns<I, S>(&mut self, patterns: I) -> Result<(), Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        self.matcher = compile(&patterns)?;
        self.patterns = patterns;
        Ok(())
    }

    /// Whether the application runs from a compiled artifact in this
    /// environment rather than from a development build.
    pub fn runs_compiled(&self) -> bool {
        self.compiled
    }

    pub fn set_runs_compiled(&mut self, compiled: bool) {
        self.compiled = compiled;
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

impl PartialEq for Environment {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.patterns == other.patterns && self.compiled == other.compiled
    }
}

impl Eq for Environment {}

fn compile(patterns: &[String]) -> Result<Option<Regex>, Error> {
    if patterns.is_empty() {
        return Ok(None);
    }

    let alternation = format!("({})", patterns.join(")|("));
    Regex::new(&alternation)
        .map(Some)
        .map_err(|source| Error::InvalidPattern {
            pattern: alternation,
            source,
        })
}

/// The five predefined environments, in matching priority.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environments {
    pub production: Environment,
    pub staging: Environment,
    pub testing: Environment,
    pub development: Environment,
    pub local: Environment,
}

impl Default for Environments {
    fn default() -> Self {
        Self {
            production: Environment::production(),
            staging: Environment::staging(),
            testing: Environment::testing(),
            development: Environment::development(),
            local: Environment::local(),
        }
    }
}

impl Environments {
    /// Iterates the environments from most to least specific.
    pub fn iter(&self) -> impl Iterator<Item = &Environment> {
        [
            &self.production,
            &self.staging,
            &self.testing,
            &self.development,
            &self.local,
        ]
        .into_iter()
    }

    /// Returns the first environment matching `tag`, or local.
    pub fn matching(&self, tag: &str) -> &Environment {
        self.iter()
            .find(|env| env.matches(tag))
            .unwrap_or(&self.local)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Environment> {
        [
            &mut self.production,
            &mut self.staging,
            &mut self.testing,
            &mut self.development,
            &mut self.local,
        ]
        .into_iter()
        .find(|env| env.id == id)
    }
}

/// Where the environment tag came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    /// Set explicitly in process.
    Override,
    /// Read from the override variable.
    Variable,
    /// Taken from the current git branch.
    Branch,
    /// Nothing was set.
    Fallback,
}

impl fmt::Display for TagSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagSource::Override => write!(f, "override"),
            TagSource::Variable => write!(f, "variable"),
            TagSource::Branch => write!(f, "git branch"),
            TagSource::Fallback => write!(f, "fallback"),
        }
    }
}

/// Inputs consulted, in order, when resolving the environment tag.
#[derive(Debug, Clone, Copy)]
pub struct Hints<'a> {
    pub explicit: Option<&'a str>,
    pub variable: &'a str,
    pub repository: Option<&'a Repository>,
}

/// A resolved environment along with the tag that selected it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub environment: Environment,
    pub tag: String,
    pub source: TagSource,
}

impl Resolution {
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn id(&self) -> &str {
        self.environment.id()
    }

    /// Returns `<base>/<environment id>`.
    pub fn sub_path(&self, base: impl AsRef<Path>) -> PathBuf {
        base.as_ref().join(self.environment.id())
    }

    /// One-line summary of the resolution.
    pub fn info(&self) -> String {
        let artifact = if self.environment.runs_compiled() {
            ", compiled"
        } else {
            ""
        };
        format!(
            "{} - tag: '{}', inferred from {}{}",
            self.environment.id().to_uppercase(),
            self.tag,
            self.source,
            artifact
        )
    }
}

/// Resolves the active environment. Never fails.
pub fn resolve(environments: &Environments, hints: &Hints<'_>) -> Resolution {
    let (tag, source) = resolve_tag(hints);
    let environment = environments.matching(&tag).clone();
    info!(
        environment = environment.id(),
        tag = %tag,
        source = %source,
        "resolved build environment"
    );
    Resolution {
        environment,
        tag,
        source,
    }
}

fn resolve_tag(hints: &Hints<'_>) -> (String, TagSource) {
    if let Some(tag) = hints.explicit.filter(|tag| !tag.is_empty()) {
        return (tag.to_string(), TagSource::Override);
    }

    if let Ok(tag) = std::env::var(hints.variable) {
        if !tag.is_empty() {
            return (tag, TagSource::Variable);
        }
    }

    if let Some(branch) = hints.repository.and_then(Repository::branch) {
        return (branch.to_string(), TagSource::Branch);
    }

    (FALLBACK_TAG.to_string(), TagSource::Fallback)
}
