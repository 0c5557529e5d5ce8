//! Settings shared by every populate run.

use tracing::warn;

use crate::env::{self, Environment, Environments, Hints, Repository, Resolution};
use crate::Error;

/// Inputs for environment resolution and file lookup.
///
/// ## Example
///
/// ```no_run
/// use envbox::{Context, Repository};
///
/// let ctx = Context::builder()
///     .env_var("APP_ENV")
///     .repository(Repository::open("."))
///     .build();
///
/// println!("{}", ctx.resolve_environment().info());
/// ```
#[derive(Debug, Clone)]
pub struct Context {
    environment: Option<String>,
    env_var: String,
    repository: Option<Repository>,
    environments: Environments,
    case_sensitive: bool,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            environment: None,
            env_var: env::ENV_VAR.to_string(),
            repository: None,
            environments: Environments::default(),
            case_sensitive: false,
        }
    }
}

impl Context {
    pub fn builder() -> ContextBuilder {
        ContextBuilder::default()
    }

    /// Resolves the active environment from the current settings.
    pub fn resolve_environment(&self) -> Resolution {
        let hints = Hints {
            explicit: self.environment.as_deref(),
            variable: &self.env_var,
            repository: self.repository.as_ref(),
        };
        env::resolve(&self.environments, &hints)
    }

    /// Forces the environment tag, taking precedence over the variable and
    /// the git branch. `None` restores detection.
    pub fn set_environment(&mut self, tag: Option<String>) {
        self.environment = tag;
    }

    pub fn environment(&self) -> Option<&str> {
        self.environment.as_deref()
    }

    pub fn env_var(&self) -> &str {
        &self.env_var
    }

    pub fn repository(&self) -> Option<&Repository> {
        self.repository.as_ref()
    }

    pub fn environments(&self) -> &Environments {
        &self.environments
    }

    pub fn environments_mut(&mut self) -> &mut Environments {
        &mut self.environments
    }

    /// Adds a pattern to the environment with the given id.
    pub fn append_pattern(&mut self, id: &str, pattern: &str) -> Result<(), Error> {
        match self.environments.get_mut(id) {
            Some(environment) => environment.append_pattern(pattern),
            None => Err(Error::UnknownEnvironment(id.to_string())),
        }
    }

    pub fn case_sensitive(&self) -> bool {
        self.case_sensitive
    }

    pub fn set_case_sensitive(&mut self, case_sensitive: bool) {
        self.case_sensitive = case_sensitive;
    }
}

/// Builder for [`Context`].
#[derive(Debug, Default)]
#[must_use = "builders do nothing until .build() is called"]
pub struct ContextBuilder {
    context: Context,
}

impl ContextBuilder {
    /// Forces the environment tag.
    pub fn environment(mut self, tag: impl Into<String>) -> Self {
        self.context.environment = Some(tag.into());
        self
    }

    /// Name of the variable consulted for the environment tag.
    pub fn env_var(mut self, name: impl Into<String>) -> Self {
        self.context.env_var = name.into();
        self
    }

    /// Repository whose branch is used as the last hint.
    pub fn repository(mut self, repository: Repository) -> Self {
        self.context.repository = Some(repository);
        self
    }

    pub fn case_sensitive(mut self, case_sensitive: bool) -> Self {
        self.context.case_sensitive = case_sensitive;
        self
    }

    pub fn environments(mut self, environments: Environments) -> Self {
        self.context.environments = environments;
        self
    }

    /// Replaces one predefined environment, matched by id.
    ///
    /// Only the five predefined ids are accepted. An environment with any
    /// other id is dropped with a warning and the defaults stay in place.
    pub fn with_environment(mut self, environment: Environment) -> Self {
        match self.context.environments.get_mut(environment.id()) {
            Some(slot) => *slot = environment,
            None => warn!(id = environment.id(), "unknown environment id, ignoring"),
        }
        self
    }

    pub fn build(self) -> Context {
        self.context
    }
}
