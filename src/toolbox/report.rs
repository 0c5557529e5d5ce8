use std::fmt;
use std::path::PathBuf;

/// What happened to one toolbox field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Configured from these files (possibly none).
    Loaded(Vec<PathBuf>),
    /// A namespace that was walked.
    Namespace,
    /// Skipped by an `omit` tag.
    Omitted,
    /// Already non-zero, left untouched.
    Preset,
    /// Offers no usable contract.
    NotConfigurable,
    Failed(String),
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Loaded(files) if files.is_empty() => write!(f, "loaded (no files)"),
            Outcome::Loaded(files) => {
                let files: Vec<_> = files.iter().map(|p| p.display().to_string()).collect();
                write!(f, "loaded from {}", files.join(", "))
            }
            Outcome::Namespace => write!(f, "namespace"),
            Outcome::Omitted => write!(f, "omitted"),
            Outcome::Preset => write!(f, "preset"),
            Outcome::NotConfigurable => write!(f, "not configurable"),
            Outcome::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldReport {
    /// Dotted path from the root, e.g. `storage.cache`.
    pub field: String,
    pub type_name: &'static str,
    pub outcome: Outcome,
}

/// Per-field record of one populate run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    /// Id of the environment the run resolved.
    pub environment: String,
    pub fields: Vec<FieldReport>,
}

impl Report {
    pub fn outcome(&self, field: &str) -> Option<&Outcome> {
        self.fields
            .iter()
            .find(|report| report.field == field)
            .map(|report| &report.outcome)
    }

    pub(crate) fn record(&mut self, field: String, type_name: &'static str, outcome: Outcome) {
        self.fields.push(FieldReport {
            field,
            type_name,
            outcome,
        });
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "environment: {}", self.environment)?;
        for report in &self.fields {
            writeln!(f, "{} ({}) -> {}", report.field, report.type_name, report.outcome)?;
        }
        Ok(())
    }
}
