use crate::config::ConfigError;
use crate::toolbox::ComponentError;
use thiserror::Error;

/// Top-level error type for the envbox library.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("toolbox root must be a struct declared with `toolbox!`, got `{0}`")]
    InvalidRoot(&'static str),

    #[error("failed to configure '{field}': {source}")]
    Component {
        field: String,
        source: ComponentError,
    },

    #[error("unknown environment '{0}'")]
    UnknownEnvironment(String),

    #[error("invalid environment pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

impl Error {
    /// Path of the field a required-field failure points at, including
    /// failures reported from inside a component.
    pub fn missing_field(&self) -> Option<&str> {
        let config = match self {
            Error::Config(err) => Some(err),
            Error::Component { source, .. } => source.downcast_ref::<ConfigError>(),
            _ => None,
        };
        match config {
            Some(ConfigError::RequiredFieldMissing { field }) => Some(field),
            _ => None,
        }
    }
}
