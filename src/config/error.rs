use std::path::PathBuf;
use thiserror::Error;

use super::Format;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("no config file found for '{names}' in '{dir}'")]
    FileNotFound { names: String, dir: PathBuf },

    #[error("no config files to load")]
    NoFiles,

    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to decode {origin}: {message}")]
    Decode { origin: String, message: String },

    #[error("failed to encode document as {format}: {message}")]
    Encode { format: Format, message: String },

    #[error("{field} is required")]
    RequiredFieldMissing { field: String },

    #[error("referenced path not found: {0}")]
    ReferenceNotFound(String),

    #[error("invalid reference path: {0}")]
    InvalidReferencePath(String),

    #[error("cannot reference non-scalar value: {0}")]
    NonScalarReference(String),

    #[error("unclosed reference (missing '}}}}')")]
    UnclosedReference,
}
