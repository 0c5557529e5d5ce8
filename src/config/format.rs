//! Format-agnostic decoding and encoding of configuration documents.
//!
//! Documents are decoded into an insertion-ordered [`Value`] tree so that files
//! written in different formats can be layered over each other before being
//! handed to a concrete type.

use std::fmt;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ConfigError;

/// File extensions recognised when locating config files, in match preference order.
pub const EXTENSIONS: [&str; 4] = ["yaml", "yml", "toml", "json"];

/// A supported serialization format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Json,
    Yaml,
    Toml,
}

impl Format {
    /// Maps a file extension (without the dot, any case) to its format.
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Some(Format::Yaml),
            "toml" => Some(Format::Toml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    pub fn name(self) -> &'static str {
        match self {
            Format::Json => "json",
            Format::Yaml => "yaml",
            Format::Toml => "toml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Decodes `bytes` into a generic document.
///
/// With a hint the matching parser is used directly. Without one, JSON is tried
/// first, then YAML, then TOML. A YAML parse is only accepted when it yields a
/// mapping or a sequence; a bare YAML scalar is the last resort.
pub fn decode(bytes: &[u8], hint: Option<Format>) -> Result<Value, ConfigError> {
    decode_detect(bytes, hint, "document").map(|(value, _)| value)
}

/// Like [`decode`], also reporting the format that accepted the content.
///
/// `origin` names the content in error messages (usually a file path).
pub fn decode_detect(
    bytes: &[u8],
    hint: Option<Format>,
    origin: &str,
) -> Result<(Value, Format), ConfigError> {
    if let Some(format) = hint {
        return decode_into(bytes, format, origin).map(|value| (value, format));
    }

    if let Ok(value) = serde_json::from_slice::<Value>(bytes) {
        return Ok((value, Format::Json));
    }

    let yaml = serde_yaml::from_slice::<Value>(bytes).ok();
    if let Some(value) = yaml.as_ref().filter(|v| v.is_object() || v.is_array()) {
        return Ok((value.clone(), Format::Yaml));
    }

    if let Ok(value) = std::str::from_utf8(bytes)
        .map_err(|e| e.to_string())
        .and_then(|text| toml::from_str::<Value>(text).map_err(|e| e.to_string()))
    {
        return Ok((value, Format::Toml));
    }

    yaml.map(|value| (value, Format::Yaml))
        .ok_or_else(|| ConfigError::Decode {
            origin: origin.to_string(),
            message: "content is not valid json, yaml or toml".to_string(),
        })
}

/// Decodes `bytes` written in `format` straight into a concrete type.
pub fn decode_into<T: DeserializeOwned>(
    bytes: &[u8],
    format: Format,
    origin: &str,
) -> Result<T, ConfigError> {
    let result = match format {
        Format::Json => serde_json::from_slice(bytes).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_slice(bytes).map_err(|e| e.to_string()),
        Format::Toml => std::str::from_utf8(bytes)
            .map_err(|e| e.to_string())
            .and_then(|text| toml::from_str(text).map_err(|e| e.to_string())),
    };

    result.map_err(|message| ConfigError::Decode {
        origin: format!("{origin} as {format}"),
        message,
    })
}

/// Serializes a generic document in the given format.
pub fn encode(value: &Value, format: Format) -> Result<Vec<u8>, ConfigError> {
    let result = match format {
        Format::Json => serde_json::to_vec_pretty(value).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| e.to_string()),
        Format::Toml => toml::to_string(value)
            .map(String::into_bytes)
            .map_err(|e| e.to_string()),
    };

    result.map_err(|message| ConfigError::Encode { format, message })
}
