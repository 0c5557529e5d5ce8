//! Layering of decoded documents.

use std::path::PathBuf;

use serde_json::Value;
use tracing::debug;

use super::file::read_config_file;
use super::format::{decode_detect, encode, Format};
use super::resolve::interpolate;
use super::ConfigError;

/// The result of layering several config files into one document.
#[derive(Debug, Clone, PartialEq)]
pub struct Merged {
    pub document: Value,
    /// Format of the most specific (last) file.
    pub format: Format,
    pub sources: Vec<PathBuf>,
}

impl Merged {
    /// Re-serializes the merged document in the most specific file's format.
    ///
    /// Falls back to JSON when that format cannot represent the document
    /// (TOML has no null, for instance).
    pub fn to_bytes(&self) -> Result<(Vec<u8>, Format), ConfigError> {
        match encode(&self.document, self.format) {
            Ok(bytes) => Ok((bytes, self.format)),
            Err(err) if self.format != Format::Json => {
                debug!(format = %self.format, error = %err, "re-encoding merged document as json");
                Ok((encode(&self.document, Format::Json)?, Format::Json))
            }
            Err(err) => Err(err),
        }
    }
}

/// Reads and layers `files` in order, later files overriding earlier ones.
///
/// Each file is interpolated once against everything merged so far plus its
/// own content before it is layered on top.
pub fn load_document(files: &[PathBuf]) -> Result<Merged, ConfigError> {
    if files.is_empty() {
        return Err(ConfigError::NoFiles);
    }

    let mut document = Value::Null;
    let mut format = Format::Json;

    for path in files {
        let (text, hint) = read_config_file(path)?;
        let origin = format!("'{}'", path.display());

        let (raw, detected) = decode_detect(text.as_bytes(), hint, &origin)?;
        let mut context = document.clone();
        deep_merge(&mut context, raw);

        let expanded = interpolate(&text, &context)?;
        let (layer, _) = decode_detect(expanded.as_bytes(), Some(detected), &origin)?;
        deep_merge(&mut document, layer);
        format = detected;
    }

    Ok(Merged {
        document,
        format,
        sources: files.to_vec(),
    })
}

/// Layers `overlay` over `base`.
///
/// Mappings merge key by key, recursively. Everything else (scalars,
/// sequences, null) in the overlay replaces the base value.
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}

/// Merges values in order, with later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values.into_iter().fold(Value::Null, |mut merged, value| {
        deep_merge(&mut merged, value);
        merged
    })
}
