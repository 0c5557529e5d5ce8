//! Variable interpolation for configuration text.
//!
//! Supports `{{.section.field}}` placeholders that reference values already
//! known for the same document. Substitution is a single pass over the raw
//! text: the inserted values are not scanned again.

use super::ConfigError;
use serde_json::Value;

/// Replaces every `{{.path.to.field}}` placeholder in `text` with the scalar
/// found at that path of `context`.
///
/// Returns an error if a placeholder is unclosed, malformed, points at a
/// missing path or at a mapping or sequence.
pub fn interpolate(text: &str, context: &Value) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(start) = rest.find("{{") {
        result.push_str(&rest[..start]);

        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or(ConfigError::UnclosedReference)?;
        let expression = after[..end].trim();
        let path = expression
            .strip_prefix('.')
            .ok_or_else(|| ConfigError::InvalidReferencePath(expression.to_string()))?;

        result.push_str(&lookup_path(context, path)?);
        rest = &after[end + 2..];
    }

    result.push_str(rest);
    Ok(result)
}

/// Looks up a dotted path in the document and returns the value as a string.
fn lookup_path(root: &Value, path: &str) -> Result<String, ConfigError> {
    let parts: Vec<&str> = path.split('.').collect();
    if parts.iter().any(|p| p.is_empty()) {
        return Err(ConfigError::InvalidReferencePath(path.to_string()));
    }

    let not_found = || ConfigError::ReferenceNotFound(path.to_string());

    let mut current = root;
    for part in &parts {
        current = current
            .as_object()
            .and_then(|map| map.get(*part))
            .ok_or_else(not_found)?;
    }

    value_to_string(current, path)
}

/// Converts a scalar document value to its string representation.
fn value_to_string(value: &Value, path: &str) -> Result<String, ConfigError> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Null => Ok(String::new()),
        Value::Array(_) | Value::Object(_) => {
            Err(ConfigError::NonScalarReference(path.to_string()))
        }
    }
}
