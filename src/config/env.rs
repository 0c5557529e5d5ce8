use serde_json::Value;

use super::tags::Shape;
use super::ConfigError;

/// Reads an environment variable, treating an empty value as unset.
pub fn lookup(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

/// Turns a raw string (from the environment or a `default=` directive) into a
/// document value for a field of the given shape.
///
/// Text fields take the string as is. Anything else is parsed as a YAML
/// fragment, so `8080` becomes a number, `[a, b]` a sequence and `{k: v}` a
/// mapping.
pub fn parse_fragment(raw: &str, shape: Shape, origin: &str) -> Result<Value, ConfigError> {
    if matches!(shape, Shape::Text) || raw.trim().is_empty() {
        return Ok(Value::String(raw.to_string()));
    }

    serde_yaml::from_str::<Value>(raw).map_err(|e| ConfigError::Decode {
        origin: origin.to_string(),
        message: e.to_string(),
    })
}
