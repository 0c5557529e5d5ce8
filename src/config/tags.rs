//! Field directives: environment overrides, defaults and required checks.
//!
//! A type opts in by implementing [`Tagged`] (usually through the `config!`
//! macro), which describes which fields carry a [`Tag`] and how nested values
//! are laid out. [`apply_tags`] then processes an already decoded value.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::env::{lookup, parse_fragment};
use super::format::Format;
use super::ConfigError;
use crate::tag::Tag;

/// The layout of a value, as far as directives are concerned.
#[derive(Debug, Clone, Copy)]
pub enum Shape {
    /// A string-like scalar; raw directive values are taken verbatim.
    Text,
    /// Any other leaf; raw directive values are parsed.
    Scalar,
    Struct(&'static [TaggedField]),
    Seq(fn() -> Shape),
    Map(fn() -> Shape),
}

/// A struct field and its directives.
#[derive(Debug, Clone)]
pub struct TaggedField {
    pub name: &'static str,
    pub tag: Tag,
    pub shape: fn() -> Shape,
}

impl TaggedField {
    pub fn new(name: &'static str, tag: &str, shape: fn() -> Shape) -> Self {
        Self {
            name,
            tag: Tag::parse(tag),
            shape,
        }
    }
}

/// Types whose fields can carry directives.
pub trait Tagged {
    fn shape() -> Shape;
}

macro_rules! impl_tagged {
    ($shape:ident: $($ty:ty),* $(,)?) => {
        $(impl Tagged for $ty {
            fn shape() -> Shape {
                Shape::$shape
            }
        })*
    };
}

impl_tagged!(Text: String, PathBuf, char);
impl_tagged!(Scalar: bool, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, Value);

impl<T: Tagged> Tagged for Option<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: Tagged> Tagged for Box<T> {
    fn shape() -> Shape {
        T::shape()
    }
}

impl<T: Tagged> Tagged for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(T::shape)
    }
}

impl<T: Tagged> Tagged for BTreeMap<String, T> {
    fn shape() -> Shape {
        Shape::Map(T::shape)
    }
}

impl<T: Tagged, S> Tagged for HashMap<String, T, S> {
    fn shape() -> Shape {
        Shape::Map(T::shape)
    }
}

/// Applies every field directive of `value`, recursing into nested structs,
/// sequences and maps.
///
/// For each field the order is: environment override, then default when the
/// field is zero, then the required check. On error the fields processed so
/// far stay applied.
pub fn apply_tags<T>(value: &mut T) -> Result<(), ConfigError>
where
    T: Tagged + Serialize + DeserializeOwned,
{
    let mut document = serde_json::to_value(&*value).map_err(|e| ConfigError::Encode {
        format: Format::Json,
        message: e.to_string(),
    })?;

    let applied = apply_shape(&mut document, T::shape(), "");
    let decoded = serde_json::from_value::<T>(document).map_err(|e| ConfigError::Decode {
        origin: "tagged fields".to_string(),
        message: e.to_string(),
    });

    match (applied, decoded) {
        (Ok(()), Ok(updated)) => {
            *value = updated;
            Ok(())
        }
        (Err(err), Ok(partial)) => {
            *value = partial;
            Err(err)
        }
        (Ok(()), Err(err)) | (Err(err), Err(_)) => Err(err),
    }
}

fn apply_shape(value: &mut Value, shape: Shape, path: &str) -> Result<(), ConfigError> {
    match shape {
        Shape::Text | Shape::Scalar => Ok(()),
        Shape::Struct(fields) => match value {
            Value::Object(map) => {
                for field in fields {
                    let field_path = join(path, field.name);
                    let inserted = !map.contains_key(field.name);
                    let slot = map.entry(field.name).or_insert(Value::Null);
                    apply_field(slot, field, &field_path)?;
                    if inserted && slot.is_null() {
                        map.remove(field.name);
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        },
        Shape::Seq(element) => match value {
            Value::Array(items) => items
                .iter_mut()
                .enumerate()
                .try_for_each(|(i, item)| apply_shape(item, element(), &format!("{path}[{i}]"))),
            _ => Ok(()),
        },
        Shape::Map(element) => match value {
            Value::Object(map) => map
                .iter_mut()
                .try_for_each(|(key, item)| apply_shape(item, element(), &format!("{path}[{key}]"))),
            _ => Ok(()),
        },
    }
}

fn apply_field(slot: &mut Value, field: &TaggedField, path: &str) -> Result<(), ConfigError> {
    let shape = (field.shape)();
    let tag = &field.tag;

    if let Some(var) = &tag.env {
        if let Some(raw) = lookup(var) {
            debug!(field = path, variable = %var, "field set from environment");
            *slot = parse_fragment(&raw, shape, &format!("environment variable '{var}'"))?;
        }
    }

    if is_zero(slot) {
        if let Some(default) = &tag.default {
            *slot = parse_fragment(default, shape, &format!("default for '{path}'"))?;
        }
    }

    if tag.required && is_zero(slot) {
        return Err(ConfigError::RequiredFieldMissing {
            field: path.to_string(),
        });
    }

    apply_shape(slot, shape, path)
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

/// Whether a document value is the zero value of its type.
pub fn is_zero(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.values().all(is_zero),
    }
}
