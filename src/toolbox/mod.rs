//! The toolbox: a tree of namespaces and components filled from config files.
//!
//! Every field of a toolbox is a [`Node`]. Its [`NodeMut`] kind tells the
//! [`Factory`] what to do with it: allocate optionals, let components
//! configure themselves, recurse into namespaces, build collections element by
//! element, and leave scalars alone.

mod factory;
mod report;

use std::collections::{BTreeMap, HashMap};
use std::hash::BuildHasher;
use std::path::PathBuf;

use serde_json::Value;

use crate::config::ConfigError;
use crate::Error;

pub use factory::Factory;
pub use report::{FieldReport, Outcome, Report};

/// Error returned by a component's own configuration code.
pub type ComponentError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// What a component can be configured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Contract {
    /// Accepts a list of located file paths.
    pub files: bool,
    /// Accepts the encoded bytes of one document.
    pub bytes: bool,
}

impl Contract {
    pub const NONE: Contract = Contract {
        files: false,
        bytes: false,
    };
    pub const FILES: Contract = Contract {
        files: true,
        bytes: false,
    };
    pub const BYTES: Contract = Contract {
        files: false,
        bytes: true,
    };
    pub const ALL: Contract = Contract {
        files: true,
        bytes: true,
    };
}

/// A value that configures itself.
///
/// Implement [`configure`](Component::configure) and/or
/// [`configure_bytes`](Component::configure_bytes) and advertise them in
/// [`contract`](Component::contract).
pub trait Component {
    fn contract(&self) -> Contract;

    /// Configures from the located files, bare file first. The list is empty
    /// when no file matched.
    fn configure(&mut self, files: &[PathBuf]) -> Result<(), ComponentError> {
        let _ = files;
        Err("component does not accept config files".into())
    }

    /// Configures from one encoded document (JSON).
    fn configure_bytes(&mut self, bytes: &[u8]) -> Result<(), ComponentError> {
        let _ = bytes;
        Err("component does not accept encoded documents".into())
    }
}

impl<T: Component + ?Sized> Component for Box<T> {
    fn contract(&self) -> Contract {
        (**self).contract()
    }

    fn configure(&mut self, files: &[PathBuf]) -> Result<(), ComponentError> {
        (**self).configure(files)
    }

    fn configure_bytes(&mut self, bytes: &[u8]) -> Result<(), ComponentError> {
        (**self).configure_bytes(bytes)
    }
}

/// A field of a toolbox.
pub trait Node {
    fn node_mut(&mut self) -> NodeMut<'_>;

    /// Whether the value is still in its zero state. Non-zero fields are
    /// never reconfigured.
    fn is_zero(&self) -> bool;

    fn type_name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// The kind of a node, with mutable access to it.
pub enum NodeMut<'a> {
    Optional(&'a mut dyn OptionalNode),
    Component(&'a mut dyn Component),
    Namespace(&'a mut dyn Namespace),
    Collection(&'a mut dyn Collection),
    Scalar,
}

/// An optional slot that can be allocated on demand.
pub trait OptionalNode {
    fn get_mut(&mut self) -> Option<&mut dyn Node>;
    fn get_or_allocate(&mut self) -> &mut dyn Node;
    fn clear(&mut self);
}

impl<T: Node + Default> OptionalNode for Option<T> {
    fn get_mut(&mut self) -> Option<&mut dyn Node> {
        self.as_mut().map(|node| node as &mut dyn Node)
    }

    fn get_or_allocate(&mut self) -> &mut dyn Node {
        self.get_or_insert_with(T::default)
    }

    fn clear(&mut self) {
        *self = None;
    }
}

impl<T: Node + Default> Node for Option<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Optional(self)
    }

    fn is_zero(&self) -> bool {
        self.as_ref().map_or(true, Node::is_zero)
    }
}

impl<T: Node + ?Sized> Node for Box<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        (**self).node_mut()
    }

    fn is_zero(&self) -> bool {
        (**self).is_zero()
    }

    fn type_name(&self) -> &'static str {
        (**self).type_name()
    }
}

/// A struct of toolbox fields, usually declared with `toolbox!`.
pub trait Namespace {
    /// Calls `visitor` for every field, in declaration order.
    fn visit_fields(&mut self, visitor: &mut dyn FieldVisitor) -> Result<(), Error>;
}

pub trait FieldVisitor {
    fn visit_field(&mut self, field: FieldDef, node: &mut dyn Node) -> Result<(), Error>;
}

/// A field's name and raw tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub tag: &'static str,
}

impl FieldDef {
    pub const fn new(name: &'static str, tag: &'static str) -> Self {
        Self { name, tag }
    }
}

/// A sequence or string-keyed map of components.
pub trait Collection {
    /// The contract of the element type.
    fn element_contract(&self) -> Contract;

    fn element_type(&self) -> &'static str;

    /// Rebuilds the collection from `document`, one element per entry.
    ///
    /// The collection is only replaced when every element configured
    /// successfully. Returns the element labels in document order.
    fn configure_elements(&mut self, field: &str, document: Value) -> Result<Vec<String>, Error>;
}

fn build_element<T: Component + Default>(
    field: &str,
    label: &str,
    entry: &Value,
) -> Result<T, Error> {
    let component_error = |source: ComponentError| Error::Component {
        field: format!("{field}{label}"),
        source,
    };

    let bytes = serde_json::to_vec(entry).map_err(|e| component_error(e.into()))?;
    let mut element = T::default();
    element.configure_bytes(&bytes).map_err(component_error)?;
    Ok(element)
}

fn shape_mismatch(field: &str, expected: &str) -> Error {
    ConfigError::Decode {
        origin: format!("document for '{field}'"),
        message: format!("expected {expected}"),
    }
    .into()
}

impl<T: Component + Default> Collection for Vec<T> {
    fn element_contract(&self) -> Contract {
        T::default().contract()
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn configure_elements(&mut self, field: &str, document: Value) -> Result<Vec<String>, Error> {
        let Value::Array(entries) = document else {
            return Err(shape_mismatch(field, "a sequence"));
        };

        let mut elements = Vec::with_capacity(entries.len());
        let mut labels = Vec::with_capacity(entries.len());
        for (i, entry) in entries.iter().enumerate() {
            let label = format!("[{i}]");
            elements.push(build_element(field, &label, entry)?);
            labels.push(label);
        }

        *self = elements;
        Ok(labels)
    }
}

fn configure_map<T: Component + Default>(
    field: &str,
    document: Value,
    mut insert: impl FnMut(String, T),
) -> Result<Vec<String>, Error> {
    let Value::Object(entries) = document else {
        return Err(shape_mismatch(field, "a mapping"));
    };

    let mut built = Vec::with_capacity(entries.len());
    for (key, entry) in &entries {
        let element = build_element(field, &format!("[{key}]"), entry)?;
        built.push((key.clone(), element));
    }

    let labels = built.iter().map(|(key, _)| key.clone()).collect();
    for (key, element) in built {
        insert(key, element);
    }
    Ok(labels)
}

impl<T: Component + Default> Collection for BTreeMap<String, T> {
    fn element_contract(&self) -> Contract {
        T::default().contract()
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn configure_elements(&mut self, field: &str, document: Value) -> Result<Vec<String>, Error> {
        let mut map = BTreeMap::new();
        let labels = configure_map(field, document, |key, element| {
            map.insert(key, element);
        })?;
        *self = map;
        Ok(labels)
    }
}

impl<T: Component + Default, S: BuildHasher + Default> Collection for HashMap<String, T, S> {
    fn element_contract(&self) -> Contract {
        T::default().contract()
    }

    fn element_type(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn configure_elements(&mut self, field: &str, document: Value) -> Result<Vec<String>, Error> {
        let mut map = HashMap::default();
        let labels = configure_map(field, document, |key, element| {
            map.insert(key, element);
        })?;
        *self = map;
        Ok(labels)
    }
}

impl<T: Component + Default> Node for Vec<T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Collection(self)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Component + Default> Node for BTreeMap<String, T> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Collection(self)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

impl<T: Component + Default, S: BuildHasher + Default> Node for HashMap<String, T, S> {
    fn node_mut(&mut self) -> NodeMut<'_> {
        NodeMut::Collection(self)
    }

    fn is_zero(&self) -> bool {
        self.is_empty()
    }
}

macro_rules! scalar_nodes {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Node for $ty {
                fn node_mut(&mut self) -> NodeMut<'_> {
                    NodeMut::Scalar
                }

                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }
            }

            impl Component for $ty {
                fn contract(&self) -> Contract {
                    Contract::NONE
                }
            }
        )*
    };
}

scalar_nodes!(
    bool, char, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64,
    String, PathBuf,
);

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Default, PartialEq)]
    struct Endpoint {
        url: String,
    }

    impl Component for Endpoint {
        fn contract(&self) -> Contract {
            Contract::BYTES
        }

        fn configure_bytes(&mut self, bytes: &[u8]) -> Result<(), ComponentError> {
            let value: Value = serde_json::from_slice(bytes)?;
            self.url = value["url"]
                .as_str()
                .ok_or("endpoint needs a url")?
                .to_string();
            Ok(())
        }
    }

    #[test]
    fn test_vec_configures_in_order() {
        let mut endpoints: Vec<Endpoint> = Vec::new();
        let labels = endpoints
            .configure_elements("endpoints", json!([{"url": "a"}, {"url": "b"}]))
            .unwrap();
        assert_eq!(labels, ["[0]", "[1]"]);
        assert_eq!(endpoints[0].url, "a");
        assert_eq!(endpoints[1].url, "b");
    }

    #[test]
    fn test_failed_element_leaves_collection_unchanged() {
        let mut endpoints = vec![Endpoint { url: "old".into() }];
        let err = endpoints
            .configure_elements("endpoints", json!([{"url": "a"}, {"port": 1}]))
            .unwrap_err();
        assert!(matches!(err, Error::Component { ref field, .. } if field == "endpoints[1]"));
        assert_eq!(endpoints, [Endpoint { url: "old".into() }]);
    }

    #[test]
    fn test_map_configures_by_key() {
        let mut endpoints: BTreeMap<String, Endpoint> = BTreeMap::new();
        let labels = endpoints
            .configure_elements("endpoints", json!({"primary": {"url": "p"}, "backup": {"url": "b"}}))
            .unwrap();
        assert_eq!(labels, ["primary", "backup"]);
        assert_eq!(endpoints["backup"].url, "b");
    }

    #[test]
    fn test_document_shape_mismatch() {
        let mut endpoints: Vec<Endpoint> = Vec::new();
        let err = endpoints
            .configure_elements("endpoints", json!({"url": "a"}))
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::Decode { .. })));
    }

    #[test]
    fn test_option_allocates_default() {
        let mut slot: Option<u32> = None;
        assert!(Node::is_zero(&slot));
        assert!(slot.get_mut().is_none());
        slot.get_or_allocate();
        assert_eq!(slot, Some(0));
        assert!(Node::is_zero(&slot));
    }

    #[test]
    fn test_default_configure_is_unsupported() {
        let mut port = 0u16;
        assert_eq!(port.contract(), Contract::NONE);
        assert!(port.configure(&[]).is_err());
    }
}
