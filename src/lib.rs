//! Environment-aware configuration loading and toolbox population.
//!
//! A toolbox is a struct whose fields are an application's components. The
//! [`Factory`] resolves the active build environment, finds each component's
//! config files (`db.yml`, then `db.production.yml`) and lets the component
//! configure itself from them.

#[macro_use]
mod macros;

pub mod config;
pub mod context;
pub mod env;
mod error;
pub mod tag;
pub mod toolbox;

pub use config::{ConfigError, Loader};
pub use context::{Context, ContextBuilder};
pub use env::{Environment, Environments, Repository, Resolution, TagSource};
pub use error::Error;
pub use tag::{ConfigDirective, Tag};
pub use toolbox::{
    Collection, Component, ComponentError, Contract, Factory, FieldDef, FieldReport,
    FieldVisitor, Namespace, Node, NodeMut, OptionalNode, Outcome, Report,
};
