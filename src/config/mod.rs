//! Configuration loading: format codec, file discovery, layering, references
//! and field directives.

mod builder;
mod env;
mod error;
mod file;
mod format;
mod resolve;
mod source;
mod tags;

pub use builder::{load_config, parse_document, unmarshal, Loader};
pub use env::{lookup, parse_fragment};
pub use error::ConfigError;
pub use file::{locate, locate_all, read_config_file, search_file};
pub use format::{decode, decode_detect, decode_into, encode, Format, EXTENSIONS};
pub use resolve::interpolate;
pub use source::{deep_merge, deep_merge_all, load_document, Merged};
pub use tags::{apply_tags, is_zero, Shape, Tagged, TaggedField};
