use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use super::format::{decode_detect, decode_into};
use super::resolve::interpolate;
use super::source::load_document;
use super::tags::{apply_tags, Tagged};
use super::ConfigError;

/// Builder for loading a typed configuration from layered files.
///
/// Files are merged in registration order, with later files overriding
/// earlier ones. Each file may be JSON, YAML or TOML; mixing is allowed.
/// Mappings are merged recursively; other values (including sequences)
/// are replaced entirely.
///
/// ## Variable References
///
/// Values can reference other values of the same document using
/// `{{.path.to.field}}`:
///
/// ```yaml
/// server:
///   host: localhost
///   port: 8080
/// url: "http://{{.server.host}}:{{.server.port}}/api"
/// ```
///
/// ## Directives
///
/// After decoding, the field directives declared with `config!`
/// (`env=`, `default=`, `required`) are applied.
///
/// ## Example
///
/// ```no_run
/// use envbox::{config, Loader};
///
/// config! {
///     #[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
///     pub struct Db {
///         pub database: String => "env=PG_DB,default=postgres",
///         pub port: u16 => "default=5432",
///     }
/// }
///
/// let db: Db = Loader::new()
///     .with_file("config/db.yml")
///     .with_file("config/db.production.yml")
///     .load()?;
/// # Ok::<(), envbox::ConfigError>(())
/// ```
#[derive(Debug, Default)]
#[must_use = "loaders do nothing until .load() is called"]
pub struct Loader {
    files: Vec<PathBuf>,
}

impl Loader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file to be layered over the ones already registered.
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    pub fn with_files<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.files
            .extend(paths.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Merges the registered files, decodes the result into `T` and applies
    /// `T`'s field directives.
    ///
    /// The merged document is re-encoded in the format of the last file before
    /// decoding, so format-specific representations (TOML datetimes, YAML
    /// tags) reach `T` the way they were written.
    pub fn load<T>(self) -> Result<T, ConfigError>
    where
        T: Tagged + Serialize + DeserializeOwned,
    {
        load_config(&self.files)
    }
}

/// Loads `T` from a list of files, later files overriding earlier ones.
pub fn load_config<T>(files: &[PathBuf]) -> Result<T, ConfigError>
where
    T: Tagged + Serialize + DeserializeOwned,
{
    let merged = load_document(files)?;
    let (bytes, format) = merged.to_bytes()?;
    let origin = match merged.sources.as_slice() {
        [single] => format!("'{}'", single.display()),
        sources => format!("{} merged files", sources.len()),
    };

    let mut value: T = decode_into(&bytes, format, &origin)?;
    apply_tags(&mut value)?;
    Ok(value)
}

/// Decodes `T` from in-memory content in any supported format.
///
/// References are resolved against the content itself before decoding, then
/// `T`'s field directives are applied.
pub fn unmarshal<T>(bytes: &[u8]) -> Result<T, ConfigError>
where
    T: Tagged + Serialize + DeserializeOwned,
{
    let origin = "in-memory document";
    let (document, format) = decode_detect(bytes, None, origin)?;
    let text = std::str::from_utf8(bytes).map_err(|e| ConfigError::Decode {
        origin: origin.to_string(),
        message: e.to_string(),
    })?;

    let expanded = interpolate(text, &document)?;
    let mut value: T = decode_into(expanded.as_bytes(), format, origin)?;
    apply_tags(&mut value)?;
    Ok(value)
}

/// Decodes content in any supported format into a generic document, without
/// references or directives.
pub fn parse_document(bytes: &[u8]) -> Result<Value, ConfigError> {
    decode_detect(bytes, None, "in-memory document").map(|(value, _)| value)
}
