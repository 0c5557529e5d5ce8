//! Config file discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

use super::format::{Format, EXTENSIONS};
use super::ConfigError;
use crate::env::Environment;

/// Reads a config file, returning its text and the format implied by its
/// extension, if any.
pub fn read_config_file(path: &Path) -> Result<(String, Option<Format>), ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok((text, Format::from_path(path)))
}

/// Finds the files for `logical_name` under `base`.
///
/// Returns at most two paths: the bare file (`svc.yml`) followed by the
/// environment overlay (`svc.production.yml`). The name may carry a relative
/// directory part and an extension; without a supported extension any of
/// [`EXTENSIONS`] matches. Only one directory level is searched.
pub fn locate(
    base: &Path,
    logical_name: &str,
    environment: &Environment,
    case_sensitive: bool,
) -> Vec<PathBuf> {
    let relative = Path::new(logical_name);
    let dir = match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => base.join(parent),
        _ => base.to_path_buf(),
    };
    let file_name = relative
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(logical_name);

    let (stem, extension) = split_extension(file_name);
    let overlay_stem = format!("{stem}.{}", environment.id());
    let pattern = Pattern {
        extension,
        case_sensitive,
    };

    let entries = match list_files(&dir) {
        Ok(entries) => entries,
        Err(err) => {
            debug!(dir = %dir.display(), error = %err, "config directory not readable");
            return Vec::new();
        }
    };

    let found: Vec<PathBuf> = [stem, overlay_stem.as_str()]
        .into_iter()
        .filter_map(|wanted| pattern.best_match(&entries, wanted))
        .map(|name| dir.join(name))
        .collect();

    debug!(
        name = logical_name,
        environment = environment.id(),
        dir = %dir.display(),
        files = ?found,
        "located config files"
    );
    found
}

/// Finds the single most specific file for `logical_name`.
///
/// Tries the environment overlay (`svc.production.yml`), then the bare file
/// (`svc.yml`), then the bare file inside a directory named after the
/// environment (`production/svc.yml`).
pub fn search_file(
    base: &Path,
    logical_name: &str,
    environment: &Environment,
    case_sensitive: bool,
) -> Option<PathBuf> {
    let relative = Path::new(logical_name);
    let dir = match relative.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => base.join(parent),
        _ => base.to_path_buf(),
    };
    let file_name = relative
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(logical_name);

    let (stem, extension) = split_extension(file_name);
    let overlay_stem = format!("{stem}.{}", environment.id());
    let pattern = Pattern {
        extension,
        case_sensitive,
    };
    let env_dir = dir.join(environment.id());

    let found = [(&dir, overlay_stem.as_str()), (&dir, stem), (&env_dir, stem)]
        .into_iter()
        .find_map(|(dir, wanted)| {
            let entries = list_files(dir).ok()?;
            pattern.best_match(&entries, wanted).map(|name| dir.join(name))
        });

    debug!(
        name = logical_name,
        environment = environment.id(),
        file = ?found,
        "searched config file"
    );
    found
}

/// Locates every name in order and concatenates the results.
pub fn locate_all<S: AsRef<str>>(
    base: &Path,
    names: &[S],
    environment: &Environment,
    case_sensitive: bool,
) -> Vec<PathBuf> {
    names
        .iter()
        .flat_map(|name| locate(base, name.as_ref(), environment, case_sensitive))
        .collect()
}

/// Splits off the extension only when it names a supported format.
fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() && Format::from_extension(ext).is_some() => {
            (stem, Some(ext))
        }
        _ => (file_name, None),
    }
}

fn list_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str() {
            names.push(name.to_string());
        }
    }
    Ok(names)
}

struct Pattern<'a> {
    extension: Option<&'a str>,
    case_sensitive: bool,
}

impl Pattern<'_> {
    fn eq(&self, a: &str, b: &str) -> bool {
        if self.case_sensitive {
            a == b
        } else {
            a.eq_ignore_ascii_case(b)
        }
    }

    /// Rank of the file's extension, or `None` if `file_name` does not match
    /// `stem`.
    fn rank(&self, file_name: &str, stem: &str) -> Option<usize> {
        let (file_stem, ext) = file_name.rsplit_once('.')?;
        if !self.eq(file_stem, stem) {
            return None;
        }

        match self.extension {
            Some(wanted) => self.eq(ext, wanted).then_some(0),
            None => EXTENSIONS.iter().position(|known| self.eq(ext, known)),
        }
    }

    fn best_match<'n>(&self, entries: &'n [String], stem: &str) -> Option<&'n str> {
        entries
            .iter()
            .filter_map(|name| self.rank(name, stem).map(|rank| (rank, name.as_str())))
            .min()
            .map(|(_, name)| name)
    }
}
