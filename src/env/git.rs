use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::debug;

/// Snapshot of a git working tree, used as a hint for the build environment.
///
/// Opening never fails: when git is missing or the path is not a repository
/// the error is recorded and [`Repository::branch`] returns `None`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Repository {
    pub path: PathBuf,
    pub branch_name: String,
    pub commit: String,
    pub build: String,
    pub tag: String,
    pub error: Option<String>,
}

impl Repository {
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let mut repository = Self {
            path,
            ..Self::default()
        };

        match repository.read() {
            Ok(()) => debug!(
                path = %repository.path.display(),
                branch = %repository.branch_name,
                commit = %repository.commit,
                "read git repository"
            ),
            Err(err) => {
                debug!(path = %repository.path.display(), error = %err, "no git information");
                repository.error = Some(err);
            }
        }
        repository
    }

    /// A repository that only carries a branch name.
    pub fn with_branch(branch: impl Into<String>) -> Self {
        Self {
            branch_name: branch.into(),
            ..Self::default()
        }
    }

    /// The checked-out branch, if it could be read.
    pub fn branch(&self) -> Option<&str> {
        if self.error.is_some() || self.branch_name.is_empty() {
            return None;
        }
        Some(&self.branch_name)
    }

    fn read(&mut self) -> Result<(), String> {
        self.branch_name = self.git(&["rev-parse", "--abbrev-ref", "HEAD"])?;
        self.commit = self.git(&["rev-parse", "--short", "HEAD"])?;
        self.build = self.git(&["rev-list", "--all", "--count"])?;
        // Repositories without tags fall back to the commit.
        self.tag = self.git(&["describe", "--abbrev=0", "--tags", "--always"])?;
        Ok(())
    }

    fn git(&self, args: &[&str]) -> Result<String, String> {
        let output = Command::new("git")
            .args(args)
            .current_dir(&self.path)
            .output()
            .map_err(|e| format!("failed to run git: {e}"))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("git {} failed: {}", args.join(" "), stderr.trim()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_outside_repository_records_error() {
        let dir = TempDir::new().unwrap();
        let repository = Repository::open(dir.path());
        assert!(repository.error.is_some());
        assert_eq!(repository.branch(), None);
    }

    #[test]
    fn test_with_branch() {
        let repository = Repository::with_branch("release/2.0");
        assert_eq!(repository.branch(), Some("release/2.0"));
        assert_eq!(Repository::with_branch("").branch(), None);
    }
}
