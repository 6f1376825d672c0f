//! Persistence target selection.
//!
//! Precedence: programmatic override → `MEASUREIT_HOME` environment
//! variable → OS user-data directory. Subdirectories `databases/`, `logs/`,
//! `cfg/` are created on first access, not at initialization.

use crate::consts::{CFG_DIR, DATABASES_DIR, HOME_ENV_VAR, LOGS_DIR};
use std::io;
use std::path::{Path, PathBuf};

/// Resolved persistence root plus lazily-created subdirectories.
#[derive(Debug, Clone)]
pub struct PersistenceRoot {
    root: PathBuf,
}

impl PersistenceRoot {
    /// Resolve the persistence root using the override/env/OS precedence rule.
    ///
    /// `override_path` takes priority; if `None`, `MEASUREIT_HOME` is
    /// consulted; if that is also unset, falls back to the OS user-data
    /// directory under a `measureit` subdirectory.
    pub fn resolve(override_path: Option<&Path>) -> Self {
        if let Some(p) = override_path {
            return Self { root: p.to_path_buf() };
        }
        if let Ok(env_path) = std::env::var(HOME_ENV_VAR) {
            if !env_path.is_empty() {
                return Self { root: PathBuf::from(env_path) };
            }
        }
        let base = dirs::data_dir().unwrap_or_else(std::env::temp_dir);
        Self { root: base.join("measureit") }
    }

    /// The resolved root path, not guaranteed to exist yet.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `databases/` subdirectory, created on first access.
    pub fn databases_dir(&self) -> io::Result<PathBuf> {
        self.ensure_subdir(DATABASES_DIR)
    }

    /// The `logs/` subdirectory, created on first access.
    pub fn logs_dir(&self) -> io::Result<PathBuf> {
        self.ensure_subdir(LOGS_DIR)
    }

    /// The `cfg/` subdirectory, created on first access.
    pub fn cfg_dir(&self) -> io::Result<PathBuf> {
        self.ensure_subdir(CFG_DIR)
    }

    fn ensure_subdir(&self, name: &str) -> io::Result<PathBuf> {
        let dir = self.root.join(name);
        std::fs::create_dir_all(&dir)?;
        Ok(dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn override_takes_priority() {
        let tmp = tempfile::tempdir().unwrap();
        let root = PersistenceRoot::resolve(Some(tmp.path()));
        assert_eq!(root.root(), tmp.path());
    }

    #[test]
    fn subdirectories_created_lazily() {
        let tmp = tempfile::tempdir().unwrap();
        let root = PersistenceRoot::resolve(Some(tmp.path()));
        assert!(!tmp.path().join("databases").exists());
        let dir = root.databases_dir().unwrap();
        assert!(dir.exists());
        assert_eq!(dir, tmp.path().join("databases"));
    }

    #[test]
    fn env_var_used_when_no_override() {
        // SAFETY: test-only, single-threaded test body; no other test in
        // this crate reads MEASUREIT_HOME concurrently.
        let tmp = tempfile::tempdir().unwrap();
        unsafe {
            std::env::set_var(HOME_ENV_VAR, tmp.path());
        }
        let root = PersistenceRoot::resolve(None);
        assert_eq!(root.root(), tmp.path());
        unsafe {
            std::env::remove_var(HOME_ENV_VAR);
        }
    }
}
