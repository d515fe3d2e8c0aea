//! Small durable key-value store.
//!
//! Each key is a file holding one JSON string value. Writes land in a
//! temporary sibling first and are renamed into place, so a reader sees
//! either the old value or the new one.

use anyhow::{Context, Result};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct LocalStore {
    dir: PathBuf,
}

impl LocalStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create store directory {}", dir.display()))?;
        debug!("Opened store at {}", dir.display());
        Ok(LocalStore { dir })
    }

    /// Default location: the user data directory, or the cache directory if
    /// the platform has no data directory.
    pub fn default_dir() -> Result<PathBuf> {
        let base = dirs::data_dir()
            .or_else(dirs::cache_dir)
            .context("Could not determine data directory")?;

        Ok(base.join("mac-alttab"))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read a value. Missing keys and unreadable files both read as absent.
    pub fn get_item(&self, key: &str) -> Option<String> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Some(value),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                warn!("Failed to read store entry {}: {}", path.display(), e);
                None
            }
        }
    }

    pub fn set_item(&self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");

        fs::write(&tmp, value)
            .with_context(|| format!("Failed to write store entry {}", tmp.display()))?;
        fs::rename(&tmp, &path)
            .with_context(|| format!("Failed to replace store entry {}", path.display()))?;

        debug!("Stored {} ({} bytes)", key, value.len());
        Ok(())
    }

    /// Remove a value; removing a missing key is not an error.
    pub fn remove_item(&self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e)
                .with_context(|| format!("Failed to remove store entry {}", path.display())),
        }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert_eq!(store.get_item("excludedApps"), None);

        store.set_item("excludedApps", r#"["com.a"]"#).unwrap();
        assert_eq!(store.get_item("excludedApps").as_deref(), Some(r#"["com.a"]"#));

        store.set_item("excludedApps", "[]").unwrap();
        assert_eq!(store.get_item("excludedApps").as_deref(), Some("[]"));

        store.remove_item("excludedApps").unwrap();
        assert_eq!(store.get_item("excludedApps"), None);
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        assert!(store.remove_item("nothing").is_ok());
    }

    #[test]
    fn test_open_creates_nested_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a").join("b");
        let store = LocalStore::open(&nested).unwrap();

        assert!(nested.is_dir());
        assert_eq!(store.dir(), nested.as_path());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).unwrap();

        store.set_item("runningAppsCache", "{}").unwrap();

        let names: Vec<String> = fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["runningAppsCache.json".to_string()]);
    }

    #[test]
    fn test_default_dir_ends_with_crate_name() {
        if let Ok(dir) = LocalStore::default_dir() {
            assert!(dir.ends_with("mac-alttab"));
        }
    }
}
