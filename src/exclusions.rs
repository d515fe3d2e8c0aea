use anyhow::Result;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::store::LocalStore;

pub const EXCLUDED_APPS_KEY: &str = "excludedApps";

/// Bundle ids the user chose to hide from the switcher.
///
/// Every operation reads and rewrites the whole list; user actions are
/// serialized by the caller, so there is no concurrent writer to race with.
pub struct ExclusionStore {
    store: LocalStore,
}

impl ExclusionStore {
    pub fn new(store: LocalStore) -> Self {
        ExclusionStore { store }
    }

    /// Excluded bundle ids in the order they were added. A missing or
    /// unreadable entry reads as empty.
    pub fn list(&self) -> Vec<String> {
        let Some(stored) = self.store.get_item(EXCLUDED_APPS_KEY) else {
            return Vec::new();
        };
        match serde_json::from_str(&stored) {
            Ok(excluded) => excluded,
            Err(e) => {
                warn!("Ignoring unreadable exclusion list: {}", e);
                Vec::new()
            }
        }
    }

    pub fn as_set(&self) -> HashSet<String> {
        self.list().into_iter().collect()
    }

    /// Exclude a bundle id. Returns false if it was already excluded.
    pub fn add(&self, bundle_id: &str) -> Result<bool> {
        let mut excluded = self.list();
        if excluded.iter().any(|id| id == bundle_id) {
            return Ok(false);
        }
        excluded.push(bundle_id.to_string());
        self.save(&excluded)?;
        info!("Excluded {}", bundle_id);
        Ok(true)
    }

    /// Stop excluding a bundle id. Returns false if it was not excluded.
    pub fn remove(&self, bundle_id: &str) -> Result<bool> {
        let mut excluded = self.list();
        let before = excluded.len();
        excluded.retain(|id| id != bundle_id);
        if excluded.len() == before {
            return Ok(false);
        }
        self.save(&excluded)?;
        info!("Restored {}", bundle_id);
        Ok(true)
    }

    fn save(&self, excluded: &[String]) -> Result<()> {
        self.store
            .set_item(EXCLUDED_APPS_KEY, &serde_json::to_string(excluded)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_store(dir: &tempfile::TempDir) -> ExclusionStore {
        ExclusionStore::new(LocalStore::open(dir.path()).unwrap())
    }

    #[test]
    fn test_empty_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let exclusions = make_store(&dir);

        assert!(exclusions.list().is_empty());
        assert!(exclusions.as_set().is_empty());
    }

    #[test]
    fn test_add_is_idempotent_and_durable() {
        let dir = tempfile::tempdir().unwrap();
        let exclusions = make_store(&dir);

        assert!(exclusions.add("com.a").unwrap());
        assert!(exclusions.add("com.b").unwrap());
        assert!(!exclusions.add("com.a").unwrap());

        let reopened = make_store(&dir);
        assert_eq!(reopened.list(), vec!["com.a".to_string(), "com.b".to_string()]);
    }

    #[test]
    fn test_remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let exclusions = make_store(&dir);
        exclusions.add("com.a").unwrap();

        assert!(!exclusions.remove("com.missing").unwrap());
        assert!(exclusions.remove("com.a").unwrap());
        assert!(!exclusions.remove("com.a").unwrap());
        assert!(exclusions.list().is_empty());
    }

    #[test]
    fn test_stored_format_is_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let exclusions = make_store(&dir);
        exclusions.add("com.a").unwrap();

        let raw = LocalStore::open(dir.path())
            .unwrap()
            .get_item(EXCLUDED_APPS_KEY)
            .unwrap();
        assert_eq!(raw, r#"["com.a"]"#);
    }

    #[test]
    fn test_corrupt_entry_reads_as_empty_and_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        LocalStore::open(dir.path())
            .unwrap()
            .set_item(EXCLUDED_APPS_KEY, r#"{"com.a": true}"#)
            .unwrap();
        let exclusions = make_store(&dir);

        assert!(exclusions.list().is_empty());
        exclusions.add("com.b").unwrap();
        assert_eq!(exclusions.list(), vec!["com.b".to_string()]);
    }
}
