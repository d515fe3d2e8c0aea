//! Short-lived cache of the last successful running-apps query.
//!
//! The cache lets the first paint happen before the fast query returns. An
//! in-memory copy shadows the durable entry so repeated reads within one
//! process do not deserialize the store again.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{debug, warn};

use crate::model::App;
use crate::store::LocalStore;

pub const RUNNING_APPS_CACHE_KEY: &str = "runningAppsCache";

/// Maximum age of a cached snapshot.
pub const CACHE_TTL: Duration = Duration::from_secs(20);

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp: u64,
    pub apps: Vec<App>,
}

impl CacheEntry {
    fn is_fresh(&self, now: u64, ttl: Duration) -> bool {
        // Entries stamped in the future come from a skewed clock; age unknown.
        match now.checked_sub(self.timestamp) {
            Some(age) => u128::from(age) <= ttl.as_millis(),
            None => false,
        }
    }
}

/// Every payload shape the cache key has held.
#[derive(Deserialize)]
#[serde(untagged)]
enum StoredPayload {
    Entry(CacheEntry),
    /// Written before snapshots carried a timestamp.
    Legacy(Vec<App>),
}

pub struct ResultCache {
    store: LocalStore,
    ttl: Duration,
    memory: Option<CacheEntry>,
}

impl ResultCache {
    pub fn new(store: LocalStore) -> Self {
        Self::with_ttl(store, CACHE_TTL)
    }

    pub fn with_ttl(store: LocalStore, ttl: Duration) -> Self {
        ResultCache {
            store,
            ttl,
            memory: None,
        }
    }

    /// The stored snapshot if it is younger than the TTL.
    pub fn get(&mut self) -> Option<Vec<App>> {
        self.get_at(now_millis())
    }

    pub fn get_at(&mut self, now: u64) -> Option<Vec<App>> {
        if self.memory.is_none() {
            self.memory = self.load();
        }

        let entry = self.memory.as_ref()?;
        if entry.is_fresh(now, self.ttl) {
            debug!("Cache hit ({} apps)", entry.apps.len());
            Some(entry.apps.clone())
        } else {
            debug!("Cached snapshot from {} has expired", entry.timestamp);
            None
        }
    }

    /// Replace the snapshot. Timestamp and apps are written as one value, so
    /// a reader never pairs one with the other's predecessor.
    pub fn set(&mut self, apps: Vec<App>) -> Result<()> {
        self.set_at(apps, now_millis())
    }

    pub fn set_at(&mut self, apps: Vec<App>, now: u64) -> Result<()> {
        let entry = CacheEntry {
            timestamp: now,
            apps,
        };
        let payload = serde_json::to_string(&entry)?;
        self.store.set_item(RUNNING_APPS_CACHE_KEY, &payload)?;
        self.memory = Some(entry);
        Ok(())
    }

    pub fn invalidate(&mut self) -> Result<()> {
        self.memory = None;
        self.store.remove_item(RUNNING_APPS_CACHE_KEY)
    }

    /// Apps from the stored snapshot regardless of age. Used only to label
    /// things (e.g. excluded bundle ids) where staleness does not matter.
    pub fn last_known(&mut self) -> Vec<App> {
        if self.memory.is_none() {
            self.memory = self.load();
        }
        self.memory
            .as_ref()
            .map(|entry| entry.apps.clone())
            .unwrap_or_default()
    }

    fn load(&self) -> Option<CacheEntry> {
        let stored = self.store.get_item(RUNNING_APPS_CACHE_KEY)?;
        match serde_json::from_str::<StoredPayload>(&stored) {
            Ok(StoredPayload::Entry(entry)) => Some(entry),
            Ok(StoredPayload::Legacy(apps)) => {
                // No timestamp to age it by: readable, but always stale.
                debug!("Found legacy cache format with {} apps", apps.len());
                Some(CacheEntry { timestamp: 0, apps })
            }
            Err(e) => {
                warn!("Ignoring unreadable running apps cache: {}", e);
                None
            }
        }
    }
}

pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
