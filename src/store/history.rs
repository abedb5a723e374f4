use std::collections::HashSet;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use super::KeyValueStore;
use crate::api::models::DEFAULT_SAVE_PATH;
use crate::domain::{Result, SyncError, SyncState};

const SYNC_STATE_KEY: &str = "syncState";
const SAVE_PATH_KEY: &str = "savePath";
const DOWNLOADED_PREFIX: &str = "downloaded_";

fn downloaded_key(course_id: &str) -> String {
    format!("{DOWNLOADED_PREFIX}{course_id}")
}

/// Hrefs already handed to the download sink for one course, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadedSet {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl DownloadedSet {
    pub fn contains(&self, href: &str) -> bool {
        self.seen.contains(href)
    }

    /// Returns false if the href was already present.
    pub fn insert(&mut self, href: &str) -> bool {
        if !self.seen.insert(href.to_string()) {
            return false;
        }
        self.order.push(href.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl FromIterator<String> for DownloadedSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = Self::default();
        for href in iter {
            set.insert(&href);
        }
        set
    }
}

/// Typed view over the persisted keys the sync cares about.
#[derive(Clone)]
pub struct HistoryStore {
    store: Arc<dyn KeyValueStore>,
}

impl HistoryStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub async fn downloaded(&self, course_id: &str) -> Result<DownloadedSet> {
        let Some(value) = self.store.get(&downloaded_key(course_id)).await? else {
            return Ok(DownloadedSet::default());
        };
        let hrefs: Vec<String> = serde_json::from_value(value)?;
        Ok(hrefs.into_iter().collect())
    }

    pub async fn save_downloaded(&self, course_id: &str, set: &DownloadedSet) -> Result<()> {
        let value = Value::from(set.iter().collect::<Vec<_>>());
        self.store.set(&downloaded_key(course_id), value).await
    }

    pub async fn sync_state(&self) -> Result<SyncState> {
        match self.store.get(SYNC_STATE_KEY).await? {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(SyncState::Stopped),
        }
    }

    pub async fn set_sync_state(&self, state: SyncState) -> Result<()> {
        self.store
            .set(SYNC_STATE_KEY, serde_json::to_value(state)?)
            .await
    }

    pub async fn save_path(&self) -> Result<String> {
        match self.store.get(SAVE_PATH_KEY).await? {
            Some(Value::String(path)) if !path.trim().is_empty() => Ok(path),
            Some(Value::String(_)) | None => Ok(DEFAULT_SAVE_PATH.to_string()),
            Some(other) => Err(SyncError::Store(format!("savePath is not a string: {other}"))),
        }
    }

    /// An empty path resets the setting to the default folder.
    pub async fn set_save_path(&self, path: &str) -> Result<String> {
        let path = match path.trim() {
            "" => DEFAULT_SAVE_PATH,
            trimmed => trimmed,
        };
        self.store.set(SAVE_PATH_KEY, Value::from(path)).await?;
        Ok(path.to_string())
    }

    /// Forget every course's download history. Returns how many courses were cleared.
    pub async fn clear_history(&self) -> Result<usize> {
        let keys: Vec<String> = self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|key| key.starts_with(DOWNLOADED_PREFIX))
            .collect();

        if !keys.is_empty() {
            self.store.remove(&keys).await?;
        }
        debug!("Cleared download history for {} course(s)", keys.len());
        Ok(keys.len())
    }
}
