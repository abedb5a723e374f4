use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::KeyValueStore;
use crate::domain::Result;

/// Key-value store kept in memory and mirrored to a single JSON object on disk.
pub struct JsonFileStore {
    path: PathBuf,
    items: Mutex<HashMap<String, Value>>,
}

impl JsonFileStore {
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let items = match tokio::fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => HashMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No store at {}, starting empty", path.display());
                HashMap::new()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            path,
            items: Mutex::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file atomically so a crash never leaves half-written JSON.
    async fn flush(&self, items: &HashMap<String, Value>) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp_path = self.path.with_extension("json.tmp");
        let contents = serde_json::to_vec_pretty(items)?;
        tokio::fs::write(&tmp_path, contents).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;

        debug!("Flushed {} key(s) to {}", items.len(), self.path.display());
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut items = self.items.lock().await;
        items.insert(key.to_string(), value);
        self.flush(&items).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut items = self.items.lock().await;
        let before = items.len();
        for key in keys {
            items.remove(key);
        }
        if items.len() == before {
            return Ok(());
        }
        self.flush(&items).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.lock().await.keys().cloned().collect())
    }
}
