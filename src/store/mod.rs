pub mod history;
pub mod json_file;

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::Result;

pub use history::HistoryStore;
pub use json_file::JsonFileStore;

/// Durable string-keyed storage of JSON values.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn remove(&self, keys: &[String]) -> Result<()>;
    async fn keys(&self) -> Result<Vec<String>>;
}
