//! Scriptable collaborators shared by the orchestration tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::Notify;

use crate::api::{self, ApiError, CatalogSource};
use crate::domain::{DownloadRequest, ResourceFile, Result, RunContext, SyncError};
use crate::download::DownloadSink;
use crate::notify::Notifier;
use crate::render::ResourceRenderer;
use crate::store::KeyValueStore;

pub fn file(href: &str, title: &str, original_filename: &str) -> ResourceFile {
    ResourceFile {
        href: href.to_string(),
        title: title.to_string(),
        original_filename: original_filename.to_string(),
    }
}

pub fn catalog_html(courses: &[(&str, &str)]) -> String {
    let cards: String = courses
        .iter()
        .map(|(id, name)| {
            format!(
                r#"<div class="course-card"><a href="/studio/{id}/overview">open</a><span class="course-id">{name}</span></div>"#
            )
        })
        .collect();
    format!("<html><body>{cards}</body></html>")
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub statuses: Mutex<Vec<String>>,
    pub notifications: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn statuses(&self) -> Vec<String> {
        self.statuses.lock().clone()
    }

    pub fn count(&self, status: &str) -> usize {
        self.statuses.lock().iter().filter(|s| *s == status).count()
    }

    pub fn notification_titles(&self) -> Vec<String> {
        self.notifications
            .lock()
            .iter()
            .map(|(title, _)| title.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn status(&self, message: &str) {
        self.statuses.lock().push(message.to_string());
    }

    fn notify(&self, title: &str, body: &str) {
        self.notifications
            .lock()
            .push((title.to_string(), body.to_string()));
    }
}

/// Records requests; optionally cancels a run once a number of downloads were issued.
#[derive(Default)]
pub struct RecordingSink {
    pub requests: Mutex<Vec<DownloadRequest>>,
    pub cancel_after: Mutex<Option<(usize, RunContext)>>,
}

impl RecordingSink {
    pub fn destinations(&self) -> Vec<String> {
        self.requests
            .lock()
            .iter()
            .map(|r| r.destination.clone())
            .collect()
    }
}

impl DownloadSink for RecordingSink {
    fn download(&self, request: DownloadRequest) {
        let mut requests = self.requests.lock();
        requests.push(request);
        if let Some((n, run)) = self.cancel_after.lock().as_ref() {
            if requests.len() == *n {
                run.cancel();
            }
        }
    }
}

/// Serves file lists per course page URL. Unknown URLs render as empty pages.
#[derive(Default)]
pub struct ScriptedRenderer {
    pub pages: Mutex<HashMap<String, Result<Vec<ResourceFile>>>>,
    pub calls: AtomicUsize,
    /// (url, entered, release): signal `entered`, then wait for `release`.
    pub gate: Mutex<Option<(String, Arc<Notify>, Arc<Notify>)>>,
    /// Rendering this url panics.
    pub panics_on: Mutex<Option<String>>,
}

impl ScriptedRenderer {
    pub fn page(&self, url: &str, result: Result<Vec<ResourceFile>>) {
        self.pages.lock().insert(url.to_string(), result);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceRenderer for ScriptedRenderer {
    async fn render(&self, url: &str, run: &RunContext) -> Result<Vec<ResourceFile>> {
        run.ensure_active()?;
        self.calls.fetch_add(1, Ordering::SeqCst);

        let panics = self.panics_on.lock().as_deref() == Some(url);
        if panics {
            panic!("renderer blew up on {url}");
        }

        let gate = self
            .gate
            .lock()
            .as_ref()
            .filter(|(gated, _, _)| gated == url)
            .map(|(_, entered, release)| (entered.clone(), release.clone()));
        if let Some((entered, release)) = gate {
            entered.notify_one();
            release.notified().await;
        }

        run.ensure_active()?;
        self.pages
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

pub struct StaticCatalog(pub std::result::Result<String, u16>);

#[async_trait]
impl CatalogSource for StaticCatalog {
    async fn fetch_catalog(&self) -> api::client::Result<String> {
        self.0.clone().map_err(ApiError::Status)
    }
}

/// Serves `html` only after `release` is signalled, announcing the fetch on `entered`.
pub struct GatedCatalog {
    pub html: String,
    pub entered: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait]
impl CatalogSource for GatedCatalog {
    async fn fetch_catalog(&self) -> api::client::Result<String> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(self.html.clone())
    }
}

/// In-memory store that counts writes per key and can fail on chosen keys.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    pub writes: Mutex<HashMap<String, usize>>,
    pub failing_reads: Mutex<Vec<String>>,
    pub cancel_on_read: Mutex<Option<(String, RunContext)>>,
}

impl CountingStore {
    pub fn writes_to(&self, key: &str) -> usize {
        self.writes.lock().get(key).copied().unwrap_or(0)
    }
}

#[async_trait]
impl KeyValueStore for CountingStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        if self.failing_reads.lock().iter().any(|k| k == key) {
            return Err(SyncError::Store(format!("cannot read {key}")));
        }
        if let Some((watched, run)) = self.cancel_on_read.lock().as_ref() {
            if watched == key {
                run.cancel();
            }
        }
        self.inner.get(key).await
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        *self.writes.lock().entry(key.to_string()).or_default() += 1;
        self.inner.set(key, value).await
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        self.inner.remove(keys).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        self.inner.keys().await
    }
}

/// Plain in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, Value>>,
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        Ok(self.items.lock().get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        self.items.lock().insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, keys: &[String]) -> Result<()> {
        let mut items = self.items.lock();
        for key in keys {
            items.remove(key);
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.items.lock().keys().cloned().collect())
    }
}
