pub mod commands;
pub mod course_processor;
pub mod sync_orchestrator;

use std::sync::Arc;

use tracing::info;

use crate::api::{PortalClient, SyncConfig};
use crate::domain::Result;
use crate::download::HttpDownloadSink;
use crate::notify::PopupNotifier;
use crate::render::{ChromiumBackend, PollingRenderer};
use crate::scrape::PortalScraper;
use crate::store::{HistoryStore, JsonFileStore};

pub use commands::Command;
pub use course_processor::CourseProcessor;
pub use sync_orchestrator::SyncOrchestrator;

/// Everything the UI holds on to.
pub struct SyncRuntime {
    pub orchestrator: Arc<SyncOrchestrator>,
    pub notifier: Arc<PopupNotifier>,
    pub browser: Arc<ChromiumBackend>,
    pub downloads: Arc<HttpDownloadSink>,
}

impl std::fmt::Debug for SyncRuntime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncRuntime")
            .field("syncing", &self.orchestrator.is_syncing())
            .finish_non_exhaustive()
    }
}

/// Wire the production collaborators together.
pub async fn bootstrap(config: SyncConfig) -> Result<SyncRuntime> {
    let config = Arc::new(config);
    let store = JsonFileStore::open(&config.store_path).await?;
    info!("Using store {}", store.path().display());
    let history = HistoryStore::new(Arc::new(store));

    let client = PortalClient::new(config.as_ref().clone());
    let scraper = Arc::new(PortalScraper::new()?);
    let browser = Arc::new(ChromiumBackend::new(
        config.browser_profile_dir.clone(),
        config.base_url.clone(),
        config.session_cookie.clone(),
    ));
    let renderer = Arc::new(PollingRenderer::new(
        browser.clone(),
        scraper.clone(),
        config.poll_interval,
        config.poll_attempts,
    ));
    let sink = Arc::new(HttpDownloadSink::new(
        client.clone(),
        config.download_root.clone(),
    ));
    let notifier = Arc::new(PopupNotifier::new(true));

    let processor = CourseProcessor::new(
        config.clone(),
        renderer,
        history.clone(),
        sink.clone(),
        notifier.clone(),
    );
    let orchestrator = Arc::new(SyncOrchestrator::new(
        Arc::new(client),
        scraper,
        processor,
        history,
        notifier.clone(),
    ));
    orchestrator.recover_stale_state().await;

    Ok(SyncRuntime {
        orchestrator,
        notifier,
        browser,
        downloads: sink,
    })
}
