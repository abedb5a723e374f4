use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::join_all;
use futures::FutureExt;
use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use super::CourseProcessor;
use crate::api::CatalogSource;
use crate::domain::{Course, Result, RunContext, SyncOutcome, SyncState};
use crate::notify::Notifier;
use crate::scrape::PageScraper;
use crate::store::HistoryStore;

const START_TITLE: &str = "Course Sync";
const START_BODY: &str = "Sync started. Checking for new files...";
const STOPPED_BY_USER: &str = "Sync stopped by user.";

/// Owns the one sync run that may be in progress and drives it end to end.
pub struct SyncOrchestrator {
    catalog: Arc<dyn CatalogSource>,
    scraper: Arc<dyn PageScraper>,
    processor: CourseProcessor,
    history: HistoryStore,
    notifier: Arc<dyn Notifier>,
    current: Mutex<Option<RunContext>>,
}

impl SyncOrchestrator {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        scraper: Arc<dyn PageScraper>,
        processor: CourseProcessor,
        history: HistoryStore,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            catalog,
            scraper,
            processor,
            history,
            notifier,
            current: Mutex::new(None),
        }
    }

    pub fn is_syncing(&self) -> bool {
        self.current.lock().is_some()
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub(crate) fn notifier(&self) -> &dyn Notifier {
        self.notifier.as_ref()
    }

    /// A persisted `syncing` left behind by a previous process cannot be true here.
    pub async fn recover_stale_state(&self) {
        if self.is_syncing() {
            return;
        }
        match self.history.sync_state().await {
            Ok(SyncState::Syncing) => {
                warn!("Found stale syncing state from a previous session, resetting");
                self.persist_state(SyncState::Stopped).await;
            }
            Ok(SyncState::Stopped) => {}
            Err(e) => warn!("Could not read sync state: {}", e),
        }
    }

    /// Run a full sync. Returns `AlreadyRunning` without side effects if one is in progress.
    pub async fn start(&self) -> SyncOutcome {
        let run = {
            let mut current = self.current.lock();
            if current.is_some() {
                debug!("Sync already running, ignoring trigger");
                return SyncOutcome::AlreadyRunning;
            }
            let run = RunContext::new();
            *current = Some(run.clone());
            run
        };

        info!("Sync run {} started", run.id());
        self.persist_state(SyncState::Syncing).await;
        self.notifier.status("Starting sync");
        self.notifier.notify(START_TITLE, START_BODY);

        let outcome = match self.sync_courses(&run).await {
            Ok(total) => self.report_finished(&run, total),
            Err(e) if e.is_cancelled() => {
                info!("Sync run {} cancelled before processing courses", run.id());
                SyncOutcome::Cancelled
            }
            Err(e) => {
                let message = format!("Error: {e}");
                error!("Error during course sync: {}", e);
                self.notifier.status(&message);
                self.notifier.notify("Sync Error", &message);
                SyncOutcome::Failed(message)
            }
        };

        self.finish(&run).await;
        outcome
    }

    /// Cancel the running sync. Returns false if nothing was running.
    pub async fn stop(&self) -> bool {
        let Some(run) = self.current.lock().take() else {
            return false;
        };

        run.cancel();
        info!("Sync run {} stopped by user", run.id());
        self.persist_state(SyncState::Stopped).await;
        self.notifier.status(STOPPED_BY_USER);
        true
    }

    async fn sync_courses(&self, run: &RunContext) -> Result<usize> {
        let html = self.catalog.fetch_catalog().await?;
        let courses = self.scraper.parse_courses(&html)?;
        run.ensure_active()?;

        self.notifier
            .status(&format!("Processing {} courses", courses.len()));

        let counts = join_all(courses.iter().map(|course| self.process_isolated(course, run))).await;
        Ok(counts.into_iter().sum())
    }

    /// A panic inside one course must not take its siblings or the run down.
    async fn process_isolated(&self, course: &Course, run: &RunContext) -> usize {
        match AssertUnwindSafe(self.processor.process(course, run))
            .catch_unwind()
            .await
        {
            Ok(count) => count,
            Err(_) => {
                error!("[{}] A critical error occurred", course.name);
                self.notifier
                    .status(&format!("Error processing {}", course.name));
                0
            }
        }
    }

    fn report_finished(&self, run: &RunContext, total: usize) -> SyncOutcome {
        let (title, message, outcome) = if run.is_active() {
            (
                "Sync Complete",
                format!("Sync complete. Downloaded {total} new file(s)."),
                SyncOutcome::Completed { new_files: total },
            )
        } else {
            (
                "Sync Stopped",
                format!("Sync stopped. Downloaded {total} new file(s) before stopping."),
                SyncOutcome::Stopped { new_files: total },
            )
        };

        self.notifier.status(&message);
        self.notifier.notify(title, &message);
        outcome
    }

    async fn finish(&self, run: &RunContext) {
        run.cancel();
        let idle = {
            let mut current = self.current.lock();
            if current.as_ref().map(RunContext::id) == Some(run.id()) {
                *current = None;
            }
            current.is_none()
        };
        // A newer run started after a stop owns the persisted state now.
        if idle {
            self.persist_state(SyncState::Stopped).await;
        }
        info!("Sync run {} finished", run.id());
    }

    async fn persist_state(&self, state: SyncState) {
        if let Err(e) = self.history.set_sync_state(state).await {
            warn!("Failed to persist sync state {:?}: {}", state, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::SyncConfig;
    use crate::domain::SyncError;
    use crate::scrape::PortalScraper;
    use crate::store::KeyValueStore;
    use crate::test_support::{
        catalog_html, file, CountingStore, GatedCatalog, RecordingNotifier, RecordingSink,
        ScriptedRenderer, StaticCatalog,
    };
    use serde_json::json;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn page_url(id: &str) -> String {
        SyncConfig::default().resources_url(id)
    }

    struct Harness {
        store: Arc<CountingStore>,
        renderer: Arc<ScriptedRenderer>,
        sink: Arc<RecordingSink>,
        notifier: Arc<RecordingNotifier>,
        orchestrator: Arc<SyncOrchestrator>,
    }

    fn harness(catalog: std::result::Result<String, u16>) -> Harness {
        harness_with(Arc::new(StaticCatalog(catalog)))
    }

    fn harness_with(catalog: Arc<dyn CatalogSource>) -> Harness {
        let store = Arc::new(CountingStore::default());
        let renderer = Arc::new(ScriptedRenderer::default());
        let sink = Arc::new(RecordingSink::default());
        let notifier = Arc::new(RecordingNotifier::default());
        let history = HistoryStore::new(store.clone());
        let processor = CourseProcessor::new(
            Arc::new(SyncConfig::default()),
            renderer.clone(),
            history.clone(),
            sink.clone(),
            notifier.clone(),
        );
        let orchestrator = Arc::new(SyncOrchestrator::new(
            catalog,
            Arc::new(PortalScraper::new().unwrap()),
            processor,
            history,
            notifier.clone(),
        ));
        Harness {
            store,
            renderer,
            sink,
            notifier,
            orchestrator,
        }
    }

    #[tokio::test]
    async fn test_two_course_scenario() {
        let h = harness(Ok(catalog_html(&[("C1", "Course One"), ("C2", "Course Two")])));
        h.renderer.page(
            &page_url("C1"),
            Ok(vec![file("https://x/a.pdf", "Notes", "notes.pdf")]),
        );
        h.renderer.page(&page_url("C2"), Ok(Vec::new()));

        let outcome = h.orchestrator.start().await;

        assert_eq!(outcome, SyncOutcome::Completed { new_files: 1 });
        assert_eq!(
            h.sink.destinations(),
            vec!["HelloIITK_Downloads/Course One/Resources/Notes.pdf"]
        );
        assert_eq!(
            h.notifier.statuses(),
            vec![
                "Starting sync",
                "Processing 2 courses",
                "Sync complete. Downloaded 1 new file(s).",
            ]
        );
        assert_eq!(
            h.notifier.notification_titles(),
            vec!["Course Sync", "Sync Complete"]
        );
        assert_eq!(h.store.get("syncState").await.unwrap(), Some(json!("stopped")));
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_repeated_sync_downloads_nothing_new() {
        let h = harness(Ok(catalog_html(&[("C1", "Course One")])));
        h.renderer.page(
            &page_url("C1"),
            Ok(vec![file("https://x/a.pdf", "Notes", "notes.pdf")]),
        );

        assert_eq!(
            h.orchestrator.start().await,
            SyncOutcome::Completed { new_files: 1 }
        );
        assert_eq!(
            h.orchestrator.start().await,
            SyncOutcome::Completed { new_files: 0 }
        );
        assert_eq!(h.sink.requests.lock().len(), 1);
        assert_eq!(h.notifier.count("Sync complete. Downloaded 0 new file(s)."), 1);
    }

    #[tokio::test]
    async fn test_failing_course_is_isolated() {
        let h = harness(Ok(catalog_html(&[
            ("C1", "One"),
            ("C2", "Two"),
            ("C3", "Three"),
        ])));
        h.renderer.page(
            &page_url("C1"),
            Ok(vec![
                file("https://x/1a.pdf", "A", "a.pdf"),
                file("https://x/1b.pdf", "B", "b.pdf"),
            ]),
        );
        h.renderer.page(
            &page_url("C2"),
            Err(SyncError::Render("tab crashed".to_string())),
        );
        h.renderer.page(
            &page_url("C3"),
            Ok(vec![file("https://x/3a.pdf", "A", "a.pdf")]),
        );

        let outcome = h.orchestrator.start().await;

        assert_eq!(outcome, SyncOutcome::Completed { new_files: 3 });
        assert_eq!(h.notifier.count("Error processing Two"), 1);
        assert_eq!(
            h.notifier.notification_titles(),
            vec!["Course Sync", "Sync Complete"]
        );
    }

    #[tokio::test]
    async fn test_panicking_course_is_isolated() {
        let h = harness(Ok(catalog_html(&[
            ("C1", "One"),
            ("C2", "Two"),
            ("C3", "Three"),
        ])));
        h.renderer.page(
            &page_url("C1"),
            Ok(vec![file("https://x/1a.pdf", "A", "a.pdf")]),
        );
        h.renderer.page(
            &page_url("C3"),
            Ok(vec![
                file("https://x/3a.pdf", "A", "a.pdf"),
                file("https://x/3b.pdf", "B", "b.pdf"),
            ]),
        );
        *h.renderer.panics_on.lock() = Some(page_url("C2"));

        let outcome = h.orchestrator.start().await;

        assert_eq!(outcome, SyncOutcome::Completed { new_files: 3 });
        assert_eq!(h.renderer.calls(), 3);
        assert_eq!(h.notifier.count("Error processing Two"), 1);
        assert_eq!(
            h.notifier.statuses().last().map(String::as_str),
            Some("Sync complete. Downloaded 3 new file(s).")
        );
        assert_eq!(
            h.notifier.notification_titles(),
            vec!["Course Sync", "Sync Complete"]
        );
        assert_eq!(h.store.get("syncState").await.unwrap(), Some(json!("stopped")));
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_stop_during_catalog_fetch_cancels_quietly() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let h = harness_with(Arc::new(GatedCatalog {
            html: catalog_html(&[("C1", "One")]),
            entered: entered.clone(),
            release: release.clone(),
        }));

        let running = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.start().await })
        };
        entered.notified().await;

        assert!(h.orchestrator.stop().await);
        release.notify_one();

        let outcome = running.await.unwrap();
        assert_eq!(outcome, SyncOutcome::Cancelled);
        assert_eq!(h.notifier.statuses(), vec!["Starting sync", STOPPED_BY_USER]);
        assert_eq!(h.notifier.notification_titles(), vec!["Course Sync"]);
        assert_eq!(h.notifier.count("Error: Sync was cancelled."), 0);
        assert_eq!(h.renderer.calls(), 0);
        assert_eq!(h.store.get("syncState").await.unwrap(), Some(json!("stopped")));
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_catalog_http_error_fails_run() {
        let h = harness(Err(500));

        let outcome = h.orchestrator.start().await;

        assert_eq!(
            outcome,
            SyncOutcome::Failed("Error: HTTP error! status: 500".to_string())
        );
        assert_eq!(h.notifier.count("Error: HTTP error! status: 500"), 1);
        assert_eq!(
            h.notifier.notification_titles(),
            vec!["Course Sync", "Sync Error"]
        );
        assert_eq!(h.renderer.calls(), 0);
        assert_eq!(h.store.get("syncState").await.unwrap(), Some(json!("stopped")));
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_noop() {
        let h = harness(Ok(catalog_html(&[])));

        assert!(!h.orchestrator.stop().await);
        assert!(h.notifier.statuses().is_empty());
        assert_eq!(h.store.writes_to("syncState"), 0);
    }

    #[tokio::test]
    async fn test_start_while_running_is_ignored_and_stop_reports_partial_total() {
        let h = harness(Ok(catalog_html(&[("C1", "One"), ("C2", "Two")])));
        h.renderer.page(
            &page_url("C1"),
            Ok(vec![file("https://x/1.pdf", "One", "1.pdf")]),
        );
        h.renderer.page(
            &page_url("C2"),
            Ok(vec![file("https://x/2.pdf", "Two", "2.pdf")]),
        );
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *h.renderer.gate.lock() = Some((page_url("C2"), entered.clone(), release.clone()));

        let running = {
            let orchestrator = h.orchestrator.clone();
            tokio::spawn(async move { orchestrator.start().await })
        };
        entered.notified().await;

        assert!(h.orchestrator.is_syncing());
        assert_eq!(h.store.get("syncState").await.unwrap(), Some(json!("syncing")));
        assert_eq!(h.orchestrator.start().await, SyncOutcome::AlreadyRunning);
        assert_eq!(h.notifier.count("Starting sync"), 1);

        assert!(h.orchestrator.stop().await);
        assert_eq!(h.store.get("syncState").await.unwrap(), Some(json!("stopped")));
        release.notify_one();

        let outcome = running.await.unwrap();
        assert_eq!(outcome, SyncOutcome::Stopped { new_files: 1 });
        assert_eq!(h.sink.destinations(), vec!["HelloIITK_Downloads/One/Resources/One.pdf"]);
        assert_eq!(
            h.notifier.statuses().last().map(String::as_str),
            Some("Sync stopped. Downloaded 1 new file(s) before stopping.")
        );
        assert_eq!(h.notifier.count(STOPPED_BY_USER), 1);
        assert_eq!(
            h.notifier.notification_titles(),
            vec!["Course Sync", "Sync Stopped"]
        );
        assert_eq!(h.store.writes_to("downloaded_C2"), 0);
        assert!(!h.orchestrator.is_syncing());
    }

    #[tokio::test]
    async fn test_recover_stale_state() {
        let h = harness(Ok(catalog_html(&[])));
        h.store.set("syncState", json!("syncing")).await.unwrap();

        h.orchestrator.recover_stale_state().await;

        assert_eq!(h.store.get("syncState").await.unwrap(), Some(json!("stopped")));
    }
}
