pub mod chromium;
pub mod poll;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::domain::{ResourceFile, Result, RunContext};
use crate::scrape::PageScraper;

pub use chromium::ChromiumBackend;
pub use poll::{poll_until, PollOutcome};

/// Produces the resource list of a course page that is filled in by client-side script.
#[async_trait]
pub trait ResourceRenderer: Send + Sync {
    async fn render(&self, url: &str, run: &RunContext) -> Result<Vec<ResourceFile>>;
}

/// Source of isolated, non-visible rendering contexts.
#[async_trait]
pub trait RenderBackend: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>>;
}

/// A live page inside a rendering context.
#[async_trait]
pub trait RenderedPage: Send + Sync {
    /// Snapshot of the current DOM as HTML.
    async fn content(&self) -> Result<String>;

    async fn close(self: Box<Self>) -> Result<()>;
}

/// Renders a page, polls its DOM until the resource list shows up, then tears it down.
pub struct PollingRenderer {
    backend: Arc<dyn RenderBackend>,
    scraper: Arc<dyn PageScraper>,
    interval: Duration,
    max_attempts: u32,
}

impl PollingRenderer {
    pub fn new(
        backend: Arc<dyn RenderBackend>,
        scraper: Arc<dyn PageScraper>,
        interval: Duration,
        max_attempts: u32,
    ) -> Self {
        Self {
            backend,
            scraper,
            interval,
            max_attempts,
        }
    }

    async fn extract(
        &self,
        page: &dyn RenderedPage,
        url: &str,
        run: &RunContext,
    ) -> Result<Vec<ResourceFile>> {
        let scraper = self.scraper.as_ref();
        let outcome = poll_until(self.interval, self.max_attempts, move || async move {
            let html = page.content().await?;
            scraper.find_resources(&html, url)
        })
        .await?;

        run.ensure_active()?;

        match outcome {
            PollOutcome::Found(files) => Ok(files),
            PollOutcome::TimedOut => {
                debug!(
                    "No resource list on {} after {} attempt(s)",
                    url, self.max_attempts
                );
                Ok(Vec::new())
            }
        }
    }
}

#[async_trait]
impl ResourceRenderer for PollingRenderer {
    async fn render(&self, url: &str, run: &RunContext) -> Result<Vec<ResourceFile>> {
        run.ensure_active()?;

        let page = self.backend.open(url).await?;
        let result = self.extract(page.as_ref(), url, run).await;

        if let Err(e) = page.close().await {
            warn!("Failed to close rendering context for {}: {}", url, e);
        }
        result
    }
}
