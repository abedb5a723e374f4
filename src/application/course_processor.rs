use std::sync::Arc;

use tracing::{debug, error, info};

use crate::api::SyncConfig;
use crate::domain::{Course, DownloadRequest, Result, RunContext, SyncError};
use crate::download::DownloadSink;
use crate::notify::Notifier;
use crate::render::ResourceRenderer;
use crate::store::HistoryStore;
use crate::utils::resource_destination;

/// Scrapes one course and downloads the files it has not seen before.
#[derive(Clone)]
pub struct CourseProcessor {
    config: Arc<SyncConfig>,
    renderer: Arc<dyn ResourceRenderer>,
    history: HistoryStore,
    sink: Arc<dyn DownloadSink>,
    notifier: Arc<dyn Notifier>,
}

impl CourseProcessor {
    pub fn new(
        config: Arc<SyncConfig>,
        renderer: Arc<dyn ResourceRenderer>,
        history: HistoryStore,
        sink: Arc<dyn DownloadSink>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            config,
            renderer,
            history,
            sink,
            notifier,
        }
    }

    /// Number of new files issued for `course`. Never fails: errors count as zero.
    pub async fn process(&self, course: &Course, run: &RunContext) -> usize {
        match self.try_process(course, run).await {
            Ok(count) => count,
            Err(SyncError::Cancelled) => {
                debug!("[{}] Skipped, sync was cancelled", course.name);
                0
            }
            Err(e) => {
                error!("[{}] Failed to process course: {}", course.name, e);
                self.notifier
                    .status(&format!("Error processing {}", course.name));
                0
            }
        }
    }

    async fn try_process(&self, course: &Course, run: &RunContext) -> Result<usize> {
        run.ensure_active()?;

        let url = self.config.resources_url(&course.id);
        let files = self.renderer.render(&url, run).await?;
        run.ensure_active()?;

        info!("[{}] Scraped {} file(s) from page.", course.name, files.len());
        if files.is_empty() {
            return Ok(0);
        }

        let mut downloaded = self.history.downloaded(&course.id).await?;
        let save_path = self.history.save_path().await?;
        debug!(
            "[{}] {} file(s) already downloaded before this run",
            course.name,
            downloaded.len()
        );

        let mut new_files = 0;
        for file in &files {
            if !run.is_active() {
                debug!("[{}] Stopping mid-course, sync was cancelled", course.name);
                break;
            }
            if downloaded.contains(&file.href) {
                continue;
            }

            let destination = resource_destination(
                &save_path,
                &course.name,
                &file.title,
                &file.original_filename,
            );
            self.sink.download(DownloadRequest {
                url: file.href.clone(),
                destination,
                prompt_user: false,
            });

            downloaded.insert(&file.href);
            new_files += 1;
        }

        // Written even when the loop was cut short, so issued downloads stay recorded.
        self.history.save_downloaded(&course.id, &downloaded).await?;
        Ok(new_files)
    }
}
