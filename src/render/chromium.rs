use std::path::PathBuf;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::CookieParam;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{RenderBackend, RenderedPage};
use crate::domain::{Result, SyncError};

fn render_error(e: impl std::fmt::Display) -> SyncError {
    SyncError::Render(e.to_string())
}

struct Session {
    browser: Browser,
    handler_task: JoinHandle<()>,
}

/// Headless Chromium, launched on first use; every render gets its own tab.
pub struct ChromiumBackend {
    profile_dir: Option<PathBuf>,
    base_url: String,
    session_cookie: Option<String>,
    session: Mutex<Option<Session>>,
}

impl ChromiumBackend {
    pub fn new(
        profile_dir: Option<PathBuf>,
        base_url: impl Into<String>,
        session_cookie: Option<String>,
    ) -> Self {
        Self {
            profile_dir,
            base_url: base_url.into(),
            session_cookie,
            session: Mutex::new(None),
        }
    }

    async fn launch(&self) -> Result<Session> {
        let mut builder = BrowserConfig::builder();
        if let Some(dir) = &self.profile_dir {
            builder = builder.user_data_dir(dir);
        }
        let config = builder.build().map_err(render_error)?;

        let (browser, mut handler) = Browser::launch(config).await.map_err(render_error)?;
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    warn!("chromium handler event error: {}", e);
                }
            }
        });

        info!("Launched headless browser");
        Ok(Session {
            browser,
            handler_task,
        })
    }

    fn cookies(&self) -> Result<Vec<CookieParam>> {
        let Some(header) = &self.session_cookie else {
            return Ok(Vec::new());
        };

        header
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .map(|(name, value)| {
                CookieParam::builder()
                    .name(name.trim())
                    .value(value.trim())
                    .url(self.base_url.clone())
                    .build()
                    .map_err(render_error)
            })
            .collect()
    }

    async fn new_tab(&self) -> Result<Page> {
        let mut session = self.session.lock().await;
        if session.is_none() {
            *session = Some(self.launch().await?);
        }
        let Some(session) = session.as_ref() else {
            return Err(SyncError::Render("browser unavailable".to_string()));
        };
        session
            .browser
            .new_page("about:blank")
            .await
            .map_err(render_error)
    }

    /// Close the browser unless `busy` reports a run that may still open tabs.
    ///
    /// `busy` is checked while the session is locked, so a run starting after
    /// the check waits and relaunches instead of losing its tab. Returns
    /// whether the backend is now shut down.
    pub async fn shutdown_unless(&self, busy: impl FnOnce() -> bool) -> bool {
        let mut slot = self.session.lock().await;
        if busy() {
            debug!("Browser still in use, keeping it open");
            return false;
        }
        let Some(mut session) = slot.take() else {
            return true;
        };
        if let Err(e) = session.browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
        let _ = session.browser.wait().await;
        session.handler_task.abort();
        debug!("Browser shut down");
        true
    }
}

#[async_trait]
impl RenderBackend for ChromiumBackend {
    async fn open(&self, url: &str) -> Result<Box<dyn RenderedPage>> {
        let page = self.new_tab().await?;

        let navigated = async {
            let cookies = self.cookies()?;
            if !cookies.is_empty() {
                page.set_cookies(cookies).await.map_err(render_error)?;
            }
            page.goto(url).await.map_err(render_error)?;
            Ok::<_, SyncError>(())
        }
        .await;

        if let Err(e) = navigated {
            let _ = page.close().await;
            return Err(e);
        }

        debug!("Opened hidden tab for {}", url);
        Ok(Box::new(ChromiumPage { page }))
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl RenderedPage for ChromiumPage {
    async fn content(&self) -> Result<String> {
        self.page.content().await.map_err(render_error)
    }

    async fn close(self: Box<Self>) -> Result<()> {
        self.page.close().await.map_err(render_error)
    }
}
