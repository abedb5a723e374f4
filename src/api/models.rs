use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://hello.iitk.ac.in";
pub const DEFAULT_SAVE_PATH: &str = "HelloIITK_Downloads";
const APP_DIR: &str = "course-sync";
const DEFAULT_STORE_FILE: &str = "store.json";

/// The user's Downloads folder, which `savePath` is relative to.
fn default_download_root() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Per-user data directory holding the sync history.
fn default_store_path() -> PathBuf {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_STORE_FILE)
}

/// Runtime configuration, defaults overridable through `COURSE_SYNC_*` env vars.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub base_url: String,
    /// Raw `Cookie` header value of an already logged-in portal session.
    pub session_cookie: Option<String>,
    /// Chromium profile directory carrying the portal session for rendered pages.
    pub browser_profile_dir: Option<PathBuf>,
    pub download_root: PathBuf,
    pub store_path: PathBuf,
    pub poll_interval: Duration,
    pub poll_attempts: u32,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            session_cookie: None,
            browser_profile_dir: None,
            download_root: default_download_root(),
            store_path: default_store_path(),
            poll_interval: Duration::from_millis(500),
            poll_attempts: 21,
        }
    }
}

impl SyncConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(base_url) = non_empty("COURSE_SYNC_BASE_URL") {
            config.base_url = base_url.trim_end_matches('/').to_string();
        }
        config.session_cookie = non_empty("COURSE_SYNC_COOKIE");
        config.browser_profile_dir = non_empty("COURSE_SYNC_BROWSER_PROFILE").map(PathBuf::from);
        if let Some(dir) = non_empty("COURSE_SYNC_DOWNLOAD_DIR") {
            config.download_root = PathBuf::from(dir);
        }
        if let Some(path) = non_empty("COURSE_SYNC_STORE") {
            config.store_path = PathBuf::from(path);
        }
        if let Some(ms) = non_empty("COURSE_SYNC_POLL_MS").and_then(|v| v.parse().ok()) {
            config.poll_interval = Duration::from_millis(ms);
        }
        if let Some(attempts) = non_empty("COURSE_SYNC_POLL_ATTEMPTS").and_then(|v| v.parse().ok()) {
            config.poll_attempts = attempts;
        }
        config
    }

    pub fn catalog_url(&self) -> String {
        format!("{}/courses", self.base_url)
    }

    pub fn resources_url(&self, course_id: &str) -> String {
        format!("{}/studio/{}/student/resources", self.base_url, course_id)
    }
}
