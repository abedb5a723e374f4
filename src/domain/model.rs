use serde::{Deserialize, Serialize};

/// A course listed on the portal's catalog page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Course {
    pub id: String,
    /// Already sanitized for use as a path segment.
    pub name: String,
}

/// A downloadable file scraped from a course's resource listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceFile {
    /// Absolute download URL, also the dedup key in the download history.
    pub href: String,
    pub title: String,
    /// Only used to recover the file extension.
    pub original_filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    pub url: String,
    /// Relative, '/'-separated path below the download root.
    pub destination: String,
    pub prompt_user: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncState {
    Syncing,
    Stopped,
}

/// Terminal result of one sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Completed { new_files: usize },
    Stopped { new_files: usize },
    Failed(String),
    /// Cancelled before the per-course fan-out started.
    Cancelled,
    /// Trigger ignored because a run was already in progress.
    AlreadyRunning,
}
