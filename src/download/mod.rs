pub mod http_sink;

use crate::domain::DownloadRequest;

pub use http_sink::HttpDownloadSink;

/// Accepts download requests without reporting back.
///
/// Implementations must return promptly: the caller issues requests in a loop
/// and never waits on their completion.
pub trait DownloadSink: Send + Sync {
    fn download(&self, request: DownloadRequest);
}
