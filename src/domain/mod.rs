pub mod error;
pub mod model;
pub mod run_context;

pub use error::{Result, SyncError};
pub use model::{Course, DownloadRequest, ResourceFile, SyncOutcome, SyncState};
pub use run_context::RunContext;
