use tracing::{error, info};

use super::SyncOrchestrator;

/// Triggers accepted from the UI. Callers fire them off without waiting for a
/// result; progress comes back through the notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SyncAllCourses,
    StopSync,
    SetSavePath(String),
    ClearHistory,
}

impl SyncOrchestrator {
    pub async fn handle(&self, command: Command) {
        match command {
            Command::SyncAllCourses => {
                let outcome = self.start().await;
                info!("Sync finished: {:?}", outcome);
            }
            Command::StopSync => {
                self.stop().await;
            }
            Command::SetSavePath(path) => match self.history().set_save_path(&path).await {
                Ok(saved) => {
                    info!("Save folder set to {}", saved);
                    self.notifier().status("Status: Save folder updated.");
                }
                Err(e) => {
                    error!("Failed to save folder setting: {}", e);
                    self.notifier().status(&format!("Error: {e}"));
                }
            },
            Command::ClearHistory => match self.history().clear_history().await {
                Ok(0) => self.notifier().status("Status: No download history to clear."),
                Ok(_) => self.notifier().status("Status: Download history cleared."),
                Err(e) => {
                    error!("Failed to clear download history: {}", e);
                    self.notifier().status(&format!("Error: {e}"));
                }
            },
        }
    }
}
