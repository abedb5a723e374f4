use futures::channel::mpsc::{self, UnboundedReceiver, UnboundedSender};
use parking_lot::Mutex;
use tracing::{info, warn};

const APP_NAME: &str = "Course Sync";

/// Delivers human-readable progress to whoever is watching.
pub trait Notifier: Send + Sync {
    /// Best-effort status line for an attached observer.
    fn status(&self, message: &str);

    /// System-level notification.
    fn notify(&self, title: &str, body: &str);
}

/// Status lines go to at most one attached UI observer, notifications to the desktop.
pub struct PopupNotifier {
    observer: Mutex<Option<UnboundedSender<String>>>,
    system_notifications: bool,
}

impl PopupNotifier {
    pub fn new(system_notifications: bool) -> Self {
        Self {
            observer: Mutex::new(None),
            system_notifications,
        }
    }

    /// Attach a new observer, replacing any previous one.
    pub fn attach(&self) -> UnboundedReceiver<String> {
        let (tx, rx) = mpsc::unbounded();
        *self.observer.lock() = Some(tx);
        rx
    }
}

impl Notifier for PopupNotifier {
    fn status(&self, message: &str) {
        info!("{}", message);

        let mut observer = self.observer.lock();
        let closed = match observer.as_ref() {
            Some(tx) => tx.unbounded_send(message.to_string()).is_err(),
            None => false,
        };
        if closed {
            *observer = None;
        }
    }

    fn notify(&self, title: &str, body: &str) {
        if !self.system_notifications {
            return;
        }

        let title = title.to_string();
        let body = body.to_string();
        let show = move || {
            if let Err(e) = notify_rust::Notification::new()
                .appname(APP_NAME)
                .summary(&title)
                .body(&body)
                .show()
            {
                warn!("Failed to show notification {:?}: {}", title, e);
            }
        };

        // Some platforms block until the notification daemon answers.
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn_blocking(show);
            }
            Err(_) => show(),
        }
    }
}
