use iced::{
    widget::{button, column, row, text, text_input, Space},
    Color, Element, Length,
};

use crate::api::models::DEFAULT_SAVE_PATH;

const COURSE_ERROR_PREFIX: &str = "Error processing ";
const BACKGROUND_INFO: &str = "Sync keeps running while this window stays open.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Idle,
    Syncing,
    Complete,
    Error,
}

impl StatusKind {
    /// Terminal messages (complete, error, stopped, settings changes) end the
    /// syncing display; anything else is progress.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        let is_error = lower.contains("error");
        let is_final = is_error
            || ["complete", "stopped", "cleared", "updated"]
                .iter()
                .any(|word| lower.contains(word));

        match (is_final, is_error) {
            (true, true) => StatusKind::Error,
            (true, false) => StatusKind::Complete,
            (false, _) if lower.contains("no download history") => StatusKind::Idle,
            (false, _) => StatusKind::Syncing,
        }
    }

    fn color(self) -> Color {
        match self {
            StatusKind::Idle => Color::from_rgb(0.45, 0.45, 0.45),
            StatusKind::Syncing => Color::from_rgb(0.15, 0.4, 0.85),
            StatusKind::Complete => Color::from_rgb(0.1, 0.6, 0.3),
            StatusKind::Error => Color::from_rgb(0.8, 0.2, 0.2),
        }
    }
}

/// Popup view state
pub struct PopupView {
    pub status_message: String,
    pub status_kind: StatusKind,
    pub is_syncing: bool,
    pub path_input: String,
    pub current_path: String,
}

impl Default for PopupView {
    fn default() -> Self {
        Self {
            status_message: "Loading...".to_string(),
            status_kind: StatusKind::Idle,
            is_syncing: false,
            path_input: String::new(),
            current_path: DEFAULT_SAVE_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum PopupMessage {
    SyncButtonPressed,
    PathChanged(String),
    BrowsePressed,
    SavePathPressed,
    ClearHistoryPressed,
}

impl PopupView {
    pub fn update(&mut self, message: PopupMessage) {
        match message {
            PopupMessage::PathChanged(path) => {
                self.path_input = path;
            }
            PopupMessage::SavePathPressed => {
                self.path_input.clear();
            }
            PopupMessage::SyncButtonPressed
            | PopupMessage::BrowsePressed
            | PopupMessage::ClearHistoryPressed => {
                // Will be handled by the app
            }
        }
    }

    pub fn apply_status(&mut self, message: String) {
        self.status_kind = StatusKind::classify(&message);
        self.is_syncing = match self.status_kind {
            StatusKind::Syncing => true,
            // One failed course does not end the run.
            StatusKind::Error if message.starts_with(COURSE_ERROR_PREFIX) => self.is_syncing,
            _ => false,
        };
        self.status_message = message;
    }

    pub fn set_status(&mut self, message: impl Into<String>, kind: StatusKind) {
        self.status_message = message.into();
        self.status_kind = kind;
    }

    pub fn view(&self) -> Element<'_, PopupMessage> {
        let sync_label = if self.is_syncing {
            "Stop Sync"
        } else {
            "Sync All Course Files"
        };
        let background_info = if self.is_syncing { BACKGROUND_INFO } else { "" };

        column![
            text("Course Sync").size(28),
            Space::new().height(Length::Fixed(10.0)),
            text(&self.status_message)
                .size(14)
                .color(self.status_kind.color()),
            button(sync_label)
                .on_press(PopupMessage::SyncButtonPressed)
                .padding([10, 20]),
            text(background_info).size(12),
            Space::new().height(Length::Fixed(20.0)),
            text("Save folder:").size(16),
            text(format!("Current: {}", self.current_path)).size(12),
            row![
                text_input(&self.current_path, &self.path_input)
                    .on_input(PopupMessage::PathChanged)
                    .on_submit(PopupMessage::SavePathPressed)
                    .padding(8),
                button("Browse").on_press(PopupMessage::BrowsePressed),
                button("Save").on_press(PopupMessage::SavePathPressed),
            ]
            .spacing(8),
            Space::new().height(Length::Fixed(10.0)),
            button("Clear download history").on_press(PopupMessage::ClearHistoryPressed),
        ]
        .padding(20)
        .spacing(10)
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(StatusKind::classify("Starting sync"), StatusKind::Syncing);
        assert_eq!(StatusKind::classify("Processing 3 courses"), StatusKind::Syncing);
        assert_eq!(
            StatusKind::classify("Sync complete. Downloaded 1 new file(s)."),
            StatusKind::Complete
        );
        assert_eq!(StatusKind::classify("Sync stopped by user."), StatusKind::Complete);
        assert_eq!(
            StatusKind::classify("Error: HTTP error! status: 500"),
            StatusKind::Error
        );
        assert_eq!(
            StatusKind::classify("Error processing Course One"),
            StatusKind::Error
        );
        assert_eq!(
            StatusKind::classify("Status: No download history to clear."),
            StatusKind::Idle
        );
    }

    #[test]
    fn test_apply_status_toggles_syncing() {
        let mut view = PopupView::default();
        view.apply_status("Starting sync".to_string());
        assert!(view.is_syncing);

        view.apply_status("Sync complete. Downloaded 0 new file(s).".to_string());
        assert!(!view.is_syncing);
        assert_eq!(view.status_kind, StatusKind::Complete);
    }

    #[test]
    fn test_course_error_keeps_sync_running() {
        let mut view = PopupView::default();
        view.apply_status("Processing 2 courses".to_string());
        view.apply_status("Error processing Course Two".to_string());

        assert!(view.is_syncing);
        assert_eq!(view.status_kind, StatusKind::Error);
    }
}
