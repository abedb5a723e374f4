use crate::api::SyncConfig;
use crate::application::{self, Command, SyncRuntime};
use crate::domain::SyncState;
use crate::ui::{PopupMessage, PopupView, StatusKind};
use futures::StreamExt;
use iced::Task;
use std::sync::Arc;
use tracing::{error, info};

pub struct SyncApp {
    view: PopupView,
    runtime: Option<Arc<SyncRuntime>>,
}

impl SyncApp {
    pub fn new() -> (Self, Task<Message>) {
        let config = SyncConfig::from_env();
        info!("Portal: {}", config.base_url);

        let app = Self {
            view: PopupView::default(),
            runtime: None,
        };

        // Store and browser wiring happen on the async executor.
        let boot = Task::perform(
            async move {
                application::bootstrap(config)
                    .await
                    .map(Arc::new)
                    .map_err(|e| e.to_string())
            },
            Message::Booted,
        );
        (app, boot)
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(PopupMessage),
    Booted(Result<Arc<SyncRuntime>, String>),
    /// Status line pushed by the orchestrator
    StatusUpdated(String),
    /// (Save path, persisted sync state)
    SettingsLoaded(Result<(String, SyncState), String>),
    FolderPicked(Option<String>),
    CommandFinished,
}

/// Run a command to completion on the executor; its progress arrives as status lines.
fn run_command(runtime: &Arc<SyncRuntime>, command: Command) -> Task<Message> {
    let runtime = Arc::clone(runtime);
    Task::perform(
        async move {
            let is_sync = command == Command::SyncAllCourses;
            runtime.orchestrator.handle(command).await;
            if !is_sync {
                return;
            }
            let orchestrator = &runtime.orchestrator;
            if runtime
                .browser
                .shutdown_unless(|| orchestrator.is_syncing())
                .await
            {
                let (saved, failed) = runtime.downloads.drain().await;
                info!("Downloads settled: {} saved, {} failed", saved, failed);
            }
        },
        |_| Message::CommandFinished,
    )
}

fn load_settings(runtime: &Arc<SyncRuntime>) -> Task<Message> {
    let runtime = Arc::clone(runtime);
    Task::perform(
        async move {
            let history = runtime.orchestrator.history();
            let save_path = history.save_path().await.map_err(|e| e.to_string())?;
            let state = history.sync_state().await.map_err(|e| e.to_string())?;
            Ok::<_, String>((save_path, state))
        },
        Message::SettingsLoaded,
    )
}

pub fn update(app: &mut SyncApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            let save_input = app.view.path_input.clone();
            app.view.update(ui_msg.clone());

            if let PopupMessage::BrowsePressed = ui_msg {
                return Task::perform(
                    async {
                        rfd::AsyncFileDialog::new()
                            .pick_folder()
                            .await
                            .map(|handle| handle.path().display().to_string())
                    },
                    Message::FolderPicked,
                );
            }

            let Some(runtime) = app.runtime.as_ref() else {
                app.view
                    .set_status("Still starting up, please wait...", StatusKind::Idle);
                return Task::none();
            };

            match ui_msg {
                PopupMessage::SyncButtonPressed => {
                    let command = if app.view.is_syncing {
                        Command::StopSync
                    } else {
                        Command::SyncAllCourses
                    };
                    return run_command(runtime, command);
                }
                PopupMessage::SavePathPressed => {
                    return run_command(runtime, Command::SetSavePath(save_input))
                        .chain(load_settings(runtime));
                }
                PopupMessage::ClearHistoryPressed => {
                    return run_command(runtime, Command::ClearHistory);
                }
                PopupMessage::PathChanged(_) | PopupMessage::BrowsePressed => {}
            }
        }
        Message::Booted(result) => match result {
            Ok(runtime) => {
                // Status lines flow in for as long as the window lives.
                let statuses = runtime
                    .notifier
                    .attach()
                    .map(Message::StatusUpdated);
                let settings = load_settings(&runtime);
                app.runtime = Some(runtime);
                app.view.set_status("Ready", StatusKind::Idle);
                return Task::batch([Task::stream(statuses), settings]);
            }
            Err(e) => {
                error!("Startup failed: {}", e);
                app.view
                    .set_status(format!("Error: {}", e), StatusKind::Error);
            }
        },
        Message::StatusUpdated(status) => {
            app.view.apply_status(status);
        }
        Message::SettingsLoaded(result) => match result {
            Ok((save_path, state)) => {
                app.view.current_path = save_path;
                let running = app
                    .runtime
                    .as_ref()
                    .is_some_and(|runtime| runtime.orchestrator.is_syncing());
                if state == SyncState::Syncing && running && !app.view.is_syncing {
                    app.view.is_syncing = true;
                    app.view
                        .set_status("Sync in progress...", StatusKind::Syncing);
                }
            }
            Err(e) => {
                app.view
                    .set_status(format!("Error: {}", e), StatusKind::Error);
            }
        },
        Message::FolderPicked(folder) => {
            // User cancelled dialog otherwise
            if let Some(folder) = folder {
                app.view.path_input = folder;
            }
        }
        Message::CommandFinished => {}
    }
    Task::none()
}

pub fn view(app: &SyncApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}
