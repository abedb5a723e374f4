mod api;
mod app;
mod application;
mod domain;
mod download;
mod notify;
mod render;
mod scrape;
mod store;
mod ui;
mod utils;

#[cfg(test)]
mod test_support;

use iced::window;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    iced::application(app::SyncApp::new, app::update, app::view)
        .title("Course Sync")
        .window(window::Settings {
            size: iced::Size::new(420.0, 520.0),
            ..Default::default()
        })
        .run()
}
