mod api;
mod app;
mod application;
mod domain;
mod storage;
mod tools;
mod ui;
mod utils;

use iced::{window, Size};
use tracing_subscriber::EnvFilter;

fn main() -> iced::Result {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("media_grabber=info")),
        )
        .init();

    iced::application(app::DownloadApp::new, app::update, app::view)
        .title(app::title)
        .theme(app::theme)
        .subscription(app::subscription)
        .window(window::Settings {
            size: Size::new(900.0, 850.0),
            // preferences are written before the window goes away
            exit_on_close_request: false,
            ..Default::default()
        })
        .run()
}
