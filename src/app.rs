use crate::api::{ApiClient, ApiConfig, UpdateInfo};
use crate::application::download_coordinator::{confirm, show_message, suggested_filename};
use crate::application::{DownloadCoordinator, DownloadEvent};
use crate::domain::{
    AppError, DownloadMode, DownloadRequest, MediaInfo, Phase, SubtitleChoice, Thumbnail,
};
use crate::storage::{Preferences, DEFAULT_THEME};
use crate::tools::ToolPaths;
use crate::ui::{DownloadMessage, DownloadView};
use crate::utils::{classify_url, normalize_threads_url, UrlKind};
use iced::{window, Subscription, Task, Theme};
use rfd::MessageLevel;
use std::path::PathBuf;
use std::time::Duration;

const ANALYSIS_DEBOUNCE: Duration = Duration::from_millis(800);
const LOG_FLUSH_INTERVAL: Duration = Duration::from_millis(100);
const UPDATE_CHECK_DELAY: Duration = Duration::from_secs(1);

pub struct DownloadApp {
    view: DownloadView,
    coordinator: DownloadCoordinator,
    /// Lines waiting for the next log flush.
    pending_log: Vec<String>,
    /// Bumped on every URL edit so stale debounce timers are ignored.
    debounce_generation: u64,
    last_analyzed_url: String,
    /// Request waiting for the save dialog to return a path.
    pending_request: Option<DownloadRequest>,
}

impl DownloadApp {
    pub fn new() -> (Self, Task<Message>) {
        let prefs = Preferences::load();
        let coordinator = DownloadCoordinator::new(
            ApiClient::new(ApiConfig::default()),
            ToolPaths::discover(),
        );

        let mut view = DownloadView::default();
        view.save_dir = prefs.save_path;
        view.embed_subs = prefs.embed_subs;
        view.theme = theme_by_name(&prefs.theme);

        let app = Self {
            view,
            coordinator: coordinator.clone(),
            pending_log: Vec::new(),
            debounce_generation: 0,
            last_analyzed_url: String::new(),
            pending_request: None,
        };

        let update_check = Task::perform(
            async move {
                tokio::time::sleep(UPDATE_CHECK_DELAY).await;
                coordinator.check_for_update().await
            },
            Message::UpdateChecked,
        );
        (app, update_check)
    }

    fn log(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.pending_log.push(message.trim().to_string());
    }

    fn preferences(&self) -> Preferences {
        Preferences {
            save_path: self.view.save_dir.clone(),
            theme: self.view.theme.to_string(),
            embed_subs: self.view.embed_subs,
        }
    }

    fn on_url_changed(&mut self) -> Task<Message> {
        let url = self.view.url.trim().to_string();
        if url.is_empty() {
            return Task::none();
        }
        self.debounce_generation += 1;

        // Formats always belong to the URL they were probed from.
        if self.view.media.as_ref().is_some_and(|m| m.url != url) {
            self.view.clear_media();
        }

        match classify_url(&url) {
            UrlKind::InstagramPost => {
                self.view.mode = DownloadMode::InstagramPhoto;
                Task::none()
            }
            UrlKind::Media => {
                if self.view.mode == DownloadMode::InstagramPhoto {
                    self.view.mode = DownloadMode::VideoMp4;
                }
                // Back on an analyzed URL whose formats were cleared by an edit.
                if url == self.last_analyzed_url && self.view.media.is_some() {
                    return Task::none();
                }
                let generation = self.debounce_generation;
                Task::perform(tokio::time::sleep(ANALYSIS_DEBOUNCE), move |_| {
                    Message::AnalyzeDebounced(generation)
                })
            }
        }
    }

    fn start_analysis(&mut self) -> Task<Message> {
        if self.view.is_busy() || self.view.mode == DownloadMode::InstagramPhoto {
            return Task::none();
        }
        let mut url = self.view.url.trim().to_string();
        if url.is_empty() {
            return Task::none();
        }

        let normalized = normalize_threads_url(&url);
        if normalized != url {
            url = normalized;
            self.view.url = url.clone();
        }

        self.view.phase = Phase::Analyzing;
        self.view.thumbnail = None;
        self.view.thumbnail_text = "Loading...".to_string();
        self.last_analyzed_url = url.clone();
        self.log("Auto-analyzing...");

        let coordinator = self.coordinator.clone();
        Task::perform(
            async move {
                let result = coordinator.analyze(url.clone()).await;
                (url, result)
            },
            |(url, result)| Message::AnalysisFinished(url, result),
        )
    }

    fn start_download(&mut self) -> Task<Message> {
        if self.view.is_busy() {
            return Task::none();
        }
        let url = self.view.url.trim().to_string();

        if self.view.mode == DownloadMode::InstagramPhoto {
            if self.view.save_dir.as_os_str().is_empty() {
                return error_dialog("Select save dir.".to_string());
            }
            self.view.phase = Phase::Downloading;
            let stream = self.coordinator.photo_stream(&url, &self.view.save_dir);
            return Task::run(stream, Message::Download);
        }

        let Some(media) = &self.view.media else {
            return error_dialog(AppError::NothingSelected.to_string());
        };

        let video_id = if self.view.mode.is_video() {
            match self.view.video_choice.as_ref().or(media.formats.best_video()) {
                Some(format) => Some(format.id.clone()),
                None => return error_dialog(AppError::NothingSelected.to_string()),
            }
        } else {
            None
        };
        let subtitles = match (self.view.embed_subs, &self.view.subtitle_choice) {
            (false, _) => SubtitleChoice::Off,
            (true, Some(track)) => SubtitleChoice::Language(track.code.clone()),
            (true, None) => SubtitleChoice::All,
        };

        let Some(extension) = self.view.mode.extension() else {
            return Task::none();
        };
        let filename = suggested_filename(&media.title, self.view.mode)
            .unwrap_or_else(|| format!("download.{}", extension));

        self.pending_request = Some(DownloadRequest {
            url: media.url.clone(),
            mode: self.view.mode,
            video_id,
            audio_id: self.view.audio_choice.as_ref().map(|f| f.id.clone()),
            subtitles,
            output: PathBuf::new(),
        });
        self.view.phase = Phase::AwaitingSavePath;

        let coordinator = self.coordinator.clone();
        let directory = self.view.save_dir.clone();
        Task::perform(
            async move {
                coordinator
                    .choose_save_path(directory, filename, extension)
                    .await
            },
            Message::SavePathSelected,
        )
    }

    fn finish_download(&mut self, event: DownloadEvent) -> Task<Message> {
        match event {
            DownloadEvent::Log(line) => {
                self.log(line);
                Task::none()
            }
            DownloadEvent::Progress(progress) => {
                self.view.progress = progress.clamp(0.0, 100.0);
                Task::none()
            }
            DownloadEvent::Completed { output, message } => {
                tracing::info!("finished {}", output.display());
                self.view.phase = Phase::Idle;
                self.view.progress = 100.0;
                self.log("Complete!");
                self.reset_form();
                info_dialog(message)
            }
            DownloadEvent::Failed(e) => {
                self.view.phase = Phase::Idle;
                self.view.progress = 0.0;
                self.log(format!("Error: {}", e));
                let text = match e {
                    AppError::ProcessFailed(_) => "Download failed.".to_string(),
                    other => other.to_string(),
                };
                // The URL may have been edited while the download ran.
                let reanalyze = if self.view.url.trim() != self.last_analyzed_url {
                    self.start_analysis()
                } else {
                    Task::none()
                };
                Task::batch([error_dialog(text), reanalyze])
            }
        }
    }

    fn reset_form(&mut self) {
        self.view.url.clear();
        self.view.clear_media();
        self.last_analyzed_url.clear();
        if self.view.mode == DownloadMode::InstagramPhoto {
            self.view.mode = DownloadMode::VideoMp4;
        }
    }
}

#[derive(Debug, Clone)]
pub enum Message {
    UiMessage(DownloadMessage),
    AnalyzeDebounced(u64),
    /// (Probed URL, result)
    AnalysisFinished(String, Result<MediaInfo, AppError>),
    /// (Thumbnail URL, result)
    ThumbnailLoaded(String, Result<Thumbnail, AppError>),
    SavePathSelected(Option<PathBuf>),
    FolderSelected(Option<PathBuf>),
    Download(DownloadEvent),
    WindowFocused,
    ClipboardRead(Option<String>),
    FlushLog,
    UpdateChecked(Option<UpdateInfo>),
    UpdateAnswered(bool, String),
    DialogClosed,
    CloseRequested,
}

pub fn update(app: &mut DownloadApp, message: Message) -> Task<Message> {
    match message {
        Message::UiMessage(ui_msg) => {
            app.view.update(ui_msg.clone());

            match ui_msg {
                DownloadMessage::UrlChanged(_) => return app.on_url_changed(),
                DownloadMessage::AnalyzePressed => return app.start_analysis(),
                DownloadMessage::DownloadPressed => return app.start_download(),
                DownloadMessage::BrowsePressed => {
                    let coordinator = app.coordinator.clone();
                    let directory = app.view.save_dir.clone();
                    return Task::perform(
                        async move { coordinator.choose_folder(directory).await },
                        Message::FolderSelected,
                    );
                }
                _ => {}
            }
        }
        Message::AnalyzeDebounced(generation) => {
            if generation == app.debounce_generation {
                return app.start_analysis();
            }
        }
        Message::AnalysisFinished(url, result) => {
            app.view.phase = Phase::Idle;
            if url != app.view.url.trim() {
                // The input changed while yt-dlp was running.
                tracing::debug!("discarding analysis of {}, URL changed meanwhile", url);
                app.view.thumbnail_text = "No Thumbnail".to_string();
                return app.start_analysis();
            }
            match result {
                Ok(info) => {
                    app.log(format!("Analysis complete: {}", info.title));
                    let thumbnail_url = info.thumbnail_url.clone();
                    app.view.set_media(info);
                    app.view.thumbnail_text = "No Thumbnail".to_string();

                    if let Some(thumbnail_url) = thumbnail_url {
                        let coordinator = app.coordinator.clone();
                        return Task::perform(
                            async move {
                                let result = coordinator.fetch_thumbnail(thumbnail_url.clone()).await;
                                (thumbnail_url, result)
                            },
                            |(url, result)| Message::ThumbnailLoaded(url, result),
                        );
                    }
                }
                Err(e) => {
                    tracing::warn!("analysis of {} failed: {}", url, e);
                    app.log(format!("Analysis error: {}", e));
                    app.view.thumbnail_text = "Error loading info".to_string();
                }
            }
        }
        Message::ThumbnailLoaded(url, result) => {
            let current = app.view.media.as_ref().and_then(|m| m.thumbnail_url.as_deref());
            if current != Some(url.as_str()) {
                return Task::none();
            }
            match result {
                Ok(thumbnail) => app.view.set_thumbnail(thumbnail),
                Err(e) => {
                    app.log(format!("Thumbnail error: {}", e));
                    app.view.thumbnail = None;
                    app.view.thumbnail_text = "(No Thumbnail)".to_string();
                }
            }
        }
        Message::SavePathSelected(path_opt) => {
            let request = app.pending_request.take();
            match (path_opt, request) {
                (Some(path), Some(mut request)) => {
                    request.output = path;
                    app.view.progress = 0.0;
                    app.view.phase = Phase::Downloading;
                    app.log("Downloading...");
                    let stream = app.coordinator.download_stream(&request);
                    return Task::run(stream, Message::Download);
                }
                _ => {
                    // User cancelled dialog
                    app.view.phase = Phase::Idle;
                }
            }
        }
        Message::FolderSelected(path_opt) => {
            if let Some(path) = path_opt {
                app.log(format!("Save directory: {}", path.display()));
                app.view.save_dir = path;
            }
        }
        Message::Download(event) => return app.finish_download(event),
        Message::WindowFocused => {
            return iced::clipboard::read().map(Message::ClipboardRead);
        }
        Message::ClipboardRead(content) => {
            let Some(content) = content.map(|c| c.trim().to_string()) else {
                return Task::none();
            };
            if content.starts_with("http")
                && content != app.view.url
                && content != app.last_analyzed_url
                && !app.view.is_busy()
            {
                app.log(format!("Pasted: {}", content));
                app.view.url = content;
                return app.on_url_changed();
            }
        }
        Message::FlushLog => {
            let lines = std::mem::take(&mut app.pending_log);
            app.view.append_log(lines);
        }
        Message::UpdateChecked(Some(update)) => {
            tracing::info!("update {} available", update.version);
            let question = format!("New version {} available!\nDownload now?", update.version);
            let page_url = update.page_url;
            return Task::perform(
                confirm("Update Available".to_string(), question),
                move |accepted| Message::UpdateAnswered(accepted, page_url),
            );
        }
        Message::UpdateChecked(None) => {}
        Message::UpdateAnswered(accepted, page_url) => {
            if accepted {
                if let Err(e) = open::that(&page_url) {
                    tracing::warn!("could not open {}: {}", page_url, e);
                    app.log(format!("Could not open browser: {}", e));
                }
            }
        }
        Message::DialogClosed => {}
        Message::CloseRequested => {
            if let Err(e) = app.preferences().save() {
                tracing::warn!("failed to save preferences: {}", e);
            }
            return iced::exit();
        }
    }
    Task::none()
}

pub fn view(app: &DownloadApp) -> iced::Element<'_, Message> {
    app.view.view().map(Message::UiMessage)
}

pub fn title(app: &DownloadApp) -> String {
    match &app.view.media {
        Some(media) => media.title.clone(),
        None => format!(
            "Universal Video & IG Photo Downloader (v{})",
            env!("CARGO_PKG_VERSION")
        ),
    }
}

pub fn theme(app: &DownloadApp) -> Theme {
    app.view.theme.clone()
}

pub fn subscription(app: &DownloadApp) -> Subscription<Message> {
    let focus = iced::event::listen_with(|event, _status, _window| match event {
        iced::Event::Window(window::Event::Focused) => Some(Message::WindowFocused),
        _ => None,
    });
    let close = window::close_requests().map(|_| Message::CloseRequested);

    let flush = if app.pending_log.is_empty() {
        Subscription::none()
    } else {
        iced::time::every(LOG_FLUSH_INTERVAL).map(|_| Message::FlushLog)
    };

    Subscription::batch([focus, close, flush])
}

fn theme_by_name(name: &str) -> Theme {
    Theme::ALL
        .iter()
        .find(|theme| theme.to_string() == name)
        .or_else(|| Theme::ALL.iter().find(|theme| theme.to_string() == DEFAULT_THEME))
        .cloned()
        .unwrap_or(Theme::Dark)
}

fn info_dialog(description: String) -> Task<Message> {
    Task::perform(
        show_message(MessageLevel::Info, "Success".to_string(), description),
        |_| Message::DialogClosed,
    )
}

fn error_dialog(description: String) -> Task<Message> {
    Task::perform(
        show_message(MessageLevel::Error, "Error".to_string(), description),
        |_| Message::DialogClosed,
    )
}
