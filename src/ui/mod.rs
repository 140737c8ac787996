use std::collections::VecDeque;
use std::path::PathBuf;

use iced::{
    widget::{
        button, column, container, image, pick_list, progress_bar, radio, row, scrollable, text,
        text_input, toggler, Space,
    },
    Element, Font, Length, Theme,
};

use crate::domain::{DownloadMode, FormatOption, MediaInfo, Phase, SubtitleTrack, Thumbnail};

const MAX_LOG_LINES: usize = 1000;
const NO_THUMBNAIL: &str = "No Thumbnail";

/// Main view state
pub struct DownloadView {
    pub url: String,
    pub mode: DownloadMode,
    pub phase: Phase,
    pub media: Option<MediaInfo>,
    pub video_choice: Option<FormatOption>,
    pub audio_choice: Option<FormatOption>,
    pub embed_subs: bool,
    pub subtitle_choice: Option<SubtitleTrack>,
    pub theme: Theme,
    pub save_dir: PathBuf,
    pub progress: f32,
    pub thumbnail: Option<image::Handle>,
    pub thumbnail_text: String,
    log: VecDeque<String>,
}

impl Default for DownloadView {
    fn default() -> Self {
        Self {
            url: String::new(),
            mode: DownloadMode::default(),
            phase: Phase::Idle,
            media: None,
            video_choice: None,
            audio_choice: None,
            embed_subs: false,
            subtitle_choice: None,
            theme: Theme::Dark,
            save_dir: PathBuf::new(),
            progress: 0.0,
            thumbnail: None,
            thumbnail_text: NO_THUMBNAIL.to_string(),
            log: VecDeque::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum DownloadMessage {
    UrlChanged(String),
    ModeSelected(DownloadMode),
    VideoFormatSelected(FormatOption),
    AudioFormatSelected(FormatOption),
    EmbedSubsToggled(bool),
    SubtitleSelected(SubtitleTrack),
    ThemeSelected(Theme),
    AnalyzePressed,
    BrowsePressed,
    DownloadPressed,
}

impl DownloadView {
    pub fn update(&mut self, message: DownloadMessage) {
        match message {
            DownloadMessage::UrlChanged(url) => {
                self.url = url;
            }
            DownloadMessage::ModeSelected(mode) => {
                self.mode = mode;
            }
            DownloadMessage::VideoFormatSelected(format) => {
                self.video_choice = Some(format);
            }
            DownloadMessage::AudioFormatSelected(format) => {
                self.audio_choice = Some(format);
            }
            DownloadMessage::EmbedSubsToggled(enabled) => {
                self.embed_subs = enabled;
            }
            DownloadMessage::SubtitleSelected(track) => {
                self.subtitle_choice = Some(track);
            }
            DownloadMessage::ThemeSelected(theme) => {
                self.theme = theme;
            }
            DownloadMessage::AnalyzePressed
            | DownloadMessage::BrowsePressed
            | DownloadMessage::DownloadPressed => {
                // Will be handled by the app
            }
        }
    }

    /// Replace every probe derived field; best formats are preselected.
    pub fn set_media(&mut self, info: MediaInfo) {
        self.video_choice = info.formats.best_video().cloned();
        self.audio_choice = info.formats.best_audio().cloned();
        self.subtitle_choice = info.subtitles.first().cloned();
        self.media = Some(info);
    }

    pub fn clear_media(&mut self) {
        self.media = None;
        self.video_choice = None;
        self.audio_choice = None;
        self.subtitle_choice = None;
        self.thumbnail = None;
        self.thumbnail_text = NO_THUMBNAIL.to_string();
    }

    pub fn set_thumbnail(&mut self, thumbnail: Thumbnail) {
        self.thumbnail = Some(image::Handle::from_rgba(
            thumbnail.width,
            thumbnail.height,
            thumbnail.rgba,
        ));
        self.thumbnail_text.clear();
    }

    pub fn is_busy(&self) -> bool {
        self.phase != Phase::Idle
    }

    pub fn has_formats(&self) -> bool {
        self.media.as_ref().is_some_and(|m| !m.formats.is_empty())
    }

    pub fn append_log(&mut self, lines: impl IntoIterator<Item = String>) {
        self.log.extend(lines);
        while self.log.len() > MAX_LOG_LINES {
            self.log.pop_front();
        }
    }

    pub fn log_lines(&self) -> impl Iterator<Item = &str> {
        self.log.iter().map(String::as_str)
    }

    fn can_download(&self) -> bool {
        !self.is_busy() && (self.mode == DownloadMode::InstagramPhoto || self.has_formats())
    }

    fn subtitles(&self) -> &[SubtitleTrack] {
        match &self.media {
            Some(media) => &media.subtitles,
            None => &[],
        }
    }

    pub fn view(&self) -> Element<'_, DownloadMessage> {
        column![
            self.input_section(),
            self.options_section(),
            row![self.formats_section(), self.preview_section()].spacing(15),
            button(text("Start Download").size(18))
                .on_press_maybe(self.can_download().then_some(DownloadMessage::DownloadPressed))
                .padding([10, 20])
                .width(Length::Fill),
            progress_bar(0.0..=100.0, self.progress),
            self.log_section(),
        ]
        .padding(20)
        .spacing(15)
        .into()
    }

    fn input_section(&self) -> Element<'_, DownloadMessage> {
        let analyze_enabled = !self.is_busy() && self.mode != DownloadMode::InstagramPhoto;

        row![
            text("URL:").size(16),
            text_input("Paste a YouTube, Instagram, Threads or Facebook link...", &self.url)
                .on_input(DownloadMessage::UrlChanged)
                .padding(10),
            button("Analyze")
                .on_press_maybe(analyze_enabled.then_some(DownloadMessage::AnalyzePressed))
                .padding([10, 20]),
        ]
        .spacing(10)
        .align_y(iced::alignment::Vertical::Center)
        .into()
    }

    fn options_section(&self) -> Element<'_, DownloadMessage> {
        let subs_enabled = self.mode != DownloadMode::InstagramPhoto && !self.is_busy();
        let mut subs_toggle = toggler(self.embed_subs).label("Embed Subtitles");
        if subs_enabled {
            subs_toggle = subs_toggle.on_toggle(DownloadMessage::EmbedSubsToggled);
        }

        let languages: Element<'_, DownloadMessage> = match &self.media {
            None => text("Analyze to see subtitles").size(14).into(),
            Some(_) if self.subtitles().is_empty() => text("No Subtitles").size(14).into(),
            Some(_) if subs_enabled && self.embed_subs => pick_list(
                self.subtitles(),
                self.subtitle_choice.clone(),
                DownloadMessage::SubtitleSelected,
            )
            .width(Length::Fixed(240.0))
            .into(),
            Some(_) => text(
                self.subtitle_choice
                    .as_ref()
                    .map(SubtitleTrack::label)
                    .unwrap_or_default(),
            )
            .size(14)
            .into(),
        };

        column![
            row![
                subs_toggle,
                languages,
                Space::new().width(Length::Fill),
                text("Theme:").size(14),
                pick_list(
                    Theme::ALL,
                    Some(self.theme.clone()),
                    DownloadMessage::ThemeSelected
                ),
            ]
            .spacing(10)
            .align_y(iced::alignment::Vertical::Center),
            row![
                text("Save to:").size(14),
                text(self.save_dir.display().to_string()).size(14),
                Space::new().width(Length::Fill),
                button("Browse")
                    .on_press_maybe((!self.is_busy()).then_some(DownloadMessage::BrowsePressed)),
            ]
            .spacing(10)
            .align_y(iced::alignment::Vertical::Center),
        ]
        .spacing(10)
        .into()
    }

    fn formats_section(&self) -> Element<'_, DownloadMessage> {
        let modes = DownloadMode::ALL.iter().fold(row![].spacing(15), |modes, mode| {
            modes.push(radio(
                mode.to_string(),
                *mode,
                Some(self.mode),
                DownloadMessage::ModeSelected,
            ))
        });

        let (video, audio): (&[FormatOption], &[FormatOption]) = match &self.media {
            Some(media) => (&media.formats.video, &media.formats.audio),
            None => (&[][..], &[][..]),
        };

        column![
            text("Mode:").size(16),
            modes,
            text("Video:").size(16),
            pick_list(
                video,
                self.video_choice.clone(),
                DownloadMessage::VideoFormatSelected
            )
            .width(Length::Fill),
            text("Audio:").size(16),
            pick_list(
                audio,
                self.audio_choice.clone(),
                DownloadMessage::AudioFormatSelected
            )
            .width(Length::Fill),
        ]
        .spacing(8)
        .width(Length::Fill)
        .into()
    }

    fn preview_section(&self) -> Element<'_, DownloadMessage> {
        let content: Element<'_, DownloadMessage> = match &self.thumbnail {
            Some(handle) => image(handle.clone()).into(),
            None => text(self.thumbnail_text.as_str()).size(14).into(),
        };

        container(content)
            .center_x(Length::Fixed(320.0))
            .center_y(Length::Fixed(180.0))
            .into()
    }

    fn log_section(&self) -> Element<'_, DownloadMessage> {
        let lines = self
            .log_lines()
            .fold(column![].spacing(2), |lines, line| {
                lines.push(text(line).size(12).font(Font::MONOSPACE))
            });

        scrollable(lines)
            .anchor_bottom()
            .height(Length::Fill)
            .width(Length::Fill)
            .into()
    }
}
