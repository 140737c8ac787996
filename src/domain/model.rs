use std::ffi::OsString;
use std::fmt;
use std::path::PathBuf;

/// What the user wants out of the current URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DownloadMode {
    #[default]
    VideoMp4,
    VideoMkv,
    AudioMp3,
    InstagramPhoto,
}

impl DownloadMode {
    pub const ALL: [DownloadMode; 4] = [
        DownloadMode::VideoMp4,
        DownloadMode::VideoMkv,
        DownloadMode::AudioMp3,
        DownloadMode::InstagramPhoto,
    ];

    /// File extension of the produced file, `None` for photo posts.
    pub fn extension(self) -> Option<&'static str> {
        match self {
            DownloadMode::VideoMp4 => Some("mp4"),
            DownloadMode::VideoMkv => Some("mkv"),
            DownloadMode::AudioMp3 => Some("mp3"),
            DownloadMode::InstagramPhoto => None,
        }
    }

    pub fn is_video(self) -> bool {
        matches!(self, DownloadMode::VideoMp4 | DownloadMode::VideoMkv)
    }
}

impl fmt::Display for DownloadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DownloadMode::VideoMp4 => write!(f, "Video (MP4)"),
            DownloadMode::VideoMkv => write!(f, "Video (MKV)"),
            DownloadMode::AudioMp3 => write!(f, "Audio (MP3)"),
            DownloadMode::InstagramPhoto => write!(f, "IG Photo"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatKind {
    VideoOnly,
    AudioOnly,
    Muxed,
}

/// One selectable stream from the prober output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatOption {
    pub label: String,
    pub id: String,
    pub kind: FormatKind,
}

impl fmt::Display for FormatOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label)
    }
}

/// Formats of the most recently probed URL.
///
/// `video` holds video-only and muxed entries in probe order, which is the
/// list offered in the video picker. Entries are ordered worst to best, as
/// yt-dlp reports them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormatCatalog {
    pub video: Vec<FormatOption>,
    pub audio: Vec<FormatOption>,
}

impl FormatCatalog {
    pub fn push(&mut self, option: FormatOption) {
        match option.kind {
            FormatKind::AudioOnly => self.audio.push(option),
            FormatKind::VideoOnly | FormatKind::Muxed => self.video.push(option),
        }
    }

    pub fn muxed(&self) -> impl Iterator<Item = &FormatOption> {
        self.video.iter().filter(|f| f.kind == FormatKind::Muxed)
    }

    pub fn is_empty(&self) -> bool {
        self.video.is_empty() && self.audio.is_empty()
    }

    pub fn best_video(&self) -> Option<&FormatOption> {
        self.video.last()
    }

    pub fn best_audio(&self) -> Option<&FormatOption> {
        self.audio.last()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct SubtitleTrack {
    pub automatic: bool,
    pub code: String,
    pub name: String,
}

impl SubtitleTrack {
    pub fn label(&self) -> String {
        let tag = if self.automatic { "Auto" } else { "Manual" };
        format!("[{}] {} - {}", tag, self.code, self.name)
    }
}

impl fmt::Display for SubtitleTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// Result of a successful probe.
#[derive(Debug, Clone, PartialEq)]
pub struct MediaInfo {
    pub url: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
    pub formats: FormatCatalog,
    pub subtitles: Vec<SubtitleTrack>,
}

/// Everything the command builder needs, independent of the UI.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest {
    pub url: String,
    pub mode: DownloadMode,
    pub video_id: Option<String>,
    pub audio_id: Option<String>,
    pub subtitles: SubtitleChoice,
    pub output: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SubtitleChoice {
    #[default]
    Off,
    /// Embed every available track except live chat.
    All,
    Language(String),
}

/// A fully built external tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadJob {
    pub program: PathBuf,
    pub args: Vec<OsString>,
    /// Working directory of the child, inherited when `None`.
    pub working_dir: Option<PathBuf>,
    /// File or folder the job produces.
    pub output: PathBuf,
}

/// Decoded thumbnail ready for display.
#[derive(Debug, Clone)]
pub struct Thumbnail {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Analyzing,
    AwaitingSavePath,
    Downloading,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn option(id: &str, kind: FormatKind) -> FormatOption {
        FormatOption {
            label: id.to_string(),
            id: id.to_string(),
            kind,
        }
    }

    #[test]
    fn test_catalog_routes_kinds() {
        let mut catalog = FormatCatalog::default();
        catalog.push(option("18", FormatKind::Muxed));
        catalog.push(option("140", FormatKind::AudioOnly));
        catalog.push(option("137", FormatKind::VideoOnly));

        assert_eq!(catalog.video.len(), 2);
        assert_eq!(catalog.audio.len(), 1);
        assert_eq!(catalog.muxed().map(|f| f.id.as_str()).collect::<Vec<_>>(), ["18"]);
        assert_eq!(catalog.best_video().map(|f| f.id.as_str()), Some("137"));
    }

    #[test]
    fn test_subtitle_label() {
        let track = SubtitleTrack {
            automatic: true,
            code: "en".to_string(),
            name: "English".to_string(),
        };
        assert_eq!(track.label(), "[Auto] en - English");
    }

    #[test]
    fn test_mode_extension() {
        assert_eq!(DownloadMode::VideoMkv.extension(), Some("mkv"));
        assert_eq!(DownloadMode::InstagramPhoto.extension(), None);
        assert!(!DownloadMode::AudioMp3.is_video());
    }
}
