use std::collections::BTreeMap;
use std::ffi::OsString;
use std::process::Stdio;

use serde::Deserialize;

use super::process::command;
use super::ToolPaths;
use crate::domain::{
    AppError, DownloadJob, DownloadMode, DownloadRequest, FormatCatalog, FormatKind, FormatOption,
    MediaInfo, SubtitleChoice, SubtitleTrack,
};

/// Seconds yt-dlp waits between subtitle requests.
const SUBTITLE_SLEEP_SECS: &str = "2";
const ALL_SUBTITLES: &str = "all,-live_chat";
const JS_RUNTIME: &str = "node";
const UNKNOWN: &str = "N/A";

#[derive(Debug, Deserialize)]
struct RawInfo {
    title: Option<String>,
    thumbnail: Option<String>,
    #[serde(default)]
    formats: Option<Vec<RawFormat>>,
    #[serde(default)]
    subtitles: Option<BTreeMap<String, Vec<RawSubtitle>>>,
    #[serde(default)]
    automatic_captions: Option<BTreeMap<String, Vec<RawSubtitle>>>,
}

#[derive(Debug, Deserialize)]
struct RawFormat {
    format_id: String,
    ext: Option<String>,
    vcodec: Option<String>,
    acodec: Option<String>,
    height: Option<u32>,
    /// Kept as a JSON number so `128.0` still prints as `128.0`.
    abr: Option<serde_json::Number>,
    filesize: Option<f64>,
    filesize_approx: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawSubtitle {
    name: Option<String>,
}

pub fn probe_args(url: &str) -> Vec<OsString> {
    ["--dump-json", url, "--js-runtimes", JS_RUNTIME, "--playlist-items", "1"]
        .into_iter()
        .map(OsString::from)
        .collect()
}

/// Run yt-dlp once in metadata mode and parse what it prints.
pub async fn probe(paths: &ToolPaths, url: &str) -> Result<MediaInfo, AppError> {
    let output = command(&paths.ytdlp)
        .args(probe_args(url))
        .stdin(Stdio::null())
        .output()
        .await
        .map_err(|e| AppError::Spawn {
            program: paths.ytdlp.display().to_string(),
            reason: e.to_string(),
        })?;

    let stdout = String::from_utf8_lossy(&output.stdout);
    if stdout.trim().is_empty() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        tracing::warn!(
            "yt-dlp printed no metadata (status {}): {}",
            output.status,
            stderr.trim()
        );
        return Err(AppError::NoData);
    }

    parse_media_info(url, &stdout)
}

/// Only the first JSON object is used, later ones belong to playlist entries.
pub fn parse_media_info(url: &str, output: &str) -> Result<MediaInfo, AppError> {
    let first = output
        .lines()
        .map(str::trim)
        .find(|line| line.starts_with('{'))
        .ok_or(AppError::NoData)?;

    let raw: RawInfo =
        serde_json::from_str(first).map_err(|e| AppError::Metadata(e.to_string()))?;

    let mut formats = FormatCatalog::default();
    for format in raw.formats.iter().flatten() {
        if let Some(option) = format_option(format) {
            formats.push(option);
        }
    }

    let mut manual = subtitle_tracks(raw.subtitles, false);
    let automatic = subtitle_tracks(raw.automatic_captions, true);
    manual.extend(automatic);

    Ok(MediaInfo {
        url: url.to_string(),
        title: raw.title.unwrap_or_else(|| "Unknown".to_string()),
        thumbnail_url: raw.thumbnail.filter(|t| !t.is_empty()),
        formats,
        subtitles: manual,
    })
}

fn format_option(format: &RawFormat) -> Option<FormatOption> {
    // A missing codec field counts as present; only the literal "none" means absent.
    let has_video = format.vcodec.as_deref() != Some("none");
    let has_audio = format.acodec.as_deref() != Some("none");

    let size = size_label(format.filesize.or(format.filesize_approx));
    let ext = format.ext.as_deref().unwrap_or(UNKNOWN);
    let height = format
        .height
        .map(|h| h.to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());

    let (label, kind) = match (has_video, has_audio) {
        (true, false) => (
            format!(
                "{}p ({}, {}) - {}",
                height,
                ext,
                format.vcodec.as_deref().unwrap_or(UNKNOWN),
                size
            ),
            FormatKind::VideoOnly,
        ),
        (false, true) => (
            format!(
                "{}k ({}, {}) - {}",
                format
                    .abr
                    .as_ref()
                    .map(|abr| abr.to_string())
                    .unwrap_or_else(|| "0".to_string()),
                ext,
                format.acodec.as_deref().unwrap_or(UNKNOWN),
                size
            ),
            FormatKind::AudioOnly,
        ),
        (true, true) => (
            format!("Container: {}p ({}) - {}", height, ext, size),
            FormatKind::Muxed,
        ),
        // storyboards and other non-media entries
        (false, false) => return None,
    };

    Some(FormatOption {
        label,
        id: format.format_id.clone(),
        kind,
    })
}

fn size_label(bytes: Option<f64>) -> String {
    match bytes {
        Some(bytes) if bytes > 0.0 => format!("~{:.1}MB", bytes / (1024.0 * 1024.0)),
        _ => UNKNOWN.to_string(),
    }
}

fn subtitle_tracks(
    source: Option<BTreeMap<String, Vec<RawSubtitle>>>,
    automatic: bool,
) -> Vec<SubtitleTrack> {
    let mut tracks: Vec<SubtitleTrack> = source
        .unwrap_or_default()
        .into_iter()
        .map(|(code, entries)| {
            let name = entries
                .into_iter()
                .next()
                .and_then(|entry| entry.name)
                .unwrap_or_else(|| code.clone());
            SubtitleTrack {
                automatic,
                code,
                name,
            }
        })
        .collect();
    tracks.sort_by_key(SubtitleTrack::label);
    tracks
}

/// Map a download request onto a yt-dlp argument vector.
pub fn build_download_job(
    paths: &ToolPaths,
    request: &DownloadRequest,
) -> Result<DownloadJob, AppError> {
    let mut args: Vec<OsString> = Vec::new();
    let mut push = |values: &[&str]| args.extend(values.iter().map(OsString::from));

    match request.mode {
        DownloadMode::AudioMp3 => {
            let selector = request.audio_id.as_deref().unwrap_or("ba/b");
            push(&["-f", selector, "-x", "--audio-format", "mp3"]);
        }
        DownloadMode::VideoMp4 | DownloadMode::VideoMkv => {
            match (request.video_id.as_deref(), request.audio_id.as_deref()) {
                (Some(video), Some(audio)) => {
                    push(&["-f", format!("{}+{}", video, audio).as_str()])
                }
                (Some(video), None) => push(&["-f", video]),
                _ => {}
            }
            if let Some(ext) = request.mode.extension() {
                push(&["--merge-output-format", ext]);
            }
        }
        DownloadMode::InstagramPhoto => {
            return Err(AppError::UnsupportedMode(request.mode.to_string()));
        }
    }

    let languages = match &request.subtitles {
        SubtitleChoice::Off => None,
        SubtitleChoice::All => Some(ALL_SUBTITLES),
        SubtitleChoice::Language(code) => Some(code.as_str()),
    };
    if let Some(languages) = languages {
        push(&[
            "--write-subs",
            "--write-auto-subs",
            "--embed-subs",
            "--sub-langs",
            languages,
            "--sleep-subtitles",
            SUBTITLE_SLEEP_SECS,
        ]);
    }

    if let Some(dir) = &paths.ffmpeg_dir {
        args.push(OsString::from("--ffmpeg-location"));
        args.push(dir.as_os_str().to_owned());
    }
    args.push(OsString::from("-o"));
    args.push(request.output.as_os_str().to_owned());
    args.push(OsString::from(&request.url));
    args.extend(
        [
            "--progress",
            "--newline",
            "--js-runtimes",
            JS_RUNTIME,
            "--no-playlist",
        ]
        .into_iter()
        .map(OsString::from),
    );

    Ok(DownloadJob {
        program: paths.ytdlp.clone(),
        args,
        working_dir: None,
        output: request.output.clone(),
    })
}
