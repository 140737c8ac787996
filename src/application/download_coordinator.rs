use std::path::{Path, PathBuf};

use futures::{stream::BoxStream, StreamExt};
use rfd::{MessageButtons, MessageDialogResult, MessageLevel};

use crate::{
    api::{ApiClient, UpdateInfo},
    domain::{AppError, DownloadMode, DownloadRequest, MediaInfo, Thumbnail},
    tools::{instaloader, run_streaming, ytdlp, ProcessEvent, ToolPaths},
};

/// Fixed progress shown while instaloader runs, it reports none itself.
const PHOTO_START_PROGRESS: f32 = 10.0;

#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    Log(String),
    /// Percent, 0 to 100.
    Progress(f32),
    Completed { output: PathBuf, message: String },
    Failed(AppError),
}

#[derive(Clone)]
pub struct DownloadCoordinator {
    api_client: ApiClient,
    tools: ToolPaths,
}

impl DownloadCoordinator {
    pub fn new(api_client: ApiClient, tools: ToolPaths) -> Self {
        Self { api_client, tools }
    }

    pub async fn analyze(&self, url: String) -> Result<MediaInfo, AppError> {
        tracing::info!("probing {}", url);
        let info = ytdlp::probe(&self.tools, &url).await?;
        tracing::info!(
            "probe of {} found {} video ({} muxed) and {} audio formats, {} subtitle tracks",
            url,
            info.formats.video.len(),
            info.formats.muxed().count(),
            info.formats.audio.len(),
            info.subtitles.len()
        );
        Ok(info)
    }

    pub async fn fetch_thumbnail(&self, url: String) -> Result<Thumbnail, AppError> {
        self.api_client
            .fetch_thumbnail(&url)
            .await
            .map_err(|e| AppError::Api(e.to_string()))
    }

    /// Failures are not interesting to the user, only logged.
    pub async fn check_for_update(&self) -> Option<UpdateInfo> {
        match self.api_client.check_for_update().await {
            Ok(update) => update,
            Err(e) => {
                tracing::debug!("update check failed: {}", e);
                None
            }
        }
    }

    pub async fn choose_save_path(
        &self,
        directory: PathBuf,
        suggested_filename: String,
        extension: &'static str,
    ) -> Option<PathBuf> {
        let mut path = rfd::AsyncFileDialog::new()
            .set_directory(&directory)
            .set_file_name(&suggested_filename)
            .add_filter(format!("{} Files", extension.to_uppercase()), &[extension])
            .add_filter("All Files", &["*"])
            .save_file()
            .await
            .map(|handle| handle.path().to_path_buf())?;

        if path.extension().is_none() {
            path.set_extension(extension);
        }
        Some(path)
    }

    pub async fn choose_folder(&self, directory: PathBuf) -> Option<PathBuf> {
        rfd::AsyncFileDialog::new()
            .set_directory(&directory)
            .pick_folder()
            .await
            .map(|handle| handle.path().to_path_buf())
    }

    /// yt-dlp download of a video or audio track.
    pub fn download_stream(&self, request: &DownloadRequest) -> BoxStream<'static, DownloadEvent> {
        let job = match ytdlp::build_download_job(&self.tools, request) {
            Ok(job) => job,
            Err(e) => return futures::stream::once(async move { DownloadEvent::Failed(e) }).boxed(),
        };
        tracing::info!(
            "downloading {} as {} to {}",
            request.url,
            request.mode,
            job.output.display()
        );

        let output = job.output.clone();
        run_streaming(job)
            .flat_map(move |event| {
                futures::stream::iter(process_events(event, &output, "Download complete!"))
            })
            .boxed()
    }

    /// Instagram photo post through instaloader.
    pub fn photo_stream(&self, url: &str, save_dir: &Path) -> BoxStream<'static, DownloadEvent> {
        let (shortcode, job) = match instaloader::build_photo_job(&self.tools, url, save_dir) {
            Ok(built) => built,
            Err(e) => return futures::stream::once(async move { DownloadEvent::Failed(e) }).boxed(),
        };
        tracing::info!("downloading photo post {} into {}", shortcode, save_dir.display());

        let output = job.output.clone();
        let message = format!("Saved to {}", shortcode);
        let start = futures::stream::iter([
            DownloadEvent::Log("Starting IG Photo download...".to_string()),
            DownloadEvent::Progress(PHOTO_START_PROGRESS),
        ]);
        let run = run_streaming(job)
            .map(|event| match event {
                // instaloader prints no percentages
                ProcessEvent::Line { text, .. } => ProcessEvent::Line {
                    text,
                    progress: None,
                },
                other => other,
            })
            .flat_map(move |event| futures::stream::iter(process_events(event, &output, &message)));

        start.chain(run).boxed()
    }
}

fn process_events(event: ProcessEvent, output: &Path, message: &str) -> Vec<DownloadEvent> {
    match event {
        ProcessEvent::Line { text, progress } => {
            let mut events = vec![DownloadEvent::Log(text)];
            if let Some(progress) = progress {
                events.push(DownloadEvent::Progress(progress));
            }
            events
        }
        ProcessEvent::Exited(Ok(())) => vec![
            DownloadEvent::Progress(100.0),
            DownloadEvent::Completed {
                output: output.to_path_buf(),
                message: message.to_string(),
            },
        ],
        ProcessEvent::Exited(Err(e)) => {
            tracing::warn!("download into {} failed: {}", output.display(), e);
            vec![DownloadEvent::Failed(e)]
        }
    }
}

/// Default file name offered in the save dialog.
pub fn suggested_filename(title: &str, mode: DownloadMode) -> Option<String> {
    let extension = mode.extension()?;
    let stem = crate::utils::sanitize_title(title);
    let stem = if stem.is_empty() { "download" } else { stem.as_str() };
    Some(format!("{}.{}", stem, extension))
}

pub async fn show_message(level: MessageLevel, title: String, description: String) {
    rfd::AsyncMessageDialog::new()
        .set_level(level)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::Ok)
        .show()
        .await;
}

pub async fn confirm(title: String, description: String) -> bool {
    let answer = rfd::AsyncMessageDialog::new()
        .set_level(MessageLevel::Info)
        .set_title(title)
        .set_description(description)
        .set_buttons(MessageButtons::YesNo)
        .show()
        .await;
    matches!(answer, MessageDialogResult::Yes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiConfig;
    use crate::domain::SubtitleChoice;

    fn coordinator() -> DownloadCoordinator {
        DownloadCoordinator::new(
            ApiClient::new(ApiConfig::default()),
            ToolPaths {
                ytdlp: PathBuf::from("definitely-not-yt-dlp-7c1e"),
                ffmpeg_dir: None,
                instaloader: PathBuf::from("definitely-not-instaloader-7c1e"),
            },
        )
    }

    #[test]
    fn test_suggested_filename() {
        assert_eq!(
            suggested_filename("Live @ Wembley: 1986", DownloadMode::AudioMp3),
            Some("Live  Wembley 1986.mp3".to_string())
        );
        assert_eq!(
            suggested_filename("???", DownloadMode::VideoMkv),
            Some("download.mkv".to_string())
        );
        assert_eq!(suggested_filename("x", DownloadMode::InstagramPhoto), None);
    }

    #[test]
    fn test_process_events_mapping() {
        let output = Path::new("/tmp/clip.mp4");
        assert_eq!(
            process_events(
                ProcessEvent::Line {
                    text: "[download]  42.5% of 1MiB".to_string(),
                    progress: Some(42.5),
                },
                output,
                "done"
            ),
            vec![
                DownloadEvent::Log("[download]  42.5% of 1MiB".to_string()),
                DownloadEvent::Progress(42.5),
            ]
        );
        assert_eq!(
            process_events(ProcessEvent::Exited(Ok(())), output, "done"),
            vec![
                DownloadEvent::Progress(100.0),
                DownloadEvent::Completed {
                    output: output.to_path_buf(),
                    message: "done".to_string(),
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_download_stream_rejects_photo_mode() {
        let request = DownloadRequest {
            url: "https://www.instagram.com/p/ABC/".to_string(),
            mode: DownloadMode::InstagramPhoto,
            video_id: None,
            audio_id: None,
            subtitles: SubtitleChoice::Off,
            output: PathBuf::from("out"),
        };
        let events: Vec<DownloadEvent> = coordinator().download_stream(&request).collect().await;
        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            DownloadEvent::Failed(AppError::UnsupportedMode(_))
        ));
    }

    #[tokio::test]
    async fn test_photo_stream_reports_missing_tool() {
        let dir = tempfile::tempdir().unwrap();
        let events: Vec<DownloadEvent> = coordinator()
            .photo_stream("https://www.instagram.com/p/ABC123/", dir.path())
            .collect()
            .await;

        assert_eq!(events[1], DownloadEvent::Progress(10.0));
        assert!(matches!(
            events.last(),
            Some(DownloadEvent::Failed(AppError::Spawn { .. }))
        ));
    }

    #[tokio::test]
    async fn test_photo_stream_without_shortcode() {
        let events: Vec<DownloadEvent> = coordinator()
            .photo_stream("https://www.instagram.com/nasa/", Path::new("."))
            .collect()
            .await;
        assert_eq!(events, vec![DownloadEvent::Failed(AppError::NoShortcode)]);
    }

    #[tokio::test]
    async fn test_analyze_missing_binary() {
        let result = coordinator().analyze("https://youtu.be/abc".to_string()).await;
        assert!(matches!(result, Err(AppError::Spawn { .. })));
    }
}
