use std::ffi::OsString;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use super::ToolPaths;
use crate::domain::{AppError, DownloadJob};

static SHORTCODE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"instagram\.com/(?:p|reel)/([^/?#&]+)").expect("shortcode pattern is valid")
});

pub fn extract_shortcode(url: &str) -> Option<String> {
    SHORTCODE_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Pictures of a single post, saved under `<save_dir>/<shortcode>/`.
///
/// The child runs inside `save_dir`, the application's own working
/// directory is left alone.
pub fn build_photo_job(
    paths: &ToolPaths,
    url: &str,
    save_dir: &Path,
) -> Result<(String, DownloadJob), AppError> {
    let shortcode = extract_shortcode(url).ok_or(AppError::NoShortcode)?;

    let args = [
        "--no-videos",
        "--no-video-thumbnails",
        "--no-geotags",
        "--no-metadata-json",
        "--no-compress-json",
        "--dirname-pattern",
        shortcode.as_str(),
        "--",
    ]
    .into_iter()
    .map(OsString::from)
    .chain(std::iter::once(OsString::from(format!("-{}", shortcode))))
    .collect();

    let job = DownloadJob {
        program: paths.instaloader.clone(),
        args,
        working_dir: Some(save_dir.to_path_buf()),
        output: save_dir.join(&shortcode),
    };
    Ok((shortcode, job))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_extract_shortcode() {
        assert_eq!(
            extract_shortcode("https://www.instagram.com/p/DMCe1wYzM1s/?img_index=1"),
            Some("DMCe1wYzM1s".to_string())
        );
        assert_eq!(
            extract_shortcode("https://instagram.com/reel/C9xYz_-1#top"),
            Some("C9xYz_-1".to_string())
        );
        assert_eq!(extract_shortcode("https://www.instagram.com/nasa/"), None);
    }

    #[test]
    fn test_build_photo_job() {
        let paths = ToolPaths {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg_dir: None,
            instaloader: PathBuf::from("instaloader"),
        };
        let save_dir = PathBuf::from("/home/me/Pictures");
        let (shortcode, job) =
            build_photo_job(&paths, "https://www.instagram.com/p/ABC123/", &save_dir).unwrap();

        assert_eq!(shortcode, "ABC123");
        assert_eq!(job.working_dir.as_deref(), Some(save_dir.as_path()));
        assert_eq!(job.output, save_dir.join("ABC123"));
        let args: Vec<String> = job
            .args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            args,
            [
                "--no-videos",
                "--no-video-thumbnails",
                "--no-geotags",
                "--no-metadata-json",
                "--no-compress-json",
                "--dirname-pattern",
                "ABC123",
                "--",
                "-ABC123",
            ]
        );
    }

    #[test]
    fn test_build_photo_job_without_shortcode() {
        let paths = ToolPaths {
            ytdlp: PathBuf::from("yt-dlp"),
            ffmpeg_dir: None,
            instaloader: PathBuf::from("instaloader"),
        };
        assert_eq!(
            build_photo_job(&paths, "https://www.instagram.com/nasa/", Path::new(".")),
            Err(AppError::NoShortcode)
        );
    }
}
