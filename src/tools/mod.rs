pub mod instaloader;
pub mod process;
pub mod ytdlp;

use std::path::{Path, PathBuf};

pub use process::{run_streaming, ProcessEvent};

const BIN_DIR: &str = "bin";

/// Locations of the external tools.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolPaths {
    pub ytdlp: PathBuf,
    /// Directory holding a bundled ffmpeg, passed as `--ffmpeg-location`.
    pub ffmpeg_dir: Option<PathBuf>,
    pub instaloader: PathBuf,
}

impl ToolPaths {
    /// Bundled `bin/` next to the executable first, then `PATH`.
    /// `YTDLP_PATH` and `INSTALOADER_PATH` take precedence over both.
    pub fn discover() -> Self {
        let bin_dir = std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(|dir| dir.join(BIN_DIR)));

        let paths = Self::resolve(
            bin_dir.as_deref(),
            std::env::var_os("YTDLP_PATH").map(PathBuf::from),
            std::env::var_os("INSTALOADER_PATH").map(PathBuf::from),
        );
        tracing::info!(
            "using yt-dlp at {}, instaloader at {}, ffmpeg dir {:?}",
            paths.ytdlp.display(),
            paths.instaloader.display(),
            paths.ffmpeg_dir
        );
        paths
    }

    fn resolve(
        bin_dir: Option<&Path>,
        ytdlp_override: Option<PathBuf>,
        instaloader_override: Option<PathBuf>,
    ) -> Self {
        let bundled = |name: &str| {
            bin_dir
                .map(|dir| dir.join(executable_name(name)))
                .filter(|path| path.is_file())
        };

        let ytdlp = ytdlp_override
            .or_else(|| bundled("yt-dlp"))
            .unwrap_or_else(|| PathBuf::from(executable_name("yt-dlp")));
        let instaloader = instaloader_override
            .or_else(|| bundled("instaloader"))
            .unwrap_or_else(|| PathBuf::from(executable_name("instaloader")));
        let ffmpeg_dir = bundled("ffmpeg").and_then(|path| path.parent().map(Path::to_path_buf));

        Self {
            ytdlp,
            ffmpeg_dir,
            instaloader,
        }
    }
}

fn executable_name(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.exe", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_falls_back_to_path() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ToolPaths::resolve(Some(dir.path()), None, None);
        assert_eq!(paths.ytdlp, PathBuf::from(executable_name("yt-dlp")));
        assert_eq!(paths.ffmpeg_dir, None);
    }

    #[test]
    fn test_resolve_prefers_bundled_and_overrides() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(executable_name("yt-dlp")), b"").unwrap();
        std::fs::write(dir.path().join(executable_name("ffmpeg")), b"").unwrap();

        let paths = ToolPaths::resolve(
            Some(dir.path()),
            None,
            Some(PathBuf::from("/usr/local/bin/instaloader")),
        );
        assert_eq!(paths.ytdlp, dir.path().join(executable_name("yt-dlp")));
        assert_eq!(paths.ffmpeg_dir.as_deref(), Some(dir.path()));
        assert_eq!(paths.instaloader, PathBuf::from("/usr/local/bin/instaloader"));
    }
}
