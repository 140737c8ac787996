use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::AppError;

const CONFIG_FILE: &str = ".yt_downloader_config.json";
pub const DEFAULT_THEME: &str = "Dark";

/// User preferences persisted between runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub save_path: PathBuf,
    pub theme: String,
    pub embed_subs: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            save_path: default_save_dir(),
            theme: DEFAULT_THEME.to_string(),
            embed_subs: false,
        }
    }
}

pub fn default_save_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

pub fn config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(CONFIG_FILE))
}

impl Preferences {
    /// Never fails: an unreadable file yields defaults, a save directory
    /// that no longer exists is replaced by the default one.
    pub fn load_from(path: &Path) -> Self {
        let mut prefs = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<Preferences>(&raw) {
                Ok(prefs) => prefs,
                Err(e) => {
                    tracing::warn!("ignoring malformed preferences {}: {}", path.display(), e);
                    Preferences::default()
                }
            },
            Err(e) => {
                tracing::debug!("no preferences at {}: {}", path.display(), e);
                Preferences::default()
            }
        };

        if !prefs.save_path.is_dir() {
            prefs.save_path = default_save_dir();
        }
        prefs
    }

    pub fn save_to(&self, path: &Path) -> Result<(), AppError> {
        let json = serde_json::to_string(self).map_err(|e| AppError::Io(e.to_string()))?;
        std::fs::write(path, json)?;
        tracing::info!("preferences saved to {}", path.display());
        Ok(())
    }

    pub fn load() -> Self {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn save(&self) -> Result<(), AppError> {
        let path = config_path().ok_or_else(|| AppError::Io("No home directory".to_string()))?;
        self.save_to(&path)
    }
}
