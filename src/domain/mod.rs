pub mod error;
pub mod model;

pub use error::AppError;
pub use model::{
    DownloadJob, DownloadMode, DownloadRequest, FormatCatalog, FormatKind, FormatOption,
    MediaInfo, Phase, SubtitleChoice, SubtitleTrack, Thumbnail,
};
