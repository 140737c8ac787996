use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AppError {
    #[error("No shortcode found.")]
    NoShortcode,

    #[error("No data received.")]
    NoData,

    #[error("Could not parse media info: {0}")]
    Metadata(String),

    #[error("Failed to start {program}: {reason}")]
    Spawn { program: String, reason: String },

    #[error("Process exited with {}", exit_label(.0))]
    ProcessFailed(Option<i32>),

    #[error("Mode {0} is not handled by yt-dlp")]
    UnsupportedMode(String),

    #[error("Analyze first.")]
    NothingSelected,

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(String),
}

fn exit_label(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl From<std::io::Error> for AppError {
    fn from(e: std::io::Error) -> Self {
        AppError::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_failed_message() {
        assert_eq!(
            AppError::ProcessFailed(Some(1)).to_string(),
            "Process exited with code 1"
        );
        assert!(AppError::ProcessFailed(None)
            .to_string()
            .contains("signal"));
    }
}
