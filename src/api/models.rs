use serde::{Deserialize, Serialize};

/// Response from the GitHub `releases/latest` endpoint
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReleaseResponse {
    #[serde(default)]
    pub tag_name: String,
    #[serde(default)]
    pub html_url: String,
}

/// A release newer than the running build
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateInfo {
    pub version: String,
    pub page_url: String,
}

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub github_api_url: String,
    pub repository: String,
    pub current_version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            github_api_url: "https://api.github.com".to_string(),
            repository: "RyuOuO/YT-Downloder".to_string(),
            current_version: format!("v{}", env!("CARGO_PKG_VERSION")),
        }
    }
}
