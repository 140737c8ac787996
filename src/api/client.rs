use std::time::Duration;

use image::GenericImageView;
use reqwest::Client;
use thiserror::Error;

use super::models::{ApiConfig, ReleaseResponse, UpdateInfo};
use crate::domain::Thumbnail;
use crate::utils::is_newer_version;

const USER_AGENT: &str = concat!("media-grabber/", env!("CARGO_PKG_VERSION"));
const THUMBNAIL_MAX_WIDTH: u32 = 320;
const THUMBNAIL_MAX_HEIGHT: u32 = 180;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Image decode failed: {0}")]
    ImageError(#[from] image::ImageError),
}

pub type Result<T> = std::result::Result<T, ApiError>;

#[derive(Clone)]
pub struct ApiClient {
    config: ApiConfig,
    client: Client,
}

impl ApiClient {
    pub fn new(config: ApiConfig) -> Self {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { config, client }
    }

    /// Latest published release, if it is newer than this build
    pub async fn check_for_update(&self) -> Result<Option<UpdateInfo>> {
        let url = format!(
            "{}/repos/{}/releases/latest",
            self.config.github_api_url.trim_end_matches('/'),
            self.config.repository
        );

        let release: ReleaseResponse = self
            .client
            .get(&url)
            .header("Accept", "application/vnd.github+json")
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("JSON decode error: {}", e)))?;

        if release.tag_name.is_empty() || release.tag_name == self.config.current_version {
            return Ok(None);
        }

        if is_newer_version(&release.tag_name, &self.config.current_version) {
            Ok(Some(UpdateInfo {
                version: release.tag_name,
                page_url: release.html_url,
            }))
        } else {
            Ok(None)
        }
    }

    /// Download a preview image and scale it to fit the preview box
    pub async fn fetch_thumbnail(&self, url: &str) -> Result<Thumbnail> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;

        decode_thumbnail(&bytes)
    }
}

fn decode_thumbnail(bytes: &bytes::Bytes) -> Result<Thumbnail> {
    let img = image::load_from_memory(bytes)?;
    // Only ever shrink.
    let img = if img.width() > THUMBNAIL_MAX_WIDTH || img.height() > THUMBNAIL_MAX_HEIGHT {
        img.thumbnail(THUMBNAIL_MAX_WIDTH, THUMBNAIL_MAX_HEIGHT)
    } else {
        img
    };
    let (width, height) = img.dimensions();

    Ok(Thumbnail {
        width,
        height,
        rgba: img.to_rgba8().into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, RgbaImage};
    use std::io::Cursor;

    fn client_for(server: &mockito::Server) -> ApiClient {
        ApiClient::new(ApiConfig {
            github_api_url: server.url(),
            repository: "owner/repo".to_string(),
            current_version: "v1.3.0".to_string(),
        })
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut out = Cursor::new(Vec::new());
        RgbaImage::new(width, height)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[tokio::test]
    async fn test_newer_release_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/repos/owner/repo/releases/latest")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"tag_name": "v1.10.0", "html_url": "https://github.com/owner/repo/releases/v1.10.0"}"#)
            .create_async()
            .await;

        let update = client_for(&server).check_for_update().await.unwrap();
        mock.assert_async().await;
        assert_eq!(
            update,
            Some(UpdateInfo {
                version: "v1.10.0".to_string(),
                page_url: "https://github.com/owner/repo/releases/v1.10.0".to_string(),
            })
        );
    }

    #[tokio::test]
    async fn test_same_or_older_release_is_ignored() {
        let mut server = mockito::Server::new_async().await;
        let _same = server
            .mock("GET", "/repos/owner/repo/releases/latest")
            .with_status(200)
            .with_body(r#"{"tag_name": "v1.2.9", "html_url": "x"}"#)
            .create_async()
            .await;

        let update = client_for(&server).check_for_update().await.unwrap();
        assert_eq!(update, None);
    }

    #[tokio::test]
    async fn test_release_http_error() {
        let mut server = mockito::Server::new_async().await;
        let _missing = server
            .mock("GET", "/repos/owner/repo/releases/latest")
            .with_status(404)
            .create_async()
            .await;

        let result = client_for(&server).check_for_update().await;
        assert!(matches!(result, Err(ApiError::RequestError(_))));
    }

    #[tokio::test]
    async fn test_fetch_thumbnail_scales_to_fit() {
        let mut server = mockito::Server::new_async().await;
        let _thumb = server
            .mock("GET", "/vi/abc/hq.png")
            .with_status(200)
            .with_header("content-type", "image/png")
            .with_body(png(1280, 720))
            .create_async()
            .await;

        let client = client_for(&server);
        let thumb = client
            .fetch_thumbnail(&format!("{}/vi/abc/hq.png", server.url()))
            .await
            .unwrap();
        assert_eq!((thumb.width, thumb.height), (320, 180));
        assert_eq!(thumb.rgba.len(), 320 * 180 * 4);
    }

    #[test]
    fn test_decode_keeps_small_images() {
        let thumb = decode_thumbnail(&bytes::Bytes::from(png(120, 90))).unwrap();
        assert_eq!((thumb.width, thumb.height), (120, 90));
        assert_eq!(thumb.rgba.len(), 120 * 90 * 4);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        let result = decode_thumbnail(&bytes::Bytes::from_static(b"not an image"));
        assert!(matches!(result, Err(ApiError::ImageError(_))));
    }
}
