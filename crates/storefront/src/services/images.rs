//! Image host client.
//!
//! Product images are uploaded to an ImgBB-compatible host, which answers
//! with a public URL. Only the URL is stored with the product.

use reqwest::multipart::{Form, Part};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;
use url::Url;

/// Default ImgBB API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.imgbb.com";

/// Errors that can occur when uploading an image.
#[derive(Debug, Error)]
pub enum UploadError {
    /// No API key is configured.
    #[error("image uploads are not configured")]
    NotConfigured,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The host refused the upload.
    #[error("image host rejected the upload ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(String),
}

#[derive(Deserialize)]
struct UploadResponse {
    #[serde(default)]
    success: bool,
    data: Option<UploadData>,
    #[serde(default)]
    status: u16,
}

#[derive(Deserialize)]
struct UploadData {
    url: String,
}

/// Client for the image host.
#[derive(Clone)]
pub struct ImageHostClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<SecretString>,
}

impl std::fmt::Debug for ImageHostClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageHostClient")
            .field("base_url", &self.base_url.as_str())
            .field("configured", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

impl ImageHostClient {
    /// Create a new image host client. Without an API key every upload fails
    /// with `UploadError::NotConfigured`.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(base_url: Url, api_key: Option<SecretString>) -> Result<Self, UploadError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("droidshop/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Returns `true` if an API key is configured.
    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Upload an image and return its public URL.
    ///
    /// # Errors
    ///
    /// Returns `UploadError::NotConfigured` without an API key,
    /// `UploadError::Rejected` if the host refuses the file, and
    /// `UploadError::Parse` if the answer carries no URL.
    pub async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<Url, UploadError> {
        let api_key = self.api_key.as_ref().ok_or(UploadError::NotConfigured)?;

        let mut url = self
            .base_url
            .join("1/upload")
            .map_err(|e| UploadError::Parse(format!("bad endpoint: {e}")))?;
        url.query_pairs_mut()
            .append_pair("key", api_key.expose_secret());

        let size = bytes.len();
        let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name.to_owned()));
        let response = self.client.post(url).multipart(form).send().await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| UploadError::Parse(e.to_string()))?;
        let data = match body.data {
            Some(data) if body.success => data,
            _ => {
                return Err(UploadError::Rejected {
                    status: body.status,
                    message: "upload was not successful".to_owned(),
                });
            }
        };
        let image_url = Url::parse(&data.url)
            .map_err(|e| UploadError::Parse(format!("invalid image URL {:?}: {e}", data.url)))?;

        tracing::info!(file_name, size, url = %image_url, "Image uploaded");
        Ok(image_url)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unconfigured_client_refuses() {
        let client = ImageHostClient::new(Url::parse(DEFAULT_BASE_URL).unwrap(), None).unwrap();
        assert!(!client.is_configured());
        let err = client.upload("droid.png", vec![1, 2, 3]).await.unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured));
    }
}
