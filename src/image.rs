use std::time::Duration;

use async_trait::async_trait;
use base64::prelude::*;

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";
const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/124.0.0.0 Safari/537.36";

/// Downloads an image and embeds it as a `data:` URI.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    /// Returns the embedded image, or `None` when the fetch fails for any
    /// reason. Failures are logged to stderr, never propagated.
    async fn fetch_data_uri(&self, url: &str) -> Option<String>;
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("HTTP {0}")]
    Status(reqwest::StatusCode),
    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

pub struct HttpImageFetcher {
    client: reqwest::Client,
}

impl HttpImageFetcher {
    pub fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self { client }
    }

    async fn download(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;

        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();

        let bytes = response.bytes().await?;
        Ok(encode_data_uri(&content_type, &bytes))
    }
}

#[async_trait]
impl ImageFetcher for HttpImageFetcher {
    async fn fetch_data_uri(&self, url: &str) -> Option<String> {
        match self.download(url).await {
            Ok(data_uri) => Some(data_uri),
            Err(err) => {
                tracing::warn!("error converting image to base64 ({}): {}", url, err);
                None
            }
        }
    }
}

pub fn encode_data_uri(content_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", content_type, BASE64_STANDARD.encode(bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encodes_bytes_as_data_uri() {
        assert_eq!(
            encode_data_uri("image/png", &[1, 2, 3]),
            "data:image/png;base64,AQID"
        );
    }

    #[test]
    fn empty_body_still_produces_header() {
        assert_eq!(
            encode_data_uri(DEFAULT_CONTENT_TYPE, &[]),
            "data:image/jpeg;base64,"
        );
    }

    #[test]
    fn padding_is_standard_base64() {
        assert_eq!(
            encode_data_uri("image/gif", b"GIF8"),
            "data:image/gif;base64,R0lGOA=="
        );
    }
}
