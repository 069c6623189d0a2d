//! Remote generation service client.
//!
//! The generation API is consumed as an opaque collaborator behind the
//! [`GenerationService`] trait, so the orchestrator can be exercised
//! with a test double. The production implementation talks to the
//! OpenAI images API: JSON for generation, multipart uploads for edit
//! and variation. Single attempt per call, no retry; service failures
//! carry the service's own error payload verbatim.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use tracing::{debug, info};

use retouch_common::types::GeneratedImage;
use retouch_common::{Error, Result};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const USER_AGENT: &str = concat!("retouch/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Generated image size requested from the service
const IMAGE_SIZE: &str = "256x256";
/// Number of variations requested per source image
const VARIATION_COUNT: u8 = 2;

/// Boundary to the generative-image service
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Generate images from a text prompt
    async fn generate(&self, prompt: &str) -> Result<Vec<GeneratedImage>>;

    /// Edit a masked RGBA PNG according to a prompt; the transparent
    /// region is the area the service fills in
    async fn edit(&self, image_png: Vec<u8>, prompt: &str) -> Result<Vec<GeneratedImage>>;

    /// Produce variations of an RGBA PNG
    async fn vary(&self, image_png: Vec<u8>) -> Result<Vec<GeneratedImage>>;
}

/// Response envelope of the images API
#[derive(Debug, Deserialize)]
struct ImagesResponse {
    data: Vec<GeneratedImage>,
}

/// OpenAI images API client
pub struct OpenAiImagesClient {
    http_client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenAiImagesClient {
    pub fn new(api_key: String) -> Result<Self> {
        Self::with_base_url(api_key, OPENAI_BASE_URL.to_string())
    }

    /// Construct against a non-default base URL
    pub fn with_base_url(api_key: String, base_url: String) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            api_key,
            base_url,
        })
    }

    async fn handle_response(response: reqwest::Response) -> Result<Vec<GeneratedImage>> {
        let status = response.status();

        if !status.is_success() {
            // Forward the service's error payload, not a rewrite of it.
            let payload = response.text().await.unwrap_or_default();
            return Err(Error::RemoteService {
                status: Some(status.as_u16()),
                payload,
            });
        }

        let body: ImagesResponse = response.json().await.map_err(|e| Error::RemoteService {
            status: Some(status.as_u16()),
            payload: format!("unparseable response body: {}", e),
        })?;

        info!(results = body.data.len(), "Generation service call succeeded");
        Ok(body.data)
    }

    fn transport_error(e: reqwest::Error) -> Error {
        Error::RemoteService {
            status: None,
            payload: format!("request failed: {}", e),
        }
    }

    fn png_part(image_png: Vec<u8>) -> Result<multipart::Part> {
        multipart::Part::bytes(image_png)
            .file_name("image.png")
            .mime_str("image/png")
            .map_err(|e| Error::Internal(format!("failed to build multipart body: {}", e)))
    }
}

#[async_trait]
impl GenerationService for OpenAiImagesClient {
    async fn generate(&self, prompt: &str) -> Result<Vec<GeneratedImage>> {
        debug!("Requesting image generation");
        let body = serde_json::json!({
            "prompt": prompt,
            "n": 1,
            "size": IMAGE_SIZE,
            "response_format": "url",
        });

        let response = self
            .http_client
            .post(format!("{}/images/generations", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::handle_response(response).await
    }

    async fn edit(&self, image_png: Vec<u8>, prompt: &str) -> Result<Vec<GeneratedImage>> {
        debug!(bytes = image_png.len(), "Requesting image edit");
        let form = multipart::Form::new()
            .part("image", Self::png_part(image_png)?)
            .text("prompt", prompt.to_string());

        let response = self
            .http_client
            .post(format!("{}/images/edits", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::handle_response(response).await
    }

    async fn vary(&self, image_png: Vec<u8>) -> Result<Vec<GeneratedImage>> {
        debug!(bytes = image_png.len(), "Requesting image variations");
        let form = multipart::Form::new()
            .part("image", Self::png_part(image_png)?)
            .text("n", VARIATION_COUNT.to_string());

        let response = self
            .http_client
            .post(format!("{}/images/variations", self.base_url))
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(Self::transport_error)?;

        Self::handle_response(response).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_creation() {
        let client = OpenAiImagesClient::new("test_key".to_string());
        assert!(client.is_ok());
    }

    #[test]
    fn response_envelope_parses_and_ignores_extra_fields() {
        let raw = r#"{
            "created": 1589478378,
            "data": [
                {"url": "https://img.example/one.png"},
                {"url": "https://img.example/two.png"}
            ]
        }"#;
        let parsed: ImagesResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.data.len(), 2);
        assert_eq!(parsed.data[0].url, "https://img.example/one.png");
    }

    #[test]
    fn empty_result_list_is_valid() {
        // Partial success is forwarded as-is; an empty list is still a
        // successful response, not an error.
        let parsed: ImagesResponse = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert!(parsed.data.is_empty());
    }
}
