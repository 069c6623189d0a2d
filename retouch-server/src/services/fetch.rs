//! Source image download

use std::time::Duration;

use retouch_common::{Error, Result};
use tracing::debug;

const USER_AGENT: &str = concat!("retouch/", env!("CARGO_PKG_VERSION"));
const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Downloads source images referenced by URL in edit/variation requests.
///
/// Cheap to clone; the underlying connection pool is shared.
#[derive(Clone)]
pub struct ImageFetcher {
    http_client: reqwest::Client,
}

impl ImageFetcher {
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(FETCH_TIMEOUT)
            .build()
            .map_err(|e| Error::Internal(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { http_client })
    }

    /// Download `url` into memory.
    ///
    /// A single attempt: non-2xx responses and transport errors both
    /// fail the request with a fetch error (carrying the upstream
    /// status when one was received). No retry.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        debug!(url, "Fetching source image");

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Fetch {
                status: None,
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Fetch {
                status: Some(status.as_u16()),
                message: format!("HTTP {} from {}", status.as_u16(), url),
            });
        }

        let bytes = response.bytes().await.map_err(|e| Error::Fetch {
            status: None,
            message: e.to_string(),
        })?;
        Ok(bytes.to_vec())
    }
}
