use std::time::Duration;

use reqwest::Client;
use tracing::debug;
use url::Url;

use crate::error::MetadataError;

/// Link-local instance metadata service, API version `latest`.
pub const DEFAULT_ENDPOINT: &str = "http://169.254.169.254/latest";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(1);

/// Unauthenticated client for the instance metadata service.
///
/// Only plain `GET meta-data/<key>` lookups are supported; each call is
/// independent and carries its own request timeout.
#[derive(Debug, Clone)]
pub struct MetadataClient {
    client: Client,
    endpoint: String,
    timeout: Duration,
}

impl MetadataClient {
    pub fn new() -> Result<Self, MetadataError> {
        // The metadata service is link-local; never route it through a proxy.
        let client = Client::builder()
            .no_proxy()
            .build()
            .map_err(MetadataError::Build)?;

        Ok(Self {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Point the client at a different endpoint (for testing with mock servers)
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.endpoint = url.into();
        self
    }

    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the string stored at `meta-data/<key>`.
    ///
    /// Any non-success status is an error, including 404 for keys the
    /// service does not currently expose.
    pub async fn get_metadata(&self, key: &str) -> Result<String, MetadataError> {
        let url = self.metadata_url(key)?;
        debug!("GET {}", url);

        let res = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|source| MetadataError::Request {
                key: key.to_string(),
                source,
            })?;

        let status = res.status();
        if !status.is_success() {
            return Err(MetadataError::Status {
                key: key.to_string(),
                status,
            });
        }

        let body = res.text().await.map_err(|source| MetadataError::Request {
            key: key.to_string(),
            source,
        })?;

        Ok(body.trim().to_string())
    }

    fn metadata_url(&self, key: &str) -> Result<Url, MetadataError> {
        let raw = format!(
            "{}/meta-data/{}",
            self.endpoint.trim_end_matches('/'),
            key.trim_start_matches('/')
        );

        Url::parse(&raw).map_err(|source| MetadataError::InvalidEndpoint {
            endpoint: self.endpoint.clone(),
            source,
        })
    }
}
