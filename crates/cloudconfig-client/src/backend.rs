//! A single Config Server endpoint.

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::transport::{Transport, TransportError};

/// One addressable Config Server: a base URL and the transport that reaches it.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: Url,
    transport: Transport,
    timeout: Duration,
}

impl BackendClient {
    /// Create a backend. The base URL is normalized to end with `/`.
    pub fn new(base_url: &str, transport: Transport, timeout: Duration) -> Result<Self> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            base_url.set_path(&format!("{}/", base_url.path()));
        }

        Ok(Self {
            base_url,
            transport,
            timeout,
        })
    }

    /// Get the base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Whether requests to this backend are OAuth2-authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.transport.is_authenticated()
    }

    /// Build the URL for a path relative to the base URL.
    pub(crate) fn url(&self, path: &str) -> Result<Url> {
        let path = path.trim_start_matches('/');
        self.base_url.join(path).map_err(Error::from)
    }

    /// GET `path` and return the body.
    ///
    /// Non-2xx statuses become [`Error::Fetch`]; connection failures,
    /// timeouts and token failures become [`Error::Unreachable`]. The body is
    /// read to the end on every path.
    pub async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let url = self.url(path)?;
        tracing::debug!(base_url = %self.base_url, path, "Fetching from Config Server");

        let response = self
            .transport
            .get(url, self.timeout)
            .await
            .map_err(|source| self.unreachable(path, source))?;

        let status = response.status();
        if !status.is_success() {
            drain(response).await;
            return Err(Error::Fetch {
                base_url: self.base_url.to_string(),
                path: path.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| self.unreachable(path, Box::new(e)))?;
        Ok(body.to_vec())
    }

    fn unreachable(&self, path: &str, source: TransportError) -> Error {
        Error::Unreachable {
            base_url: self.base_url.to_string(),
            path: path.to_string(),
            source,
        }
    }
}

/// Read and discard an unused body so the connection can be reused.
async fn drain(response: reqwest::Response) {
    let url = response.url().clone();
    if let Err(e) = response.bytes().await {
        tracing::warn!(%url, error = %e, "Failed to drain response body");
    }
}
