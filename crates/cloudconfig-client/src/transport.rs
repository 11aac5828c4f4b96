//! Request transports, plain or OAuth2-authenticated.

use std::sync::Arc;
use std::time::Duration;

use cloudconfig_oauth::{ClientCredentialsTokenSource, SharedTokenSource};
use reqwest::header::AUTHORIZATION;
use url::Url;

use crate::credentials::Credentials;
use crate::error::Result;

/// Boxed transport-level failure (connection, timeout, or token acquisition).
pub(crate) type TransportError = Box<dyn std::error::Error + Send + Sync>;

/// How requests to one backend are sent.
#[derive(Clone)]
pub enum Transport {
    /// The caller's HTTP client, unmodified.
    Plain(reqwest::Client),
    /// Every request carries a bearer token from `tokens`.
    OAuth2 {
        http: reqwest::Client,
        tokens: SharedTokenSource,
    },
}

impl Transport {
    /// Wrap `http` so every request is authenticated by `tokens`.
    pub fn with_token_source(http: reqwest::Client, tokens: SharedTokenSource) -> Self {
        Transport::OAuth2 { http, tokens }
    }

    /// Whether requests carry an `Authorization` header.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Transport::OAuth2 { .. })
    }

    fn http(&self) -> &reqwest::Client {
        match self {
            Transport::Plain(http) | Transport::OAuth2 { http, .. } => http,
        }
    }

    /// Send a GET. `timeout` bounds this attempt alone, token acquisition
    /// included.
    pub(crate) async fn get(
        &self,
        url: Url,
        timeout: Duration,
    ) -> std::result::Result<reqwest::Response, TransportError> {
        match tokio::time::timeout(timeout, self.send(url, timeout)).await {
            Ok(result) => result,
            Err(_) => Err(format!("no response within {:?}", timeout).into()),
        }
    }

    async fn send(
        &self,
        url: Url,
        timeout: Duration,
    ) -> std::result::Result<reqwest::Response, TransportError> {
        // The request timeout also covers reading the body after `get` returns.
        let mut request = self.http().get(url).timeout(timeout);
        if let Transport::OAuth2 { tokens, .. } = self {
            let token = tokens.access_token().await?;
            request = request.header(AUTHORIZATION, token.authorization_header());
        }
        Ok(request.send().await?)
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Transport::Plain(_) => f.write_str("Transport::Plain"),
            Transport::OAuth2 { tokens, .. } => f
                .debug_struct("Transport::OAuth2")
                .field("tokens", tokens)
                .finish(),
        }
    }
}

/// Builds the transport for a backend from its credentials.
#[derive(Debug, Clone)]
pub struct TransportFactory {
    http: reqwest::Client,
}

impl TransportFactory {
    /// `http` is used as-is for unauthenticated backends, and as the
    /// underlying client (for both token and config requests) otherwise.
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }

    /// Build a transport for `credentials`.
    ///
    /// Without credentials, or without OAuth2 fields, the base client is
    /// returned. Otherwise a fresh token source is created for this backend
    /// alone. No request is made here; the first token is fetched on first use.
    pub fn build(&self, credentials: Option<&Credentials>) -> Result<Transport> {
        let grant = match credentials {
            Some(credentials) => credentials.grant()?,
            None => None,
        };

        match grant {
            None => Ok(Transport::Plain(self.http.clone())),
            Some(grant) => {
                tracing::debug!(
                    client_id = %grant.client_id,
                    token_url = %grant.token_url,
                    "Building OAuth2 transport"
                );
                let tokens = ClientCredentialsTokenSource::new(self.http.clone(), grant);
                Ok(Transport::with_token_source(self.http.clone(), Arc::new(tokens)))
            }
        }
    }
}
