//! Token sources: where a transport gets its bearer token from.
//!
//! Tokens are fetched lazily on first use and cached until they expire.

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::Result;
use crate::grant::{AccessToken, ClientCredentialsConfig, request_token};

// ============================================================================
// TokenSource Trait
// ============================================================================

/// Something that can hand out a currently valid access token.
#[async_trait]
pub trait TokenSource: Send + Sync + std::fmt::Debug {
    /// Get a valid access token, fetching a new one if necessary.
    async fn access_token(&self) -> Result<AccessToken>;

    /// Drop any cached token so the next call fetches a fresh one.
    async fn clear_cache(&self);
}

/// Token source shared behind an `Arc`.
pub type SharedTokenSource = Arc<dyn TokenSource>;

// ============================================================================
// ClientCredentialsTokenSource
// ============================================================================

/// Token source backed by an OAuth 2.0 client-credentials grant.
#[derive(Debug)]
pub struct ClientCredentialsTokenSource {
    http: reqwest::Client,
    config: ClientCredentialsConfig,
    cached: RwLock<Option<AccessToken>>,
}

impl ClientCredentialsTokenSource {
    /// Create a token source. No request is made until the first token is needed.
    pub fn new(http: reqwest::Client, config: ClientCredentialsConfig) -> Self {
        Self {
            http,
            config,
            cached: RwLock::new(None),
        }
    }

    /// The grant parameters this source uses.
    pub fn config(&self) -> &ClientCredentialsConfig {
        &self.config
    }
}

#[async_trait]
impl TokenSource for ClientCredentialsTokenSource {
    async fn access_token(&self) -> Result<AccessToken> {
        {
            let cache = self.cached.read().await;
            if let Some(token) = cache.as_ref().filter(|t| !t.is_expired()) {
                return Ok(token.clone());
            }
        }

        let mut cache = self.cached.write().await;
        // Another task may have refreshed while we waited for the write lock.
        if let Some(token) = cache.as_ref().filter(|t| !t.is_expired()) {
            return Ok(token.clone());
        }

        tracing::debug!(token_url = %self.config.token_url, "Fetching access token");
        let token = request_token(&self.http, &self.config).await?;
        *cache = Some(token.clone());
        Ok(token)
    }

    async fn clear_cache(&self) {
        let mut cache = self.cached.write().await;
        *cache = None;
    }
}

// ============================================================================
// StaticTokenSource
// ============================================================================

/// Token source that always returns the same token.
///
/// Useful for pre-issued tokens and for tests.
#[derive(Debug)]
pub struct StaticTokenSource {
    token: AccessToken,
    calls: AtomicU32,
}

impl StaticTokenSource {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            token: AccessToken {
                value: value.into(),
                token_type: "Bearer".to_string(),
                expires_at: None,
            },
            calls: AtomicU32::new(0),
        }
    }

    /// How many times a token has been handed out.
    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TokenSource for StaticTokenSource {
    async fn access_token(&self) -> Result<AccessToken> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.token.clone())
    }

    async fn clear_cache(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn token_server(expires_in: u64, expected_calls: u64) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "cached-token",
                "token_type": "bearer",
                "expires_in": expires_in
            })))
            .expect(expected_calls)
            .mount(&server)
            .await;
        server
    }

    fn source(server: &MockServer) -> ClientCredentialsTokenSource {
        let config = ClientCredentialsConfig::new(
            "app",
            "secret",
            &format!("{}/oauth/token", server.uri()),
        )
        .unwrap();
        ClientCredentialsTokenSource::new(reqwest::Client::new(), config)
    }

    #[tokio::test]
    async fn test_token_is_cached() {
        let server = token_server(3600, 1).await;
        let source = source(&server);

        let first = source.access_token().await.unwrap();
        let second = source.access_token().await.unwrap();
        assert_eq!(first.value, "cached-token");
        assert_eq!(second.value, "cached-token");
    }

    #[tokio::test]
    async fn test_expired_token_is_refreshed() {
        // Shorter than the expiry buffer, so every cached token is already stale.
        let server = token_server(1, 2).await;
        let source = source(&server);

        source.access_token().await.unwrap();
        source.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_unrepresentable_expiry_is_cached() {
        let server = token_server(u64::MAX, 1).await;
        let source = source(&server);

        source.access_token().await.unwrap();
        source.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_clear_cache_forces_fetch() {
        let server = token_server(3600, 2).await;
        let source = source(&server);

        source.access_token().await.unwrap();
        source.clear_cache().await;
        source.access_token().await.unwrap();
    }

    #[tokio::test]
    async fn test_no_request_until_first_use() {
        let server = token_server(3600, 0).await;
        let _source = source(&server);
    }

    #[tokio::test]
    async fn test_static_token_source() {
        let source = StaticTokenSource::new("fixed");
        let token = source.access_token().await.unwrap();
        assert_eq!(token.authorization_header(), "Bearer fixed");
        assert_eq!(source.calls(), 1);
    }
}
