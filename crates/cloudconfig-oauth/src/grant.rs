//! OAuth 2.0 client-credentials grant (RFC 6749 §4.4).

use std::fmt;
use std::time::{Duration, Instant};

use serde::Deserialize;
use url::Url;

use crate::error::{OAuthError, Result};

/// Tokens are treated as expired this long before the server says they are.
const EXPIRY_BUFFER: Duration = Duration::from_secs(10);

/// Parameters of a client-credentials grant.
#[derive(Clone)]
pub struct ClientCredentialsConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: Url,
    pub scopes: Vec<String>,
}

impl fmt::Debug for ClientCredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientCredentialsConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("token_url", &self.token_url.as_str())
            .field("scopes", &self.scopes)
            .finish()
    }
}

impl ClientCredentialsConfig {
    /// Validate and build grant parameters.
    ///
    /// Every field must be non-empty and the token URL must be absolute.
    pub fn new(
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_url: &str,
    ) -> Result<Self> {
        let client_id = client_id.into();
        let client_secret = client_secret.into();

        if client_id.is_empty() {
            return Err(OAuthError::Config("client id is empty".to_string()));
        }
        if client_secret.is_empty() {
            return Err(OAuthError::Config("client secret is empty".to_string()));
        }
        if token_url.is_empty() {
            return Err(OAuthError::Config("token URL is empty".to_string()));
        }
        let token_url = Url::parse(token_url)
            .map_err(|e| OAuthError::Config(format!("invalid token URL '{}': {}", token_url, e)))?;

        Ok(Self {
            client_id,
            client_secret,
            token_url,
            scopes: Vec::new(),
        })
    }

    /// Request the given scopes with every token.
    pub fn with_scopes<I, S>(mut self, scopes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.scopes = scopes.into_iter().map(Into::into).collect();
        self
    }
}

/// An access token with its local expiry deadline.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub value: String,
    pub token_type: String,
    /// `None` when the server did not send `expires_in`; such tokens never expire locally.
    pub expires_at: Option<Instant>,
}

impl AccessToken {
    /// Whether the token is expired, or about to be.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(deadline) => Instant::now() + EXPIRY_BUFFER >= deadline,
            None => false,
        }
    }

    /// Value for the `Authorization` header.
    pub fn authorization_header(&self) -> String {
        if self.token_type.is_empty() || self.token_type.eq_ignore_ascii_case("bearer") {
            format!("Bearer {}", self.value)
        } else {
            format!("{} {}", self.token_type, self.value)
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Exchange client credentials for an access token.
pub async fn request_token(
    http: &reqwest::Client,
    config: &ClientCredentialsConfig,
) -> Result<AccessToken> {
    let mut form = vec![("grant_type", "client_credentials".to_string())];
    if !config.scopes.is_empty() {
        form.push(("scope", config.scopes.join(" ")));
    }

    // RFC 6749 §2.3.1: credentials are form-encoded before basic auth.
    let response = http
        .post(config.token_url.clone())
        .basic_auth(
            urlencoding::encode(&config.client_id),
            Some(urlencoding::encode(&config.client_secret)),
        )
        .header(reqwest::header::ACCEPT, "application/json")
        .form(&form)
        .send()
        .await
        .map_err(|e| OAuthError::Network(format!("Token request failed: {}", e)))?;

    let status = response.status();
    if !status.is_success() {
        let message = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(OAuthError::TokenEndpoint {
            status: status.as_u16(),
            message,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|e| OAuthError::Network(format!("Failed to read token response: {}", e)))?;
    let token: TokenResponse = serde_json::from_slice(&body)
        .map_err(|e| OAuthError::InvalidResponse(format!("Failed to parse token response: {}", e)))?;

    if token.access_token.is_empty() {
        return Err(OAuthError::InvalidResponse(
            "server response missing access_token".to_string(),
        ));
    }

    Ok(AccessToken {
        value: token.access_token,
        token_type: token.token_type,
        expires_at: token
            .expires_in
            .filter(|secs| *secs > 0)
            // An expiry too far out to represent is treated as none.
            .and_then(|secs| Instant::now().checked_add(Duration::from_secs(secs))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(server: &MockServer) -> ClientCredentialsConfig {
        ClientCredentialsConfig::new("app", "s3cret", &format!("{}/oauth/token", server.uri()))
            .unwrap()
    }

    #[test]
    fn test_config_rejects_empty_fields() {
        assert!(ClientCredentialsConfig::new("", "s", "http://localhost/token").is_err());
        assert!(ClientCredentialsConfig::new("id", "", "http://localhost/token").is_err());
        assert!(ClientCredentialsConfig::new("id", "s", "").is_err());
    }

    #[test]
    fn test_config_rejects_relative_token_url() {
        let err = ClientCredentialsConfig::new("id", "s", "/oauth/token").unwrap_err();
        assert!(matches!(err, OAuthError::Config(_)));
    }

    #[test]
    fn test_config_debug_redacts_secret() {
        let config = ClientCredentialsConfig::new("id", "hunter2", "http://localhost/t").unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_token_expiry() {
        let fresh = AccessToken {
            value: "t".to_string(),
            token_type: "bearer".to_string(),
            expires_at: Some(Instant::now() + Duration::from_secs(3600)),
        };
        assert!(!fresh.is_expired());

        let expiring = AccessToken {
            expires_at: Some(Instant::now() + Duration::from_secs(5)),
            ..fresh.clone()
        };
        assert!(expiring.is_expired());

        let unbounded = AccessToken {
            expires_at: None,
            ..fresh
        };
        assert!(!unbounded.is_expired());
    }

    #[test]
    fn test_authorization_header_normalizes_bearer() {
        let token = AccessToken {
            value: "abc".to_string(),
            token_type: "bearer".to_string(),
            expires_at: None,
        };
        assert_eq!(token.authorization_header(), "Bearer abc");

        let mac = AccessToken {
            token_type: "MAC".to_string(),
            ..token
        };
        assert_eq!(mac.authorization_header(), "MAC abc");
    }

    #[tokio::test]
    async fn test_request_token_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/oauth/token"))
            .and(header("authorization", "Basic YXBwOnMzY3JldA=="))
            .and(body_string_contains("grant_type=client_credentials"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok-1",
                "token_type": "bearer",
                "expires_in": 3600
            })))
            .expect(1)
            .mount(&server)
            .await;

        let token = request_token(&reqwest::Client::new(), &config(&server))
            .await
            .unwrap();
        assert_eq!(token.value, "tok-1");
        assert!(token.expires_at.is_some());
        assert!(!token.is_expired());
    }

    async fn token_with_expiry(expires_in: u64) -> AccessToken {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "tok",
                "expires_in": expires_in
            })))
            .mount(&server)
            .await;

        request_token(&reqwest::Client::new(), &config(&server))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_request_token_unrepresentable_expiry() {
        let token = token_with_expiry(u64::MAX).await;
        assert_eq!(token.value, "tok");
        assert!(token.expires_at.is_none());
        assert!(!token.is_expired());
    }

    #[tokio::test]
    async fn test_request_token_zero_expiry() {
        let token = token_with_expiry(0).await;
        assert!(token.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_request_token_sends_scopes() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("scope=read+write"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"access_token": "x"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let config = config(&server).with_scopes(["read", "write"]);
        let token = request_token(&reqwest::Client::new(), &config).await.unwrap();
        assert_eq!(token.value, "x");
        assert!(token.expires_at.is_none());
    }

    #[tokio::test]
    async fn test_request_token_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad client"))
            .mount(&server)
            .await;

        let err = request_token(&reqwest::Client::new(), &config(&server))
            .await
            .unwrap_err();
        match err {
            OAuthError::TokenEndpoint { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "bad client");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_token_invalid_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let err = request_token(&reqwest::Client::new(), &config(&server))
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_request_token_unreachable() {
        let config =
            ClientCredentialsConfig::new("app", "s3cret", "http://127.0.0.1:1/oauth/token").unwrap();
        let err = request_token(&reqwest::Client::new(), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, OAuthError::Network(_)));
    }
}
