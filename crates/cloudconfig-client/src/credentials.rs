//! Backend descriptors: where a Config Server lives and how to authenticate.

use std::fmt;

use cloudconfig_oauth::ClientCredentialsConfig;
use serde::Deserialize;

use crate::error::{Error, Result};

/// One Config Server's location and optional OAuth2 client-credentials grant.
///
/// Either all of `client_id`, `client_secret` and `access_token_uri` are
/// set, or none are. [`Credentials::grant`] enforces this.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub uri: String,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub access_token_uri: Option<String>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("uri", &self.uri)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "<redacted>"),
            )
            .field("access_token_uri", &self.access_token_uri)
            .finish()
    }
}

impl Credentials {
    /// Credentials for an unauthenticated server.
    pub fn local(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            ..Default::default()
        }
    }

    /// Credentials for a server behind an OAuth2 client-credentials grant.
    pub fn oauth2(
        uri: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        access_token_uri: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            client_id: Some(client_id.into()),
            client_secret: Some(client_secret.into()),
            access_token_uri: Some(access_token_uri.into()),
        }
    }

    /// Whether any OAuth2 field is present. Empty strings count as absent.
    pub fn has_oauth2(&self) -> bool {
        [&self.client_id, &self.client_secret, &self.access_token_uri]
            .into_iter()
            .any(|field| present(field).is_some())
    }

    /// The OAuth2 grant, if these credentials carry one.
    ///
    /// Returns `Ok(None)` when no OAuth2 field is set and
    /// [`Error::InvalidCredentials`] when only some of them are, or when the
    /// token URI is not an absolute URL.
    pub fn grant(&self) -> Result<Option<ClientCredentialsConfig>> {
        let client_id = present(&self.client_id);
        let client_secret = present(&self.client_secret);
        let token_uri = present(&self.access_token_uri);

        match (client_id, client_secret, token_uri) {
            (None, None, None) => Ok(None),
            (Some(id), Some(secret), Some(token_uri)) => {
                ClientCredentialsConfig::new(id, secret, token_uri)
                    .map(Some)
                    .map_err(|e| {
                        Error::InvalidCredentials(format!("{} (server {})", e, self.uri))
                    })
            }
            _ => Err(Error::InvalidCredentials(format!(
                "server {} has an incomplete OAuth2 grant: client id, client secret and access token URI are all required",
                self.uri
            ))),
        }
    }
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}
