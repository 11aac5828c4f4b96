//! OAuth 2.0 client-credentials support for Config Server clients.
//!
//! Config Servers bound through a platform service catalog are protected by an
//! OAuth 2.0 authorization server. This crate obtains bearer tokens for them.
//!
//! # Components
//!
//! - [`grant`] — client-credentials parameters and the token request itself
//! - [`token_source`] — cached tokens, refreshed lazily when they expire

pub mod error;
pub mod grant;
pub mod token_source;

pub use error::{OAuthError, Result};
pub use grant::{AccessToken, ClientCredentialsConfig, request_token};
pub use token_source::{
    ClientCredentialsTokenSource, SharedTokenSource, StaticTokenSource, TokenSource,
};
