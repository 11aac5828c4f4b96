//! Client error types.

use thiserror::Error;

/// Client error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Required environment input is missing or empty.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// None of the requested services are bound in the service catalog.
    #[error("{}", missing_service_message(.names))]
    MissingService {
        /// Every service name that was looked up, in lookup order.
        names: Vec<String>,
    },

    /// The service catalog exists but cannot be read.
    #[error("Service catalog error: {0}")]
    ServiceCatalog(String),

    /// OAuth2 grant parameters are incomplete or malformed.
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// A base URL could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The underlying HTTP client could not be built.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The Config Server could not be reached, or no token could be obtained for it.
    #[error("Config Server {base_url} unreachable while fetching '{path}': {source}")]
    Unreachable {
        base_url: String,
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The Config Server answered with a non-success status.
    #[error("Config Server {base_url} returned {status} for '{path}'")]
    Fetch {
        base_url: String,
        path: String,
        status: u16,
    },

    /// Every backend failed with a fallback-eligible error.
    #[error("all {} Config Servers failed: {}", .0.len(), join_errors(.0))]
    AllBackendsFailed(Vec<Error>),

    /// A fetched body could not be decoded into the requested shape.
    #[error("failed to decode '{path}': {message}")]
    Decode { path: String, message: String },

    /// A client was built without any backend option.
    #[error("at least one option must be provided")]
    NoOptionsProvided,
}

impl Error {
    /// Check if this is a not-found response.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::Fetch { status: 404, .. })
    }

    /// Check if this is a server-side (5xx) response.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Error::Fetch { status, .. } if *status >= 500)
    }

    /// Check if the next backend should be tried after this error.
    ///
    /// Only transport failures and 5xx responses qualify. Client errors such
    /// as 404 are authoritative.
    pub fn is_fallback_eligible(&self) -> bool {
        matches!(self, Error::Unreachable { .. }) || self.is_server_error()
    }

    /// Check if the error came from a missing catalog entry.
    pub fn is_missing_service(&self) -> bool {
        matches!(self, Error::MissingService { .. })
    }

    /// Per-backend causes, when every backend failed.
    pub fn causes(&self) -> &[Error] {
        match self {
            Error::AllBackendsFailed(causes) => causes,
            _ => &[],
        }
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

fn missing_service_message(names: &[String]) -> String {
    match names {
        [name] => format!("service '{}' not found in the service catalog", name),
        _ => format!(
            "neither {} exist in the service catalog",
            names
                .iter()
                .map(|n| format!("'{}'", n))
                .collect::<Vec<_>>()
                .join(" or ")
        ),
    }
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
