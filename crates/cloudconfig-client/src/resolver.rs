//! Credential resolution — turns a construction option's source into backend descriptors.
//!
//! Three sources are supported:
//! 1. URLs given directly by the caller
//! 2. A comma-separated URL list in an environment variable
//! 3. The platform service catalog, looked up by one or more service names

use std::sync::Arc;

use crate::catalog::{ServiceCatalog, VcapServices};
use crate::credentials::Credentials;
use crate::env::Environment;
use crate::error::{Error, Result};

/// Environment variable listing local Config Server base URLs.
pub const CONFIG_SERVER_URLS: &str = "CONFIG_SERVER_URLS";

/// Service name of the Spring Cloud Config Server (current tile).
pub const SPRING_CLOUD_CONFIG_SERVER_NAME: &str = "p.config-server";

/// Service name of the Config Server (legacy tile).
pub const CONFIG_SERVER_NAME: &str = "p-config-server";

/// Service names tried, in order, when the default service is requested.
pub const DEFAULT_SERVICE_NAMES: [&str; 2] = [SPRING_CLOUD_CONFIG_SERVER_NAME, CONFIG_SERVER_NAME];

/// Where a set of credentials comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Base URLs given directly; no authentication.
    Urls(Vec<String>),
    /// Comma-separated base URLs in the named environment variable.
    EnvironmentUrls(String),
    /// First of these service names found in the service catalog.
    Services(Vec<String>),
}

impl CredentialSource {
    /// `CONFIG_SERVER_URLS`.
    pub fn environment() -> Self {
        CredentialSource::EnvironmentUrls(CONFIG_SERVER_URLS.to_string())
    }

    /// The current service name, falling back to the legacy one.
    pub fn default_service() -> Self {
        CredentialSource::Services(DEFAULT_SERVICE_NAMES.iter().map(|s| s.to_string()).collect())
    }

    /// A single named service.
    pub fn service(name: impl Into<String>) -> Self {
        CredentialSource::Services(vec![name.into()])
    }
}

/// Resolves [`CredentialSource`]s against an environment and service catalog.
#[derive(Clone)]
pub struct CredentialResolver {
    env: Arc<dyn Environment>,
    catalog: Option<Arc<dyn ServiceCatalog>>,
}

impl CredentialResolver {
    /// Resolve against `env`, reading the service catalog from `VCAP_SERVICES`.
    pub fn new(env: Arc<dyn Environment>) -> Self {
        Self { env, catalog: None }
    }

    /// Use `catalog` instead of parsing `VCAP_SERVICES`.
    pub fn with_catalog(mut self, catalog: Arc<dyn ServiceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Resolve a source into credentials, preserving discovery order.
    pub fn resolve(&self, source: &CredentialSource) -> Result<Vec<Credentials>> {
        match source {
            CredentialSource::Urls(urls) => Ok(Self::from_urls(urls)),
            CredentialSource::EnvironmentUrls(var) => self.from_environment(var),
            CredentialSource::Services(names) => self.from_services(names),
        }
    }

    /// One unauthenticated credential per URL.
    pub fn from_urls<S: AsRef<str>>(urls: &[S]) -> Vec<Credentials> {
        urls.iter().map(|url| Credentials::local(url.as_ref())).collect()
    }

    /// Split the named variable on `,`.
    ///
    /// Entries are neither trimmed nor validated here; a malformed entry
    /// surfaces as [`Error::InvalidUrl`] when the backend is built.
    pub fn from_environment(&self, var: &str) -> Result<Vec<Credentials>> {
        match self.env.var(var) {
            Some(urls) if !urls.is_empty() => {
                let urls: Vec<&str> = urls.split(',').collect();
                Ok(Self::from_urls(&urls))
            }
            _ => Err(Error::Configuration(format!(
                "no local Config Server URLs provided in environment variable {}",
                var
            ))),
        }
    }

    /// Look up each name in order and return the first service found.
    ///
    /// Only a missing service moves on to the next name; any other error is
    /// returned immediately. If every name is missing the error lists them all.
    pub fn from_services<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<Credentials>> {
        if names.is_empty() {
            return Err(Error::Configuration(
                "no service name given for service catalog lookup".to_string(),
            ));
        }

        let mut missing = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            match self.lookup(name) {
                Ok(credentials) => {
                    if !missing.is_empty() {
                        tracing::info!(
                            service = name,
                            skipped = ?missing,
                            "Using fallback service name"
                        );
                    }
                    return Ok(credentials);
                }
                Err(Error::MissingService { .. }) => {
                    tracing::debug!(service = name, "Service not bound");
                    missing.push(name.to_string());
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::MissingService { names: missing })
    }

    fn lookup(&self, name: &str) -> Result<Vec<Credentials>> {
        match &self.catalog {
            Some(catalog) => catalog.credentials(name),
            None => VcapServices::from_environment(self.env.as_ref())?.credentials(name),
        }
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("catalog", &self.catalog.is_some())
            .finish()
    }
}
