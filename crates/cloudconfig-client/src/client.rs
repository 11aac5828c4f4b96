//! Main client implementation.

use std::sync::Arc;

use serde::de::DeserializeOwned;

use crate::backend::BackendClient;
use crate::builder::{BackendOption, ClientBuilder};
use crate::decode::{Format, decode};
use crate::error::{Error, Result};
use crate::types::Configuration;

/// Profile requested when the caller passes none.
const DEFAULT_PROFILE: &str = "default";

/// Client for one or more Config Servers.
///
/// Requests go to the backends in construction order. A backend that is
/// unreachable or answers 5xx is skipped in favor of the next one; any other
/// error, including 404, is returned as-is.
///
/// # Example
///
/// ```no_run
/// use cloudconfig_client::ConfigClient;
///
/// # async fn example() -> cloudconfig_client::Result<()> {
/// let client = ConfigClient::builder()
///     .local(["http://localhost:8888"])
///     .build()?;
///
/// let configuration = client.get_configuration("test-app", &["local"]).await?;
/// println!("{:?}", configuration.property("server.port"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConfigClient {
    /// Inner shared state.
    inner: Arc<ClientInner>,
}

#[derive(Debug)]
struct ClientInner {
    backends: Vec<BackendClient>,
}

impl ConfigClient {
    /// Create a new client builder.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Create a client from options with default builder settings.
    ///
    /// At least one option must be provided.
    pub fn new<I>(options: I) -> Result<Self>
    where
        I: IntoIterator<Item = BackendOption>,
    {
        ClientBuilder::new().options(options).build()
    }

    /// Create a client for locally running Config Servers.
    pub fn local<I, S>(urls: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::builder().local(urls).build()
    }

    /// Create a client for the Config Servers listed in `CONFIG_SERVER_URLS`.
    pub fn local_from_env() -> Result<Self> {
        Self::builder().local_env().build()
    }

    /// Create a client for the Config Servers bound in `VCAP_SERVICES`.
    pub fn cloud() -> Result<Self> {
        Self::builder().default_cf_service().build()
    }

    /// Wrap already built backends, in fallback order. Fails if there are none.
    pub fn from_backends(backends: Vec<BackendClient>) -> Result<Self> {
        if backends.is_empty() {
            return Err(Error::Configuration(
                "no Config Server backends were resolved".to_string(),
            ));
        }
        Ok(Self {
            inner: Arc::new(ClientInner { backends }),
        })
    }

    /// The backends, in fallback order.
    pub fn backends(&self) -> &[BackendClient] {
        &self.inner.backends
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Get the configuration of `application` for the given profiles.
    pub async fn get_configuration<S: AsRef<str>>(
        &self,
        application: &str,
        profiles: &[S],
    ) -> Result<Configuration> {
        let path = configuration_path(application, profiles);
        let body = self.fetch(&path).await?;
        decode(&path, Format::Json, &body)
    }

    /// Get a file from the default branch and decode it.
    ///
    /// `.yml`/`.yaml` files are decoded as YAML, everything else as JSON.
    pub async fn get_file<T: DeserializeOwned>(&self, directory: &str, file: &str) -> Result<T> {
        let path = file_path(None, directory, file);
        let body = self.fetch(&path).await?;
        decode(&path, Format::from_file_name(file), &body)
    }

    /// Get a file from `branch` and decode it.
    pub async fn get_file_from_branch<T: DeserializeOwned>(
        &self,
        branch: &str,
        directory: &str,
        file: &str,
    ) -> Result<T> {
        let path = file_path(Some(branch), directory, file);
        let body = self.fetch(&path).await?;
        decode(&path, Format::from_file_name(file), &body)
    }

    /// Get a file from the default branch without decoding it.
    pub async fn get_raw_file(&self, directory: &str, file: &str) -> Result<Vec<u8>> {
        self.fetch(&file_path(None, directory, file)).await
    }

    /// Get a file from `branch` without decoding it.
    pub async fn get_raw_file_from_branch(
        &self,
        branch: &str,
        directory: &str,
        file: &str,
    ) -> Result<Vec<u8>> {
        self.fetch(&file_path(Some(branch), directory, file)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Fallback
    // ─────────────────────────────────────────────────────────────────────────

    /// Try each backend in order until one answers.
    async fn fetch(&self, path: &str) -> Result<Vec<u8>> {
        let mut failures = Vec::new();

        for backend in self.backends() {
            match backend.fetch(path).await {
                Ok(body) => return Ok(body),
                Err(e) if e.is_fallback_eligible() => {
                    tracing::warn!(
                        base_url = %backend.base_url(),
                        path,
                        error = %e,
                        "Config Server failed, trying next"
                    );
                    failures.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(Error::AllBackendsFailed(failures))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Paths
// ─────────────────────────────────────────────────────────────────────────────

/// `{application}/{profile,profile,...}`
fn configuration_path<S: AsRef<str>>(application: &str, profiles: &[S]) -> String {
    let profiles = if profiles.is_empty() {
        DEFAULT_PROFILE.to_string()
    } else {
        profiles
            .iter()
            .map(|p| urlencoding::encode(p.as_ref()).into_owned())
            .collect::<Vec<_>>()
            .join(",")
    };
    format!("{}/{}", urlencoding::encode(application), profiles)
}

/// `default/default/{directory}/{file}?useDefaultLabel=true`, or
/// `default/default/{branch}/{directory}/{file}` for a specific branch.
fn file_path(branch: Option<&str>, directory: &str, file: &str) -> String {
    let directory = encode_segments(directory);
    let file = urlencoding::encode(file);
    let resource = if directory.is_empty() {
        file.into_owned()
    } else {
        format!("{}/{}", directory, file)
    };
    match branch {
        // The server reads `(_)` in a label as `/`.
        Some(branch) => format!(
            "default/default/{}/{}",
            urlencoding::encode(branch).replace("%2F", "(_)"),
            resource
        ),
        None => format!("default/default/{}?useDefaultLabel=true", resource),
    }
}

/// Encode each `/`-separated segment, dropping empty ones.
fn encode_segments(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
