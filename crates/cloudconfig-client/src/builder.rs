//! Client construction from composable backend options.
//!
//! Each [`BackendOption`] resolves its own backends independently of the
//! others. The builder concatenates them in the order the options were added,
//! which is also the fallback order.

use std::sync::Arc;
use std::time::Duration;

use crate::backend::BackendClient;
use crate::catalog::ServiceCatalog;
use crate::client::ConfigClient;
use crate::credentials::Credentials;
use crate::env::{Environment, ProcessEnvironment};
use crate::error::{Error, Result};
use crate::resolver::{CredentialResolver, CredentialSource};
use crate::transport::TransportFactory;

/// Default timeout for each request attempt.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// One way of finding Config Servers.
#[derive(Clone, PartialEq, Eq)]
pub enum BackendOption {
    /// Locally running servers at these base URLs.
    Local(Vec<String>),
    /// Locally running servers listed in `CONFIG_SERVER_URLS`.
    LocalEnv,
    /// Servers bound under this service name in `VCAP_SERVICES`.
    CfService(String),
    /// Servers bound as `p.config-server`, or `p-config-server` if that is absent.
    DefaultCfService,
    /// A single server behind an OAuth2 client-credentials grant.
    OAuth2 {
        base_url: String,
        client_id: String,
        client_secret: String,
        token_uri: String,
    },
}

impl std::fmt::Debug for BackendOption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendOption::Local(urls) => f.debug_tuple("Local").field(urls).finish(),
            BackendOption::LocalEnv => f.write_str("LocalEnv"),
            BackendOption::CfService(name) => f.debug_tuple("CfService").field(name).finish(),
            BackendOption::DefaultCfService => f.write_str("DefaultCfService"),
            BackendOption::OAuth2 {
                base_url,
                client_id,
                token_uri,
                ..
            } => f
                .debug_struct("OAuth2")
                .field("base_url", base_url)
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .field("token_uri", token_uri)
                .finish(),
        }
    }
}

impl BackendOption {
    /// Append this option's backends to `backends` and hand the collection back.
    fn apply(
        &self,
        mut backends: Vec<BackendClient>,
        ctx: &BuildContext,
    ) -> Result<Vec<BackendClient>> {
        let resolved = self.resolve(ctx)?;
        tracing::debug!(option = ?self, count = resolved.len(), "Resolved backends");
        backends.extend(resolved);
        Ok(backends)
    }

    /// Resolve this option's backends without looking at any other option's.
    fn resolve(&self, ctx: &BuildContext) -> Result<Vec<BackendClient>> {
        let credentials = match self {
            BackendOption::Local(urls) => {
                ctx.resolver.resolve(&CredentialSource::Urls(urls.clone()))?
            }
            BackendOption::LocalEnv => ctx.resolver.resolve(&CredentialSource::environment())?,
            BackendOption::CfService(name) => {
                ctx.resolver.resolve(&CredentialSource::service(name.clone()))?
            }
            BackendOption::DefaultCfService => {
                ctx.resolver.resolve(&CredentialSource::default_service())?
            }
            BackendOption::OAuth2 {
                base_url,
                client_id,
                client_secret,
                token_uri,
            } => {
                let credentials =
                    Credentials::oauth2(base_url, client_id, client_secret, token_uri);
                if credentials.grant()?.is_none() {
                    return Err(Error::InvalidCredentials(format!(
                        "OAuth2 option for {} requires a client id, client secret and token URI",
                        base_url
                    )));
                }
                vec![credentials]
            }
        };

        credentials
            .iter()
            .map(|credentials| ctx.backend(credentials))
            .collect()
    }
}

/// Shared, read-only inputs for resolving options.
struct BuildContext {
    resolver: CredentialResolver,
    transports: TransportFactory,
    timeout: Duration,
}

impl BuildContext {
    fn backend(&self, credentials: &Credentials) -> Result<BackendClient> {
        let transport = self.transports.build(Some(credentials))?;
        BackendClient::new(&credentials.uri, transport, self.timeout)
    }
}

/// Builder for creating a [`ConfigClient`].
pub struct ClientBuilder {
    options: Vec<BackendOption>,
    http: Option<reqwest::Client>,
    timeout: Duration,
    user_agent: Option<String>,
    env: Arc<dyn Environment>,
    catalog: Option<Arc<dyn ServiceCatalog>>,
}

impl ClientBuilder {
    /// Create a new builder with defaults.
    pub fn new() -> Self {
        Self {
            options: Vec::new(),
            http: None,
            timeout: DEFAULT_TIMEOUT,
            user_agent: None,
            env: Arc::new(ProcessEnvironment),
            catalog: None,
        }
    }

    /// Add a backend option.
    pub fn option(mut self, option: BackendOption) -> Self {
        self.options.push(option);
        self
    }

    /// Add several backend options, in order.
    pub fn options<I>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = BackendOption>,
    {
        self.options.extend(options);
        self
    }

    /// Add locally running servers.
    pub fn local<I, S>(self, urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.option(BackendOption::Local(
            urls.into_iter().map(Into::into).collect(),
        ))
    }

    /// Add the servers listed in `CONFIG_SERVER_URLS`.
    pub fn local_env(self) -> Self {
        self.option(BackendOption::LocalEnv)
    }

    /// Add the servers bound under `service` in the service catalog.
    pub fn cf_service(self, service: impl Into<String>) -> Self {
        self.option(BackendOption::CfService(service.into()))
    }

    /// Add the servers bound under the default Config Server service names.
    pub fn default_cf_service(self) -> Self {
        self.option(BackendOption::DefaultCfService)
    }

    /// Add a server protected by an OAuth2 client-credentials grant.
    pub fn oauth2(
        self,
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
        token_uri: impl Into<String>,
    ) -> Self {
        self.option(BackendOption::OAuth2 {
            base_url: base_url.into(),
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            token_uri: token_uri.into(),
        })
    }

    /// Use this HTTP client for every backend and token request.
    ///
    /// When set, [`user_agent`](Self::user_agent) is ignored.
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Set the timeout for each request attempt.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set a custom user agent.
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Read environment variables from `env` instead of the process environment.
    pub fn environment(mut self, env: Arc<dyn Environment>) -> Self {
        self.env = env;
        self
    }

    /// Look up services in `catalog` instead of parsing `VCAP_SERVICES`.
    pub fn service_catalog(mut self, catalog: Arc<dyn ServiceCatalog>) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Build the client.
    ///
    /// Fails if no option was added, if any option fails to resolve, or if
    /// the options together resolve no backend at all.
    pub fn build(self) -> Result<ConfigClient> {
        if self.options.is_empty() {
            return Err(Error::NoOptionsProvided);
        }

        let http = match self.http {
            Some(http) => http,
            None => {
                let user_agent = self
                    .user_agent
                    .unwrap_or_else(|| format!("cloudconfig-client/{}", env!("CARGO_PKG_VERSION")));
                reqwest::Client::builder().user_agent(user_agent).build()?
            }
        };

        let mut resolver = CredentialResolver::new(self.env);
        if let Some(catalog) = self.catalog {
            resolver = resolver.with_catalog(catalog);
        }

        let ctx = BuildContext {
            resolver,
            transports: TransportFactory::new(http),
            timeout: self.timeout,
        };

        let backends = self
            .options
            .iter()
            .try_fold(Vec::new(), |backends, option| option.apply(backends, &ctx))?;

        tracing::info!(backends = backends.len(), "Config client ready");
        ConfigClient::from_backends(backends)
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientBuilder")
            .field("options", &self.options)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{VCAP_SERVICES, VcapServices};
    use crate::resolver::CONFIG_SERVER_URLS;
    use std::collections::{BTreeSet, HashMap};

    const CATALOG: &str = r#"{
        "p.config-server": [
            {
                "credentials": {
                    "uri": "https://cloud-a.example.com",
                    "client_id": "app",
                    "client_secret": "secret",
                    "access_token_uri": "https://uaa.example.com/oauth/token"
                }
            },
            {
                "credentials": {
                    "uri": "https://cloud-b.example.com",
                    "client_id": "app",
                    "client_secret": "secret",
                    "access_token_uri": "https://uaa.example.com/oauth/token"
                }
            }
        ],
        "p-config-server": [
            { "credentials": { "uri": "https://legacy.example.com" } }
        ]
    }"#;

    fn env(vars: &[(&str, &str)]) -> Arc<dyn Environment> {
        Arc::new(
            vars.iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<HashMap<_, _>>(),
        )
    }

    fn urls(client: &ConfigClient) -> Vec<String> {
        client
            .backends()
            .iter()
            .map(|b| b.base_url().to_string())
            .collect()
    }

    #[test]
    fn test_no_options() {
        let err = ClientBuilder::new().build().unwrap_err();
        assert!(matches!(err, Error::NoOptionsProvided));
    }

    #[test]
    fn test_local_preserves_count_and_order() {
        let client = ClientBuilder::new()
            .local(["http://c:8888", "http://a:8888", "http://b:8888"])
            .build()
            .unwrap();
        assert_eq!(
            urls(&client),
            vec!["http://c:8888/", "http://a:8888/", "http://b:8888/"]
        );
        assert!(client.backends().iter().all(|b| !b.is_authenticated()));
    }

    #[test]
    fn test_empty_local_list_is_rejected() {
        let err = ClientBuilder::new()
            .local(Vec::<String>::new())
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_local_env() {
        let client = ClientBuilder::new()
            .environment(env(&[(CONFIG_SERVER_URLS, "http://a:8888,http://b:8888")]))
            .local_env()
            .build()
            .unwrap();
        assert_eq!(urls(&client), vec!["http://a:8888/", "http://b:8888/"]);
    }

    #[test]
    fn test_local_env_unset_fails() {
        let err = ClientBuilder::new()
            .environment(env(&[]))
            .local_env()
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_local_env_with_invalid_entry_fails() {
        let err = ClientBuilder::new()
            .environment(env(&[(CONFIG_SERVER_URLS, "http://a:8888,,http://b:8888")]))
            .local_env()
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidUrl(_)));
    }

    #[test]
    fn test_default_cf_service_builds_authenticated_backends() {
        let client = ClientBuilder::new()
            .environment(env(&[(VCAP_SERVICES, CATALOG)]))
            .default_cf_service()
            .build()
            .unwrap();
        assert_eq!(
            urls(&client),
            vec![
                "https://cloud-a.example.com/",
                "https://cloud-b.example.com/"
            ]
        );
        assert!(client.backends().iter().all(|b| b.is_authenticated()));
    }

    #[test]
    fn test_default_cf_service_legacy_only() {
        let catalog = r#"{"p-config-server": [{"credentials": {"uri": "https://legacy"}}]}"#;
        let client = ClientBuilder::new()
            .environment(env(&[(VCAP_SERVICES, catalog)]))
            .default_cf_service()
            .build()
            .unwrap();
        assert_eq!(urls(&client), vec!["https://legacy/"]);
    }

    #[test]
    fn test_default_cf_service_neither_found() {
        let err = ClientBuilder::new()
            .environment(env(&[(VCAP_SERVICES, r#"{"p-mysql": []}"#)]))
            .default_cf_service()
            .build()
            .unwrap_err();
        assert!(err.is_missing_service());
        assert!(err.to_string().contains("p.config-server"));
        assert!(err.to_string().contains("p-config-server"));
    }

    #[test]
    fn test_injected_catalog() {
        let catalog = Arc::new(VcapServices::from_json(CATALOG).unwrap());
        let client = ClientBuilder::new()
            .environment(env(&[]))
            .service_catalog(catalog)
            .cf_service("p-config-server")
            .build()
            .unwrap();
        assert_eq!(urls(&client), vec!["https://legacy.example.com/"]);
    }

    #[test]
    fn test_oauth2_option() {
        let client = ClientBuilder::new()
            .oauth2(
                "https://config.example.com",
                "id",
                "secret",
                "https://uaa.example.com/oauth/token",
            )
            .build()
            .unwrap();
        assert_eq!(client.backends().len(), 1);
        assert!(client.backends()[0].is_authenticated());
    }

    #[test]
    fn test_oauth2_option_requires_grant() {
        let err = ClientBuilder::new()
            .oauth2("https://config.example.com", "", "", "")
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidCredentials(_)));
    }

    #[test]
    fn test_every_option_contributes_backends() {
        let client = ClientBuilder::new()
            .environment(env(&[
                (CONFIG_SERVER_URLS, "http://env:8888"),
                (VCAP_SERVICES, CATALOG),
            ]))
            .local(["http://local:8888"])
            .local_env()
            .cf_service("p-config-server")
            .oauth2("https://oauth.example.com", "id", "secret", "https://t/token")
            .build()
            .unwrap();
        assert_eq!(
            urls(&client),
            vec![
                "http://local:8888/",
                "http://env:8888/",
                "https://legacy.example.com/",
                "https://oauth.example.com/",
            ]
        );
    }

    #[test]
    fn test_option_order_changes_order_not_members() {
        let environment = env(&[(VCAP_SERVICES, CATALOG)]);
        let local = BackendOption::Local(vec!["http://local:8888".to_string()]);
        let cloud = BackendOption::CfService("p.config-server".to_string());

        let forward = ClientBuilder::new()
            .environment(environment.clone())
            .options([local.clone(), cloud.clone()])
            .build()
            .unwrap();
        let reverse = ClientBuilder::new()
            .environment(environment)
            .options([cloud, local])
            .build()
            .unwrap();

        let forward_urls = urls(&forward);
        let reverse_urls = urls(&reverse);
        assert_eq!(
            forward_urls.iter().collect::<BTreeSet<_>>(),
            reverse_urls.iter().collect::<BTreeSet<_>>()
        );
        assert_eq!(forward_urls[0], "http://local:8888/");
        assert_eq!(reverse_urls[2], "http://local:8888/");
    }

    #[test]
    fn test_failing_option_aborts_build() {
        let err = ClientBuilder::new()
            .environment(env(&[]))
            .local(["http://local:8888"])
            .local_env()
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }

    #[test]
    fn test_option_debug_redacts_secret() {
        let option = BackendOption::OAuth2 {
            base_url: "https://c".to_string(),
            client_id: "id".to_string(),
            client_secret: "hunter2".to_string(),
            token_uri: "https://t".to_string(),
        };
        assert!(!format!("{:?}", option).contains("hunter2"));
    }
}
