//! CLI command handlers.

use std::time::Duration;

use anyhow::{Result, bail};
use clap::Args;
use cloudconfig_client::{BackendOption, ConfigClient};

pub mod backends;
pub mod config;
pub mod file;

/// Where to find Config Servers. Shared by every command.
#[derive(Args, Debug, Default)]
pub struct SourceArgs {
    /// Base URL of a locally running Config Server (repeatable)
    #[arg(long = "url", value_name = "URL", global = true)]
    pub urls: Vec<String>,

    /// Use the servers listed in CONFIG_SERVER_URLS
    #[arg(long, global = true)]
    pub from_env: bool,

    /// Use the servers bound under this service name in VCAP_SERVICES (repeatable)
    #[arg(long = "cf-service", value_name = "NAME", global = true)]
    pub cf_services: Vec<String>,

    /// Use the default Config Server service binding in VCAP_SERVICES
    #[arg(long, global = true)]
    pub cf_default: bool,

    /// Base URL of an OAuth2-protected Config Server
    #[arg(long, value_name = "URL", global = true)]
    pub oauth2_url: Option<String>,

    /// OAuth2 client id
    #[arg(long, value_name = "ID", global = true, env = "CLOUDCONFIG_OAUTH2_CLIENT_ID")]
    pub oauth2_client_id: Option<String>,

    /// OAuth2 client secret
    #[arg(
        long,
        value_name = "SECRET",
        global = true,
        env = "CLOUDCONFIG_OAUTH2_CLIENT_SECRET",
        hide_env_values = true
    )]
    pub oauth2_client_secret: Option<String>,

    /// OAuth2 token endpoint
    #[arg(long, value_name = "URI", global = true, env = "CLOUDCONFIG_OAUTH2_TOKEN_URI")]
    pub oauth2_token_uri: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS", global = true, env = "CLOUDCONFIG_TIMEOUT")]
    pub timeout: Option<u64>,
}

impl SourceArgs {
    /// Options from the command line, in a fixed order: `--url`,
    /// `--from-env`, `--cf-service`, `--cf-default`, then `--oauth2-*`.
    pub fn options(&self) -> Result<Vec<BackendOption>> {
        let mut options = Vec::new();

        if !self.urls.is_empty() {
            options.push(BackendOption::Local(self.urls.clone()));
        }
        if self.from_env {
            options.push(BackendOption::LocalEnv);
        }
        for name in &self.cf_services {
            options.push(BackendOption::CfService(name.clone()));
        }
        if self.cf_default {
            options.push(BackendOption::DefaultCfService);
        }

        // The id, secret and token URI may come from the environment, so only
        // --oauth2-url switches the option on.
        if let Some(base_url) = &self.oauth2_url {
            match (
                &self.oauth2_client_id,
                &self.oauth2_client_secret,
                &self.oauth2_token_uri,
            ) {
                (Some(client_id), Some(client_secret), Some(token_uri)) => {
                    options.push(BackendOption::OAuth2 {
                        base_url: base_url.clone(),
                        client_id: client_id.clone(),
                        client_secret: client_secret.clone(),
                        token_uri: token_uri.clone(),
                    });
                }
                _ => bail!(
                    "--oauth2-url requires --oauth2-client-id, --oauth2-client-secret and --oauth2-token-uri"
                ),
            }
        }

        Ok(options)
    }
}

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Backend options: settings-file sources first, then flags.
    pub options: Vec<BackendOption>,
    /// Per-request timeout, if overridden.
    pub timeout: Option<Duration>,
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
}

impl Context {
    /// Build a client from the configured options.
    pub fn client(&self) -> Result<ConfigClient> {
        let mut builder = ConfigClient::builder()
            .options(self.options.iter().cloned())
            .user_agent(concat!("cloudconfig/", env!("CARGO_PKG_VERSION")));
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(builder.build()?)
    }
}
