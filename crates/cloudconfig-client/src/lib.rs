//! Client for Spring Cloud Config Servers.
//!
//! A [`ConfigClient`] talks to one or more Config Servers. They can be running
//! locally, listed in `CONFIG_SERVER_URLS`, bound to the application through
//! the Cloud Foundry service catalog (`VCAP_SERVICES`), or protected by an
//! OAuth2 client-credentials grant. Options can be combined; every request
//! falls back across the resulting backends in order.
//!
//! # Example
//!
//! ```no_run
//! use std::collections::HashMap;
//!
//! use cloudconfig_client::{ConfigClient, Result};
//!
//! # async fn example() -> Result<()> {
//! let client = ConfigClient::builder()
//!     .local(["http://localhost:8888"])
//!     .default_cf_service()
//!     .build()?;
//!
//! // Load an application's configuration
//! let configuration = client.get_configuration("test-app", &["local"]).await?;
//! if let Some(source) = configuration.property_source("application-local.yml") {
//!     println!("local properties: {:?}", source.source);
//! }
//!
//! // Load a plain file from the default branch, then from a named one
//! let file: HashMap<String, String> = client.get_file("fooDir", "bar.json").await?;
//! let develop: HashMap<String, String> =
//!     client.get_file_from_branch("develop", "fooDir", "bar.json").await?;
//! # let _ = (file, develop);
//! # Ok(())
//! # }
//! ```
//!
//! # Fallback
//!
//! Backends are tried one at a time, in the order the options were added:
//!
//! - success returns immediately
//! - an unreachable backend or a 5xx response moves on to the next backend
//! - any other response (404, 401, ...) is returned without trying the rest
//! - when every backend failed, [`Error::AllBackendsFailed`] carries each cause

pub mod backend;
pub mod builder;
pub mod catalog;
pub mod client;
pub mod credentials;
pub mod decode;
pub mod env;
pub mod error;
pub mod resolver;
pub mod transport;
pub mod types;

pub use backend::BackendClient;
pub use builder::{BackendOption, ClientBuilder};
pub use catalog::{ServiceCatalog, ServiceInstance, VCAP_SERVICES, VcapServices};
pub use client::ConfigClient;
pub use credentials::Credentials;
pub use env::{Environment, ProcessEnvironment};
pub use error::{Error, Result};
pub use resolver::{
    CONFIG_SERVER_NAME, CONFIG_SERVER_URLS, CredentialResolver, CredentialSource,
    DEFAULT_SERVICE_NAMES, SPRING_CLOUD_CONFIG_SERVER_NAME,
};
pub use transport::{Transport, TransportFactory};
pub use types::{Configuration, PropertySource};
