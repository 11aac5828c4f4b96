//! Platform service-binding catalog (`VCAP_SERVICES`).
//!
//! Cloud Foundry injects bound services as JSON keyed by service label:
//!
//! ```json
//! {
//!   "p.config-server": [
//!     {
//!       "name": "config-server",
//!       "credentials": {
//!         "uri": "https://config.example.com",
//!         "client_id": "my-app",
//!         "client_secret": "secret",
//!         "access_token_uri": "https://uaa.example.com/oauth/token"
//!       }
//!     }
//!   ]
//! }
//! ```

use std::collections::HashMap;

use serde::Deserialize;

use crate::credentials::Credentials;
use crate::env::Environment;
use crate::error::{Error, Result};

/// Environment variable holding the service catalog.
pub const VCAP_SERVICES: &str = "VCAP_SERVICES";

/// Lookup of service credentials by service name.
pub trait ServiceCatalog: Send + Sync {
    /// Credentials of every instance bound under `service`, in catalog order.
    ///
    /// Fails with [`Error::MissingService`] when the service is not bound.
    fn credentials(&self, service: &str) -> Result<Vec<Credentials>>;
}

/// One bound service instance.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceInstance {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub label: String,
    pub credentials: Credentials,
}

/// Parsed `VCAP_SERVICES` document.
#[derive(Debug, Clone, Default)]
pub struct VcapServices {
    services: HashMap<String, Vec<ServiceInstance>>,
}

impl VcapServices {
    /// Parse a catalog from its JSON form.
    pub fn from_json(json: &str) -> Result<Self> {
        let services = serde_json::from_str(json).map_err(|e| {
            Error::ServiceCatalog(format!("failed to parse {}: {}", VCAP_SERVICES, e))
        })?;
        Ok(Self { services })
    }

    /// Read and parse the catalog from `VCAP_SERVICES`.
    pub fn from_environment(env: &dyn Environment) -> Result<Self> {
        match env.var(VCAP_SERVICES) {
            Some(json) if !json.is_empty() => Self::from_json(&json),
            _ => Err(Error::Configuration(format!(
                "environment variable {} is not set",
                VCAP_SERVICES
            ))),
        }
    }

    /// Names of all bound services.
    pub fn service_names(&self) -> impl Iterator<Item = &str> {
        self.services.keys().map(String::as_str)
    }

    /// Instances bound under `service`, in catalog order.
    pub fn instances(&self, service: &str) -> &[ServiceInstance] {
        self.services.get(service).map(Vec::as_slice).unwrap_or_default()
    }
}

impl ServiceCatalog for VcapServices {
    fn credentials(&self, service: &str) -> Result<Vec<Credentials>> {
        match self.services.get(service) {
            Some(instances) if !instances.is_empty() => Ok(instances
                .iter()
                .map(|instance| {
                    tracing::debug!(
                        service,
                        instance = %instance.name,
                        label = %instance.label,
                        uri = %instance.credentials.uri,
                        "Found bound Config Server"
                    );
                    instance.credentials.clone()
                })
                .collect()),
            _ => Err(Error::MissingService {
                names: vec![service.to_string()],
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CATALOG: &str = r#"{
        "p.config-server": [
            {
                "name": "config-a",
                "label": "p.config-server",
                "credentials": {
                    "uri": "https://config-a.example.com",
                    "client_id": "app",
                    "client_secret": "secret",
                    "access_token_uri": "https://uaa.example.com/oauth/token"
                }
            },
            {
                "name": "config-b",
                "credentials": { "uri": "https://config-b.example.com" }
            }
        ],
        "p-mysql": [
            { "name": "db", "credentials": { "uri": "mysql://db" } }
        ],
        "empty": []
    }"#;

    #[test]
    fn test_instances_keep_name_and_label() {
        let catalog = VcapServices::from_json(CATALOG).unwrap();
        let instances = catalog.instances("p.config-server");
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].name, "config-a");
        assert_eq!(instances[0].label, "p.config-server");
        assert_eq!(instances[1].name, "config-b");
        assert_eq!(instances[1].label, "");
        assert!(catalog.instances("p-config-server").is_empty());
    }

    #[test]
    fn test_credentials_in_catalog_order() {
        let catalog = VcapServices::from_json(CATALOG).unwrap();
        let creds = catalog.credentials("p.config-server").unwrap();
        assert_eq!(creds.len(), 2);
        assert_eq!(creds[0].uri, "https://config-a.example.com");
        assert_eq!(creds[0].client_id.as_deref(), Some("app"));
        assert_eq!(creds[1].uri, "https://config-b.example.com");
        assert!(creds[1].client_id.is_none());
    }

    #[test]
    fn test_missing_service() {
        let catalog = VcapServices::from_json(CATALOG).unwrap();
        let err = catalog.credentials("p-config-server").unwrap_err();
        assert!(err.is_missing_service());
    }

    #[test]
    fn test_empty_service_counts_as_missing() {
        let catalog = VcapServices::from_json(CATALOG).unwrap();
        assert!(catalog.credentials("empty").unwrap_err().is_missing_service());
    }

    #[test]
    fn test_malformed_catalog() {
        let err = VcapServices::from_json("{not json").unwrap_err();
        assert!(matches!(err, Error::ServiceCatalog(_)));

        let err = VcapServices::from_json(r#"{"svc": [{"credentials": {}}]}"#).unwrap_err();
        assert!(matches!(err, Error::ServiceCatalog(_)));
    }

    #[test]
    fn test_from_environment() {
        let mut env = HashMap::new();
        assert!(matches!(
            VcapServices::from_environment(&env).unwrap_err(),
            Error::Configuration(_)
        ));

        env.insert(VCAP_SERVICES.to_string(), CATALOG.to_string());
        let catalog = VcapServices::from_environment(&env).unwrap();
        let mut names: Vec<_> = catalog.service_names().collect();
        names.sort();
        assert_eq!(names, vec!["empty", "p-mysql", "p.config-server"]);
    }
}
