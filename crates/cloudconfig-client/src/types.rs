//! Configuration documents returned by a Config Server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A resolved configuration for one application and set of profiles.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Configuration {
    /// Application name.
    pub name: String,
    /// Active profiles.
    #[serde(default)]
    pub profiles: Vec<String>,
    /// Branch or tag the configuration was read from.
    #[serde(default)]
    pub label: Option<String>,
    /// Repository version (commit id for git backends).
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    /// Property sources, highest precedence first.
    #[serde(default)]
    pub property_sources: Vec<PropertySource>,
}

/// One file's worth of properties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertySource {
    /// Where the properties came from, e.g. `https://repo/app-local.yml`.
    pub name: String,
    /// Flattened properties.
    #[serde(default)]
    pub source: Map<String, Value>,
}

impl Configuration {
    /// Look up a property. The first source that defines it wins.
    pub fn property(&self, key: &str) -> Option<&Value> {
        self.property_sources
            .iter()
            .find_map(|source| source.source.get(key))
    }

    /// Find the property source whose name ends with `suffix`.
    pub fn property_source(&self, suffix: &str) -> Option<&PropertySource> {
        self.property_sources
            .iter()
            .find(|source| source.name.ends_with(suffix))
    }

    /// Visit every property source in precedence order.
    pub fn handle_property_sources<F>(&self, mut handler: F)
    where
        F: FnMut(&PropertySource),
    {
        for source in &self.property_sources {
            handler(source);
        }
    }
}
