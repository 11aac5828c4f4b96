//! Decoding of fetched files into caller types.

use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Payload format, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// `.yml` and `.yaml` are YAML; everything else is treated as JSON.
    pub fn from_file_name(file: &str) -> Self {
        let extension = file
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_ascii_lowercase());
        match extension.as_deref() {
            Some("yml") | Some("yaml") => Format::Yaml,
            _ => Format::Json,
        }
    }
}

/// Decode `body`, fetched from `path`, into `T`.
pub fn decode<T: DeserializeOwned>(path: &str, format: Format, body: &[u8]) -> Result<T> {
    let decoded: std::result::Result<T, String> = match format {
        Format::Json => serde_json::from_slice(body).map_err(|e| e.to_string()),
        Format::Yaml => serde_yaml::from_slice(body).map_err(|e| e.to_string()),
    };
    decoded.map_err(|message| Error::Decode {
        path: path.to_string(),
        message,
    })
}
