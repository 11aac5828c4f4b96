//! Settings file discovery and layering.
//!
//! Resolution order (later overrides earlier):
//! 1. `~/.config/cloudconfig/config.toml` (XDG user config)
//! 2. `./cloudconfig.toml` (project-local)
//! 3. CLI arguments (handled in `commands`)
//!
//! An explicit `--config` path replaces both files.

use std::path::{Path, PathBuf};
use std::time::Duration;

use cloudconfig_client::BackendOption;
use serde::Deserialize;

/// Default config filename for project-local settings.
const PROJECT_CONFIG_FILE: &str = "cloudconfig.toml";

/// Default config filename within the XDG config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Application name for XDG directory resolution.
const APP_NAME: &str = "cloudconfig";

/// Environment variable to override the user config directory.
pub const CONFIG_DIR_ENV: &str = "CLOUDCONFIG_CONFIG_DIR";

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read {path}: {source}")]
    ReadFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

pub type Result<T> = std::result::Result<T, SettingsError>;

/// Contents of a settings file.
///
/// ```toml
/// timeout_secs = 10
///
/// [[sources]]
/// type = "local"
/// urls = ["http://localhost:8888"]
///
/// [[sources]]
/// type = "cf-default"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Per-attempt request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Backend sources, in fallback order.
    #[serde(default)]
    pub sources: Vec<SourceSpec>,
}

/// One `[[sources]]` entry. Maps one-to-one onto a [`BackendOption`].
#[derive(Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SourceSpec {
    Local {
        urls: Vec<String>,
    },
    LocalEnv,
    CfService {
        name: String,
    },
    CfDefault,
    Oauth2 {
        url: String,
        client_id: String,
        client_secret: String,
        token_uri: String,
    },
}

impl std::fmt::Debug for SourceSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The secret goes through BackendOption's redacting Debug.
        std::fmt::Debug::fmt(&BackendOption::from(self.clone()), f)
    }
}

impl From<SourceSpec> for BackendOption {
    fn from(spec: SourceSpec) -> Self {
        match spec {
            SourceSpec::Local { urls } => BackendOption::Local(urls),
            SourceSpec::LocalEnv => BackendOption::LocalEnv,
            SourceSpec::CfService { name } => BackendOption::CfService(name),
            SourceSpec::CfDefault => BackendOption::DefaultCfService,
            SourceSpec::Oauth2 {
                url,
                client_id,
                client_secret,
                token_uri,
            } => BackendOption::OAuth2 {
                base_url: url,
                client_id,
                client_secret,
                token_uri,
            },
        }
    }
}

impl Settings {
    /// Parse settings from TOML text.
    pub fn from_toml(path: &Path, contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|source| SettingsError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Merge a later layer into this one.
    ///
    /// A layer that sets `timeout_secs` or any `sources` replaces the earlier
    /// value wholesale; sources are not concatenated across files.
    pub fn merge(&mut self, other: Settings) {
        if other.timeout_secs.is_some() {
            self.timeout_secs = other.timeout_secs;
        }
        if !other.sources.is_empty() {
            self.sources = other.sources;
        }
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }

    /// The configured sources as builder options.
    pub fn options(&self) -> Vec<BackendOption> {
        self.sources.iter().cloned().map(BackendOption::from).collect()
    }
}

/// Result of settings discovery.
#[derive(Debug, Clone, Default)]
pub struct LoadedSettings {
    /// The merged settings.
    pub settings: Settings,
    /// Files that were actually loaded, lowest precedence first.
    pub loaded_from: Vec<PathBuf>,
    /// Discovered files that could not be loaded.
    pub warnings: Vec<String>,
}

/// Load settings.
///
/// With `explicit`, only that file is read and any failure is an error.
/// Otherwise the user and project files are layered; missing files are
/// skipped and broken ones are reported in `warnings`.
pub fn load(
    explicit: Option<&Path>,
    config_dir: Option<&Path>,
    project_dir: Option<&Path>,
) -> Result<LoadedSettings> {
    if let Some(path) = explicit {
        return Ok(LoadedSettings {
            settings: load_file(path)?,
            loaded_from: vec![path.to_path_buf()],
            warnings: Vec::new(),
        });
    }

    let mut loaded = LoadedSettings::default();

    let user_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => xdg_config_path(),
    };
    if let Some(path) = user_path {
        load_layer(&mut loaded, &path);
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    load_layer(&mut loaded, &project_path);

    Ok(loaded)
}

/// Load settings from a specific file (no discovery).
pub fn load_file(path: &Path) -> Result<Settings> {
    let contents = std::fs::read_to_string(path).map_err(|source| SettingsError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    Settings::from_toml(path, &contents)
}

/// `config.toml` in the user config directory.
pub fn xdg_config_path() -> Option<PathBuf> {
    xdg_config_dir().map(|d| d.join(USER_CONFIG_FILE))
}

/// The user config directory for cloudconfig.
///
/// Checks `CLOUDCONFIG_CONFIG_DIR` first, then the platform default.
pub fn xdg_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(APP_NAME))
}

fn load_layer(loaded: &mut LoadedSettings, path: &Path) {
    if !path.is_file() {
        return;
    }
    match load_file(path) {
        Ok(layer) => {
            loaded.settings.merge(layer);
            loaded.loaded_from.push(path.to_path_buf());
        }
        Err(e) => loaded.warnings.push(e.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
