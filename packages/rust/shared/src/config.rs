//! Application configuration for omnivook.
//!
//! User config lives at `~/.omnivook/omnivook.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OmnivookError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "omnivook.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".omnivook";

/// Production GraphQL endpoint of the article service.
const DEFAULT_ENDPOINT: &str = "https://api-prod.omnivore.app/api/graphql";

// ---------------------------------------------------------------------------
// Config structs (matching omnivook.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Article service settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Document builder settings.
    #[serde(default)]
    pub build: BuildConfig,
}

/// `[api]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// GraphQL endpoint.
    #[serde(default = "default_endpoint")]
    pub endpoint: Url,

    /// Env vars checked in order for the API key (never store the key itself).
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Vec<String>,

    /// Search results requested per page.
    #[serde(default = "default_page_size")]
    pub page_size: u32,

    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            api_key_env: default_api_key_env(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_endpoint() -> Url {
    Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL")
}
fn default_api_key_env() -> Vec<String> {
    vec!["OMNIVORE_APIKEY".into(), "OMNIVORE_TOKEN".into()]
}
fn default_page_size() -> u32 {
    10
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[build]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildConfig {
    /// Executable invoked to compile the source tree.
    #[serde(default = "default_builder_cmd")]
    pub builder_cmd: String,

    /// Builder target name; also the `_build/` subdirectory holding the artifact.
    #[serde(default = "default_target")]
    pub target: String,

    /// Working source directory, created fresh for every retrieval.
    #[serde(default = "default_source_dir")]
    pub source_dir: PathBuf,

    /// Custom template directory copied instead of the built-in scaffold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub template_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            builder_cmd: default_builder_cmd(),
            target: default_target(),
            source_dir: default_source_dir(),
            template_dir: None,
        }
    }
}

fn default_builder_cmd() -> String {
    "sphinx-build".into()
}
fn default_target() -> String {
    "epub".into()
}
fn default_source_dir() -> PathBuf {
    PathBuf::from("source")
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.omnivook/`).
fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| OmnivookError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.omnivook/omnivook.toml`).
fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| OmnivookError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| OmnivookError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| OmnivookError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| OmnivookError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| OmnivookError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the API key from the first configured env var that is set and non-empty.
pub fn resolve_api_key(config: &ApiConfig) -> Result<String> {
    config
        .api_key_env
        .iter()
        .find_map(|name| std::env::var(name).ok().filter(|val| !val.is_empty()))
        .ok_or_else(|| {
            OmnivookError::config(format!(
                "article service API key not found. Set one of: {}",
                config.api_key_env.join(", ")
            ))
        })
}
