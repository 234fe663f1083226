//! Application configuration for MindGraph.
//!
//! User config lives at `~/.mindgraph/mindgraph.toml`.
//! CLI flags override config file values, which override defaults.
//! Secrets are never stored in the file: it only names the env vars that hold them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{MindGraphError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "mindgraph.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".mindgraph";

// ---------------------------------------------------------------------------
// Config structs (matching mindgraph.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// HTTP listener and CORS settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Gemini settings.
    #[serde(default)]
    pub gemini: GeminiConfig,

    /// Graph store settings.
    #[serde(default)]
    pub graph_store: GraphStoreConfig,
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Origins allowed to call the API from a browser.
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}

fn default_bind() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    8000
}
fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:5173".into()]
}

/// `[gemini]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model used for answers.
    #[serde(default = "default_model")]
    pub model: String,

    /// API root, overridable for proxies and tests.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Upper bound for a single generate call.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_api_key_env() -> String {
    "GEMINI_API_KEY".into()
}
fn default_model() -> String {
    "gemini-2.5-flash".into()
}
fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".into()
}
fn default_timeout_secs() -> u64 {
    30
}

/// `[graph_store]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphStoreConfig {
    /// Local database file. `~` is expanded.
    #[serde(default = "default_db_path")]
    pub path: String,

    /// Remote libSQL server; takes precedence over `path` when set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    /// Name of the env var holding the remote auth token.
    #[serde(default = "default_auth_token_env")]
    pub auth_token_env: String,
}

impl Default for GraphStoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
            url: None,
            auth_token_env: default_auth_token_env(),
        }
    }
}

fn default_db_path() -> String {
    format!("~/{CONFIG_DIR_NAME}/graph.db")
}
fn default_auth_token_env() -> String {
    "MINDGRAPH_DB_TOKEN".into()
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.mindgraph/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| MindGraphError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.mindgraph/mindgraph.toml`).
pub fn config_file_path() -> Result<PathBuf> {
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
    let content = std::fs::read_to_string(path).map_err(|e| MindGraphError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        MindGraphError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Write a default config file to `~/.mindgraph/mindgraph.toml`.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let path = config_file_path()?;
    init_config_at(&path)?;
    Ok(path)
}

/// Write a default config file at `path`, creating parent directories.
///
/// Refuses to replace an existing file.
pub fn init_config_at(path: &Path) -> Result<()> {
    if path.exists() {
        return Err(MindGraphError::config(format!(
            "{} already exists; edit it or remove it first",
            path.display()
        )));
    }

    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| MindGraphError::io(dir, e))?;
    }

    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| MindGraphError::config(e.to_string()))?;

    std::fs::write(path, content).map_err(|e| MindGraphError::io(path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(())
}

/// Expand a leading `~/` to the user's home directory.
pub fn expand_home(path: &str) -> Result<PathBuf> {
    match path.strip_prefix("~/") {
        Some(rest) => {
            let home = dirs::home_dir()
                .ok_or_else(|| MindGraphError::config("could not determine home directory"))?;
            Ok(home.join(rest))
        }
        None => Ok(PathBuf::from(path)),
    }
}

// ---------------------------------------------------------------------------
// Startup validation
// ---------------------------------------------------------------------------

/// Read the Gemini API key from the configured env var.
///
/// Fails with [`MindGraphError::Config`] when it is unset or empty, when
/// `base_url` is not a valid URL, or when `timeout_secs` is zero.
pub fn resolve_api_key(config: &GeminiConfig) -> Result<String> {
    if config.timeout_secs == 0 {
        return Err(MindGraphError::config("gemini.timeout_secs must be at least 1"));
    }

    Url::parse(&config.base_url).map_err(|e| {
        MindGraphError::config(format!("invalid gemini.base_url {:?}: {e}", config.base_url))
    })?;

    let var_name = &config.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(MindGraphError::config(format!(
            "Gemini API key not found. Set the {var_name} environment variable."
        ))),
    }
}

/// Read the remote store auth token, if a remote store is configured.
///
/// Returns `Ok(None)` for a local store.
pub fn resolve_store_token(config: &GraphStoreConfig) -> Result<Option<String>> {
    let Some(url) = &config.url else {
        return Ok(None);
    };

    let var_name = &config.auth_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(Some(val)),
        _ => Err(MindGraphError::config(format!(
            "graph store {url} requires an auth token. Set the {var_name} environment variable."
        ))),
    }
}
