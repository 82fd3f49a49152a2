use figment::{
    Figment,
    providers::{Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;

/// Library configuration managed by Figment.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Credential pool settings (see `pool` table in config.toml).
    #[serde(default)]
    pub pool: PoolConfig,

    /// GitHub endpoint settings (see `github` table in config.toml).
    #[serde(default)]
    pub github: GithubConfig,

    /// Credential descriptors loaded into the pool at startup: a bare tag
    /// (`"null"`) or `[tag, arg…]` (e.g. `["pat", "ghp_…"]`).
    #[serde(default)]
    pub credentials: Vec<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Pool file location, shared between processes.
    /// TOML: `pool.path`. Default: `pool.json`.
    #[serde(default = "default_pool_path")]
    pub path: PathBuf,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            path: default_pool_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubConfig {
    /// REST API base URL.
    /// TOML: `github.api_base`. Default: `https://api.github.com`.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Base URL for repository HTML pages.
    /// TOML: `github.html_base`. Default: `https://github.com`.
    #[serde(default = "default_html_base")]
    pub html_base: String,

    /// User-Agent header sent on API calls and page fetches.
    /// TOML: `github.user_agent`. Default: `octogauge/<crate version>`.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout in seconds.
    /// TOML: `github.timeout_secs`. Default: `30`.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for GithubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            html_base: default_html_base(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

const DEFAULT_CONFIG_FILE: &str = "config.toml";

impl Config {
    /// Builds a Figment that merges defaults and a config TOML file.
    pub fn figment() -> Figment {
        let figment = Figment::new().merge(Serialized::defaults(Config::default()));
        if PathBuf::from(DEFAULT_CONFIG_FILE).is_file() {
            figment.merge(Toml::file(DEFAULT_CONFIG_FILE))
        } else {
            figment
        }
    }

    /// Loads configuration by merging defaults and `config.toml` if present.
    pub fn from_optional_toml() -> Self {
        Self::figment().extract().unwrap_or_else(|err| {
            panic!("failed to extract configuration (defaults + optional config.toml): {err}")
        })
    }
}

fn default_pool_path() -> PathBuf {
    PathBuf::from("pool.json")
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_html_base() -> String {
    "https://github.com".to_string()
}

fn default_user_agent() -> String {
    concat!("octogauge/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane_without_a_config_file() {
        let cfg = Config::default();
        assert_eq!(cfg.pool.path, PathBuf::from("pool.json"));
        assert_eq!(cfg.github.api_base, "https://api.github.com");
        assert_eq!(cfg.github.html_base, "https://github.com");
        assert_eq!(cfg.github.timeout_secs, 30);
        assert!(cfg.credentials.is_empty());
    }

    #[test]
    fn figment_extract_roundtrips_defaults() {
        let cfg: Config = Config::figment().extract().expect("extract defaults");
        assert_eq!(cfg.github.api_base, Config::default().github.api_base);
    }
}
