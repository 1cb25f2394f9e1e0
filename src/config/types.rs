use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub lookup: LookupConfig,

    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

impl Config {
    /// Config entry for the provider with `key`, if any.
    pub fn provider(&self, key: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.key == key)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding imported module definitions. `~` is expanded.
    #[serde(default = "default_import_dir")]
    pub import_dir: PathBuf,
}

fn default_import_dir() -> PathBuf {
    PathBuf::from("~/.local/share/collectforge/modules")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            import_dir: default_import_dir(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LookupConfig {
    /// Budget for a single provider call
    #[serde(default = "default_provider_timeout")]
    pub provider_timeout_ms: u64,

    /// Budget for a whole lookup, across all providers
    #[serde(default = "default_overall_timeout")]
    pub overall_timeout_ms: u64,
}

fn default_provider_timeout() -> u64 {
    5_000
}
fn default_overall_timeout() -> u64 {
    10_000
}

impl LookupConfig {
    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            provider_timeout_ms: default_provider_timeout(),
            overall_timeout_ms: default_overall_timeout(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    pub key: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// API key handed to providers that require credentials
    #[serde(default)]
    pub api_key: Option<String>,

    /// Override of the provider's API base URL
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub requests_per_second: Option<u32>,
}

fn default_true() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            key: String::new(),
            enabled: true,
            api_key: None,
            base_url: None,
            requests_per_second: None,
        }
    }
}
