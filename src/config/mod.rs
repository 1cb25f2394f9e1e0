mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let mut config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;
    expand_paths(&mut config);

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./collectforge.toml",
        "~/.config/collectforge/config.toml",
        "/etc/collectforge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // Return default config if no file found
    let mut config = Config::default();
    expand_paths(&mut config);
    Ok(config)
}

fn expand_paths(config: &mut Config) {
    let raw = config.storage.import_dir.to_string_lossy().into_owned();
    config.storage.import_dir = PathBuf::from(shellexpand::tilde(&raw).as_ref());
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    let lookup = &config.lookup;
    if lookup.provider_timeout_ms == 0 {
        anyhow::bail!("lookup.provider_timeout_ms cannot be 0");
    }
    if lookup.overall_timeout_ms == 0 {
        anyhow::bail!("lookup.overall_timeout_ms cannot be 0");
    }
    if lookup.provider_timeout_ms > lookup.overall_timeout_ms {
        anyhow::bail!(
            "lookup.provider_timeout_ms ({}) exceeds lookup.overall_timeout_ms ({})",
            lookup.provider_timeout_ms,
            lookup.overall_timeout_ms
        );
    }

    let mut seen = HashSet::new();
    for provider in &config.providers {
        if provider.key.trim().is_empty() {
            anyhow::bail!("Provider entry has an empty key");
        }
        if !seen.insert(provider.key.as_str()) {
            anyhow::bail!("Provider '{}' is configured more than once", provider.key);
        }
    }

    Ok(())
}
