//! Credential status for lookup providers.
//!
//! How credentials are stored and protected is the store's business; the
//! rest of the system only asks whether a provider is configured.

use std::collections::HashSet;

use crate::config::ProviderConfig;

/// Source of truth for "does this provider have usable credentials".
pub trait CredentialStore: Send + Sync {
    fn is_configured(&self, provider_key: &str) -> bool;
}

/// Credential store backed by the `[[providers]]` config entries: a provider
/// is configured when its entry carries a non-empty API key.
#[derive(Debug, Clone, Default)]
pub struct ConfigCredentialStore {
    configured: HashSet<String>,
}

impl ConfigCredentialStore {
    pub fn from_config(providers: &[ProviderConfig]) -> Self {
        Self::with_configured(
            providers
                .iter()
                .filter(|p| p.api_key.as_deref().is_some_and(|k| !k.trim().is_empty()))
                .map(|p| p.key.clone()),
        )
    }

    /// Store that reports exactly `keys` as configured.
    pub fn with_configured<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            configured: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl CredentialStore for ConfigCredentialStore {
    fn is_configured(&self, provider_key: &str) -> bool {
        self.configured.contains(provider_key)
    }
}
