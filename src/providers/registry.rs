//! Catalog of registered [`LookupProvider`] implementations.
//!
//! The [`ProviderRegistry`] owns every provider known to the process together
//! with the [`CredentialStore`] that decides whether a provider is usable.
//! Registration may happen at any time; readers always see a consistent
//! catalog.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use super::credentials::CredentialStore;
use super::provider::{LookupProvider, ProviderDescriptor};

/// A registry that manages [`LookupProvider`] implementations by key.
///
/// # Examples
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use collectforge::providers::{ConfigCredentialStore, ProviderRegistry};
///
/// let registry = ProviderRegistry::new(Arc::new(ConfigCredentialStore::default()));
/// registry.register(Arc::new(my_provider));
/// ```
pub struct ProviderRegistry {
    providers: RwLock<Vec<Arc<dyn LookupProvider>>>,
    credentials: Arc<dyn CredentialStore>,
}

impl ProviderRegistry {
    /// Create an empty registry.
    pub fn new(credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            providers: RwLock::new(Vec::new()),
            credentials,
        }
    }

    /// Register a provider, replacing any existing provider with the same key.
    pub fn register(&self, provider: Arc<dyn LookupProvider>) {
        let key = provider.key().to_string();
        let mut providers = self.providers.write();
        if let Some(slot) = providers.iter_mut().find(|p| p.key() == key) {
            debug!(provider = %key, "Replacing registered provider");
            *slot = provider;
        } else {
            info!(provider = %key, "Registered lookup provider");
            providers.push(provider);
        }
    }

    /// Look up a provider by key.
    pub fn get(&self, key: &str) -> Option<Arc<dyn LookupProvider>> {
        self.providers
            .read()
            .iter()
            .find(|p| p.key() == key)
            .cloned()
    }

    /// Describe a provider by key.
    pub fn descriptor(&self, key: &str) -> Option<ProviderDescriptor> {
        self.get(key).map(|p| self.describe(p.as_ref()))
    }

    /// Whether `key` is registered and its credentials requirement is met.
    pub fn is_available(&self, key: &str) -> bool {
        self.descriptor(key).is_some_and(|d| d.is_available())
    }

    /// All providers, ordered by priority ascending then key.
    pub fn list(&self) -> Vec<ProviderDescriptor> {
        let mut descriptors: Vec<_> = self
            .providers
            .read()
            .iter()
            .map(|p| self.describe(p.as_ref()))
            .collect();
        descriptors.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.key.cmp(&b.key)));
        descriptors
    }

    pub fn len(&self) -> usize {
        self.providers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.read().is_empty()
    }

    fn describe(&self, provider: &dyn LookupProvider) -> ProviderDescriptor {
        ProviderDescriptor {
            key: provider.key().to_string(),
            display_name: provider.display_name().to_string(),
            description: provider.description().to_string(),
            identifier_types: provider.identifier_types().to_vec(),
            priority: provider.priority(),
            requires_credentials: provider.requires_credentials(),
            credentials_configured: self.credentials.is_configured(provider.key()),
        }
    }
}
