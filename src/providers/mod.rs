//! External metadata lookup.
//!
//! - [`provider`] -- The [`LookupProvider`] trait and result types.
//! - [`credentials`] -- Credential status per provider.
//! - [`registry`] -- The catalog of registered providers.
//! - [`lookup`] -- Concurrent fan-out and priority merge for one module.
//! - [`merge`] -- Field normalization and merge rules.
//! - [`openlibrary`], [`googlebooks`] -- Concrete book providers.

pub mod credentials;
pub mod googlebooks;
mod http;
pub mod lookup;
pub mod merge;
pub mod openlibrary;
pub mod provider;
pub mod registry;

use std::sync::Arc;

use collectforge_common::Result;
use tracing::info;

use crate::config::Config;

pub use credentials::{ConfigCredentialStore, CredentialStore};
pub use googlebooks::GoogleBooksProvider;
pub use lookup::{LookupOrchestrator, LookupResponse};
pub use openlibrary::OpenLibraryProvider;
pub use provider::{
    Confidence, LookupProvider, ProviderAsset, ProviderDescriptor, ProviderPayload, ProviderResult,
};
pub use registry::ProviderRegistry;

/// Build a registry holding the built-in providers that `config` leaves enabled.
///
/// Providers without a `[[providers]]` entry are enabled with defaults.
pub fn build_registry(config: &Config) -> Result<ProviderRegistry> {
    let credentials = Arc::new(ConfigCredentialStore::from_config(&config.providers));
    let registry = ProviderRegistry::new(credentials);

    let openlibrary = config.provider(openlibrary::OPENLIBRARY_KEY);
    if openlibrary.map_or(true, |p| p.enabled) {
        registry.register(Arc::new(OpenLibraryProvider::new(
            openlibrary.and_then(|p| p.base_url.as_deref()),
            openlibrary.and_then(|p| p.requests_per_second),
        )?));
    }

    let googlebooks = config.provider(googlebooks::GOOGLEBOOKS_KEY);
    if googlebooks.map_or(true, |p| p.enabled) {
        registry.register(Arc::new(GoogleBooksProvider::new(
            googlebooks.and_then(|p| p.api_key.clone()),
            googlebooks.and_then(|p| p.base_url.as_deref()),
            googlebooks.and_then(|p| p.requests_per_second),
        )?));
    }

    info!(providers = registry.len(), "Provider registry ready");
    Ok(registry)
}
