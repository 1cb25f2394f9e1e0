//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which owns a temporary import directory, a loaded
//! [`ModuleRegistry`], and a [`ProviderRegistry`] populated with
//! [`StubProvider`]s whose latency and answers are scripted per test.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tempfile::TempDir;

use collectforge::config::LookupConfig;
use collectforge::modules::{ImportStorage, ModuleRegistry};
use collectforge::providers::{
    ConfigCredentialStore, Confidence, LookupOrchestrator, LookupProvider, ProviderAsset,
    ProviderPayload, ProviderRegistry,
};
use collectforge_common::{Error, Identifier, IdentifierType, ProviderErrorKind, Result};

/// A module with three ISBN providers, used by the lookup tests.
pub const RECORDS_MODULE: &str = r#"
key = "records"
version = "1.0.0"
name = "Records"

[[providers]]
key = "alpha"
priority = 1
identifier_types = ["ISBN"]

[[providers]]
key = "beta"
priority = 2

[[providers]]
key = "gamma"
priority = 3

[[fields]]
key = "isbn"
type = "IDENTIFIER"
identifier_types = ["ISBN", "UPC"]
order = 0

[[fields]]
key = "title"
type = "TEXT"
order = 1

[[fields.providers]]
provider = "alpha"
path = "title"

[[fields.providers]]
provider = "beta"
path = "title"

[[fields.providers]]
provider = "gamma"
path = "name"

[[fields]]
key = "year"
type = "NUMBER"
order = 2

[[fields.providers]]
provider = "alpha"
path = "year"

[[fields.providers]]
provider = "beta"
path = "released.year"
"#;

/// A scripted [`LookupProvider`].
pub struct StubProvider {
    pub key: String,
    pub types: Vec<IdentifierType>,
    pub delay: Duration,
    pub answer: Option<Value>,
    pub assets: Vec<ProviderAsset>,
    pub score: u8,
    pub fail: Option<ProviderErrorKind>,
    pub needs_credentials: bool,
}

impl StubProvider {
    /// A provider that answers `raw` immediately with confidence `score`.
    pub fn answering(key: &str, raw: Value, score: u8) -> Self {
        Self {
            key: key.to_string(),
            types: vec![IdentifierType::Isbn],
            delay: Duration::ZERO,
            answer: Some(raw),
            assets: Vec::new(),
            score,
            fail: None,
            needs_credentials: false,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_assets(mut self, urls: &[&str]) -> Self {
        self.assets = urls.iter().map(|u| ProviderAsset::new("cover", *u)).collect();
        self
    }

    pub fn failing(mut self, kind: ProviderErrorKind) -> Self {
        self.fail = Some(kind);
        self
    }
}

#[async_trait]
impl LookupProvider for StubProvider {
    fn key(&self) -> &str {
        &self.key
    }

    fn display_name(&self) -> &str {
        &self.key
    }

    fn identifier_types(&self) -> &[IdentifierType] {
        &self.types
    }

    fn requires_credentials(&self) -> bool {
        self.needs_credentials
    }

    async fn lookup(&self, _identifiers: &[Identifier]) -> Result<Option<ProviderPayload>> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if let Some(kind) = self.fail {
            return Err(Error::provider(&self.key, kind, "scripted failure"));
        }
        Ok(self.answer.clone().map(|raw_fields| ProviderPayload {
            raw_fields,
            assets: self.assets.clone(),
        }))
    }

    fn score_confidence(&self, _payload: &ProviderPayload, _identifiers: &[Identifier]) -> Confidence {
        Confidence::new(self.score)
    }
}

/// Test harness wrapping a module registry rooted in a temporary directory.
pub struct TestHarness {
    pub dir: TempDir,
    pub modules: Arc<ModuleRegistry>,
    pub providers: Arc<ProviderRegistry>,
}

impl TestHarness {
    /// Create a harness with the builtin modules loaded and no providers.
    pub fn new() -> Self {
        Self::with_credentials(&[])
    }

    /// Create a harness whose credential store reports `configured` as set.
    pub fn with_credentials(configured: &[&str]) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let storage = ImportStorage::open(dir.path()).expect("failed to open import storage");
        let modules = Arc::new(ModuleRegistry::new(storage));
        modules.load().expect("failed to load modules");
        let credentials = ConfigCredentialStore::with_configured(configured.iter().copied());
        let providers = Arc::new(ProviderRegistry::new(Arc::new(credentials)));
        Self {
            dir,
            modules,
            providers,
        }
    }

    /// Import [`RECORDS_MODULE`] through the registry.
    pub fn with_records_module(self) -> Self {
        self.modules
            .import_file("records.toml", RECORDS_MODULE.as_bytes())
            .expect("failed to import records module");
        self
    }

    pub fn register(&self, provider: StubProvider) {
        self.providers.register(Arc::new(provider));
    }

    /// Orchestrator with the given per-provider and overall budgets.
    pub fn orchestrator(&self, provider_ms: u64, overall_ms: u64) -> LookupOrchestrator {
        let config = LookupConfig {
            provider_timeout_ms: provider_ms,
            overall_timeout_ms: overall_ms,
        };
        LookupOrchestrator::new(
            Arc::clone(&self.modules),
            Arc::clone(&self.providers),
            &config,
        )
    }
}

pub fn isbn(value: &str) -> Identifier {
    Identifier::new(IdentifierType::Isbn, value).expect("valid isbn")
}
