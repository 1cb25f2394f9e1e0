//! Trait definition and types for lookup providers.
//!
//! This module defines the [`LookupProvider`] trait that every external
//! metadata source (Open Library, Google Books, ...) implements, along with
//! the data types exchanged with the lookup orchestrator.

use std::collections::BTreeMap;

use async_trait::async_trait;
use collectforge_common::{Identifier, IdentifierType, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ---------------------------------------------------------------------------
// Results
// ---------------------------------------------------------------------------

/// An auxiliary resource returned by a provider, such as a cover image.
///
/// Assets are identified by their URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderAsset {
    /// Kind of asset, e.g. `"cover"`.
    pub kind: String,
    pub url: String,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ProviderAsset {
    /// Create an asset with unknown dimensions.
    pub fn new(kind: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            url: url.into(),
            width: None,
            height: None,
        }
    }

    /// The identity used to deduplicate assets across providers.
    pub fn identity(&self) -> &str {
        &self.url
    }
}

/// A provider's self-reported quality for one answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Confidence {
    /// 0 - 100.
    pub score: u8,
    pub label: String,
}

impl Confidence {
    /// Build a confidence value, clamping `score` to 100 and deriving the label.
    pub fn new(score: u8) -> Self {
        let score = score.min(100);
        let label = match score {
            80..=100 => "high",
            50..=79 => "medium",
            1..=49 => "low",
            _ => "none",
        };
        Self {
            score,
            label: label.to_string(),
        }
    }

    /// Score proportional to how many of `expected` attributes were present.
    pub fn from_completeness(present: usize, expected: usize) -> Self {
        if expected == 0 {
            return Self::new(0);
        }
        let ratio = present.min(expected) as f64 / expected as f64;
        Self::new((ratio * 100.0).round() as u8)
    }
}

/// What a provider returns for one lookup, before mapping to module fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderPayload {
    /// The provider's record, as returned.
    pub raw_fields: Value,
    pub assets: Vec<ProviderAsset>,
}

impl ProviderPayload {
    /// Number of top-level attributes in the record that are present and non-null.
    pub fn populated_count(&self, keys: &[&str]) -> usize {
        keys.iter()
            .filter(|key| self.raw_fields.get(**key).is_some_and(|v| !is_empty_value(v)))
            .count()
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

/// One provider's contribution to a lookup response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResult {
    pub provider_key: String,
    /// Priority declared by the module for this provider.
    pub priority: i32,
    pub raw_fields: Value,
    /// Module field key to value, extracted through the module's mappings.
    pub normalized_fields: BTreeMap<String, Value>,
    pub assets: Vec<ProviderAsset>,
    pub confidence: Confidence,
}

/// Catalog entry describing a registered provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderDescriptor {
    pub key: String,
    pub display_name: String,
    pub description: String,
    pub identifier_types: Vec<IdentifierType>,
    pub priority: i32,
    pub requires_credentials: bool,
    pub credentials_configured: bool,
}

impl ProviderDescriptor {
    /// Whether the provider can currently be queried.
    pub fn is_available(&self) -> bool {
        !self.requires_credentials || self.credentials_configured
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that all lookup providers implement.
///
/// Each provider wraps one external API and answers identifier lookups with
/// its raw record. Providers are shared across tasks behind an `Arc`.
#[async_trait]
pub trait LookupProvider: Send + Sync {
    /// Short, lowercase key for this provider (e.g. `"openlibrary"`).
    fn key(&self) -> &str;

    /// Human-readable name.
    fn display_name(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    /// Identifier types this provider can look up.
    fn identifier_types(&self) -> &[IdentifierType];

    /// Default catalog ordering; modules declare their own priorities.
    fn priority(&self) -> i32 {
        100
    }

    /// Whether the provider needs credentials from the credential store.
    fn requires_credentials(&self) -> bool {
        false
    }

    fn supports_identifier_type(&self, id_type: &IdentifierType) -> bool {
        self.identifier_types().contains(id_type)
    }

    /// Look up an item. `identifiers` only contains supported types.
    ///
    /// Returns `Ok(None)` when the provider has no record for the identifiers.
    async fn lookup(&self, identifiers: &[Identifier]) -> Result<Option<ProviderPayload>>;

    /// Score how trustworthy `payload` is as an answer for `identifiers`.
    fn score_confidence(&self, payload: &ProviderPayload, _identifiers: &[Identifier]) -> Confidence {
        match &payload.raw_fields {
            Value::Object(map) if !map.is_empty() => Confidence::new(50),
            _ => Confidence::new(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn confidence_labels_follow_score_bands() {
        assert_eq!(Confidence::new(95).label, "high");
        assert_eq!(Confidence::new(80).label, "high");
        assert_eq!(Confidence::new(79).label, "medium");
        assert_eq!(Confidence::new(10).label, "low");
        assert_eq!(Confidence::new(0).label, "none");
        assert_eq!(Confidence::new(250).score, 100);
    }

    #[test]
    fn completeness_scales_to_percent() {
        assert_eq!(Confidence::from_completeness(3, 4).score, 75);
        assert_eq!(Confidence::from_completeness(6, 6).score, 100);
        assert_eq!(Confidence::from_completeness(9, 6).score, 100);
        assert_eq!(Confidence::from_completeness(1, 0).score, 0);
    }

    #[test]
    fn populated_count_ignores_empty_values() {
        let payload = ProviderPayload {
            raw_fields: json!({
                "title": "Dune",
                "subtitle": "",
                "authors": [],
                "publisher": null,
                "pages": 412
            }),
            assets: Vec::new(),
        };
        assert_eq!(
            payload.populated_count(&["title", "subtitle", "authors", "publisher", "pages", "isbn"]),
            2
        );
    }

    #[test]
    fn descriptor_availability() {
        let mut descriptor = ProviderDescriptor {
            key: "googlebooks".into(),
            display_name: "Google Books".into(),
            description: String::new(),
            identifier_types: vec![IdentifierType::Isbn],
            priority: 20,
            requires_credentials: true,
            credentials_configured: false,
        };
        assert!(!descriptor.is_available());
        descriptor.credentials_configured = true;
        assert!(descriptor.is_available());
        descriptor.requires_credentials = false;
        descriptor.credentials_configured = false;
        assert!(descriptor.is_available());
    }

    #[test]
    fn asset_identity_is_url() {
        let asset = ProviderAsset::new("cover", "https://covers.example/1.jpg");
        assert_eq!(asset.identity(), "https://covers.example/1.jpg");
    }
}
