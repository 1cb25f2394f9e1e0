//! Open Library book lookup provider.
//!
//! Queries the Open Library Books API by ISBN. No credentials are needed.

use async_trait::async_trait;
use collectforge_common::{Identifier, IdentifierType, Result};
use serde_json::{Map, Value};
use tracing::debug;

use super::http::ProviderHttpClient;
use super::provider::{Confidence, LookupProvider, ProviderAsset, ProviderPayload};

pub const OPENLIBRARY_KEY: &str = "openlibrary";
pub const OPENLIBRARY_BASE_URL: &str = "https://openlibrary.org";
const DEFAULT_RATE: u32 = 5;

/// Attributes that make an Open Library record useful.
const SCORED_ATTRIBUTES: &[&str] = &[
    "title",
    "authors",
    "publishers",
    "publish_date",
    "number_of_pages",
    "cover",
];

/// Open Library provider.
pub struct OpenLibraryProvider {
    http: ProviderHttpClient,
    base_url: String,
    identifier_types: Vec<IdentifierType>,
}

impl OpenLibraryProvider {
    /// Create a provider against `base_url` (defaults to the public API).
    pub fn new(base_url: Option<&str>, requests_per_second: Option<u32>) -> Result<Self> {
        Ok(Self {
            http: ProviderHttpClient::new(
                OPENLIBRARY_KEY,
                requests_per_second.unwrap_or(DEFAULT_RATE),
            )?,
            base_url: base_url
                .unwrap_or(OPENLIBRARY_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            identifier_types: vec![IdentifierType::Isbn],
        })
    }

    /// Largest cover image in the record, if any.
    fn cover_asset(record: &Value) -> Option<ProviderAsset> {
        let cover = record.get("cover")?;
        ["large", "medium", "small"]
            .iter()
            .find_map(|size| cover.get(*size).and_then(Value::as_str))
            .map(|url| ProviderAsset::new("cover", url))
    }
}

#[async_trait]
impl LookupProvider for OpenLibraryProvider {
    fn key(&self) -> &str {
        OPENLIBRARY_KEY
    }

    fn display_name(&self) -> &str {
        "Open Library"
    }

    fn description(&self) -> &str {
        "Open Library Books API, keyed by ISBN"
    }

    fn identifier_types(&self) -> &[IdentifierType] {
        &self.identifier_types
    }

    fn priority(&self) -> i32 {
        10
    }

    async fn lookup(&self, identifiers: &[Identifier]) -> Result<Option<ProviderPayload>> {
        let bibkeys: Vec<String> = identifiers
            .iter()
            .filter(|id| *id.id_type() == IdentifierType::Isbn)
            .map(|id| format!("ISBN:{}", id.value()))
            .collect();
        if bibkeys.is_empty() {
            return Ok(None);
        }

        let joined = bibkeys.join(",");
        let url = format!("{}/api/books", self.base_url);
        let body: Map<String, Value> = self
            .http
            .get_json(
                &url,
                &[("bibkeys", joined.as_str()), ("format", "json"), ("jscmd", "data")],
            )
            .await?;

        // First identifier with a record wins.
        let Some(record) = bibkeys.iter().find_map(|k| body.get(k)) else {
            debug!(bibkeys = %joined, "Open Library has no record");
            return Ok(None);
        };

        Ok(Some(ProviderPayload {
            assets: Self::cover_asset(record).into_iter().collect(),
            raw_fields: record.clone(),
        }))
    }

    fn score_confidence(&self, payload: &ProviderPayload, _identifiers: &[Identifier]) -> Confidence {
        Confidence::from_completeness(
            payload.populated_count(SCORED_ATTRIBUTES),
            SCORED_ATTRIBUTES.len(),
        )
    }
}
