//! Google Books lookup provider.
//!
//! Queries the Books v1 volumes endpoint with an `isbn:` search. An API key
//! is required.

use async_trait::async_trait;
use collectforge_common::{Error, Identifier, IdentifierType, ProviderErrorKind, Result};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::http::ProviderHttpClient;
use super::provider::{Confidence, LookupProvider, ProviderAsset, ProviderPayload};

pub const GOOGLEBOOKS_KEY: &str = "googlebooks";
pub const GOOGLEBOOKS_BASE_URL: &str = "https://www.googleapis.com";
const DEFAULT_RATE: u32 = 10;

const SCORED_ATTRIBUTES: &[&str] = &[
    "title",
    "authors",
    "publisher",
    "publishedDate",
    "pageCount",
    "imageLinks",
];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VolumesResponse {
    #[serde(default)]
    total_items: u64,
    #[serde(default)]
    items: Vec<Volume>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Volume {
    #[serde(default)]
    volume_info: Value,
}

/// Google Books provider.
pub struct GoogleBooksProvider {
    http: ProviderHttpClient,
    base_url: String,
    api_key: Option<String>,
    identifier_types: Vec<IdentifierType>,
}

impl GoogleBooksProvider {
    pub fn new(
        api_key: Option<String>,
        base_url: Option<&str>,
        requests_per_second: Option<u32>,
    ) -> Result<Self> {
        Ok(Self {
            http: ProviderHttpClient::new(
                GOOGLEBOOKS_KEY,
                requests_per_second.unwrap_or(DEFAULT_RATE),
            )?,
            base_url: base_url
                .unwrap_or(GOOGLEBOOKS_BASE_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            identifier_types: vec![IdentifierType::Isbn],
        })
    }

    fn thumbnail(info: &Value) -> Option<ProviderAsset> {
        let links = info.get("imageLinks")?;
        ["thumbnail", "smallThumbnail"]
            .iter()
            .find_map(|name| links.get(*name).and_then(Value::as_str))
            .map(|url| ProviderAsset::new("cover", url))
    }
}

#[async_trait]
impl LookupProvider for GoogleBooksProvider {
    fn key(&self) -> &str {
        GOOGLEBOOKS_KEY
    }

    fn display_name(&self) -> &str {
        "Google Books"
    }

    fn description(&self) -> &str {
        "Google Books volumes search, keyed by ISBN"
    }

    fn identifier_types(&self) -> &[IdentifierType] {
        &self.identifier_types
    }

    fn priority(&self) -> i32 {
        20
    }

    fn requires_credentials(&self) -> bool {
        true
    }

    async fn lookup(&self, identifiers: &[Identifier]) -> Result<Option<ProviderPayload>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::provider(
                GOOGLEBOOKS_KEY,
                ProviderErrorKind::Authentication,
                "no API key configured",
            ));
        };

        let url = format!("{}/books/v1/volumes", self.base_url);
        for id in identifiers
            .iter()
            .filter(|id| *id.id_type() == IdentifierType::Isbn)
        {
            let query = format!("isbn:{}", id.value());
            let response: VolumesResponse = self
                .http
                .get_json(&url, &[("q", query.as_str()), ("key", api_key)])
                .await?;

            if let Some(volume) = response.items.into_iter().next() {
                if volume.volume_info.is_object() {
                    return Ok(Some(ProviderPayload {
                        assets: Self::thumbnail(&volume.volume_info).into_iter().collect(),
                        raw_fields: volume.volume_info,
                    }));
                }
            }
            debug!(
                isbn = id.value(),
                total_items = response.total_items,
                "Google Books has no volume"
            );
        }
        Ok(None)
    }

    fn score_confidence(&self, payload: &ProviderPayload, _identifiers: &[Identifier]) -> Confidence {
        Confidence::from_completeness(
            payload.populated_count(SCORED_ATTRIBUTES),
            SCORED_ATTRIBUTES.len(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn isbn(value: &str) -> Identifier {
        Identifier::new(IdentifierType::Isbn, value).unwrap()
    }

    #[tokio::test]
    async fn lookup_returns_first_volume() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/books/v1/volumes"))
            .and(query_param("q", "isbn:9780441013593"))
            .and(query_param("key", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "totalItems": 1,
                "items": [{
                    "id": "B1hSG45JCX4C",
                    "volumeInfo": {
                        "title": "Dune",
                        "authors": ["Frank Herbert"],
                        "publisher": "Penguin",
                        "publishedDate": "2005",
                        "pageCount": 604,
                        "imageLinks": {
                            "smallThumbnail": "http://books.google.com/s.jpg",
                            "thumbnail": "http://books.google.com/t.jpg"
                        }
                    }
                }]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            GoogleBooksProvider::new(Some("secret".into()), Some(server.uri().as_str()), Some(50))
                .unwrap();
        let ids = [isbn("9780441013593")];
        let payload = provider.lookup(&ids).await.unwrap().unwrap();

        assert_eq!(payload.raw_fields["authors"][0], json!("Frank Herbert"));
        assert_eq!(payload.assets[0].url, "http://books.google.com/t.jpg");
        assert_eq!(provider.score_confidence(&payload, &ids).score, 100);
    }

    #[tokio::test]
    async fn zero_items_means_no_match() {
        let server = MockServer::start().await;
        Mock::given(path("/books/v1/volumes"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "totalItems": 0 })))
            .mount(&server)
            .await;

        let provider =
            GoogleBooksProvider::new(Some("secret".into()), Some(server.uri().as_str()), Some(50))
                .unwrap();
        assert!(provider.lookup(&[isbn("0000000000")]).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_key_is_authentication_error() {
        let provider = GoogleBooksProvider::new(Some("  ".into()), None, None).unwrap();
        assert!(provider.requires_credentials());
        let result = provider.lookup(&[isbn("9780441013593")]).await;
        assert_matches!(
            result,
            Err(Error::Provider { kind: ProviderErrorKind::Authentication, .. })
        );
    }

    #[tokio::test]
    async fn rejected_key_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(path("/books/v1/volumes"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let provider =
            GoogleBooksProvider::new(Some("wrong".into()), Some(server.uri().as_str()), Some(50))
                .unwrap();
        let result = provider.lookup(&[isbn("9780441013593")]).await;
        assert_matches!(
            result,
            Err(Error::Provider { kind: ProviderErrorKind::Authentication, .. })
        );
    }
}
