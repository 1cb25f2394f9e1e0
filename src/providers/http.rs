//! Rate-limited JSON client shared by the HTTP-backed providers.
//!
//! Features:
//! - Token-bucket rate limiting via [`governor`].
//! - Automatic retry on HTTP 429 with `Retry-After` header support.
//! - Transport and status failures mapped onto [`ProviderErrorKind`].

use std::num::NonZeroU32;
use std::time::Duration;

use collectforge_common::{Error, ProviderErrorKind, Result};
use governor::{Quota, RateLimiter};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_RETRIES: u32 = 3;
const USER_AGENT: &str = concat!("collectforge/", env!("CARGO_PKG_VERSION"));

type DirectRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// HTTP client bound to one provider.
pub struct ProviderHttpClient {
    provider: String,
    client: reqwest::Client,
    rate_limiter: DirectRateLimiter,
}

impl ProviderHttpClient {
    /// Create a client for `provider` allowing `requests_per_second` requests.
    ///
    /// A rate of zero is treated as one request per second.
    pub fn new(provider: impl Into<String>, requests_per_second: u32) -> Result<Self> {
        let provider = provider.into();
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| {
                Error::provider(&provider, ProviderErrorKind::Network, e.to_string())
            })?;

        let rate = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            provider,
            client,
            rate_limiter,
        })
    }

    /// GET `url` with `query` and decode the JSON body into `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        let resp = self.get(url, query).await?;
        resp.json::<T>().await.map_err(|e| {
            self.error(
                ProviderErrorKind::InvalidResponse,
                format!("could not decode response: {e}"),
            )
        })
    }

    /// Execute a GET request with rate limiting and 429-retry logic.
    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let mut retries = 0u32;
        loop {
            self.rate_limiter.until_ready().await;

            debug!(provider = %self.provider, url, "Sending provider request");
            let resp = self
                .client
                .get(url)
                .query(query)
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = resp.status();
            if status == StatusCode::TOO_MANY_REQUESTS && retries < MAX_RETRIES {
                retries += 1;
                let wait = resp
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                    .unwrap_or(1);
                warn!(
                    provider = %self.provider,
                    retry = retries,
                    wait_secs = wait,
                    "Provider returned 429, backing off"
                );
                tokio::time::sleep(Duration::from_secs(wait)).await;
                continue;
            }

            return match status {
                s if s.is_success() => Ok(resp),
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(self.error(
                    ProviderErrorKind::Authentication,
                    format!("credentials rejected (HTTP {})", status.as_u16()),
                )),
                s => Err(self.error(
                    ProviderErrorKind::Network,
                    format!("request returned HTTP {}", s.as_u16()),
                )),
            };
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> Error {
        let kind = if e.is_timeout() {
            ProviderErrorKind::Timeout
        } else {
            ProviderErrorKind::Network
        };
        self.error(kind, format!("request failed: {e}"))
    }

    fn error(&self, kind: ProviderErrorKind, message: String) -> Error {
        Error::provider(&self.provider, kind, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::{json, Value};
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> ProviderHttpClient {
        ProviderHttpClient::new("test", 50).unwrap()
    }

    #[tokio::test]
    async fn decodes_json_and_sends_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/items"))
            .and(query_param("q", "isbn:1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let body: Value = client()
            .get_json(&format!("{}/items", server.uri()), &[("q", "isbn:1")])
            .await
            .unwrap();
        assert_eq!(body, json!({ "ok": true }));
    }

    #[tokio::test]
    async fn retries_after_429() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(429).insert_header("retry-after", "0"))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([1, 2])))
            .mount(&server)
            .await;

        let body: Value = client().get_json(&server.uri(), &[]).await.unwrap();
        assert_eq!(body, json!([1, 2]));
    }

    #[tokio::test]
    async fn maps_status_codes_to_error_kinds() {
        let server = MockServer::start().await;
        Mock::given(path("/denied"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        Mock::given(path("/broken"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(path("/garbage"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let client = client();
        let denied = client
            .get_json::<Value>(&format!("{}/denied", server.uri()), &[])
            .await;
        assert_matches!(
            denied,
            Err(Error::Provider { kind: ProviderErrorKind::Authentication, ref message, .. })
                if message.contains("HTTP 401")
        );

        let broken = client
            .get_json::<Value>(&format!("{}/broken", server.uri()), &[])
            .await;
        assert_matches!(
            broken,
            Err(Error::Provider { kind: ProviderErrorKind::Network, .. })
        );

        let garbage = client
            .get_json::<Value>(&format!("{}/garbage", server.uri()), &[])
            .await;
        assert_matches!(
            garbage,
            Err(Error::Provider { kind: ProviderErrorKind::InvalidResponse, ref provider, .. })
                if provider == "test"
        );
    }

    #[tokio::test]
    async fn connection_refused_is_network_error() {
        let result = client()
            .get_json::<Value>("http://127.0.0.1:1/unreachable", &[])
            .await;
        assert_matches!(
            result,
            Err(Error::Provider { kind: ProviderErrorKind::Network, .. })
        );
    }
}
