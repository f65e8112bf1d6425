//! HTTP transport and per-provider clients
//!
//! One shared transport (connection pool, timeout, request-rate
//! ceiling) behind thin per-provider clients that know their
//! endpoint and how to carry the API key: PTV authenticates with a
//! request header, Google and Bing with a query parameter.

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::config::HttpConfig;
use crate::error::FetchError;

/// One HTTP exchange with a provider: flat query in, raw body out.
///
/// A non-success status is a [`FetchError`], never a body.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    async fn request(&self, params: &[(String, String)]) -> Result<String, FetchError>;
}

/// Shared HTTP client with a requests-per-second ceiling.
pub struct HttpTransport {
    client: reqwest::Client,
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,
}

impl HttpTransport {
    pub fn new(config: &HttpConfig) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.rate_limit).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
        })
    }

    /// GET `url` with the given headers and query parameters.
    pub async fn get(
        &self,
        url: &str,
        headers: &[(&str, &str)],
        params: &[(String, String)],
    ) -> Result<String, FetchError> {
        self.rate_limiter.until_ready().await;

        tracing::debug!(url = %url, "Querying provider endpoint");

        let mut request = self.client.get(url).query(params);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Http(e)
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::ServerError(status.as_u16()));
        }

        Ok(response.text().await?)
    }
}

/// PTV geocoding client; API key travels in the `apiKey` header.
pub struct PtvClient {
    transport: Arc<HttpTransport>,
    endpoint: String,
    api_key: String,
}

impl PtvClient {
    pub const BASE_URL: &'static str = "https://api.myptv.com/geocoding/v1/locations/by-text";
    const API_KEY_HEADER: &'static str = "apiKey";

    pub fn new(transport: Arc<HttpTransport>, api_key: &str) -> Self {
        Self::with_endpoint(transport, api_key, Self::BASE_URL)
    }

    /// Custom endpoint, for tests against a mock server.
    pub fn with_endpoint(transport: Arc<HttpTransport>, api_key: &str, endpoint: &str) -> Self {
        Self {
            transport,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for PtvClient {
    async fn request(&self, params: &[(String, String)]) -> Result<String, FetchError> {
        self.transport
            .get(
                &self.endpoint,
                &[(Self::API_KEY_HEADER, self.api_key.as_str())],
                params,
            )
            .await
    }
}

/// Google Maps geocoding client; API key travels as the `key`
/// query parameter.
pub struct GoogleClient {
    transport: Arc<HttpTransport>,
    endpoint: String,
    api_key: String,
}

impl GoogleClient {
    pub const BASE_URL: &'static str = "https://maps.googleapis.com/maps/api/geocode/json";
    const API_KEY_FIELD: &'static str = "key";

    pub fn new(transport: Arc<HttpTransport>, api_key: &str) -> Self {
        Self::with_endpoint(transport, api_key, Self::BASE_URL)
    }

    /// Custom endpoint, for tests against a mock server.
    pub fn with_endpoint(transport: Arc<HttpTransport>, api_key: &str, endpoint: &str) -> Self {
        Self {
            transport,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for GoogleClient {
    async fn request(&self, params: &[(String, String)]) -> Result<String, FetchError> {
        let mut query = params.to_vec();
        query.push((Self::API_KEY_FIELD.to_string(), self.api_key.clone()));
        self.transport.get(&self.endpoint, &[], &query).await
    }
}

/// Bing Maps locations client; API key travels as the `key`
/// query parameter.
pub struct BingClient {
    transport: Arc<HttpTransport>,
    endpoint: String,
    api_key: String,
}

impl BingClient {
    pub const BASE_URL: &'static str = "http://dev.virtualearth.net/REST/v1/Locations";
    const API_KEY_FIELD: &'static str = "key";

    pub fn new(transport: Arc<HttpTransport>, api_key: &str) -> Self {
        Self::with_endpoint(transport, api_key, Self::BASE_URL)
    }

    /// Custom endpoint, for tests against a mock server.
    pub fn with_endpoint(transport: Arc<HttpTransport>, api_key: &str, endpoint: &str) -> Self {
        Self {
            transport,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        }
    }
}

#[async_trait]
impl ProviderClient for BingClient {
    async fn request(&self, params: &[(String, String)]) -> Result<String, FetchError> {
        let mut query = params.to_vec();
        query.push((Self::API_KEY_FIELD.to_string(), self.api_key.clone()));
        self.transport.get(&self.endpoint, &[], &query).await
    }
}
