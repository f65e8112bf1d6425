//! Location providers
//!
//! This module defines the provider contract the batch resolver
//! depends on and the generic facade that composes a client, a
//! request template and a response parser into one provider. The
//! three concrete services differ only in those three pieces.

pub mod client;
pub mod request;
pub mod response;

pub use client::{BingClient, GoogleClient, HttpTransport, ProviderClient, PtvClient};
pub use request::QueryTemplate;
pub use response::{BingResponseParser, GoogleResponseParser, PtvResponseParser, ResponseParser};

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::ProvidersConfig;
use crate::error::ProviderError;
use crate::models::Coordinate;

/// A geocoding provider: one address in, ranked coordinates out
/// (best first, possibly empty).
///
/// Implementations do not retry; a single typed failure propagates
/// to the caller, which decides what a failed provider means for
/// the record.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short stable tag identifying the provider in the store.
    fn tag(&self) -> &str;

    async fn resolve(&self, address: &str) -> Result<Vec<Coordinate>, ProviderError>;
}

/// Provider facade composing request template, client and response
/// parser. Each stage is replaceable independently.
pub struct GenericProvider {
    client: Box<dyn ProviderClient>,
    request: QueryTemplate,
    parser: Box<dyn ResponseParser>,
    tag: String,
}

impl GenericProvider {
    pub fn new(
        client: impl ProviderClient + 'static,
        request: QueryTemplate,
        parser: impl ResponseParser + 'static,
        tag: &str,
    ) -> Self {
        Self {
            client: Box::new(client),
            request,
            parser: Box::new(parser),
            tag: tag.to_string(),
        }
    }
}

#[async_trait]
impl Provider for GenericProvider {
    fn tag(&self) -> &str {
        &self.tag
    }

    async fn resolve(&self, address: &str) -> Result<Vec<Coordinate>, ProviderError> {
        let params = self.request.build(address);
        let body = self.client.request(&params).await?;
        Ok(self.parser.parse(&body)?)
    }
}

/// Build the enabled providers from configuration, all sharing one
/// transport. The returned order is the configured-provider order
/// the resolver queries in.
pub fn from_config(
    config: &ProvidersConfig,
    transport: &Arc<HttpTransport>,
) -> Vec<Box<dyn Provider>> {
    let mut providers: Vec<Box<dyn Provider>> = Vec::new();

    if config.ptv.enabled {
        providers.push(Box::new(GenericProvider::new(
            PtvClient::new(transport.clone(), &config.ptv.api_key),
            QueryTemplate::new("searchText").with_common("countryFilter", "US"),
            PtvResponseParser,
            "PTV",
        )));
    }

    if config.google.enabled {
        providers.push(Box::new(GenericProvider::new(
            GoogleClient::new(transport.clone(), &config.google.api_key),
            QueryTemplate::new("address"),
            GoogleResponseParser,
            "Google",
        )));
    }

    if config.bing.enabled {
        providers.push(Box::new(GenericProvider::new(
            BingClient::new(transport.clone(), &config.bing.api_key),
            QueryTemplate::new("q"),
            BingResponseParser,
            "Bing",
        )));
    }

    providers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{HttpConfig, ProviderSettings};

    fn settings(enabled: bool) -> ProviderSettings {
        ProviderSettings {
            enabled,
            api_key: "key".to_string(),
        }
    }

    #[test]
    fn test_from_config_respects_enable_flags() {
        let transport = Arc::new(HttpTransport::new(&HttpConfig::default()).unwrap());
        let config = ProvidersConfig {
            ptv: settings(true),
            google: settings(false),
            bing: settings(true),
        };

        let providers = from_config(&config, &transport);
        let tags: Vec<&str> = providers.iter().map(|p| p.tag()).collect();
        assert_eq!(tags, vec!["PTV", "Bing"]);
    }

    #[test]
    fn test_from_config_empty_when_all_disabled() {
        let transport = Arc::new(HttpTransport::new(&HttpConfig::default()).unwrap());
        let config = ProvidersConfig {
            ptv: settings(false),
            google: settings(false),
            bing: settings(false),
        };
        assert!(from_config(&config, &transport).is_empty());
    }
}
