//! HTTP client for the storage/REST gateway.
//!
//! Every request carries the project key twice, once as `apikey` and once as
//! a bearer token, which is what the gateway expects for anonymous and
//! service-role keys alike.

use crate::config::BackendConfig;
use reqwest::{Client, Method, RequestBuilder, Url};
use secrecy::{ExposeSecret, Secret};
use service_core::error::AppError;
use std::time::Duration;

#[derive(Clone)]
pub struct GatewayClient {
    client: Client,
    base_url: Url,
    api_key: Secret<String>,
}

impl GatewayClient {
    pub fn new(config: &BackendConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Self::with_client(client, &config.base_url, config.api_key.clone())
    }

    pub fn with_client(
        client: Client,
        base_url: &str,
        api_key: Secret<String>,
    ) -> Result<Self, AppError> {
        let base_url = Url::parse(base_url).map_err(|e| {
            AppError::ConfigError(anyhow::anyhow!("Invalid gateway URL {}: {}", base_url, e))
        })?;

        if base_url.cannot_be_a_base() {
            return Err(AppError::ConfigError(anyhow::anyhow!(
                "Gateway URL {} cannot be used as a base",
                base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Build `base/<segments...>`, percent-encoding each segment.
    pub fn url<'a, I>(&self, segments: I) -> Result<Url, AppError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| AppError::ConfigError(anyhow::anyhow!("Gateway URL cannot be a base")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    pub fn request(&self, method: Method, url: Url) -> RequestBuilder {
        let key = self.api_key.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", key.as_str())
            .bearer_auth(key)
    }
}
