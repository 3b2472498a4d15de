//! HTTP plumbing shared by the wire-format adapters.

use ratecompare_common::Deadline;
use reqwest::{Client, RequestBuilder};
use serde::Serialize;
use tracing::debug;

use crate::config::ProviderSettings;
use crate::error::{ProviderError, ProviderResult};

/// Header carrying the optional provider API key.
pub const API_KEY_HEADER: &str = "X-API-Key";

/// HTTP client bound to one provider's settings.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    settings: ProviderSettings,
}

impl HttpTransport {
    /// Create a transport for the given provider settings.
    pub fn new(settings: ProviderSettings) -> Self {
        let client = Client::builder()
            .user_agent(concat!("ratecompare/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client, settings }
    }

    pub fn settings(&self) -> &ProviderSettings {
        &self.settings
    }

    /// POST a JSON body to the conversion endpoint and return the raw body.
    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        body: &T,
        deadline: Deadline,
    ) -> ProviderResult<String> {
        let builder = self.client.post(self.settings.offer_url()).json(body);
        self.send(builder, deadline).await
    }

    /// POST an XML document to the conversion endpoint and return the raw body.
    pub async fn post_xml(&self, document: String, deadline: Deadline) -> ProviderResult<String> {
        let builder = self
            .client
            .post(self.settings.offer_url())
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(document);
        self.send(builder, deadline).await
    }

    /// GET the health endpoint; `true` on any 2xx answer.
    pub async fn health(&self, deadline: Deadline) -> bool {
        let builder = self.client.get(self.settings.health_url());
        match self.send(builder, deadline).await {
            Ok(_) => true,
            Err(e) => {
                debug!(provider = %self.settings.name, error = %e, "Health check failed");
                false
            }
        }
    }

    async fn send(&self, builder: RequestBuilder, deadline: Deadline) -> ProviderResult<String> {
        let budget = deadline.remaining();
        if budget.is_zero() {
            return Err(ProviderError::Timeout(deadline.budget()));
        }

        let mut builder = builder.timeout(budget);
        if let Some(key) = &self.settings.api_key {
            builder = builder.header(API_KEY_HEADER, key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, deadline.budget()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, deadline.budget()))
    }
}
