use std::time::Instant;

use async_trait::async_trait;
use cep_api::LookupClient;
use cep_types::{ProviderError, ProviderResponse};
use cep_util::http::parse_response_body;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use url::Url;

/// Failure of the raw fetch, before the provider name is attached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("response body is not valid JSON: {0}")]
    InvalidBody(String),

    #[error("request cancelled")]
    Cancelled,
}

impl FetchError {
    pub(crate) fn into_provider_error(self, provider: &str) -> ProviderError {
        match self {
            Self::Request(message) => ProviderError::transport(provider, message),
            Self::InvalidBody(reason) => ProviderError::malformed(provider, reason),
            Self::Cancelled => ProviderError::cancelled(provider),
        }
    }
}

/// Issues the single outbound request of a provider call.
///
/// Implementations must stop working on the request once `cancellation`
/// fires. The resolver fires it at the provider deadline and when the caller
/// abandons the lookup.
#[async_trait]
pub trait ProviderFetcher: Send + Sync {
    async fn fetch(&self, url: &Url, cancellation: &CancellationToken) -> Result<ProviderResponse, FetchError>;
}

/// `reqwest`-backed fetcher used outside of tests.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: LookupClient,
}

impl HttpFetcher {
    pub fn new(client: LookupClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ProviderFetcher for HttpFetcher {
    async fn fetch(&self, url: &Url, cancellation: &CancellationToken) -> Result<ProviderResponse, FetchError> {
        let start = Instant::now();
        let request = async {
            let response = self
                .client
                .get(url.clone())
                .send()
                .await
                .map_err(|error| FetchError::Request(error.to_string()))?;
            let status = response.status();
            let body_text = response
                .text()
                .await
                .map_err(|error| FetchError::Request(error.to_string()))?;

            // Error statuses often come with HTML bodies; the status alone
            // carries the meaning there.
            let body = match parse_response_body(&body_text, Some(status.as_u16())) {
                Ok(body) => body,
                Err(error) if status.is_success() => return Err(FetchError::InvalidBody(error.to_string())),
                Err(_) => serde_json::Value::Null,
            };
            debug!(
                %url,
                status = %status,
                body_len = body_text.len(),
                duration_ms = start.elapsed().as_millis(),
                "http request completed"
            );
            Ok(ProviderResponse::new(status.as_u16(), body))
        };

        tokio::select! {
            biased;
            _ = cancellation.cancelled() => {
                debug!(%url, duration_ms = start.elapsed().as_millis(), "http request abandoned");
                Err(FetchError::Cancelled)
            }
            result = request => result,
        }
    }
}
