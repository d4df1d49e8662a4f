//! Provider definitions and invocation.
//!
//! Modules:
//! - `fetch`: Fetcher trait and default HTTP fetcher
//! - `invoke`: A single deadline-bounded provider call
//! - `builtin`: ViaCEP, BrasilAPI and AwesomeAPI definitions and transforms

pub mod builtin;
mod fetch;
mod invoke;

pub use fetch::{FetchError, HttpFetcher, ProviderFetcher};
pub(crate) use invoke::invoke_provider;

use std::{fmt, sync::Arc, time::Duration};

use cep_types::{LookupKey, ProviderResponse, TransformError};

/// Builds the provider endpoint for a normalized key.
pub type EndpointBuilder = Arc<dyn Fn(&LookupKey) -> String + Send + Sync>;

/// Maps a raw provider response onto the canonical record.
///
/// Returns [`TransformError::NotFound`] when the provider's own convention says
/// the key is unknown, and [`TransformError::Malformed`] for anything else it
/// cannot interpret.
pub type ResponseTransform<R> = Arc<dyn Fn(&LookupKey, &ProviderResponse) -> Result<R, TransformError> + Send + Sync>;

/// One external source in the fallback chain.
///
/// A spec bundles everything provider-specific: how to address it, how long
/// to wait for it, and how to read its answer.
pub struct ProviderSpec<R> {
    name: String,
    timeout: Duration,
    endpoint: EndpointBuilder,
    transform: ResponseTransform<R>,
}

impl<R> ProviderSpec<R> {
    pub fn new<E, T>(name: impl Into<String>, timeout: Duration, endpoint: E, transform: T) -> Self
    where
        E: Fn(&LookupKey) -> String + Send + Sync + 'static,
        T: Fn(&LookupKey, &ProviderResponse) -> Result<R, TransformError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            timeout,
            endpoint: Arc::new(endpoint),
            transform: Arc::new(transform),
        }
    }

    /// Replace the per-call deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn timeout_ms(&self) -> u64 {
        u64::try_from(self.timeout.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn endpoint_for(&self, key: &LookupKey) -> String {
        (self.endpoint)(key)
    }

    pub fn transform(&self, key: &LookupKey, response: &ProviderResponse) -> Result<R, TransformError> {
        (self.transform)(key, response)
    }
}

impl<R> Clone for ProviderSpec<R> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            timeout: self.timeout,
            endpoint: Arc::clone(&self.endpoint),
            transform: Arc::clone(&self.transform),
        }
    }
}

impl<R> fmt::Debug for ProviderSpec<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSpec")
            .field("name", &self.name)
            .field("timeout_ms", &self.timeout_ms())
            .finish()
    }
}
