//! Sequential fallback across providers.
//!
//! A [`Resolver`] owns an ordered, immutable provider list. For every lookup
//! it normalizes the key, then tries providers strictly one at a time in
//! declared order until one returns a record. A later provider never runs
//! before an earlier one has failed, even if it would answer faster.
//!
//! Per-provider failures (not found, timeout, transport, malformed payload)
//! are logged and absorbed. Callers only ever see
//! [`LookupError::InvalidKey`], [`LookupError::Exhausted`] or
//! [`LookupError::Cancelled`].

use std::{fmt, sync::Arc, time::Instant};

use cep_api::LookupClient;
use cep_types::{Address, ConfigError, KeyShape, LookupError, LookupKey, ProviderError};
use tokio::sync::mpsc::UnboundedSender;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::provider::{HttpFetcher, ProviderFetcher, ProviderSpec, invoke_provider};

/// Resolver specialized for postal codes.
pub type PostalCodeResolver = Resolver<Address>;

/// Diagnostic event emitted while resolving. Carries the provenance and
/// per-provider reasons that are kept out of [`LookupError`].
#[derive(Debug, Clone, PartialEq)]
pub enum LookupDiagnostic {
    ProviderFailed {
        key: LookupKey,
        error: ProviderError,
        duration_ms: u64,
    },
    Resolved {
        key: LookupKey,
        provider: String,
        duration_ms: u64,
    },
    Exhausted {
        key: LookupKey,
        attempts: usize,
    },
}

pub struct Resolver<R> {
    shape: KeyShape,
    providers: Arc<[ProviderSpec<R>]>,
    fetcher: Arc<dyn ProviderFetcher>,
    diagnostics: Option<UnboundedSender<LookupDiagnostic>>,
}

impl<R> Resolver<R> {
    pub fn builder(shape: KeyShape) -> ResolverBuilder<R> {
        ResolverBuilder::new(shape)
    }

    /// Stream diagnostic events to the caller.
    pub fn with_diagnostics(mut self, sender: UnboundedSender<LookupDiagnostic>) -> Self {
        self.diagnostics = Some(sender);
        self
    }

    pub fn shape(&self) -> KeyShape {
        self.shape
    }

    /// Provider names in the order they are tried.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(ProviderSpec::name).collect()
    }

    /// Resolve a raw, user-supplied key.
    pub async fn resolve(&self, raw_key: &str) -> Result<R, LookupError> {
        self.resolve_with_cancellation(raw_key, &CancellationToken::new()).await
    }

    /// Resolve a raw key, abandoning the in-flight provider call as soon as
    /// `cancellation` fires.
    pub async fn resolve_with_cancellation(&self, raw_key: &str, cancellation: &CancellationToken) -> Result<R, LookupError> {
        let key = self.shape.normalize(raw_key).inspect_err(|error| {
            debug!(error = %error, "lookup key rejected");
        })?;
        self.resolve_key(&key, cancellation).await
    }

    /// Resolve a key that already went through [`KeyShape::normalize`].
    ///
    /// A key normalized against a different shape is rejected with
    /// [`LookupError::InvalidKey`] before any provider is called.
    pub async fn resolve_key(&self, key: &LookupKey, cancellation: &CancellationToken) -> Result<R, LookupError> {
        let expected_digits = self.shape.expected_digits();
        if key.as_str().len() != expected_digits {
            debug!(key = %key, expected_digits, "lookup key does not match resolver shape");
            return Err(LookupError::InvalidKey { expected_digits });
        }
        let start = Instant::now();

        for spec in self.providers.iter() {
            if cancellation.is_cancelled() {
                break;
            }
            let attempt_start = Instant::now();
            match invoke_provider(spec, key, self.fetcher.as_ref(), cancellation).await {
                Ok(record) => {
                    info!(
                        provider = %spec.name(),
                        key = %key,
                        duration_ms = start.elapsed().as_millis(),
                        "lookup resolved"
                    );
                    self.emit(LookupDiagnostic::Resolved {
                        key: key.clone(),
                        provider: spec.name().to_string(),
                        duration_ms: elapsed_ms(start),
                    });
                    return Ok(record);
                }
                Err(ProviderError::Cancelled { .. }) => break,
                Err(error) => self.emit(LookupDiagnostic::ProviderFailed {
                    key: key.clone(),
                    error,
                    duration_ms: elapsed_ms(attempt_start),
                }),
            }
        }

        if cancellation.is_cancelled() {
            info!(key = %key, duration_ms = start.elapsed().as_millis(), "lookup cancelled");
            return Err(LookupError::Cancelled);
        }

        warn!(
            key = %key,
            attempts = self.providers.len(),
            duration_ms = start.elapsed().as_millis(),
            "no provider resolved the key"
        );
        self.emit(LookupDiagnostic::Exhausted {
            key: key.clone(),
            attempts: self.providers.len(),
        });
        Err(LookupError::Exhausted)
    }

    /// Resolve from synchronous code. Must not be called from a
    /// current-thread Tokio runtime.
    pub fn resolve_blocking(&self, raw_key: &str) -> anyhow::Result<R> {
        Ok(cep_util::block_on_future(self.resolve(raw_key))??)
    }

    fn emit(&self, diagnostic: LookupDiagnostic) {
        if let Some(sender) = &self.diagnostics
            && sender.send(diagnostic).is_err()
        {
            debug!("diagnostic receiver dropped");
        }
    }
}

impl<R> Clone for Resolver<R> {
    fn clone(&self) -> Self {
        Self {
            shape: self.shape,
            providers: Arc::clone(&self.providers),
            fetcher: Arc::clone(&self.fetcher),
            diagnostics: self.diagnostics.clone(),
        }
    }
}

impl<R> fmt::Debug for Resolver<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resolver")
            .field("shape", &self.shape)
            .field("providers", &self.providers)
            .finish()
    }
}

/// Validating constructor for [`Resolver`].
pub struct ResolverBuilder<R> {
    shape: KeyShape,
    providers: Vec<ProviderSpec<R>>,
    fetcher: Option<Arc<dyn ProviderFetcher>>,
    user_agent: String,
}

impl<R> ResolverBuilder<R> {
    pub fn new(shape: KeyShape) -> Self {
        Self {
            shape,
            providers: Vec::new(),
            fetcher: None,
            user_agent: cep_api::DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Append a provider. Providers are tried in the order they are added.
    pub fn provider(mut self, spec: ProviderSpec<R>) -> Self {
        self.providers.push(spec);
        self
    }

    pub fn providers(mut self, specs: impl IntoIterator<Item = ProviderSpec<R>>) -> Self {
        self.providers.extend(specs);
        self
    }

    /// Use a custom fetcher instead of the default HTTP one.
    pub fn fetcher(mut self, fetcher: Arc<dyn ProviderFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// User agent for the default HTTP fetcher. Ignored with a custom fetcher.
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Validate the provider list and build the resolver.
    ///
    /// # Errors
    /// - [`ConfigError::NoProviders`] for an empty list
    /// - [`ConfigError::DuplicateProvider`] when two providers share a name
    /// - [`ConfigError::ZeroTimeout`] for a zero deadline
    /// - [`ConfigError::InvalidEndpoint`] when a provider builds an unusable URL
    /// - [`ConfigError::Client`] when the HTTP client cannot be created
    pub fn build(self) -> Result<Resolver<R>, ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::NoProviders);
        }

        let probe_key = self.shape.placeholder();
        for (index, spec) in self.providers.iter().enumerate() {
            if self.providers[..index].iter().any(|earlier| earlier.name() == spec.name()) {
                return Err(ConfigError::DuplicateProvider {
                    name: spec.name().to_string(),
                });
            }
            if spec.timeout().is_zero() {
                return Err(ConfigError::ZeroTimeout {
                    name: spec.name().to_string(),
                });
            }
            cep_api::parse_endpoint(&spec.endpoint_for(&probe_key)).map_err(|error| ConfigError::InvalidEndpoint {
                name: spec.name().to_string(),
                reason: error.to_string(),
            })?;
        }

        let fetcher = match self.fetcher {
            Some(fetcher) => fetcher,
            None => {
                let client = LookupClient::new(self.user_agent).map_err(|error| ConfigError::Client {
                    reason: format!("{error:#}"),
                })?;
                Arc::new(HttpFetcher::new(client))
            }
        };

        Ok(Resolver {
            shape: self.shape,
            providers: Arc::from(self.providers),
            fetcher,
            diagnostics: None,
        })
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX)
}
