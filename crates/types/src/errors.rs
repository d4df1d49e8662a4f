//! Error types for postal-code lookups.

use thiserror::Error;

/// Errors that cross the resolver boundary.
///
/// The messages are deliberately generic; per-provider reasons only show up
/// in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("key invalid: must contain exactly {expected_digits} digits")]
    InvalidKey { expected_digits: usize },

    #[error("key not found by any provider")]
    Exhausted,

    #[error("lookup cancelled")]
    Cancelled,
}

/// Failure of a single provider call. Always recovered by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("{provider}: key not found")]
    NotFound { provider: String },

    #[error("{provider}: timed out after {timeout_ms}ms")]
    Timeout { provider: String, timeout_ms: u64 },

    #[error("{provider}: transport error - {message}")]
    Transport { provider: String, message: String },

    #[error("{provider}: malformed response - {reason}")]
    MalformedResponse { provider: String, reason: String },

    #[error("{provider}: cancelled")]
    Cancelled { provider: String },
}

/// Signal returned by a provider's response transform.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransformError {
    #[error("provider reported the key as unresolved")]
    NotFound,

    #[error("{0}")]
    Malformed(String),
}

/// Invalid resolver configuration. A programmer error, reported at construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("provider list is empty")]
    NoProviders,

    #[error("duplicate provider name: {name}")]
    DuplicateProvider { name: String },

    #[error("provider {name} has a zero timeout")]
    ZeroTimeout { name: String },

    #[error("provider {name} has an invalid endpoint: {reason}")]
    InvalidEndpoint { name: String, reason: String },

    #[error("HTTP client error: {reason}")]
    Client { reason: String },
}

impl ProviderError {
    pub fn not_found(provider: impl Into<String>) -> Self {
        Self::NotFound { provider: provider.into() }
    }

    pub fn timeout(provider: impl Into<String>, timeout_ms: u64) -> Self {
        Self::Timeout {
            provider: provider.into(),
            timeout_ms,
        }
    }

    pub fn transport(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn malformed(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    pub fn cancelled(provider: impl Into<String>) -> Self {
        Self::Cancelled { provider: provider.into() }
    }

    /// Name of the provider that failed.
    pub fn provider(&self) -> &str {
        match self {
            Self::NotFound { provider }
            | Self::Timeout { provider, .. }
            | Self::Transport { provider, .. }
            | Self::MalformedResponse { provider, .. }
            | Self::Cancelled { provider } => provider,
        }
    }

    /// Short machine-readable failure kind for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::Timeout { .. } => "timeout",
            Self::Transport { .. } => "transport",
            Self::MalformedResponse { .. } => "malformed_response",
            Self::Cancelled { .. } => "cancelled",
        }
    }
}

impl TransformError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed(reason.into())
    }

    /// Attach the provider name.
    pub fn into_provider_error(self, provider: impl Into<String>) -> ProviderError {
        match self {
            Self::NotFound => ProviderError::not_found(provider),
            Self::Malformed(reason) => ProviderError::malformed(provider, reason),
        }
    }
}
