//! Startup configuration for the postal-code resolver.
//!
//! The provider list is fixed at build time; the environment can only
//! reorder or narrow it and adjust deadlines:
//!
//! - `CEP_LOOKUP_PROVIDERS`: comma-separated provider names, in precedence order
//! - `CEP_LOOKUP_TIMEOUT_MS`: deadline applied to every provider
//! - `CEP_LOOKUP_USER_AGENT`: User-Agent sent to providers

use std::time::Duration;

use cep_types::{Address, ConfigError, KeyShape, ProviderId, ToProviderInfo};
use cep_util::env::{parse_list_from_environment, parse_u64_from_environment, string_from_environment};
use tracing::warn;

use crate::provider::{ProviderSpec, builtin};
use crate::resolver::{PostalCodeResolver, Resolver};

pub const PROVIDERS_ENV: &str = "CEP_LOOKUP_PROVIDERS";
pub const TIMEOUT_ENV: &str = "CEP_LOOKUP_TIMEOUT_MS";
pub const USER_AGENT_ENV: &str = "CEP_LOOKUP_USER_AGENT";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolverConfig {
    /// Providers in the order they are tried
    pub providers: Vec<ProviderId>,
    /// Deadline for every provider; `None` keeps each provider's default
    pub timeout_override: Option<Duration>,
    pub user_agent: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            providers: ProviderId::ALL.to_vec(),
            timeout_override: None,
            user_agent: cep_api::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl ResolverConfig {
    /// Read configuration from the environment, falling back to defaults for
    /// anything missing or invalid.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            providers: parse_list_from_environment(PROVIDERS_ENV)
                .map(|names| parse_provider_list(&names))
                .unwrap_or(defaults.providers),
            timeout_override: parse_u64_from_environment(TIMEOUT_ENV).map(Duration::from_millis),
            user_agent: string_from_environment(USER_AGENT_ENV).unwrap_or(defaults.user_agent),
        }
    }

    /// Provider specs pointing at the public endpoints.
    pub fn provider_specs(&self) -> Vec<ProviderSpec<Address>> {
        self.providers
            .iter()
            .map(|id| {
                let timeout = self
                    .timeout_override
                    .unwrap_or_else(|| Duration::from_millis(id.default_timeout_ms()));
                builtin::spec_for(*id, id.default_base_url(), timeout)
            })
            .collect()
    }

    pub fn build_resolver(&self) -> Result<PostalCodeResolver, ConfigError> {
        Resolver::builder(KeyShape::CEP)
            .providers(self.provider_specs())
            .user_agent(self.user_agent.clone())
            .build()
    }
}

/// Unknown names and repeats are skipped. An entirely unusable list falls
/// back to every built-in provider.
fn parse_provider_list(names: &[String]) -> Vec<ProviderId> {
    let mut providers = Vec::new();
    for name in names {
        match name.parse::<ProviderId>() {
            Ok(id) if providers.contains(&id) => warn!(provider = %name, "ignoring repeated provider"),
            Ok(id) => providers.push(id),
            Err(error) => warn!(provider = %name, error = %error, "ignoring unknown provider"),
        }
    }
    if providers.is_empty() {
        warn!(env = PROVIDERS_ENV, "no usable providers configured; using defaults");
        return ProviderId::ALL.to_vec();
    }
    providers
}
