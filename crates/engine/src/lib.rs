//! # CEP Lookup Engine
//!
//! Resolves Brazilian postal codes (CEP) into a canonical [`Address`] by
//! asking a fixed list of external providers, one at a time, each under its
//! own deadline.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cep_engine::ResolverConfig;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let resolver = ResolverConfig::from_env().build_resolver()?;
//! match resolver.resolve("01001-000").await {
//!     Ok(address) => println!("{} - {:?}/{:?}", address.formatted_cep(), address.localidade, address.uf),
//!     Err(error) => println!("{error}"),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - **`provider`**: Provider specs, the fetcher seam, and the built-in providers
//! - **`resolver`**: The sequential fallback orchestrator
//! - **`config`**: Environment-driven startup configuration
//! - **`cache`**: Tenant-scoped caching collaborator

pub mod cache;
pub mod config;
pub mod provider;
pub mod resolver;

pub use cache::CachedResolver;
pub use cep_types::{Address, ConfigError, KeyShape, LookupError, LookupKey, ProviderError, ProviderId, TransformError};
pub use config::ResolverConfig;
pub use provider::{FetchError, HttpFetcher, ProviderFetcher, ProviderSpec};
pub use resolver::{LookupDiagnostic, PostalCodeResolver, Resolver, ResolverBuilder};
