//! HTTP client utilities for postal-code providers.
//!
//! This module provides a lightweight client shared by every provider call.
//! It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults
//! - Sending a consistent User-Agent and `Accept: application/json`
//! - Validating provider endpoints for safety
//!
//! The primary entry point is [`LookupClient`]. Create an instance via
//! [`LookupClient::new`], and then build requests with [`LookupClient::get`].
//! Per-call deadlines are not configured here; the resolver owns them.
//!
//! # Example
//!
//! ```ignore
//! use cep_api::LookupClient;
//! use anyhow::Result;
//!
//! async fn run() -> Result<()> {
//!     let client = LookupClient::new(cep_api::DEFAULT_USER_AGENT)?;
//!     let url = cep_api::parse_endpoint("https://viacep.com.br/ws/01001000/json/")?;
//!     let res = client.get(url).send().await?;
//!     println!("status: {}", res.status());
//!     Ok(())
//! }
//! ```

use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use reqwest::{Client, RequestBuilder, header};
use tracing::debug;
use url::Url;

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "entrega-cep-lookup/0.1";

/// Hostnames allowed for local development regardless of scheme.
const LOCALHOST_DOMAINS: &[&str] = &["localhost", "127.0.0.1"];

/// Upper bound for establishing a connection. The per-provider deadline set by
/// the resolver is usually much shorter and wins.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for provider access.
///
/// The client pre-configures default headers. It is cheap to clone and meant
/// to be built once at startup and shared by every lookup.
pub struct LookupClient {
    pub http: Client,
    pub user_agent: String,
}

impl LookupClient {
    /// Construct a [`LookupClient`] sending `user_agent` on every request.
    pub fn new(user_agent: impl Into<String>) -> Result<Self> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .context("build http client")?;

        let user_agent = user_agent.into();
        header::HeaderValue::from_str(&user_agent).map_err(|e| anyhow!("Invalid user agent '{}': {}", user_agent, e))?;

        Ok(Self { http, user_agent })
    }

    /// Build a GET request for a provider endpoint.
    ///
    /// The resulting request includes the configured User-Agent and the
    /// default `Accept` header.
    pub fn get(&self, url: Url) -> RequestBuilder {
        debug!(%url, "building request");

        self.http.get(url).header(header::USER_AGENT, &self.user_agent)
    }
}

/// Parse and validate a provider endpoint.
pub fn parse_endpoint(endpoint: &str) -> Result<Url> {
    let parsed = Url::parse(endpoint).map_err(|e| anyhow!("Invalid endpoint URL '{}': {}", endpoint, e))?;
    validate_endpoint(&parsed)?;
    Ok(parsed)
}

/// Validate that an endpoint is acceptable for use by the client.
///
/// Rules:
/// - `localhost` or `127.0.0.1`: any scheme is allowed
/// - otherwise: scheme must be HTTPS
fn validate_endpoint(parsed: &Url) -> Result<()> {
    let host_name = parsed
        .host_str()
        .ok_or_else(|| anyhow!("endpoint '{}' must include a host", parsed))?;

    // Local development allowances: localhost/127.0.0.1 with any scheme.
    if LOCALHOST_DOMAINS
        .iter()
        .any(|&allowed| host_name.eq_ignore_ascii_case(allowed))
    {
        return Ok(());
    }

    if parsed.scheme() != "https" {
        return Err(anyhow!(
            "endpoint must use https for non-localhost hosts; got '{}://'",
            parsed.scheme()
        ));
    }

    Ok(())
}
