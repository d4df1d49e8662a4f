use std::{error::Error, fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;

mod address;
mod errors;
mod key;

pub use address::Address;
pub use errors::{ConfigError, LookupError, ProviderError, TransformError};
pub use key::{KeyShape, LookupKey};

/// Built-in postal-code providers, in their default precedence order.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Default, Serialize, Deserialize)]
pub enum ProviderId {
    #[default]
    ViaCep, // https://viacep.com.br
    BrasilApi,  // https://brasilapi.com.br
    AwesomeApi, // https://cep.awesomeapi.com.br
}

impl ProviderId {
    /// All built-in providers in default precedence order.
    pub const ALL: [ProviderId; 3] = [ProviderId::ViaCep, ProviderId::BrasilApi, ProviderId::AwesomeApi];
}

impl ToProviderInfo for ProviderId {
    fn name(&self) -> &str {
        match self {
            Self::ViaCep => "viacep",
            Self::BrasilApi => "brasilapi",
            Self::AwesomeApi => "awesomeapi",
        }
    }
    fn default_base_url(&self) -> &str {
        match self {
            Self::ViaCep => "https://viacep.com.br",
            Self::BrasilApi => "https://brasilapi.com.br",
            Self::AwesomeApi => "https://cep.awesomeapi.com.br",
        }
    }
    fn default_timeout_ms(&self) -> u64 {
        match self {
            Self::ViaCep => 3_000,
            Self::BrasilApi | Self::AwesomeApi => 4_000,
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ProviderId {
    type Err = ParseProviderIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "viacep" => Ok(Self::ViaCep),
            "brasilapi" => Ok(Self::BrasilApi),
            "awesomeapi" => Ok(Self::AwesomeApi),
            _ => Err(ParseProviderIdError),
        }
    }
}

pub trait ToProviderInfo {
    fn name(&self) -> &str;
    fn default_base_url(&self) -> &str;
    fn default_timeout_ms(&self) -> u64;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseProviderIdError;

impl fmt::Display for ParseProviderIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid provider id; expected 'viacep', 'brasilapi' or 'awesomeapi'")
    }
}

impl Error for ParseProviderIdError {}

/// Raw answer from a provider, before its transform runs.
///
/// The body is `Value::Null` when the provider answered with an empty body.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    /// HTTP status code returned by the provider
    pub status: u16,
    /// Parsed JSON body
    pub body: Value,
}

impl ProviderResponse {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    /// Shorthand for a `200 OK` response, mostly useful in tests.
    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn provider_id_parses_case_insensitively() {
        assert_eq!("ViaCEP".parse::<ProviderId>(), Ok(ProviderId::ViaCep));
        assert_eq!(" brasilapi ".parse::<ProviderId>(), Ok(ProviderId::BrasilApi));
        assert_eq!("awesomeapi".parse::<ProviderId>(), Ok(ProviderId::AwesomeApi));
        assert!("correios".parse::<ProviderId>().is_err());
    }

    #[test]
    fn provider_names_round_trip_through_from_str() {
        for id in ProviderId::ALL {
            assert_eq!(id.name().parse::<ProviderId>(), Ok(id));
        }
    }

    #[test]
    fn response_success_range() {
        assert!(ProviderResponse::ok(json!({})).is_success());
        assert!(ProviderResponse::new(204, Value::Null).is_success());
        assert!(!ProviderResponse::new(404, Value::Null).is_success());
    }
}
