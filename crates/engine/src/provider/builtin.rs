//! Built-in postal-code providers.
//!
//! Each provider signals an unknown CEP differently:
//!
//! | provider   | not found                                               |
//! |------------|---------------------------------------------------------|
//! | ViaCEP     | `200` with `{"erro": true}` (or `"erro": "true"`), `400` |
//! | BrasilAPI  | `404`/`400`, body `{"name": "CepPromiseError", ...}`     |
//! | AwesomeAPI | `404`/`400`, body `{"code": "not_found" \| "invalid"}`   |
//!
//! Payload fields are all optional; a missing `cep` falls back to the key
//! that was asked for.

use std::time::Duration;

use cep_types::{Address, LookupKey, ProviderId, ProviderResponse, ToProviderInfo, TransformError};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use super::ProviderSpec;

/// Spec for a built-in provider rooted at `base_url`.
pub fn spec_for(id: ProviderId, base_url: &str, timeout: Duration) -> ProviderSpec<Address> {
    match id {
        ProviderId::ViaCep => viacep(base_url, timeout),
        ProviderId::BrasilApi => brasilapi(base_url, timeout),
        ProviderId::AwesomeApi => awesomeapi(base_url, timeout),
    }
}

/// Spec for a built-in provider with its public endpoint and default deadline.
pub fn default_spec(id: ProviderId) -> ProviderSpec<Address> {
    spec_for(id, id.default_base_url(), Duration::from_millis(id.default_timeout_ms()))
}

pub fn viacep(base_url: &str, timeout: Duration) -> ProviderSpec<Address> {
    let base_url = trim_base(base_url);
    ProviderSpec::new(
        ProviderId::ViaCep.name(),
        timeout,
        move |key: &LookupKey| format!("{base_url}/ws/{key}/json/"),
        transform_viacep,
    )
}

pub fn brasilapi(base_url: &str, timeout: Duration) -> ProviderSpec<Address> {
    let base_url = trim_base(base_url);
    ProviderSpec::new(
        ProviderId::BrasilApi.name(),
        timeout,
        move |key: &LookupKey| format!("{base_url}/api/cep/v1/{key}"),
        transform_brasilapi,
    )
}

pub fn awesomeapi(base_url: &str, timeout: Duration) -> ProviderSpec<Address> {
    let base_url = trim_base(base_url);
    ProviderSpec::new(
        ProviderId::AwesomeApi.name(),
        timeout,
        move |key: &LookupKey| format!("{base_url}/json/{key}"),
        transform_awesomeapi,
    )
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ViaCepPayload {
    erro: Option<Value>,
    cep: Option<String>,
    logradouro: Option<String>,
    complemento: Option<String>,
    bairro: Option<String>,
    localidade: Option<String>,
    uf: Option<String>,
    ibge: Option<String>,
    ddd: Option<String>,
}

pub fn transform_viacep(key: &LookupKey, response: &ProviderResponse) -> Result<Address, TransformError> {
    if response.status == 400 || response.status == 404 {
        return Err(TransformError::NotFound);
    }
    expect_success(response)?;
    let payload: ViaCepPayload = decode(&response.body)?;
    if payload.erro.as_ref().is_some_and(is_truthy) {
        return Err(TransformError::NotFound);
    }

    Ok(Address {
        cep: echoed_cep(payload.cep, key)?,
        logradouro: non_empty(payload.logradouro),
        complemento: non_empty(payload.complemento),
        bairro: non_empty(payload.bairro),
        localidade: non_empty(payload.localidade),
        uf: non_empty(payload.uf),
        ibge: non_empty(payload.ibge),
        ddd: non_empty(payload.ddd),
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BrasilApiPayload {
    name: Option<String>,
    cep: Option<String>,
    state: Option<String>,
    city: Option<String>,
    neighborhood: Option<String>,
    street: Option<String>,
}

pub fn transform_brasilapi(key: &LookupKey, response: &ProviderResponse) -> Result<Address, TransformError> {
    if response.status == 400 || response.status == 404 {
        return Err(TransformError::NotFound);
    }
    expect_success(response)?;
    let payload: BrasilApiPayload = decode(&response.body)?;
    if payload.name.as_deref() == Some("CepPromiseError") {
        return Err(TransformError::NotFound);
    }

    Ok(Address {
        cep: echoed_cep(payload.cep, key)?,
        logradouro: non_empty(payload.street),
        bairro: non_empty(payload.neighborhood),
        localidade: non_empty(payload.city),
        uf: non_empty(payload.state),
        ..Default::default()
    })
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AwesomeApiPayload {
    code: Option<String>,
    cep: Option<String>,
    address: Option<String>,
    district: Option<String>,
    city: Option<String>,
    state: Option<String>,
    city_ibge: Option<String>,
    ddd: Option<String>,
}

pub fn transform_awesomeapi(key: &LookupKey, response: &ProviderResponse) -> Result<Address, TransformError> {
    if response.status == 400 || response.status == 404 {
        return Err(TransformError::NotFound);
    }
    expect_success(response)?;
    let payload: AwesomeApiPayload = decode(&response.body)?;
    if matches!(payload.code.as_deref(), Some("not_found" | "invalid")) {
        return Err(TransformError::NotFound);
    }

    Ok(Address {
        cep: echoed_cep(payload.cep, key)?,
        logradouro: non_empty(payload.address),
        bairro: non_empty(payload.district),
        localidade: non_empty(payload.city),
        uf: non_empty(payload.state),
        ibge: non_empty(payload.city_ibge),
        ddd: non_empty(payload.ddd),
        ..Default::default()
    })
}

fn trim_base(base_url: &str) -> String {
    base_url.trim_end_matches('/').to_string()
}

fn expect_success(response: &ProviderResponse) -> Result<(), TransformError> {
    if response.is_success() {
        Ok(())
    } else {
        Err(TransformError::malformed(format!("unexpected status {}", response.status)))
    }
}

fn decode<T: DeserializeOwned>(body: &Value) -> Result<T, TransformError> {
    if !body.is_object() {
        return Err(TransformError::malformed(format!("expected a JSON object, got {}", json_kind(body))));
    }
    serde_json::from_value(body.clone()).map_err(|error| TransformError::malformed(error.to_string()))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// The provider's `cep`, reduced to digits, must match the requested key.
/// A missing or blank value falls back to the key.
fn echoed_cep(cep: Option<String>, key: &LookupKey) -> Result<String, TransformError> {
    let digits: String = cep.unwrap_or_default().chars().filter(char::is_ascii_digit).collect();
    if digits.is_empty() || digits == key.as_str() {
        return Ok(key.to_string());
    }
    Err(TransformError::malformed(format!("provider answered for cep {digits}, expected {key}")))
}
