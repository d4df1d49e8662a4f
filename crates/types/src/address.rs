use serde::{Deserialize, Serialize};

/// Canonical postal address every provider response is mapped into.
///
/// Field names follow the ViaCEP vocabulary used across the delivery
/// application. Only `cep` is guaranteed; providers disagree on which of the
/// remaining fields they fill in.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Address {
    /// Postal code, eight digits without punctuation
    pub cep: String,
    /// Street name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logradouro: Option<String>,
    /// Street complement (e.g. "lado ímpar")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complemento: Option<String>,
    /// Neighborhood
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bairro: Option<String>,
    /// City
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub localidade: Option<String>,
    /// Two-letter state code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uf: Option<String>,
    /// IBGE municipality code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ibge: Option<String>,
    /// Telephone area code
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ddd: Option<String>,
}

impl Address {
    pub fn new(cep: impl Into<String>) -> Self {
        Self {
            cep: cep.into(),
            ..Default::default()
        }
    }

    /// Postal code in its display form, `01001-000`.
    pub fn formatted_cep(&self) -> String {
        if self.cep.len() == 8 && self.cep.is_ascii() {
            format!("{}-{}", &self.cep[..5], &self.cep[5..])
        } else {
            self.cep.clone()
        }
    }
}
