//! Lookup key normalization.
//!
//! User input arrives in many shapes (`01001-000`, `01.001-000`, ` 01001000 `).
//! A [`KeyShape`] strips everything that is not an ASCII digit and checks the
//! remaining length before any provider is contacted.

use std::fmt;

use crate::LookupError;

/// Fixed shape a key must have after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeyShape {
    digits: usize,
}

impl KeyShape {
    /// Brazilian postal code: eight digits.
    pub const CEP: KeyShape = KeyShape { digits: 8 };

    pub const fn digits(digits: usize) -> Self {
        Self { digits }
    }

    pub fn expected_digits(&self) -> usize {
        self.digits
    }

    /// Normalize `raw` and validate it against this shape.
    ///
    /// # Errors
    /// Returns [`LookupError::InvalidKey`] when the digit count differs.
    pub fn normalize(&self, raw: &str) -> Result<LookupKey, LookupError> {
        let normalized: String = raw.chars().filter(char::is_ascii_digit).collect();
        if normalized.len() != self.digits {
            return Err(LookupError::InvalidKey {
                expected_digits: self.digits,
            });
        }
        Ok(LookupKey(normalized))
    }

    /// A well-formed key made of zeros. Used to probe endpoint builders at
    /// construction time.
    pub fn placeholder(&self) -> LookupKey {
        LookupKey("0".repeat(self.digits))
    }
}

impl Default for KeyShape {
    fn default() -> Self {
        Self::CEP
    }
}

/// A key that passed normalization. Only digits, exact length.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LookupKey(String);

impl LookupKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl AsRef<str> for LookupKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LookupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
