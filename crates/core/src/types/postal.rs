//! Brazilian CEP postal code.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`CepCode`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum CepError {
    /// The input does not contain exactly 8 digits.
    #[error("CEP must have 8 digits, found {found}")]
    InvalidLength {
        /// Number of digits found after stripping punctuation.
        found: usize,
    },
}

/// A validated CEP (Código de Endereçamento Postal).
///
/// Input may carry the usual hyphen (`64000-000`); the stored value is
/// always the bare 8-digit form, which is also what the ViaCEP API wants
/// in its URL path.
///
/// ## Examples
///
/// ```
/// use limoda_core::CepCode;
///
/// let cep = CepCode::parse("64078-213").unwrap();
/// assert_eq!(cep.as_str(), "64078213");
/// assert_eq!(cep.to_string(), "64078-213");
///
/// assert!(CepCode::parse("640").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct CepCode(String);

impl CepCode {
    /// Number of digits in a CEP.
    pub const LENGTH: usize = 8;

    /// Parse a `CepCode` from a string, ignoring punctuation.
    ///
    /// # Errors
    ///
    /// Returns [`CepError::InvalidLength`] if the input does not contain
    /// exactly 8 digits.
    pub fn parse(s: &str) -> Result<Self, CepError> {
        let digits: String = s.chars().filter(char::is_ascii_digit).collect();
        if digits.len() != Self::LENGTH {
            return Err(CepError::InvalidLength {
                found: digits.len(),
            });
        }
        Ok(Self(digits))
    }

    /// Returns the bare 8-digit form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `CepCode` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for CepCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.0.get(..5).unwrap_or(""),
            self.0.get(5..).unwrap_or("")
        )
    }
}

impl std::str::FromStr for CepCode {
    type Err = CepError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for CepCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
