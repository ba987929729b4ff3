//! Brazilian CPF taxpayer number.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Cpf`].
#[derive(thiserror::Error, Debug, Clone)]
pub enum CpfError {
    /// The input does not contain exactly 11 digits.
    #[error("CPF must have 11 digits, found {found}")]
    InvalidLength {
        /// Number of digits found after stripping punctuation.
        found: usize,
    },
    /// All 11 digits are the same (e.g. `111.111.111-11`).
    #[error("CPF cannot be a repeated digit sequence")]
    RepeatedDigits,
    /// One of the two check digits does not match.
    #[error("CPF check digits do not match")]
    InvalidCheckDigit,
}

/// A validated CPF (Cadastro de Pessoas Físicas) number.
///
/// Input may carry the usual punctuation (`000.000.000-00`); the stored
/// value is always the bare 11-digit form. Validation checks length,
/// rejects repeated-digit sequences, and verifies both check digits with
/// the standard modulus-11 weighting.
///
/// ## Examples
///
/// ```
/// use limoda_core::Cpf;
///
/// let cpf = Cpf::parse("529.982.247-25").unwrap();
/// assert_eq!(cpf.as_str(), "52998224725");
/// assert_eq!(cpf.to_string(), "529.982.247-25");
///
/// assert!(Cpf::parse("111.111.111-11").is_err()); // repeated digits
/// assert!(Cpf::parse("529.982.247-24").is_err()); // bad check digit
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Cpf(String);

impl Cpf {
    /// Parse a `Cpf` from a string, ignoring punctuation.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Does not contain exactly 11 digits
    /// - Is a repeated-digit sequence
    /// - Fails either check digit
    pub fn parse(s: &str) -> Result<Self, CpfError> {
        let collected: Vec<u32> = s.chars().filter_map(|c| c.to_digit(10)).collect();
        let digits: [u32; 11] = collected
            .try_into()
            .map_err(|v: Vec<u32>| CpfError::InvalidLength { found: v.len() })?;

        let first = digits[0];
        if digits.iter().all(|&d| d == first) {
            return Err(CpfError::RepeatedDigits);
        }

        if check_digit(&digits, 9) != digits[9] || check_digit(&digits, 10) != digits[10] {
            return Err(CpfError::InvalidCheckDigit);
        }

        let normalized: String = digits
            .iter()
            .filter_map(|&d| char::from_digit(d, 10))
            .collect();
        Ok(Self(normalized))
    }

    /// Returns the bare 11-digit form, as the payment gateway expects.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consumes the `Cpf` and returns its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

/// Modulus-11 check digit over the first `prefix` digits.
///
/// Weights run from `prefix + 1` down to 2; a remainder of 10 maps to 0.
fn check_digit(digits: &[u32; 11], prefix: usize) -> u32 {
    let mut sum = 0u32;
    let mut weight = u32::try_from(prefix).unwrap_or(0) + 1;
    for &d in digits.iter().take(prefix) {
        sum += d * weight;
        weight -= 1;
    }
    let rest = (sum * 10) % 11;
    if rest == 10 { 0 } else { rest }
}

impl fmt::Display for Cpf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}-{}",
            self.0.get(..3).unwrap_or(""),
            self.0.get(3..6).unwrap_or(""),
            self.0.get(6..9).unwrap_or(""),
            self.0.get(9..).unwrap_or("")
        )
    }
}

impl std::str::FromStr for Cpf {
    type Err = CpfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<str> for Cpf {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_cpfs() {
        assert!(Cpf::parse("529.982.247-25").is_ok());
        assert!(Cpf::parse("52998224725").is_ok());
        assert!(Cpf::parse("123.456.789-09").is_ok());
    }

    #[test]
    fn test_parse_strips_punctuation() {
        let cpf = Cpf::parse("529.982.247-25").unwrap();
        assert_eq!(cpf.as_str(), "52998224725");
    }

    #[test]
    fn test_parse_wrong_length() {
        assert!(matches!(
            Cpf::parse("12345"),
            Err(CpfError::InvalidLength { found: 5 })
        ));
        assert!(matches!(
            Cpf::parse(""),
            Err(CpfError::InvalidLength { found: 0 })
        ));
        assert!(matches!(
            Cpf::parse("529.982.247-255"),
            Err(CpfError::InvalidLength { found: 12 })
        ));
    }

    #[test]
    fn test_parse_repeated_digits() {
        for d in 0..=9 {
            let input = d.to_string().repeat(11);
            assert!(matches!(Cpf::parse(&input), Err(CpfError::RepeatedDigits)));
        }
    }

    #[test]
    fn test_parse_bad_check_digits() {
        assert!(matches!(
            Cpf::parse("529.982.247-24"),
            Err(CpfError::InvalidCheckDigit)
        ));
        assert!(matches!(
            Cpf::parse("529.982.247-35"),
            Err(CpfError::InvalidCheckDigit)
        ));
    }

    #[test]
    fn test_display_is_punctuated() {
        let cpf = Cpf::parse("52998224725").unwrap();
        assert_eq!(cpf.to_string(), "529.982.247-25");
    }

    #[test]
    fn test_serde_roundtrip() {
        let cpf = Cpf::parse("529.982.247-25").unwrap();
        let json = serde_json::to_string(&cpf).unwrap();
        assert_eq!(json, "\"52998224725\"");

        let parsed: Cpf = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, cpf);
    }
}
