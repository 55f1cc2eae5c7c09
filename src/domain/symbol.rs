//! Validated stock symbol.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::LedgerError;

/// Maximum accepted symbol length after trimming.
pub const MAX_SYMBOL_LEN: usize = 20;

/// Exchange ticker such as `RELIANCE` or `M&M`.
///
/// Always upper-case, 1 to [`MAX_SYMBOL_LEN`] characters drawn from ASCII
/// alphanumerics and `-`, `&`, `.`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parses and normalizes a raw symbol.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Validation`] if the symbol is empty, too long,
    /// or contains unsupported characters.
    pub fn parse(raw: &str) -> Result<Self, LedgerError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(LedgerError::Validation("stock_symbol is required".to_string()));
        }
        if trimmed.len() > MAX_SYMBOL_LEN {
            return Err(LedgerError::Validation(format!(
                "stock_symbol longer than {MAX_SYMBOL_LEN} characters"
            )));
        }
        if !trimmed
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '&' | '.'))
        {
            return Err(LedgerError::Validation(format!(
                "stock_symbol contains unsupported characters: {trimmed}"
            )));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Returns the normalized symbol text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Symbol {
    type Error = LedgerError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Symbol> for String {
    fn from(symbol: Symbol) -> Self {
        symbol.0
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_case_and_whitespace() {
        let Ok(symbol) = Symbol::parse(" tcs ") else {
            panic!("expected valid symbol");
        };
        assert_eq!(symbol.as_str(), "TCS");
    }

    #[test]
    fn accepts_ampersand_and_dash() {
        assert!(Symbol::parse("M&M").is_ok());
        assert!(Symbol::parse("BAJAJ-AUTO").is_ok());
    }

    #[test]
    fn rejects_empty_long_and_odd() {
        assert!(Symbol::parse("   ").is_err());
        assert!(Symbol::parse(&"A".repeat(MAX_SYMBOL_LEN + 1)).is_err());
        assert!(Symbol::parse("TCS; DROP").is_err());
    }

    #[test]
    fn deserialize_validates() {
        let ok: Result<Symbol, _> = serde_json::from_str("\"infy\"");
        assert_eq!(ok.ok().map(String::from), Some("INFY".to_string()));
        let bad: Result<Symbol, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
    }
}
