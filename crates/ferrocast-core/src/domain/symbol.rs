use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_SYMBOL_LEN: usize = 15;

/// Normalized ticker or index symbol (`AAPL`, `^GSPC`, `000001.SS`, `EURUSD=X`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

impl Symbol {
    /// Parse and normalize a symbol to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_SYMBOL_LEN {
            return Err(ValidationError::SymbolTooLong {
                len,
                max: MAX_SYMBOL_LEN,
            });
        }

        if let Some(first) = normalized.chars().next() {
            if !(first.is_ascii_alphanumeric() || first == '^') {
                return Err(ValidationError::SymbolInvalidStart { ch: first });
            }
        }

        for (index, ch) in normalized.chars().enumerate().skip(1) {
            let valid = ch.is_ascii_alphanumeric() || matches!(ch, '.' | '-' | '=');
            if !valid {
                return Err(ValidationError::SymbolInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Index symbols carry a caret prefix on Yahoo (`^GSPC`).
    pub fn is_index(&self) -> bool {
        self.0.starts_with('^')
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Symbol {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for Symbol {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<Symbol> for String {
    fn from(value: Symbol) -> Self {
        value.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_normalizes_symbol() {
        let parsed = Symbol::parse(" aapl ").expect("symbol should parse");
        assert_eq!(parsed.as_str(), "AAPL");
        assert!(!parsed.is_index());
    }

    #[test]
    fn accepts_index_and_exchange_suffixed_symbols() {
        assert!(Symbol::parse("^GSPC").expect("index").is_index());
        assert_eq!(
            Symbol::parse("000001.ss").expect("shanghai").as_str(),
            "000001.SS"
        );
    }

    #[test]
    fn rejects_double_caret() {
        let err = Symbol::parse("^^IXIC").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { ch: '^', index: 1 }));
    }

    #[test]
    fn rejects_invalid_chars() {
        let err = Symbol::parse("AAPL$").expect_err("must fail");
        assert!(matches!(err, ValidationError::SymbolInvalidChar { .. }));
    }
}
