use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ValidationError;

// Identifier
//------------------------------------------------------------------------------

/// A non-empty run of ASCII decimal digits, usually a device IMEI.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(value))
        } else {
            Err(ValidationError::InvalidIdentifier(value))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Identifier {
    type Target = str;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for Identifier {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

#[cfg(test)]
mod identifier_tests {
    use super::Identifier;
    use crate::error::ValidationError;

    #[test]
    fn test_new() {
        assert_eq!(Identifier::new("356938035643809").unwrap().as_str(), "356938035643809");
        assert_eq!(Identifier::new(""), Err(ValidationError::InvalidIdentifier(String::new())));
        assert!(Identifier::new("35 69").is_err());
        assert!(Identifier::new("١٢٣").is_err());
    }
}

// Record extractor
//------------------------------------------------------------------------------

static DIGIT_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[0-9]+").expect("Invalid digit run regex"));

/// Splits free-form scanner or pasted text into identifiers.
///
/// Every maximal run of ASCII digits becomes one identifier, in the order it
/// appears. Anything else only separates runs. Duplicates are kept.
pub fn extract(text: &str) -> Vec<Identifier> {
    DIGIT_RUN.find_iter(text).map(|m| Identifier(m.as_str().to_string())).collect()
}
