//! Contact details: email addresses and phone numbers.
//!
//! Both grammars are deliberately narrow:
//! - email: `local@domain.suffix` where `local` is `[A-Za-z0-9_.+-]+`, `domain` is a single
//!   `[A-Za-z0-9-]+` label and `suffix` is `[A-Za-z0-9.-]+`
//! - phone: an optional leading `+` followed by ASCII digits only
//!
//! Neither value is normalised. What was submitted is what gets stored and compared.

use crate::{validated_text, TextError};
use regex::Regex;
use std::sync::LazyLock;

static EMAIL_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9_.+-]+@[a-zA-Z0-9-]+\.[a-zA-Z0-9.-]+$")
        .expect("email pattern is a valid regex")
});

static PHONE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9]+$").expect("phone pattern is a valid regex"));

/// An email address that matches the accepted grammar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validates `input` as an email address.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidEmail`] if `input` does not match the grammar.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if Self::is_valid(input) {
            Ok(Self(input.to_owned()))
        } else {
            Err(TextError::InvalidEmail)
        }
    }

    /// Returns true if `input` matches the email grammar.
    pub fn is_valid(input: &str) -> bool {
        EMAIL_PATTERN.is_match(input)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// A phone number: optional leading `+`, then one or more digits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    /// Validates `input` as a phone number.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidPhone`] if `input` contains anything other than digits
    /// and a single leading `+`.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if Self::is_valid(input) {
            Ok(Self(input.to_owned()))
        } else {
            Err(TextError::InvalidPhone)
        }
    }

    /// Returns true if `input` matches the phone grammar.
    pub fn is_valid(input: &str) -> bool {
        PHONE_PATTERN.is_match(input)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

validated_text!(EmailAddress);
validated_text!(PhoneNumber);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_accepts_common_addresses() {
        for ok in [
            "john.doe@example.com",
            "a+tag@mail.co.uk",
            "first_last-1@host-name.io",
            "x@y.z",
        ] {
            assert!(EmailAddress::new(ok).is_ok(), "{ok} should be accepted");
        }
    }

    #[test]
    fn test_email_rejects_malformed_addresses() {
        for bad in [
            "invalid-email",
            "no-at.example.com",
            "missing-dot@example",
            "@example.com",
            "two@@example.com",
            "space in@example.com",
            "trailing@example.com ",
            "under_score@exa_mple.com",
            "",
        ] {
            assert_eq!(
                EmailAddress::new(bad),
                Err(TextError::InvalidEmail),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_phone_accepts_digits_with_optional_plus() {
        assert!(PhoneNumber::new("+1234567890").is_ok());
        assert!(PhoneNumber::new("0987654321").is_ok());
        assert!(PhoneNumber::new("7").is_ok());
    }

    #[test]
    fn test_phone_rejects_separators_and_letters() {
        for bad in [
            "039383qwe",
            "+",
            "++123",
            "123+",
            "123 456",
            "123-456",
            "(123)456",
            "",
            "١٢٣",
        ] {
            assert_eq!(
                PhoneNumber::new(bad),
                Err(TextError::InvalidPhone),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_contact_serialises_as_plain_string() {
        let phone = PhoneNumber::new("+44123").unwrap();
        assert_eq!(serde_json::to_string(&phone).unwrap(), "\"+44123\"");

        let err = serde_json::from_str::<EmailAddress>("\"nope\"")
            .expect_err("invalid email should not deserialise");
        assert!(err.to_string().contains("Invalid email format"));
    }
}
