//! # Patient Types
//!
//! Validated value types shared by the patient record crates.
//!
//! Every type here is a smart constructor: once a value exists it is known to satisfy its
//! grammar, so a record assembled from these parts can never be in an invalid state.

mod contact;
mod id;

pub use contact::{EmailAddress, PhoneNumber};
pub use id::PatientId;

/// Errors that can occur when creating validated text types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
    #[error("Invalid email format")]
    InvalidEmail,
    #[error("Phone number must contain only numbers and an optional leading '+'")]
    InvalidPhone,
    #[error("Patient id must be 32 lowercase hex characters without hyphens, got: '{0}'")]
    InvalidId(String),
}

/// A string type that guarantees non-empty content.
///
/// This type wraps a `String` and ensures it contains at least one non-whitespace character.
/// The text is kept exactly as given, surrounding whitespace included.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// Whitespace only counts towards emptiness; it is not stripped from the stored value.
    ///
    /// # Errors
    ///
    /// Returns `Err(TextError::Empty)` if the input is empty or contains only whitespace.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if input.trim().is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(input.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Implements `Display`, `AsRef<str>` and string-shaped serde for a validated newtype.
///
/// Deserialisation goes back through `new`, so data read from disk or the wire is
/// re-validated rather than trusted.
macro_rules! validated_text {
    ($ty:ident) => {
        impl ::std::fmt::Display for $ty {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                self.as_str()
            }
        }

        impl serde::Serialize for $ty {
            fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
            where
                S: serde::Serializer,
            {
                serializer.serialize_str(self.as_str())
            }
        }

        impl<'de> serde::Deserialize<'de> for $ty {
            fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
            where
                D: serde::Deserializer<'de>,
            {
                let s = String::deserialize(deserializer)?;
                $ty::new(&s).map_err(serde::de::Error::custom)
            }
        }
    };
}

pub(crate) use validated_text;

validated_text!(NonEmptyText);
