//! Patient identifiers.
//!
//! Identifiers use a canonical UUID representation: **32 lowercase hexadecimal characters**
//! (no hyphens), the value you would get from `Uuid::new_v4().simple().to_string()`.
//! Externally supplied identifiers must already be canonical; nothing is normalised.

use crate::{validated_text, TextError};
use uuid::Uuid;

/// Opaque, immutable identifier of a patient record.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct PatientId(String);

impl Default for PatientId {
    fn default() -> Self {
        Self::generate()
    }
}

impl PatientId {
    /// Allocates a fresh identifier from a random (v4) UUID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// Validates an identifier that must already be in canonical form.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::InvalidId`] if `input` is not 32 lowercase hex characters.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let input = input.as_ref();
        if Self::is_canonical(input) {
            return Ok(Self(input.to_owned()));
        }
        Err(TextError::InvalidId(input.to_owned()))
    }

    /// Returns true if `input` is exactly 32 characters of `0-9` and `a-f`.
    pub fn is_canonical(input: &str) -> bool {
        input.len() == 32
            && input
                .bytes()
                .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

validated_text!(PatientId);
