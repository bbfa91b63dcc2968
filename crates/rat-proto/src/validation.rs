//! Validation helpers for wire records.
//!
//! Decoding only proves the bytes are well-formed protobuf. These checks
//! bound field sizes before anything else touches a record received from
//! an unauthenticated peer.

use crate::v1::IdentityV1;

/// Validation error types for wire records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Required field is empty
    EmptyField { field: &'static str },
    /// Field is larger than allowed
    TooLarge { field: &'static str, max: usize, actual: usize },
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyField { field } => write!(f, "required field '{}' is empty", field),
            Self::TooLarge { field, max, actual } => {
                write!(f, "field '{}' is {} bytes, max {}", field, actual, max)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Constants for field sizes.
pub mod sizes {
    /// Largest accepted DER-encoded public key (an 8192-bit key is ~1 KiB).
    pub const MAX_KEY_SIZE: usize = 4096;
    /// Largest accepted free-text field.
    pub const MAX_TEXT_SIZE: usize = 256;
}

fn check_text(field: &'static str, value: &str) -> ValidationResult<()> {
    if value.len() > sizes::MAX_TEXT_SIZE {
        return Err(ValidationError::TooLarge {
            field,
            max: sizes::MAX_TEXT_SIZE,
            actual: value.len(),
        });
    }
    Ok(())
}

impl IdentityV1 {
    /// Check field presence and size bounds.
    pub fn validate(&self) -> ValidationResult<()> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyField { field: "name" });
        }
        if self.verifying_key.is_empty() {
            return Err(ValidationError::EmptyField { field: "verifying_key" });
        }
        if self.verifying_key.len() > sizes::MAX_KEY_SIZE {
            return Err(ValidationError::TooLarge {
                field: "verifying_key",
                max: sizes::MAX_KEY_SIZE,
                actual: self.verifying_key.len(),
            });
        }
        check_text("name", &self.name)?;
        check_text("group", &self.group)?;
        check_text("address", &self.address)?;
        check_text("status", &self.status)?;
        Ok(())
    }
}
