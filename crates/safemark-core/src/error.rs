//! Conversion errors.
//!
//! Malformed markup is never an error: it degrades to literal text. The only
//! way a conversion fails is input nested deeper than the configured limit.

use thiserror::Error;

/// Error kinds for categorizing conversion failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvertErrorKind {
    /// Quote, list, emphasis or link nesting exceeded the depth limit.
    TooComplex,
}

/// A failed conversion.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConvertError {
    /// Nesting went past `limit` levels.
    #[error("input too complex: nesting exceeds {limit} levels")]
    TooComplex { limit: usize },
}

impl ConvertError {
    /// Create an error for input nested deeper than `limit`.
    pub fn too_complex(limit: usize) -> Self {
        Self::TooComplex { limit }
    }

    /// Get the error kind.
    pub fn kind(&self) -> ConvertErrorKind {
        match self {
            Self::TooComplex { .. } => ConvertErrorKind::TooComplex,
        }
    }

    /// Check whether the input was rejected for being too deeply nested.
    pub fn is_too_complex(&self) -> bool {
        self.kind() == ConvertErrorKind::TooComplex
    }
}

/// Result alias used throughout the converter.
pub type Result<T> = std::result::Result<T, ConvertError>;
