//! Error types for the diff engine

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which input of a diff an error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// The original text (left side)
    Original,
    /// The changed text (right side)
    Changed,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Original => write!(f, "original"),
            Self::Changed => write!(f, "changed"),
        }
    }
}

/// Errors produced while computing a diff
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiffError {
    /// An input text was not supplied
    #[error("{side} text is missing")]
    MissingInput {
        /// The absent input.
        side: Side,
    },

    /// A synthetic token id had no entry in the token table
    #[error("token id {id} is not present in the token table")]
    UnknownToken {
        /// The id that failed to decode.
        id: u32,
    },

    /// Row assembly disagreed with the line-level edit script
    #[error("layout mismatch: {0}")]
    Layout(String),
}

impl DiffError {
    /// Whether this error is a caller mistake rather than an engine failure
    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::MissingInput { .. })
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, DiffError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = DiffError::MissingInput { side: Side::Changed };
        assert_eq!(err.to_string(), "changed text is missing");
        assert!(err.is_invalid_input());

        let err = DiffError::UnknownToken { id: 7 };
        assert_eq!(err.to_string(), "token id 7 is not present in the token table");
        assert!(!err.is_invalid_input());
    }
}
