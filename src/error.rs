//! Game-specific error types.
//!
//! Only the loading boundary produces errors: config files and level layouts
//! are validated on the way in.  Gameplay itself never fails with an error;
//! stale entity references and exhausted rosters are ordinary state
//! transitions handled where they are read.

use std::fmt;

/// Top-level error enum for the Lumia core.
#[derive(Debug, Clone, PartialEq)]
pub enum LumiaError {
    /// A size level outside the fixed size table was requested.
    SizeLevelOutOfRange {
        /// The rejected level.
        level: usize,
        /// Largest valid level.
        max: usize,
    },

    /// A level layout file could not be read or parsed.
    LevelLoad {
        /// Path that was being loaded.
        path: String,
        /// Human-readable cause.
        reason: String,
    },

    /// A level layout parsed but describes an unplayable level.
    InvalidLayout {
        /// Human-readable cause.
        reason: String,
    },

    /// A tuning constant is outside its safe operating range.
    UnsafeConstant {
        /// Name of the constant (for logging).
        name: &'static str,
        /// The value that was rejected.
        value: f32,
        /// Human-readable description of the safe range.
        safe_range: &'static str,
    },
}

impl fmt::Display for LumiaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LumiaError::SizeLevelOutOfRange { level, max } => {
                write!(f, "size level {} is outside the size table [0, {}]", level, max)
            }
            LumiaError::LevelLoad { path, reason } => {
                write!(f, "failed to load level '{}': {}", path, reason)
            }
            LumiaError::InvalidLayout { reason } => write!(f, "invalid level layout: {}", reason),
            LumiaError::UnsafeConstant {
                name,
                value,
                safe_range,
            } => write!(
                f,
                "constant '{}' = {} is outside safe range {}",
                name, value, safe_range
            ),
        }
    }
}

impl std::error::Error for LumiaError {}

/// Convenience alias: a `Result` using `LumiaError` as the error type.
pub type LumiaResult<T> = Result<T, LumiaError>;

// ── Validation helpers ────────────────────────────────────────────────────────

/// Returns an error if `value` is not strictly positive (or is NaN).
pub fn validate_positive(name: &'static str, value: f32) -> LumiaResult<()> {
    if value > 0.0 {
        Ok(())
    } else {
        Err(LumiaError::UnsafeConstant {
            name,
            value,
            safe_range: "(0.0, ∞)",
        })
    }
}
