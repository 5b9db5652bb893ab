//! # Error Types
//!
//! Errors raised by the foundational types. Ledger-level rejections live in
//! `custody-ledger`; this module only covers identity validation and
//! canonicalization.

use thiserror::Error;

/// Top-level error type for `custody-core`.
#[derive(Error, Debug)]
pub enum CoreError {
    /// An identity string failed validation.
    #[error("invalid identity {value:?}: {reason}")]
    InvalidIdentity {
        /// The rejected input.
        value: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A digest string was not 64 hex characters.
    #[error("invalid digest: {0:?}")]
    InvalidDigest(String),
}

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted; amounts are integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
