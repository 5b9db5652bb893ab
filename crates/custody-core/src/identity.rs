//! # Identity Newtypes
//!
//! Wrappers for every identifier the ledger handles. Pool and receipt ids are
//! random UUIDs minted by the ledger itself; account ids are supplied by the
//! host environment as the authenticated caller of an operation.
//!
//! ## Security Invariant
//!
//! Distinct types per namespace: a `ReceiptId` can never be compared against
//! a `PoolId`, and an unvalidated string can never reach an authorization
//! check as an `AccountId`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::CoreError;

/// Longest accepted account identifier, in characters.
pub const MAX_ACCOUNT_ID_LEN: usize = 128;

/// Unique identifier for a ledger pool instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PoolId(Uuid);

/// Unique identifier for a receipt. Retired once the receipt is redeemed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReceiptId(Uuid);

impl PoolId {
    /// Generate a new random pool identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PoolId {
    fn default() -> Self {
        Self::new()
    }
}

impl ReceiptId {
    /// Generate a new random receipt identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ReceiptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PoolId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "pool:{}", self.0)
    }
}

impl std::fmt::Display for ReceiptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "receipt:{}", self.0)
    }
}

/// Identity of a caller (depositor or withdrawer).
///
/// Opaque to the ledger: the host authenticates the caller and the ledger
/// only compares identities for equality, byte for byte. Construction never
/// rewrites the value: it rejects empty values, leading or trailing
/// whitespace, control characters, and anything longer than
/// [`MAX_ACCOUNT_ID_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    /// Validate and wrap a caller identity.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidIdentity`] if the value is empty, has
    /// surrounding whitespace, is too long, or contains control characters.
    pub fn new(value: impl Into<String>) -> Result<Self, CoreError> {
        let raw = value.into();
        if raw.is_empty() {
            return Err(CoreError::InvalidIdentity {
                value: raw,
                reason: "identity must not be empty",
            });
        }
        if raw.trim() != raw {
            return Err(CoreError::InvalidIdentity {
                value: raw,
                reason: "identity must not have leading or trailing whitespace",
            });
        }
        if raw.chars().count() > MAX_ACCOUNT_ID_LEN {
            return Err(CoreError::InvalidIdentity {
                value: raw,
                reason: "identity exceeds maximum length",
            });
        }
        if raw.chars().any(char::is_control) {
            return Err(CoreError::InvalidIdentity {
                value: raw,
                reason: "identity must not contain control characters",
            });
        }
        Ok(Self(raw))
    }

    /// Borrow the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = CoreError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<&str> for AccountId {
    type Error = CoreError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl AsRef<str> for AccountId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
