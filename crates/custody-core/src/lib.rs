//! # custody-core: Foundational Types for the Custody Ledger
//!
//! Leaf crate of the workspace. Defines the primitives every other crate
//! builds on:
//!
//! - **Identity newtypes** ([`identity`]): `PoolId`, `ReceiptId` and the
//!   caller identity `AccountId`. You cannot pass a receipt id where a pool
//!   id is expected.
//!
//! - **Timestamps** ([`temporal`]): UTC-only, second precision.
//!
//! - **Canonical bytes and digests** ([`canonical`], [`digest`]): the only
//!   path to a `ContentDigest` is through `CanonicalBytes::new()`, which
//!   produces RFC 8785 JSON and rejects floats.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `custody-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod digest;
pub mod error;
pub mod identity;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use digest::{sha256_digest, ContentDigest};
pub use error::{CanonicalizationError, CoreError};
pub use identity::{AccountId, PoolId, ReceiptId, MAX_ACCOUNT_ID_LEN};
pub use temporal::Timestamp;
