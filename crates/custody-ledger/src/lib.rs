//! # custody-ledger: Custodial Pool Ledger
//!
//! A pool accepts deposits of one fungible asset and mints a receipt per
//! deposit. The depositor later presents the receipt to withdraw exactly the
//! amount deposited, and the receipt is destroyed.
//!
//! - **Pool** ([`pool`]): balance, deposit counter, active receipt counter,
//!   and the two operations that move them.
//! - **Receipt** ([`receipt`]): move-only claim bound to an owner, an amount,
//!   and a sequence number.
//! - **Audit** ([`audit`]): events published to an injectable sink after
//!   each accepted operation, plus a hash-chained in-memory log.
//! - **Shared handle** ([`shared`]): mutex-guarded pool for concurrent hosts.
//!
//! ## Conservation
//!
//! `balance` always equals the sum of amounts over outstanding receipts.
//! Operations are all-or-nothing: every precondition is checked before the
//! first mutation, and a rejected withdrawal returns the receipt to the
//! caller.
//!
//! The caller identity is an explicit parameter on every operation. The
//! ledger trusts it as authenticated by the host.

pub mod audit;
pub mod error;
pub mod pool;
pub mod receipt;
pub mod shared;

/// Units of the pooled asset.
pub type Amount = u64;

pub use audit::{AuditEvent, AuditLog, AuditRecord, AuditSink, NullSink, Tee, TracingSink};
pub use error::{AuditLogError, LedgerError, WithdrawError};
pub use pool::{create_pool, LedgerPool, Payout, PoolSnapshot};
pub use receipt::Receipt;
pub use shared::SharedPool;
