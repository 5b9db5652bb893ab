//! # Audit Side Channel
//!
//! Pools publish one [`AuditEvent`] per accepted operation to an
//! [`AuditSink`] supplied by the host. Events are a notification, never a
//! return value: the accounting logic does not read them back.
//!
//! Sinks provided here:
//!
//! - [`NullSink`] discards everything.
//! - [`TracingSink`] forwards each event to `tracing` at `info` level under
//!   the `custody::audit` target.
//! - [`AuditLog`] keeps an append-only, SHA-256 hash-chained record of events
//!   with a bounded capacity.
//! - [`Tee`] fans one event out to two sinks.
//! - Any `FnMut(AuditEvent)` closure.
//!
//! Rejected operations emit nothing.

use serde::{Deserialize, Serialize};

use custody_core::{
    sha256_digest, AccountId, CanonicalBytes, CanonicalizationError, ContentDigest, PoolId,
    ReceiptId, Timestamp,
};

use crate::error::AuditLogError;
use crate::Amount;

// ---------------------------------------------------------------------------
// AuditEvent
// ---------------------------------------------------------------------------

/// A completed deposit or withdrawal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// A deposit was accepted and a receipt minted.
    DepositRecorded {
        /// Pool that accepted the deposit.
        pool_id: PoolId,
        /// The minted receipt.
        receipt_id: ReceiptId,
        /// The depositor and receipt owner.
        depositor: AccountId,
        /// Amount deposited.
        amount: Amount,
        /// Sequence number assigned to the receipt.
        sequence_number: u64,
        /// When the deposit was applied.
        recorded_at: Timestamp,
    },
    /// A receipt was redeemed and its amount released to the depositor.
    WithdrawalRecorded {
        /// Pool that released the funds.
        pool_id: PoolId,
        /// The retired receipt.
        receipt_id: ReceiptId,
        /// The depositor, who received the funds.
        depositor: AccountId,
        /// Amount released.
        amount: Amount,
        /// Sequence number of the retired receipt.
        sequence_number: u64,
        /// When the withdrawal was applied.
        recorded_at: Timestamp,
    },
}

impl AuditEvent {
    /// Event name, matching the serialized `type` tag.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::DepositRecorded { .. } => "deposit_recorded",
            Self::WithdrawalRecorded { .. } => "withdrawal_recorded",
        }
    }

    /// Pool the event belongs to.
    pub fn pool_id(&self) -> PoolId {
        match self {
            Self::DepositRecorded { pool_id, .. } | Self::WithdrawalRecorded { pool_id, .. } => {
                *pool_id
            }
        }
    }

    /// Receipt minted or retired.
    pub fn receipt_id(&self) -> ReceiptId {
        match self {
            Self::DepositRecorded { receipt_id, .. }
            | Self::WithdrawalRecorded { receipt_id, .. } => *receipt_id,
        }
    }

    /// The depositor of the receipt.
    pub fn depositor(&self) -> &AccountId {
        match self {
            Self::DepositRecorded { depositor, .. }
            | Self::WithdrawalRecorded { depositor, .. } => depositor,
        }
    }

    /// Amount moved by the operation.
    pub fn amount(&self) -> Amount {
        match self {
            Self::DepositRecorded { amount, .. } | Self::WithdrawalRecorded { amount, .. } => {
                *amount
            }
        }
    }

    /// Sequence number of the receipt involved.
    pub fn sequence_number(&self) -> u64 {
        match self {
            Self::DepositRecorded {
                sequence_number, ..
            }
            | Self::WithdrawalRecorded {
                sequence_number, ..
            } => *sequence_number,
        }
    }
}

// ---------------------------------------------------------------------------
// Sinks
// ---------------------------------------------------------------------------

/// Destination for audit events.
pub trait AuditSink {
    /// Accept one event. Called after the operation's mutations are applied.
    fn record(&mut self, event: AuditEvent);
}

impl<F> AuditSink for F
where
    F: FnMut(AuditEvent),
{
    fn record(&mut self, event: AuditEvent) {
        self(event)
    }
}

/// Discards every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl AuditSink for NullSink {
    fn record(&mut self, _event: AuditEvent) {}
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl AuditSink for TracingSink {
    fn record(&mut self, event: AuditEvent) {
        tracing::info!(
            target: "custody::audit",
            event = event.kind(),
            pool_id = %event.pool_id(),
            receipt_id = %event.receipt_id(),
            depositor = %event.depositor(),
            amount = event.amount(),
            sequence_number = event.sequence_number(),
            "audit event"
        );
    }
}

/// Sends every event to both inner sinks, first `A` then `B`.
#[derive(Debug, Clone, Default)]
pub struct Tee<A, B>(pub A, pub B);

impl<A: AuditSink, B: AuditSink> AuditSink for Tee<A, B> {
    fn record(&mut self, event: AuditEvent) {
        self.0.record(event.clone());
        self.1.record(event);
    }
}

// ---------------------------------------------------------------------------
// AuditLog
// ---------------------------------------------------------------------------

/// One entry of the hash-chained audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Position in the log since it was created. Never reused after trimming.
    pub index: u64,
    /// The recorded event.
    pub event: AuditEvent,
    /// Digest of the preceding record, or the zero digest for index 0.
    pub previous_digest: ContentDigest,
    /// `sha256(canonical({index, event, previous_digest}))`.
    pub digest: ContentDigest,
}

#[derive(Serialize)]
struct ChainPayload<'a> {
    index: u64,
    event: &'a AuditEvent,
    previous_digest: &'a ContentDigest,
}

fn chain_digest(
    index: u64,
    event: &AuditEvent,
    previous_digest: &ContentDigest,
) -> Result<ContentDigest, CanonicalizationError> {
    let canonical = CanonicalBytes::new(&ChainPayload {
        index,
        event,
        previous_digest,
    })?;
    Ok(sha256_digest(&canonical))
}

/// Append-only, hash-chained audit log with bounded capacity.
///
/// When the log exceeds its capacity the oldest 10% of records (at least
/// one) are dropped. The chain anchor moves forward to the digest the first
/// kept record links to, so [`verify_chain`](AuditLog::verify_chain) keeps
/// working over the retained suffix. Hosts that need the full history
/// should drain records to durable storage before they are trimmed.
///
/// Not `Sync`; share it through [`SharedPool`](crate::SharedPool) or an
/// external lock.
#[derive(Debug, Clone)]
pub struct AuditLog {
    records: Vec<AuditRecord>,
    anchor: ContentDigest,
    next_index: u64,
    max_records: usize,
}

impl AuditLog {
    /// Default capacity used by [`AuditLog::default`].
    pub const DEFAULT_CAPACITY: usize = 10_000;

    /// Create an empty log retaining at most `max_records` records.
    ///
    /// A capacity of zero is treated as one.
    pub fn new(max_records: usize) -> Self {
        Self {
            records: Vec::new(),
            anchor: ContentDigest::ZERO,
            next_index: 0,
            max_records: max_records.max(1),
        }
    }

    /// Chain and append an event, returning the new record's digest.
    ///
    /// # Errors
    ///
    /// Returns [`CanonicalizationError`] if the event cannot be
    /// canonicalized; the log is left unchanged.
    pub fn append(&mut self, event: AuditEvent) -> Result<ContentDigest, CanonicalizationError> {
        let previous_digest = self.head();
        let index = self.next_index;
        let digest = chain_digest(index, &event, &previous_digest)?;
        self.records.push(AuditRecord {
            index,
            event,
            previous_digest,
            digest,
        });
        self.next_index += 1;
        if self.records.len() > self.max_records {
            let trim_count = (self.max_records / 10).max(1);
            self.records.drain(..trim_count);
            if let Some(first) = self.records.first() {
                self.anchor = first.previous_digest;
            }
        }
        Ok(digest)
    }

    /// Digest of the newest record, or the anchor if the log is empty.
    pub fn head(&self) -> ContentDigest {
        self.records.last().map_or(self.anchor, |r| r.digest)
    }

    /// The digest the oldest retained record links to.
    pub fn anchor(&self) -> ContentDigest {
        self.anchor
    }

    /// Retained records, oldest first.
    pub fn records(&self) -> &[AuditRecord] {
        &self.records
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether no records are retained.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.max_records
    }

    /// Retained records involving `depositor`.
    pub fn records_for_depositor(&self, depositor: &AccountId) -> Vec<&AuditRecord> {
        self.records
            .iter()
            .filter(|r| r.event.depositor() == depositor)
            .collect()
    }

    /// Recompute every retained digest and check the links between records.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found, oldest first.
    pub fn verify_chain(&self) -> Result<(), AuditLogError> {
        let mut previous = self.anchor;
        let mut expected_index = self.records.first().map_or(0, |r| r.index);
        for record in &self.records {
            if record.index != expected_index {
                return Err(AuditLogError::IndexGap {
                    expected: expected_index,
                    found: record.index,
                });
            }
            if record.previous_digest != previous {
                return Err(AuditLogError::BrokenLink {
                    index: record.index,
                });
            }
            let recomputed = chain_digest(record.index, &record.event, &record.previous_digest)?;
            if recomputed != record.digest {
                return Err(AuditLogError::DigestMismatch {
                    index: record.index,
                });
            }
            previous = record.digest;
            expected_index += 1;
        }
        Ok(())
    }
}

impl Default for AuditLog {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

impl AuditSink for AuditLog {
    fn record(&mut self, event: AuditEvent) {
        let kind = event.kind();
        if let Err(e) = self.append(event) {
            tracing::error!(event = kind, error = %e, "audit event could not be chained; dropped");
        }
    }
}
