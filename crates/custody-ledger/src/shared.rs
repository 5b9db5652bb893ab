//! # Shared Pool Handle
//!
//! A cloneable handle to one pool and its audit sink, guarded by a single
//! `parking_lot::Mutex`. Every operation takes the lock exactly once, so each
//! deposit or withdrawal sees an exclusively-held pool for its whole
//! duration. The lock is never held across anything but the operation itself.
//!
//! `parking_lot::Mutex` does not poison: a panicking caller cannot wedge the
//! pool for everyone else. The pool itself never commits half an operation
//! when its sink panics, so the handle stays consistent after the unwind.

use std::sync::Arc;

use parking_lot::Mutex;

use custody_core::{AccountId, PoolId};

use crate::audit::AuditSink;
use crate::error::{LedgerError, WithdrawError};
use crate::pool::{create_pool, LedgerPool, Payout, PoolSnapshot};
use crate::receipt::Receipt;
use crate::Amount;

#[derive(Debug)]
struct Guarded<S> {
    pool: LedgerPool,
    sink: S,
}

/// Thread-safe, cloneable handle to a pool and its audit sink.
#[derive(Debug)]
pub struct SharedPool<S> {
    id: PoolId,
    inner: Arc<Mutex<Guarded<S>>>,
}

impl<S> Clone for SharedPool<S> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: AuditSink> SharedPool<S> {
    /// Create a fresh pool publishing to `sink`.
    pub fn new(sink: S) -> Self {
        Self::from_pool(create_pool(), sink)
    }

    /// Share an existing pool.
    pub fn from_pool(pool: LedgerPool, sink: S) -> Self {
        Self {
            id: pool.id(),
            inner: Arc::new(Mutex::new(Guarded { pool, sink })),
        }
    }

    /// See [`LedgerPool::deposit`].
    pub fn deposit(&self, amount: Amount, depositor: &AccountId) -> Result<Receipt, LedgerError> {
        let mut guard = self.inner.lock();
        let Guarded { pool, sink } = &mut *guard;
        pool.deposit(amount, depositor, sink)
    }

    /// See [`LedgerPool::withdraw`].
    pub fn withdraw(&self, receipt: Receipt, caller: &AccountId) -> Result<Payout, WithdrawError> {
        let mut guard = self.inner.lock();
        let Guarded { pool, sink } = &mut *guard;
        pool.withdraw(receipt, caller, sink)
    }

    /// See [`LedgerPool::verify_conservation`].
    pub fn verify_conservation<'a, I>(&self, outstanding: I) -> Result<(), LedgerError>
    where
        I: IntoIterator<Item = &'a Receipt>,
    {
        self.inner.lock().pool.verify_conservation(outstanding)
    }
}

impl<S> SharedPool<S> {
    /// Identity of the shared pool. Does not take the lock.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Units currently held.
    pub fn balance(&self) -> Amount {
        self.inner.lock().pool.balance()
    }

    /// Number of deposits ever accepted.
    pub fn deposit_count(&self) -> u64 {
        self.inner.lock().pool.deposit_count()
    }

    /// Number of receipts not yet redeemed.
    pub fn active_receipt_count(&self) -> u64 {
        self.inner.lock().pool.active_receipt_count()
    }

    /// Consistent view of all counters, taken under one lock.
    pub fn snapshot(&self) -> PoolSnapshot {
        self.inner.lock().pool.snapshot()
    }

    /// Run `f` against the sink while holding the lock.
    pub fn with_sink<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.inner.lock().sink)
    }
}
