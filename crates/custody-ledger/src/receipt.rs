//! # Receipts
//!
//! A receipt is the depositor's single-use claim on the pool. It is minted
//! only inside [`LedgerPool::deposit`](crate::LedgerPool::deposit) and
//! consumed only inside [`LedgerPool::withdraw`](crate::LedgerPool::withdraw).
//!
//! ## Security Invariant
//!
//! `Receipt` is move-only: it implements neither `Clone` nor `Copy`, and it
//! implements `Serialize` but not `Deserialize`. Presenting the same receipt
//! twice is a compile error, and no second minting path exists outside the
//! `test-util` feature. There is no setter for `owner`.

use serde::Serialize;

use custody_core::{AccountId, PoolId, ReceiptId, Timestamp};

use crate::Amount;

/// A single-use, non-transferable claim on a pool.
#[derive(Debug, Serialize)]
pub struct Receipt {
    id: ReceiptId,
    pool_id: PoolId,
    sequence_number: u64,
    owner: AccountId,
    amount: Amount,
    issued_at: Timestamp,
}

impl Receipt {
    pub(crate) fn mint(
        pool_id: PoolId,
        sequence_number: u64,
        owner: AccountId,
        amount: Amount,
    ) -> Self {
        Self {
            id: ReceiptId::new(),
            pool_id,
            sequence_number,
            owner,
            amount,
            issued_at: Timestamp::now(),
        }
    }

    /// Build a receipt outside the deposit path.
    ///
    /// Only for tests that need to present tampered or foreign receipts.
    #[cfg(any(test, feature = "test-util"))]
    pub fn forge(pool_id: PoolId, sequence_number: u64, owner: AccountId, amount: Amount) -> Self {
        Self::mint(pool_id, sequence_number, owner, amount)
    }

    /// Unique identifier of this receipt.
    pub fn id(&self) -> ReceiptId {
        self.id
    }

    /// The pool that minted this receipt.
    pub fn pool_id(&self) -> PoolId {
        self.pool_id
    }

    /// Position among all deposits made to the minting pool (1-based).
    pub fn sequence_number(&self) -> u64 {
        self.sequence_number
    }

    /// The depositor, who alone may redeem this receipt.
    pub fn owner(&self) -> &AccountId {
        &self.owner
    }

    /// Exact amount released on redemption.
    pub fn amount(&self) -> Amount {
        self.amount
    }

    /// When the receipt was minted.
    pub fn issued_at(&self) -> Timestamp {
        self.issued_at
    }

    /// Retire the receipt, yielding the fields a withdrawal needs.
    pub(crate) fn redeem(self) -> RedeemedReceipt {
        RedeemedReceipt {
            id: self.id,
            sequence_number: self.sequence_number,
            owner: self.owner,
            amount: self.amount,
        }
    }
}

/// Fields read once from a receipt as it is destroyed.
pub(crate) struct RedeemedReceipt {
    pub(crate) id: ReceiptId,
    pub(crate) sequence_number: u64,
    pub(crate) owner: AccountId,
    pub(crate) amount: Amount,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> AccountId {
        AccountId::new("alice").unwrap()
    }

    #[test]
    fn minted_receipts_have_fresh_ids() {
        let pool_id = PoolId::new();
        let a = Receipt::mint(pool_id, 1, alice(), 10);
        let b = Receipt::mint(pool_id, 2, alice(), 10);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.pool_id(), b.pool_id());
    }

    #[test]
    fn accessors_expose_minted_fields() {
        let pool_id = PoolId::new();
        let receipt = Receipt::mint(pool_id, 7, alice(), 250);
        assert_eq!(receipt.pool_id(), pool_id);
        assert_eq!(receipt.sequence_number(), 7);
        assert_eq!(receipt.owner(), &alice());
        assert_eq!(receipt.amount(), 250);
    }

    #[test]
    fn redeem_preserves_fields() {
        let receipt = Receipt::mint(PoolId::new(), 3, alice(), 40);
        let id = receipt.id();
        let redeemed = receipt.redeem();
        assert_eq!(redeemed.id, id);
        assert_eq!(redeemed.sequence_number, 3);
        assert_eq!(redeemed.owner, alice());
        assert_eq!(redeemed.amount, 40);
    }

    #[test]
    fn serializes_for_host_inspection() {
        let receipt = Receipt::mint(PoolId::new(), 1, alice(), 5);
        let value = serde_json::to_value(&receipt).unwrap();
        assert_eq!(value["sequence_number"], 1);
        assert_eq!(value["owner"], "alice");
        assert_eq!(value["amount"], 5);
    }
}
