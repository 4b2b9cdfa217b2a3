//! Postings: the unit of work storage commits atomically.

use serde::{Deserialize, Serialize};

use cardbank_core::{Money, UserId};

use crate::account::Account;
use crate::entry::LedgerEntry;
use crate::error::LedgerError;

/// Signed change to one account's balance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceChange {
    pub user_id: UserId,
    pub delta: Money,
}

/// Balance changes plus the ledger rows that explain them.
///
/// Either every change and every row is committed, or none is. Storage
/// applies changes as deltas and refuses any debit that would take a
/// balance below zero, so a posting planned against a stale balance fails
/// instead of overdrawing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub changes: Vec<BalanceChange>,
    pub entries: Vec<LedgerEntry>,
}

impl Posting {
    /// Net delta this posting applies to `user_id`.
    pub fn delta_for(&self, user_id: UserId) -> Money {
        self.changes
            .iter()
            .filter(|c| c.user_id == user_id)
            .fold(Money::ZERO, |acc, c| acc.checked_add(c.delta).unwrap_or(acc))
    }

    /// Apply this posting's changes for `account` in place.
    ///
    /// Used by stores that hold accounts in memory; the account is left
    /// untouched on error.
    pub fn apply_to(&self, account: &mut Account) -> Result<(), LedgerError> {
        let mut balance = account.balance;
        for change in self.changes.iter().filter(|c| c.user_id == account.id) {
            balance = balance.checked_add(change.delta).ok_or(LedgerError::Overflow)?;
            if change.delta.is_negative() && balance.is_negative() {
                return Err(LedgerError::InsufficientBalance {
                    available: account.balance,
                    required: -change.delta,
                });
            }
        }
        account.balance = balance;
        Ok(())
    }
}
