//! Bank persistence boundary.
//!
//! The banking service only talks to [`BankStore`]. Two implementations
//! exist: [`InMemoryBankStore`] for dev/tests and [`PostgresBankStore`].

pub mod in_memory;
pub mod postgres;

pub use in_memory::InMemoryBankStore;
pub use postgres::PostgresBankStore;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use cardbank_auth::PasswordHash;
use cardbank_core::{CardNumber, UserId};
use cardbank_ledger::{Account, LedgerEntry, Posting, Receipt};

/// Columns with a uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UniqueField {
    Email,
    CardNumber,
    ReceiptFileName,
}

impl core::fmt::Display for UniqueField {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(match self {
            UniqueField::Email => "email",
            UniqueField::CardNumber => "card number",
            UniqueField::ReceiptFileName => "receipt file name",
        })
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("duplicate {0}")]
    Duplicate(UniqueField),

    #[error("not found: {0}")]
    NotFound(String),

    /// A debit would have taken the account below zero. Nothing was written.
    #[error("insufficient funds on account {0}")]
    InsufficientFunds(UserId),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// A user row: the ledger's view of the account plus the credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRecord {
    pub account: Account,
    pub password_hash: PasswordHash,
}

/// Persistence for users, ledger rows and receipt metadata.
#[async_trait]
pub trait BankStore: Send + Sync {
    /// Insert a new user. Fails with [`StoreError::Duplicate`] if the email
    /// or card number is taken.
    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError>;

    /// Look up by normalised email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError>;

    async fn find_account(&self, id: UserId) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_card(&self, card: &CardNumber)
    -> Result<Option<Account>, StoreError>;

    async fn card_number_exists(&self, card: &CardNumber) -> Result<bool, StoreError>;

    /// Apply every balance change and append every entry in one atomic
    /// unit. Debits are applied as deltas guarded against going negative.
    async fn commit_posting(&self, posting: &Posting) -> Result<(), StoreError>;

    /// All rows owned by `user_id`, newest first (ties by id, descending).
    async fn list_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError>;

    async fn insert_receipt(&self, receipt: &Receipt) -> Result<(), StoreError>;

    async fn find_receipt(&self, file_name: &str) -> Result<Option<Receipt>, StoreError>;

    /// Delete and return receipts created at or before `cutoff`.
    async fn remove_receipts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Receipt>, StoreError>;
}

#[async_trait]
impl<S> BankStore for Arc<S>
where
    S: BankStore + ?Sized,
{
    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        (**self).insert_user(user).await
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        (**self).find_user_by_email(email).await
    }

    async fn find_account(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        (**self).find_account(id).await
    }

    async fn find_account_by_card(
        &self,
        card: &CardNumber,
    ) -> Result<Option<Account>, StoreError> {
        (**self).find_account_by_card(card).await
    }

    async fn card_number_exists(&self, card: &CardNumber) -> Result<bool, StoreError> {
        (**self).card_number_exists(card).await
    }

    async fn commit_posting(&self, posting: &Posting) -> Result<(), StoreError> {
        (**self).commit_posting(posting).await
    }

    async fn list_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        (**self).list_entries(user_id).await
    }

    async fn insert_receipt(&self, receipt: &Receipt) -> Result<(), StoreError> {
        (**self).insert_receipt(receipt).await
    }

    async fn find_receipt(&self, file_name: &str) -> Result<Option<Receipt>, StoreError> {
        (**self).find_receipt(file_name).await
    }

    async fn remove_receipts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Receipt>, StoreError> {
        (**self).remove_receipts_created_before(cutoff).await
    }
}
