use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use cardbank_core::{CardNumber, UserId};
use cardbank_ledger::{Account, LedgerEntry, LedgerError, Posting, Receipt};

use super::{BankStore, StoreError, UniqueField, UserRecord};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, UserRecord>,
    by_email: HashMap<String, UserId>,
    by_card: HashMap<CardNumber, UserId>,
    entries: Vec<LedgerEntry>,
    receipts: HashMap<String, Receipt>,
}

/// In-memory bank store for tests/dev.
///
/// A single lock guards every table, so a posting is validated and applied
/// under one write guard and is atomic with respect to other callers.
#[derive(Debug, Default)]
pub struct InMemoryBankStore {
    inner: RwLock<State>,
}

impl InMemoryBankStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.inner
            .read()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.inner
            .write()
            .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
    }

    /// Sum of all balances. Transfers must never change it.
    pub fn total_balance(&self) -> Result<i64, StoreError> {
        let state = self.read()?;
        Ok(state.users.values().map(|u| u.account.balance.minor()).sum())
    }
}

#[async_trait]
impl BankStore for InMemoryBankStore {
    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.by_email.contains_key(&user.account.email) {
            return Err(StoreError::Duplicate(UniqueField::Email));
        }
        if state.by_card.contains_key(&user.account.card_number) {
            return Err(StoreError::Duplicate(UniqueField::CardNumber));
        }
        let id = user.account.id;
        state.by_email.insert(user.account.email.clone(), id);
        state.by_card.insert(user.account.card_number.clone(), id);
        state.users.insert(id, user);
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let state = self.read()?;
        Ok(state
            .by_email
            .get(email)
            .and_then(|id| state.users.get(id))
            .cloned())
    }

    async fn find_account(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        let state = self.read()?;
        Ok(state.users.get(&id).map(|u| u.account.clone()))
    }

    async fn find_account_by_card(
        &self,
        card: &CardNumber,
    ) -> Result<Option<Account>, StoreError> {
        let state = self.read()?;
        Ok(state
            .by_card
            .get(card)
            .and_then(|id| state.users.get(id))
            .map(|u| u.account.clone()))
    }

    async fn card_number_exists(&self, card: &CardNumber) -> Result<bool, StoreError> {
        Ok(self.read()?.by_card.contains_key(card))
    }

    async fn commit_posting(&self, posting: &Posting) -> Result<(), StoreError> {
        let mut state = self.write()?;

        // Stage every account first; nothing is written unless all succeed.
        let mut staged: Vec<Account> = Vec::new();
        for change in &posting.changes {
            if staged.iter().any(|a| a.id == change.user_id) {
                continue;
            }
            let user = state
                .users
                .get(&change.user_id)
                .ok_or_else(|| StoreError::NotFound(format!("user {}", change.user_id)))?;
            let mut account = user.account.clone();
            posting.apply_to(&mut account).map_err(|e| match e {
                LedgerError::InsufficientBalance { .. } => {
                    StoreError::InsufficientFunds(change.user_id)
                }
                other => StoreError::Backend(other.to_string()),
            })?;
            staged.push(account);
        }
        for entry in &posting.entries {
            if !state.users.contains_key(&entry.user_id) {
                return Err(StoreError::NotFound(format!("user {}", entry.user_id)));
            }
        }

        for account in staged {
            if let Some(user) = state.users.get_mut(&account.id) {
                user.account.balance = account.balance;
            }
        }
        state.entries.extend(posting.entries.iter().cloned());
        Ok(())
    }

    async fn list_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        let state = self.read()?;
        let mut rows: Vec<LedgerEntry> = state
            .entries
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        rows.sort_by(LedgerEntry::newest_first);
        Ok(rows)
    }

    async fn insert_receipt(&self, receipt: &Receipt) -> Result<(), StoreError> {
        let mut state = self.write()?;
        if state.receipts.contains_key(&receipt.file_name) {
            return Err(StoreError::Duplicate(UniqueField::ReceiptFileName));
        }
        state
            .receipts
            .insert(receipt.file_name.clone(), receipt.clone());
        Ok(())
    }

    async fn find_receipt(&self, file_name: &str) -> Result<Option<Receipt>, StoreError> {
        Ok(self.read()?.receipts.get(file_name).cloned())
    }

    async fn remove_receipts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Receipt>, StoreError> {
        let mut state = self.write()?;
        let expired: Vec<String> = state
            .receipts
            .values()
            .filter(|r| r.created_at <= cutoff)
            .map(|r| r.file_name.clone())
            .collect();
        Ok(expired
            .iter()
            .filter_map(|name| state.receipts.remove(name))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbank_auth::PasswordHash;
    use cardbank_core::{Money, TransactionId};
    use cardbank_ledger::{BalanceChange, EntryKind};
    use chrono::Duration;

    fn user(email: &str, card: &str, balance: Money) -> UserRecord {
        UserRecord {
            account: Account {
                id: UserId::new(),
                full_name: "Test User".to_string(),
                email: email.to_string(),
                card_number: CardNumber::parse(card).unwrap(),
                balance,
                created_at: Utc::now(),
            },
            password_hash: PasswordHash::from_stored("$2b$04$hash".to_string()),
        }
    }

    fn entry(user_id: UserId, amount: Money, at: DateTime<Utc>) -> LedgerEntry {
        LedgerEntry {
            id: TransactionId::new(),
            user_id,
            counterparty_name: "Other".to_string(),
            counterparty_card: CardNumber::parse("9999888877776666").unwrap(),
            amount,
            kind: EntryKind::Debit,
            created_at: at,
        }
    }

    #[tokio::test]
    async fn duplicate_email_and_card_are_rejected() {
        let store = InMemoryBankStore::new();
        store
            .insert_user(user("a@x.com", "1111222233334444", Money::ZERO))
            .await
            .unwrap();

        let err = store
            .insert_user(user("a@x.com", "5555666677778888", Money::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::Email)));

        let err = store
            .insert_user(user("b@x.com", "1111222233334444", Money::ZERO))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(UniqueField::CardNumber)));
    }

    #[tokio::test]
    async fn failed_posting_writes_nothing() {
        let store = InMemoryBankStore::new();
        let a = user("a@x.com", "1111222233334444", Money::from_major(100));
        let b = user("b@x.com", "5555666677778888", Money::from_major(5));
        let (a_id, b_id) = (a.account.id, b.account.id);
        store.insert_user(a).await.unwrap();
        store.insert_user(b).await.unwrap();

        // Credit to A is fine on its own, the debit on B is not.
        let posting = Posting {
            changes: vec![
                BalanceChange { user_id: a_id, delta: Money::from_major(10) },
                BalanceChange { user_id: b_id, delta: Money::from_major(-10) },
            ],
            entries: vec![entry(a_id, Money::from_major(10), Utc::now())],
        };
        let err = store.commit_posting(&posting).await.unwrap_err();
        assert!(matches!(err, StoreError::InsufficientFunds(id) if id == b_id));

        assert_eq!(
            store.find_account(a_id).await.unwrap().unwrap().balance,
            Money::from_major(100)
        );
        assert!(store.list_entries(a_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn posting_for_unknown_user_is_not_found() {
        let store = InMemoryBankStore::new();
        let posting = Posting {
            changes: vec![BalanceChange { user_id: UserId::new(), delta: Money::from_major(1) }],
            entries: vec![],
        };
        assert!(matches!(
            store.commit_posting(&posting).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn entries_are_listed_newest_first() {
        let store = InMemoryBankStore::new();
        let a = user("a@x.com", "1111222233334444", Money::from_major(100));
        let a_id = a.account.id;
        store.insert_user(a).await.unwrap();

        let t0 = Utc::now();
        let older = entry(a_id, Money::from_major(1), t0 - Duration::minutes(5));
        let newer = entry(a_id, Money::from_major(2), t0);
        let posting = Posting {
            changes: vec![],
            entries: vec![older.clone(), newer.clone()],
        };
        store.commit_posting(&posting).await.unwrap();

        let rows = store.list_entries(a_id).await.unwrap();
        assert_eq!(rows, vec![newer, older]);
    }

    #[tokio::test]
    async fn expired_receipts_are_removed() {
        let store = InMemoryBankStore::new();
        let now = Utc::now();
        let receipt = |name: &str, at| Receipt {
            id: cardbank_core::ReceiptId::new(),
            transaction_id: TransactionId::new(),
            owner_id: UserId::new(),
            file_name: name.to_string(),
            storage_key: name.to_string(),
            content_type: "application/pdf".to_string(),
            created_at: at,
        };
        store
            .insert_receipt(&receipt("old.pdf", now - Duration::hours(25)))
            .await
            .unwrap();
        store.insert_receipt(&receipt("new.pdf", now)).await.unwrap();

        let removed = store
            .remove_receipts_created_before(now - Duration::hours(24))
            .await
            .unwrap();
        assert_eq!(removed.len(), 1);
        assert_eq!(removed[0].file_name, "old.pdf");
        assert!(store.find_receipt("old.pdf").await.unwrap().is_none());
        assert!(store.find_receipt("new.pdf").await.unwrap().is_some());
    }
}
