//! Postgres-backed bank store.
//!
//! ## Error mapping
//!
//! | SQLx error | Postgres code | `StoreError` |
//! |---|---|---|
//! | unique violation on `users_email_key` | `23505` | `Duplicate(Email)` |
//! | unique violation on `users_card_number_key` | `23505` | `Duplicate(CardNumber)` |
//! | unique violation on `receipts_file_name_key` | `23505` | `Duplicate(ReceiptFileName)` |
//! | check violation on `users_balance_non_negative` | `23514` | `Backend` (the guarded update prevents it) |
//! | anything else | any | `Backend` |
//!
//! ## Postings
//!
//! `commit_posting` runs in one transaction. Balance changes are applied
//! as `balance = balance + delta` with a non-negative guard, in user id
//! order so two concurrent postings touching the same pair of accounts
//! lock rows in the same order.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::{instrument, warn};

use cardbank_auth::PasswordHash;
use cardbank_core::{CardNumber, Money, ReceiptId, TransactionId, UserId};
use cardbank_ledger::{Account, EntryKind, LedgerEntry, Posting, Receipt};

use super::{BankStore, StoreError, UniqueField, UserRecord};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

#[derive(Debug, Clone)]
pub struct PostgresBankStore {
    pool: Arc<PgPool>,
}

impl PostgresBankStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect and run pending migrations.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        MIGRATOR
            .run(&pool)
            .await
            .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;

        Ok(Self::new(pool))
    }

    async fn apply_change(
        tx: &mut Transaction<'_, Postgres>,
        user_id: UserId,
        delta: Money,
    ) -> Result<(), StoreError> {
        let updated = sqlx::query(
            r#"
            UPDATE users
            SET balance = balance + $1
            WHERE id = $2 AND ($1 >= 0 OR balance + $1 >= 0)
            RETURNING balance
            "#,
        )
        .bind(delta.minor())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("apply_change", e))?;

        if updated.is_some() {
            return Ok(());
        }

        let exists = sqlx::query("SELECT 1 FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| map_sqlx_error("apply_change", e))?
            .is_some();

        if exists {
            Err(StoreError::InsufficientFunds(user_id))
        } else {
            Err(StoreError::NotFound(format!("user {user_id}")))
        }
    }
}

const USER_COLUMNS: &str =
    "id, full_name, email, password_hash, card_number, balance, created_at";

#[async_trait]
impl BankStore for PostgresBankStore {
    #[instrument(skip(self, user), fields(user_id = %user.account.id), err)]
    async fn insert_user(&self, user: UserRecord) -> Result<(), StoreError> {
        let account = &user.account;
        sqlx::query(
            r#"
            INSERT INTO users (id, full_name, email, password_hash, card_number, balance, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(account.id.as_uuid())
        .bind(&account.full_name)
        .bind(&account.email)
        .bind(user.password_hash.as_str())
        .bind(account.card_number.as_str())
        .bind(account.balance.minor())
        .bind(account.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_user", e))?;
        Ok(())
    }

    #[instrument(skip(self, email), err)]
    async fn find_user_by_email(&self, email: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
            .bind(email)
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_user_by_email", e))?;

        row.map(|r| -> Result<UserRecord, StoreError> {
            let password_hash: String = r.try_get("password_hash").map_err(decode_error)?;
            Ok(UserRecord {
                account: account_from_row(&r)?,
                password_hash: PasswordHash::from_stored(password_hash),
            })
        })
        .transpose()
    }

    #[instrument(skip(self), fields(user_id = %id), err)]
    async fn find_account(&self, id: UserId) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_account", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self, card), err)]
    async fn find_account_by_card(
        &self,
        card: &CardNumber,
    ) -> Result<Option<Account>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE card_number = $1"
        ))
        .bind(card.as_str())
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_account_by_card", e))?;

        row.as_ref().map(account_from_row).transpose()
    }

    #[instrument(skip(self, card), err)]
    async fn card_number_exists(&self, card: &CardNumber) -> Result<bool, StoreError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE card_number = $1")
            .bind(card.as_str())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("card_number_exists", e))?;
        Ok(row.is_some())
    }

    #[instrument(
        skip(self, posting),
        fields(changes = posting.changes.len(), entries = posting.entries.len()),
        err
    )]
    async fn commit_posting(&self, posting: &Posting) -> Result<(), StoreError> {
        let mut changes = posting.changes.clone();
        changes.sort_by_key(|c| c.user_id);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))?;

        for change in &changes {
            if let Err(e) = Self::apply_change(&mut tx, change.user_id, change.delta).await {
                if let Err(rollback) = tx.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                return Err(e);
            }
        }

        for entry in &posting.entries {
            sqlx::query(
                r#"
                INSERT INTO transactions
                    (id, user_id, recipient_name, recipient_card_number, amount, type, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(entry.id.as_uuid())
            .bind(entry.user_id.as_uuid())
            .bind(&entry.counterparty_name)
            .bind(entry.counterparty_card.as_str())
            .bind(entry.amount.minor())
            .bind(entry.kind.as_str())
            .bind(entry.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("insert_entry", e))?;
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_transaction", e))?;
        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user_id), err)]
    async fn list_entries(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, StoreError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, recipient_name, recipient_card_number, amount, type, created_at
            FROM transactions
            WHERE user_id = $1
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_entries", e))?;

        rows.iter().map(entry_from_row).collect()
    }

    #[instrument(skip(self, receipt), fields(receipt_id = %receipt.id), err)]
    async fn insert_receipt(&self, receipt: &Receipt) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO receipts
                (id, transaction_id, owner_id, file_name, storage_key, content_type, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(receipt.id.as_uuid())
        .bind(receipt.transaction_id.as_uuid())
        .bind(receipt.owner_id.as_uuid())
        .bind(&receipt.file_name)
        .bind(&receipt.storage_key)
        .bind(&receipt.content_type)
        .bind(receipt.created_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_receipt", e))?;
        Ok(())
    }

    #[instrument(skip(self), err)]
    async fn find_receipt(&self, file_name: &str) -> Result<Option<Receipt>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, transaction_id, owner_id, file_name, storage_key, content_type, created_at
            FROM receipts
            WHERE file_name = $1
            "#,
        )
        .bind(file_name)
        .fetch_optional(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("find_receipt", e))?;

        row.as_ref().map(receipt_from_row).transpose()
    }

    #[instrument(skip(self), err)]
    async fn remove_receipts_created_before(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<Receipt>, StoreError> {
        let rows = sqlx::query(
            r#"
            DELETE FROM receipts
            WHERE created_at <= $1
            RETURNING id, transaction_id, owner_id, file_name, storage_key, content_type, created_at
            "#,
        )
        .bind(cutoff)
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("remove_receipts_created_before", e))?;

        rows.iter().map(receipt_from_row).collect()
    }
}

fn account_from_row(row: &PgRow) -> Result<Account, StoreError> {
    let card: String = row.try_get("card_number").map_err(decode_error)?;
    Ok(Account {
        id: UserId::from_uuid(row.try_get("id").map_err(decode_error)?),
        full_name: row.try_get("full_name").map_err(decode_error)?,
        email: row.try_get("email").map_err(decode_error)?,
        card_number: parse_card(&card)?,
        balance: Money::from_minor(row.try_get("balance").map_err(decode_error)?),
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn entry_from_row(row: &PgRow) -> Result<LedgerEntry, StoreError> {
    let card: String = row.try_get("recipient_card_number").map_err(decode_error)?;
    let kind: String = row.try_get("type").map_err(decode_error)?;
    Ok(LedgerEntry {
        id: TransactionId::from_uuid(row.try_get("id").map_err(decode_error)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(decode_error)?),
        counterparty_name: row.try_get("recipient_name").map_err(decode_error)?,
        counterparty_card: parse_card(&card)?,
        amount: Money::from_minor(row.try_get("amount").map_err(decode_error)?),
        kind: kind
            .parse::<EntryKind>()
            .map_err(|e| StoreError::Backend(format!("invalid transaction type: {e}")))?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn receipt_from_row(row: &PgRow) -> Result<Receipt, StoreError> {
    Ok(Receipt {
        id: ReceiptId::from_uuid(row.try_get("id").map_err(decode_error)?),
        transaction_id: TransactionId::from_uuid(
            row.try_get("transaction_id").map_err(decode_error)?,
        ),
        owner_id: UserId::from_uuid(row.try_get("owner_id").map_err(decode_error)?),
        file_name: row.try_get("file_name").map_err(decode_error)?,
        storage_key: row.try_get("storage_key").map_err(decode_error)?,
        content_type: row.try_get("content_type").map_err(decode_error)?,
        created_at: row.try_get("created_at").map_err(decode_error)?,
    })
}

fn parse_card(raw: &str) -> Result<CardNumber, StoreError> {
    CardNumber::parse(raw).map_err(|e| StoreError::Backend(format!("invalid stored card number: {e}")))
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::Backend(format!("failed to decode row: {err}"))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            if db_err.code().as_deref() == Some("23505") {
                match db_err.constraint() {
                    Some("users_email_key") => return StoreError::Duplicate(UniqueField::Email),
                    Some("users_card_number_key") => {
                        return StoreError::Duplicate(UniqueField::CardNumber);
                    }
                    Some("receipts_file_name_key") => {
                        return StoreError::Duplicate(UniqueField::ReceiptFileName);
                    }
                    _ => {}
                }
            }
            StoreError::Backend(format!(
                "database error in {}: {}",
                operation,
                db_err.message()
            ))
        }
        sqlx::Error::PoolClosed => {
            StoreError::Backend(format!("connection pool closed in {}", operation))
        }
        other => StoreError::Backend(format!("sqlx error in {}: {}", operation, other)),
    }
}
