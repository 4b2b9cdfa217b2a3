//! Ledger rows (immutable, append-only).

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardbank_core::{CardNumber, DomainError, Entity, Money, TransactionId, UserId};

/// Type tag of a ledger row.
///
/// The string forms are what users see in their history and what is
/// persisted, so they must stay stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "&'static str", try_from = "String")]
pub enum EntryKind {
    /// Sender side of a transfer.
    Debit,
    /// Recipient side of a transfer.
    Credit,
    /// Self-deposit.
    Deposit,
    /// Airtime recharge purchase.
    AirtimePurchase,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Debit => "Debit",
            EntryKind::Credit => "Credit",
            EntryKind::Deposit => "Credit - Deposit",
            EntryKind::AirtimePurchase => "Debit - Airtime Purchase",
        }
    }

    pub fn is_credit(&self) -> bool {
        matches!(self, EntryKind::Credit | EntryKind::Deposit)
    }
}

impl core::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntryKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Debit" => Ok(EntryKind::Debit),
            "Credit" => Ok(EntryKind::Credit),
            "Credit - Deposit" => Ok(EntryKind::Deposit),
            "Debit - Airtime Purchase" => Ok(EntryKind::AirtimePurchase),
            other => Err(DomainError::validation(format!("unknown entry kind '{other}'"))),
        }
    }
}

impl From<EntryKind> for &'static str {
    fn from(value: EntryKind) -> Self {
        value.as_str()
    }
}

impl TryFrom<String> for EntryKind {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// One side of a balance-changing event.
///
/// Counterparty fields are captured when the row is written; later renames
/// do not rewrite history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: TransactionId,
    pub user_id: UserId,
    pub counterparty_name: String,
    pub counterparty_card: CardNumber,
    /// Signed: airtime purchases are stored negative, everything else positive.
    pub amount: Money,
    pub kind: EntryKind,
    pub created_at: DateTime<Utc>,
}

impl Entity for LedgerEntry {
    type Id = TransactionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl LedgerEntry {
    /// Most recent first; ties broken by id (UUIDv7, time-ordered).
    pub fn newest_first(a: &LedgerEntry, b: &LedgerEntry) -> core::cmp::Ordering {
        b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id))
    }
}
