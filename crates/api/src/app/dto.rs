//! View models handed to templates.

use serde::{Deserialize, Serialize};

use cardbank_infra::RechargeOutcome;
use cardbank_ledger::{Account, LedgerEntry};

// -------------------------
// Request forms
// -------------------------

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// -------------------------
// Template models
// -------------------------

#[derive(Debug, Serialize)]
pub struct AccountView {
    pub full_name: String,
    pub email: String,
    /// Grouped in fours: `1234-5678-9012-3456`.
    pub card_number: String,
    pub balance: String,
}

impl From<&Account> for AccountView {
    fn from(a: &Account) -> Self {
        Self {
            full_name: a.full_name.clone(),
            email: a.email.clone(),
            card_number: a.card_number.hyphenated(),
            balance: a.balance.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntryView {
    pub counterparty_name: String,
    pub counterparty_card: String,
    pub amount: String,
    pub kind: &'static str,
    pub is_credit: bool,
    pub timestamp: String,
}

impl From<&LedgerEntry> for EntryView {
    fn from(e: &LedgerEntry) -> Self {
        Self {
            counterparty_name: e.counterparty_name.clone(),
            counterparty_card: e.counterparty_card.hyphenated(),
            amount: e.amount.to_string(),
            kind: e.kind.as_str(),
            is_credit: e.kind.is_credit(),
            timestamp: e.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RechargeView {
    pub requested: String,
    pub discount: String,
    pub amount: String,
    pub phone_number: Option<String>,
}

impl From<&RechargeOutcome> for RechargeView {
    fn from(r: &RechargeOutcome) -> Self {
        Self {
            requested: r.quote.requested.to_string(),
            discount: r.quote.discount.to_string(),
            amount: r.quote.charged.to_string(),
            phone_number: r.phone_number.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbank_core::{CardNumber, Money, TransactionId, UserId};
    use cardbank_ledger::EntryKind;
    use chrono::{TimeZone, Utc};

    #[test]
    fn entry_view_formats_for_display() {
        let entry = LedgerEntry {
            id: TransactionId::new(),
            user_id: UserId::new(),
            counterparty_name: "Bob".into(),
            counterparty_card: CardNumber::parse("1234567890123456").unwrap(),
            amount: Money::from_minor(-90_000),
            kind: EntryKind::AirtimePurchase,
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap(),
        };
        let view = EntryView::from(&entry);
        assert_eq!(view.counterparty_card, "1234-5678-9012-3456");
        assert_eq!(view.amount, "-900.00");
        assert_eq!(view.kind, "Debit - Airtime Purchase");
        assert!(!view.is_credit);
        assert_eq!(view.timestamp, "2024-05-01 09:30:00");
    }
}
