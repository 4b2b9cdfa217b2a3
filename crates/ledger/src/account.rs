//! Account holder + balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardbank_core::{CardNumber, Entity, Money, UserId};

/// Balance every new account opens with (50,000.00).
pub const DEFAULT_OPENING_BALANCE: Money = Money::from_major(50_000);

/// A user's account as the ledger sees it.
///
/// Credentials are not part of this type; storage keeps them alongside.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    pub card_number: CardNumber,
    pub balance: Money,
    pub created_at: DateTime<Utc>,
}

impl Entity for Account {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Account {
    pub fn can_afford(&self, amount: Money) -> bool {
        amount <= self.balance
    }
}
