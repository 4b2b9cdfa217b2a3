//! Transfer, deposit and recharge planning.
//!
//! Each planner takes the current account state, checks the business rules
//! in a fixed order and returns the [`Posting`] to commit. Planners never
//! mutate their inputs: a rejected operation leaves no trace.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use cardbank_core::{CardNumber, Money, TransactionId};

use crate::account::Account;
use crate::entry::{EntryKind, LedgerEntry};
use crate::error::LedgerError;
use crate::posting::{BalanceChange, Posting};
use crate::receipt::ReceiptDocument;

/// Flat discount on airtime purchases.
pub const RECHARGE_DISCOUNT_PERCENT: u32 = 10;

/// What the sender typed into the transfer form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Must equal the recipient's stored full name.
    pub recipient_name: String,
    pub recipient_card: CardNumber,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transfer {
    pub posting: Posting,
    /// The sender's Debit row; receipts hang off it.
    pub debit_entry: TransactionId,
    pub receipt: ReceiptDocument,
}

/// Plan a transfer from `sender` to the account found under the requested
/// card number (`None` if no such account).
///
/// Checks, in order: positive amount, sufficient balance, recipient exists
/// with the given name, recipient is not the sender.
pub fn plan_transfer(
    sender: &Account,
    recipient: Option<&Account>,
    request: &TransferRequest,
    at: DateTime<Utc>,
) -> Result<Transfer, LedgerError> {
    ensure_positive(request.amount)?;

    if !sender.can_afford(request.amount) {
        return Err(LedgerError::InsufficientBalance {
            available: sender.balance,
            required: request.amount,
        });
    }

    let recipient = match recipient {
        Some(r)
            if r.card_number == request.recipient_card
                && r.full_name == request.recipient_name.trim() =>
        {
            r
        }
        _ => return Err(LedgerError::RecipientMismatch),
    };

    if recipient.id == sender.id {
        return Err(LedgerError::SelfTransfer);
    }

    recipient
        .balance
        .checked_add(request.amount)
        .ok_or(LedgerError::Overflow)?;

    let debit = LedgerEntry {
        id: TransactionId::new(),
        user_id: sender.id,
        counterparty_name: recipient.full_name.clone(),
        counterparty_card: recipient.card_number.clone(),
        amount: request.amount,
        kind: EntryKind::Debit,
        created_at: at,
    };
    let credit = LedgerEntry {
        id: TransactionId::new(),
        user_id: recipient.id,
        counterparty_name: sender.full_name.clone(),
        counterparty_card: sender.card_number.clone(),
        amount: request.amount,
        kind: EntryKind::Credit,
        created_at: at,
    };

    let receipt = ReceiptDocument {
        sender_name: sender.full_name.clone(),
        recipient_name: recipient.full_name.clone(),
        recipient_card: recipient.card_number.clone(),
        amount: request.amount,
    };

    Ok(Transfer {
        debit_entry: debit.id,
        posting: Posting {
            changes: vec![
                BalanceChange {
                    user_id: sender.id,
                    delta: -request.amount,
                },
                BalanceChange {
                    user_id: recipient.id,
                    delta: request.amount,
                },
            ],
            entries: vec![debit, credit],
        },
        receipt,
    })
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Deposit {
    pub posting: Posting,
    pub amount: Money,
}

/// Plan a self-deposit. The card number must be the account's own.
pub fn plan_deposit(
    account: &Account,
    card: &CardNumber,
    amount: Money,
    at: DateTime<Utc>,
) -> Result<Deposit, LedgerError> {
    ensure_positive(amount)?;

    if *card != account.card_number {
        return Err(LedgerError::CardMismatch);
    }

    account.balance.checked_add(amount).ok_or(LedgerError::Overflow)?;

    let entry = LedgerEntry {
        id: TransactionId::new(),
        user_id: account.id,
        counterparty_name: account.full_name.clone(),
        counterparty_card: account.card_number.clone(),
        amount,
        kind: EntryKind::Deposit,
        created_at: at,
    };

    Ok(Deposit {
        amount,
        posting: Posting {
            changes: vec![BalanceChange {
                user_id: account.id,
                delta: amount,
            }],
            entries: vec![entry],
        },
    })
}

/// Price breakdown of an airtime purchase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RechargeQuote {
    /// Face value of the airtime.
    pub requested: Money,
    pub discount: Money,
    /// What the account is actually debited.
    pub charged: Money,
}

impl RechargeQuote {
    pub fn for_amount(requested: Money) -> Self {
        let discount = requested.percentage(RECHARGE_DISCOUNT_PERCENT);
        Self {
            requested,
            discount,
            charged: Money::from_minor(requested.minor() - discount.minor()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recharge {
    pub quote: RechargeQuote,
    pub posting: Posting,
}

/// Plan an airtime purchase of face value `amount`.
pub fn plan_recharge(
    account: &Account,
    amount: Money,
    at: DateTime<Utc>,
) -> Result<Recharge, LedgerError> {
    ensure_positive(amount)?;

    let quote = RechargeQuote::for_amount(amount);
    if !account.can_afford(quote.charged) {
        return Err(LedgerError::InsufficientBalance {
            available: account.balance,
            required: quote.charged,
        });
    }

    let entry = LedgerEntry {
        id: TransactionId::new(),
        user_id: account.id,
        counterparty_name: account.full_name.clone(),
        counterparty_card: account.card_number.clone(),
        amount: -quote.charged,
        kind: EntryKind::AirtimePurchase,
        created_at: at,
    };

    Ok(Recharge {
        quote,
        posting: Posting {
            changes: vec![BalanceChange {
                user_id: account.id,
                delta: -quote.charged,
            }],
            entries: vec![entry],
        },
    })
}

fn ensure_positive(amount: Money) -> Result<(), LedgerError> {
    if amount.is_positive() {
        Ok(())
    } else {
        Err(LedgerError::NonPositiveAmount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cardbank_core::UserId;
    use proptest::prelude::*;

    fn account(name: &str, card: &str, balance: Money) -> Account {
        Account {
            id: UserId::new(),
            full_name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase().replace(' ', ".")),
            card_number: CardNumber::parse(card).unwrap(),
            balance,
            created_at: Utc::now(),
        }
    }

    fn alice(balance: Money) -> Account {
        account("Alice Ade", "1111222233334444", balance)
    }

    fn bob(balance: Money) -> Account {
        account("Bob Bello", "5555666677778888", balance)
    }

    fn request_to(recipient: &Account, amount: Money) -> TransferRequest {
        TransferRequest {
            recipient_name: recipient.full_name.clone(),
            recipient_card: recipient.card_number.clone(),
            amount,
        }
    }

    fn commit(posting: &Posting, accounts: &mut [&mut Account]) {
        for a in accounts.iter_mut() {
            posting.apply_to(a).unwrap();
        }
    }

    #[test]
    fn transfer_moves_money_and_writes_two_rows() {
        let mut a = alice(Money::from_major(50_000));
        let mut b = bob(Money::ZERO);

        let plan = plan_transfer(&a, Some(&b), &request_to(&b, Money::from_major(1_000)), Utc::now())
            .unwrap();
        commit(&plan.posting, &mut [&mut a, &mut b]);

        assert_eq!(a.balance, Money::from_major(49_000));
        assert_eq!(b.balance, Money::from_major(1_000));

        let kinds: Vec<_> = plan.posting.entries.iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![EntryKind::Debit, EntryKind::Credit]);

        let debit = &plan.posting.entries[0];
        assert_eq!(debit.id, plan.debit_entry);
        assert_eq!(debit.user_id, a.id);
        assert_eq!(debit.counterparty_name, "Bob Bello");
        assert_eq!(debit.counterparty_card, b.card_number);

        let credit = &plan.posting.entries[1];
        assert_eq!(credit.user_id, b.id);
        assert_eq!(credit.counterparty_name, "Alice Ade");
        assert_eq!(plan.posting.delta_for(a.id), -Money::from_major(1_000));
        assert_eq!(plan.posting.delta_for(b.id), Money::from_major(1_000));
    }

    #[test]
    fn transfer_checks_balance_before_recipient() {
        let a = alice(Money::from_major(10));
        let err = plan_transfer(&a, None, &request_to(&bob(Money::ZERO), Money::from_major(11)), Utc::now())
            .unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
    }

    #[test]
    fn transfer_rejects_unknown_or_misnamed_recipient() {
        let a = alice(Money::from_major(100));
        let b = bob(Money::ZERO);

        let err = plan_transfer(&a, None, &request_to(&b, Money::from_major(1)), Utc::now()).unwrap_err();
        assert_eq!(err, LedgerError::RecipientMismatch);

        let mut req = request_to(&b, Money::from_major(1));
        req.recipient_name = "Bob".to_string();
        let err = plan_transfer(&a, Some(&b), &req, Utc::now()).unwrap_err();
        assert_eq!(err, LedgerError::RecipientMismatch);
    }

    #[test]
    fn transfer_to_self_is_rejected() {
        let a = alice(Money::from_major(100));
        let err = plan_transfer(&a, Some(&a), &request_to(&a, Money::from_major(1)), Utc::now())
            .unwrap_err();
        assert_eq!(err, LedgerError::SelfTransfer);
    }

    #[test]
    fn zero_and_negative_amounts_are_rejected() {
        let a = alice(Money::from_major(100));
        let b = bob(Money::ZERO);
        for amount in [Money::ZERO, Money::from_major(-5)] {
            assert_eq!(
                plan_transfer(&a, Some(&b), &request_to(&b, amount), Utc::now()).unwrap_err(),
                LedgerError::NonPositiveAmount
            );
            assert_eq!(
                plan_deposit(&a, &a.card_number, amount, Utc::now()).unwrap_err(),
                LedgerError::NonPositiveAmount
            );
            assert_eq!(
                plan_recharge(&a, amount, Utc::now()).unwrap_err(),
                LedgerError::NonPositiveAmount
            );
        }
    }

    #[test]
    fn deposit_requires_own_card() {
        let a = alice(Money::from_major(100));
        let b = bob(Money::ZERO);
        assert_eq!(
            plan_deposit(&a, &b.card_number, Money::from_major(5), Utc::now()).unwrap_err(),
            LedgerError::CardMismatch
        );

        let mut a = a;
        let plan = plan_deposit(&a, &a.card_number.clone(), Money::from_major(5), Utc::now()).unwrap();
        plan.posting.apply_to(&mut a).unwrap();
        assert_eq!(a.balance, Money::from_major(105));
        assert_eq!(plan.posting.entries[0].kind, EntryKind::Deposit);
        assert_eq!(plan.posting.entries[0].amount, Money::from_major(5));
    }

    #[test]
    fn recharge_charges_ninety_percent() {
        let mut a = alice(Money::from_major(1_000));
        let plan = plan_recharge(&a, Money::from_major(100), Utc::now()).unwrap();
        assert_eq!(plan.quote.discount, Money::from_major(10));
        assert_eq!(plan.quote.charged, Money::from_major(90));

        plan.posting.apply_to(&mut a).unwrap();
        assert_eq!(a.balance, Money::from_major(910));

        let entry = &plan.posting.entries[0];
        assert_eq!(entry.kind, EntryKind::AirtimePurchase);
        assert_eq!(entry.amount, Money::from_major(-90));
    }

    #[test]
    fn recharge_affordable_only_after_discount() {
        // 100.00 face value costs 90.00.
        let a = alice(Money::from_major(90));
        assert!(plan_recharge(&a, Money::from_major(100), Utc::now()).is_ok());

        let a = alice(Money::from_minor(8_999));
        assert!(matches!(
            plan_recharge(&a, Money::from_major(100), Utc::now()),
            Err(LedgerError::InsufficientBalance { .. })
        ));
    }

    #[test]
    fn stale_plan_cannot_overdraw() {
        let mut a = alice(Money::from_major(100));
        let b = bob(Money::ZERO);
        let first = plan_transfer(&a, Some(&b), &request_to(&b, Money::from_major(80)), Utc::now()).unwrap();
        let second = plan_transfer(&a, Some(&b), &request_to(&b, Money::from_major(80)), Utc::now()).unwrap();

        first.posting.apply_to(&mut a).unwrap();
        let before = a.clone();
        assert!(matches!(
            second.posting.apply_to(&mut a),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(a, before);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: a transfer either moves exactly `amount` from sender to
        /// recipient, or fails and leaves both balances unchanged.
        #[test]
        fn transfer_conserves_or_changes_nothing(
            sender_balance in 0i64..10_000_000,
            recipient_balance in 0i64..10_000_000,
            amount in -1_000i64..12_000_000,
        ) {
            let mut a = alice(Money::from_minor(sender_balance));
            let mut b = bob(Money::from_minor(recipient_balance));
            let (a0, b0) = (a.balance, b.balance);

            match plan_transfer(&a, Some(&b), &request_to(&b, Money::from_minor(amount)), Utc::now()) {
                Ok(plan) => {
                    commit(&plan.posting, &mut [&mut a, &mut b]);
                    prop_assert_eq!(a.balance.minor(), a0.minor() - amount);
                    prop_assert_eq!(b.balance.minor(), b0.minor() + amount);
                    prop_assert_eq!(plan.posting.entries.len(), 2);
                }
                Err(_) => {
                    prop_assert!(amount <= 0 || amount > sender_balance);
                    prop_assert_eq!(a.balance, a0);
                    prop_assert_eq!(b.balance, b0);
                }
            }
        }

        /// Property: recharge of A debits A - round(A / 10) and records the
        /// negated charge.
        #[test]
        fn recharge_debits_discounted_amount(amount in 1i64..1_000_000_000) {
            let mut a = alice(Money::from_minor(i64::MAX / 2));
            let before = a.balance;
            let plan = plan_recharge(&a, Money::from_minor(amount), Utc::now()).unwrap();
            plan.posting.apply_to(&mut a).unwrap();

            let expected_charge = amount - (amount + 5) / 10;
            prop_assert_eq!(before.minor() - a.balance.minor(), expected_charge);
            prop_assert_eq!(plan.posting.entries[0].amount.minor(), -expected_charge);
            if amount % 10 == 0 {
                prop_assert_eq!(expected_charge * 10, amount * 9);
            }
        }
    }
}
