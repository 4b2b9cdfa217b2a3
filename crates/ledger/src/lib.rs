//! Account ledger: balances, append-only entries and the operations that
//! move money between them.
//!
//! Pure domain logic only: no IO, no HTTP, no persistence concerns. Each
//! operation validates against the current account state and returns a
//! [`Posting`] that storage must commit atomically.

pub mod account;
pub mod entry;
pub mod error;
pub mod operations;
pub mod posting;
pub mod receipt;

pub use account::{Account, DEFAULT_OPENING_BALANCE};
pub use entry::{EntryKind, LedgerEntry};
pub use error::LedgerError;
pub use operations::{
    Deposit, RECHARGE_DISCOUNT_PERCENT, Recharge, RechargeQuote, Transfer, TransferRequest,
    plan_deposit, plan_recharge, plan_transfer,
};
pub use posting::{BalanceChange, Posting};
pub use receipt::{Receipt, ReceiptDocument, ReceiptRenderError};
