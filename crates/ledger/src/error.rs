use thiserror::Error;

use cardbank_core::Money;

/// Business-rule failures. Any of these means nothing was posted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("amount must be positive")]
    NonPositiveAmount,

    #[error("insufficient balance: available {available}, required {required}")]
    InsufficientBalance { available: Money, required: Money },

    #[error("recipient not found or name does not match")]
    RecipientMismatch,

    #[error("cannot transfer to own account")]
    SelfTransfer,

    #[error("card number does not belong to this account")]
    CardMismatch,

    #[error("balance out of range")]
    Overflow,
}
