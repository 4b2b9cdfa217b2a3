//! Infrastructure layer: storage, card issuance, receipts, mail, config
//! and the banking service that ties them together.

pub mod banking;
pub mod cards;
pub mod config;
pub mod mailer;
pub mod receipts;
pub mod store;

pub use banking::{
    BankingError, BankingService, DepositForm, DepositOutcome, RechargeForm, RechargeOutcome,
    TransferForm, TransferOutcome,
};
pub use config::{AppConfig, ConfigError, RendererKind};
