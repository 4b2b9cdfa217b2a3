//! Banking use cases: registration, login, transfers, deposits, airtime
//! recharge, history, receipts and the contact form.
//!
//! Handlers pass raw form strings; parsing happens here so every operation
//! reports failures through [`BankingError`] with one user-facing message.

use std::sync::Arc;

use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use cardbank_auth::{
    FlashLevel, PasswordError, PasswordHasher, Registration, RegistrationError, normalize_email,
    validate_registration,
};
use cardbank_core::{CardNumber, Money, UserId};
use cardbank_ledger::{
    Account, DEFAULT_OPENING_BALANCE, LedgerEntry, LedgerError, Receipt, RechargeQuote, Transfer,
    TransferRequest, plan_deposit, plan_recharge, plan_transfer,
};

use crate::cards::{
    CardIssuanceError, CardIssuer, DEFAULT_CARD_ISSUANCE_ATTEMPTS, RandomCardIssuer,
    issue_with_retry,
};
use crate::mailer::{ContactMessage, MailError, Mailer, OutgoingEmail};
use crate::receipts::{ReceiptError, ReceiptFile, ReceiptService};
use crate::store::{BankStore, StoreError, UniqueField, UserRecord};

/// Transfer form as submitted.
#[derive(Debug, Clone, Deserialize)]
pub struct TransferForm {
    #[serde(default)]
    pub card_name: String,
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositForm {
    #[serde(default)]
    pub card_number: String,
    #[serde(default)]
    pub amount: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RechargeForm {
    #[serde(default)]
    pub amount: String,
    /// Shown on the confirmation only.
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Error)]
pub enum BankingError {
    #[error(transparent)]
    Registration(#[from] RegistrationError),

    #[error("email already registered")]
    EmailTaken,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("no authenticated user")]
    NotAuthenticated,

    #[error("malformed amount")]
    InvalidAmount,

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error(transparent)]
    CardIssuance(#[from] CardIssuanceError),

    #[error(transparent)]
    Password(#[from] PasswordError),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error(transparent)]
    Receipt(#[from] ReceiptError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("background task failed: {0}")]
    Task(String),
}

impl BankingError {
    /// Message shown to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            BankingError::Registration(RegistrationError::PasswordMismatch) => {
                "Passwords do not match"
            }
            BankingError::Registration(RegistrationError::PasswordTooShort) => {
                "Password should be at least 6 characters"
            }
            BankingError::Registration(RegistrationError::MissingName) => {
                "Please enter your full name"
            }
            BankingError::Registration(RegistrationError::InvalidEmail) => {
                "Please enter a valid email address"
            }
            BankingError::EmailTaken => "Email already exists. Please log in.",
            BankingError::InvalidCredentials => "Invalid email or password. Please try again.",
            BankingError::NotAuthenticated => "You need to log in first.",
            BankingError::InvalidAmount
            | BankingError::Ledger(LedgerError::NonPositiveAmount)
            | BankingError::Ledger(LedgerError::Overflow) => "Please enter a valid amount.",
            BankingError::Ledger(LedgerError::InsufficientBalance { .. }) => {
                "Insufficient balance."
            }
            BankingError::Ledger(LedgerError::RecipientMismatch) => {
                "Invalid recipient card name or number."
            }
            BankingError::Ledger(LedgerError::SelfTransfer) => "Cannot send funds to yourself.",
            BankingError::Ledger(LedgerError::CardMismatch) => "Invalid card number.",
            BankingError::Mail(_) => "Your message could not be sent. Please try again later.",
            BankingError::CardIssuance(_)
            | BankingError::Password(_)
            | BankingError::Receipt(_)
            | BankingError::Store(_)
            | BankingError::Task(_) => "Something went wrong. Please try again.",
        }
    }

    pub fn flash_level(&self) -> FlashLevel {
        match self {
            BankingError::Registration(RegistrationError::PasswordMismatch) => FlashLevel::Error,
            _ => FlashLevel::Danger,
        }
    }

    /// Failures of our own infrastructure rather than of the user's input.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            BankingError::CardIssuance(_)
                | BankingError::Password(_)
                | BankingError::Mail(_)
                | BankingError::Receipt(_)
                | BankingError::Store(_)
                | BankingError::Task(_)
        )
    }
}

/// A committed transfer. `receipt` is `None` if the transfer went through
/// but the receipt could not be produced.
#[derive(Debug, Clone)]
pub struct TransferOutcome {
    pub transfer: Transfer,
    pub receipt: Option<Receipt>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositOutcome {
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RechargeOutcome {
    pub quote: RechargeQuote,
    pub phone_number: Option<String>,
}

#[derive(Clone)]
pub struct BankingService {
    store: Arc<dyn BankStore>,
    receipts: ReceiptService,
    mailer: Arc<dyn Mailer>,
    hasher: PasswordHasher,
    cards: Arc<dyn CardIssuer>,
    card_attempts: u32,
    opening_balance: Money,
    contact_recipient: String,
}

impl BankingService {
    pub fn new(
        store: Arc<dyn BankStore>,
        receipts: ReceiptService,
        mailer: Arc<dyn Mailer>,
        contact_recipient: impl Into<String>,
    ) -> Self {
        Self {
            store,
            receipts,
            mailer,
            hasher: PasswordHasher::default(),
            cards: Arc::new(RandomCardIssuer),
            card_attempts: DEFAULT_CARD_ISSUANCE_ATTEMPTS,
            opening_balance: DEFAULT_OPENING_BALANCE,
            contact_recipient: contact_recipient.into(),
        }
    }

    pub fn with_password_hasher(mut self, hasher: PasswordHasher) -> Self {
        self.hasher = hasher;
        self
    }

    pub fn with_card_issuer(mut self, cards: Arc<dyn CardIssuer>, attempts: u32) -> Self {
        self.cards = cards;
        self.card_attempts = attempts;
        self
    }

    pub fn with_opening_balance(mut self, balance: Money) -> Self {
        self.opening_balance = balance;
        self
    }

    pub fn store(&self) -> &Arc<dyn BankStore> {
        &self.store
    }

    /// Create an account and return it. The caller establishes the session.
    #[instrument(skip(self, form), err)]
    pub async fn register(&self, form: &Registration) -> Result<Account, BankingError> {
        validate_registration(form)?;

        let email = normalize_email(&form.email);
        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(BankingError::EmailTaken);
        }

        let hasher = self.hasher;
        let password = form.password.clone();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
            .await
            .map_err(|e| BankingError::Task(e.to_string()))??;

        let id = UserId::new();
        let full_name = form.full_name.trim().to_string();
        let created_at = Utc::now();
        let opening_balance = self.opening_balance;

        let card_number = issue_with_retry(self.cards.as_ref(), self.card_attempts, |card| {
            let record = UserRecord {
                account: Account {
                    id,
                    full_name: full_name.clone(),
                    email: email.clone(),
                    card_number: card,
                    balance: opening_balance,
                    created_at,
                },
                password_hash: password_hash.clone(),
            };
            let store = self.store.clone();
            async move { store.insert_user(record).await }
        })
        .await
        .map_err(|e| match e {
            CardIssuanceError::Store(StoreError::Duplicate(UniqueField::Email)) => {
                BankingError::EmailTaken
            }
            other => BankingError::CardIssuance(other),
        })?;

        info!(user_id = %id, "user registered");
        Ok(Account {
            id,
            full_name,
            email,
            card_number,
            balance: opening_balance,
            created_at,
        })
    }

    /// Check credentials. Unknown email and wrong password are
    /// indistinguishable to the caller.
    #[instrument(skip(self, email, password), err)]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, BankingError> {
        let Some(user) = self.store.find_user_by_email(&normalize_email(email)).await? else {
            return Err(BankingError::InvalidCredentials);
        };

        let hasher = self.hasher;
        let password = password.to_string();
        let stored = user.password_hash.clone();
        let ok = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored))
            .await
            .map_err(|e| BankingError::Task(e.to_string()))?;

        if ok {
            info!(user_id = %user.account.id, "login succeeded");
            Ok(user.account)
        } else {
            Err(BankingError::InvalidCredentials)
        }
    }

    /// The session user's account, or `NotAuthenticated` if it no longer
    /// exists.
    pub async fn account(&self, user_id: UserId) -> Result<Account, BankingError> {
        self.store
            .find_account(user_id)
            .await?
            .ok_or(BankingError::NotAuthenticated)
    }

    #[instrument(skip(self, form), fields(user_id = %user_id), err)]
    pub async fn transfer(
        &self,
        user_id: UserId,
        form: &TransferForm,
    ) -> Result<TransferOutcome, BankingError> {
        let sender = self.account(user_id).await?;
        let amount = parse_amount(&form.amount)?;

        let card = match CardNumber::parse(&form.card_number) {
            Ok(card) => card,
            Err(_) => {
                // Same precedence as a well-formed but unknown card.
                if !amount.is_positive() {
                    return Err(LedgerError::NonPositiveAmount.into());
                }
                if !sender.can_afford(amount) {
                    return Err(LedgerError::InsufficientBalance {
                        available: sender.balance,
                        required: amount,
                    }
                    .into());
                }
                return Err(LedgerError::RecipientMismatch.into());
            }
        };

        let recipient = self.store.find_account_by_card(&card).await?;
        let request = TransferRequest {
            recipient_name: form.card_name.clone(),
            recipient_card: card,
            amount,
        };
        let now = Utc::now();
        let transfer = plan_transfer(&sender, recipient.as_ref(), &request, now)?;

        self.commit(&sender, &transfer.posting).await?;
        info!(amount = %amount, "transfer committed");

        let receipt = match self
            .receipts
            .issue(&transfer.receipt, transfer.debit_entry, sender.id, now)
            .await
        {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                error!(error = %e, "receipt generation failed after transfer");
                None
            }
        };

        Ok(TransferOutcome { transfer, receipt })
    }

    #[instrument(skip(self, form), fields(user_id = %user_id), err)]
    pub async fn deposit(
        &self,
        user_id: UserId,
        form: &DepositForm,
    ) -> Result<DepositOutcome, BankingError> {
        let account = self.account(user_id).await?;
        let amount = parse_amount(&form.amount)?;
        let card = CardNumber::parse(&form.card_number).map_err(|_| {
            if amount.is_positive() {
                BankingError::Ledger(LedgerError::CardMismatch)
            } else {
                BankingError::Ledger(LedgerError::NonPositiveAmount)
            }
        })?;

        let deposit = plan_deposit(&account, &card, amount, Utc::now())?;
        self.commit(&account, &deposit.posting).await?;
        info!(amount = %amount, "deposit committed");
        Ok(DepositOutcome { amount })
    }

    #[instrument(skip(self, form), fields(user_id = %user_id), err)]
    pub async fn recharge(
        &self,
        user_id: UserId,
        form: &RechargeForm,
    ) -> Result<RechargeOutcome, BankingError> {
        let account = self.account(user_id).await?;
        let amount = parse_amount(&form.amount)?;

        let recharge = plan_recharge(&account, amount, Utc::now())?;
        self.commit(&account, &recharge.posting).await?;
        info!(charged = %recharge.quote.charged, "airtime purchased");

        Ok(RechargeOutcome {
            quote: recharge.quote,
            phone_number: form
                .phone_number
                .as_deref()
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string),
        })
    }

    pub async fn history(&self, user_id: UserId) -> Result<Vec<LedgerEntry>, BankingError> {
        Ok(self.store.list_entries(user_id).await?)
    }

    pub async fn receipt_file(
        &self,
        user_id: UserId,
        file_name: &str,
    ) -> Result<Option<ReceiptFile>, BankingError> {
        Ok(self.receipts.open(user_id, file_name, Utc::now()).await?)
    }

    pub async fn find_receipt(
        &self,
        user_id: UserId,
        file_name: &str,
    ) -> Result<Option<Receipt>, BankingError> {
        Ok(self.receipts.find(user_id, file_name, Utc::now()).await?)
    }

    #[instrument(skip(self, message), err)]
    pub async fn send_contact_message(&self, message: &ContactMessage) -> Result<(), BankingError> {
        let email = OutgoingEmail::contact_form(&self.contact_recipient, message);
        self.mailer.send(email).await?;
        Ok(())
    }

    /// Commit a posting planned against `planned_for`. A guard failure
    /// means a concurrent request spent the money first.
    async fn commit(
        &self,
        planned_for: &Account,
        posting: &cardbank_ledger::Posting,
    ) -> Result<(), BankingError> {
        match self.store.commit_posting(posting).await {
            Ok(()) => Ok(()),
            Err(StoreError::InsufficientFunds(id)) => {
                warn!(user_id = %id, "balance changed concurrently; posting rejected");
                Err(LedgerError::InsufficientBalance {
                    available: planned_for.balance,
                    required: -posting.delta_for(id),
                }
                .into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_amount(raw: &str) -> Result<Money, BankingError> {
    Money::parse(raw).map_err(|_| BankingError::InvalidAmount)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cards::ScriptedCardIssuer;
    use crate::mailer::LogMailer;
    use crate::receipts::{HtmlReceiptRenderer, InMemoryReceiptArchive};
    use crate::store::InMemoryBankStore;
    use cardbank_auth::MIN_COST;
    use cardbank_ledger::EntryKind;
    use chrono::Duration;

    struct Harness {
        service: BankingService,
        store: Arc<InMemoryBankStore>,
        mailer: Arc<LogMailer>,
    }

    fn harness() -> Harness {
        let store = Arc::new(InMemoryBankStore::new());
        let mailer = Arc::new(LogMailer::new());
        let receipts = ReceiptService::new(
            store.clone(),
            Arc::new(InMemoryReceiptArchive::new()),
            Arc::new(HtmlReceiptRenderer),
            Duration::hours(24),
        );
        let service = BankingService::new(store.clone(), receipts, mailer.clone(), "desk@example.com")
            .with_password_hasher(PasswordHasher::new(MIN_COST));
        Harness {
            service,
            store,
            mailer,
        }
    }

    fn registration(name: &str, email: &str) -> Registration {
        Registration {
            full_name: name.to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            confirm_password: "secret1".to_string(),
        }
    }

    fn transfer_to(recipient: &Account, amount: &str) -> TransferForm {
        TransferForm {
            card_name: recipient.full_name.clone(),
            card_number: recipient.card_number.to_string(),
            amount: amount.to_string(),
        }
    }

    #[tokio::test]
    async fn register_opens_account_with_default_balance() {
        let h = harness();
        let account = h
            .service
            .register(&registration("Alice Ade", " Alice@Example.com "))
            .await
            .unwrap();
        assert_eq!(account.balance, Money::from_major(50_000));
        assert_eq!(account.email, "alice@example.com");

        let logged_in = h
            .service
            .authenticate("alice@example.com", "secret1")
            .await
            .unwrap();
        assert_eq!(logged_in.id, account.id);
    }

    #[tokio::test]
    async fn invalid_registrations_create_nobody() {
        let h = harness();
        let mut short = registration("Alice", "a@x.com");
        short.password = "abc".into();
        short.confirm_password = "abc".into();
        let mut mismatch = registration("Alice", "a@x.com");
        mismatch.confirm_password = "secret2".into();

        let err = h.service.register(&short).await.unwrap_err();
        assert_eq!(err.user_message(), "Password should be at least 6 characters");
        let err = h.service.register(&mismatch).await.unwrap_err();
        assert_eq!(err.user_message(), "Passwords do not match");
        assert_eq!(err.flash_level(), FlashLevel::Error);

        assert!(h.store.find_user_by_email("a@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let h = harness();
        h.service.register(&registration("A", "a@x.com")).await.unwrap();
        let err = h
            .service
            .register(&registration("B", "A@X.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, BankingError::EmailTaken));
    }

    #[tokio::test]
    async fn card_collisions_retry_then_exhaust() {
        let h = harness();
        let card = CardNumber::parse("4000000000000001").unwrap();
        let service = h
            .service
            .clone()
            .with_card_issuer(Arc::new(ScriptedCardIssuer::new(vec![card.clone()])), 3);

        let first = service.register(&registration("A", "a@x.com")).await.unwrap();
        assert_eq!(first.card_number, card);

        let err = service
            .register(&registration("B", "b@x.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            BankingError::CardIssuance(CardIssuanceError::Exhausted { attempts: 3 })
        ));
        assert!(h.store.find_user_by_email("b@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_email_look_the_same() {
        let h = harness();
        h.service.register(&registration("A", "a@x.com")).await.unwrap();

        let wrong = h.service.authenticate("a@x.com", "nope!!").await.unwrap_err();
        let unknown = h.service.authenticate("z@x.com", "secret1").await.unwrap_err();
        assert_eq!(wrong.user_message(), unknown.user_message());
        assert_eq!(wrong.user_message(), "Invalid email or password. Please try again.");
    }

    #[tokio::test]
    async fn transfer_moves_money_and_issues_receipt() {
        let h = harness();
        let a = h.service.register(&registration("Alice Ade", "a@x.com")).await.unwrap();
        let b = h
            .service
            .clone()
            .with_opening_balance(Money::ZERO)
            .register(&registration("Bob Bello", "b@x.com"))
            .await
            .unwrap();

        let outcome = h.service.transfer(a.id, &transfer_to(&b, "1000.00")).await.unwrap();

        assert_eq!(h.service.account(a.id).await.unwrap().balance, Money::from_major(49_000));
        assert_eq!(h.service.account(b.id).await.unwrap().balance, Money::from_major(1_000));

        let a_rows = h.service.history(a.id).await.unwrap();
        let b_rows = h.service.history(b.id).await.unwrap();
        assert_eq!(a_rows.len(), 1);
        assert_eq!(a_rows[0].kind, EntryKind::Debit);
        assert_eq!(b_rows[0].kind, EntryKind::Credit);
        assert_eq!(b_rows[0].counterparty_name, "Alice Ade");

        let receipt = outcome.receipt.unwrap();
        assert_eq!(receipt.transaction_id, a_rows[0].id);
        assert!(h.service.receipt_file(a.id, &receipt.file_name).await.unwrap().is_some());
        assert!(h.service.receipt_file(b.id, &receipt.file_name).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn rejected_transfers_change_nothing() {
        let h = harness();
        let a = h.service.register(&registration("Alice Ade", "a@x.com")).await.unwrap();
        let b = h.service.register(&registration("Bob Bello", "b@x.com")).await.unwrap();

        let cases = [
            (transfer_to(&b, "50000.01"), "Insufficient balance."),
            (transfer_to(&a, "10"), "Cannot send funds to yourself."),
            (
                TransferForm { card_name: "Bob".into(), ..transfer_to(&b, "10") },
                "Invalid recipient card name or number.",
            ),
            (
                TransferForm { card_number: "12ab".into(), ..transfer_to(&b, "10") },
                "Invalid recipient card name or number.",
            ),
            (
                TransferForm { card_number: "12ab".into(), ..transfer_to(&b, "90000") },
                "Insufficient balance.",
            ),
            (transfer_to(&b, "0"), "Please enter a valid amount."),
            (transfer_to(&b, "ten"), "Please enter a valid amount."),
        ];
        for (form, message) in cases {
            let err = h.service.transfer(a.id, &form).await.unwrap_err();
            assert_eq!(err.user_message(), message, "form {form:?}");
        }

        assert_eq!(h.service.account(a.id).await.unwrap().balance, Money::from_major(50_000));
        assert_eq!(h.service.account(b.id).await.unwrap().balance, Money::from_major(50_000));
        assert!(h.service.history(a.id).await.unwrap().is_empty());
        assert!(h.service.history(b.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn deposit_requires_own_card() {
        let h = harness();
        let a = h.service.register(&registration("Alice Ade", "a@x.com")).await.unwrap();
        let b = h.service.register(&registration("Bob Bello", "b@x.com")).await.unwrap();

        let err = h
            .service
            .deposit(a.id, &DepositForm {
                card_number: b.card_number.to_string(),
                amount: "100".into(),
            })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "Invalid card number.");
        assert_eq!(h.service.account(a.id).await.unwrap().balance, Money::from_major(50_000));

        let outcome = h
            .service
            .deposit(a.id, &DepositForm {
                card_number: a.card_number.hyphenated(),
                amount: "100.5".into(),
            })
            .await
            .unwrap();
        assert_eq!(outcome.amount, Money::from_minor(10_050));
        assert_eq!(
            h.service.account(a.id).await.unwrap().balance,
            Money::from_minor(5_010_050)
        );
        assert_eq!(h.service.history(a.id).await.unwrap()[0].kind, EntryKind::Deposit);
    }

    #[tokio::test]
    async fn recharge_debits_discounted_amount() {
        let h = harness();
        let a = h.service.register(&registration("Alice Ade", "a@x.com")).await.unwrap();

        let outcome = h
            .service
            .recharge(a.id, &RechargeForm {
                amount: "1000".into(),
                phone_number: Some(" 08030000000 ".into()),
            })
            .await
            .unwrap();
        assert_eq!(outcome.quote.discount, Money::from_major(100));
        assert_eq!(outcome.quote.charged, Money::from_major(900));
        assert_eq!(outcome.phone_number.as_deref(), Some("08030000000"));

        assert_eq!(h.service.account(a.id).await.unwrap().balance, Money::from_major(49_100));
        let rows = h.service.history(a.id).await.unwrap();
        assert_eq!(rows[0].amount, Money::from_major(-900));
        assert_eq!(rows[0].kind, EntryKind::AirtimePurchase);
    }

    #[tokio::test]
    async fn unknown_session_user_is_not_authenticated() {
        let h = harness();
        let err = h
            .service
            .recharge(UserId::new(), &RechargeForm { amount: "1".into(), phone_number: None })
            .await
            .unwrap_err();
        assert_eq!(err.user_message(), "You need to log in first.");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_transfers_conserve_total() {
        const TASKS: usize = 20;

        let h = harness();
        let service = h.service.clone().with_opening_balance(Money::from_major(100));
        let a = service.register(&registration("Alice Ade", "a@x.com")).await.unwrap();
        let b = service.register(&registration("Bob Bello", "b@x.com")).await.unwrap();
        let total_before = h.store.total_balance().unwrap();

        // 20 transfers of 30.00 against a 100.00 balance: exactly three fit.
        let barrier = Arc::new(tokio::sync::Barrier::new(TASKS));
        let mut tasks = Vec::new();
        for _ in 0..TASKS {
            let service = service.clone();
            let barrier = barrier.clone();
            let form = transfer_to(&b, "30");
            let sender = a.id;
            tasks.push(tokio::spawn(async move {
                barrier.wait().await;
                service.transfer(sender, &form).await
            }));
        }

        let mut succeeded = 0;
        let mut overdrawn = 0;
        for task in tasks {
            match task.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(BankingError::Ledger(LedgerError::InsufficientBalance { .. })) => overdrawn += 1,
                Err(other) => panic!("unexpected transfer error: {other}"),
            }
        }

        assert_eq!(succeeded, 3);
        assert_eq!(overdrawn, TASKS - 3);
        assert_eq!(h.store.total_balance().unwrap(), total_before);

        let a_now = service.account(a.id).await.unwrap().balance;
        let b_now = service.account(b.id).await.unwrap().balance;
        assert_eq!(a_now, Money::from_major(10));
        assert_eq!(b_now, Money::from_major(190));
        assert!(!a_now.is_negative() && !b_now.is_negative());
        assert_eq!(service.history(a.id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn contact_message_goes_to_configured_recipient() {
        let h = harness();
        h.service
            .send_contact_message(&ContactMessage {
                name: "Ada".into(),
                email: "ada@example.com".into(),
                subject: "Card".into(),
                message: "Hello".into(),
            })
            .await
            .unwrap();
        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "desk@example.com");
        assert!(sent[0].body.contains("Subject: Card"));
    }
}
