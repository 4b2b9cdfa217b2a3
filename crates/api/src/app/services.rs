//! Infrastructure wiring: store, receipts, mailer, banking service.

use std::sync::Arc;

use anyhow::Context;
use chrono::Duration;
use tracing::{info, warn};

use cardbank_auth::PasswordHasher;
use cardbank_infra::cards::RandomCardIssuer;
use cardbank_infra::mailer::{LogMailer, Mailer, SmtpMailer};
use cardbank_infra::receipts::{
    FsReceiptArchive, HtmlReceiptRenderer, InMemoryReceiptArchive, ReceiptArchive,
    ReceiptRenderer, ReceiptService, WkhtmltopdfRenderer,
};
use cardbank_infra::store::{BankStore, InMemoryBankStore, PostgresBankStore};
use cardbank_infra::{AppConfig, BankingService, RendererKind};

const MAX_DB_CONNECTIONS: u32 = 10;

pub async fn build_banking(config: &AppConfig) -> anyhow::Result<BankingService> {
    let store: Arc<dyn BankStore> = match &config.database_url {
        Some(url) => {
            let store = PostgresBankStore::connect(url, MAX_DB_CONNECTIONS)
                .await
                .context("failed to connect to postgres")?;
            info!("using postgres bank store");
            Arc::new(store)
        }
        None => {
            warn!("DATABASE_URL not set; using in-memory bank store (data is lost on restart)");
            Arc::new(InMemoryBankStore::new())
        }
    };

    let archive: Arc<dyn ReceiptArchive> = match &config.receipts.dir {
        Some(dir) => Arc::new(
            FsReceiptArchive::open(dir)
                .await
                .with_context(|| format!("failed to open receipt dir {}", dir.display()))?,
        ),
        None => Arc::new(InMemoryReceiptArchive::new()),
    };

    let renderer: Arc<dyn ReceiptRenderer> = match config.receipts.renderer {
        RendererKind::Wkhtmltopdf => Arc::new(WkhtmltopdfRenderer::new(
            config.receipts.wkhtmltopdf_path.clone(),
        )),
        RendererKind::Html => Arc::new(HtmlReceiptRenderer),
    };

    let receipts = ReceiptService::new(
        store.clone(),
        archive,
        renderer,
        Duration::hours(config.receipts.ttl_hours),
    );

    let mailer: Arc<dyn Mailer> = match (&config.mail.username, &config.mail.password) {
        (Some(username), Some(password)) => Arc::new(
            SmtpMailer::new(&config.mail.server, config.mail.port, username, password)
                .context("failed to configure smtp")?,
        ),
        _ => {
            warn!("MAIL_USERNAME/MAIL_PASSWORD not set; contact form messages are only logged");
            Arc::new(LogMailer::new())
        }
    };

    let hasher = config
        .password_hash_cost
        .map(PasswordHasher::new)
        .unwrap_or_default();

    Ok(
        BankingService::new(store, receipts, mailer, config.mail.contact_recipient.clone())
            .with_password_hasher(hasher)
            .with_card_issuer(Arc::new(RandomCardIssuer), config.card_issuance_attempts)
            .with_opening_balance(config.opening_balance),
    )
}
