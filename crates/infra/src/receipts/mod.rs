//! Receipt issuance: render, archive, record metadata, expire.
//!
//! A receipt's public handle is its file name. The file name is only ever
//! resolved through the receipt metadata in the [`BankStore`]; it is never
//! used to build a filesystem path.

pub mod archive;
pub mod renderer;

pub use archive::{ArchiveError, FsReceiptArchive, InMemoryReceiptArchive, ReceiptArchive};
pub use renderer::{HtmlReceiptRenderer, ReceiptRenderer, RenderError, WkhtmltopdfRenderer};

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;
use tracing::{info, instrument, warn};

use cardbank_core::{ReceiptId, TransactionId, UserId};
use cardbank_ledger::{Receipt, ReceiptDocument, ReceiptRenderError};

use crate::store::{BankStore, StoreError};

pub const DEFAULT_RECEIPT_TTL_HOURS: i64 = 24;

#[derive(Debug, Error)]
pub enum ReceiptError {
    #[error(transparent)]
    Template(#[from] ReceiptRenderError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// A receipt ready to be served.
#[derive(Debug, Clone)]
pub struct ReceiptFile {
    pub receipt: Receipt,
    pub bytes: Vec<u8>,
}

#[derive(Clone)]
pub struct ReceiptService {
    store: Arc<dyn BankStore>,
    archive: Arc<dyn ReceiptArchive>,
    renderer: Arc<dyn ReceiptRenderer>,
    ttl: Duration,
}

impl ReceiptService {
    pub fn new(
        store: Arc<dyn BankStore>,
        archive: Arc<dyn ReceiptArchive>,
        renderer: Arc<dyn ReceiptRenderer>,
        ttl: Duration,
    ) -> Self {
        Self {
            store,
            archive,
            renderer,
            ttl,
        }
    }

    /// Render and store a receipt for the transfer whose Debit row is
    /// `transaction_id`. Expired receipts are purged first.
    #[instrument(skip(self, document), fields(owner_id = %owner_id, transaction_id = %transaction_id), err)]
    pub async fn issue(
        &self,
        document: &ReceiptDocument,
        transaction_id: TransactionId,
        owner_id: UserId,
        now: DateTime<Utc>,
    ) -> Result<Receipt, ReceiptError> {
        if let Err(e) = self.purge_expired(now).await {
            warn!(error = %e, "receipt purge failed");
        }

        let html = document.to_html()?;
        let bytes = self.renderer.render(&html).await?;

        let id = ReceiptId::new();
        let extension = self.renderer.extension();
        let receipt = Receipt {
            id,
            transaction_id,
            owner_id,
            file_name: Receipt::file_name_for(id, now, extension),
            storage_key: format!("{}.{}", id.as_uuid().simple(), extension),
            content_type: self.renderer.content_type().to_string(),
            created_at: now,
        };

        self.archive.put(&receipt.storage_key, &bytes).await?;
        if let Err(e) = self.store.insert_receipt(&receipt).await {
            if let Err(cleanup) = self.archive.delete(&receipt.storage_key).await {
                warn!(error = %cleanup, storage_key = %receipt.storage_key, "orphaned receipt file");
            }
            return Err(e.into());
        }

        info!(file_name = %receipt.file_name, bytes = bytes.len(), "receipt issued");
        Ok(receipt)
    }

    /// Fetch a receipt for download. `None` unless it exists, belongs to
    /// `owner_id` and has not expired.
    #[instrument(skip(self), fields(owner_id = %owner_id), err)]
    pub async fn open(
        &self,
        owner_id: UserId,
        file_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<ReceiptFile>, ReceiptError> {
        let receipt = match self.store.find_receipt(file_name).await? {
            Some(r) if r.owner_id == owner_id && !r.is_expired(now, self.ttl) => r,
            _ => return Ok(None),
        };

        match self.archive.get(&receipt.storage_key).await? {
            Some(bytes) => Ok(Some(ReceiptFile { receipt, bytes })),
            None => {
                warn!(file_name = %receipt.file_name, "receipt metadata without file");
                Ok(None)
            }
        }
    }

    /// Same ownership and expiry rules as [`open`](Self::open), without
    /// reading the file.
    pub async fn find(
        &self,
        owner_id: UserId,
        file_name: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Receipt>, ReceiptError> {
        Ok(self
            .store
            .find_receipt(file_name)
            .await?
            .filter(|r| r.owner_id == owner_id && !r.is_expired(now, self.ttl)))
    }

    /// Remove receipts older than the TTL, metadata first. Returns how
    /// many were removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<usize, ReceiptError> {
        let removed = self
            .store
            .remove_receipts_created_before(now - self.ttl)
            .await?;
        for receipt in &removed {
            if let Err(e) = self.archive.delete(&receipt.storage_key).await {
                warn!(error = %e, storage_key = %receipt.storage_key, "failed to delete expired receipt file");
            }
        }
        if !removed.is_empty() {
            info!(count = removed.len(), "purged expired receipts");
        }
        Ok(removed.len())
    }
}
