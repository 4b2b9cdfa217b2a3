//! Transfer receipts: the printable document and the stored record.

use chrono::{DateTime, Duration, Utc};
use minijinja::{Environment, context};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use cardbank_core::{CardNumber, Entity, Money, ReceiptId, TransactionId, UserId};

const RECEIPT_TEMPLATE_NAME: &str = "receipt.html";

const RECEIPT_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
  <head>
    <meta http-equiv="Content-Type" content="text/html; charset=UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Transaction Successful</title>
    <style>
      body { background: #d7d7d7; font-family: Helvetica, Arial, sans-serif; margin: 0; padding: 50px 0; }
      .pod { background: #fff; width: 600px; margin: 0 auto; padding: 50px 36px; }
      h1 { color: #1a1a1a; text-align: center; }
      h2 { color: #464646; font-size: 20px; }
      .details p { margin: 6px 0; }
      .footer { text-align: center; margin-top: 30px; color: #464646; }
    </style>
  </head>
  <body>
    <div class="pod">
      <h1>Payment Sent</h1>
      <h2>Your transaction was successful!</h2>
      <div class="details">
        <p><strong>Payment Details:</strong></p>
        <p>Sender: {{ sender_name }}</p>
        <p>Recipient: {{ recipient_name }}</p>
        <p>Card Number: {{ recipient_card }}</p>
        <p>Amount: &#8358;{{ amount }}</p>
      </div>
      <p class="footer">Thank You for Banking with Us</p>
    </div>
  </body>
</html>
"#;

#[derive(Debug, Error)]
pub enum ReceiptRenderError {
    #[error("receipt template error: {0}")]
    Template(#[from] minijinja::Error),
}

/// Fields printed on a transfer receipt, captured at transfer time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptDocument {
    pub sender_name: String,
    pub recipient_name: String,
    pub recipient_card: CardNumber,
    pub amount: Money,
}

impl ReceiptDocument {
    /// Render the receipt as a standalone HTML page. All fields are escaped.
    pub fn to_html(&self) -> Result<String, ReceiptRenderError> {
        let mut env = Environment::new();
        env.add_template(RECEIPT_TEMPLATE_NAME, RECEIPT_TEMPLATE)?;
        let html = env.get_template(RECEIPT_TEMPLATE_NAME)?.render(context! {
            sender_name => &self.sender_name,
            recipient_name => &self.recipient_name,
            recipient_card => self.recipient_card.as_str(),
            amount => self.amount.to_string(),
        })?;
        Ok(html)
    }
}

/// Metadata of a generated receipt. The bytes live in a receipt archive
/// under `storage_key`; users only ever see `file_name`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: ReceiptId,
    /// The sender's Debit row.
    pub transaction_id: TransactionId,
    pub owner_id: UserId,
    pub file_name: String,
    pub storage_key: String,
    pub content_type: String,
    pub created_at: DateTime<Utc>,
}

impl Entity for Receipt {
    type Id = ReceiptId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl Receipt {
    /// `receipt_<YYYYmmddHHMMSS>_<8 hex>.<ext>`; the hex suffix is the
    /// random tail of the receipt id so two receipts in the same second
    /// get different names.
    pub fn file_name_for(id: ReceiptId, created_at: DateTime<Utc>, extension: &str) -> String {
        let simple = id.as_uuid().simple().to_string();
        let suffix = &simple[simple.len() - 8..];
        format!(
            "receipt_{}_{}.{}",
            created_at.format("%Y%m%d%H%M%S"),
            suffix,
            extension
        )
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.created_at + ttl <= now
    }
}
