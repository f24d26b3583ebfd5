//! External invoicing integration.
//!
//! Checkout hands a finished order to an [`InvoicingGateway`] once its
//! transaction has committed. The production gateway is
//! [`HttpInvoicingClient`], which posts to `{base_url}/invoices`:
//!
//! ```json
//! {"Invoice": {"contact_id": null, "contact_name": "...", "contact_email": "...",
//!              "date": "YYYY-MM-DD", "due_date": "YYYY-MM-DD",
//!              "lines": [{"item_id": "...", "quantity": 1, "price": "9.99",
//!                         "description": "...", "unit": "pcs"}],
//!              "notes": "Order #<id> from <store name>"}}
//! ```
//!
//! The response must carry the new invoice's identifier in `id` or
//! `invoice_id`. There are no retries.

mod client;
mod types;

pub use client::{HttpInvoicingClient, REQUEST_TIMEOUT};
pub use types::{Invoice, InvoiceLine, InvoiceRef, InvoiceRequest, LINE_UNIT};

use async_trait::async_trait;
use thiserror::Error;

/// Errors from invoice creation.
#[derive(Debug, Error)]
pub enum InvoiceError {
    /// No API token is configured; nothing was sent.
    #[error("invoicing is not configured")]
    NotConfigured,

    /// Connection, timeout or client construction failure.
    #[error("invoicing request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("invoicing API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The success response was not valid JSON.
    #[error("invalid invoicing response: {0}")]
    Decode(String),

    /// The success response did not contain an invoice identifier.
    #[error("invoicing response has no invoice identifier")]
    MissingIdentifier,
}

/// Something that can create invoices for placed orders.
#[async_trait]
pub trait InvoicingGateway: Send + Sync {
    /// Create one invoice and return its identifier.
    async fn create_invoice(&self, request: &InvoiceRequest) -> Result<InvoiceRef, InvoiceError>;
}
