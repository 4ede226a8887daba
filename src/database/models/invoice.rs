use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Column;

crate::text_enum! {
    pub enum InvoiceStatus {
        Draft => "draft",
        Sent => "sent",
        Paid => "paid",
        Overdue => "overdue",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Invoice {
    pub id: Uuid,
    pub number: String,
    pub client_id: Uuid,
    pub issue_date: NaiveDate,
    pub due_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: InvoiceStatus,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
    pub notes: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// SQL form of [`Invoice::effective_status`]
    pub const EFFECTIVE_STATUS: &'static str =
        "CASE WHEN status = 'sent' AND due_date < CURRENT_DATE THEN 'overdue' ELSE status END";

    pub const COLUMNS: &'static [Column] = &[
        Column::new("id", "uuid"),
        Column::new("number", "text"),
        Column::new("client_id", "uuid"),
        Column::new("issue_date", "date"),
        Column::new("due_date", "date"),
        Column::new("status", "text"),
        Column::new("subtotal", "numeric"),
        Column::new("discount", "numeric"),
        Column::new("total", "numeric"),
        Column::new("notes", "text"),
        Column::new("paid_at", "timestamptz"),
        Column::new("created_by", "uuid"),
        Column::new("created_at", "timestamptz"),
        Column::new("updated_at", "timestamptz"),
    ];

    /// Columns for reads, with `status` reported as the effective status
    pub const READ_COLUMNS: &'static [Column] = &[
        Column::new("id", "uuid"),
        Column::new("number", "text"),
        Column::new("client_id", "uuid"),
        Column::new("issue_date", "date"),
        Column::new("due_date", "date"),
        Column::computed("status", "text", Invoice::EFFECTIVE_STATUS),
        Column::new("subtotal", "numeric"),
        Column::new("discount", "numeric"),
        Column::new("total", "numeric"),
        Column::new("notes", "text"),
        Column::new("paid_at", "timestamptz"),
        Column::new("created_by", "uuid"),
        Column::new("created_at", "timestamptz"),
        Column::new("updated_at", "timestamptz"),
    ];

    /// Status as seen by readers: a sent invoice past its due date reads as overdue
    pub fn effective_status(&self, today: NaiveDate) -> InvoiceStatus {
        if self.status == InvoiceStatus::Sent && self.due_date < today {
            InvoiceStatus::Overdue
        } else {
            self.status
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub position: i32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

/// Invoice with its line items, as returned by the API
#[derive(Debug, Clone, Serialize)]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}
