use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Column;

crate::text_enum! {
    pub enum EntryKind {
        Income => "income",
        Expense => "expense",
    }
}

crate::text_enum! {
    pub enum EntryStatus {
        Pending => "pending",
        Paid => "paid",
        Cancelled => "cancelled",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CashFlowEntry {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: EntryKind,
    pub category: String,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub paid_at: Option<DateTime<Utc>>,
    #[sqlx(try_from = "String")]
    pub status: EntryStatus,
    pub client_id: Option<Uuid>,
    pub invoice_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CashFlowEntry {
    pub const COLUMNS: &'static [Column] = &[
        Column::new("id", "uuid"),
        Column::new("kind", "text"),
        Column::new("category", "text"),
        Column::new("description", "text"),
        Column::new("amount", "numeric"),
        Column::new("due_date", "date"),
        Column::new("paid_at", "timestamptz"),
        Column::new("status", "text"),
        Column::new("client_id", "uuid"),
        Column::new("invoice_id", "uuid"),
        Column::new("created_by", "uuid"),
        Column::new("created_at", "timestamptz"),
        Column::new("updated_at", "timestamptz"),
    ];
}
