use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Column;

crate::text_enum! {
    pub enum PublicationStatus {
        Unread => "unread",
        Read => "read",
        Archived => "archived",
    }
}

/// A legal notice delivered to one user's inbox
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Publication {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source: String,
    pub process_number: Option<String>,
    pub title: String,
    pub content: String,
    pub published_at: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: PublicationStatus,
    pub read_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Publication {
    pub const COLUMNS: &'static [Column] = &[
        Column::new("id", "uuid"),
        Column::new("user_id", "uuid"),
        Column::new("source", "text"),
        Column::new("process_number", "text"),
        Column::new("title", "text"),
        Column::new("content", "text"),
        Column::new("published_at", "date"),
        Column::new("status", "text"),
        Column::new("read_at", "timestamptz"),
        Column::new("created_at", "timestamptz"),
    ];
}
