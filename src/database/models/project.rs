use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Column;

crate::text_enum! {
    pub enum ProjectStatus {
        Open => "open",
        OnHold => "on_hold",
        Closed => "closed",
    }
}

crate::text_enum! {
    /// Shared by projects and tasks
    pub enum Priority {
        Low => "low",
        Medium => "medium",
        High => "high",
        Urgent => "urgent",
    }
}

/// A legal matter handled by the firm
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Project {
    pub id: Uuid,
    pub client_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub case_number: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ProjectStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Project {
    pub const COLUMNS: &'static [Column] = &[
        Column::new("id", "uuid"),
        Column::new("client_id", "uuid"),
        Column::new("title", "text"),
        Column::new("description", "text"),
        Column::new("case_number", "text"),
        Column::new("status", "text"),
        Column::new("priority", "text"),
        Column::new("start_date", "date"),
        Column::new("due_date", "date"),
        Column::new("owner_id", "uuid"),
        Column::new("created_at", "timestamptz"),
        Column::new("updated_at", "timestamptz"),
    ];
}
