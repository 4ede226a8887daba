use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Column;

use super::project::Priority;

crate::text_enum! {
    pub enum TaskStatus {
        Todo => "todo",
        InProgress => "in_progress",
        Review => "review",
        Done => "done",
    }
}

impl TaskStatus {
    pub fn is_open(&self) -> bool {
        !matches!(self, TaskStatus::Done)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: Uuid,
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: TaskStatus,
    #[sqlx(try_from = "String")]
    pub priority: Priority,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub const COLUMNS: &'static [Column] = &[
        Column::new("id", "uuid"),
        Column::new("project_id", "uuid"),
        Column::new("title", "text"),
        Column::new("description", "text"),
        Column::new("status", "text"),
        Column::new("priority", "text"),
        Column::new("assignee_id", "uuid"),
        Column::new("due_date", "date"),
        Column::new("completed_at", "timestamptz"),
        Column::new("created_at", "timestamptz"),
        Column::new("updated_at", "timestamptz"),
    ];

    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        self.status.is_open() && self.due_date.map_or(false, |d| d < today)
    }
}
