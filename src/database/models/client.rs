use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::database::Column;

crate::text_enum! {
    pub enum ClientKind {
        Individual => "individual",
        Company => "company",
    }
}

crate::text_enum! {
    pub enum ClientStatus {
        Lead => "lead",
        Active => "active",
        Inactive => "inactive",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Client {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub kind: ClientKind,
    pub name: String,
    pub document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: ClientStatus,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    pub const COLUMNS: &'static [Column] = &[
        Column::new("id", "uuid"),
        Column::new("kind", "text"),
        Column::new("name", "text"),
        Column::new("document", "text"),
        Column::new("email", "text"),
        Column::new("phone", "text"),
        Column::new("address", "text"),
        Column::new("notes", "text"),
        Column::new("status", "text"),
        Column::new("created_by", "uuid"),
        Column::new("created_at", "timestamptz"),
        Column::new("updated_at", "timestamptz"),
    ];
}
