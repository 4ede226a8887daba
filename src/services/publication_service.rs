//! Per-user publication inbox.
//!
//! Every statement here binds the owning user's id next to the publication id, so a
//! publication of another user is indistinguishable from one that does not exist.

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{like_pattern, tenant_sql, user_service, validation};
use crate::database::models::publication::{Publication, PublicationStatus};
use crate::database::TenantSchema;
use crate::error::ApiError;
use crate::types::Page;

const LIST: &str = r#"
    SELECT {columns} FROM ${schema}.publications
    WHERE user_id = $1
      AND (($2::text IS NULL AND status <> 'archived') OR status = $2)
      AND ($3::text IS NULL OR title ILIKE $3 OR content ILIKE $3 OR process_number ILIKE $3)
    ORDER BY published_at DESC, created_at DESC
    LIMIT $4 OFFSET $5
"#;
const GET: &str = "SELECT {columns} FROM ${schema}.publications WHERE user_id = $1 AND id = $2";
const UNREAD_COUNT: &str = "SELECT COUNT(*) FROM ${schema}.publications WHERE user_id = $1 AND status = 'unread'";
const MARK_READ: &str = r#"
    UPDATE ${schema}.publications SET status = 'read', read_at = COALESCE(read_at, NOW())
    WHERE user_id = $1 AND id = $2
    RETURNING {columns}
"#;
const MARK_UNREAD: &str = r#"
    UPDATE ${schema}.publications SET status = 'unread', read_at = NULL
    WHERE user_id = $1 AND id = $2
    RETURNING {columns}
"#;
const ARCHIVE: &str = r#"
    UPDATE ${schema}.publications SET status = 'archived', read_at = COALESCE(read_at, NOW())
    WHERE user_id = $1 AND id = $2
    RETURNING {columns}
"#;
const DELETE: &str = "DELETE FROM ${schema}.publications WHERE user_id = $1 AND id = $2";
const INSERT: &str = r#"
    INSERT INTO ${schema}.publications (id, user_id, source, process_number, title, content, published_at, status)
    VALUES ($1, $2, $3, $4, $5, $6, $7, 'unread')
    RETURNING {columns}
"#;

const MAX_TITLE_LENGTH: usize = 300;
const MAX_SOURCE_LENGTH: usize = 120;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PublicationQuery {
    pub status: Option<PublicationStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewPublication {
    /// Recipient; defaults to the caller
    pub user_id: Option<Uuid>,
    pub source: String,
    pub process_number: Option<String>,
    pub title: String,
    pub content: String,
    pub published_at: Option<NaiveDate>,
}

/// What the sender sees after delivering into someone else's inbox
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryReceipt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: PublicationStatus,
}

impl From<&Publication> for DeliveryReceipt {
    fn from(p: &Publication) -> Self {
        Self {
            id: p.id,
            user_id: p.user_id,
            status: p.status,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct UnreadCount {
    pub unread: i64,
}

/// Inbox of one user inside one tenant
pub struct PublicationService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
    user_id: Uuid,
}

impl<'a> PublicationService<'a> {
    pub fn for_user(pool: &'a PgPool, schema: &'a TenantSchema, user_id: Uuid) -> Self {
        Self { pool, schema, user_id }
    }

    pub async fn list(&self, query: PublicationQuery) -> Result<Vec<Publication>, ApiError> {
        let (limit, offset) = Page::new(query.limit, query.offset).resolve();
        let publications = sqlx::query_as(&tenant_sql(self.schema, LIST, Publication::COLUMNS))
            .bind(self.user_id)
            .bind(query.status.map(|s| s.as_str()))
            .bind(validation::optional(query.search).map(|s| like_pattern(&s)))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(publications)
    }

    pub async fn get(&self, id: Uuid) -> Result<Publication, ApiError> {
        self.fetch(GET, id).await
    }

    pub async fn unread_count(&self) -> Result<UnreadCount, ApiError> {
        let unread = sqlx::query_scalar(&self.schema.render(UNREAD_COUNT))
            .bind(self.user_id)
            .fetch_one(self.pool)
            .await?;
        Ok(UnreadCount { unread })
    }

    pub async fn mark_read(&self, id: Uuid) -> Result<Publication, ApiError> {
        self.fetch(MARK_READ, id).await
    }

    pub async fn mark_unread(&self, id: Uuid) -> Result<Publication, ApiError> {
        self.fetch(MARK_UNREAD, id).await
    }

    pub async fn archive(&self, id: Uuid) -> Result<Publication, ApiError> {
        self.fetch(ARCHIVE, id).await
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query(&self.schema.render(DELETE))
            .bind(self.user_id)
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Publication not found"));
        }
        Ok(())
    }

    /// Deliver a publication. Only tenant admins may deliver into another user's inbox.
    pub async fn create(
        &self,
        tenant_id: Uuid,
        sender_is_admin: bool,
        request: NewPublication,
    ) -> Result<Publication, ApiError> {
        let recipient = request.user_id.unwrap_or(self.user_id);
        if recipient != self.user_id {
            if !sender_is_admin {
                return Err(ApiError::forbidden("Only firm admins can deliver publications to other users"));
            }
            user_service::ensure_tenant_user(self.pool, tenant_id, "user_id", Some(recipient)).await?;
        }

        let publication = sqlx::query_as(&tenant_sql(self.schema, INSERT, Publication::COLUMNS))
            .bind(Uuid::new_v4())
            .bind(recipient)
            .bind(validation::required("source", &request.source, MAX_SOURCE_LENGTH)?)
            .bind(validation::optional(request.process_number))
            .bind(validation::required("title", &request.title, MAX_TITLE_LENGTH)?)
            .bind(validation::required("content", &request.content, usize::MAX)?)
            .bind(request.published_at.unwrap_or_else(|| Utc::now().date_naive()))
            .fetch_one(self.pool)
            .await?;
        Ok(publication)
    }

    async fn fetch(&self, template: &str, id: Uuid) -> Result<Publication, ApiError> {
        sqlx::query_as(&tenant_sql(self.schema, template, Publication::COLUMNS))
            .bind(self.user_id)
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Publication not found"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_statement_is_user_scoped() {
        for sql in [LIST, GET, UNREAD_COUNT, MARK_READ, MARK_UNREAD, ARCHIVE, DELETE] {
            assert!(sql.contains("user_id = $1"), "unscoped statement: {}", sql);
        }
        for sql in [GET, MARK_READ, MARK_UNREAD, ARCHIVE, DELETE] {
            assert!(sql.contains("AND id = $2"));
        }
    }

    #[test]
    fn receipt_hides_content() {
        let p = Publication {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            source: "DJE-SP".into(),
            process_number: None,
            title: "Intimação".into(),
            content: "Conteúdo sigiloso".into(),
            published_at: NaiveDate::from_ymd_opt(2024, 4, 2).unwrap(),
            status: PublicationStatus::Unread,
            read_at: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(DeliveryReceipt::from(&p)).unwrap();
        assert!(json.get("content").is_none());
        assert_eq!(json["status"], "unread");
    }
}
