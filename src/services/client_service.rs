use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{like_pattern, tenant_sql, validation};
use crate::database::models::client::{Client, ClientKind, ClientStatus};
use crate::database::TenantSchema;
use crate::error::ApiError;
use crate::types::Page;

const LIST: &str = r#"
    SELECT {columns} FROM ${schema}.clients
    WHERE ($1::text IS NULL OR status = $1)
      AND ($2::text IS NULL OR name ILIKE $2 OR email ILIKE $2 OR document ILIKE $2)
    ORDER BY name, created_at
    LIMIT $3 OFFSET $4
"#;
const GET: &str = "SELECT {columns} FROM ${schema}.clients WHERE id = $1";
const INSERT: &str = r#"
    INSERT INTO ${schema}.clients (id, kind, name, document, email, phone, address, notes, status, created_by)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING {columns}
"#;
const UPDATE: &str = r#"
    UPDATE ${schema}.clients
    SET kind = $2, name = $3, document = $4, email = $5, phone = $6, address = $7, notes = $8,
        status = $9, updated_at = NOW()
    WHERE id = $1
    RETURNING {columns}
"#;
const REFERENCED: &str = r#"
    SELECT EXISTS(SELECT 1 FROM ${schema}.projects WHERE client_id = $1)
        OR EXISTS(SELECT 1 FROM ${schema}.invoices WHERE client_id = $1)
"#;
const DELETE: &str = "DELETE FROM ${schema}.clients WHERE id = $1";

const MAX_NAME_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientQuery {
    pub status: Option<ClientStatus>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewClient {
    pub kind: ClientKind,
    pub name: String,
    pub document: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub notes: Option<String>,
    pub status: Option<ClientStatus>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ClientUpdate {
    pub kind: Option<ClientKind>,
    pub name: Option<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub document: Option<Option<String>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub email: Option<Option<String>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub address: Option<Option<String>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub notes: Option<Option<String>>,
    pub status: Option<ClientStatus>,
}

impl NewClient {
    fn validated(self) -> Result<NewClient, ApiError> {
        let document = validation::optional(self.document)
            .map(|d| validation::document(self.kind, &d))
            .transpose()?;
        let email = validation::optional(self.email)
            .map(|e| validation::email("email", &e))
            .transpose()?;
        Ok(NewClient {
            kind: self.kind,
            name: validation::required("name", &self.name, MAX_NAME_LENGTH)?,
            document,
            email,
            phone: validation::optional(self.phone),
            address: validation::optional(self.address),
            notes: validation::optional(self.notes),
            status: self.status,
        })
    }
}

pub struct ClientService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
}

impl<'a> ClientService<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a TenantSchema) -> Self {
        Self { pool, schema }
    }

    pub async fn list(&self, query: ClientQuery) -> Result<Vec<Client>, ApiError> {
        let (limit, offset) = Page::new(query.limit, query.offset).resolve();
        let clients = sqlx::query_as(&tenant_sql(self.schema, LIST, Client::COLUMNS))
            .bind(query.status.map(|s| s.as_str()))
            .bind(validation::optional(query.search).map(|s| like_pattern(&s)))
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(clients)
    }

    pub async fn get(&self, id: Uuid) -> Result<Client, ApiError> {
        sqlx::query_as(&tenant_sql(self.schema, GET, Client::COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Client not found"))
    }

    pub async fn create(&self, request: NewClient, created_by: Uuid) -> Result<Client, ApiError> {
        let c = request.validated()?;
        let client = sqlx::query_as(&tenant_sql(self.schema, INSERT, Client::COLUMNS))
            .bind(Uuid::new_v4())
            .bind(c.kind.as_str())
            .bind(&c.name)
            .bind(&c.document)
            .bind(&c.email)
            .bind(&c.phone)
            .bind(&c.address)
            .bind(&c.notes)
            .bind(c.status.unwrap_or(ClientStatus::Active).as_str())
            .bind(created_by)
            .fetch_one(self.pool)
            .await?;
        Ok(client)
    }

    /// Partial update; omitted fields keep their stored value and `null` clears an optional one
    pub async fn update(&self, id: Uuid, update: ClientUpdate) -> Result<Client, ApiError> {
        let current = self.get(id).await?;
        let merged = NewClient {
            kind: update.kind.unwrap_or(current.kind),
            name: update.name.unwrap_or(current.name),
            document: validation::patch(update.document, current.document),
            email: validation::patch(update.email, current.email),
            phone: validation::patch(update.phone, current.phone),
            address: validation::patch(update.address, current.address),
            notes: validation::patch(update.notes, current.notes),
            status: Some(update.status.unwrap_or(current.status)),
        }
        .validated()?;

        let client = sqlx::query_as(&tenant_sql(self.schema, UPDATE, Client::COLUMNS))
            .bind(id)
            .bind(merged.kind.as_str())
            .bind(&merged.name)
            .bind(&merged.document)
            .bind(&merged.email)
            .bind(&merged.phone)
            .bind(&merged.address)
            .bind(&merged.notes)
            .bind(merged.status.unwrap_or(ClientStatus::Active).as_str())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Client not found"))?;
        Ok(client)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        self.get(id).await?;
        let referenced: bool = sqlx::query_scalar(&self.schema.render(REFERENCED))
            .bind(id)
            .fetch_one(self.pool)
            .await?;
        if referenced {
            return Err(ApiError::conflict("Client has projects or invoices and cannot be deleted"));
        }
        sqlx::query(&self.schema.render(DELETE)).bind(id).execute(self.pool).await?;
        Ok(())
    }
}
