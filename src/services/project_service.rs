use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::{tenant_sql, user_service, validation};
use crate::database::models::project::{Priority, Project, ProjectStatus};
use crate::database::models::task::TaskStatus;
use crate::database::TenantSchema;
use crate::error::ApiError;
use crate::types::Page;

const LIST: &str = r#"
    SELECT {columns} FROM ${schema}.projects
    WHERE ($1::text IS NULL OR status = $1)
      AND ($2::uuid IS NULL OR client_id = $2)
    ORDER BY created_at DESC
    LIMIT $3 OFFSET $4
"#;
const GET: &str = "SELECT {columns} FROM ${schema}.projects WHERE id = $1";
const TASK_COUNTS: &str = "SELECT status, COUNT(*) FROM ${schema}.tasks WHERE project_id = $1 GROUP BY status";
const CLIENT_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM ${schema}.clients WHERE id = $1)";
const INSERT: &str = r#"
    INSERT INTO ${schema}.projects
        (id, client_id, title, description, case_number, status, priority, start_date, due_date, owner_id)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
    RETURNING {columns}
"#;
const UPDATE: &str = r#"
    UPDATE ${schema}.projects
    SET client_id = $2, title = $3, description = $4, case_number = $5, status = $6, priority = $7,
        start_date = $8, due_date = $9, owner_id = $10, updated_at = NOW()
    WHERE id = $1
    RETURNING {columns}
"#;
const DELETE: &str = "DELETE FROM ${schema}.projects WHERE id = $1";

const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectQuery {
    pub status: Option<ProjectStatus>,
    pub client_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub client_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub case_number: Option<String>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub owner_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    #[serde(default, deserialize_with = "validation::nullable")]
    pub client_id: Option<Option<Uuid>>,
    pub title: Option<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub case_number: Option<Option<String>>,
    pub status: Option<ProjectStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub start_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub due_date: Option<Option<NaiveDate>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub owner_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ProjectDetails {
    #[serde(flatten)]
    pub project: Project,
    pub task_counts: BTreeMap<String, i64>,
}

impl NewProject {
    fn validated(self) -> Result<NewProject, ApiError> {
        if let (Some(start), Some(due)) = (self.start_date, self.due_date) {
            if due < start {
                return Err(ApiError::invalid_field("due_date", "Due date cannot be before the start date"));
            }
        }
        Ok(NewProject {
            title: validation::required("title", &self.title, MAX_TITLE_LENGTH)?,
            description: validation::optional(self.description),
            case_number: validation::optional(self.case_number),
            ..self
        })
    }
}

pub struct ProjectService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
    tenant_id: Uuid,
}

impl<'a> ProjectService<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a TenantSchema, tenant_id: Uuid) -> Self {
        Self { pool, schema, tenant_id }
    }

    pub async fn list(&self, query: ProjectQuery) -> Result<Vec<Project>, ApiError> {
        let (limit, offset) = Page::new(query.limit, query.offset).resolve();
        let projects = sqlx::query_as(&tenant_sql(self.schema, LIST, Project::COLUMNS))
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.client_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(projects)
    }

    pub async fn get(&self, id: Uuid) -> Result<Project, ApiError> {
        sqlx::query_as(&tenant_sql(self.schema, GET, Project::COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    /// Project with its task counts by status; every status is present
    pub async fn details(&self, id: Uuid) -> Result<ProjectDetails, ApiError> {
        let project = self.get(id).await?;
        let rows: Vec<(String, i64)> = sqlx::query_as(&self.schema.render(TASK_COUNTS))
            .bind(id)
            .fetch_all(self.pool)
            .await?;

        let mut task_counts: BTreeMap<String, i64> =
            TaskStatus::ALL.iter().map(|s| (s.as_str().to_string(), 0)).collect();
        for (status, count) in rows {
            task_counts.insert(status, count);
        }
        Ok(ProjectDetails { project, task_counts })
    }

    pub async fn create(&self, request: NewProject) -> Result<Project, ApiError> {
        let p = request.validated()?;
        self.check_references(p.client_id, p.owner_id).await?;

        let project = sqlx::query_as(&tenant_sql(self.schema, INSERT, Project::COLUMNS))
            .bind(Uuid::new_v4())
            .bind(p.client_id)
            .bind(&p.title)
            .bind(&p.description)
            .bind(&p.case_number)
            .bind(p.status.unwrap_or(ProjectStatus::Open).as_str())
            .bind(p.priority.unwrap_or(Priority::Medium).as_str())
            .bind(p.start_date)
            .bind(p.due_date)
            .bind(p.owner_id)
            .fetch_one(self.pool)
            .await?;
        Ok(project)
    }

    pub async fn update(&self, id: Uuid, update: ProjectUpdate) -> Result<Project, ApiError> {
        let current = self.get(id).await?;
        let p = NewProject {
            client_id: validation::patch(update.client_id, current.client_id),
            title: update.title.unwrap_or(current.title),
            description: validation::patch(update.description, current.description),
            case_number: validation::patch(update.case_number, current.case_number),
            status: Some(update.status.unwrap_or(current.status)),
            priority: Some(update.priority.unwrap_or(current.priority)),
            start_date: validation::patch(update.start_date, current.start_date),
            due_date: validation::patch(update.due_date, current.due_date),
            owner_id: validation::patch(update.owner_id, current.owner_id),
        }
        .validated()?;
        self.check_references(update.client_id.flatten(), update.owner_id.flatten()).await?;

        sqlx::query_as(&tenant_sql(self.schema, UPDATE, Project::COLUMNS))
            .bind(id)
            .bind(p.client_id)
            .bind(&p.title)
            .bind(&p.description)
            .bind(&p.case_number)
            .bind(p.status.unwrap_or(current.status).as_str())
            .bind(p.priority.unwrap_or(current.priority).as_str())
            .bind(p.start_date)
            .bind(p.due_date)
            .bind(p.owner_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Project not found"))
    }

    /// Deletes the project and, by cascade, its tasks
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query(&self.schema.render(DELETE)).bind(id).execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Project not found"));
        }
        Ok(())
    }

    async fn check_references(&self, client_id: Option<Uuid>, owner_id: Option<Uuid>) -> Result<(), ApiError> {
        if let Some(client_id) = client_id {
            let exists: bool = sqlx::query_scalar(&self.schema.render(CLIENT_EXISTS))
                .bind(client_id)
                .fetch_one(self.pool)
                .await?;
            if !exists {
                return Err(ApiError::invalid_field("client_id", "Client not found"));
            }
        }
        user_service::ensure_tenant_user(self.pool, self.tenant_id, "owner_id", owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> NewProject {
        NewProject {
            client_id: None,
            title: "  Ação trabalhista ".into(),
            description: Some("".into()),
            case_number: Some("0001234-56.2024.5.02.0001".into()),
            status: None,
            priority: None,
            start_date: NaiveDate::from_ymd_opt(2024, 3, 1),
            due_date: NaiveDate::from_ymd_opt(2024, 9, 1),
            owner_id: None,
        }
    }

    #[test]
    fn validation_trims_and_checks_dates() {
        let p = request().validated().unwrap();
        assert_eq!(p.title, "Ação trabalhista");
        assert_eq!(p.description, None);

        let mut backwards = request();
        backwards.due_date = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert!(backwards.validated().is_err());
    }

    #[test]
    fn blank_title_is_rejected() {
        let mut r = request();
        r.title = "   ".into();
        assert!(r.validated().is_err());
    }
}
