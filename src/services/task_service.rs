use chrono::NaiveDate;
use serde::Deserialize;
use sqlx::PgPool;
use uuid::Uuid;

use super::{tenant_sql, user_service, validation};
use crate::database::models::project::Priority;
use crate::database::models::task::{Task, TaskStatus};
use crate::database::TenantSchema;
use crate::error::ApiError;
use crate::types::Page;

const LIST: &str = r#"
    SELECT {columns} FROM ${schema}.tasks
    WHERE ($1::uuid IS NULL OR project_id = $1)
      AND ($2::uuid IS NULL OR assignee_id = $2)
      AND ($3::text IS NULL OR status = $3)
      AND ($4::bool IS NOT TRUE OR (status <> 'done' AND due_date < CURRENT_DATE))
    ORDER BY due_date NULLS LAST, created_at
    LIMIT $5 OFFSET $6
"#;
const GET: &str = "SELECT {columns} FROM ${schema}.tasks WHERE id = $1";
const PROJECT_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM ${schema}.projects WHERE id = $1)";
const INSERT: &str = r#"
    INSERT INTO ${schema}.tasks
        (id, project_id, title, description, status, priority, assignee_id, due_date, completed_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8, CASE WHEN $5 = 'done' THEN NOW() END)
    RETURNING {columns}
"#;
// completed_at is stamped on entering done, kept while done and cleared on leaving it
const UPDATE: &str = r#"
    UPDATE ${schema}.tasks
    SET title = $2, description = $3, status = $4, priority = $5, assignee_id = $6, due_date = $7,
        completed_at = CASE WHEN $4 = 'done' THEN COALESCE(completed_at, NOW()) END,
        updated_at = NOW()
    WHERE id = $1
    RETURNING {columns}
"#;
const SET_STATUS: &str = r#"
    UPDATE ${schema}.tasks
    SET status = $2,
        completed_at = CASE WHEN $2 = 'done' THEN COALESCE(completed_at, NOW()) END,
        updated_at = NOW()
    WHERE id = $1
    RETURNING {columns}
"#;
const DELETE: &str = "DELETE FROM ${schema}.tasks WHERE id = $1";

const MAX_TITLE_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskQuery {
    pub project_id: Option<Uuid>,
    pub assignee_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub overdue: Option<bool>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewTask {
    pub project_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    pub assignee_id: Option<Uuid>,
    pub due_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub description: Option<Option<String>>,
    pub status: Option<TaskStatus>,
    pub priority: Option<Priority>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub assignee_id: Option<Option<Uuid>>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub due_date: Option<Option<NaiveDate>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StatusChange {
    pub status: TaskStatus,
}

pub struct TaskService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
    tenant_id: Uuid,
}

impl<'a> TaskService<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a TenantSchema, tenant_id: Uuid) -> Self {
        Self { pool, schema, tenant_id }
    }

    pub async fn list(&self, query: TaskQuery) -> Result<Vec<Task>, ApiError> {
        let (limit, offset) = Page::new(query.limit, query.offset).resolve();
        let tasks = sqlx::query_as(&tenant_sql(self.schema, LIST, Task::COLUMNS))
            .bind(query.project_id)
            .bind(query.assignee_id)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.overdue)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(tasks)
    }

    pub async fn get(&self, id: Uuid) -> Result<Task, ApiError> {
        sqlx::query_as(&tenant_sql(self.schema, GET, Task::COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))
    }

    pub async fn create(&self, request: NewTask) -> Result<Task, ApiError> {
        let title = validation::required("title", &request.title, MAX_TITLE_LENGTH)?;
        let project_exists: bool = sqlx::query_scalar(&self.schema.render(PROJECT_EXISTS))
            .bind(request.project_id)
            .fetch_one(self.pool)
            .await?;
        if !project_exists {
            return Err(ApiError::invalid_field("project_id", "Project not found"));
        }
        user_service::ensure_tenant_user(self.pool, self.tenant_id, "assignee_id", request.assignee_id).await?;

        let task = sqlx::query_as(&tenant_sql(self.schema, INSERT, Task::COLUMNS))
            .bind(Uuid::new_v4())
            .bind(request.project_id)
            .bind(&title)
            .bind(validation::optional(request.description))
            .bind(request.status.unwrap_or(TaskStatus::Todo).as_str())
            .bind(request.priority.unwrap_or(Priority::Medium).as_str())
            .bind(request.assignee_id)
            .bind(request.due_date)
            .fetch_one(self.pool)
            .await?;
        Ok(task)
    }

    pub async fn update(&self, id: Uuid, update: TaskUpdate) -> Result<Task, ApiError> {
        let current = self.get(id).await?;
        let title = validation::required("title", update.title.as_deref().unwrap_or(&current.title), MAX_TITLE_LENGTH)?;
        user_service::ensure_tenant_user(self.pool, self.tenant_id, "assignee_id", update.assignee_id.flatten()).await?;

        sqlx::query_as(&tenant_sql(self.schema, UPDATE, Task::COLUMNS))
            .bind(id)
            .bind(&title)
            .bind(validation::patch(update.description.map(validation::optional), current.description))
            .bind(update.status.unwrap_or(current.status).as_str())
            .bind(update.priority.unwrap_or(current.priority).as_str())
            .bind(validation::patch(update.assignee_id, current.assignee_id))
            .bind(validation::patch(update.due_date, current.due_date))
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))
    }

    pub async fn change_status(&self, id: Uuid, status: TaskStatus) -> Result<Task, ApiError> {
        sqlx::query_as(&tenant_sql(self.schema, SET_STATUS, Task::COLUMNS))
            .bind(id)
            .bind(status.as_str())
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Task not found"))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let result = sqlx::query(&self.schema.render(DELETE)).bind(id).execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(ApiError::not_found("Task not found"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn completion_is_tied_to_done() {
        for sql in [INSERT, UPDATE, SET_STATUS] {
            assert!(sql.contains("'done'"));
        }
        assert!(SET_STATUS.contains("COALESCE(completed_at, NOW())"));
    }

    #[test]
    fn status_change_body() {
        let change: StatusChange = serde_json::from_value(serde_json::json!({"status": "in_progress"})).unwrap();
        assert_eq!(change.status, TaskStatus::InProgress);
        assert!(serde_json::from_value::<StatusChange>(serde_json::json!({"status": "finished"})).is_err());
    }

    #[test]
    fn assignee_can_be_cleared() {
        let update: TaskUpdate = serde_json::from_value(serde_json::json!({"assignee_id": null})).unwrap();
        assert_eq!(update.assignee_id, Some(None));
        assert_eq!(validation::patch(update.assignee_id, Some(Uuid::new_v4())), None);
        assert_eq!(update.due_date, None);
    }
}
