//! Filtered search over tenant tables with the JSON filter language.

use serde::Serialize;
use serde_json::Value;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use std::time::Instant;
use uuid::Uuid;

use crate::database::models::cash_flow::CashFlowEntry;
use crate::database::models::client::Client;
use crate::database::models::invoice::Invoice;
use crate::database::models::project::Project;
use crate::database::models::publication::Publication;
use crate::database::models::task::Task;
use crate::database::{Column, DatabaseManager, TenantSchema};
use crate::error::ApiError;
use crate::filter::{Filter, FilterData, SqlResult};
use crate::types::Feature;

crate::text_enum! {
    /// A searchable collection
    pub enum Resource {
        Clients => "clients",
        Projects => "projects",
        Tasks => "tasks",
        CashFlow => "cash_flow",
        Invoices => "invoices",
        Publications => "publications",
    }
}

impl Resource {
    pub fn feature(&self) -> Feature {
        match self {
            Resource::Clients => Feature::Crm,
            Resource::Projects => Feature::Projects,
            Resource::Tasks => Feature::Tasks,
            Resource::CashFlow => Feature::CashFlow,
            Resource::Invoices => Feature::Billing,
            Resource::Publications => Feature::Publications,
        }
    }

    fn table(&self) -> &'static str {
        match self {
            Resource::Clients => "clients",
            Resource::Projects => "projects",
            Resource::Tasks => "tasks",
            Resource::CashFlow => "cash_flow_entries",
            Resource::Invoices => "invoices",
            Resource::Publications => "publications",
        }
    }

    fn columns(&self) -> &'static [Column] {
        match self {
            Resource::Clients => Client::COLUMNS,
            Resource::Projects => Project::COLUMNS,
            Resource::Tasks => Task::COLUMNS,
            Resource::CashFlow => CashFlowEntry::COLUMNS,
            Resource::Invoices => Invoice::READ_COLUMNS,
            Resource::Publications => Publication::COLUMNS,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FindResult {
    pub resource: Resource,
    pub total: i64,
    pub records: Vec<Value>,
}

pub struct FindService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
    user_id: Uuid,
}

impl<'a> FindService<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a TenantSchema, user_id: Uuid) -> Self {
        Self { pool, schema, user_id }
    }

    /// Build the filter for `resource`; publications are always limited to the caller's inbox
    pub fn build_filter(&self, resource: Resource, data: FilterData) -> Result<Filter, ApiError> {
        let mut filter = Filter::new(self.schema.table(resource.table()), resource.columns());
        if resource == Resource::Publications {
            filter = filter.scope("user_id", self.user_id.to_string())?;
        }
        filter.assign(data)?;
        Ok(filter)
    }

    pub async fn find(&self, resource: Resource, data: FilterData) -> Result<FindResult, ApiError> {
        let filter = self.build_filter(resource, data)?;
        let select = filter.to_sql()?;
        let count = filter.to_count_sql()?;

        let started = Instant::now();
        let records = match resource {
            Resource::Clients => self.fetch::<Client>(&select).await?,
            Resource::Projects => self.fetch::<Project>(&select).await?,
            Resource::Tasks => self.fetch::<Task>(&select).await?,
            Resource::CashFlow => self.fetch::<CashFlowEntry>(&select).await?,
            Resource::Invoices => self.fetch::<Invoice>(&select).await?,
            Resource::Publications => self.fetch::<Publication>(&select).await?,
        };
        let total = self.count(&count).await?;
        DatabaseManager::log_if_slow(&format!("find {}", resource), started);

        Ok(FindResult { resource, total, records })
    }

    async fn rows<T>(&self, sql: &SqlResult) -> Result<Vec<T>, ApiError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut query = sqlx::query_as::<_, T>(&sql.query);
        for param in &sql.params {
            query = query.bind(param.as_str());
        }
        Ok(query.fetch_all(self.pool).await?)
    }

    async fn fetch<T>(&self, sql: &SqlResult) -> Result<Vec<Value>, ApiError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin + Serialize,
    {
        to_values(self.rows::<T>(sql).await?)
    }

    async fn count(&self, sql: &SqlResult) -> Result<i64, ApiError> {
        let mut query = sqlx::query(&sql.query);
        for param in &sql.params {
            query = query.bind(param.as_str());
        }
        let row = query.fetch_one(self.pool).await?;
        Ok(sqlx::Row::try_get::<i64, _>(&row, "count")?)
    }
}

fn to_values<T: Serialize>(rows: impl IntoIterator<Item = T>) -> Result<Vec<Value>, ApiError> {
    rows.into_iter()
        .map(|r| serde_json::to_value(r).map_err(|e| ApiError::internal_server_error(e.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn service_parts() -> (TenantSchema, Uuid) {
        (TenantSchema::for_tenant(Uuid::new_v4()), Uuid::new_v4())
    }

    fn data(value: Value) -> FilterData {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn resources_map_to_features() {
        assert_eq!(Resource::Invoices.feature(), Feature::Billing);
        assert_eq!("cash_flow".parse::<Resource>().unwrap(), Resource::CashFlow);
        assert!("users".parse::<Resource>().is_err());
    }

    #[tokio::test]
    async fn publications_are_scoped_to_the_caller() {
        let (schema, user) = service_parts();
        let pool = sqlx::postgres::PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        let service = FindService::new(&pool, &schema, user);

        let filter = service
            .build_filter(
                Resource::Publications,
                data(json!({"where": {"$or": [{"user_id": Uuid::new_v4().to_string()}, {"status": "unread"}]}})),
            )
            .unwrap();
        let sql = filter.to_sql().unwrap();
        assert!(sql.query.contains(&schema.quoted()));
        assert!(sql.query.contains("WHERE \"user_id\" = $1::uuid AND ("));
        assert_eq!(sql.params[0], user.to_string());
    }

    #[tokio::test]
    async fn other_resources_are_not_user_scoped() {
        let (schema, user) = service_parts();
        let pool = sqlx::postgres::PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        let service = FindService::new(&pool, &schema, user);

        let sql = service
            .build_filter(Resource::Clients, data(json!({"where": {"status": "active"}})))
            .unwrap()
            .to_sql()
            .unwrap();
        assert!(sql.query.contains(&schema.table("clients")));
        assert_eq!(sql.params, vec!["active".to_string()]);

        let err = service
            .build_filter(Resource::Clients, data(json!({"where": {"password_hash": "x"}})))
            .err()
            .unwrap();
        assert_eq!(err.status_code(), 400);

        let err = service
            .build_filter(Resource::Clients, data(json!({"where": {"id": "abc"}})))
            .err()
            .unwrap();
        assert_eq!(err.status_code(), 400);
    }

    #[tokio::test]
    async fn invoice_status_filters_on_the_reported_status() {
        let (schema, user) = service_parts();
        let pool = sqlx::postgres::PgPoolOptions::new().connect_lazy("postgres://localhost/unused").unwrap();
        let service = FindService::new(&pool, &schema, user);

        let sql = service
            .build_filter(Resource::Invoices, data(json!({"where": {"status": "overdue"}, "order": "status"})))
            .unwrap()
            .to_sql()
            .unwrap();
        let effective = format!("({}) = $1::text", Invoice::EFFECTIVE_STATUS);
        assert!(sql.query.contains(&effective));
        assert!(sql.query.contains(&format!("{} AS \"status\"", Invoice::EFFECTIVE_STATUS)));
    }
}
