use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::postgres::PgRow;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::database::TenantSchema;
use crate::error::ApiError;
use crate::types::{AccountTier, Feature};

const PRACTICE: &str = r#"
    SELECT
        (SELECT COUNT(*) FROM ${schema}.clients WHERE status = 'active') AS active_clients,
        (SELECT COUNT(*) FROM ${schema}.projects WHERE status <> 'closed') AS open_projects,
        (SELECT COUNT(*) FROM ${schema}.tasks WHERE status <> 'done') AS open_tasks,
        (SELECT COUNT(*) FROM ${schema}.tasks WHERE status <> 'done' AND due_date < CURRENT_DATE) AS overdue_tasks,
        (SELECT COUNT(*) FROM ${schema}.tasks WHERE status <> 'done' AND assignee_id = $1) AS my_open_tasks,
        (SELECT COUNT(*) FROM ${schema}.publications WHERE user_id = $1 AND status = 'unread') AS unread_publications
"#;
const FINANCE: &str = r#"
    SELECT
        COALESCE(SUM(amount) FILTER (WHERE kind = 'income' AND status = 'pending'), 0) AS receivable,
        COALESCE(SUM(amount) FILTER (WHERE kind = 'expense' AND status = 'pending'), 0) AS payable,
        COALESCE(SUM(CASE WHEN kind = 'income' THEN amount ELSE -amount END)
            FILTER (WHERE status = 'paid' AND paid_at >= date_trunc('month', NOW())), 0) AS month_balance
    FROM ${schema}.cash_flow_entries
"#;
const BILLING: &str = r#"
    SELECT
        COUNT(*) FILTER (WHERE status IN ('sent', 'overdue')) AS open_invoices,
        COUNT(*) FILTER (WHERE status = 'overdue' OR (status = 'sent' AND due_date < CURRENT_DATE)) AS overdue_invoices
    FROM ${schema}.invoices
"#;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PracticeSummary {
    pub active_clients: i64,
    pub open_projects: i64,
    pub open_tasks: i64,
    pub overdue_tasks: i64,
    pub my_open_tasks: i64,
    pub unread_publications: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FinanceSummary {
    pub receivable: Decimal,
    pub payable: Decimal,
    pub month_balance: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct BillingSummary {
    pub open_invoices: i64,
    pub overdue_invoices: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Dashboard {
    pub tier: AccountTier,
    #[serde(flatten)]
    pub practice: PracticeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finance: Option<FinanceSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing: Option<BillingSummary>,
}

pub struct DashboardService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
}

impl<'a> DashboardService<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a TenantSchema) -> Self {
        Self { pool, schema }
    }

    /// Sections outside the firm's tier are left out
    pub async fn summary(&self, tier: AccountTier, user_id: Uuid) -> Result<Dashboard, ApiError> {
        let practice_sql = self.schema.render(PRACTICE);
        let practice = sqlx::query_as::<_, PracticeSummary>(&practice_sql)
            .bind(user_id)
            .fetch_one(self.pool);

        let (practice, finance, billing) = futures::try_join!(
            practice,
            self.section::<FinanceSummary>(tier.allows(Feature::CashFlow), FINANCE),
            self.section::<BillingSummary>(tier.allows(Feature::Billing), BILLING),
        )?;

        Ok(Dashboard {
            tier,
            practice,
            finance,
            billing,
        })
    }

    async fn section<T>(&self, enabled: bool, template: &str) -> Result<Option<T>, sqlx::Error>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        if !enabled {
            return Ok(None);
        }
        sqlx::query_as(&self.schema.render(template))
            .fetch_one(self.pool)
            .await
            .map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn omitted_sections_are_not_serialized() {
        let dashboard = Dashboard {
            tier: AccountTier::Simples,
            practice: PracticeSummary {
                active_clients: 3,
                open_projects: 2,
                open_tasks: 5,
                overdue_tasks: 1,
                my_open_tasks: 4,
                unread_publications: 7,
            },
            finance: None,
            billing: None,
        };
        let json = serde_json::to_value(&dashboard).unwrap();
        assert_eq!(json["active_clients"], 3);
        assert_eq!(json["tier"], "simples");
        assert!(json.get("finance").is_none());
        assert!(json.get("billing").is_none());
    }

    #[test]
    fn my_numbers_are_user_bound() {
        assert!(PRACTICE.contains("assignee_id = $1"));
        assert!(PRACTICE.contains("user_id = $1"));
    }
}
