use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::{tenant_sql, validation};
use crate::database::models::cash_flow::{CashFlowEntry, EntryKind, EntryStatus};
use crate::database::models::invoice::Invoice;
use crate::database::TenantSchema;
use crate::error::ApiError;
use crate::types::Page;

/// Category of the income entry recorded when an invoice is paid
pub const INVOICE_CATEGORY: &str = "honorarios";

const LIST: &str = r#"
    SELECT {columns} FROM ${schema}.cash_flow_entries
    WHERE ($1::text IS NULL OR kind = $1)
      AND ($2::text IS NULL OR status = $2)
      AND ($3::date IS NULL OR due_date >= $3)
      AND ($4::date IS NULL OR due_date <= $4)
    ORDER BY due_date, created_at
    LIMIT $5 OFFSET $6
"#;
const GET: &str = "SELECT {columns} FROM ${schema}.cash_flow_entries WHERE id = $1";
const CLIENT_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM ${schema}.clients WHERE id = $1)";
const INSERT: &str = r#"
    INSERT INTO ${schema}.cash_flow_entries
        (id, kind, category, description, amount, due_date, status, paid_at, client_id, invoice_id, created_by)
    VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 = 'paid' THEN NOW() END, $8, $9, $10)
    RETURNING {columns}
"#;
const UPDATE: &str = r#"
    UPDATE ${schema}.cash_flow_entries
    SET kind = $2, category = $3, description = $4, amount = $5, due_date = $6, status = $7,
        paid_at = CASE WHEN $7 = 'paid' THEN COALESCE(paid_at, NOW()) END,
        client_id = $8, updated_at = NOW()
    WHERE id = $1 AND invoice_id IS NULL
    RETURNING {columns}
"#;
const PAY: &str = r#"
    UPDATE ${schema}.cash_flow_entries
    SET status = 'paid', paid_at = NOW(), updated_at = NOW()
    WHERE id = $1 AND status = 'pending'
    RETURNING {columns}
"#;
const DELETE: &str = "DELETE FROM ${schema}.cash_flow_entries WHERE id = $1 AND invoice_id IS NULL";
const SUMMARY: &str = r#"
    SELECT kind, status, category, SUM(amount) AS total
    FROM ${schema}.cash_flow_entries
    WHERE status <> 'cancelled'
      AND ($1::date IS NULL OR due_date >= $1)
      AND ($2::date IS NULL OR due_date <= $2)
    GROUP BY kind, status, category
"#;

const MAX_TEXT_LENGTH: usize = 200;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryQuery {
    pub kind: Option<EntryKind>,
    pub status: Option<EntryStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewEntry {
    pub kind: EntryKind,
    pub category: String,
    pub description: String,
    pub amount: Decimal,
    pub due_date: NaiveDate,
    pub status: Option<EntryStatus>,
    pub client_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryUpdate {
    pub kind: Option<EntryKind>,
    pub category: Option<String>,
    pub description: Option<String>,
    pub amount: Option<Decimal>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<EntryStatus>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub client_id: Option<Option<Uuid>>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct Period {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub paid: Decimal,
    pub pending: Decimal,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub kind: EntryKind,
    pub category: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CashFlowSummary {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub income: Totals,
    pub expense: Totals,
    /// Paid income minus paid expense
    pub balance: Decimal,
    /// All non-cancelled income minus all non-cancelled expense
    pub projected: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub by_category: Option<Vec<CategoryTotal>>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SummaryRow {
    #[sqlx(try_from = "String")]
    pub kind: EntryKind,
    #[sqlx(try_from = "String")]
    pub status: EntryStatus,
    pub category: String,
    pub total: Decimal,
}

/// Fold grouped totals into a summary. Cancelled rows are ignored.
pub fn summarize(period: Period, rows: &[SummaryRow], with_breakdown: bool) -> CashFlowSummary {
    let mut income = Totals::default();
    let mut expense = Totals::default();
    let mut categories: BTreeMap<(&'static str, &str), (EntryKind, Decimal)> = BTreeMap::new();

    for row in rows.iter().filter(|r| r.status != EntryStatus::Cancelled) {
        let totals = match row.kind {
            EntryKind::Income => &mut income,
            EntryKind::Expense => &mut expense,
        };
        match row.status {
            EntryStatus::Paid => totals.paid += row.total,
            _ => totals.pending += row.total,
        }
        totals.total += row.total;

        let slot = categories
            .entry((row.kind.as_str(), row.category.as_str()))
            .or_insert((row.kind, Decimal::ZERO));
        slot.1 += row.total;
    }

    let by_category = with_breakdown.then(|| {
        categories
            .into_iter()
            .map(|((_, category), (kind, total))| CategoryTotal {
                kind,
                category: category.to_string(),
                total,
            })
            .collect()
    });

    CashFlowSummary {
        from: period.from,
        to: period.to,
        balance: income.paid - expense.paid,
        projected: income.total - expense.total,
        income,
        expense,
        by_category,
    }
}

struct ValidEntry {
    kind: EntryKind,
    category: String,
    description: String,
    amount: Decimal,
    due_date: NaiveDate,
    status: EntryStatus,
    client_id: Option<Uuid>,
}

fn validate(entry: NewEntry) -> Result<ValidEntry, ApiError> {
    Ok(ValidEntry {
        kind: entry.kind,
        category: validation::required("category", &entry.category, MAX_TEXT_LENGTH)?.to_lowercase(),
        description: validation::required("description", &entry.description, MAX_TEXT_LENGTH)?,
        amount: validation::money("amount", entry.amount)?.round_dp(2),
        due_date: entry.due_date,
        status: entry.status.unwrap_or(EntryStatus::Pending),
        client_id: entry.client_id,
    })
}

pub struct CashFlowService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
}

impl<'a> CashFlowService<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a TenantSchema) -> Self {
        Self { pool, schema }
    }

    pub async fn list(&self, query: EntryQuery) -> Result<Vec<CashFlowEntry>, ApiError> {
        let (limit, offset) = Page::new(query.limit, query.offset).resolve();
        let entries = sqlx::query_as(&tenant_sql(self.schema, LIST, CashFlowEntry::COLUMNS))
            .bind(query.kind.map(|k| k.as_str()))
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.from)
            .bind(query.to)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(entries)
    }

    pub async fn get(&self, id: Uuid) -> Result<CashFlowEntry, ApiError> {
        sqlx::query_as(&tenant_sql(self.schema, GET, CashFlowEntry::COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Cash flow entry not found"))
    }

    pub async fn create(&self, request: NewEntry, created_by: Uuid) -> Result<CashFlowEntry, ApiError> {
        let e = validate(request)?;
        self.check_client(e.client_id).await?;
        let entry = sqlx::query_as(&tenant_sql(self.schema, INSERT, CashFlowEntry::COLUMNS))
            .bind(Uuid::new_v4())
            .bind(e.kind.as_str())
            .bind(&e.category)
            .bind(&e.description)
            .bind(e.amount)
            .bind(e.due_date)
            .bind(e.status.as_str())
            .bind(e.client_id)
            .bind(None::<Uuid>)
            .bind(created_by)
            .fetch_one(self.pool)
            .await?;
        Ok(entry)
    }

    /// Entries generated from invoices are read-only here
    pub async fn update(&self, id: Uuid, update: EntryUpdate) -> Result<CashFlowEntry, ApiError> {
        let current = self.get(id).await?;
        if current.invoice_id.is_some() {
            return Err(ApiError::conflict("Entries generated by an invoice cannot be edited"));
        }
        if update.status == Some(EntryStatus::Paid) && current.status != EntryStatus::Paid {
            return Err(ApiError::bad_request("Use the pay operation to mark an entry as paid"));
        }
        let e = validate(NewEntry {
            kind: update.kind.unwrap_or(current.kind),
            category: update.category.unwrap_or(current.category),
            description: update.description.unwrap_or(current.description),
            amount: update.amount.unwrap_or(current.amount),
            due_date: update.due_date.unwrap_or(current.due_date),
            status: Some(update.status.unwrap_or(current.status)),
            client_id: validation::patch(update.client_id, current.client_id),
        })?;
        self.check_client(update.client_id.flatten()).await?;

        sqlx::query_as(&tenant_sql(self.schema, UPDATE, CashFlowEntry::COLUMNS))
            .bind(id)
            .bind(e.kind.as_str())
            .bind(&e.category)
            .bind(&e.description)
            .bind(e.amount)
            .bind(e.due_date)
            .bind(e.status.as_str())
            .bind(e.client_id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::conflict("Entries generated by an invoice cannot be edited"))
    }

    pub async fn pay(&self, id: Uuid) -> Result<CashFlowEntry, ApiError> {
        if let Some(entry) = sqlx::query_as(&tenant_sql(self.schema, PAY, CashFlowEntry::COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
        {
            return Ok(entry);
        }
        let current = self.get(id).await?;
        Err(ApiError::conflict(format!("Entry is {} and cannot be paid", current.status)))
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let current = self.get(id).await?;
        if current.invoice_id.is_some() {
            return Err(ApiError::conflict("Entries generated by an invoice cannot be deleted"));
        }
        sqlx::query(&self.schema.render(DELETE)).bind(id).execute(self.pool).await?;
        Ok(())
    }

    pub async fn summary(&self, period: Period, with_breakdown: bool) -> Result<CashFlowSummary, ApiError> {
        if let (Some(from), Some(to)) = (period.from, period.to) {
            if to < from {
                return Err(ApiError::invalid_field("to", "End of period is before its start"));
            }
        }
        let rows: Vec<SummaryRow> = sqlx::query_as(&self.schema.render(SUMMARY))
            .bind(period.from)
            .bind(period.to)
            .fetch_all(self.pool)
            .await?;
        Ok(summarize(period, &rows, with_breakdown))
    }

    async fn check_client(&self, client_id: Option<Uuid>) -> Result<(), ApiError> {
        if let Some(client_id) = client_id {
            let exists: bool = sqlx::query_scalar(&self.schema.render(CLIENT_EXISTS))
                .bind(client_id)
                .fetch_one(self.pool)
                .await?;
            if !exists {
                return Err(ApiError::invalid_field("client_id", "Client not found"));
            }
        }
        Ok(())
    }
}

/// Record the paid income for `invoice` on the caller's transaction
pub async fn record_invoice_payment(
    conn: &mut PgConnection,
    schema: &TenantSchema,
    invoice: &Invoice,
    created_by: Uuid,
) -> Result<CashFlowEntry, ApiError> {
    let entry = sqlx::query_as(&tenant_sql(schema, INSERT, CashFlowEntry::COLUMNS))
        .bind(Uuid::new_v4())
        .bind(EntryKind::Income.as_str())
        .bind(INVOICE_CATEGORY)
        .bind(format!("Fatura {}", invoice.number))
        .bind(invoice.total)
        .bind(invoice.due_date)
        .bind(EntryStatus::Paid.as_str())
        .bind(Some(invoice.client_id))
        .bind(Some(invoice.id))
        .bind(created_by)
        .fetch_one(conn)
        .await?;
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn row(kind: EntryKind, status: EntryStatus, category: &str, total: &str) -> SummaryRow {
        SummaryRow {
            kind,
            status,
            category: category.to_string(),
            total: Decimal::from_str(total).unwrap(),
        }
    }

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn summary_splits_paid_and_pending() {
        let rows = vec![
            row(EntryKind::Income, EntryStatus::Paid, "honorarios", "1500.00"),
            row(EntryKind::Income, EntryStatus::Pending, "honorarios", "500.00"),
            row(EntryKind::Expense, EntryStatus::Paid, "aluguel", "800.00"),
            row(EntryKind::Expense, EntryStatus::Pending, "custas", "120.50"),
            row(EntryKind::Expense, EntryStatus::Cancelled, "custas", "999.00"),
        ];
        let s = summarize(Period::default(), &rows, true);
        assert_eq!(s.income, Totals { paid: d("1500.00"), pending: d("500.00"), total: d("2000.00") });
        assert_eq!(s.expense.total, d("920.50"));
        assert_eq!(s.balance, d("700.00"));
        assert_eq!(s.projected, d("1079.50"));

        let categories = s.by_category.unwrap();
        assert_eq!(categories.len(), 3);
        let custas = categories.iter().find(|c| c.category == "custas").unwrap();
        assert_eq!(custas.total, d("120.50"));
    }

    #[test]
    fn breakdown_is_omitted_without_reports() {
        let rows = vec![row(EntryKind::Income, EntryStatus::Paid, "honorarios", "10")];
        let s = summarize(Period::default(), &rows, false);
        assert!(s.by_category.is_none());
        let json = serde_json::to_value(&s).unwrap();
        assert!(json.get("by_category").is_none());
    }

    #[test]
    fn same_category_name_is_split_by_kind() {
        let rows = vec![
            row(EntryKind::Income, EntryStatus::Paid, "outros", "10"),
            row(EntryKind::Expense, EntryStatus::Paid, "outros", "4"),
        ];
        let categories = summarize(Period::default(), &rows, true).by_category.unwrap();
        assert_eq!(categories.len(), 2);
    }

    #[test]
    fn entries_are_validated() {
        let entry = NewEntry {
            kind: EntryKind::Expense,
            category: " Custas ".into(),
            description: "Guia de recolhimento".into(),
            amount: d("35.90"),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            status: None,
            client_id: None,
        };
        let v = validate(entry.clone()).unwrap();
        assert_eq!(v.category, "custas");
        assert_eq!(v.status, EntryStatus::Pending);

        let negative = NewEntry { amount: d("-1"), ..entry };
        assert!(validate(negative).is_err());
    }

    #[test]
    fn paid_at_follows_status() {
        assert!(INSERT.contains("CASE WHEN $7 = 'paid' THEN NOW() END"));
        // leaving `paid` clears the timestamp, staying keeps the original one
        assert!(UPDATE.contains("paid_at = CASE WHEN $7 = 'paid' THEN COALESCE(paid_at, NOW()) END"));
    }
}
