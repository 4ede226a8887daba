//! Invoices: numbering, totals and the status machine.

use chrono::{Datelike, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use super::cash_flow_service::record_invoice_payment;
use super::{tenant_sql, validation};
use crate::database::models::cash_flow::CashFlowEntry;
use crate::database::models::invoice::{Invoice, InvoiceItem, InvoiceStatus, InvoiceWithItems};
use crate::database::{Column, TenantSchema};
use crate::error::ApiError;
use crate::types::Page;

// Filters and reports the effective status
const LIST: &str = r#"
    SELECT {columns} FROM ${schema}.invoices
    WHERE ($1::text IS NULL OR ({effective_status}) = $1)
      AND ($2::uuid IS NULL OR client_id = $2)
    ORDER BY issue_date DESC, number DESC
    LIMIT $3 OFFSET $4
"#;
const GET: &str = "SELECT {columns} FROM ${schema}.invoices WHERE id = $1";
const LOCK: &str = "SELECT {columns} FROM ${schema}.invoices WHERE id = $1 FOR UPDATE";
const ITEMS: &str = "SELECT {columns} FROM ${schema}.invoice_items WHERE invoice_id = $1 ORDER BY position";
const CLIENT_EXISTS: &str = "SELECT EXISTS(SELECT 1 FROM ${schema}.clients WHERE id = $1)";
const NEXT_NUMBER: &str = "SELECT nextval('${schema}.invoice_number_seq')";
const INSERT: &str = r#"
    INSERT INTO ${schema}.invoices
        (id, number, client_id, issue_date, due_date, status, subtotal, discount, total, notes, created_by)
    VALUES ($1, $2, $3, $4, $5, 'draft', $6, $7, $8, $9, $10)
    RETURNING {columns}
"#;
const INSERT_ITEM: &str = r#"
    INSERT INTO ${schema}.invoice_items (id, invoice_id, position, description, quantity, unit_price, amount)
    VALUES ($1, $2, $3, $4, $5, $6, $7)
    RETURNING {columns}
"#;
const DELETE_ITEMS: &str = "DELETE FROM ${schema}.invoice_items WHERE invoice_id = $1";
const UPDATE: &str = r#"
    UPDATE ${schema}.invoices
    SET client_id = $2, issue_date = $3, due_date = $4, subtotal = $5, discount = $6, total = $7,
        notes = $8, updated_at = NOW()
    WHERE id = $1
    RETURNING {columns}
"#;
const SET_STATUS: &str = r#"
    UPDATE ${schema}.invoices
    SET status = $2, paid_at = CASE WHEN $2 = 'paid' THEN NOW() ELSE paid_at END, updated_at = NOW()
    WHERE id = $1
    RETURNING {columns}
"#;
const DELETE: &str = "DELETE FROM ${schema}.invoices WHERE id = $1";
const REFRESH_OVERDUE: &str = r#"
    UPDATE ${schema}.invoices SET status = 'overdue', updated_at = NOW()
    WHERE status = 'sent' AND due_date < CURRENT_DATE
"#;

const ITEM_COLUMNS: &[Column] = &[
    Column::new("id", "uuid"),
    Column::new("invoice_id", "uuid"),
    Column::new("position", "integer"),
    Column::new("description", "text"),
    Column::new("quantity", "numeric"),
    Column::new("unit_price", "numeric"),
    Column::new("amount", "numeric"),
];

const MAX_DESCRIPTION_LENGTH: usize = 500;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceQuery {
    pub status: Option<InvoiceStatus>,
    pub client_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewInvoice {
    pub client_id: Uuid,
    pub issue_date: Option<NaiveDate>,
    pub due_date: NaiveDate,
    pub discount: Option<Decimal>,
    pub notes: Option<String>,
    pub items: Vec<NewItem>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceUpdate {
    pub client_id: Option<Uuid>,
    pub issue_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub discount: Option<Decimal>,
    #[serde(default, deserialize_with = "validation::nullable")]
    pub notes: Option<Option<String>>,
    /// Replaces every item when present
    pub items: Option<Vec<NewItem>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaidInvoice {
    pub invoice: InvoiceWithItems,
    pub entry: CashFlowEntry,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PricedItem {
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub amount: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Totals {
    pub items: Vec<PricedItem>,
    pub subtotal: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Price every item and total the invoice. The total must stay above zero.
pub fn compute_totals(items: &[NewItem], discount: Decimal) -> Result<Totals, ApiError> {
    if items.is_empty() {
        return Err(ApiError::invalid_field("items", "An invoice needs at least one item"));
    }
    if discount < Decimal::ZERO {
        return Err(ApiError::invalid_field("discount", "Discount cannot be negative"));
    }

    let mut priced = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let field = format!("items[{}]", index);
        // Stored as NUMERIC(12,3) and NUMERIC(14,2); amounts are priced from the stored values
        let quantity = item.quantity.round_dp(3);
        let unit_price = item.unit_price.round_dp(2);
        if quantity <= Decimal::ZERO {
            return Err(ApiError::invalid_field(&field, "Quantity must be greater than zero"));
        }
        if unit_price < Decimal::ZERO {
            return Err(ApiError::invalid_field(&field, "Unit price cannot be negative"));
        }
        priced.push(PricedItem {
            description: validation::required(&field, &item.description, MAX_DESCRIPTION_LENGTH)?,
            quantity,
            unit_price,
            amount: (quantity * unit_price).round_dp(2),
        });
    }

    let subtotal: Decimal = priced.iter().map(|i| i.amount).sum();
    let discount = discount.round_dp(2);
    let total = subtotal - discount;
    // Strictly positive: paying records the total as an income entry
    if total <= Decimal::ZERO {
        return Err(if discount > Decimal::ZERO {
            ApiError::invalid_field("discount", "Discount must be less than the subtotal")
        } else {
            ApiError::invalid_field("items", "Invoice total must be greater than zero")
        });
    }
    Ok(Totals {
        items: priced,
        subtotal,
        discount,
        total,
    })
}

/// `YYYY-NNNNNN`
pub fn format_number(issue_date: NaiveDate, sequence: i64) -> String {
    format!("{}-{:06}", issue_date.year(), sequence)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceAction {
    Send,
    Cancel,
    Pay,
}

/// Target status of `action` from the effective status `from`
pub fn transition(from: InvoiceStatus, action: InvoiceAction) -> Result<InvoiceStatus, ApiError> {
    use InvoiceStatus::*;
    let to = match (action, from) {
        (InvoiceAction::Send, Draft) => Sent,
        (InvoiceAction::Cancel, Draft | Sent | Overdue) => Cancelled,
        (InvoiceAction::Pay, Sent | Overdue) => Paid,
        (action, from) => {
            return Err(ApiError::conflict(format!(
                "Cannot {:?} an invoice that is {}",
                action, from
            )
            .to_lowercase()))
        }
    };
    Ok(to)
}

pub struct InvoiceService<'a> {
    pool: &'a PgPool,
    schema: &'a TenantSchema,
}

impl<'a> InvoiceService<'a> {
    pub fn new(pool: &'a PgPool, schema: &'a TenantSchema) -> Self {
        Self { pool, schema }
    }

    pub async fn list(&self, query: InvoiceQuery) -> Result<Vec<Invoice>, ApiError> {
        let (limit, offset) = Page::new(query.limit, query.offset).resolve();
        let template = LIST.replace("{effective_status}", Invoice::EFFECTIVE_STATUS);
        let invoices = sqlx::query_as(&tenant_sql(self.schema, &template, Invoice::READ_COLUMNS))
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.client_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(self.pool)
            .await?;
        Ok(invoices)
    }

    pub async fn get(&self, id: Uuid) -> Result<InvoiceWithItems, ApiError> {
        let invoice: Invoice = sqlx::query_as(&tenant_sql(self.schema, GET, Invoice::COLUMNS))
            .bind(id)
            .fetch_optional(self.pool)
            .await?
            .ok_or_else(|| ApiError::not_found("Invoice not found"))?;
        let mut conn = self.pool.acquire().await?;
        let items = self.items(&mut conn, id).await?;
        Ok(InvoiceWithItems {
            invoice: with_effective_status(invoice),
            items,
        })
    }

    pub async fn create(&self, request: NewInvoice, created_by: Uuid) -> Result<InvoiceWithItems, ApiError> {
        let issue_date = request.issue_date.unwrap_or_else(|| Utc::now().date_naive());
        check_dates(issue_date, request.due_date)?;
        let totals = compute_totals(&request.items, request.discount.unwrap_or(Decimal::ZERO))?;

        let mut tx = self.pool.begin().await?;
        self.check_client(&mut tx, request.client_id).await?;

        let sequence: i64 = sqlx::query_scalar(&self.schema.render(NEXT_NUMBER))
            .fetch_one(&mut *tx)
            .await?;

        let invoice: Invoice = sqlx::query_as(&tenant_sql(self.schema, INSERT, Invoice::COLUMNS))
            .bind(Uuid::new_v4())
            .bind(format_number(issue_date, sequence))
            .bind(request.client_id)
            .bind(issue_date)
            .bind(request.due_date)
            .bind(totals.subtotal)
            .bind(totals.discount)
            .bind(totals.total)
            .bind(validation::optional(request.notes))
            .bind(created_by)
            .fetch_one(&mut *tx)
            .await?;
        let items = self.insert_items(&mut tx, invoice.id, &totals.items).await?;

        tx.commit().await?;
        info!("Created invoice {} ({})", invoice.number, invoice.id);
        Ok(InvoiceWithItems { invoice, items })
    }

    /// Drafts only
    pub async fn update(&self, id: Uuid, update: InvoiceUpdate) -> Result<InvoiceWithItems, ApiError> {
        let mut tx = self.pool.begin().await?;
        let current = self.lock(&mut tx, id).await?;
        if current.status != InvoiceStatus::Draft {
            return Err(ApiError::conflict("Only draft invoices can be edited"));
        }

        let issue_date = update.issue_date.unwrap_or(current.issue_date);
        let due_date = update.due_date.unwrap_or(current.due_date);
        check_dates(issue_date, due_date)?;
        let client_id = update.client_id.unwrap_or(current.client_id);
        if update.client_id.is_some() {
            self.check_client(&mut tx, client_id).await?;
        }

        let discount = update.discount.unwrap_or(current.discount);
        let items_input = match update.items {
            Some(items) => items,
            None => self
                .items(&mut tx, id)
                .await?
                .into_iter()
                .map(|i| NewItem {
                    description: i.description,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                })
                .collect(),
        };
        let totals = compute_totals(&items_input, discount)?;

        let invoice: Invoice = sqlx::query_as(&tenant_sql(self.schema, UPDATE, Invoice::COLUMNS))
            .bind(id)
            .bind(client_id)
            .bind(issue_date)
            .bind(due_date)
            .bind(totals.subtotal)
            .bind(totals.discount)
            .bind(totals.total)
            .bind(validation::patch(update.notes.map(validation::optional), current.notes))
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(&self.schema.render(DELETE_ITEMS)).bind(id).execute(&mut *tx).await?;
        let items = self.insert_items(&mut tx, id, &totals.items).await?;

        tx.commit().await?;
        Ok(InvoiceWithItems { invoice, items })
    }

    /// Drafts only; items go with the invoice
    pub async fn delete(&self, id: Uuid) -> Result<(), ApiError> {
        let mut tx = self.pool.begin().await?;
        let current = self.lock(&mut tx, id).await?;
        if current.status != InvoiceStatus::Draft {
            return Err(ApiError::conflict("Only draft invoices can be deleted"));
        }
        sqlx::query(&self.schema.render(DELETE)).bind(id).execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn send(&self, id: Uuid) -> Result<InvoiceWithItems, ApiError> {
        self.apply(id, InvoiceAction::Send).await
    }

    pub async fn cancel(&self, id: Uuid) -> Result<InvoiceWithItems, ApiError> {
        self.apply(id, InvoiceAction::Cancel).await
    }

    /// Mark paid and record the income entry in the same transaction
    pub async fn pay(&self, id: Uuid, paid_by: Uuid) -> Result<PaidInvoice, ApiError> {
        let today = Utc::now().date_naive();
        let mut tx = self.pool.begin().await?;
        let current = self.lock(&mut tx, id).await?;
        let to = transition(current.effective_status(today), InvoiceAction::Pay)?;

        let invoice: Invoice = sqlx::query_as(&tenant_sql(self.schema, SET_STATUS, Invoice::COLUMNS))
            .bind(id)
            .bind(to.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let entry = record_invoice_payment(&mut tx, self.schema, &invoice, paid_by).await?;
        let items = self.items(&mut tx, id).await?;

        tx.commit().await?;
        info!("Invoice {} paid; income entry {}", invoice.number, entry.id);
        Ok(PaidInvoice {
            invoice: InvoiceWithItems { invoice, items },
            entry,
        })
    }

    /// Persist `overdue` on sent invoices past due. Returns how many changed.
    pub async fn refresh_overdue(&self) -> Result<u64, ApiError> {
        let result = sqlx::query(&self.schema.render(REFRESH_OVERDUE)).execute(self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn apply(&self, id: Uuid, action: InvoiceAction) -> Result<InvoiceWithItems, ApiError> {
        let today = Utc::now().date_naive();
        let mut tx = self.pool.begin().await?;
        let current = self.lock(&mut tx, id).await?;
        let to = transition(current.effective_status(today), action)?;

        let invoice: Invoice = sqlx::query_as(&tenant_sql(self.schema, SET_STATUS, Invoice::COLUMNS))
            .bind(id)
            .bind(to.as_str())
            .fetch_one(&mut *tx)
            .await?;
        let items = self.items(&mut tx, id).await?;
        tx.commit().await?;

        Ok(InvoiceWithItems {
            invoice: with_effective_status(invoice),
            items,
        })
    }

    async fn lock(&self, conn: &mut PgConnection, id: Uuid) -> Result<Invoice, ApiError> {
        sqlx::query_as(&tenant_sql(self.schema, LOCK, Invoice::COLUMNS))
            .bind(id)
            .fetch_optional(conn)
            .await?
            .ok_or_else(|| ApiError::not_found("Invoice not found"))
    }

    async fn items(&self, conn: &mut PgConnection, invoice_id: Uuid) -> Result<Vec<InvoiceItem>, ApiError> {
        let items = sqlx::query_as(&tenant_sql(self.schema, ITEMS, ITEM_COLUMNS))
            .bind(invoice_id)
            .fetch_all(conn)
            .await?;
        Ok(items)
    }

    async fn insert_items(
        &self,
        conn: &mut PgConnection,
        invoice_id: Uuid,
        items: &[PricedItem],
    ) -> Result<Vec<InvoiceItem>, ApiError> {
        let sql = tenant_sql(self.schema, INSERT_ITEM, ITEM_COLUMNS);
        let mut inserted = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            let row: InvoiceItem = sqlx::query_as(&sql)
                .bind(Uuid::new_v4())
                .bind(invoice_id)
                .bind(position as i32)
                .bind(&item.description)
                .bind(item.quantity)
                .bind(item.unit_price)
                .bind(item.amount)
                .fetch_one(&mut *conn)
                .await?;
            inserted.push(row);
        }
        Ok(inserted)
    }

    async fn check_client(&self, conn: &mut PgConnection, client_id: Uuid) -> Result<(), ApiError> {
        let exists: bool = sqlx::query_scalar(&self.schema.render(CLIENT_EXISTS))
            .bind(client_id)
            .fetch_one(conn)
            .await?;
        if !exists {
            return Err(ApiError::invalid_field("client_id", "Client not found"));
        }
        Ok(())
    }
}

fn with_effective_status(mut invoice: Invoice) -> Invoice {
    invoice.status = invoice.effective_status(Utc::now().date_naive());
    invoice
}

fn check_dates(issue_date: NaiveDate, due_date: NaiveDate) -> Result<(), ApiError> {
    if due_date < issue_date {
        return Err(ApiError::invalid_field("due_date", "Due date cannot be before the issue date"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn d(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(description: &str, quantity: &str, unit_price: &str) -> NewItem {
        NewItem {
            description: description.into(),
            quantity: d(quantity),
            unit_price: d(unit_price),
        }
    }

    #[test]
    fn totals_round_each_item() {
        let totals = compute_totals(
            &[item("Consultoria", "1.5", "333.33"), item("Petição", "1", "1200")],
            d("100"),
        )
        .unwrap();
        assert_eq!(totals.items[0].amount, d("500.00"));
        assert_eq!(totals.subtotal, d("1700.00"));
        assert_eq!(totals.total, d("1600.00"));
    }

    #[test]
    fn total_must_stay_positive() {
        let err = compute_totals(&[item("Parecer", "1", "50")], d("80")).unwrap_err();
        assert!(err.to_json()["field_errors"]["discount"].is_string());
        let err = compute_totals(&[item("Parecer", "1", "50")], d("50")).unwrap_err();
        assert!(err.to_json()["field_errors"]["discount"].is_string());
        let err = compute_totals(&[item("Cortesia", "1", "0")], Decimal::ZERO).unwrap_err();
        assert!(err.to_json()["field_errors"]["items"].is_string());

        let totals = compute_totals(&[item("Parecer", "1", "50")], d("49.99")).unwrap();
        assert_eq!(totals.total, d("0.01"));
    }

    #[test]
    fn quantity_is_rounded_before_pricing() {
        let totals = compute_totals(&[item("Horas", "1.0006", "1000")], Decimal::ZERO).unwrap();
        assert_eq!(totals.items[0].quantity, d("1.001"));
        assert_eq!(totals.items[0].amount, d("1001.00"));
        assert!(compute_totals(&[item("x", "0.0004", "10")], Decimal::ZERO).is_err());
    }

    #[test]
    fn item_rules() {
        assert!(compute_totals(&[], Decimal::ZERO).is_err());
        assert!(compute_totals(&[item("x", "0", "10")], Decimal::ZERO).is_err());
        assert!(compute_totals(&[item("x", "1", "-1")], Decimal::ZERO).is_err());
        assert!(compute_totals(&[item("  ", "1", "1")], Decimal::ZERO).is_err());
        assert!(compute_totals(&[item("x", "1", "1")], d("-0.01")).is_err());
    }

    #[test]
    fn numbers_are_year_prefixed_and_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 7, 15).unwrap();
        assert_eq!(format_number(date, 42), "2024-000042");
        assert_eq!(format_number(date, 1234567), "2024-1234567");
    }

    #[test]
    fn status_machine() {
        use InvoiceAction::*;
        use InvoiceStatus::*;
        assert_eq!(transition(Draft, Send).unwrap(), Sent);
        assert_eq!(transition(Sent, Pay).unwrap(), Paid);
        assert_eq!(transition(Overdue, Pay).unwrap(), Paid);
        assert_eq!(transition(Overdue, Cancel).unwrap(), Cancelled);
        assert_eq!(transition(Draft, Cancel).unwrap(), Cancelled);

        for (from, action) in [(Draft, Pay), (Paid, Cancel), (Paid, Pay), (Cancelled, Send), (Sent, Send)] {
            assert_eq!(transition(from, action).unwrap_err().status_code(), 409);
        }
    }

    #[test]
    fn effective_status_reports_overdue() {
        let today = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let mut invoice = Invoice {
            id: Uuid::new_v4(),
            number: "2024-000001".into(),
            client_id: Uuid::new_v4(),
            issue_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            due_date: NaiveDate::from_ymd_opt(2024, 5, 31).unwrap(),
            status: InvoiceStatus::Sent,
            subtotal: d("10"),
            discount: Decimal::ZERO,
            total: d("10"),
            notes: None,
            paid_at: None,
            created_by: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert_eq!(invoice.effective_status(today), InvoiceStatus::Overdue);
        invoice.status = InvoiceStatus::Draft;
        assert_eq!(invoice.effective_status(today), InvoiceStatus::Draft);
    }
}
