mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use serde_json::{json, Value};

use common::{authed, send};

fn decimal(value: &Value) -> Decimal {
    match value {
        Value::String(s) => s.parse().unwrap(),
        other => other.to_string().parse().unwrap(),
    }
}

#[tokio::test]
async fn simples_firms_get_402_for_finance() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "simples").await?;
    let client = Client::new();

    for path in ["/api/cash-flow", "/api/invoices", "/api/cash-flow/summary"] {
        let (status, body) = send(authed(client.get(server.url(path)), &firm.access_token)).await?;
        assert_eq!(status, StatusCode::PAYMENT_REQUIRED, "{}", path);
        assert_eq!(body["code"], "PLAN_UPGRADE_REQUIRED");
        assert_eq!(body["required_tier"], "composta");
    }

    let (status, _) = send(
        authed(client.post(server.url("/api/find/invoices")), &firm.access_token).json(&json!({})),
    )
    .await?;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);

    // dashboard omits the sections the plan does not include
    let (status, body) = send(authed(client.get(server.url("/api/dashboard")), &firm.access_token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"].get("finance").is_none());
    assert!(body["data"].get("billing").is_none());
    Ok(())
}

#[tokio::test]
async fn simples_firms_are_single_user() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "simples").await?;

    let (status, body) = send(
        authed(Client::new().post(server.url("/api/users")), &firm.access_token).json(&json!({
            "name": "Second Lawyer",
            "email": common::unique_email("member"),
            "password": "another long password",
        })),
    )
    .await?;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["required_tier"], "composta");
    Ok(())
}

#[tokio::test]
async fn paying_an_invoice_books_the_income() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let client = Client::new();
    let token = firm.access_token.as_str();

    let (_, body) = send(
        authed(client.post(server.url("/api/clients")), token)
            .json(&json!({ "kind": "company", "name": "Construtora Alfa" })),
    )
    .await?;
    let client_id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(authed(client.post(server.url("/api/invoices")), token).json(&json!({
        "client_id": client_id,
        "due_date": "2099-01-31",
        "discount": "100.00",
        "items": [
            { "description": "Honorários iniciais", "quantity": "1", "unit_price": "1500.00" },
            { "description": "Audiência", "quantity": "2", "unit_price": "250.00" }
        ]
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let invoice = &body["data"];
    assert_eq!(invoice["status"], "draft");
    assert_eq!(decimal(&invoice["total"]), Decimal::new(190000, 2));
    let id = invoice["id"].as_str().unwrap().to_string();

    // drafts cannot be paid
    let (status, _) = send(authed(client.post(server.url(&format!("/api/invoices/{}/pay", id))), token)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(authed(client.post(server.url(&format!("/api/invoices/{}/send", id))), token)).await?;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(authed(client.post(server.url(&format!("/api/invoices/{}/pay", id))), token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["invoice"]["status"], "paid");
    let entry = &body["data"]["entry"];
    assert_eq!(entry["kind"], "income");
    assert_eq!(entry["status"], "paid");
    assert_eq!(entry["invoice_id"], id.as_str());
    assert_eq!(decimal(&entry["amount"]), Decimal::new(190000, 2));

    // the linked entry is owned by the invoice
    let entry_path = format!("/api/cash-flow/{}", entry["id"].as_str().unwrap());
    let (status, _) = send(authed(client.delete(server.url(&entry_path)), token)).await?;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = send(authed(client.get(server.url("/api/cash-flow/summary")), token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(decimal(&body["data"]["income"]["paid"]), Decimal::new(190000, 2));
    // composta has no Reports feature, so no breakdown
    assert!(body["data"].get("by_category").is_none());
    Ok(())
}

#[tokio::test]
async fn gerencial_summary_includes_categories() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "gerencial").await?;
    let client = Client::new();

    let (status, _) = send(authed(client.post(server.url("/api/cash-flow")), &firm.access_token).json(&json!({
        "kind": "expense",
        "category": "aluguel",
        "description": "Aluguel do escritório",
        "amount": "3200.00",
        "due_date": "2099-02-10",
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(authed(client.get(server.url("/api/cash-flow/summary")), &firm.access_token)).await?;
    assert_eq!(status, StatusCode::OK);
    let categories = body["data"]["by_category"].as_array().unwrap();
    assert!(categories.iter().any(|c| c["category"] == "aluguel"));
    assert_eq!(decimal(&body["data"]["expense"]["pending"]), Decimal::new(320000, 2));
    Ok(())
}
