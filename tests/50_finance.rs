mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};

use common::{authed, send, TestServer};

async fn create_client(server: &TestServer, token: &str, name: &str) -> Result<String> {
    let (status, body) = send(
        authed(Client::new().post(server.url("/api/clients")), token)
            .json(&json!({ "kind": "individual", "name": name, "document": "123.456.789-09" })),
    )
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    Ok(body["data"]["id"].as_str().unwrap().to_string())
}

async fn find(server: &TestServer, token: &str, resource: &str, filter: Value) -> Result<(StatusCode, Value)> {
    send(authed(Client::new().post(server.url(&format!("/api/find/{}", resource))), token).json(&filter)).await
}

#[tokio::test]
async fn invoices_must_be_worth_something() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let token = firm.access_token.as_str();
    let client_id = create_client(server, token, "Carla Mendes").await?;

    let (status, body) = send(authed(Client::new().post(server.url("/api/invoices")), token).json(&json!({
        "client_id": client_id,
        "due_date": "2099-03-31",
        "discount": "80.00",
        "items": [{ "description": "Parecer", "quantity": "1", "unit_price": "50.00" }]
    })))
    .await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["field_errors"]["discount"].is_string());
    Ok(())
}

#[tokio::test]
async fn past_due_invoices_report_and_filter_as_overdue() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let client = Client::new();
    let token = firm.access_token.as_str();
    let client_id = create_client(server, token, "Roberto Dias").await?;

    let (status, body) = send(authed(client.post(server.url("/api/invoices")), token).json(&json!({
        "client_id": client_id,
        "issue_date": "2020-01-01",
        "due_date": "2020-01-31",
        "items": [{ "description": "Sustentação oral", "quantity": "1", "unit_price": "800.00" }]
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(authed(client.post(server.url(&format!("/api/invoices/{}/send", id))), token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "overdue");

    // list and find agree on the reported status
    let (_, body) = send(authed(client.get(server.url("/api/invoices?status=overdue")), token)).await?;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let (_, body) = send(authed(client.get(server.url("/api/invoices?status=sent")), token)).await?;
    assert!(body["data"].as_array().unwrap().is_empty());

    let (status, body) = find(server, token, "invoices", json!({ "where": { "status": "overdue" } })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["records"][0]["status"], "overdue");
    let (_, body) = find(server, token, "invoices", json!({ "where": { "status": "sent" } })).await?;
    assert_eq!(body["data"]["total"], 0);

    let refresh = server.url("/api/invoices/refresh-overdue");
    let (status, body) = send(authed(client.post(&refresh), token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["updated"], 1);
    let (_, body) = send(authed(client.post(&refresh), token)).await?;
    assert_eq!(body["data"]["updated"], 0);

    // overdue invoices can still be paid, and the booked entry belongs to the invoice
    let (status, body) = send(authed(client.post(server.url(&format!("/api/invoices/{}/pay", id))), token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["invoice"]["status"], "paid");
    let entry_path = format!("/api/cash-flow/{}", body["data"]["entry"]["id"].as_str().unwrap());

    let (status, _) = send(authed(client.patch(server.url(&entry_path)), token).json(&json!({ "amount": "1.00" }))).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    let (status, _) = send(authed(client.delete(server.url(&entry_path)), token)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}

#[tokio::test]
async fn leaving_paid_clears_paid_at() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let client = Client::new();
    let token = firm.access_token.as_str();

    let (status, body) = send(authed(client.post(server.url("/api/cash-flow")), token).json(&json!({
        "kind": "expense",
        "category": "custas",
        "description": "Guia de recolhimento",
        "amount": "35.90",
        "due_date": "2099-05-10",
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    let path = format!("/api/cash-flow/{}", body["data"]["id"].as_str().unwrap());

    let (status, body) = send(authed(client.post(server.url(&format!("{}/pay", path))), token)).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["paid_at"].is_string());

    let (status, body) = send(authed(client.patch(server.url(&path)), token).json(&json!({ "status": "pending" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "pending");
    assert!(body["data"]["paid_at"].is_null());

    // only the pay operation enters `paid`
    let (status, _) = send(authed(client.patch(server.url(&path)), token).json(&json!({ "status": "paid" }))).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn malformed_filter_values_are_bad_requests() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let token = firm.access_token.as_str();

    let (status, _) = find(server, token, "clients", json!({ "where": { "id": "abc" } })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = find(server, token, "cash_flow", json!({ "where": { "due_date": "31/12/2024" } })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, _) = find(server, token, "invoices", json!({ "where": { "total": { "$gt": "lots" } } })).await?;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = find(server, token, "cash_flow", json!({ "where": { "due_date": { "$gte": "2024-01-01" } } })).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["total"], 0);
    Ok(())
}

#[tokio::test]
async fn null_clears_optional_client_fields() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "simples").await?;
    let token = firm.access_token.as_str();
    let client_id = create_client(server, token, "Helena Prado").await?;
    let path = server.url(&format!("/api/clients/{}", client_id));

    let (status, body) = send(authed(Client::new().patch(&path), token).json(&json!({ "notes": "Indicação" }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["document"], "12345678909");

    let (status, body) = send(authed(Client::new().patch(&path), token).json(&json!({ "document": null }))).await?;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["document"].is_null());
    assert_eq!(body["data"]["notes"], "Indicação");
    Ok(())
}

#[tokio::test]
async fn composta_firms_hold_five_active_users() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let client = Client::new();
    let token = firm.access_token.as_str();

    let add_member = |n: usize| {
        authed(client.post(server.url("/api/users")), token).json(&json!({
            "name": format!("Associate {}", n),
            "email": common::unique_email("associate"),
            "password": "another long password",
        }))
    };

    // the admin holds the first seat
    let mut members = Vec::new();
    for n in 1..=4 {
        let (status, body) = send(add_member(n)).await?;
        assert_eq!(status, StatusCode::CREATED, "member {}", n);
        members.push(body["data"]["id"].as_str().unwrap().to_string());
    }

    let (status, body) = send(add_member(5)).await?;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    assert_eq!(body["required_tier"], "gerencial");

    // a deactivated member frees the seat, and cannot come back while it is taken
    let first = server.url(&format!("/api/users/{}", members[0]));
    let (status, _) = send(authed(client.delete(&first), token)).await?;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(add_member(6)).await?;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(authed(client.patch(&first), token).json(&json!({ "is_active": true }))).await?;
    assert_eq!(status, StatusCode::PAYMENT_REQUIRED);
    Ok(())
}
