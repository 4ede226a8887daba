mod common;

use anyhow::Result;
use reqwest::{Client, StatusCode};
use serde_json::json;

use common::{authed, send};

#[tokio::test]
async fn publications_are_private_to_their_recipient() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let client = Client::new();
    let admin = firm.access_token.as_str();

    let member_email = common::unique_email("member");
    let member_password = "member long password";
    let (status, body) = send(authed(client.post(server.url("/api/users")), admin).json(&json!({
        "name": "Associate",
        "email": member_email,
        "password": member_password,
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["role"], "member");
    let member_id = body["data"]["id"].as_str().unwrap().to_string();
    let member = common::login(server, &member_email, member_password).await?;

    // admin delivers into the member's inbox and gets a receipt, not the content
    let (status, body) = send(authed(client.post(server.url("/api/publications")), admin).json(&json!({
        "user_id": member_id,
        "source": "DJe TJSP",
        "process_number": "0001234-56.2024.8.26.0100",
        "title": "Intimação",
        "content": "Fica a parte intimada para se manifestar em 15 dias.",
    })))
    .await?;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["data"].get("content").is_none());
    let publication_id = body["data"]["id"].as_str().unwrap().to_string();
    let path = format!("/api/publications/{}", publication_id);

    // the sender cannot read it back
    let (status, _) = send(authed(client.get(server.url(&path)), admin)).await?;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, body) = send(authed(client.get(server.url("/api/publications")), admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
    let (_, body) = send(authed(client.post(server.url("/api/find/publications")), admin).json(&json!({}))).await?;
    assert_eq!(body["data"]["total"], 0);

    // the recipient can
    let (_, body) = send(authed(client.get(server.url("/api/publications/unread-count")), &member)).await?;
    assert_eq!(body["data"]["unread"], 1);
    let (status, body) = send(authed(client.post(server.url(&format!("{}/read", path))), &member)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "read");
    assert!(body["data"]["read_at"].is_string());

    let (_, body) = send(authed(client.post(server.url("/api/find/publications")), &member).json(&json!({}))).await?;
    assert_eq!(body["data"]["total"], 1);

    // members cannot deliver to others
    let (status, _) = send(authed(client.post(server.url("/api/publications")), &member).json(&json!({
        "user_id": firm.user_id,
        "source": "DJe",
        "title": "x",
        "content": "y",
    })))
    .await?;
    assert_eq!(status, StatusCode::FORBIDDEN);
    Ok(())
}

#[tokio::test]
async fn deactivated_members_lose_access() -> Result<()> {
    let Some(server) = common::server_with_database().await? else { return Ok(()) };
    let firm = common::register_firm(server, "composta").await?;
    let client = Client::new();
    let admin = firm.access_token.as_str();

    let email = common::unique_email("leaver");
    let (_, body) = send(authed(client.post(server.url("/api/users")), admin).json(&json!({
        "name": "Leaver",
        "email": email,
        "password": "leaver long password",
    })))
    .await?;
    let member_id = body["data"]["id"].as_str().unwrap().to_string();
    let member = common::login(server, &email, "leaver long password").await?;

    let (status, _) = send(authed(client.get(server.url("/api/users")), &member)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(authed(client.delete(server.url(&format!("/api/users/{}", member_id))), admin)).await?;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["is_active"], false);

    // the still-valid JWT is refused once the account is inactive
    let (status, _) = send(authed(client.get(server.url("/api/clients")), &member)).await?;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // admins cannot lock themselves out
    let (status, _) = send(authed(client.delete(server.url(&format!("/api/users/{}", firm.user_id))), admin)).await?;
    assert_eq!(status, StatusCode::CONFLICT);
    Ok(())
}
