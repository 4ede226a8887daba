#![allow(dead_code)]

use std::process::{Child, Command, Stdio};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};

static SERVER: OnceLock<TestServer> = OnceLock::new();

pub struct TestServer {
    pub port: u16,
    pub base_url: String,
    child: Child,
}

impl TestServer {
    fn spawn() -> Result<Self> {
        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let base_url = format!("http://127.0.0.1:{}", port);

        let mut cmd = Command::new(env!("CARGO_BIN_EXE_lawdesk-api"));
        cmd.env("LAWDESK_API_PORT", port.to_string())
            .env("TENANCY_ALLOW_PUBLIC_SIGNUP", "true")
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());

        // Inherit environment so the server can see DATABASE_URL and JWT_SECRET
        let child = cmd.spawn().context("failed to spawn server binary")?;

        Ok(Self { port, base_url, child })
    }

    async fn wait_ready(&self, timeout: Duration) -> Result<StatusCode> {
        let client = Client::new();
        let deadline = Instant::now() + timeout;
        loop {
            if Instant::now() > deadline {
                break;
            }
            if let Ok(resp) = client.get(format!("{}/health", self.base_url)).send().await {
                let status = resp.status();
                if status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE {
                    return Ok(status);
                }
            }
            tokio::time::sleep(Duration::from_millis(150)).await;
        }
        anyhow::bail!("server did not become ready on {} within {:?}", self.base_url, timeout)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

pub async fn ensure_server() -> Result<&'static TestServer> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    server.wait_ready(Duration::from_secs(10)).await?;
    Ok(server)
}

/// The running server when it has a reachable database, `None` otherwise.
/// Tests that need data return early on `None`.
pub async fn server_with_database() -> Result<Option<&'static TestServer>> {
    let server = SERVER.get_or_init(|| TestServer::spawn().expect("failed to spawn server binary"));
    match server.wait_ready(Duration::from_secs(10)).await? {
        StatusCode::OK => Ok(Some(server)),
        _ => {
            eprintln!("skipping: database unavailable");
            Ok(None)
        }
    }
}

/// A freshly registered firm and its admin session
pub struct Firm {
    pub tenant_id: String,
    pub user_id: String,
    pub email: String,
    pub password: String,
    pub access_token: String,
    pub refresh_token: String,
}

pub fn unique_email(prefix: &str) -> String {
    format!("{}-{}@example.com", prefix, uuid::Uuid::new_v4().simple())
}

pub async fn register_firm(server: &TestServer, tier: &str) -> Result<Firm> {
    let email = unique_email("admin");
    let password = "correct horse battery".to_string();
    let res = Client::new()
        .post(server.url("/auth/register"))
        .json(&json!({
            "firm_name": format!("Firm {}", uuid::Uuid::new_v4().simple()),
            "tier": tier,
            "name": "Firm Admin",
            "email": email,
            "password": password,
        }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::CREATED, "register failed: {}", res.status());

    let body: Value = res.json().await?;
    let data = &body["data"];
    Ok(Firm {
        tenant_id: data["tenant"]["id"].as_str().context("tenant id")?.to_string(),
        user_id: data["user"]["id"].as_str().context("user id")?.to_string(),
        email,
        password,
        access_token: data["access_token"].as_str().context("access token")?.to_string(),
        refresh_token: data["refresh_token"].as_str().context("refresh token")?.to_string(),
    })
}

/// Log in and return the access token
pub async fn login(server: &TestServer, email: &str, password: &str) -> Result<String> {
    let res = Client::new()
        .post(server.url("/auth/login"))
        .json(&json!({ "email": email, "password": password }))
        .send()
        .await?;
    anyhow::ensure!(res.status() == StatusCode::OK, "login failed: {}", res.status());
    let body: Value = res.json().await?;
    Ok(body["data"]["access_token"].as_str().context("access token")?.to_string())
}

pub fn authed(builder: RequestBuilder, token: &str) -> RequestBuilder {
    builder.bearer_auth(token)
}

/// Send and return status plus JSON body (`Value::Null` for empty bodies)
pub async fn send(builder: RequestBuilder) -> Result<(StatusCode, Value)> {
    let res = builder.send().await?;
    let status = res.status();
    let text = res.text().await?;
    let body = if text.is_empty() { Value::Null } else { serde_json::from_str(&text)? };
    Ok((status, body))
}
