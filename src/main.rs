use axum::{middleware::from_fn, routing::get, Router};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};
use tracing_subscriber::EnvFilter;

use lawdesk_api::config;
use lawdesk_api::database::{migrations, DatabaseManager};
use lawdesk_api::handlers;
use lawdesk_api::middleware::{jwt_auth_middleware, require_root_middleware, validate_tenant_middleware};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::config();
    tracing::info!("Starting lawdesk-api in {:?} mode", config.environment);

    // The registry tables must exist before the first request; tenant schemas are
    // migrated explicitly with `lawdesk migrate`
    if std::env::var("DATABASE_URL").is_ok() {
        match DatabaseManager::pool().await {
            Ok(pool) => migrations::run_main(&pool).await?,
            Err(e) => tracing::warn!("Database unavailable at startup: {}", e),
        }
    } else {
        tracing::warn!("DATABASE_URL is not set; database routes will answer 503");
    }

    let bind_addr = format!("0.0.0.0:{}", config.api.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("lawdesk-api listening on http://{}", bind_addr);

    axum::serve(listener, app())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    DatabaseManager::close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

fn app() -> Router {
    let config = config::config();

    Router::new()
        // Public
        .route("/", get(root))
        .route("/health", get(health))
        .merge(auth_public_routes())
        // Authenticated, no firm context required
        .merge(auth_routes())
        // Firm data
        .merge(protected_routes())
        // Platform administration
        .merge(root_routes())
        // Global middleware
        .layer(RequestBodyLimitLayer::new(config.api.max_request_size_bytes))
        .layer(cors_layer(&config.security.cors_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let parsed: Vec<_> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(parsed))
}

fn auth_public_routes() -> Router {
    use axum::routing::post;
    use handlers::public::auth;

    Router::new()
        .route("/auth/register", post(auth::register_post))
        .route("/auth/login", post(auth::login_post))
        .route("/auth/refresh", post(auth::refresh_post))
}

fn auth_routes() -> Router {
    use axum::routing::post;
    use handlers::protected::auth;

    Router::new()
        .route("/api/auth/whoami", get(auth::session_whoami))
        .route("/api/auth/logout", post(auth::session_logout))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn protected_routes() -> Router {
    use axum::routing::{patch, post};
    use handlers::protected::{cash_flow, clients, dashboard, find, invoices, projects, publications, tasks, users};

    Router::new()
        // CRM
        .route("/api/clients", get(clients::list).post(clients::create))
        .route(
            "/api/clients/:id",
            get(clients::get).patch(clients::update).delete(clients::delete),
        )
        // Matters and tasks
        .route("/api/projects", get(projects::list).post(projects::create))
        .route(
            "/api/projects/:id",
            get(projects::get).patch(projects::update).delete(projects::delete),
        )
        .route("/api/tasks", get(tasks::list).post(tasks::create))
        .route("/api/tasks/:id", get(tasks::get).patch(tasks::update).delete(tasks::delete))
        .route("/api/tasks/:id/status", patch(tasks::change_status))
        // Cash flow
        .route("/api/cash-flow", get(cash_flow::list).post(cash_flow::create))
        .route("/api/cash-flow/summary", get(cash_flow::summary))
        .route(
            "/api/cash-flow/:id",
            get(cash_flow::get).patch(cash_flow::update).delete(cash_flow::delete),
        )
        .route("/api/cash-flow/:id/pay", post(cash_flow::pay))
        // Billing
        .route("/api/invoices", get(invoices::list).post(invoices::create))
        .route("/api/invoices/refresh-overdue", post(invoices::refresh_overdue))
        .route(
            "/api/invoices/:id",
            get(invoices::get).patch(invoices::update).delete(invoices::delete),
        )
        .route("/api/invoices/:id/send", post(invoices::send))
        .route("/api/invoices/:id/cancel", post(invoices::cancel))
        .route("/api/invoices/:id/pay", post(invoices::pay))
        // Publications (always the caller's own inbox)
        .route("/api/publications", get(publications::list).post(publications::create))
        .route("/api/publications/unread-count", get(publications::unread_count))
        .route(
            "/api/publications/:id",
            get(publications::get).delete(publications::delete),
        )
        .route("/api/publications/:id/read", post(publications::mark_read))
        .route("/api/publications/:id/unread", post(publications::mark_unread))
        .route("/api/publications/:id/archive", post(publications::archive))
        // Find, dashboard, team
        .route("/api/find/:resource", post(find::find_post))
        .route("/api/dashboard", get(dashboard::dashboard_get))
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/:id", patch(users::update).delete(users::delete))
        // Layers run bottom-up: JWT first, then the tenant binding
        .route_layer(from_fn(validate_tenant_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

fn root_routes() -> Router {
    use axum::routing::post;
    use handlers::elevated::root::tenant;

    Router::new()
        .route("/api/root/tenant", get(tenant::tenant_list).post(tenant::tenant_create))
        .route(
            "/api/root/tenant/:id",
            get(tenant::tenant_show)
                .patch(tenant::tenant_update)
                .delete(tenant::tenant_delete),
        )
        .route("/api/root/tenant/:id/restore", post(tenant::tenant_restore))
        .route("/api/root/tenant/:id/health", get(tenant::tenant_health))
        .route("/api/root/tenant/:id/migrate", post(tenant::tenant_migrate))
        .route_layer(from_fn(require_root_middleware))
        .route_layer(from_fn(jwt_auth_middleware))
}

async fn root() -> axum::response::Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    axum::response::Json(json!({
        "success": true,
        "data": {
            "name": "lawdesk-api",
            "version": version,
            "description": "Multi-tenant legal practice backend",
            "endpoints": {
                "home": "/ (public)",
                "health": "/health (public)",
                "public_auth": "/auth/register, /auth/login, /auth/refresh (public - token acquisition)",
                "auth": "/api/auth/whoami, /api/auth/logout (protected)",
                "crm": "/api/clients[/:id] (protected)",
                "projects": "/api/projects[/:id], /api/tasks[/:id] (protected)",
                "cash_flow": "/api/cash-flow[/:id], /api/cash-flow/summary (composta+)",
                "billing": "/api/invoices[/:id] (composta+)",
                "publications": "/api/publications[/:id] (protected, per user)",
                "find": "/api/find/:resource (protected)",
                "dashboard": "/api/dashboard (protected)",
                "team": "/api/users[/:id] (firm admin)",
                "root": "/api/root/tenant[/:id] (platform root)",
            }
        }
    }))
}

async fn health() -> impl axum::response::IntoResponse {
    let now = chrono::Utc::now();

    match DatabaseManager::health_check().await {
        Ok(_) => (
            axum::http::StatusCode::OK,
            axum::response::Json(json!({
                "success": true,
                "data": {
                    "status": "ok",
                    "timestamp": now,
                    "database": "ok"
                }
            })),
        ),
        Err(e) => {
            tracing::warn!("Health check failed: {}", e);
            (
                axum::http::StatusCode::SERVICE_UNAVAILABLE,
                axum::response::Json(json!({
                    "success": false,
                    "error": "database unavailable",
                    "data": {
                        "status": "degraded",
                        "timestamp": now,
                    }
                })),
            )
        }
    }
}
