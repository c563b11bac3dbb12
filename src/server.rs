use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{rejection::QueryRejection, Path as AxumPath, Query, RawQuery, Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

use crate::assets::{self, UiSettings};
use crate::config::Config;
use crate::error::ConsoleError;
use crate::gate;
use crate::links::{normalize_path, validate_segments, CreateLinkRequest, NewLink};
use crate::relay::{AdminClient, BatchDeleteOutcome, UpstreamReply};
use crate::session::{self, AuthSettings};

/// Read-only state shared by every handler, built once at startup.
pub struct AppState {
    pub auth: AuthSettings,
    pub admin: Option<AdminClient>,
    pub ui: UiSettings,
    pub batch_concurrency: usize,
}

impl AppState {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            auth: AuthSettings::from_config(cfg),
            admin: AdminClient::from_config(cfg)?,
            ui: UiSettings::from_config(cfg),
            batch_concurrency: cfg.batch_concurrency.max(1),
        })
    }

    fn admin(&self) -> Result<&AdminClient, ConsoleError> {
        self.admin
            .as_ref()
            .ok_or(ConsoleError::Configuration("API_BASE_URL or ADMIN_TOKEN"))
    }
}

#[derive(Deserialize, Default)]
struct LoginRequest {
    #[serde(default)]
    password: String,
}

#[derive(Deserialize)]
struct PathQuery {
    path: Option<String>,
}

#[derive(Deserialize)]
struct BatchDeleteRequest {
    #[serde(default)]
    paths: Vec<String>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(serve_console))
        .route("/login", get(serve_login))
        .route("/assets/*file", get(serve_asset))
        .route("/api/auth/login", post(auth_login))
        .route("/api/auth/logout", post(auth_logout))
        .route("/api/auth/session", get(auth_session))
        .route(
            "/api/links",
            get(list_links).post(create_link).delete(delete_link_by_query),
        )
        .route("/api/links/*path", get(get_link).delete(delete_link))
        .route("/api/batch-delete", post(batch_delete))
        .fallback(fallback)
        .layer(middleware::from_fn(gate::access_gate))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

// ─── Pages ────────────────────────────────────────────────────────────────────

async fn serve_console(State(state): State<Arc<AppState>>) -> Response {
    assets::page("index.html", &state.ui)
}

async fn serve_login(State(state): State<Arc<AppState>>) -> Response {
    assets::page("login.html", &state.ui)
}

async fn serve_asset(AxumPath(file): AxumPath<String>) -> Response {
    assets::file(&file).unwrap_or_else(not_found)
}

/// Root-level bundled images (favicon, logo); everything else is a 404.
/// Page templates are only reachable through their own routes.
async fn fallback(request: Request) -> Response {
    let path = request.uri().path();
    if gate::is_root_image(path) {
        if let Some(resp) = assets::file(path.trim_start_matches('/')) {
            return resp;
        }
    }
    not_found()
}

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

// ─── Auth ─────────────────────────────────────────────────────────────────────

async fn auth_login(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    if state.auth.password.is_none() {
        tracing::error!("login attempted but CONSOLE_PASSWORD is not set");
        return ConsoleError::Configuration("CONSOLE_PASSWORD").into_response();
    }

    // An unreadable body is treated like an empty one.
    let req: LoginRequest = serde_json::from_slice(&body).unwrap_or_default();
    let password = req.password.trim();
    if password.is_empty() {
        return ConsoleError::validation("Password is required").into_response();
    }

    if !state.auth.accepts(password) {
        tracing::warn!("login rejected: incorrect password");
        return ConsoleError::Unauthorized("Incorrect password".to_string()).into_response();
    }

    tracing::info!("console login succeeded");
    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session::session_cookie(state.auth.secure_cookie),
        )],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn auth_logout(State(state): State<Arc<AppState>>) -> Response {
    (
        StatusCode::OK,
        [(
            header::SET_COOKIE,
            session::cleared_session_cookie(state.auth.secure_cookie),
        )],
        Json(json!({ "success": true })),
    )
        .into_response()
}

async fn auth_session(headers: HeaderMap) -> Response {
    if session::is_authenticated(&headers) {
        return Json(json!({ "authenticated": true })).into_response();
    }
    ConsoleError::Unauthorized("Not signed in".to_string()).into_response()
}

// ─── Link relay ───────────────────────────────────────────────────────────────

async fn list_links(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
) -> Result<UpstreamReply, ConsoleError> {
    state.admin()?.list(query.as_deref()).await
}

async fn create_link(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<UpstreamReply, ConsoleError> {
    let admin = state.admin()?;
    let link = NewLink::try_from(CreateLinkRequest::from_body(&body)?)?;
    let reply = admin.create(&link).await?;
    tracing::info!(path = %link.path, status = %reply.status, "create relayed");
    Ok(reply)
}

async fn get_link(
    State(state): State<Arc<AppState>>,
    AxumPath(raw): AxumPath<String>,
) -> Result<UpstreamReply, ConsoleError> {
    let admin = state.admin()?;
    let path = required_path(&raw)?;
    admin.get(&path).await
}

async fn delete_link(
    State(state): State<Arc<AppState>>,
    AxumPath(raw): AxumPath<String>,
) -> Result<UpstreamReply, ConsoleError> {
    let admin = state.admin()?;
    let path = required_path(&raw)?;
    relay_delete(admin, &path).await
}

async fn delete_link_by_query(
    State(state): State<Arc<AppState>>,
    query: Result<Query<PathQuery>, QueryRejection>,
) -> Result<UpstreamReply, ConsoleError> {
    let admin = state.admin()?;
    let Query(query) =
        query.map_err(|rejection| ConsoleError::validation(rejection.body_text()))?;
    let path = required_path(query.path.as_deref().unwrap_or_default())?;
    relay_delete(admin, &path).await
}

async fn relay_delete(admin: &AdminClient, path: &str) -> Result<UpstreamReply, ConsoleError> {
    let reply = admin.delete(path).await?;
    tracing::info!(%path, status = %reply.status, "delete relayed");
    Ok(reply)
}

async fn batch_delete(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<BatchDeleteOutcome>, ConsoleError> {
    let admin = state.admin()?;
    let req: BatchDeleteRequest = serde_json::from_slice(&body)
        .map_err(|_| ConsoleError::validation("body must be {\"paths\": [string]}"))?;
    if req.paths.is_empty() {
        return Err(ConsoleError::validation("paths is required"));
    }

    let outcome = admin
        .delete_many(&req.paths, state.batch_concurrency)
        .await;
    tracing::info!(
        succeeded = outcome.succeeded.len(),
        failed = outcome.failed.len(),
        "batch delete finished"
    );
    Ok(Json(outcome))
}

fn required_path(raw: &str) -> Result<String, ConsoleError> {
    let path = normalize_path(raw);
    if path.is_empty() {
        return Err(ConsoleError::validation("path is required"));
    }
    validate_segments(&path)?;
    Ok(path)
}
