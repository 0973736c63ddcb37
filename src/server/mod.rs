use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use uuid::Uuid;

use crate::apply::EditApplicator;
use crate::errors::SiteError;
use crate::generate::Generator;
use crate::preview;
use crate::prompt::GenerationBrief;
use crate::store::SiteStore;
use crate::wire::{EditRequest, ElementEdit, GenerateRequest, GeneratedSite};

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SiteStore>,
    pub generator: Arc<Generator>,
    pub applicator: Arc<dyn EditApplicator>,
    /// Hides diagnostic chains from error bodies.
    pub production: bool,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: Value,
}

impl ApiError {
    fn bad_request(message: &str) -> Self {
        Self { status: StatusCode::BAD_REQUEST, body: json!({ "error": message }) }
    }

    fn not_found(message: &str) -> Self {
        Self { status: StatusCode::NOT_FOUND, body: json!({ "error": message }) }
    }

    fn generation_failed(err: &SiteError, production: bool) -> Self {
        let mut body = json!({
            "error": "Failed to generate website",
            "details": err.to_string(),
        });
        if !production {
            body["stack"] = Value::String(format!("{err:?}"));
        }
        Self { status: StatusCode::INTERNAL_SERVER_ERROR, body }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

pub fn build_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/website", get(list_sites))
        .route("/api/website/generate", post(generate))
        .route("/api/website/:id", get(get_site))
        .route("/api/website/:id/page/:page", get(get_page))
        .route("/api/website/:id/preview/:page", get(preview_page))
        .route("/api/website/:id/edit", post(save_edit).put(save_edit))
        .with_state(state)
        .layer(TimeoutLayer::new(request_timeout))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub async fn serve(addr: &str, state: AppState, request_timeout: Duration) -> anyhow::Result<()> {
    let router = build_router(state, request_timeout);
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "backend server listening");
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    info!("backend server exited");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = signal::ctrl_c().await;
    };
    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        if let Ok(mut stream) = signal(SignalKind::terminate()) {
            let _ = stream.recv().await;
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "OK", "timestamp": Utc::now().to_rfc3339() }))
}

fn find_site(state: &AppState, id: &str) -> Result<GeneratedSite, ApiError> {
    Uuid::parse_str(id)
        .ok()
        .and_then(|id| state.store.get(id))
        .ok_or_else(|| ApiError::not_found("Website not found"))
}

async fn list_sites(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "success": true, "websites": state.store.list() }))
}

async fn generate(
    State(state): State<AppState>,
    Json(req): Json<GenerateRequest>,
) -> Result<Json<Value>, ApiError> {
    if req.description.trim().is_empty() {
        return Err(ApiError::bad_request("Description is required"));
    }
    info!(description = %req.description, "generating website");

    let brief = GenerationBrief::from(&req);
    let site = state.generator.generate(&brief).await.map_err(|e| {
        error!(error = %e, "generation failed");
        ApiError::generation_failed(&e, state.production)
    })?;

    let summary = site.summary();
    state.store.save(site);
    Ok(Json(json!({ "success": true, "website": summary })))
}

async fn get_site(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let site = find_site(&state, &id)?;
    let edits = state.store.get_edits(site.id);
    Ok(Json(json!({ "success": true, "website": site, "edits": edits })))
}

async fn get_page(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let site = find_site(&state, &id)?;
    let content = site.pages.get(&page).ok_or_else(|| ApiError::not_found("Page not found"))?;
    let edits = state.store.get_edits(site.id);
    let content = state.applicator.apply_edits(content, &edits);
    Ok(Json(json!({ "success": true, "content": content, "styles": site.styles })))
}

async fn preview_page(
    State(state): State<AppState>,
    Path((id, page)): Path<(String, String)>,
) -> Result<Response, ApiError> {
    let site = find_site(&state, &id)?;
    let key = preview::resolve_page_key(&page, &site.pages)
        .ok_or_else(|| ApiError::not_found("Page not found"))?;
    let edits = state.store.get_edits(site.id);
    let doc = preview::render_document(&site, &key, &edits, state.applicator.as_ref())
        .ok_or_else(|| ApiError::not_found("Page not found"))?;
    Ok(([(header::CONTENT_TYPE, "text/html; charset=utf-8")], doc).into_response())
}

async fn save_edit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(req): Json<EditRequest>,
) -> Result<Json<Value>, ApiError> {
    let site = find_site(&state, &id)?;
    if req.element_id.trim().is_empty() {
        return Err(ApiError::bad_request("elementId is required"));
    }
    info!(site = %site.id, element = %req.element_id, "saving edit");
    state.store.save_edit(ElementEdit {
        site_id: site.id,
        element_id: req.element_id,
        content: req.content,
        styles: req.styles,
    });
    Ok(Json(json!({ "success": true })))
}
