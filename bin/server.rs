// Hivemind - Web Server
// REST API with Axum over the live fleet

use anyhow::Context;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use hivemind::{
    setup_database, Config, EntitySnapshot, Fleet, StateError, StatePeriod, TransitionContext,
    TransitionRecord,
};

/// Shared application state
#[derive(Clone)]
struct AppState {
    fleet: Arc<Mutex<Fleet>>,
    db: Arc<Mutex<Connection>>,
    actor: String,
}

/// API Response wrapper
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    fn ok(data: T) -> Response {
        (
            StatusCode::OK,
            Json(ApiResponse {
                success: true,
                data: Some(data),
                error: None,
            }),
        )
            .into_response()
    }
}

fn failure(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ApiResponse::<()> {
            success: false,
            data: None,
            error: Some(message.into()),
        }),
    )
        .into_response()
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, Response> {
    mutex.lock().map_err(|_| {
        error!("shared state poisoned");
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Shared state unavailable")
    })
}

/// History response
#[derive(Serialize)]
struct HistoryResponse {
    kind: String,
    id: String,
    initial_state: String,
    started_at: DateTime<Utc>,
    transitions: Vec<TransitionRecord>,
    periods: Vec<StatePeriod>,
}

/// Transition response
#[derive(Serialize)]
struct TransitionResponse {
    changed: bool,
    entity: EntitySnapshot,
}

/// Optional query of POST /api/entities/:kind/state/:state
#[derive(Deserialize)]
struct TransitionQuery {
    reason: Option<String>,
    actor: Option<String>,
}

// ============================================================================
// API Handlers
// ============================================================================

/// GET /api/health - Health check
async fn health_check() -> Response {
    ApiResponse::ok("OK")
}

/// GET /api/entities - Snapshot of every entity
async fn list_entities(State(state): State<AppState>) -> Response {
    let fleet = match lock(&state.fleet) {
        Ok(fleet) => fleet,
        Err(response) => return response,
    };

    let snapshots: Vec<EntitySnapshot> = fleet.entities().iter().map(|e| e.snapshot()).collect();
    ApiResponse::ok(snapshots)
}

/// GET /api/entities/:kind - Snapshot of one entity
async fn get_entity(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let fleet = match lock(&state.fleet) {
        Ok(fleet) => fleet,
        Err(response) => return response,
    };

    match fleet.entity(&kind) {
        Some(entity) => ApiResponse::ok(entity.snapshot()),
        None => failure(StatusCode::NOT_FOUND, format!("Unknown entity kind '{}'", kind)),
    }
}

/// GET /api/entities/:kind/history - Transition log of one entity
async fn get_history(State(state): State<AppState>, Path(kind): Path<String>) -> Response {
    let fleet = match lock(&state.fleet) {
        Ok(fleet) => fleet,
        Err(response) => return response,
    };

    let Some(entity) = fleet.entity(&kind) else {
        return failure(StatusCode::NOT_FOUND, format!("Unknown entity kind '{}'", kind));
    };

    let log = entity.history();
    ApiResponse::ok(HistoryResponse {
        kind: entity.kind().to_string(),
        id: entity.id().to_string(),
        initial_state: log.initial_state().to_string(),
        started_at: log.started_at(),
        transitions: log.records().to_vec(),
        periods: log.periods(),
    })
}

/// POST /api/entities/:kind/state/:state - Change state and record it
async fn change_state(
    State(state): State<AppState>,
    Path((kind, target)): Path<(String, String)>,
    Query(query): Query<TransitionQuery>,
) -> Response {
    let mut fleet = match lock(&state.fleet) {
        Ok(fleet) => fleet,
        Err(response) => return response,
    };
    let conn = match lock(&state.db) {
        Ok(conn) => conn,
        Err(response) => return response,
    };

    if fleet.entity(&kind).is_none() {
        return failure(StatusCode::NOT_FOUND, format!("Unknown entity kind '{}'", kind));
    }

    let mut ctx = TransitionContext::new(query.actor.unwrap_or_else(|| state.actor.clone()));
    if let Some(reason) = query.reason {
        ctx = ctx.with_reason(reason);
    }

    match fleet.transition(&conn, &kind, &target, &ctx) {
        Ok(changed) => match fleet.entity(&kind) {
            Some(entity) => ApiResponse::ok(TransitionResponse {
                changed,
                entity: entity.snapshot(),
            }),
            None => failure(StatusCode::NOT_FOUND, format!("Unknown entity kind '{}'", kind)),
        },
        Err(e) => match e.downcast_ref::<StateError>() {
            Some(StateError::UnknownState { .. }) => {
                warn!(kind = %kind, state = %target, "unknown state requested");
                failure(StatusCode::BAD_REQUEST, e.to_string())
            }
            Some(_) => {
                warn!(kind = %kind, state = %target, "transition rejected");
                failure(StatusCode::CONFLICT, e.to_string())
            }
            None => {
                error!(kind = %kind, state = %target, "transition failed: {:#}", e);
                failure(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e))
            }
        },
    }
}

// ============================================================================
// Main Server
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🌐 Hivemind - Web Server");

    let config = Config::from_env()?;
    let conn = Connection::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path.display()))?;
    setup_database(&conn)?;
    info!(path = %config.database_path.display(), "database opened");

    let fleet = Fleet::open(&conn, &config)?;

    // Create shared state
    let state = AppState {
        fleet: Arc::new(Mutex::new(fleet)),
        db: Arc::new(Mutex::new(conn)),
        actor: config.actor.clone(),
    };

    // Build API routes
    let api_routes = Router::new()
        .route("/health", get(health_check))
        .route("/entities", get(list_entities))
        .route("/entities/:kind", get(get_entity))
        .route("/entities/:kind/history", get(get_history))
        .route("/entities/:kind/state/:state", post(change_state))
        .with_state(state);

    // Build main router
    let app = Router::new()
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive());

    // Start server
    let addr = "0.0.0.0:3000";
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {}", addr))?;

    info!("🚀 Server running on http://localhost:3000 (API under /api/entities)");

    axum::serve(listener, app).await.context("Server stopped")?;
    Ok(())
}
