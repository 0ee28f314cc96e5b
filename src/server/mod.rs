//! HTTP API for the mobile client.
//!
//! Exposes chat and statement-import endpoints behind CORS and a
//! sliding-window rate limiter, plus an unthrottled health check. The
//! reminder delivery loop also lives here, spawned alongside the server.

mod cors;
mod rate_limit;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::StatusCode,
    middleware,
    response::Json,
    routing::{get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use chrono::Utc;
use fiscus_core::config::ServerConfig;
use fiscus_core::prompt::Turn;
use fiscus_core::types::Message;
use fiscus_finance::StatementReader;
use fiscus_providers::Orchestrator;
use fiscus_schedule::reminders;
use fiscus_store::Store;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use rate_limit::Limiter;

/// Chat messages longer than this (after trim) are rejected.
const MAX_MESSAGE_CHARS: usize = 2000;
/// Conversation turns handed to the orchestrator as history.
const HISTORY_TURNS: usize = 10;
/// Statement uploads are capped at 10 MB.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

/// Shared state for API handlers.
#[derive(Clone)]
pub struct AppState {
    orchestrator: Arc<Orchestrator>,
    store: Store,
    reader: Arc<StatementReader>,
    config: ServerConfig,
    limiter: Limiter,
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    message: String,
}

#[derive(Debug, Deserialize)]
struct StatementRequest {
    filename: String,
    mime_type: String,
    content_base64: String,
}

/// `GET /health` — liveness probe, not rate-limited.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now(),
    }))
}

/// `POST /api/chat` — run one user message through the assistant.
async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Json(request) = body.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("invalid request: {e}")})),
        )
    })?;

    let message = request.message.trim().to_string();
    if message.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "message must not be empty"})),
        ));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("message exceeds {MAX_MESSAGE_CHARS} characters")})),
        ));
    }

    // History is best-effort: a store failure degrades to a fresh
    // conversation rather than a failed request.
    let history = match state.store.messages().await {
        Ok(messages) => {
            let skip = messages.len().saturating_sub(HISTORY_TURNS);
            messages
                .into_iter()
                .skip(skip)
                .map(|m| Turn {
                    role: if m.is_user { "user" } else { "assistant" }.to_string(),
                    text: m.text,
                })
                .collect()
        }
        Err(e) => {
            warn!("chat: failed to load history: {e}");
            Vec::new()
        }
    };

    let reply = state.orchestrator.process_user_input(&message, history).await;

    let pair = [
        Message::new(message, true),
        Message::new(reply.response.clone(), false),
    ];
    for msg in pair {
        if let Err(e) = state.store.append_message(msg).await {
            warn!("chat: failed to persist message: {e}");
        }
    }

    Ok(Json(json!({
        "response": reply.response,
        "provider": reply.provider,
        "intent": reply.intent,
    })))
}

/// `POST /api/files/statement` — extract transactions from an uploaded
/// statement and append them to the store.
async fn import_statement(
    State(state): State<AppState>,
    body: Result<Json<StatementRequest>, JsonRejection>,
) -> Result<Json<Value>, (StatusCode, Json<Value>)> {
    let Json(request) = body.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("invalid request: {e}")})),
        )
    })?;

    let content = BASE64.decode(&request.content_base64).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": format!("invalid base64 content: {e}")})),
        )
    })?;

    info!(
        "statement upload: {} ({}, {} bytes)",
        request.filename,
        request.mime_type,
        content.len()
    );

    let import = state
        .reader
        .import(&content, &request.mime_type)
        .await
        .map_err(|e| {
            (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": format!("statement import failed: {e}")})),
            )
        })?;

    let count = import.transactions.len();
    state
        .store
        .append_transactions(import.transactions.clone())
        .await
        .map_err(|e| {
            error!("statement import: failed to store transactions: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": "failed to store transactions"})),
            )
        })?;

    Ok(Json(json!({
        "transactions": import.transactions,
        "count": count,
        "bank_name": import.bank_name,
        "format": import.format,
        "confidence": import.confidence,
    })))
}

/// Build the axum router with shared state.
fn build_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/chat", post(chat))
        .route("/api/files/statement", post(import_statement))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::limit,
        ));

    Router::new()
        .route("/health", get(health))
        .merge(api)
        .layer(middleware::from_fn_with_state(state.clone(), cors::apply))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

/// Start the HTTP server. Runs until ctrl-c.
pub async fn serve(
    config: ServerConfig,
    orchestrator: Arc<Orchestrator>,
    store: Store,
) -> anyhow::Result<()> {
    let state = AppState {
        reader: Arc::new(StatementReader::new(orchestrator.primary())),
        orchestrator,
        store,
        limiter: Limiter::new(&config.rate_limit),
        config: config.clone(),
    };

    let app = build_router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("HTTP server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("shutdown signal received");
}

/// Background task: log due reminders and mark them sent.
pub async fn reminder_loop(store: Store, poll_secs: u64) {
    info!("reminder loop started (poll every {poll_secs}s)");
    loop {
        tokio::time::sleep(std::time::Duration::from_secs(poll_secs)).await;

        let mut events = match store.events().await {
            Ok(events) => events,
            Err(e) => {
                warn!("reminder loop: failed to load events: {e}");
                continue;
            }
        };

        let now = Utc::now();
        let mut dirty = false;
        for event in &mut events {
            for lead in reminders::due_leads(event, now) {
                info!(
                    "reminder: '{}' is {} away ({})",
                    event.title,
                    lead.label(),
                    event.date_time
                );
                reminders::mark_sent(event, lead);
                dirty = true;
            }
        }

        if dirty {
            if let Err(e) = store.save_events(&events).await {
                warn!("reminder loop: failed to save events: {e}");
            }
        }
    }
}
