//! HTTP + WebSocket API for trustgate
//!
//! Endpoints:
//! - POST /session/new - Start a verification session
//! - GET /session/{id} - Current trust + state
//! - POST /session/{id}/reading - Submit a producer reading
//! - POST /session/{id}/reauth - Report re-authentication success
//! - DELETE /session/{id} - Stop the session
//! - WS /ws/{id} - Live decisions
//! - GET /health - Health check

use axum::{
    extract::{Path, State, WebSocketUpgrade, ws::{Message, WebSocket}},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

use crate::core::{LatestReadings, VerificationHandle, VerificationLoop};
use crate::types::{AccessState, SignalReading, TrustConfig, TrustDecision, TrustResult};

/// Live session: its verification loop and the slots producers write into
pub struct Session {
    pub id: String,
    pub handle: VerificationHandle,
    pub producer: Arc<LatestReadings>,
    pub created_at: DateTime<Utc>,
}

/// Shared router state
pub struct AppState {
    pub sessions: RwLock<HashMap<String, Session>>,
    pub config: TrustConfig,
    session_counter: AtomicU64,
}

/// Reply to POST /session/new
#[derive(Debug, Serialize, Deserialize)]
pub struct NewSessionResponse {
    pub session_id: String,
    pub websocket_url: String,
}

/// Reply to GET /session/{id}
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionStatusResponse {
    pub session_id: String,
    pub state: AccessState,
    pub trust: Option<f64>,
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub running: bool,
}

/// Health response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub sessions_active: usize,
}

/// Create the API router. All sessions share one validated config.
pub fn create_router(config: TrustConfig) -> TrustResult<Router> {
    config.validate()?;

    let state = Arc::new(AppState {
        sessions: RwLock::new(HashMap::new()),
        config,
        session_counter: AtomicU64::new(0),
    });

    Ok(Router::new()
        .route("/health", get(health))
        .route("/session/new", post(create_session))
        .route("/session/:id", get(get_session).delete(delete_session))
        .route("/session/:id/reading", post(submit_reading))
        .route("/session/:id/reauth", post(reauth))
        .route("/ws/:id", get(websocket_handler))
        .with_state(state))
}

async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let sessions = state.sessions.read().await;
    Json(HealthResponse {
        status: "ok".to_string(),
        version: crate::VERSION.to_string(),
        sessions_active: sessions.len(),
    })
}

/// Start a verification loop for a new session
async fn create_session(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NewSessionResponse>, StatusCode> {
    let seq = state.session_counter.fetch_add(1, Ordering::Relaxed);
    let session_id = generate_session_id(seq);
    let producer = Arc::new(LatestReadings::new());

    let handle = VerificationLoop::start(session_id.clone(), &state.config, producer.clone())
        .map_err(|e| {
            tracing::error!(error = %e, "failed to start verification loop");
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    let session = Session {
        id: session_id.clone(),
        handle,
        producer,
        created_at: Utc::now(),
    };

    let mut sessions = state.sessions.write().await;
    sessions.insert(session_id.clone(), session);
    tracing::info!(session_id = %session_id, "session created");

    Ok(Json(NewSessionResponse {
        session_id: session_id.clone(),
        websocket_url: format!("/ws/{}", session_id),
    }))
}

/// Latest snapshot of one session
async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let snapshot = session.handle.current_state();

    Ok(Json(SessionStatusResponse {
        session_id: session.id.clone(),
        state: snapshot.state,
        trust: snapshot.trust,
        timestamp: snapshot.timestamp,
        created_at: session.created_at,
        running: session.handle.is_running(),
    }))
}

/// Store a producer reading for the next tick
async fn submit_reading(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(reading): Json<SignalReading>,
) -> Result<StatusCode, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    session.producer.submit(reading);
    Ok(StatusCode::ACCEPTED)
}

/// Apply re-authentication success and return the resulting decision
async fn reauth(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrustDecision>, StatusCode> {
    let notifier = {
        let sessions = state.sessions.read().await;
        let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
        session.handle.reauth_notifier()
    };
    // Session lock released; the loop round-trip must not block writers
    let decision = notifier.reauth_success().await.map_err(|_| StatusCode::GONE)?;
    Ok(Json(decision))
}

/// Stop and remove a session
async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let session = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&id).ok_or(StatusCode::NOT_FOUND)?
    };
    session.handle.shutdown().await;
    tracing::info!(session_id = %id, "session removed");
    Ok(StatusCode::NO_CONTENT)
}

async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    ws: WebSocketUpgrade,
) -> Result<impl IntoResponse, StatusCode> {
    let sessions = state.sessions.read().await;
    let session = sessions.get(&id).ok_or(StatusCode::NOT_FOUND)?;
    let rx = session.handle.subscribe();
    drop(sessions);

    Ok(ws.on_upgrade(move |socket| async move {
        handle_websocket(socket, rx, id).await;
    }))
}

/// Forward decisions until the client leaves or the session ends
async fn handle_websocket(
    socket: WebSocket,
    mut rx: broadcast::Receiver<TrustDecision>,
    session_id: String,
) {
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            update = rx.recv() => match update {
                Ok(decision) => {
                    let json = serde_json::to_string(&decision).unwrap_or_default();
                    if sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(session_id = %session_id, skipped, "websocket subscriber lagging");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = sink.close().await;
}

fn generate_session_id(seq: u64) -> String {
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();
    format!("session_{:x}_{}", nanos, seq)
}

/// Run the API server until ctrl-c
pub async fn run_server(addr: &str, config: TrustConfig) -> Result<(), Box<dyn std::error::Error>> {
    let router = create_router(config)?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %addr, "trustgate API listening");
    println!("  POST   /session/new         - Start session");
    println!("  GET    /session/:id         - Current trust + state");
    println!("  POST   /session/:id/reading - Submit reading");
    println!("  POST   /session/:id/reauth  - Re-auth succeeded");
    println!("  DELETE /session/:id         - Stop session");
    println!("  WS     /ws/:id              - Live decisions");
    println!("  GET    /health              - Health check");
    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
