//! HTTP-Routen fuer Kollab
//!
//! - `POST /sessions`      – Sitzung anlegen
//! - `GET  /sessions/:id`  – Sitzung nachschlagen
//! - `GET  /ws/:id`        – WebSocket-Relay-Kanal
//! - `GET  /healthz`       – Health-Check
//! - `GET  /metrics`       – Prometheus (abschaltbar)
//! - `/api/*`, `/ws`       – immer 404, nie das Frontend
//! - alles andere          – gebautes Frontend, falls vorhanden

use std::path::Path as FsPath;
use std::sync::Arc;

use axum::{
    extract::{Path, State, WebSocketUpgrade},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::{any, get, post},
    Router,
};
use kollab_core::SessionId;
use kollab_observability::{health_router, metrics_router, timing_middleware};
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::connection::RelayVerbindung;
use crate::error::RelayResult;
use crate::server_state::RelayState;
use crate::verzeichnis::SitzungsInfo;

/// Request-Body fuer `POST /sessions`
#[derive(Debug, Deserialize)]
pub struct SitzungErstellenBody {
    pub name: String,
}

/// Erstellt den vollstaendigen Router inklusive Middleware
pub fn router(state: Arc<RelayState>) -> Router {
    let api = Router::new()
        .route("/sessions", post(sitzung_erstellen))
        .route("/sessions/:id", get(sitzung_abrufen))
        .route("/ws/:id", get(ws_upgrade))
        // API- und WebSocket-Pfade nie an das Frontend durchreichen
        .route("/api", any(nicht_gefunden))
        .route("/api/*rest", any(nicht_gefunden))
        .route("/ws", any(nicht_gefunden))
        .route("/ws/", any(nicht_gefunden))
        .route("/ws/:id/*rest", any(nicht_gefunden))
        .with_state(Arc::clone(&state));

    let mut app = api.merge(health_router());

    if state.config.metriken_aktiviert {
        app = app.merge(metrics_router(state.metriken.clone()));
    }

    if let Some(dist) = state.config.dist_pfad.as_deref() {
        if dist.is_dir() {
            tracing::info!(pfad = %dist.display(), "Frontend wird ausgeliefert");
            app = app.fallback_service(frontend_dienst(dist));
        } else {
            tracing::warn!(pfad = %dist.display(), "Frontend-Verzeichnis fehlt, nur API aktiv");
        }
    }

    app.layer(axum::middleware::from_fn_with_state(
        state.metriken.clone(),
        timing_middleware,
    ))
    .layer(TraceLayer::new_for_http())
    .layer(cors_layer(&state.config.cors_origins))
}

/// Statische Dateien mit `index.html` als Fallback fuer Client-Routing
fn frontend_dienst(dist: &FsPath) -> ServeDir<ServeFile> {
    ServeDir::new(dist).fallback(ServeFile::new(dist.join("index.html")))
}

/// CORS: entweder spezifische Origins oder alles erlauben
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(tower_http::cors::Any)
}

/// `POST /sessions` – legt eine Sitzung an
async fn sitzung_erstellen(
    State(state): State<Arc<RelayState>>,
    Json(body): Json<SitzungErstellenBody>,
) -> Json<SitzungsInfo> {
    let info = state.verzeichnis.erstellen(body.name);
    state.metriken.sitzungen.set(state.verzeichnis.anzahl() as i64);
    Json(info)
}

/// `GET /sessions/:id` – schlaegt eine Sitzung nach
async fn sitzung_abrufen(
    State(state): State<Arc<RelayState>>,
    Path(id): Path<String>,
) -> RelayResult<Json<SitzungsInfo>> {
    state.verzeichnis.abrufen(&SessionId::from(id)).map(Json)
}

/// `GET /ws/:id` – Upgrade auf den Relay-Kanal
///
/// Die Sitzung muss nicht im Verzeichnis stehen, jede ID aus dem Pfad
/// eroeffnet bzw. betritt einen Relay-Raum.
async fn ws_upgrade(
    ws: WebSocketUpgrade,
    State(state): State<Arc<RelayState>>,
    Path(id): Path<String>,
) -> Response {
    let shutdown_rx = state.shutdown_empfaenger();
    let verbindung = RelayVerbindung::neu(state, SessionId::from(id));
    ws.on_upgrade(move |socket| verbindung.verarbeiten(socket, shutdown_rx))
}

async fn nicht_gefunden() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not Found" })))
}
