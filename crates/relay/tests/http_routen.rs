//! Integration-Tests fuer die HTTP-Routen (ohne Socket, via `oneshot`)

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use kollab_core::SessionId;
use kollab_observability::KollabMetrics;
use kollab_relay::{http::router, RelayConfig, RelayState, SitzungsInfo};
use serde_json::Value;
use tower::ServiceExt;

fn state_mit(config: RelayConfig) -> Arc<RelayState> {
    RelayState::neu(config, KollabMetrics::neu().expect("Metriken"))
}

fn app() -> (Router, Arc<RelayState>) {
    let state = state_mit(RelayConfig::default());
    (router(Arc::clone(&state)), state)
}

async fn body_json(antwort: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX)
        .await
        .expect("Body lesbar");
    serde_json::from_slice(&bytes).expect("Body ist JSON")
}

fn sitzung_anlegen_request(name: &str) -> Request<Body> {
    Request::post("/sessions")
        .header("content-type", "application/json")
        .body(Body::from(serde_json::json!({ "name": name }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn sitzung_anlegen() {
    let (app, state) = app();

    let antwort = app.oneshot(sitzung_anlegen_request("Test Interview")).await.unwrap();
    assert_eq!(antwort.status(), StatusCode::OK);

    let info: SitzungsInfo = serde_json::from_value(body_json(antwort).await).unwrap();
    assert_eq!(info.name, "Test Interview");
    assert!(!info.id.as_str().is_empty());
    assert_eq!(state.verzeichnis.anzahl(), 1);
    assert_eq!(state.metriken.sitzungen.get(), 1);
}

#[tokio::test]
async fn sitzung_anlegen_und_abrufen() {
    let (app, _state) = app();

    let antwort = app
        .clone()
        .oneshot(sitzung_anlegen_request("Fetch Me"))
        .await
        .unwrap();
    let info: SitzungsInfo = serde_json::from_value(body_json(antwort).await).unwrap();

    let antwort = app
        .oneshot(
            Request::get(format!("/sessions/{}", info.id))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::OK);

    let json = body_json(antwort).await;
    assert_eq!(json["name"], "Fetch Me");
    assert_eq!(json["id"], info.id.as_str());
}

#[tokio::test]
async fn unbekannte_sitzung_ist_404() {
    let (app, _state) = app();

    let antwort = app
        .oneshot(
            Request::get(format!("/sessions/{}", SessionId::neu()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(antwort).await["error"], "Session not found");
}

#[tokio::test]
async fn anlegen_ohne_name_wird_abgelehnt() {
    let (app, state) = app();

    let antwort = app
        .oneshot(
            Request::post("/sessions")
                .header("content-type", "application/json")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(antwort.status().is_client_error());
    assert_eq!(state.verzeichnis.anzahl(), 0);
}

#[tokio::test]
async fn healthz_ohne_sitzungszustand() {
    let (app, _state) = app();

    let antwort = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::OK);
    assert_eq!(body_json(antwort).await["status"], "ok");
}

#[tokio::test]
async fn metriken_endpunkt() {
    let (app, _state) = app();

    let antwort = app
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("kollab_verbundene_clients"));
}

#[tokio::test]
async fn metriken_abschaltbar() {
    let state = state_mit(RelayConfig {
        metriken_aktiviert: false,
        ..RelayConfig::default()
    });

    let antwort = router(state)
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn frontend_mit_spa_fallback() {
    let dist = std::env::temp_dir().join(format!("kollab-dist-{}", SessionId::neu()));
    std::fs::create_dir_all(dist.join("assets")).unwrap();
    std::fs::write(dist.join("index.html"), "<html>kollab</html>").unwrap();
    std::fs::write(dist.join("assets").join("app.js"), "console.log(1)").unwrap();

    let state = state_mit(RelayConfig {
        dist_pfad: Some(dist.clone()),
        ..RelayConfig::default()
    });
    let app = router(state);

    // Asset direkt
    let antwort = app
        .clone()
        .oneshot(Request::get("/assets/app.js").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::OK);

    // Client-Route -> index.html
    let antwort = app
        .clone()
        .oneshot(Request::get("/interview/123").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(antwort.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"<html>kollab</html>");

    // API- und WebSocket-Pfade bleiben 404
    for pfad in ["/api/irgendwas", "/ws", "/ws/", "/ws/abc/mehr"] {
        let antwort = app
            .clone()
            .oneshot(Request::get(pfad).body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(antwort.status(), StatusCode::NOT_FOUND, "Pfad {pfad}");
    }

    let _ = std::fs::remove_dir_all(&dist);
}

#[tokio::test]
async fn ohne_frontend_ist_unbekannter_pfad_404() {
    let state = state_mit(RelayConfig {
        dist_pfad: Some(std::env::temp_dir().join(format!("fehlt-{}", SessionId::neu()))),
        ..RelayConfig::default()
    });

    let antwort = router(state)
        .oneshot(Request::get("/irgendwo").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(antwort.status(), StatusCode::NOT_FOUND);
}
