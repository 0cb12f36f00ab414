//! Prometheus-kompatible Metriken fuer Kollab
//!
//! Registrierte Metriken:
//! - `kollab_verbundene_clients` – Gauge: Aktuell verbundene Relay-Clients
//! - `kollab_sitzungen` – Gauge: Angelegte Sitzungen
//! - `kollab_nachrichten_total` – Counter: Eingehende Relay-Nachrichten
//! - `kollab_nachrichten_bytes_total` – Counter: Eingehende Relay-Bytes
//! - `kollab_zustellungen_total` – Counter: Erfolgreiche Zustellungen an Peers
//! - `kollab_relay_sitzungen` – Gauge: Sitzungen mit Mitgliedereintrag (auch leere)
//! - `kollab_mitgliedschaften` – Gauge: Registrierte Peers ueber alle Sitzungen
//! - `kollab_abgebrochene_verbindungen_total` – Counter: Wegen voller Queue getrennt
//! - `kollab_http_requests_total` – Counter: HTTP-Anfragen (method, path, status)
//! - `kollab_http_request_duration_seconds` – Histogram: HTTP-Antwortzeit

use anyhow::Result;
use axum::{Router, extract::State, response::IntoResponse, routing::get};
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;

/// Alle Kollab-Prometheus-Metriken
///
/// Clone ist billig, alle Metrik-Handles teilen sich die Registry.
#[derive(Clone)]
pub struct KollabMetrics {
    pub registry: Arc<Registry>,

    // Relay-Metriken
    pub verbundene_clients: IntGauge,
    pub sitzungen: IntGauge,
    pub nachrichten_total: IntCounter,
    pub nachrichten_bytes_total: IntCounter,
    pub zustellungen_total: IntCounter,
    pub relay_sitzungen: IntGauge,
    pub mitgliedschaften: IntGauge,
    pub abgebrochene_verbindungen_total: IntCounter,

    // HTTP-Metriken
    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
}

impl KollabMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Relay-Metriken ---
        let verbundene_clients = IntGauge::with_opts(Opts::new(
            "kollab_verbundene_clients",
            "Anzahl aktuell verbundener Relay-Clients",
        ))?;
        registry.register(Box::new(verbundene_clients.clone()))?;

        let sitzungen = IntGauge::with_opts(Opts::new(
            "kollab_sitzungen",
            "Anzahl angelegter Sitzungen",
        ))?;
        registry.register(Box::new(sitzungen.clone()))?;

        let nachrichten_total = IntCounter::with_opts(Opts::new(
            "kollab_nachrichten_total",
            "Gesamtanzahl eingehender Relay-Nachrichten",
        ))?;
        registry.register(Box::new(nachrichten_total.clone()))?;

        let nachrichten_bytes_total = IntCounter::with_opts(Opts::new(
            "kollab_nachrichten_bytes_total",
            "Gesamtgroesse eingehender Relay-Nachrichten in Bytes",
        ))?;
        registry.register(Box::new(nachrichten_bytes_total.clone()))?;

        let zustellungen_total = IntCounter::with_opts(Opts::new(
            "kollab_zustellungen_total",
            "Erfolgreich eingereihte Zustellungen an Peers",
        ))?;
        registry.register(Box::new(zustellungen_total.clone()))?;

        let relay_sitzungen = IntGauge::with_opts(Opts::new(
            "kollab_relay_sitzungen",
            "Sitzungen mit Mitgliedereintrag im Relay (leere bleiben stehen)",
        ))?;
        registry.register(Box::new(relay_sitzungen.clone()))?;

        let mitgliedschaften = IntGauge::with_opts(Opts::new(
            "kollab_mitgliedschaften",
            "Im Relay registrierte Peers ueber alle Sitzungen",
        ))?;
        registry.register(Box::new(mitgliedschaften.clone()))?;

        let abgebrochene_verbindungen_total = IntCounter::with_opts(Opts::new(
            "kollab_abgebrochene_verbindungen_total",
            "Verbindungen, die wegen voller Send-Queue getrennt wurden",
        ))?;
        registry.register(Box::new(abgebrochene_verbindungen_total.clone()))?;

        // --- HTTP-Metriken ---
        let http_requests_total = IntCounterVec::new(
            Opts::new("kollab_http_requests_total", "Gesamtanzahl HTTP-Anfragen"),
            &["method", "path", "status"],
        )?;
        registry.register(Box::new(http_requests_total.clone()))?;

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "kollab_http_request_duration_seconds",
                "HTTP-Antwortzeit in Sekunden",
            )
            .buckets(vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5,
            ]),
            &["method", "path"],
        )?;
        registry.register(Box::new(http_request_duration_seconds.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            verbundene_clients,
            sitzungen,
            nachrichten_total,
            nachrichten_bytes_total,
            zustellungen_total,
            relay_sitzungen,
            mitgliedschaften,
            abgebrochene_verbindungen_total,
            http_requests_total,
            http_request_duration_seconds,
        })
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: KollabMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<KollabMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            axum::http::StatusCode::OK,
            [(
                axum::http::header::CONTENT_TYPE,
                "text/plain; version=0.0.4",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            axum::http::StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = KollabMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn zwei_instanzen_kollidieren_nicht() {
        // Jede Instanz hat ihre eigene Registry
        let a = KollabMetrics::neu().unwrap();
        let b = KollabMetrics::neu().unwrap();
        a.verbundene_clients.inc();
        assert_eq!(a.verbundene_clients.get(), 1);
        assert_eq!(b.verbundene_clients.get(), 0);
    }

    #[test]
    fn gauge_verbundene_clients() {
        let metriken = KollabMetrics::neu().unwrap();
        metriken.verbundene_clients.inc();
        metriken.verbundene_clients.inc();
        metriken.verbundene_clients.dec();
        assert_eq!(metriken.verbundene_clients.get(), 1);
    }

    #[test]
    fn http_counter_mit_labels() {
        let metriken = KollabMetrics::neu().unwrap();
        metriken
            .http_requests_total
            .with_label_values(&["GET", "/healthz", "200"])
            .inc();
        let wert = metriken
            .http_requests_total
            .with_label_values(&["GET", "/healthz", "200"])
            .get();
        assert_eq!(wert, 1);
    }

    #[test]
    fn metriken_export_prometheus_format() {
        let metriken = KollabMetrics::neu().unwrap();
        metriken.nachrichten_total.inc();
        metriken.zustellungen_total.inc_by(2);

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("kollab_nachrichten_total 1"));
        assert!(output.contains("kollab_zustellungen_total 2"));
        assert!(output.contains("kollab_mitgliedschaften 0"));
        assert!(output.contains("kollab_abgebrochene_verbindungen_total 0"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}
