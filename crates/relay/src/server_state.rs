//! Gemeinsamer Server-Zustand fuer den Relay-Service
//!
//! Haelt Verzeichnis, Hub und Metriken als geteilte Referenzen, die sicher
//! zwischen tokio-Tasks geteilt werden koennen. Wird genau einmal beim
//! Start erzeugt.

use kollab_observability::KollabMetrics;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::watch;

use crate::broadcast::RelayHub;
use crate::verzeichnis::SitzungsVerzeichnis;

/// Konfiguration fuer den Relay-Service
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Groesse der ausgehenden Queue pro Verbindung
    pub sende_queue_groesse: usize,
    /// Verzeichnis mit dem gebauten Frontend (optional)
    pub dist_pfad: Option<PathBuf>,
    /// Erlaubte CORS-Origins. Leer = alle Origins erlaubt.
    pub cors_origins: Vec<String>,
    /// `/metrics` bereitstellen
    pub metriken_aktiviert: bool,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            sende_queue_groesse: 256,
            dist_pfad: None,
            cors_origins: vec![],
            metriken_aktiviert: true,
        }
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct RelayState {
    /// Relay-Konfiguration
    pub config: Arc<RelayConfig>,
    /// Sitzungsverzeichnis (ID -> Name)
    pub verzeichnis: SitzungsVerzeichnis,
    /// Mitgliederverwaltung und Weiterleitung
    pub hub: RelayHub,
    /// Prometheus-Metriken
    pub metriken: KollabMetrics,
    /// Shutdown-Signal fuer Listener und Verbindungs-Tasks
    shutdown_tx: watch::Sender<bool>,
}

impl RelayState {
    /// Erstellt einen neuen RelayState
    pub fn neu(config: RelayConfig, metriken: KollabMetrics) -> Arc<Self> {
        let (shutdown_tx, _) = watch::channel(false);
        Arc::new(Self {
            config: Arc::new(config),
            verzeichnis: SitzungsVerzeichnis::neu(),
            hub: RelayHub::neu(),
            metriken,
            shutdown_tx,
        })
    }

    /// Neuer Empfaenger fuer das Shutdown-Signal
    pub fn shutdown_empfaenger(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }

    /// Uebertraegt die Groesse des Hubs in die Gauges
    pub fn hub_metriken_aktualisieren(&self) {
        self.metriken
            .relay_sitzungen
            .set(self.hub.sitzungs_anzahl() as i64);
        self.metriken
            .mitgliedschaften
            .set(self.hub.verbindungs_anzahl() as i64);
    }

    /// Signalisiert allen Tasks, dass der Server beendet wird
    pub fn herunterfahren(&self) {
        // send_replace schlaegt auch ohne Empfaenger nicht fehl
        self.shutdown_tx.send_replace(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::ClientSender;
    use kollab_core::SessionId;

    #[test]
    fn hub_groesse_landet_in_gauges() {
        let state = RelayState::neu(RelayConfig::default(), KollabMetrics::neu().unwrap());
        let sitzung = SessionId::neu();
        let (a, _rx_a) = ClientSender::neu(4);
        let (b, _rx_b) = ClientSender::neu(4);
        let a_id = a.verbindungs_id;
        let b_id = b.verbindungs_id;
        state.hub.verbinden(sitzung.clone(), Arc::new(a));
        state.hub.verbinden(sitzung.clone(), Arc::new(b));
        state.hub.verbinden(SessionId::neu(), Arc::new(ClientSender::neu(4).0));
        state.hub_metriken_aktualisieren();

        assert_eq!(state.metriken.relay_sitzungen.get(), 2);
        assert_eq!(state.metriken.mitgliedschaften.get(), 3);

        // Leere Sitzung bleibt gezaehlt
        state.hub.trennen(&sitzung, a_id);
        state.hub.trennen(&sitzung, b_id);
        state.hub_metriken_aktualisieren();
        assert_eq!(state.metriken.relay_sitzungen.get(), 2);
        assert_eq!(state.metriken.mitgliedschaften.get(), 1);
    }

    #[test]
    fn herunterfahren_erreicht_spaete_empfaenger() {
        let state = RelayState::neu(RelayConfig::default(), KollabMetrics::neu().unwrap());
        let frueh = state.shutdown_empfaenger();
        assert!(!*frueh.borrow());

        state.herunterfahren();

        assert!(*frueh.borrow());
        assert!(*state.shutdown_empfaenger().borrow());
    }
}
