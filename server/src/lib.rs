//! kollab-server – Bibliotheks-Root
//!
//! Deklariert die Server-Module und stellt den oeffentlichen Einstiegspunkt
//! fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use config::ServerConfig;
use kollab_observability::KollabMetrics;
use kollab_relay::{RelayServer, RelayState};

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Metriken und Relay-Zustand anlegen (einmalig pro Prozess)
    /// 2. Ctrl-C-Handler registrieren
    /// 3. HTTP/WebSocket-Listener starten
    pub async fn starten(self) -> Result<()> {
        let bind_addr = self.config.bind_adresse()?;

        tracing::info!(
            server_name = %self.config.server.name,
            adresse = %bind_addr,
            frontend = %self.config.frontend.dist_pfad.display(),
            "Server startet"
        );

        let metriken = KollabMetrics::neu()?;
        let state = RelayState::neu(self.config.relay_config(), metriken);

        let shutdown_state = state.clone();
        tokio::spawn(async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => tracing::info!("Shutdown-Signal empfangen, Server wird beendet"),
                Err(e) => tracing::error!(fehler = %e, "Ctrl-C-Handler fehlgeschlagen"),
            }
            shutdown_state.herunterfahren();
        });

        RelayServer::neu(state).starten(bind_addr).await?;
        Ok(())
    }
}
