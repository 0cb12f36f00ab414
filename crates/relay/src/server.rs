//! HTTP-Listener – Bindet Socket, bedient Router bis zum Shutdown
//!
//! Der `RelayServer` bindet einen TCP-Socket und uebergibt ihn an
//! `axum::serve`. Jede WebSocket-Verbindung laeuft danach in einem eigenen
//! tokio-Task auf dem Multi-Thread-Runtime.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use crate::error::RelayResult;
use crate::http::router;
use crate::server_state::RelayState;

/// HTTP/WebSocket-Server fuer Kollab
pub struct RelayServer {
    state: Arc<RelayState>,
}

impl RelayServer {
    /// Erstellt einen neuen RelayServer
    pub fn neu(state: Arc<RelayState>) -> Self {
        Self { state }
    }

    /// Bindet die Adresse und bedient Anfragen bis zum Shutdown-Signal
    pub async fn starten(self, bind_addr: SocketAddr) -> RelayResult<()> {
        let listener = TcpListener::bind(bind_addr).await?;
        self.bedienen(listener).await
    }

    /// Bedient einen bereits gebundenen Listener
    ///
    /// Laeuft bis `RelayState::herunterfahren` aufgerufen wird.
    pub async fn bedienen(self, listener: TcpListener) -> RelayResult<()> {
        let lokale_addr = listener.local_addr()?;
        let app = router(Arc::clone(&self.state));
        let mut shutdown_rx = self.state.shutdown_empfaenger();

        tracing::info!(adresse = %lokale_addr, "Relay-Server gestartet");

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                while !*shutdown_rx.borrow_and_update() {
                    if shutdown_rx.changed().await.is_err() {
                        break;
                    }
                }
                tracing::info!("Relay-Server: Shutdown-Signal empfangen");
            })
            .await?;

        tracing::info!("Relay-Server gestoppt");
        Ok(())
    }
}
