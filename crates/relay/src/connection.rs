//! Relay-Verbindung – Verarbeitet eine einzelne WebSocket-Verbindung
//!
//! Jede WebSocket-Verbindung bekommt eine `RelayVerbindung` in einem eigenen
//! tokio-Task. Der Task registriert sich beim `RelayHub`, leitet jeden
//! eingehenden Binaer-Frame weiter und schreibt die Send-Queue auf den Socket.
//!
//! ## Zustaende
//! ```text
//! Unregistriert -> Registriert -> Unregistriert (endgueltig)
//! ```
//!
//! Die Verbindung endet wenn der Client schliesst, Lesen oder Schreiben
//! fehlschlaegt, der Hub sie wegen voller Send-Queue abbricht oder das
//! Shutdown-Signal kommt.

use axum::extract::ws::{close_code, CloseFrame, Message, WebSocket};
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use kollab_core::SessionId;
use std::sync::Arc;
use tokio::sync::watch;

use crate::broadcast::ClientSender;
use crate::server_state::RelayState;

/// Verarbeitet eine einzelne Relay-Verbindung
pub struct RelayVerbindung {
    state: Arc<RelayState>,
    session_id: SessionId,
}

impl RelayVerbindung {
    /// Erstellt eine neue RelayVerbindung fuer die angegebene Sitzung
    pub fn neu(state: Arc<RelayState>, session_id: SessionId) -> Self {
        Self { state, session_id }
    }

    /// Startet die Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird oder ein Shutdown-Signal
    /// eingeht. Danach ist der Peer aus dem Hub entfernt.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let session_id = self.session_id;
        let hub = &self.state.hub;
        let metriken = &self.state.metriken;

        // Ausgehende Queue (Hub -> Socket)
        let (sender, empfaenger) = ClientSender::neu(self.state.config.sende_queue_groesse);
        let mut sende_rx = empfaenger.nachrichten;
        let mut abbruch_rx = empfaenger.abbruch;
        let verbindungs_id = sender.verbindungs_id;
        hub.verbinden(session_id.clone(), Arc::new(sender));
        metriken.verbundene_clients.inc();
        self.state.hub_metriken_aktualisieren();

        tracing::info!(
            session_id = %session_id,
            verbindung = %verbindungs_id,
            "Neue Relay-Verbindung"
        );

        let (mut ws_tx, mut ws_rx) = socket.split();

        loop {
            tokio::select! {
                // Eingehender Frame vom Client
                frame = ws_rx.next() => {
                    match frame {
                        Some(Ok(Message::Binary(daten))) => {
                            metriken.nachrichten_total.inc();
                            metriken.nachrichten_bytes_total.inc_by(daten.len() as u64);
                            let zugestellt = hub.senden(&session_id, verbindungs_id, Bytes::from(daten));
                            metriken.zustellungen_total.inc_by(zugestellt as u64);
                            tracing::trace!(
                                session_id = %session_id,
                                verbindung = %verbindungs_id,
                                zugestellt,
                                "Frame weitergeleitet"
                            );
                        }
                        Some(Ok(Message::Text(_))) => {
                            // Kein Teil des Relay-Protokolls
                            tracing::debug!(verbindung = %verbindungs_id, "Text-Frame ignoriert");
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            tracing::info!(verbindung = %verbindungs_id, "Verbindung vom Client getrennt");
                            break;
                        }
                        // Ping/Pong beantwortet axum selbst
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            tracing::warn!(
                                verbindung = %verbindungs_id,
                                fehler = %e,
                                "Frame-Lesefehler"
                            );
                            break;
                        }
                    }
                }

                // Ausgehende Nachricht anderer Peers
                Some(ausgehend) = sende_rx.recv() => {
                    if let Err(e) = ws_tx.send(Message::Binary(ausgehend.to_vec())).await {
                        tracing::warn!(
                            verbindung = %verbindungs_id,
                            fehler = %e,
                            "Senden fehlgeschlagen"
                        );
                        break;
                    }
                }

                // Hub hat die Verbindung ausgetragen (Queue uebergelaufen)
                Ok(()) = abbruch_rx.changed() => {
                    if *abbruch_rx.borrow() {
                        tracing::warn!(
                            session_id = %session_id,
                            verbindung = %verbindungs_id,
                            "Client zu langsam – Verbindung wird getrennt"
                        );
                        metriken.abgebrochene_verbindungen_total.inc();
                        let _ = ws_tx
                            .send(Message::Close(Some(CloseFrame {
                                code: close_code::AGAIN,
                                reason: "Send-Queue uebergelaufen".into(),
                            })))
                            .await;
                        break;
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(verbindung = %verbindungs_id, "Shutdown-Signal – Verbindung wird getrennt");
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        hub.trennen(&session_id, verbindungs_id);
        metriken.verbundene_clients.dec();
        self.state.hub_metriken_aktualisieren();

        tracing::info!(
            session_id = %session_id,
            verbindung = %verbindungs_id,
            "Verbindungs-Task beendet"
        );
    }
}
