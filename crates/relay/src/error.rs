//! Fehlertypen fuer Verzeichnis und Relay

use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use kollab_core::SessionId;
use serde_json::json;
use thiserror::Error;

/// Fehlertyp fuer den Relay-Service
#[derive(Debug, Error)]
pub enum RelayError {
    /// Sitzungs-ID ist im Verzeichnis unbekannt (normales Negativ-Ergebnis)
    #[error("Sitzung nicht gefunden: {0}")]
    SitzungNichtGefunden(SessionId),

    /// IO-Fehler (Listener, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// HTTP-Statuscode fuer REST-Antworten
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::SitzungNichtGefunden(_) => StatusCode::NOT_FOUND,
            Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let nachricht = match &self {
            // Wortlaut wie bisher, Clients pruefen auf dieses Feld
            Self::SitzungNichtGefunden(_) => "Session not found".to_string(),
            andere => andere.to_string(),
        };
        (self.http_status(), Json(json!({ "error": nachricht }))).into_response()
    }
}

/// Fehler beim Zustellen einer Nachricht an einen einzelnen Peer
///
/// Wird innerhalb von `RelayHub::senden` geschluckt und nie an den
/// Aufrufer weitergereicht.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ZustellFehler {
    /// Send-Queue des Peers ist voll, Nachricht verworfen und Peer getrennt
    #[error("Send-Queue voll")]
    QueueVoll,

    /// Peer ist bereits getrennt
    #[error("Verbindung geschlossen")]
    Geschlossen,
}

/// Result-Typ fuer den Relay-Service
pub type RelayResult<T> = Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nicht_gefunden_ist_404() {
        let e = RelayError::SitzungNichtGefunden(SessionId::from("x"));
        assert_eq!(e.http_status(), StatusCode::NOT_FOUND);
        assert_eq!(e.to_string(), "Sitzung nicht gefunden: x");
    }

    #[test]
    fn io_fehler_ist_500() {
        let e = RelayError::from(std::io::Error::new(std::io::ErrorKind::AddrInUse, "belegt"));
        assert_eq!(e.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
