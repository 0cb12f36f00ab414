//! Sitzungsverzeichnis – Vergibt und loest Sitzungs-IDs auf
//!
//! Reine Buchhaltung: ID -> Name (+ opaker Snapshot-Platzhalter). Das
//! Verzeichnis kennt keine Verbindungen, das ist Aufgabe des `RelayHub`.
//! Sitzungen werden nie geloescht.

use bytes::Bytes;
use dashmap::DashMap;
use kollab_core::SessionId;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::{RelayError, RelayResult};

/// Oeffentliche Sicht auf eine Sitzung
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SitzungsInfo {
    pub id: SessionId,
    pub name: String,
}

/// Interner Eintrag pro Sitzung
#[derive(Debug)]
struct SitzungsEintrag {
    name: String,
    /// Zuletzt gemeldeter Dokumentzustand, wird vom Relay nie gelesen
    snapshot: Option<Bytes>,
}

/// Verzeichnis aller angelegten Sitzungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct SitzungsVerzeichnis {
    sitzungen: Arc<DashMap<SessionId, SitzungsEintrag>>,
}

impl SitzungsVerzeichnis {
    /// Erstellt ein leeres Verzeichnis
    pub fn neu() -> Self {
        Self::default()
    }

    /// Legt eine neue Sitzung mit zufaelliger ID an
    pub fn erstellen(&self, name: impl Into<String>) -> SitzungsInfo {
        let id = SessionId::neu();
        let name = name.into();
        self.sitzungen.insert(
            id.clone(),
            SitzungsEintrag {
                name: name.clone(),
                snapshot: None,
            },
        );
        tracing::info!(session_id = %id, name = %name, "Sitzung angelegt");
        SitzungsInfo { id, name }
    }

    /// Schlaegt eine Sitzung nach
    ///
    /// `SitzungNichtGefunden` ist ein erwartetes Ergebnis, kein Fehlerzustand.
    pub fn abrufen(&self, id: &SessionId) -> RelayResult<SitzungsInfo> {
        self.sitzungen
            .get(id)
            .map(|eintrag| SitzungsInfo {
                id: id.clone(),
                name: eintrag.name.clone(),
            })
            .ok_or_else(|| RelayError::SitzungNichtGefunden(id.clone()))
    }

    /// Ueberschreibt den opaken Snapshot einer Sitzung
    ///
    /// Gibt den vorher gespeicherten Snapshot zurueck.
    pub fn snapshot_speichern(&self, id: &SessionId, snapshot: Bytes) -> RelayResult<Option<Bytes>> {
        let mut eintrag = self
            .sitzungen
            .get_mut(id)
            .ok_or_else(|| RelayError::SitzungNichtGefunden(id.clone()))?;
        Ok(eintrag.snapshot.replace(snapshot))
    }

    /// Anzahl angelegter Sitzungen
    pub fn anzahl(&self) -> usize {
        self.sitzungen.len()
    }
}
