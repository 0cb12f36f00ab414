//! Relay-Hub – Verteilt Nachrichten an alle Peers einer Sitzung
//!
//! Der RelayHub verwaltet pro Sitzung die Menge der aktuell verbundenen
//! Peers und leitet jede eingehende Nachricht unveraendert an alle anderen
//! Mitglieder derselben Sitzung weiter.
//!
//! ## Zustellung
//! - Die Mitgliederliste wird unter dem Shard-Lock kopiert, die Zustellung
//!   laeuft danach ohne Lock.
//! - Fehler bei einem Peer werden geloggt und verworfen. Die uebrigen Peers
//!   bekommen die Nachricht trotzdem.
//! - Ein Peer mit voller Send-Queue wird sofort ausgetragen und abgebrochen.
//!   Nach einer verworfenen Nachricht bekommt er nichts mehr, sein Stream
//!   hat also nie Luecken. Der Client verbindet neu und synchronisiert.
//! - Der Absender bekommt seine eigene Nachricht nie zurueck.

use bytes::Bytes;
use dashmap::DashMap;
use kollab_core::{SessionId, VerbindungsId};
use std::sync::Arc;
use tokio::sync::{mpsc, watch};

use crate::error::ZustellFehler;

// ---------------------------------------------------------------------------
// PeerSenke
// ---------------------------------------------------------------------------

/// Etwas, das versuchen kann Bytes an einen Peer zu schreiben
///
/// Fehler sind normale Rueckgabewerte. Implementierungen duerfen nicht
/// blockieren, `senden` wird aus dem Lese-Task eines anderen Peers gerufen.
pub trait PeerSenke: Send + Sync {
    /// ID der Verbindung, zu der diese Senke gehoert
    fn id(&self) -> VerbindungsId;

    /// Versucht die Nachricht an den Peer zu uebergeben
    fn senden(&self, payload: Bytes) -> Result<(), ZustellFehler>;

    /// Fordert den Besitzer der Verbindung auf, sie zu beenden
    ///
    /// Wird nach `QueueVoll` gerufen, der Peer ist dann schon ausgetragen.
    fn abbrechen(&self) {}
}

// ---------------------------------------------------------------------------
// ClientSender
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue einer WebSocket-Verbindung
///
/// Die zugehoerigen Empfaenger (`ClientEmpfaenger`) haelt der
/// Verbindungs-Task: er schreibt die Queue auf den Socket und beendet die
/// Verbindung, sobald `abbruch` auf `true` springt.
#[derive(Clone, Debug)]
pub struct ClientSender {
    pub verbindungs_id: VerbindungsId,
    pub tx: mpsc::Sender<Bytes>,
    abbruch: Arc<watch::Sender<bool>>,
}

/// Gegenstueck zum `ClientSender` im Verbindungs-Task
#[derive(Debug)]
pub struct ClientEmpfaenger {
    /// Ausgehende Nachrichten anderer Peers
    pub nachrichten: mpsc::Receiver<Bytes>,
    /// Wird `true`, wenn der Hub die Verbindung abgebrochen hat
    pub abbruch: watch::Receiver<bool>,
}

impl ClientSender {
    /// Erstellt einen Sender mit neuer Queue der angegebenen Groesse
    pub fn neu(queue_groesse: usize) -> (Self, ClientEmpfaenger) {
        let (tx, nachrichten) = mpsc::channel(queue_groesse.max(1));
        let (abbruch_tx, abbruch) = watch::channel(false);
        let sender = Self {
            verbindungs_id: VerbindungsId::new(),
            tx,
            abbruch: Arc::new(abbruch_tx),
        };
        (sender, ClientEmpfaenger { nachrichten, abbruch })
    }
}

impl PeerSenke for ClientSender {
    fn id(&self) -> VerbindungsId {
        self.verbindungs_id
    }

    fn senden(&self, payload: Bytes) -> Result<(), ZustellFehler> {
        match self.tx.try_send(payload) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(ZustellFehler::QueueVoll),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(ZustellFehler::Geschlossen),
        }
    }

    fn abbrechen(&self) {
        self.abbruch.send_replace(true);
    }
}

// ---------------------------------------------------------------------------
// RelayHub
// ---------------------------------------------------------------------------

/// Mitglieder einer Sitzung
type Mitglieder = Vec<Arc<dyn PeerSenke>>;

/// Zentrale Mitgliederverwaltung und Weiterleitung
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone, Default)]
pub struct RelayHub {
    inner: Arc<RelayHubInner>,
}

#[derive(Default)]
struct RelayHubInner {
    /// session_id -> verbundene Peers
    ///
    /// Leere Eintraege bleiben stehen, bis der Prozess endet.
    sitzungen: DashMap<SessionId, Mitglieder>,
}

impl RelayHub {
    /// Erstellt einen neuen RelayHub
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registriert einen Peer in der Sitzung
    ///
    /// Jede Verbindung darf nur einmal registriert werden.
    pub fn verbinden(&self, session_id: SessionId, peer: Arc<dyn PeerSenke>) {
        let verbindungs_id = peer.id();
        let mut mitglieder = self.inner.sitzungen.entry(session_id.clone()).or_default();
        mitglieder.push(peer);
        tracing::debug!(
            session_id = %session_id,
            verbindung = %verbindungs_id,
            mitglieder = mitglieder.len(),
            "Peer im Relay registriert"
        );
    }

    /// Entfernt einen Peer aus der Sitzung
    ///
    /// Unbekannte Peers oder doppeltes Trennen sind kein Fehler.
    pub fn trennen(&self, session_id: &SessionId, verbindungs_id: VerbindungsId) {
        let Some(mut mitglieder) = self.inner.sitzungen.get_mut(session_id) else {
            return;
        };
        let vorher = mitglieder.len();
        mitglieder.retain(|peer| peer.id() != verbindungs_id);
        if mitglieder.len() < vorher {
            tracing::debug!(
                session_id = %session_id,
                verbindung = %verbindungs_id,
                mitglieder = mitglieder.len(),
                "Peer aus Relay entfernt"
            );
        }
    }

    /// Leitet eine Nachricht an alle Peers der Sitzung ausser dem Absender weiter
    ///
    /// Gibt die Anzahl der erfolgreichen Zustellungen zurueck. Fehler
    /// einzelner Peers werden nie an den Aufrufer weitergegeben. Peers mit
    /// voller Queue werden ausgetragen und abgebrochen.
    pub fn senden(&self, session_id: &SessionId, absender: VerbindungsId, payload: Bytes) -> usize {
        // Snapshot ziehen, damit der Shard-Lock waehrend der Zustellung frei ist
        let empfaenger: Mitglieder = match self.inner.sitzungen.get(session_id) {
            Some(mitglieder) => mitglieder.value().clone(),
            None => return 0,
        };

        let mut gesendet = 0;
        for peer in empfaenger.iter().filter(|peer| peer.id() != absender) {
            match peer.senden(payload.clone()) {
                Ok(()) => gesendet += 1,
                Err(ZustellFehler::QueueVoll) => {
                    // Austragen vor dem Abbruch, sonst koennte die naechste
                    // Nachricht noch eingereiht werden
                    self.trennen(session_id, peer.id());
                    peer.abbrechen();
                    tracing::warn!(
                        session_id = %session_id,
                        verbindung = %peer.id(),
                        "Send-Queue voll – Peer wird getrennt"
                    );
                }
                Err(ZustellFehler::Geschlossen) => {
                    // Trennen uebernimmt der Lese-Task des Peers
                    tracing::debug!(
                        session_id = %session_id,
                        verbindung = %peer.id(),
                        "Send-Queue geschlossen (Peer getrennt)"
                    );
                }
            }
        }
        gesendet
    }

    /// Anzahl der Peers in einer Sitzung
    pub fn mitglieder_anzahl(&self, session_id: &SessionId) -> usize {
        self.inner
            .sitzungen
            .get(session_id)
            .map(|mitglieder| mitglieder.len())
            .unwrap_or_default()
    }

    /// Anzahl der Sitzungen mit Mitgliedereintrag (auch leere)
    pub fn sitzungs_anzahl(&self) -> usize {
        self.inner.sitzungen.len()
    }

    /// Gesamtzahl registrierter Peers ueber alle Sitzungen
    pub fn verbindungs_anzahl(&self) -> usize {
        self.inner
            .sitzungen
            .iter()
            .map(|entry| entry.value().len())
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
