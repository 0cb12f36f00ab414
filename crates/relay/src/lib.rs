//! kollab-relay – Sitzungsverzeichnis und Binaer-Relay
//!
//! Dieser Crate verteilt opake Binaer-Nachrichten zwischen allen Teilnehmern
//! einer Sitzung. Der Inhalt wird nie interpretiert.
//!
//! ## Architektur
//!
//! ```text
//! HTTP Listener (RelayServer)
//!     |
//!     +-- POST /sessions, GET /sessions/:id  -> SitzungsVerzeichnis
//!     +-- GET /ws/:id
//!             |
//!             v
//!         RelayVerbindung (pro Verbindung ein Task)
//!             |  Binaer-Frame rein
//!             v
//!         RelayHub::senden -> alle anderen Peers der Sitzung
//! ```

pub mod broadcast;
pub mod connection;
pub mod error;
pub mod http;
pub mod server;
pub mod server_state;
pub mod verzeichnis;

// Bequeme Re-Exporte
pub use broadcast::{ClientEmpfaenger, ClientSender, PeerSenke, RelayHub};
pub use connection::RelayVerbindung;
pub use error::{RelayError, RelayResult, ZustellFehler};
pub use server::RelayServer;
pub use server_state::{RelayConfig, RelayState};
pub use verzeichnis::{SitzungsInfo, SitzungsVerzeichnis};
