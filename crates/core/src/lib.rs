//! kollab-core – Gemeinsame Typen
//!
//! Dieses Crate stellt die ID-Typen bereit, die vom Relay, vom Server und
//! von den Tests gemeinsam genutzt werden.

pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use types::{SessionId, VerbindungsId};
