//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass der Server ohne Konfigurationsdatei
//! lauffaehig ist.

use kollab_observability::{log_format_gueltig, log_level_gueltig};
use kollab_relay::RelayConfig;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::PathBuf;

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Relay-Einstellungen
    pub relay: RelayEinstellungen,
    /// Frontend-Auslieferung
    pub frontend: FrontendEinstellungen,
    /// CORS-Einstellungen
    pub cors: CorsEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
    /// Observability-Einstellungen (Metriken)
    pub observability: ObservabilityEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename der Instanz (nur fuer Logs)
    pub name: String,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Kollab Server".into(),
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer HTTP und WebSocket
    pub bind_adresse: String,
    /// Port fuer HTTP und WebSocket (`PORT` ueberschreibt)
    pub port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            port: 8001,
        }
    }
}

/// Relay-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayEinstellungen {
    /// Groesse der ausgehenden Queue pro Verbindung
    pub sende_queue_groesse: usize,
}

impl Default for RelayEinstellungen {
    fn default() -> Self {
        Self {
            sende_queue_groesse: 256,
        }
    }
}

/// Frontend-Auslieferung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontendEinstellungen {
    /// Verzeichnis mit dem gebauten Frontend (fehlt es, nur API)
    pub dist_pfad: PathBuf,
}

impl Default for FrontendEinstellungen {
    fn default() -> Self {
        Self {
            dist_pfad: PathBuf::from("dist"),
        }
    }
}

/// CORS-Einstellungen
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsEinstellungen {
    /// Erlaubte Origins (leer = alle erlaubt)
    pub origins: Vec<String>,
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

/// Observability-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObservabilityEinstellungen {
    /// Stellt `/metrics` bereit
    pub metriken_aktiviert: bool,
}

impl Default for ObservabilityEinstellungen {
    fn default() -> Self {
        Self {
            metriken_aktiviert: true,
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        let config = match std::fs::read_to_string(pfad) {
            Ok(inhalt) => Self::aus_toml(&inhalt)
                .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Self::default()
            }
            Err(e) => {
                return Err(anyhow::anyhow!(
                    "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
                ))
            }
        };
        config.port_aus_env(std::env::var("PORT").ok().as_deref())
    }

    /// Parst und validiert einen TOML-String
    pub fn aus_toml(inhalt: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(inhalt)?;
        config.validieren()?;
        Ok(config)
    }

    /// Uebernimmt den Port aus der `PORT`-Umgebungsvariable, falls gesetzt
    pub fn port_aus_env(mut self, port: Option<&str>) -> anyhow::Result<Self> {
        if let Some(port) = port {
            self.netzwerk.port = port
                .parse()
                .map_err(|e| anyhow::anyhow!("Ungueltiger PORT '{port}': {e}"))?;
        }
        Ok(self)
    }

    /// Prueft Werte, die serde allein nicht abfangen kann
    pub fn validieren(&self) -> anyhow::Result<()> {
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiges Log-Level: '{}'", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format: '{}'", self.logging.format);
        }
        if self.relay.sende_queue_groesse == 0 {
            anyhow::bail!("relay.sende_queue_groesse muss groesser als 0 sein");
        }
        Ok(())
    }

    /// Gibt die vollstaendige Bind-Adresse zurueck
    pub fn bind_adresse(&self) -> anyhow::Result<SocketAddr> {
        let adresse = format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.port);
        adresse
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse '{adresse}': {e}"))
    }

    /// Leitet die Relay-Konfiguration ab
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            sende_queue_groesse: self.relay.sende_queue_groesse,
            dist_pfad: Some(self.frontend.dist_pfad.clone()),
            cors_origins: self.cors.origins.clone(),
            metriken_aktiviert: self.observability.metriken_aktiviert,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert!(cfg.validieren().is_ok());
        assert_eq!(cfg.netzwerk.port, 8001);
        assert_eq!(cfg.relay.sende_queue_groesse, 256);
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_adresse().unwrap().to_string(), "0.0.0.0:8001");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [netzwerk]
            port = 9000

            [relay]
            sende_queue_groesse = 32

            [cors]
            origins = ["http://localhost:5173"]
        "#;
        let cfg = ServerConfig::aus_toml(toml).unwrap();
        assert_eq!(cfg.netzwerk.port, 9000);
        assert_eq!(cfg.relay.sende_queue_groesse, 32);
        assert_eq!(cfg.cors.origins, vec!["http://localhost:5173".to_string()]);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
        assert!(cfg.observability.metriken_aktiviert);
    }

    #[test]
    fn ungueltiges_log_level_wird_abgelehnt() {
        let toml = r#"
            [logging]
            level = "verbose"
        "#;
        assert!(ServerConfig::aus_toml(toml).is_err());
    }

    #[test]
    fn leere_queue_wird_abgelehnt() {
        let toml = r#"
            [relay]
            sende_queue_groesse = 0
        "#;
        assert!(ServerConfig::aus_toml(toml).is_err());
    }

    #[test]
    fn port_aus_umgebung() {
        let cfg = ServerConfig::default().port_aus_env(Some("8123")).unwrap();
        assert_eq!(cfg.netzwerk.port, 8123);

        let cfg = ServerConfig::default().port_aus_env(None).unwrap();
        assert_eq!(cfg.netzwerk.port, 8001);

        assert!(ServerConfig::default().port_aus_env(Some("abc")).is_err());
    }

    #[test]
    fn relay_config_ableiten() {
        let cfg = ServerConfig::default();
        let relay = cfg.relay_config();
        assert_eq!(relay.sende_queue_groesse, 256);
        assert_eq!(relay.dist_pfad, Some(PathBuf::from("dist")));
        assert!(relay.cors_origins.is_empty());
    }

    #[test]
    fn fehlende_datei_liefert_standardwerte() {
        let cfg = ServerConfig::laden("/gibt/es/nicht/kollab.toml").unwrap();
        assert_eq!(cfg.server.name, "Kollab Server");
    }
}
