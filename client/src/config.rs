//! Client-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! Standardwerte; ohne Datei fehlen nur die Zugangsdaten.

use serde::{Deserialize, Serialize};

use sipline_observability::logging::{log_format_gueltig, log_level_gueltig};
use sipline_session::{Credentials, SessionConfig};

/// Umgebungsvariable fuer den Pfad der Konfigurationsdatei
pub const ENV_CONFIG: &str = "SIPLINE_CONFIG";

/// Standard-Pfad der Konfigurationsdatei
pub const STANDARD_PFAD: &str = "sipline.toml";

/// Vollstaendige Client-Konfiguration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Zugangsdaten des Kontos
    pub konto: KontoEinstellungen,
    pub netzwerk: NetzwerkEinstellungen,
    pub sitzung: SitzungsEinstellungen,
    pub logging: LoggingEinstellungen,
}

/// Zugangsdaten aus der vorgelagerten Anmeldung
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct KontoEinstellungen {
    pub sid: String,
    pub user_id: String,
    pub uri: String,
    pub mobile: String,
    pub auth_token: String,
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Host des SIP-C Dienstes
    pub host: String,
    pub port: u16,
    /// Domain in Startzeilen und Anfragen
    pub domain: String,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            host: "221.176.31.4".into(),
            port: 8080,
            domain: "fetion.com.cn".into(),
        }
    }
}

/// Sitzungs-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SitzungsEinstellungen {
    /// Frist fuer unbeantwortete Anfragen in Sekunden
    pub transaktions_timeout_sek: u64,
    /// Keepalive-Intervall in Sekunden (0 = aus)
    pub keepalive_sek: u64,
    /// Maximale Body-Groesse eingehender Nachrichten
    pub max_frame_groesse: usize,
}

impl Default for SitzungsEinstellungen {
    fn default() -> Self {
        let standard = SessionConfig::default();
        Self {
            transaktions_timeout_sek: standard.transaktions_timeout_sek,
            keepalive_sek: standard.keepalive_sek,
            max_frame_groesse: standard.max_frame_groesse,
        }
    }
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

impl ClientConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Pfad aus `SIPLINE_CONFIG`, sonst `sipline.toml`
    pub fn pfad_aus_env() -> String {
        std::env::var(ENV_CONFIG).unwrap_or_else(|_| STANDARD_PFAD.into())
    }

    /// Prueft die Werte, die sich nicht per Default ergaenzen lassen
    pub fn pruefen(&self) -> anyhow::Result<()> {
        if self.konto.sid.trim().is_empty() {
            anyhow::bail!("[konto] sid fehlt");
        }
        if self.konto.auth_token.is_empty() {
            anyhow::bail!("[konto] auth_token fehlt");
        }
        if !log_level_gueltig(&self.logging.level) {
            anyhow::bail!("Ungueltiger Log-Level: {}", self.logging.level);
        }
        if !log_format_gueltig(&self.logging.format) {
            anyhow::bail!("Ungueltiges Log-Format: {}", self.logging.format);
        }
        Ok(())
    }

    /// Adresse fuer die TCP-Verbindung
    pub fn adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.host, self.netzwerk.port)
    }

    /// Laufzeit-Ausschnitt fuer die Sitzung
    pub fn sitzung_config(&self) -> SessionConfig {
        SessionConfig {
            domain: self.netzwerk.domain.clone(),
            transaktions_timeout_sek: self.sitzung.transaktions_timeout_sek,
            keepalive_sek: self.sitzung.keepalive_sek,
            max_frame_groesse: self.sitzung.max_frame_groesse,
            ..SessionConfig::default()
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            sid: self.konto.sid.clone(),
            user_id: self.konto.user_id.clone(),
            uri: self.konto.uri.clone(),
            mobile: self.konto.mobile.clone(),
            auth_token: self.konto.auth_token.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config() {
        let cfg = ClientConfig::default();
        assert_eq!(cfg.netzwerk.port, 8080);
        assert_eq!(cfg.netzwerk.domain, "fetion.com.cn");
        assert_eq!(cfg.sitzung.transaktions_timeout_sek, 60);
        assert_eq!(cfg.logging.level, "info");
        // Ohne Zugangsdaten nicht startfaehig
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [konto]
            sid = "916098834"
            user_id = "400"
            auth_token = "abc"

            [netzwerk]
            host = "127.0.0.1"
            port = 9000

            [sitzung]
            keepalive_sek = 0
        "#;
        let cfg: ClientConfig = toml::from_str(toml).unwrap();
        assert!(cfg.pruefen().is_ok());
        assert_eq!(cfg.adresse(), "127.0.0.1:9000");
        assert_eq!(cfg.credentials().sid, "916098834");

        let sitzung = cfg.sitzung_config();
        assert_eq!(sitzung.keepalive_intervall(), None);
        // Nicht angegebene Felder behalten Standardwerte
        assert_eq!(sitzung.domain, "fetion.com.cn");
        assert_eq!(sitzung.transaktions_timeout_sek, 60);
    }

    #[test]
    fn ungueltiges_log_format() {
        let mut cfg = ClientConfig::default();
        cfg.konto.sid = "1".into();
        cfg.konto.auth_token = "t".into();
        cfg.logging.format = "xml".into();
        assert!(cfg.pruefen().is_err());
    }

    #[test]
    fn fehlende_datei_liefert_standard() {
        let cfg = ClientConfig::laden("/nicht/vorhanden/sipline.toml").unwrap();
        assert_eq!(cfg.netzwerk.port, 8080);
    }
}
