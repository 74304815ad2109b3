//! Sitzungs-Konfiguration und Zugangsdaten
//!
//! `SessionConfig` ist der Laufzeit-Ausschnitt der Client-Konfiguration,
//! der jeder Sitzung als `Arc` mitgegeben wird.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Laufzeit-Einstellungen einer Sitzung
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Ziel-Domain in den Startzeilen
    pub domain: String,
    /// Frist fuer offene und wartende Transaktionen
    pub transaktions_timeout_sek: u64,
    /// Intervall fuer automatische Keepalives (0 = aus)
    pub keepalive_sek: u64,
    /// Maximale Body-Groesse eingehender Nachrichten
    pub max_frame_groesse: usize,
    /// Puffer fuer Host-Kommandos pro Sitzung
    pub kommando_puffer: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            domain: "fetion.com.cn".into(),
            transaktions_timeout_sek: 60,
            keepalive_sek: 70,
            max_frame_groesse: sipline_protocol::wire::DEFAULT_MAX_FRAME_SIZE,
            kommando_puffer: 64,
        }
    }
}

impl SessionConfig {
    pub fn transaktions_timeout(&self) -> Duration {
        Duration::from_secs(self.transaktions_timeout_sek)
    }

    /// `None` wenn automatische Keepalives abgeschaltet sind
    pub fn keepalive_intervall(&self) -> Option<Duration> {
        (self.keepalive_sek > 0).then(|| Duration::from_secs(self.keepalive_sek))
    }
}

/// Zugangsdaten eines Kontos
///
/// Das Token stammt aus der vorgelagerten Authentifizierung und wird hier
/// nur durchgereicht.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Credentials {
    /// Fetion-Nummer (SID)
    pub sid: String,
    pub user_id: String,
    pub uri: String,
    pub mobile: String,
    pub auth_token: String,
}
