//! Sitzungsereignisse und Benachrichtigungs-Schnittstellen
//!
//! Ereignisse fliessen von einer Sitzung an die Host-Anwendung (ueber einen
//! tokio-Kanal, der im Sitzungs-Crate verdrahtet wird). `Notifier` und
//! `PortraitFetcher` sind Kollaborateure, die die Host-Anwendung stellt.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{BuddyId, PresenceState};

/// Operationen, deren Ergebnis asynchron gemeldet wird
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    Anmeldung,
    Nachricht,
    Einladung,
    Zustand,
    KeepAlive,
    Verschieben,
    Entfernen,
    Umbenennen,
    Info,
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Anmeldung => "anmeldung",
            Self::Nachricht => "nachricht",
            Self::Einladung => "einladung",
            Self::Zustand => "zustand",
            Self::KeepAlive => "keepalive",
            Self::Verschieben => "verschieben",
            Self::Entfernen => "entfernen",
            Self::Umbenennen => "umbenennen",
            Self::Info => "info",
        };
        f.write_str(name)
    }
}

/// Alle Ereignisse, die eine Sitzung an die Host-Anwendung meldet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    // --- Konto ---
    /// Anmeldung abgeschlossen, Kontaktliste uebernommen
    Angemeldet { buddies: usize, gruppen: usize },
    /// Eigener Zustand wurde vom Dienst bestaetigt
    ZustandGeaendert { zustand: PresenceState },
    /// Terminaler Fehler, die Sitzung verarbeitet nichts mehr
    Fatal { grund: String },

    // --- Nachrichten ---
    ChatEmpfangen {
        von: BuddyId,
        text: String,
        empfangen: DateTime<Utc>,
    },
    SystemNachricht { text: String, url: Option<String> },

    // --- Ergebnisse ---
    OperationErfolgreich {
        operation: Operation,
        ziel: Option<BuddyId>,
    },
    OperationFehlgeschlagen {
        operation: Operation,
        ziel: Option<BuddyId>,
        grund: String,
    },
}

/// Zeigt dem Benutzer Hinweise an
pub trait Notifier: Send {
    /// Textbenachrichtigung mit Titel
    fn notify(&self, titel: &str, text: &str);

    /// Kontofehler mit lesbarem Grund (terminal)
    fn account_error(&self, grund: &str);
}

/// Laedt Avatare nach (fire-and-forget)
pub trait PortraitFetcher: Send {
    fn refresh(&self, buddy: &BuddyId, crc: Option<&str>);
}

/// Portrait-Lader, der nichts tut
#[derive(Debug, Clone, Copy, Default)]
pub struct KeinPortrait;

impl PortraitFetcher for KeinPortrait {
    fn refresh(&self, _buddy: &BuddyId, _crc: Option<&str>) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_ist_serde_kompatibel() {
        let event = SessionEvent::OperationFehlgeschlagen {
            operation: Operation::Umbenennen,
            ziel: Some(BuddyId::new("501")),
            grund: "403 Forbidden".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let zurueck: SessionEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(zurueck, event);
    }

    #[test]
    fn operation_anzeige() {
        assert_eq!(Operation::KeepAlive.to_string(), "keepalive");
    }
}
