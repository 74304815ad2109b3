//! Fehlertypen fuer den Sitzungskern

use sipline_core::types::{BuddyId, CallId};
use sipline_protocol::{ParseError, SipMessage};
use thiserror::Error;

/// Fehlertyp fuer Sitzungsoperationen
#[derive(Debug, Error)]
pub enum SessionError {
    /// Nachricht nicht lesbar (nur diagnostisch, wird nie an den Host gegeben)
    #[error("Parse-Fehler: {0}")]
    Parse(#[from] ParseError),

    /// Dieselbe Identitaet hat sich an anderer Stelle angemeldet
    #[error("Konto wurde an anderer Stelle angemeldet")]
    AnderswoAngemeldet,

    #[error("Anmeldung fehlgeschlagen: {status} {grund}")]
    AnmeldungFehlgeschlagen { status: u16, grund: String },

    /// Anfrage vom Dienst abgelehnt (keine automatische Wiederholung)
    #[error("Vom Dienst abgelehnt: {status} {grund}")]
    Abgelehnt { status: u16, grund: String },

    #[error("Transaktion {0} abgelaufen")]
    Timeout(CallId),

    #[error("Kanal zu {0} geschlossen")]
    KanalGeschlossen(BuddyId),

    #[error("Nicht angemeldet")]
    NichtAngemeldet,

    #[error("Sitzung geschlossen")]
    Geschlossen,

    #[error("Nicht gefunden: {0}")]
    NichtGefunden(String),

    #[error("Unbekanntes Protokoll: {0}")]
    UnbekanntesProtokoll(String),

    #[error("Ungueltige Antwort: {0}")]
    UngueltigeAntwort(String),

    /// Senden ueber den Transport fehlgeschlagen (Transport geschlossen)
    #[error("Senden fehlgeschlagen")]
    SendFehler,

    /// IO-Fehler (TCP, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Ablehnung aus einer Antwort mit Nicht-2xx-Status
    pub fn abgelehnt(antwort: &SipMessage) -> Self {
        Self::Abgelehnt {
            status: antwort.status().unwrap_or(0),
            grund: antwort.reason().unwrap_or("").to_string(),
        }
    }

    /// Terminale Kontofehler
    pub fn ist_fatal(&self) -> bool {
        matches!(
            self,
            Self::AnderswoAngemeldet | Self::AnmeldungFehlgeschlagen { .. }
        )
    }
}

/// Result-Typ fuer den Sitzungskern
pub type SessionResult<T> = Result<T, SessionError>;
