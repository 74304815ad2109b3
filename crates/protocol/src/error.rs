//! Fehlertypen fuer das SIP-C Parsing
//!
//! Parse-Fehler sind rein diagnostisch: die Sitzung loggt sie und verwirft
//! die Nachricht.

use thiserror::Error;

/// Fehler beim Zerlegen einer SIP-C Nachricht
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Leere Nachricht")]
    Leer,

    #[error("Ungueltige Startzeile: {0}")]
    Startzeile(String),

    #[error("Ungueltige Kopfzeile: {0}")]
    Kopfzeile(String),

    #[error("Ungueltige Inhaltslaenge: {0}")]
    Inhaltslaenge(String),

    #[error("Body unvollstaendig: erwartet {erwartet} Bytes, erhalten {erhalten}")]
    BodyUnvollstaendig { erwartet: usize, erhalten: usize },
}
