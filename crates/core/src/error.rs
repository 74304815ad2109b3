//! Fehlertypen fuer die Kollaborations-Schnittstellen
//!
//! Die Sitzungslogik ruft das Verzeichnis nur auf, besitzt dessen Speicher
//! aber nicht. Fehler des Verzeichnisses werden geloggt, nie propagiert.

use thiserror::Error;

/// Result-Alias fuer Verzeichnis-Operationen
pub type DirectoryResult<T> = std::result::Result<T, DirectoryError>;

/// Fehler eines Verzeichnis-Kollaborateurs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("Kontakt nicht gefunden: {0}")]
    BuddyNichtGefunden(String),

    #[error("Gruppe nicht gefunden: {0}")]
    GruppeNichtGefunden(String),

    #[error("Verzeichnis nicht verfuegbar: {0}")]
    NichtVerfuegbar(String),
}
