//! sipline-core – Gemeinsame Typen, Traits und Fehlertypen
//!
//! Dieses Crate stellt die Bausteine bereit, die Protokoll, Sitzung und
//! Client gemeinsam nutzen: ID-Typen, Praesenzzustaende, die Schnittstellen
//! zu den Kollaborateuren der Host-Anwendung und die Sitzungsereignisse.

pub mod directory;
pub mod error;
pub mod event;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use directory::{BuddyRecord, Directory, MemoryDirectory};
pub use error::{DirectoryError, DirectoryResult};
pub use event::{KeinPortrait, Notifier, Operation, PortraitFetcher, SessionEvent};
pub use types::{BuddyId, CallId, ChannelId, GroupId, PresenceState};
