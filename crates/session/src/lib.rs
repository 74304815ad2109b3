//! sipline-session – Sitzungskern fuer SIP-C/4.0
//!
//! Dieser Crate haelt den Zustand eines angemeldeten Kontos: offene
//! Transaktionen, die Kontaktliste mit Praesenz, die Chat-Kanaele pro
//! Gespraechspartner und die Reaktion auf erzwungene Abmeldung.
//!
//! ## Architektur
//!
//! ```text
//! Verbindungs-Task (connection, pro Konto ein Task)
//!     |  Framed<SipcCodec>, Takt, Kommandos vom AccountHandle
//!     v
//! SessionAccount (account)
//!     |
//!     +-- classifier    Rohtext -> Klasse -> Handler
//!     +-- transaction   Call-ID -> Rueckruf, Warteschlangen pro Kanal
//!     +-- presence      Praesenz-Updates -> Directory + Roster
//!     +-- channel       ein Kanal pro Partner, Einladung, Freigabe
//!     +-- roster        Kontakte/Gruppen, URI-Index
//!     +-- info          Kontaktdetails fuer get_info
//!
//! ProtocolRegistry – Protokoll per Name waehlen
//! ```

pub mod account;
pub mod channel;
pub mod classifier;
pub mod config;
pub mod connection;
pub mod error;
pub mod info;
pub mod presence;
pub mod registry;
pub mod roster;
pub mod transaction;
pub mod transport;

#[cfg(test)]
mod testhilfe;

// Bequeme Re-Exporte
pub use account::{Abbau, AccountState, FatalGrund, HostServices, SessionAccount};
pub use classifier::{klassifizieren, Klassifiziert, Nachrichtenklasse, NotificationKind, RawMessage};
pub use config::{Credentials, SessionConfig};
pub use connection::{starten, verbinden, AccountCommand, AccountHandle};
pub use error::{SessionError, SessionResult};
pub use info::{BuddyInfo, InfoRueckruf};
pub use registry::{Protocol, ProtocolAccount, ProtocolRegistry, SipcProtocol, SIPC_NAME};
pub use transaction::{TransactionKind, TransactionTable};
pub use transport::{ChannelTransport, Transport};
