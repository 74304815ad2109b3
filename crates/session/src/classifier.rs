//! Klassifizierung und Verteilung eingehender Nachrichten
//!
//! ```text
//! Rohtext -> SipMessage -> Klasse (+ Ereignis bei BN) -> Handler
//!
//!   Antwort          -> Transaktions-Tabelle
//!   BN PresenceV4    -> Presence
//!   BN Conversation  -> Kanal bereit / Kanal abbauen
//!   BN Registration  -> Abmeldung (fatal)
//!   M                -> Chat empfangen
//!   I, IN, Sync, ... -> angenommen, ignoriert
//!   alles andere     -> verworfen (debug)
//! ```
//!
//! Fehler beim Lesen einer Nachricht verwerfen nur diese Nachricht.

use sipline_core::types::CallId;
use sipline_observability::VerwerfGrund;
use sipline_protocol::{body, Method, ParseError, SipMessage};

use crate::account::SessionAccount;

/// Oberste Nachrichtenklasse
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nachrichtenklasse {
    Benachrichtigung(NotificationKind),
    Chat,
    Einladung,
    Info,
    Antwort,
}

/// Unterart einer `BN`-Benachrichtigung
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    PresenceChanged,
    UserEntered,
    UserLeft,
    Deregistered,
    UserInfoSync,
    ContactRequest,
    /// Gruppen-Benachrichtigung (PGGroup), beliebiges Ereignis
    Gruppe,
}

/// Gelesene und klassifizierte Nachricht
#[derive(Debug, Clone)]
pub struct RawMessage {
    pub klasse: Nachrichtenklasse,
    pub call_id: Option<CallId>,
    pub nachricht: SipMessage,
}

impl RawMessage {
    pub fn header(&self, key: &str) -> Option<&str> {
        self.nachricht.header(key)
    }

    pub fn body(&self) -> &str {
        self.nachricht.body()
    }
}

#[derive(Debug)]
pub enum Klassifiziert {
    Erkannt(RawMessage),
    /// Lesbar, aber Klasse oder Ereignis unbekannt
    Unbekannt(SipMessage),
    Fehlerhaft(ParseError),
}

fn gleich(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

/// Bestimmt die Unterart aus `N`-Header und `<event type>` im Body
fn benachrichtigung(nachricht: &SipMessage) -> Option<NotificationKind> {
    let ereignis = nachricht.event()?.trim();
    if gleich(ereignis, "PGGroup") {
        return Some(NotificationKind::Gruppe);
    }

    body::ereignis_typen(nachricht.body())
        .iter()
        .find_map(|typ| {
            let typ = typ.as_str();
            match () {
                _ if gleich(ereignis, "PresenceV4") && gleich(typ, "PresenceChanged") => {
                    Some(NotificationKind::PresenceChanged)
                }
                _ if gleich(ereignis, "Conversation") && gleich(typ, "UserEntered") => {
                    Some(NotificationKind::UserEntered)
                }
                _ if gleich(ereignis, "Conversation") && gleich(typ, "UserLeft") => {
                    Some(NotificationKind::UserLeft)
                }
                _ if gleich(ereignis, "Registration") && gleich(typ, "deregistered") => {
                    Some(NotificationKind::Deregistered)
                }
                _ if gleich(ereignis, "SyncUserInfoV4") && gleich(typ, "SyncUserInfo") => {
                    Some(NotificationKind::UserInfoSync)
                }
                _ if gleich(ereignis, "contact") && gleich(typ, "AddBuddyApplication") => {
                    Some(NotificationKind::ContactRequest)
                }
                _ => None,
            }
        })
}

/// Liest und klassifiziert eine Rohnachricht
pub fn klassifizieren(raw: &str) -> Klassifiziert {
    let nachricht = match SipMessage::parse(raw) {
        Ok(n) => n,
        Err(e) => return Klassifiziert::Fehlerhaft(e),
    };

    let klasse = if nachricht.is_response() {
        Some(Nachrichtenklasse::Antwort)
    } else {
        match nachricht.method() {
            Some(Method::Notify) => {
                benachrichtigung(&nachricht).map(Nachrichtenklasse::Benachrichtigung)
            }
            Some(Method::Message) => Some(Nachrichtenklasse::Chat),
            Some(Method::Invite) => Some(Nachrichtenklasse::Einladung),
            Some(Method::Info) => Some(Nachrichtenklasse::Info),
            _ => None,
        }
    };

    match klasse {
        Some(klasse) => Klassifiziert::Erkannt(RawMessage {
            klasse,
            call_id: nachricht.call_id(),
            nachricht,
        }),
        None => Klassifiziert::Unbekannt(nachricht),
    }
}

/// Verteilt eine Rohnachricht an die Handler des Kontos
pub(crate) fn verteilen(konto: &mut SessionAccount, raw: &str) {
    let msg = match klassifizieren(raw) {
        Klassifiziert::Erkannt(msg) => msg,
        Klassifiziert::Unbekannt(nachricht) => {
            tracing::debug!(start = ?nachricht.start(), ereignis = ?nachricht.event(), "Unbekannte Nachricht verworfen");
            konto.metrics().nachricht_verworfen(VerwerfGrund::Unbekannt);
            return;
        }
        Klassifiziert::Fehlerhaft(e) => {
            tracing::debug!(fehler = %e, "Nicht lesbare Nachricht verworfen");
            konto.metrics().nachricht_verworfen(VerwerfGrund::Parse);
            return;
        }
    };

    tracing::trace!(klasse = ?msg.klasse, call_id = ?msg.call_id, "Nachricht empfangen");

    match msg.klasse {
        Nachrichtenklasse::Antwort => konto.antwort_empfangen(&msg.nachricht),
        Nachrichtenklasse::Chat => konto.chat_empfangen(&msg.nachricht),
        Nachrichtenklasse::Benachrichtigung(art) => match art {
            NotificationKind::PresenceChanged => konto.presence_empfangen(msg.body()),
            NotificationKind::UserEntered => konto.kanal_betreten(&msg.nachricht),
            NotificationKind::UserLeft => konto.kanal_verlassen(&msg.nachricht),
            NotificationKind::Deregistered => konto.abgemeldet(),
            NotificationKind::UserInfoSync
            | NotificationKind::ContactRequest
            | NotificationKind::Gruppe => {
                tracing::debug!(art = ?art, "Benachrichtigung angenommen, keine Aktion");
            }
        },
        Nachrichtenklasse::Einladung | Nachrichtenklasse::Info => {
            tracing::debug!(klasse = ?msg.klasse, call_id = ?msg.call_id, "Nachricht angenommen, keine Aktion");
        }
    }
}
