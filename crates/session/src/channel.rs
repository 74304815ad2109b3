//! Chat-Kanaele pro Kontakt
//!
//! Ein Kanal entsteht beim ersten Chat an einen erreichbaren Kontakt ohne
//! bestehenden Kanal. Seine ID ist die Call-ID der Einladung. Nachrichten
//! an einen noch nicht bereiten Kanal warten in der Transaktions-Tabelle
//! und werden bei "UserEntered" in Reihenfolge gesendet.
//!
//! ```text
//! chat_senden
//!   Kontakt offline/unsichtbar  -> direkte Nachricht (kein Kanal)
//!   Kanal bereit                -> sofort senden
//!   Kanal wartet                -> einreihen
//!   kein Kanal                  -> Einladung + Kanal anlegen + einreihen
//! ```

use std::collections::HashMap;
use std::time::Instant;

use sipline_core::types::{BuddyId, CallId, ChannelId};
use sipline_protocol::{body, request, SipMessage};

use crate::account::SessionContext;
use crate::error::{SessionError, SessionResult};
use crate::transaction::{Fehlgeschlagen, Freigabe, TransactionKind};

// ---------------------------------------------------------------------------
// ChannelSession
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ChannelSession {
    peer: BuddyId,
    kanal: ChannelId,
    bereit: bool,
    erstellt: Instant,
}

impl ChannelSession {
    pub fn neu(peer: BuddyId, kanal: ChannelId, jetzt: Instant) -> Self {
        Self {
            peer,
            kanal,
            bereit: false,
            erstellt: jetzt,
        }
    }

    pub fn peer(&self) -> &BuddyId {
        &self.peer
    }

    pub fn kanal(&self) -> ChannelId {
        self.kanal
    }

    pub fn ist_bereit(&self) -> bool {
        self.bereit
    }

    pub fn erstellt(&self) -> Instant {
        self.erstellt
    }

    /// Markiert den Kanal als bereit
    ///
    /// Gibt `true` zurueck, wenn das der Uebergang war; ein bereiter Kanal
    /// wird nie wieder "nicht bereit".
    pub fn bereit_setzen(&mut self) -> bool {
        !std::mem::replace(&mut self.bereit, true)
    }
}

/// Alle Kanaele einer Sitzung, hoechstens einer pro Kontakt
#[derive(Debug, Default)]
pub struct ChannelSessions {
    nach_peer: HashMap<BuddyId, ChannelSession>,
    nach_kanal: HashMap<ChannelId, BuddyId>,
}

impl ChannelSessions {
    pub fn neu() -> Self {
        Self::default()
    }

    pub fn get(&self, peer: &BuddyId) -> Option<&ChannelSession> {
        self.nach_peer.get(peer)
    }

    pub fn kanal_von(&self, peer: &BuddyId) -> Option<ChannelId> {
        self.nach_peer.get(peer).map(|k| k.kanal)
    }

    pub fn peer_von_kanal(&self, kanal: ChannelId) -> Option<&BuddyId> {
        self.nach_kanal.get(&kanal)
    }

    /// Legt einen Kanal an; ein bestehender Kanal zum selben Kontakt bleibt
    /// unveraendert und seine ID wird zurueckgegeben.
    pub fn anlegen(&mut self, peer: BuddyId, kanal: ChannelId, jetzt: Instant) -> ChannelId {
        if let Some(bestehend) = self.nach_peer.get(&peer) {
            return bestehend.kanal;
        }
        self.nach_kanal.insert(kanal, peer.clone());
        self.nach_peer
            .insert(peer.clone(), ChannelSession::neu(peer, kanal, jetzt));
        kanal
    }

    pub fn entfernen_nach_kanal(&mut self, kanal: ChannelId) -> Option<ChannelSession> {
        let peer = self.nach_kanal.remove(&kanal)?;
        self.nach_peer.remove(&peer)
    }

    /// `Some(true)` beim Uebergang, `Some(false)` wenn schon bereit
    pub fn bereit_setzen(&mut self, kanal: ChannelId) -> Option<bool> {
        let peer = self.nach_kanal.get(&kanal)?;
        self.nach_peer.get_mut(peer).map(ChannelSession::bereit_setzen)
    }

    pub fn anzahl(&self) -> usize {
        self.nach_peer.len()
    }

    /// Entfernt alle Kanaele und gibt ihre Anzahl zurueck
    pub fn leeren(&mut self) -> usize {
        let anzahl = self.nach_peer.len();
        self.nach_peer.clear();
        self.nach_kanal.clear();
        anzahl
    }
}

// ---------------------------------------------------------------------------
// Chat-Versand
// ---------------------------------------------------------------------------

/// Sendet Text an einen Kontakt (direkt, ueber den Kanal oder wartend)
///
/// Gibt die Call-ID der Nachricht zurueck.
pub(crate) fn chat_senden(
    ctx: &mut SessionContext,
    ziel: &BuddyId,
    text: &str,
    jetzt: Instant,
) -> SessionResult<CallId> {
    let (uri, zustand) = match ctx.roster.buddy(ziel) {
        Some(buddy) => (buddy.uri.clone(), buddy.zustand),
        None => return Err(SessionError::NichtGefunden(ziel.to_string())),
    };
    let direkt = TransactionKind::Nachricht {
        ziel: ziel.clone(),
        kanal: None,
    };

    if zustand.ist_unerreichbar() {
        tracing::debug!(buddy = %ziel, "Kontakt nicht erreichbar, Nachricht direkt");
        return ctx.anfrage_oeffnen(direkt, |kopf| request::nachricht(kopf, &uri, text), None, jetzt);
    }

    if let Some(kanal) = ctx.kanaele.get(ziel) {
        let (id, bereit) = (kanal.kanal(), kanal.ist_bereit());
        if bereit {
            return ctx.anfrage_oeffnen(
                direkt,
                |kopf| request::nachricht(kopf, &uri, text),
                None,
                jetzt,
            );
        }
        tracing::debug!(buddy = %ziel, kanal = %id, "Kanal noch nicht bereit, Nachricht wartet");
        return Ok(ctx.anfrage_einreihen(
            id,
            TransactionKind::Nachricht {
                ziel: ziel.clone(),
                kanal: Some(id),
            },
            |kopf| request::nachricht(kopf, &uri, text),
            None,
            jetzt,
        ));
    }

    let einladung = ctx.anfrage_oeffnen(
        TransactionKind::Einladung { ziel: ziel.clone() },
        |kopf| request::einladung(kopf, &uri),
        None,
        jetzt,
    )?;
    let kanal = ctx
        .kanaele
        .anlegen(ziel.clone(), ChannelId::from(einladung), jetzt);
    ctx.metrics.kanal_geoeffnet();
    tracing::debug!(buddy = %ziel, kanal = %kanal, "Kanal angelegt, Einladung gesendet");

    Ok(ctx.anfrage_einreihen(
        kanal,
        TransactionKind::Nachricht {
            ziel: ziel.clone(),
            kanal: Some(kanal),
        },
        |kopf| request::nachricht(kopf, &uri, text),
        None,
        jetzt,
    ))
}

/// Kanal aus einer Conversation-Benachrichtigung bestimmen
///
/// Zuerst ueber die Call-ID, sonst ueber die Mitglieds-URI im Body.
fn kanal_aus_benachrichtigung(ctx: &SessionContext, nachricht: &SipMessage) -> Option<ChannelId> {
    if let Some(kanal) = nachricht.call_id().map(ChannelId::from) {
        if ctx.kanaele.peer_von_kanal(kanal).is_some() {
            return Some(kanal);
        }
    }
    let uri = body::mitglied_uri(nachricht.body())?;
    let buddy = ctx.roster.buddy_nach_uri(&uri)?;
    ctx.kanaele.kanal_von(&buddy.id)
}

/// "UserEntered": Kanal bereit setzen und Warteliste freigeben
pub(crate) fn kanal_bereit(
    ctx: &mut SessionContext,
    nachricht: &SipMessage,
    jetzt: Instant,
) -> Option<Freigabe> {
    let Some(kanal) = kanal_aus_benachrichtigung(ctx, nachricht) else {
        tracing::debug!(call_id = ?nachricht.call_id(), "UserEntered fuer unbekannten Kanal");
        return None;
    };

    match ctx.kanaele.bereit_setzen(kanal) {
        Some(true) => {
            let freigabe = ctx
                .transaktionen
                .release_waiting(kanal, ctx.transport.as_mut(), jetzt);
            ctx.metrics
                .transactions_opened
                .inc_by(freigabe.gesendet.len() as u64);
            tracing::debug!(
                kanal = %kanal,
                gesendet = freigabe.gesendet.len(),
                "Kanal bereit, Warteliste freigegeben"
            );
            Some(freigabe)
        }
        Some(false) => {
            tracing::trace!(kanal = %kanal, "Kanal war bereits bereit");
            None
        }
        None => None,
    }
}

/// Kanal abbauen; wartende Nachrichten schlagen mit `KanalGeschlossen` fehl
pub(crate) fn kanal_abbauen(ctx: &mut SessionContext, kanal: ChannelId) -> Vec<Fehlgeschlagen> {
    let Some(session) = ctx.kanaele.entfernen_nach_kanal(kanal) else {
        return Vec::new();
    };
    ctx.metrics.kanaele_geschlossen(1);
    let peer = session.peer().clone();
    tracing::debug!(buddy = %peer, kanal = %kanal, "Kanal abgebaut");
    ctx.transaktionen
        .fail_waiting(kanal, || SessionError::KanalGeschlossen(peer.clone()))
}

/// "UserLeft": wie `kanal_abbauen`, Kanal aus der Benachrichtigung
pub(crate) fn kanal_verlassen(ctx: &mut SessionContext, nachricht: &SipMessage) -> Vec<Fehlgeschlagen> {
    match kanal_aus_benachrichtigung(ctx, nachricht) {
        Some(kanal) => kanal_abbauen(ctx, kanal),
        None => {
            tracing::debug!(call_id = ?nachricht.call_id(), "UserLeft fuer unbekannten Kanal");
            Vec::new()
        }
    }
}
