//! Presence-Verarbeitung
//!
//! Wandelt `<c>`-Eintraege einer PresenceV4-Benachrichtigung in
//! Zustands-, Mood- und Nickname-Updates fuer das Verzeichnis um.

use sipline_core::types::{BuddyId, PresenceState};
use sipline_protocol::body::{self, PresenceEntry};

use crate::account::SessionContext;
use crate::roster::BuddyEintrag;

/// Praesenzcode des Dienstes -> Zustand (total, Standard: Away)
pub fn zustand_aus_code(code: i32) -> PresenceState {
    match code {
        400 => PresenceState::Online,
        -1 | 0 => PresenceState::Offline,
        100 => PresenceState::Away,
        600 => PresenceState::Busy,
        _ => PresenceState::Away,
    }
}

/// Eigener Zielzustand -> Praesenzcode fuer SetPresenceV4
pub fn code_aus_zustand(zustand: PresenceState) -> i32 {
    match zustand {
        PresenceState::Online => 400,
        PresenceState::Away => 100,
        PresenceState::Busy => 600,
        PresenceState::Invisible => 0,
        PresenceState::Offline => 400,
    }
}

/// Ein anzuwendendes Presence-Update
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresenceUpdate {
    pub buddy: BuddyId,
    pub zustand: PresenceState,
    pub mood: String,
    /// Vom Dienst vorgeschlagener Spitzname
    pub nickname: Option<String>,
    pub portrait_crc: Option<String>,
}

impl PresenceUpdate {
    /// Fuehrt einen Eintrag mit dem Cache zusammen; fehlende Felder
    /// behalten den bisherigen Wert.
    pub fn aus_eintrag(eintrag: &PresenceEntry, cache: &BuddyEintrag) -> Self {
        Self {
            buddy: cache.id.clone(),
            zustand: eintrag
                .basis
                .map(zustand_aus_code)
                .unwrap_or(cache.zustand),
            mood: eintrag
                .mood
                .clone()
                .unwrap_or_else(|| cache.mood.clone()),
            nickname: eintrag
                .nickname
                .clone()
                .filter(|n| !n.is_empty())
                .or_else(|| cache.nickname.clone()),
            portrait_crc: eintrag
                .portrait_crc
                .clone()
                .or_else(|| cache.portrait_crc.clone()),
        }
    }
}

/// Wendet ein Update auf Verzeichnis und Cache an
///
/// Der Nickname wird nur ohne lokalen Alias uebernommen, der Mood immer.
/// Gibt `false` zurueck, wenn das Verzeichnis den Kontakt nicht kennt.
pub(crate) fn anwenden(ctx: &mut SessionContext, update: PresenceUpdate) -> bool {
    let Some(eintrag) = ctx.host.directory.find_buddy(&update.buddy) else {
        tracing::debug!(buddy = %update.buddy, "Presence fuer unbekannten Kontakt ignoriert");
        return false;
    };

    let verzeichnis = ctx.host.directory.as_mut();
    if !eintrag.hat_alias() {
        if let Some(nickname) = &update.nickname {
            if let Err(e) = verzeichnis.set_nickname(&update.buddy, nickname) {
                tracing::warn!(buddy = %update.buddy, fehler = %e, "Nickname nicht gesetzt");
            }
        }
    }
    if let Err(e) = verzeichnis.set_mood(&update.buddy, &update.mood) {
        tracing::warn!(buddy = %update.buddy, fehler = %e, "Mood nicht gesetzt");
    }
    if let Err(e) = verzeichnis.set_state(&update.buddy, update.zustand) {
        tracing::warn!(buddy = %update.buddy, fehler = %e, "Zustand nicht gesetzt");
    }

    ctx.host
        .portraits
        .refresh(&update.buddy, update.portrait_crc.as_deref());

    if let Some(cache) = ctx.roster.buddy_mut(&update.buddy) {
        cache.zustand = update.zustand;
        cache.mood = update.mood;
        cache.nickname = update.nickname;
        cache.portrait_crc = update.portrait_crc;
    }
    ctx.metrics.presence_aktualisiert();
    tracing::trace!(buddy = %update.buddy, zustand = %update.zustand, "Presence angewendet");
    true
}

/// Verarbeitet alle Eintraege einer Benachrichtigung, gibt die Anzahl
/// angewendeter Updates zurueck
pub(crate) fn verarbeiten(ctx: &mut SessionContext, inhalt: &str) -> usize {
    let mut angewendet = 0;
    for eintrag in body::presence_eintraege(inhalt) {
        let id = BuddyId::new(eintrag.user_id.as_str());
        let Some(cache) = ctx.roster.buddy(&id) else {
            tracing::debug!(buddy = %id, "Presence fuer Kontakt ausserhalb der Liste ignoriert");
            continue;
        };
        let update = PresenceUpdate::aus_eintrag(&eintrag, cache);
        if anwenden(ctx, update) {
            angewendet += 1;
        }
    }
    angewendet
}
