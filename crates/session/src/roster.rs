//! Kontakt-Cache einer Sitzung
//!
//! Haelt die vom Dienst gemeldeten Kontakte und Gruppen, die das
//! Verzeichnis der Host-Anwendung nicht kennt (URI, Portrait-CRC,
//! Praesenz fuer die Chat-Entscheidung). Zugriff per ID und per URI in O(1).

use std::collections::HashMap;

use sipline_core::types::{BuddyId, GroupId, PresenceState};

/// Zwischengespeicherter Kontakt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuddyEintrag {
    pub id: BuddyId,
    /// SIP-URI, z.B. `sip:7001@fetion.com.cn;p=4121`
    pub uri: String,
    pub gruppe: Option<GroupId>,
    pub lokaler_name: Option<String>,
    pub nickname: Option<String>,
    pub mood: String,
    pub zustand: PresenceState,
    pub portrait_crc: Option<String>,
}

impl BuddyEintrag {
    pub fn neu(id: BuddyId, uri: impl Into<String>) -> Self {
        Self {
            id,
            uri: uri.into(),
            gruppe: None,
            lokaler_name: None,
            nickname: None,
            mood: String::new(),
            zustand: PresenceState::Offline,
            portrait_crc: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GruppenEintrag {
    pub id: GroupId,
    pub name: String,
}

/// URI ohne Parameter (`sip:7001@fetion.com.cn;p=1` -> `sip:7001@fetion.com.cn`)
pub fn uri_normalisieren(uri: &str) -> &str {
    uri.split(';').next().unwrap_or(uri).trim()
}

#[derive(Debug, Default)]
pub struct Roster {
    buddies: HashMap<BuddyId, BuddyEintrag>,
    uri_index: HashMap<String, BuddyId>,
    gruppen: HashMap<GroupId, GruppenEintrag>,
}

impl Roster {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Fuegt einen Kontakt ein oder ersetzt ihn
    pub fn eintragen(&mut self, eintrag: BuddyEintrag) {
        if let Some(alt) = self.buddies.get(&eintrag.id) {
            self.uri_index.remove(uri_normalisieren(&alt.uri));
        }
        self.uri_index
            .insert(uri_normalisieren(&eintrag.uri).to_string(), eintrag.id.clone());
        self.buddies.insert(eintrag.id.clone(), eintrag);
    }

    pub fn buddy(&self, id: &BuddyId) -> Option<&BuddyEintrag> {
        self.buddies.get(id)
    }

    pub fn buddy_mut(&mut self, id: &BuddyId) -> Option<&mut BuddyEintrag> {
        self.buddies.get_mut(id)
    }

    /// Sucht einen Kontakt per URI (Parameter werden ignoriert)
    pub fn buddy_nach_uri(&self, uri: &str) -> Option<&BuddyEintrag> {
        self.uri_index
            .get(uri_normalisieren(uri))
            .and_then(|id| self.buddies.get(id))
    }

    pub fn buddy_entfernen(&mut self, id: &BuddyId) -> Option<BuddyEintrag> {
        let eintrag = self.buddies.remove(id)?;
        self.uri_index.remove(uri_normalisieren(&eintrag.uri));
        Some(eintrag)
    }

    pub fn gruppe_eintragen(&mut self, eintrag: GruppenEintrag) {
        self.gruppen.insert(eintrag.id.clone(), eintrag);
    }

    pub fn gruppe(&self, id: &GroupId) -> Option<&GruppenEintrag> {
        self.gruppen.get(id)
    }

    /// Leert den Cache, gibt die Anzahl freigegebener (Buddies, Gruppen) zurueck
    pub fn leeren(&mut self) -> (usize, usize) {
        let anzahl = (self.buddies.len(), self.gruppen.len());
        self.gruppen.clear();
        self.buddies.clear();
        self.uri_index.clear();
        anzahl
    }

    pub fn anzahl_buddies(&self) -> usize {
        self.buddies.len()
    }

    pub fn anzahl_gruppen(&self) -> usize {
        self.gruppen.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suche_nach_uri_ignoriert_parameter() {
        let mut roster = Roster::neu();
        roster.eintragen(BuddyEintrag::neu(
            BuddyId::new("501"),
            "sip:7001@fetion.com.cn;p=4121",
        ));

        let gefunden = roster.buddy_nach_uri("sip:7001@fetion.com.cn;p=9").unwrap();
        assert_eq!(gefunden.id, BuddyId::new("501"));
        assert!(roster.buddy_nach_uri("sip:7002@fetion.com.cn").is_none());
    }

    #[test]
    fn ersetzen_aktualisiert_uri_index() {
        let mut roster = Roster::neu();
        let id = BuddyId::new("501");
        roster.eintragen(BuddyEintrag::neu(id.clone(), "sip:alt@fetion.com.cn"));
        roster.eintragen(BuddyEintrag::neu(id.clone(), "sip:neu@fetion.com.cn"));

        assert!(roster.buddy_nach_uri("sip:alt@fetion.com.cn").is_none());
        assert!(roster.buddy_nach_uri("sip:neu@fetion.com.cn").is_some());
        assert_eq!(roster.anzahl_buddies(), 1);
    }

    #[test]
    fn entfernen_und_leeren() {
        let mut roster = Roster::neu();
        roster.eintragen(BuddyEintrag::neu(BuddyId::new("1"), "sip:1@x"));
        roster.eintragen(BuddyEintrag::neu(BuddyId::new("2"), "sip:2@x"));
        roster.gruppe_eintragen(GruppenEintrag {
            id: GroupId::new("1"),
            name: "Freunde".into(),
        });

        assert!(roster.buddy_entfernen(&BuddyId::new("1")).is_some());
        assert!(roster.buddy_nach_uri("sip:1@x").is_none());
        assert_eq!(roster.leeren(), (1, 1));
        assert_eq!(roster.leeren(), (0, 0));
    }
}
