//! Kontaktinformationen (Antwort auf GetContactInfoV4)

use serde::{Deserialize, Serialize};
use sipline_protocol::body::{ContactInfo, Gender};

use crate::error::SessionResult;

/// Platzhalter fuer leere Regionsangaben
pub const UNBEKANNT: &str = "Unknown";

/// Abschluss-Rueckruf von `get_info`
pub type InfoRueckruf = Box<dyn FnOnce(SessionResult<BuddyInfo>) + Send>;

/// Aufbereitete Kontaktinformationen fuer die Anzeige
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuddyInfo {
    pub nickname: String,
    pub lokaler_name: String,
    pub sid: String,
    pub mobile: String,
    pub gender: Gender,
    pub mood: String,
    pub land: String,
    pub provinz: String,
    pub stadt: String,
}

fn oder_unbekannt(wert: &str) -> String {
    if wert.is_empty() {
        UNBEKANNT.to_string()
    } else {
        wert.to_string()
    }
}

impl BuddyInfo {
    pub fn aus_kontakt(kontakt: &ContactInfo, lokaler_name: Option<&str>) -> Self {
        let (land, provinz, stadt) = kontakt.region_teile();
        Self {
            nickname: kontakt.nickname.clone(),
            lokaler_name: lokaler_name.unwrap_or("").to_string(),
            sid: kontakt.sid.clone(),
            mobile: kontakt.mobile.clone(),
            gender: kontakt.gender,
            mood: kontakt.impresa.clone(),
            land: match land {
                "CN" => "China".to_string(),
                andere => oder_unbekannt(andere),
            },
            provinz: oder_unbekannt(provinz),
            stadt: oder_unbekannt(stadt),
        }
    }

    /// Anzeige als (Bezeichnung, Wert)-Paare in fester Reihenfolge
    pub fn felder(&self) -> Vec<(&'static str, &str)> {
        vec![
            ("Nickname", self.nickname.as_str()),
            ("Localname", self.lokaler_name.as_str()),
            ("Fetion-no", self.sid.as_str()),
            ("Mobile-no", self.mobile.as_str()),
            ("Mood", self.mood.as_str()),
            ("Country", self.land.as_str()),
            ("Province", self.provinz.as_str()),
            ("City", self.stadt.as_str()),
        ]
    }
}

impl std::fmt::Display for BuddyInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (name, wert) in self.felder() {
            writeln!(f, "{name}: {wert}")?;
        }
        write!(f, "Gender: {}", self.gender)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kontakt(region: &str) -> ContactInfo {
        ContactInfo {
            user_id: "501".into(),
            sid: "7001".into(),
            mobile: "13800000000".into(),
            nickname: "Tom".into(),
            impresa: "unterwegs".into(),
            gender: Gender::Female,
            region: region.into(),
        }
    }

    #[test]
    fn region_china() {
        let info = BuddyInfo::aus_kontakt(&kontakt("CN.bj.10."), Some("Tommy"));
        assert_eq!(info.land, "China");
        assert_eq!(info.provinz, "bj");
        assert_eq!(info.stadt, "10");
        assert_eq!(info.lokaler_name, "Tommy");
        assert_eq!(info.mood, "unterwegs");
    }

    #[test]
    fn leere_region_ist_unbekannt() {
        let info = BuddyInfo::aus_kontakt(&kontakt(""), None);
        assert_eq!(info.land, UNBEKANNT);
        assert_eq!(info.provinz, UNBEKANNT);
        assert_eq!(info.stadt, UNBEKANNT);
        assert_eq!(info.lokaler_name, "");
    }

    #[test]
    fn anzeige_enthaelt_alle_felder() {
        let text = BuddyInfo::aus_kontakt(&kontakt("HK.."), None).to_string();
        assert!(text.contains("Country: HK"));
        assert!(text.contains("City: Unknown"));
        assert!(text.ends_with("Gender: Female"));
    }
}
