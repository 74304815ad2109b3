//! Auswertung der XML-Bodies
//!
//! Die Bodies des Dienstes sind flaches XML ohne Namensraeume. Gebraucht
//! werden nur Elemente mit Attributen und der Text einfacher Elemente, daher
//! genuegt ein kleiner nom-Scanner statt eines vollstaendigen XML-Parsers.
//! Verschachtelte Elemente gleichen Namens werden nicht unterstuetzt.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till, take_while1},
    character::complete::{char, multispace0, multispace1},
    combinator::map,
    multi::many0,
    sequence::{delimited, preceded, separated_pair, tuple},
    IResult,
};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Element-Scanner
// ---------------------------------------------------------------------------

/// Ein gefundenes Element mit Attributen und optionalem Inhalt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element<'a> {
    attrs: Vec<(&'a str, String)>,
    /// Text zwischen Start- und End-Tag (`None` bei `<x/>`)
    pub inhalt: Option<&'a str>,
}

impl<'a> Element<'a> {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Attribut, leere Werte als `None`
    pub fn attr_nicht_leer(&self, name: &str) -> Option<&str> {
        self.attr(name).filter(|v| !v.is_empty())
    }
}

fn attribut(input: &str) -> IResult<&str, (&str, String)> {
    map(
        preceded(
            multispace1,
            separated_pair(
                take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == ':'),
                delimited(multispace0, char('='), multispace0),
                alt((
                    delimited(char('"'), take_till(|c: char| c == '"'), char('"')),
                    delimited(char('\''), take_till(|c: char| c == '\''), char('\'')),
                )),
            ),
        ),
        |(name, wert)| (name, xml_unescape(wert)),
    )(input)
}

/// Start-Tag; liefert Attribute und ob das Element selbstschliessend ist
fn start_tag<'a>(
    input: &'a str,
    name: &str,
) -> IResult<&'a str, (Vec<(&'a str, String)>, bool)> {
    map(
        tuple((
            char('<'),
            tag(name),
            many0(attribut),
            multispace0,
            alt((tag("/>"), tag(">"))),
        )),
        |(_, _, attrs, _, ende)| (attrs, ende == "/>"),
    )(input)
}

/// Alle Elemente eines Namens in Dokumentreihenfolge
pub fn elemente<'a>(xml: &'a str, name: &str) -> Vec<Element<'a>> {
    let oeffnend = format!("<{name}");
    let schliessend = format!("</{name}>");
    let mut gefunden = Vec::new();
    let mut rest = xml;

    while let Some(pos) = rest.find(&oeffnend) {
        let kandidat = &rest[pos..];
        match start_tag(kandidat, name) {
            Ok((nach_tag, (attrs, true))) => {
                gefunden.push(Element {
                    attrs,
                    inhalt: None,
                });
                rest = nach_tag;
            }
            Ok((nach_tag, (attrs, false))) => match nach_tag.find(&schliessend) {
                Some(ende) => {
                    gefunden.push(Element {
                        attrs,
                        inhalt: Some(&nach_tag[..ende]),
                    });
                    rest = &nach_tag[ende + schliessend.len()..];
                }
                None => {
                    gefunden.push(Element {
                        attrs,
                        inhalt: None,
                    });
                    rest = nach_tag;
                }
            },
            // Anderes Element mit gleichem Praefix (z.B. `<contacts` statt `<c`)
            Err(_) => rest = &kandidat[oeffnend.len()..],
        }
    }
    gefunden
}

/// Erstes Element eines Namens
pub fn element<'a>(xml: &'a str, name: &str) -> Option<Element<'a>> {
    elemente(xml, name).into_iter().next()
}

/// Ersetzt die fuenf vordefinierten XML-Entitaeten
pub fn xml_unescape(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Maskiert Text fuer Attributwerte und Elementinhalt
pub fn xml_escape(text: &str) -> String {
    let mut aus = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => aus.push_str("&amp;"),
            '<' => aus.push_str("&lt;"),
            '>' => aus.push_str("&gt;"),
            '"' => aus.push_str("&quot;"),
            '\'' => aus.push_str("&apos;"),
            anders => aus.push(anders),
        }
    }
    aus
}

// ---------------------------------------------------------------------------
// Ereignisse
// ---------------------------------------------------------------------------

/// Werte der `type`-Attribute aller `<event>`-Elemente
pub fn ereignis_typen(body: &str) -> Vec<String> {
    elemente(body, "event")
        .iter()
        .filter_map(|e| e.attr("type").map(str::to_string))
        .collect()
}

/// URI des Teilnehmers aus `<member uri=…/>` (Konversations-Ereignisse)
pub fn mitglied_uri(body: &str) -> Option<String> {
    element(body, "member").and_then(|e| e.attr_nicht_leer("uri").map(str::to_string))
}

// ---------------------------------------------------------------------------
// Presence
// ---------------------------------------------------------------------------

/// Ein `<c>`-Eintrag einer Presence-Benachrichtigung
///
/// Fehlende Attribute bleiben `None`; der Aufrufer behaelt dann den
/// bisherigen Wert.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PresenceEntry {
    pub user_id: String,
    pub basis: Option<i32>,
    pub nickname: Option<String>,
    pub mood: Option<String>,
    pub portrait_crc: Option<String>,
}

pub fn presence_eintraege(body: &str) -> Vec<PresenceEntry> {
    elemente(body, "c")
        .into_iter()
        .filter_map(|c| {
            let user_id = c.attr_nicht_leer("id")?.to_string();
            let inhalt = c.inhalt.unwrap_or("");
            let mut eintrag = PresenceEntry {
                user_id,
                ..PresenceEntry::default()
            };
            if let Some(p) = element(inhalt, "p") {
                eintrag.nickname = p.attr("n").map(str::to_string);
                eintrag.mood = p.attr("i").map(str::to_string);
                eintrag.portrait_crc = p.attr_nicht_leer("p").map(str::to_string);
            }
            if let Some(pr) = element(inhalt, "pr") {
                eintrag.basis = pr.attr("b").and_then(|b| b.trim().parse().ok());
            }
            Some(eintrag)
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Kontaktliste (Antwort auf die Registrierung)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupEntry {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactEntry {
    pub user_id: String,
    pub uri: String,
    pub lokaler_name: Option<String>,
    /// Erste Gruppe aus `l="1;3"`
    pub gruppe: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactList {
    pub gruppen: Vec<GroupEntry>,
    pub kontakte: Vec<ContactEntry>,
}

pub fn kontaktliste(body: &str) -> ContactList {
    let gruppen = elemente(body, "buddy-list")
        .into_iter()
        .filter_map(|g| {
            Some(GroupEntry {
                id: g.attr_nicht_leer("id")?.to_string(),
                name: g.attr("name").unwrap_or("").to_string(),
            })
        })
        .collect();

    let kontakte = elemente(body, "b")
        .into_iter()
        .filter_map(|b| {
            Some(ContactEntry {
                user_id: b.attr_nicht_leer("i")?.to_string(),
                uri: b.attr_nicht_leer("u")?.to_string(),
                lokaler_name: b.attr_nicht_leer("n").map(str::to_string),
                gruppe: b
                    .attr("l")
                    .and_then(|l| l.split(';').find(|g| !g.is_empty()))
                    .map(str::to_string),
            })
        })
        .collect();

    ContactList { gruppen, kontakte }
}

// ---------------------------------------------------------------------------
// Kontaktinformationen
// ---------------------------------------------------------------------------

/// Geschlecht aus dem `gender`-Attribut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    Male,
    Female,
    Secrecy,
}

impl Gender {
    pub fn aus_code(code: Option<&str>) -> Self {
        match code.map(str::trim) {
            Some("1") => Self::Male,
            Some("2") => Self::Female,
            _ => Self::Secrecy,
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Male => "Male",
            Self::Female => "Female",
            Self::Secrecy => "Secrecy",
        };
        f.write_str(name)
    }
}

/// Rohdaten aus `<contact …/>` einer GetContactInfoV4-Antwort
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactInfo {
    pub user_id: String,
    pub sid: String,
    pub mobile: String,
    pub nickname: String,
    pub impresa: String,
    pub gender: Gender,
    /// `carrier-region`, z.B. `CN.bj.10.`
    pub region: String,
}

impl ContactInfo {
    /// Teile der Region: Land, Provinz, Stadt
    pub fn region_teile(&self) -> (&str, &str, &str) {
        let mut teile = self.region.split('.');
        let land = teile.next().unwrap_or("");
        let provinz = teile.next().unwrap_or("");
        let stadt = teile.next().unwrap_or("");
        (land, provinz, stadt)
    }
}

pub fn kontakt_info(body: &str) -> Option<ContactInfo> {
    let c = element(body, "contact")?;
    let wert = |name: &str| c.attr(name).unwrap_or("").to_string();
    Some(ContactInfo {
        user_id: c.attr_nicht_leer("user-id")?.to_string(),
        sid: wert("sid"),
        mobile: wert("mobile-no"),
        nickname: wert("nickname"),
        impresa: wert("impresa"),
        gender: Gender::aus_code(c.attr("gender")),
        region: wert("carrier-region"),
    })
}

// ---------------------------------------------------------------------------
// Systemnachrichten
// ---------------------------------------------------------------------------

/// Text und Link einer Systemnachricht
pub fn system_nachricht(body: &str) -> Option<(String, Option<String>)> {
    let text = element(body, "content")?.inhalt.map(xml_unescape)?;
    if text.trim().is_empty() {
        return None;
    }
    let url = element(body, "url")
        .and_then(|u| u.inhalt)
        .map(xml_unescape)
        .filter(|u| !u.trim().is_empty());
    Some((text.trim().to_string(), url))
}
