//! Eingabezeilen des Kommandozeilen-Clients
//!
//! ```text
//! /msg <id> <text>       Nachricht senden
//! /state <zustand>       online, away, busy, invisible, offline
//! /info <id>             Kontaktinformationen
//! /move <id> <gruppe>    Kontakt verschieben
//! /remove <id>           Kontakt entfernen
//! /rename <id> [name]    Lokalen Namen setzen (leer = entfernen)
//! /keepalive             Keepalive senden
//! /metrics               Metriken ausgeben
//! /quit                  Beenden
//! ```

use sipline_core::{BuddyId, GroupId, PresenceState};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Befehl {
    Nachricht { ziel: BuddyId, text: String },
    Zustand(PresenceState),
    Info(BuddyId),
    Verschieben { buddy: BuddyId, gruppe: GroupId },
    Entfernen(BuddyId),
    Umbenennen { buddy: BuddyId, name: String },
    KeepAlive,
    Metriken,
    Hilfe,
    Beenden,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BefehlFehler {
    #[error("Unbekannter Befehl: {0} (/help fuer eine Liste)")]
    Unbekannt(String),

    #[error("Verwendung: {0}")]
    Verwendung(&'static str),

    #[error("{0}")]
    Zustand(String),
}

pub const HILFE: &str = "\
/msg <id> <text>      Nachricht senden
/state <zustand>      online, away, busy, invisible, offline
/info <id>            Kontaktinformationen
/move <id> <gruppe>   Kontakt verschieben
/remove <id>          Kontakt entfernen
/rename <id> [name]   Lokalen Namen setzen
/keepalive            Keepalive senden
/metrics              Metriken ausgeben
/quit                 Beenden";

/// Naechstes Wort und Rest (ohne fuehrende Leerzeichen)
fn wort(eingabe: &str) -> (&str, &str) {
    let eingabe = eingabe.trim_start();
    match eingabe.split_once(char::is_whitespace) {
        Some((wort, rest)) => (wort, rest.trim_start()),
        None => (eingabe, ""),
    }
}

fn buddy<'a>(
    eingabe: &'a str,
    verwendung: &'static str,
) -> Result<(BuddyId, &'a str), BefehlFehler> {
    let (id, rest) = wort(eingabe);
    if id.is_empty() {
        return Err(BefehlFehler::Verwendung(verwendung));
    }
    Ok((BuddyId::new(id), rest))
}

impl Befehl {
    /// Liest eine Eingabezeile; `None` bei Leerzeile
    pub fn parse(zeile: &str) -> Option<Result<Self, BefehlFehler>> {
        let zeile = zeile.trim();
        if zeile.is_empty() {
            return None;
        }
        let (name, rest) = wort(zeile);
        Some(Self::aus_teilen(name, rest))
    }

    fn aus_teilen(name: &str, rest: &str) -> Result<Self, BefehlFehler> {
        match name {
            "/msg" => {
                let (ziel, text) = buddy(rest, "/msg <id> <text>")?;
                if text.is_empty() {
                    return Err(BefehlFehler::Verwendung("/msg <id> <text>"));
                }
                Ok(Self::Nachricht {
                    ziel,
                    text: text.to_string(),
                })
            }
            "/state" => {
                let (zustand, _) = wort(rest);
                if zustand.is_empty() {
                    return Err(BefehlFehler::Verwendung("/state <zustand>"));
                }
                zustand
                    .parse()
                    .map(Self::Zustand)
                    .map_err(BefehlFehler::Zustand)
            }
            "/info" => buddy(rest, "/info <id>").map(|(id, _)| Self::Info(id)),
            "/move" => {
                let (buddy, rest) = buddy(rest, "/move <id> <gruppe>")?;
                let (gruppe, _) = wort(rest);
                if gruppe.is_empty() {
                    return Err(BefehlFehler::Verwendung("/move <id> <gruppe>"));
                }
                Ok(Self::Verschieben {
                    buddy,
                    gruppe: GroupId::new(gruppe),
                })
            }
            "/remove" => buddy(rest, "/remove <id>").map(|(id, _)| Self::Entfernen(id)),
            "/rename" => {
                let (buddy, name) = buddy(rest, "/rename <id> [name]")?;
                Ok(Self::Umbenennen {
                    buddy,
                    name: name.trim_end().to_string(),
                })
            }
            "/keepalive" => Ok(Self::KeepAlive),
            "/metrics" => Ok(Self::Metriken),
            "/help" => Ok(Self::Hilfe),
            "/quit" | "/exit" => Ok(Self::Beenden),
            anders => Err(BefehlFehler::Unbekannt(anders.to_string())),
        }
    }
}
