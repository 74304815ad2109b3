//! Ausgehende Anfragen
//!
//! Jede Anfrage traegt `F` (eigene SID), `I` (Call-ID) und `Q` (CSeq).
//! Die Body-Bausteine maskieren alle Attributwerte.

use sipline_core::types::CallId;

use crate::body::xml_escape;
use crate::sipc::{header, Method, SipMessage};

/// Gemeinsame Kopfdaten einer Anfrage
#[derive(Debug, Clone, Copy)]
pub struct RequestKopf<'a> {
    pub sid: &'a str,
    pub domain: &'a str,
    pub call_id: CallId,
    pub cseq: u32,
}

/// Anfrage mit den Pflicht-Kopfzeilen
pub fn anfrage(method: Method, kopf: &RequestKopf<'_>) -> SipMessage {
    let cseq = format!("{} {}", kopf.cseq, method.token());
    SipMessage::request(method, kopf.domain)
        .with_header(header::FROM, kopf.sid)
        .with_header(header::CALL_ID, kopf.call_id.to_string())
        .with_header(header::CSEQ, cseq)
}

/// Service-Anfrage (`S`) mit Ereignisname
pub fn service(kopf: &RequestKopf<'_>, ereignis: &str, body: String) -> SipMessage {
    anfrage(Method::Service, kopf)
        .with_header(header::EVENT, ereignis)
        .with_body(body)
}

// ---------------------------------------------------------------------------
// Anmeldung und Konto
// ---------------------------------------------------------------------------

/// Registrierung mit Token
pub fn registrieren(
    kopf: &RequestKopf<'_>,
    user_id: &str,
    mobile: &str,
    token: &str,
    cnonce: &str,
) -> SipMessage {
    let body = format!(
        concat!(
            r#"<args><device machine-code="001676C0E351"/><caps value="1ff"/>"#,
            r#"<events value="7f"/><user-info mobile-no="{}" user-id="{}">"#,
            r#"<personal version="0" attributes="v4default"/>"#,
            r#"<custom-config version="0"/>"#,
            r#"<contact-list version="0" buddy-attributes="v4default"/></user-info>"#,
            r#"<credentials domains="fetion.com.cn"/>"#,
            r#"<presence><basic value="400" desc=""/></presence></args>"#
        ),
        xml_escape(mobile),
        xml_escape(user_id)
    );
    anfrage(Method::Register, kopf)
        .with_header(header::CNONCE, cnonce)
        .with_header(header::CLIENT, r#"type="pc" ,version="4.0.2510""#)
        .with_header(
            header::AUTHORIZATION,
            format!(r#"Digest response="{}",algorithm="SHA1-sess-v4""#, token),
        )
        .with_body(body)
}

/// Keepalive-Registrierung
pub fn keep_alive(kopf: &RequestKopf<'_>) -> SipMessage {
    anfrage(Method::Register, kopf)
        .with_header(header::EVENT, "KeepAlive")
        .with_body(r#"<args><credentials domains="fetion.com.cn"/></args>"#)
}

/// Eigenen Praesenzcode setzen
pub fn zustand_setzen(kopf: &RequestKopf<'_>, code: i32) -> SipMessage {
    service(
        kopf,
        "SetPresenceV4",
        format!(r#"<args><presence><basic value="{}"/></presence></args>"#, code),
    )
}

// ---------------------------------------------------------------------------
// Kontakte
// ---------------------------------------------------------------------------

pub fn buddy_verschieben(kopf: &RequestKopf<'_>, user_id: &str, gruppe: &str) -> SipMessage {
    service(
        kopf,
        "SetContactInfoV4",
        format!(
            r#"<args><contacts><contact user-id="{}" buddy-lists="{}"/></contacts></args>"#,
            xml_escape(user_id),
            xml_escape(gruppe)
        ),
    )
}

pub fn buddy_entfernen(kopf: &RequestKopf<'_>, user_id: &str) -> SipMessage {
    service(
        kopf,
        "DeleteBuddyV4",
        format!(
            r#"<args><contacts><buddies><buddy user-id="{}"/></buddies></contacts></args>"#,
            xml_escape(user_id)
        ),
    )
}

pub fn buddy_umbenennen(kopf: &RequestKopf<'_>, user_id: &str, name: &str) -> SipMessage {
    service(
        kopf,
        "SetContactInfoV4",
        format!(
            r#"<args><contacts><contact user-id="{}" local-name="{}"/></contacts></args>"#,
            xml_escape(user_id),
            xml_escape(name)
        ),
    )
}

pub fn kontakt_info(kopf: &RequestKopf<'_>, user_id: &str) -> SipMessage {
    service(
        kopf,
        "GetContactInfoV4",
        format!(r#"<args><contact user-id="{}"/></args>"#, xml_escape(user_id)),
    )
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

/// Textnachricht an eine URI
pub fn nachricht(kopf: &RequestKopf<'_>, ziel_uri: &str, text: &str) -> SipMessage {
    anfrage(Method::Message, kopf)
        .with_header(header::TO, ziel_uri)
        .with_header(header::CONTENT_TYPE, "text/plain")
        .with_header(header::SUPPORTED, "SaveHistory")
        .with_header(header::EVENT, "CatMsg")
        .with_body(text)
}

/// Einladung in einen neuen Chat-Kanal
pub fn einladung(kopf: &RequestKopf<'_>, ziel_uri: &str) -> SipMessage {
    anfrage(Method::Invite, kopf)
        .with_header(header::TO, ziel_uri)
        .with_header(header::SUPPORTED, "text/html-fragment")
        .with_header(header::SUPPORTED, "multiparty")
        .with_header(header::SUPPORTED, "nudge")
}

/// `200 OK` auf eine empfangene Nachricht (F, I, Q werden gespiegelt)
pub fn bestaetigung(empfangen: &SipMessage) -> SipMessage {
    let mut antwort = SipMessage::response(200, "OK");
    for key in [header::FROM, header::CALL_ID, header::CSEQ] {
        if let Some(wert) = empfangen.header(key) {
            antwort.add_header(key, wert);
        }
    }
    antwort
}
