//! SIP-C/4.0 Nachrichtenmodell
//!
//! Eine Nachricht besteht aus Startzeile, Kopfzeilen (`Schluessel: Wert`)
//! und einem optionalen Body, dessen Laenge im `L`-Header steht.
//!
//! ```text
//! M fetion.com.cn SIP-C/4.0        <- Anfrage
//! SIP-C/4.0 200 OK                 <- Antwort
//! F: 916098834
//! I: 3
//! Q: 2 M
//! L: 5
//!
//! hallo
//! ```

use bytes::{BufMut, BytesMut};
use sipline_core::types::CallId;

use crate::error::ParseError;

/// Versionskennung in Start- und Statuszeilen
pub const PROTOKOLL_VERSION: &str = "SIP-C/4.0";

/// Kurzschluessel der verwendeten Kopfzeilen
pub mod header {
    pub const FROM: &str = "F";
    pub const CALL_ID: &str = "I";
    pub const CSEQ: &str = "Q";
    pub const TO: &str = "T";
    pub const EVENT: &str = "N";
    pub const CONTENT_LENGTH: &str = "L";
    pub const CONTENT_TYPE: &str = "C";
    pub const SUPPORTED: &str = "K";
    pub const AUTHORIZATION: &str = "A";
    pub const CNONCE: &str = "CN";
    pub const CLIENT: &str = "CL";
}

// ---------------------------------------------------------------------------
// Methode und Startzeile
// ---------------------------------------------------------------------------

/// Anfrage-Methode
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Method {
    Register,
    Message,
    Service,
    Invite,
    Info,
    Notify,
    Options,
    Ack,
    Bye,
    /// Unbekanntes Token, wird bei der Klassifizierung verworfen
    Other(String),
}

impl Method {
    /// Token auf der Leitung
    pub fn token(&self) -> &str {
        match self {
            Self::Register => "R",
            Self::Message => "M",
            Self::Service => "S",
            Self::Invite => "I",
            Self::Info => "IN",
            Self::Notify => "BN",
            Self::Options => "O",
            Self::Ack => "A",
            Self::Bye => "B",
            Self::Other(t) => t,
        }
    }

    pub fn from_token(token: &str) -> Self {
        match token {
            "R" => Self::Register,
            "M" => Self::Message,
            "S" => Self::Service,
            "I" => Self::Invite,
            "IN" => Self::Info,
            "BN" => Self::Notify,
            "O" => Self::Options,
            "A" => Self::Ack,
            "B" => Self::Bye,
            anders => Self::Other(anders.to_string()),
        }
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.token())
    }
}

/// Erste Zeile einer Nachricht
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartLine {
    Request { method: Method, target: String },
    Response { status: u16, reason: String },
}

// ---------------------------------------------------------------------------
// SipMessage
// ---------------------------------------------------------------------------

/// Eine vollstaendige SIP-C Nachricht
///
/// Kopfzeilen behalten ihre Reihenfolge; Mehrfachschluessel (z.B. `K`) sind
/// erlaubt. Der `L`-Header wird beim Kodieren aus dem Body berechnet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SipMessage {
    start: StartLine,
    headers: Vec<(String, String)>,
    body: String,
}

impl SipMessage {
    /// Neue Anfrage ohne Kopfzeilen
    pub fn request(method: Method, target: impl Into<String>) -> Self {
        Self {
            start: StartLine::Request {
                method,
                target: target.into(),
            },
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Neue Antwort ohne Kopfzeilen
    pub fn response(status: u16, reason: impl Into<String>) -> Self {
        Self {
            start: StartLine::Response {
                status,
                reason: reason.into(),
            },
            headers: Vec::new(),
            body: String::new(),
        }
    }

    pub(crate) fn aus_teilen(start: StartLine, headers: Vec<(String, String)>, body: String) -> Self {
        Self {
            start,
            headers,
            body,
        }
    }

    /// Zerlegt den Rohtext einer Nachricht
    pub fn parse(raw: &str) -> Result<Self, ParseError> {
        crate::parse::nachricht(raw)
    }

    // --- Builder ---

    pub fn with_header(mut self, key: &str, value: impl Into<String>) -> Self {
        self.add_header(key, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn add_header(&mut self, key: &str, value: impl Into<String>) {
        self.headers.push((key.to_string(), value.into()));
    }

    // --- Zugriff ---

    pub fn start(&self) -> &StartLine {
        &self.start
    }

    /// Methode, falls Anfrage
    pub fn method(&self) -> Option<&Method> {
        match &self.start {
            StartLine::Request { method, .. } => Some(method),
            StartLine::Response { .. } => None,
        }
    }

    /// Statuscode, falls Antwort
    pub fn status(&self) -> Option<u16> {
        match &self.start {
            StartLine::Response { status, .. } => Some(*status),
            StartLine::Request { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match &self.start {
            StartLine::Response { reason, .. } => Some(reason),
            StartLine::Request { .. } => None,
        }
    }

    pub fn is_response(&self) -> bool {
        matches!(self.start, StartLine::Response { .. })
    }

    /// Antwort mit 2xx-Status
    pub fn is_success(&self) -> bool {
        self.status().is_some_and(|s| (200..300).contains(&s))
    }

    /// Erster Wert zu einem Schluessel (Gross-/Kleinschreibung egal)
    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    /// Alle Werte zu einem Schluessel in Reihenfolge
    pub fn header_werte<'a>(&'a self, key: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Korrelations-ID aus dem `I`-Header
    pub fn call_id(&self) -> Option<CallId> {
        self.header(header::CALL_ID)
            .and_then(|v| v.trim().parse::<u32>().ok())
            .map(CallId)
    }

    /// Ereignisname aus dem `N`-Header
    pub fn event(&self) -> Option<&str> {
        self.header(header::EVENT)
    }

    /// Absender-URI aus dem `F`-Header
    pub fn absender(&self) -> Option<&str> {
        self.header(header::FROM)
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    // --- Kodierung ---

    /// Schreibt die Nachricht im Leitungsformat
    pub fn encode(&self, dst: &mut BytesMut) {
        let text = self.to_string();
        dst.reserve(text.len());
        dst.put_slice(text.as_bytes());
    }
}

impl std::fmt::Display for SipMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.start {
            StartLine::Request { method, target } => {
                write!(f, "{} {} {}\r\n", method, target, PROTOKOLL_VERSION)?
            }
            StartLine::Response { status, reason } => {
                write!(f, "{} {} {}\r\n", PROTOKOLL_VERSION, status, reason)?
            }
        }
        for (k, v) in &self.headers {
            if k.eq_ignore_ascii_case(header::CONTENT_LENGTH) {
                continue;
            }
            write!(f, "{}: {}\r\n", k, v)?;
        }
        if !self.body.is_empty() {
            write!(f, "{}: {}\r\n", header::CONTENT_LENGTH, self.body.len())?;
        }
        f.write_str("\r\n")?;
        f.write_str(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn anfrage_kodieren_mit_laenge() {
        let msg = SipMessage::request(Method::Message, "fetion.com.cn")
            .with_header(header::FROM, "916098834")
            .with_header(header::CALL_ID, "3")
            .with_header(header::CSEQ, "2 M")
            .with_body("hallo");

        assert_eq!(
            msg.to_string(),
            "M fetion.com.cn SIP-C/4.0\r\nF: 916098834\r\nI: 3\r\nQ: 2 M\r\nL: 5\r\n\r\nhallo"
        );
    }

    #[test]
    fn alter_laengen_header_wird_ersetzt() {
        let msg = SipMessage::response(200, "OK")
            .with_header(header::CONTENT_LENGTH, "99")
            .with_body("ab");
        assert_eq!(msg.to_string(), "SIP-C/4.0 200 OK\r\nL: 2\r\n\r\nab");
    }

    #[test]
    fn header_zugriff_ohne_gross_klein() {
        let msg = SipMessage::request(Method::Notify, "501")
            .with_header("n", "PresenceV4")
            .with_header(header::SUPPORTED, "a")
            .with_header(header::SUPPORTED, "b");
        assert_eq!(msg.event(), Some("PresenceV4"));
        assert_eq!(msg.header_werte("K").collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn erfolg_nur_bei_2xx() {
        assert!(SipMessage::response(200, "OK").is_success());
        assert!(SipMessage::response(280, "Send SMS OK").is_success());
        assert!(!SipMessage::response(404, "Not Found").is_success());
        assert!(!SipMessage::request(Method::Message, "x").is_success());
    }

    #[test]
    fn methoden_token() {
        for token in ["R", "M", "S", "I", "IN", "BN", "O", "A", "B"] {
            assert_eq!(Method::from_token(token).token(), token);
        }
        assert_eq!(Method::from_token("XY"), Method::Other("XY".into()));
    }

    #[test]
    fn call_id_ungueltig() {
        let msg = SipMessage::response(200, "OK").with_header("I", "abc");
        assert_eq!(msg.call_id(), None);
    }
}
