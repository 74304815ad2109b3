//! Hilfsmittel fuer die Unit-Tests des Sitzungskerns

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use sipline_core::{MemoryDirectory, Notifier, SessionEvent};
use sipline_observability::SessionMetrics;
use sipline_protocol::SipMessage;

use crate::account::{HostServices, SessionAccount};
use crate::config::{Credentials, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::transport::Transport;

pub type Gesendet = Arc<Mutex<Vec<SipMessage>>>;

/// Transport, der alle gesendeten Nachrichten mitschreibt
#[derive(Debug)]
pub struct AufzeichnenderTransport {
    gesendet: Gesendet,
    offen: bool,
}

impl AufzeichnenderTransport {
    pub fn neu() -> (Self, Gesendet) {
        let gesendet = Gesendet::default();
        (
            Self {
                gesendet: Arc::clone(&gesendet),
                offen: true,
            },
            gesendet,
        )
    }
}

impl Transport for AufzeichnenderTransport {
    fn send(&mut self, nachricht: SipMessage) -> SessionResult<()> {
        if !self.offen {
            return Err(SessionError::SendFehler);
        }
        self.gesendet.lock().push(nachricht);
        Ok(())
    }

    fn close(&mut self) {
        self.offen = false;
    }

    fn ist_offen(&self) -> bool {
        self.offen
    }
}

/// Notifier, der Hinweise und Kontofehler mitschreibt
#[derive(Debug, Clone, Default)]
pub struct AufzeichnenderNotifier {
    hinweise: Arc<Mutex<Vec<(String, String)>>>,
    fehler: Arc<Mutex<Vec<String>>>,
}

impl AufzeichnenderNotifier {
    pub fn hinweise(&self) -> Vec<(String, String)> {
        self.hinweise.lock().clone()
    }

    pub fn fehler(&self) -> Vec<String> {
        self.fehler.lock().clone()
    }
}

impl Notifier for AufzeichnenderNotifier {
    fn notify(&self, titel: &str, text: &str) {
        self.hinweise.lock().push((titel.to_string(), text.to_string()));
    }

    fn account_error(&self, grund: &str) {
        self.fehler.lock().push(grund.to_string());
    }
}

/// Antwort als Rohtext
pub fn antwort(call_id: u32, status: u16, grund: &str, body: &str) -> String {
    format!(
        "SIP-C/4.0 {status} {grund}\r\nI: {call_id}\r\nQ: 1 S\r\nL: {}\r\n\r\n{body}",
        body.len()
    )
}

pub const KONTAKTLISTE: &str = concat!(
    r#"<results><user-info><contact-list><buddy-lists>"#,
    r#"<buddy-list id="1" name="Freunde"/></buddy-lists><buddies>"#,
    r#"<b i="501" u="sip:7001@fetion.com.cn;p=1" n="" l="1"/>"#,
    r#"<b i="502" u="sip:7002@fetion.com.cn;p=2" n="Jerry" l="1"/>"#,
    r#"</buddies></contact-list></user-info></results>"#
);

pub struct Testkonto {
    pub konto: SessionAccount,
    pub gesendet: Gesendet,
    pub notifier: AufzeichnenderNotifier,
    pub verzeichnis: MemoryDirectory,
    pub ereignisse: mpsc::UnboundedReceiver<SessionEvent>,
}

impl Testkonto {
    /// Bestaetigt die Registrierung (Call-ID 1) mit der Test-Kontaktliste
    pub fn anmelden(&mut self) {
        self.konto
            .handle_inbound(&antwort(1, 200, "OK", KONTAKTLISTE));
    }

    pub fn letzte(&self) -> SipMessage {
        self.gesendet
            .lock()
            .last()
            .cloned()
            .expect("keine Nachricht gesendet")
    }

    pub fn alle_ereignisse(&mut self) -> Vec<SessionEvent> {
        let mut alle = Vec::new();
        while let Ok(e) = self.ereignisse.try_recv() {
            alle.push(e);
        }
        alle
    }
}

pub fn credentials() -> Credentials {
    Credentials {
        sid: "916098834".into(),
        user_id: "400".into(),
        uri: "sip:916098834@fetion.com.cn;p=1".into(),
        mobile: "13800000000".into(),
        auth_token: "token".into(),
    }
}

pub fn konto_oeffnen() -> Testkonto {
    let (transport, gesendet) = AufzeichnenderTransport::neu();
    let notifier = AufzeichnenderNotifier::default();
    let verzeichnis = MemoryDirectory::neu();
    let (tx, ereignisse) = mpsc::unbounded_channel();

    let host = HostServices::neu(Box::new(verzeichnis.clone()), Box::new(notifier.clone()), tx);
    let konto = SessionAccount::open(
        credentials(),
        Box::new(transport),
        host,
        Arc::new(SessionConfig::default()),
        SessionMetrics::neu().expect("Metriken"),
    )
    .expect("Konto oeffnen");

    Testkonto {
        konto,
        gesendet,
        notifier,
        verzeichnis,
        ereignisse,
    }
}
