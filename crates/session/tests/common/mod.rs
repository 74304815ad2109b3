//! Gemeinsame Hilfen fuer die Integration-Tests des Sitzungskerns

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use sipline_core::{BuddyId, MemoryDirectory, Notifier, SessionEvent};
use sipline_observability::SessionMetrics;
use sipline_protocol::SipMessage;
use sipline_session::{
    Credentials, HostServices, SessionAccount, SessionConfig, SessionError, SessionResult,
    Transport,
};

pub type Gesendet = Arc<Mutex<Vec<SipMessage>>>;

/// Transport, der mitschreibt und beim Schliessen die offenen Kanaele notiert
pub struct TestTransport {
    gesendet: Gesendet,
    offen: bool,
    metrics: SessionMetrics,
    kanaele_beim_schliessen: Arc<Mutex<Option<i64>>>,
}

impl Transport for TestTransport {
    fn send(&mut self, nachricht: SipMessage) -> SessionResult<()> {
        if !self.offen {
            return Err(SessionError::SendFehler);
        }
        self.gesendet.lock().push(nachricht);
        Ok(())
    }

    fn close(&mut self) {
        self.offen = false;
        *self.kanaele_beim_schliessen.lock() = Some(self.metrics.channels_active.get());
    }

    fn ist_offen(&self) -> bool {
        self.offen
    }
}

#[derive(Clone, Default)]
pub struct TestNotifier {
    pub hinweise: Arc<Mutex<Vec<(String, String)>>>,
    pub fehler: Arc<Mutex<Vec<String>>>,
}

impl Notifier for TestNotifier {
    fn notify(&self, titel: &str, text: &str) {
        self.hinweise.lock().push((titel.into(), text.into()));
    }

    fn account_error(&self, grund: &str) {
        self.fehler.lock().push(grund.into());
    }
}

pub const KONTAKTLISTE: &str = concat!(
    r#"<results><user-info><contact-list><buddy-lists>"#,
    r#"<buddy-list id="1" name="Freunde"/><buddy-list id="2" name="Arbeit"/></buddy-lists><buddies>"#,
    r#"<b i="501" u="sip:7001@fetion.com.cn;p=1" n="" l="1"/>"#,
    r#"<b i="502" u="sip:7002@fetion.com.cn;p=2" n="Jerry" l="1"/>"#,
    r#"<b i="503" u="sip:7003@fetion.com.cn;p=3" n="" l="2"/>"#,
    r#"</buddies></contact-list></user-info></results>"#
);

pub fn credentials() -> Credentials {
    Credentials {
        sid: "916098834".into(),
        user_id: "400".into(),
        uri: "sip:916098834@fetion.com.cn;p=1".into(),
        mobile: "13800000000".into(),
        auth_token: "token".into(),
    }
}

pub fn antwort(call_id: u32, status: u16, grund: &str, body: &str) -> String {
    format!(
        "SIP-C/4.0 {status} {grund}\r\nI: {call_id}\r\nQ: 1 S\r\nL: {}\r\n\r\n{body}",
        body.len()
    )
}

/// `BN`-Benachrichtigung mit Ereignis und Body
pub fn bn(call_id: u32, ereignis: &str, body: &str) -> String {
    format!(
        "BN 916098834 SIP-C/4.0\r\nI: {call_id}\r\nQ: 1 BN\r\nN: {ereignis}\r\nL: {}\r\n\r\n{body}",
        body.len()
    )
}

/// Presence-Benachrichtigung fuer einen Kontakt
pub fn presence(id: &str, basis: i32, nickname: &str, mood: &str) -> String {
    let body = format!(
        r#"<events><event type="PresenceChanged"><contacts><c id="{id}"><p n="{nickname}" i="{mood}"/><pr b="{basis}"/></c></contacts></event></events>"#
    );
    bn(2, "PresenceV4", &body)
}

pub fn betreten(kanal: u32, uri: &str) -> String {
    let body = format!(
        r#"<events><event type="UserEntered"><member uri="{uri}" status="400"/></event></events>"#
    );
    bn(kanal, "Conversation", &body)
}

pub fn verlassen(kanal: u32, uri: &str) -> String {
    let body = format!(r#"<events><event type="UserLeft"><member uri="{uri}"/></event></events>"#);
    bn(kanal, "Conversation", &body)
}

pub fn abmeldung() -> String {
    bn(
        3,
        "Registration",
        r#"<events><event type="deregistered"><reason>elsewhere</reason></event></events>"#,
    )
}

pub struct Aufbau {
    pub konto: SessionAccount,
    pub gesendet: Gesendet,
    pub notifier: TestNotifier,
    pub verzeichnis: MemoryDirectory,
    pub ereignisse: mpsc::UnboundedReceiver<SessionEvent>,
    pub metrics: SessionMetrics,
    pub kanaele_beim_schliessen: Arc<Mutex<Option<i64>>>,
}

impl Aufbau {
    pub fn neu() -> Self {
        Self::mit_config(SessionConfig::default())
    }

    pub fn mit_config(config: SessionConfig) -> Self {
        let gesendet = Gesendet::default();
        let metrics = SessionMetrics::neu().expect("Metriken");
        let kanaele_beim_schliessen = Arc::new(Mutex::new(None));
        let transport = TestTransport {
            gesendet: Arc::clone(&gesendet),
            offen: true,
            metrics: metrics.clone(),
            kanaele_beim_schliessen: Arc::clone(&kanaele_beim_schliessen),
        };
        let notifier = TestNotifier::default();
        let verzeichnis = MemoryDirectory::neu();
        let (tx, ereignisse) = mpsc::unbounded_channel();

        let konto = SessionAccount::open(
            credentials(),
            Box::new(transport),
            HostServices::neu(Box::new(verzeichnis.clone()), Box::new(notifier.clone()), tx),
            Arc::new(config),
            metrics.clone(),
        )
        .expect("Konto oeffnen");

        Self {
            konto,
            gesendet,
            notifier,
            verzeichnis,
            ereignisse,
            metrics,
            kanaele_beim_schliessen,
        }
    }

    /// Oeffnet und meldet an (Registrierung hat Call-ID 1)
    pub fn angemeldet() -> Self {
        let mut aufbau = Self::neu();
        aufbau.konto.handle_inbound(&antwort(1, 200, "OK", KONTAKTLISTE));
        assert!(aufbau.konto.ist_online());
        aufbau.ereignisse_leeren();
        aufbau
    }

    pub fn online_setzen(&mut self, id: &str) {
        self.konto.handle_inbound(&presence(id, 400, "", ""));
    }

    pub fn anzahl_gesendet(&self) -> usize {
        self.gesendet.lock().len()
    }

    pub fn gesendet_ab(&self, start: usize) -> Vec<SipMessage> {
        self.gesendet.lock()[start..].to_vec()
    }

    pub fn ereignisse_leeren(&mut self) -> Vec<SessionEvent> {
        let mut alle = Vec::new();
        while let Ok(e) = self.ereignisse.try_recv() {
            alle.push(e);
        }
        alle
    }
}

pub fn buddy(id: &str) -> BuddyId {
    BuddyId::new(id)
}
