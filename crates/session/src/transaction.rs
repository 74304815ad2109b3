//! Transaktions-Tabelle – offene Anfragen und ihre Antworten
//!
//! Jede Anfrage bekommt eine Call-ID, die unter allen offenen Transaktionen
//! eindeutig ist. Eine Transaktion endet genau einmal:
//!
//! ```text
//!              +--> passende Antwort --> Rueckruf(Ok)
//! open --------+--> cancel           --> (kein Rueckruf)
//!              +--> Frist abgelaufen --> Rueckruf(Err(Timeout))
//!              +--> clear (close)    --> (kein Rueckruf)
//! ```
//!
//! Anfragen, die einen bereiten Kanal brauchen, warten in einer FIFO-Liste
//! pro Kanal und werden erst bei `release_waiting` gesendet.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use sipline_core::event::Operation;
use sipline_core::types::{BuddyId, CallId, ChannelId, GroupId, PresenceState};
use sipline_protocol::SipMessage;

use crate::error::{SessionError, SessionResult};
use crate::transport::Transport;

/// Abschluss-Rueckruf einer Transaktion
///
/// Der Aufrufer-Kontext wird in der Closure gefangen.
pub type Rueckruf = Box<dyn FnOnce(Result<&SipMessage, SessionError>) + Send>;

// ---------------------------------------------------------------------------
// Transaktionsarten
// ---------------------------------------------------------------------------

/// Art einer Transaktion samt Zieldaten
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionKind {
    Anmeldung,
    /// `kanal` ist gesetzt, wenn die Nachricht auf diesen Kanal gewartet hat
    Nachricht {
        ziel: BuddyId,
        kanal: Option<ChannelId>,
    },
    Einladung { ziel: BuddyId },
    Zustand { zustand: PresenceState },
    KeepAlive,
    Verschieben { buddy: BuddyId, gruppe: GroupId },
    Entfernen { buddy: BuddyId },
    Umbenennen { buddy: BuddyId, name: String },
    Info { buddy: BuddyId },
}

impl TransactionKind {
    pub fn operation(&self) -> Operation {
        match self {
            Self::Anmeldung => Operation::Anmeldung,
            Self::Nachricht { .. } => Operation::Nachricht,
            Self::Einladung { .. } => Operation::Einladung,
            Self::Zustand { .. } => Operation::Zustand,
            Self::KeepAlive => Operation::KeepAlive,
            Self::Verschieben { .. } => Operation::Verschieben,
            Self::Entfernen { .. } => Operation::Entfernen,
            Self::Umbenennen { .. } => Operation::Umbenennen,
            Self::Info { .. } => Operation::Info,
        }
    }

    /// Betroffener Kontakt
    pub fn ziel(&self) -> Option<&BuddyId> {
        match self {
            Self::Nachricht { ziel, .. } | Self::Einladung { ziel } => Some(ziel),
            Self::Verschieben { buddy, .. }
            | Self::Entfernen { buddy }
            | Self::Umbenennen { buddy, .. }
            | Self::Info { buddy } => Some(buddy),
            Self::Anmeldung | Self::Zustand { .. } | Self::KeepAlive => None,
        }
    }
}

/// Eine offene oder wartende Transaktion
pub struct Transaction {
    call_id: CallId,
    art: TransactionKind,
    anfrage: SipMessage,
    rueckruf: Option<Rueckruf>,
    gesendet: Instant,
    frist: Instant,
}

impl Transaction {
    pub fn call_id(&self) -> CallId {
        self.call_id
    }

    pub fn art(&self) -> &TransactionKind {
        &self.art
    }

    fn fehlschlagen(mut self, fehler: SessionError) -> Fehlgeschlagen {
        let grund = fehler.to_string();
        if let Some(rueckruf) = self.rueckruf.take() {
            rueckruf(Err(fehler));
        }
        Fehlgeschlagen {
            call_id: self.call_id,
            art: self.art,
            grund,
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("call_id", &self.call_id)
            .field("art", &self.art)
            .field("rueckruf", &self.rueckruf.is_some())
            .field("gesendet", &self.gesendet)
            .field("frist", &self.frist)
            .finish()
    }
}

/// Beantwortete Transaktion (Rueckruf wurde bereits aufgerufen)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Abgeschlossen {
    pub call_id: CallId,
    pub art: TransactionKind,
    pub gesendet: Instant,
}

/// Mit Fehler beendete Transaktion (Rueckruf wurde bereits aufgerufen)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fehlgeschlagen {
    pub call_id: CallId,
    pub art: TransactionKind,
    pub grund: String,
}

/// Ergebnis von `release_waiting`
#[derive(Debug, Default)]
pub struct Freigabe {
    /// Gesendete Transaktionen in Sendereihenfolge
    pub gesendet: Vec<CallId>,
    pub fehlgeschlagen: Vec<Fehlgeschlagen>,
}

// ---------------------------------------------------------------------------
// TransactionTable
// ---------------------------------------------------------------------------

/// Verwaltet offene Transaktionen und die Warteliste pro Kanal
#[derive(Debug)]
pub struct TransactionTable {
    naechste_id: u32,
    timeout: Duration,
    aktiv: HashMap<CallId, Transaction>,
    wartend: HashMap<ChannelId, VecDeque<Transaction>>,
    /// Call-ID -> Kanal fuer wartende Transaktionen
    wartend_index: HashMap<CallId, ChannelId>,
}

impl TransactionTable {
    pub fn neu(timeout: Duration) -> Self {
        Self {
            naechste_id: 1,
            timeout,
            aktiv: HashMap::new(),
            wartend: HashMap::new(),
            wartend_index: HashMap::new(),
        }
    }

    /// Naechste freie Call-ID (ueberspringt belegte IDs nach Ueberlauf)
    fn call_id_vergeben(&mut self) -> CallId {
        loop {
            let id = CallId(self.naechste_id);
            self.naechste_id = match self.naechste_id.wrapping_add(1) {
                0 => 1,
                n => n,
            };
            if !self.ist_offen(id) {
                return id;
            }
        }
    }

    /// Registriert eine Transaktion und sendet ihre Anfrage
    ///
    /// Schlaegt das Senden fehl, wird nichts registriert und der Rueckruf
    /// verworfen.
    pub fn open<F>(
        &mut self,
        art: TransactionKind,
        baue: F,
        rueckruf: Option<Rueckruf>,
        transport: &mut dyn Transport,
        jetzt: Instant,
    ) -> SessionResult<CallId>
    where
        F: FnOnce(CallId) -> SipMessage,
    {
        let call_id = self.call_id_vergeben();
        let anfrage = baue(call_id);
        transport.send(anfrage.clone())?;

        tracing::trace!(call_id = %call_id, art = ?art, "Transaktion geoeffnet");
        self.aktiv.insert(
            call_id,
            Transaction {
                call_id,
                art,
                anfrage,
                rueckruf,
                gesendet: jetzt,
                frist: jetzt + self.timeout,
            },
        );
        Ok(call_id)
    }

    /// Ordnet eine Antwort ihrer Transaktion zu
    ///
    /// Entfernt die Transaktion und ruft den Rueckruf auf. Antworten ohne
    /// offene Transaktion werden verworfen.
    pub fn complete(&mut self, antwort: &SipMessage) -> Option<Abgeschlossen> {
        let Some(call_id) = antwort.call_id() else {
            tracing::debug!("Antwort ohne Call-ID verworfen");
            return None;
        };
        let Some(mut transaktion) = self.aktiv.remove(&call_id) else {
            tracing::debug!(call_id = %call_id, "Antwort ohne offene Transaktion verworfen");
            return None;
        };
        if let Some(rueckruf) = transaktion.rueckruf.take() {
            rueckruf(Ok(antwort));
        }
        Some(Abgeschlossen {
            call_id,
            art: transaktion.art,
            gesendet: transaktion.gesendet,
        })
    }

    /// Entfernt eine offene oder wartende Transaktion ohne Rueckruf
    pub fn cancel(&mut self, call_id: CallId) -> bool {
        if self.aktiv.remove(&call_id).is_some() {
            return true;
        }
        let Some(kanal) = self.wartend_index.remove(&call_id) else {
            return false;
        };
        if let Some(schlange) = self.wartend.get_mut(&kanal) {
            schlange.retain(|t| t.call_id != call_id);
            if schlange.is_empty() {
                self.wartend.remove(&kanal);
            }
        }
        true
    }

    // --- Warteliste ---

    /// Reiht eine Transaktion fuer einen noch nicht bereiten Kanal ein
    pub fn enqueue_waiting<F>(
        &mut self,
        kanal: ChannelId,
        art: TransactionKind,
        baue: F,
        rueckruf: Option<Rueckruf>,
        jetzt: Instant,
    ) -> CallId
    where
        F: FnOnce(CallId) -> SipMessage,
    {
        let call_id = self.call_id_vergeben();
        let anfrage = baue(call_id);
        self.wartend_index.insert(call_id, kanal);
        self.wartend.entry(kanal).or_default().push_back(Transaction {
            call_id,
            art,
            anfrage,
            rueckruf,
            gesendet: jetzt,
            frist: jetzt + self.timeout,
        });
        tracing::trace!(call_id = %call_id, kanal = %kanal, "Transaktion wartet auf Kanal");
        call_id
    }

    /// Sendet alle wartenden Transaktionen eines Kanals in FIFO-Reihenfolge
    ///
    /// Gesendete Transaktionen wechseln in die aktive Menge und warten auf
    /// ihre Antwort. Die Warteliste des Kanals ist danach leer.
    pub fn release_waiting(
        &mut self,
        kanal: ChannelId,
        transport: &mut dyn Transport,
        jetzt: Instant,
    ) -> Freigabe {
        let mut freigabe = Freigabe::default();
        let Some(schlange) = self.wartend.remove(&kanal) else {
            return freigabe;
        };

        for mut transaktion in schlange {
            self.wartend_index.remove(&transaktion.call_id);
            match transport.send(transaktion.anfrage.clone()) {
                Ok(()) => {
                    transaktion.gesendet = jetzt;
                    transaktion.frist = jetzt + self.timeout;
                    freigabe.gesendet.push(transaktion.call_id);
                    self.aktiv.insert(transaktion.call_id, transaktion);
                }
                Err(e) => {
                    tracing::warn!(
                        call_id = %transaktion.call_id,
                        fehler = %e,
                        "Wartende Transaktion konnte nicht gesendet werden"
                    );
                    freigabe.fehlgeschlagen.push(transaktion.fehlschlagen(e));
                }
            }
        }
        freigabe
    }

    /// Beendet alle wartenden Transaktionen eines Kanals mit Fehler
    pub fn fail_waiting<E>(&mut self, kanal: ChannelId, fehler: E) -> Vec<Fehlgeschlagen>
    where
        E: Fn() -> SessionError,
    {
        let Some(schlange) = self.wartend.remove(&kanal) else {
            return Vec::new();
        };
        schlange
            .into_iter()
            .map(|t| {
                self.wartend_index.remove(&t.call_id);
                t.fehlschlagen(fehler())
            })
            .collect()
    }

    // --- Fristen und Abbau ---

    /// Beendet alle Transaktionen, deren Frist vor `jetzt` liegt
    pub fn expire(&mut self, jetzt: Instant) -> Vec<Fehlgeschlagen> {
        let mut abgelaufen: Vec<Transaction> = Vec::new();

        let aktive: Vec<CallId> = self
            .aktiv
            .values()
            .filter(|t| t.frist <= jetzt)
            .map(|t| t.call_id)
            .collect();
        for call_id in aktive {
            if let Some(t) = self.aktiv.remove(&call_id) {
                abgelaufen.push(t);
            }
        }

        for schlange in self.wartend.values_mut() {
            while schlange.front().is_some_and(|t| t.frist <= jetzt) {
                if let Some(t) = schlange.pop_front() {
                    self.wartend_index.remove(&t.call_id);
                    abgelaufen.push(t);
                }
            }
        }
        self.wartend.retain(|_, schlange| !schlange.is_empty());

        abgelaufen.sort_by_key(|t| t.call_id);
        abgelaufen
            .into_iter()
            .map(|t| {
                let call_id = t.call_id;
                t.fehlschlagen(SessionError::Timeout(call_id))
            })
            .collect()
    }

    /// Verwirft alles ohne Rueckrufe (Sitzung wird geschlossen)
    pub fn clear(&mut self) -> usize {
        let anzahl = self.aktiv.len() + self.wartend_index.len();
        self.aktiv.clear();
        self.wartend.clear();
        self.wartend_index.clear();
        anzahl
    }

    // --- Abfragen ---

    /// Aktiv oder wartend
    pub fn ist_offen(&self, call_id: CallId) -> bool {
        self.aktiv.contains_key(&call_id) || self.wartend_index.contains_key(&call_id)
    }

    pub fn ist_aktiv(&self, call_id: CallId) -> bool {
        self.aktiv.contains_key(&call_id)
    }

    pub fn anzahl_aktiv(&self) -> usize {
        self.aktiv.len()
    }

    pub fn anzahl_wartend(&self, kanal: ChannelId) -> usize {
        self.wartend.get(&kanal).map_or(0, VecDeque::len)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testhilfe::AufzeichnenderTransport;
    use parking_lot::Mutex;
    use sipline_protocol::{header, Method};
    use std::sync::Arc;

    const FRIST: Duration = Duration::from_secs(30);

    fn anfrage(call_id: CallId) -> SipMessage {
        SipMessage::request(Method::Service, "fetion.com.cn")
            .with_header(header::CALL_ID, call_id.to_string())
    }

    fn antwort(call_id: CallId, status: u16) -> SipMessage {
        SipMessage::response(status, "OK").with_header(header::CALL_ID, call_id.to_string())
    }

    fn protokoll() -> (Arc<Mutex<Vec<String>>>, impl Fn(&str) -> Rueckruf) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log2 = Arc::clone(&log);
        let fabrik = move |name: &str| -> Rueckruf {
            let log = Arc::clone(&log2);
            let name = name.to_string();
            Box::new(move |ergebnis: Result<&SipMessage, SessionError>| {
                let eintrag = match ergebnis {
                    Ok(msg) => format!("{name}:ok:{}", msg.status().unwrap_or(0)),
                    Err(e) => format!("{name}:err:{e}"),
                };
                log.lock().push(eintrag);
            })
        };
        (log, fabrik)
    }

    #[test]
    fn open_sendet_und_registriert() {
        let (mut transport, gesendet) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let jetzt = Instant::now();

        let id = tabelle
            .open(TransactionKind::KeepAlive, anfrage, None, &mut transport, jetzt)
            .unwrap();

        assert!(tabelle.ist_aktiv(id));
        assert_eq!(gesendet.lock().len(), 1);
        assert_eq!(gesendet.lock()[0].call_id(), Some(id));
    }

    #[test]
    fn call_ids_sind_eindeutig() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let jetzt = Instant::now();

        let a = tabelle
            .open(TransactionKind::KeepAlive, anfrage, None, &mut transport, jetzt)
            .unwrap();
        let b = tabelle.enqueue_waiting(ChannelId(9), TransactionKind::KeepAlive, anfrage, None, jetzt);
        let c = tabelle
            .open(TransactionKind::KeepAlive, anfrage, None, &mut transport, jetzt)
            .unwrap();
        assert_ne!(a, b);
        assert_ne!(b, c);
        assert_ne!(a, c);
    }

    #[test]
    fn call_id_ueberlauf_ueberspringt_belegte() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let jetzt = Instant::now();

        let erste = tabelle
            .open(TransactionKind::KeepAlive, anfrage, None, &mut transport, jetzt)
            .unwrap();
        assert_eq!(erste, CallId(1));

        tabelle.naechste_id = u32::MAX;
        let letzte = tabelle
            .open(TransactionKind::KeepAlive, anfrage, None, &mut transport, jetzt)
            .unwrap();
        assert_eq!(letzte, CallId(u32::MAX));

        // 0 wird nie vergeben, 1 ist noch belegt
        let danach = tabelle
            .open(TransactionKind::KeepAlive, anfrage, None, &mut transport, jetzt)
            .unwrap();
        assert_eq!(danach, CallId(2));
    }

    #[test]
    fn complete_ruft_rueckruf_genau_einmal() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let (log, rueckruf) = protokoll();

        let id = tabelle
            .open(
                TransactionKind::KeepAlive,
                anfrage,
                Some(rueckruf("ka")),
                &mut transport,
                Instant::now(),
            )
            .unwrap();

        let ergebnis = tabelle.complete(&antwort(id, 200)).unwrap();
        assert_eq!(ergebnis.call_id, id);
        assert_eq!(ergebnis.art, TransactionKind::KeepAlive);
        assert!(!tabelle.ist_offen(id));

        // Zweite Antwort mit gleicher ID wird verworfen
        assert_eq!(tabelle.complete(&antwort(id, 200)), None);
        assert_eq!(*log.lock(), vec!["ka:ok:200".to_string()]);
    }

    #[test]
    fn unzugeordnete_antwort_wird_verworfen() {
        let mut tabelle = TransactionTable::neu(FRIST);
        assert_eq!(tabelle.complete(&antwort(CallId(77), 200)), None);
        assert_eq!(tabelle.complete(&SipMessage::response(200, "OK")), None);
    }

    #[test]
    fn cancel_ohne_rueckruf() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let (log, rueckruf) = protokoll();
        let jetzt = Instant::now();

        let aktiv = tabelle
            .open(TransactionKind::KeepAlive, anfrage, Some(rueckruf("a")), &mut transport, jetzt)
            .unwrap();
        let wartend = tabelle.enqueue_waiting(
            ChannelId(3),
            TransactionKind::KeepAlive,
            anfrage,
            Some(rueckruf("w")),
            jetzt,
        );

        assert!(tabelle.cancel(aktiv));
        assert!(tabelle.cancel(wartend));
        assert!(!tabelle.cancel(wartend));
        assert_eq!(tabelle.anzahl_wartend(ChannelId(3)), 0);
        assert_eq!(tabelle.complete(&antwort(aktiv, 200)), None);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn warteliste_wird_in_fifo_reihenfolge_freigegeben() {
        let (mut transport, gesendet) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let kanal = ChannelId(5);
        let jetzt = Instant::now();

        let ids: Vec<CallId> = (0..3)
            .map(|_| tabelle.enqueue_waiting(kanal, TransactionKind::KeepAlive, anfrage, None, jetzt))
            .collect();
        assert!(gesendet.lock().is_empty());
        assert_eq!(tabelle.anzahl_wartend(kanal), 3);

        let freigabe = tabelle.release_waiting(kanal, &mut transport, jetzt);
        assert_eq!(freigabe.gesendet, ids);
        assert!(freigabe.fehlgeschlagen.is_empty());
        assert_eq!(tabelle.anzahl_wartend(kanal), 0);

        let reihenfolge: Vec<Option<CallId>> =
            gesendet.lock().iter().map(SipMessage::call_id).collect();
        assert_eq!(reihenfolge, ids.iter().copied().map(Some).collect::<Vec<_>>());

        // Jetzt aktiv und wartet auf Antwort
        assert!(ids.iter().all(|id| tabelle.ist_aktiv(*id)));

        // Zweite Freigabe sendet nichts mehr
        let nochmal = tabelle.release_waiting(kanal, &mut transport, jetzt);
        assert!(nochmal.gesendet.is_empty());
        assert_eq!(gesendet.lock().len(), 3);
    }

    #[test]
    fn freigabe_betrifft_nur_den_eigenen_kanal() {
        let (mut transport, gesendet) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let jetzt = Instant::now();

        tabelle.enqueue_waiting(ChannelId(1), TransactionKind::KeepAlive, anfrage, None, jetzt);
        tabelle.enqueue_waiting(ChannelId(2), TransactionKind::KeepAlive, anfrage, None, jetzt);

        tabelle.release_waiting(ChannelId(1), &mut transport, jetzt);
        assert_eq!(gesendet.lock().len(), 1);
        assert_eq!(tabelle.anzahl_wartend(ChannelId(2)), 1);
    }

    #[test]
    fn freigabe_bei_geschlossenem_transport_schlaegt_fehl() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        transport.close();
        let mut tabelle = TransactionTable::neu(FRIST);
        let (log, rueckruf) = protokoll();
        let jetzt = Instant::now();

        let id = tabelle.enqueue_waiting(
            ChannelId(1),
            TransactionKind::KeepAlive,
            anfrage,
            Some(rueckruf("w")),
            jetzt,
        );
        let freigabe = tabelle.release_waiting(ChannelId(1), &mut transport, jetzt);
        assert!(freigabe.gesendet.is_empty());
        assert_eq!(freigabe.fehlgeschlagen.len(), 1);
        assert_eq!(freigabe.fehlgeschlagen[0].call_id, id);
        assert!(!tabelle.ist_offen(id));
        assert_eq!(*log.lock(), vec!["w:err:Senden fehlgeschlagen".to_string()]);
    }

    #[test]
    fn open_bei_geschlossenem_transport_registriert_nichts() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        transport.close();
        let mut tabelle = TransactionTable::neu(FRIST);

        let ergebnis = tabelle.open(
            TransactionKind::KeepAlive,
            anfrage,
            None,
            &mut transport,
            Instant::now(),
        );
        assert!(matches!(ergebnis, Err(SessionError::SendFehler)));
        assert_eq!(tabelle.anzahl_aktiv(), 0);
    }

    #[test]
    fn abgelaufene_transaktionen_enden_mit_timeout() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let (log, rueckruf) = protokoll();
        let start = Instant::now();

        let aktiv = tabelle
            .open(TransactionKind::KeepAlive, anfrage, Some(rueckruf("a")), &mut transport, start)
            .unwrap();
        let wartend = tabelle.enqueue_waiting(
            ChannelId(4),
            TransactionKind::KeepAlive,
            anfrage,
            Some(rueckruf("w")),
            start,
        );

        // Vor der Frist passiert nichts
        assert!(tabelle.expire(start + Duration::from_secs(10)).is_empty());

        let abgelaufen = tabelle.expire(start + FRIST);
        let ids: Vec<CallId> = abgelaufen.iter().map(|f| f.call_id).collect();
        assert_eq!(ids, vec![aktiv, wartend]);
        assert!(!tabelle.ist_offen(aktiv));
        assert!(!tabelle.ist_offen(wartend));
        assert_eq!(tabelle.anzahl_wartend(ChannelId(4)), 0);

        let eintraege = log.lock().clone();
        assert_eq!(eintraege.len(), 2);
        assert!(eintraege[0].starts_with("a:err:Transaktion"));

        // Spaete Antwort wird verworfen
        assert_eq!(tabelle.complete(&antwort(aktiv, 200)), None);
    }

    #[test]
    fn fail_waiting_ruft_alle_rueckrufe() {
        let mut tabelle = TransactionTable::neu(FRIST);
        let (log, rueckruf) = protokoll();
        let jetzt = Instant::now();
        let ziel = BuddyId::new("501");

        for name in ["1", "2"] {
            tabelle.enqueue_waiting(
                ChannelId(8),
                TransactionKind::Nachricht {
                    ziel: ziel.clone(),
                    kanal: Some(ChannelId(8)),
                },
                anfrage,
                Some(rueckruf(name)),
                jetzt,
            );
        }

        let fehlgeschlagen =
            tabelle.fail_waiting(ChannelId(8), || SessionError::KanalGeschlossen(ziel.clone()));
        assert_eq!(fehlgeschlagen.len(), 2);
        assert_eq!(log.lock().len(), 2);
        assert!(log.lock()[0].starts_with("1:err:Kanal"));
        assert!(tabelle.fail_waiting(ChannelId(8), || SessionError::Geschlossen).is_empty());
    }

    #[test]
    fn clear_verwirft_ohne_rueckrufe() {
        let (mut transport, _) = AufzeichnenderTransport::neu();
        let mut tabelle = TransactionTable::neu(FRIST);
        let (log, rueckruf) = protokoll();
        let jetzt = Instant::now();

        let id = tabelle
            .open(TransactionKind::KeepAlive, anfrage, Some(rueckruf("a")), &mut transport, jetzt)
            .unwrap();
        tabelle.enqueue_waiting(ChannelId(1), TransactionKind::KeepAlive, anfrage, Some(rueckruf("w")), jetzt);

        assert_eq!(tabelle.clear(), 2);
        assert!(!tabelle.ist_offen(id));
        assert!(tabelle.expire(jetzt + FRIST * 2).is_empty());
        assert!(log.lock().is_empty());
    }

    #[test]
    fn art_liefert_operation_und_ziel() {
        let art = TransactionKind::Umbenennen {
            buddy: BuddyId::new("501"),
            name: "Anna".into(),
        };
        assert_eq!(art.operation(), Operation::Umbenennen);
        assert_eq!(art.ziel(), Some(&BuddyId::new("501")));
        assert_eq!(TransactionKind::KeepAlive.ziel(), None);
    }
}
