//! Konto-Sitzung
//!
//! `SessionAccount` besitzt genau einen Transport, eine Transaktions-Tabelle,
//! die Chat-Kanaele und den Kontakt-Cache. Alle Handler bekommen den
//! `SessionContext` explizit; es gibt keinen globalen Zustand.
//!
//! ```text
//!  open ──> Anmeldung ──2xx──> Online ──close──> Geschlossen
//!              │                  │
//!              └──Nicht-2xx──> Fehler <──deregistered
//! ```
//!
//! Im Zustand `Fehler` oder `Geschlossen` werden eingehende Nachrichten
//! verworfen und keine Rueckrufe mehr ausgeloest.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rand::RngCore;
use tokio::sync::mpsc;

use sipline_core::directory::Directory;
use sipline_core::error::DirectoryResult;
use sipline_core::event::{KeinPortrait, Notifier, PortraitFetcher, SessionEvent};
use sipline_core::types::{BuddyId, CallId, ChannelId, GroupId, PresenceState};
use sipline_observability::{SessionMetrics, VerwerfGrund};
use sipline_protocol::{body, request, RequestKopf, SipMessage};

use crate::channel::{self, ChannelSessions};
use crate::classifier;
use crate::config::{Credentials, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::info::{BuddyInfo, InfoRueckruf};
use crate::presence;
use crate::roster::{BuddyEintrag, GruppenEintrag, Roster};
use crate::transaction::{Abgeschlossen, Fehlgeschlagen, Rueckruf, TransactionKind, TransactionTable};
use crate::transport::Transport;

/// Meldung an den Benutzer, wenn sich das Konto anderswo angemeldet hat
pub const ABMELDUNG_TEXT: &str = "Your account has logined elsewhere. You are forced to quit.";

/// Titel fuer Systemnachrichten des Dienstes
pub const SYSTEM_TITEL: &str = "System Message";

/// Status fuer eine abgelaufene Anmeldung
const STATUS_TIMEOUT: u16 = 408;

// ---------------------------------------------------------------------------
// Host-Dienste und Kontext
// ---------------------------------------------------------------------------

/// Kollaborateure der Host-Anwendung fuer ein Konto
pub struct HostServices {
    pub directory: Box<dyn Directory>,
    pub notifier: Box<dyn Notifier>,
    pub portraits: Box<dyn PortraitFetcher>,
    pub ereignisse: mpsc::UnboundedSender<SessionEvent>,
}

impl HostServices {
    /// Host-Dienste ohne Portrait-Lader
    pub fn neu(
        directory: Box<dyn Directory>,
        notifier: Box<dyn Notifier>,
        ereignisse: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            directory,
            notifier,
            portraits: Box::new(KeinPortrait),
            ereignisse,
        }
    }

    pub fn mit_portraits(mut self, portraits: Box<dyn PortraitFetcher>) -> Self {
        self.portraits = portraits;
        self
    }
}

/// Zustand eines Kontos, den alle Handler teilen
pub struct SessionContext {
    pub(crate) konto: Credentials,
    pub(crate) config: Arc<SessionConfig>,
    pub(crate) transport: Box<dyn Transport>,
    pub(crate) transaktionen: TransactionTable,
    pub(crate) kanaele: ChannelSessions,
    pub(crate) roster: Roster,
    pub(crate) host: HostServices,
    pub(crate) metrics: SessionMetrics,
    cseq: u32,
}

impl SessionContext {
    fn neu(
        konto: Credentials,
        config: Arc<SessionConfig>,
        transport: Box<dyn Transport>,
        host: HostServices,
        metrics: SessionMetrics,
    ) -> Self {
        Self {
            transaktionen: TransactionTable::neu(config.transaktions_timeout()),
            konto,
            config,
            transport,
            kanaele: ChannelSessions::neu(),
            roster: Roster::neu(),
            host,
            metrics,
            cseq: 0,
        }
    }

    fn naechste_cseq(&mut self) -> u32 {
        self.cseq = self.cseq.wrapping_add(1);
        self.cseq
    }

    /// Baut eine Anfrage, sendet sie und registriert die Transaktion
    pub(crate) fn anfrage_oeffnen<F>(
        &mut self,
        art: TransactionKind,
        baue: F,
        rueckruf: Option<Rueckruf>,
        jetzt: Instant,
    ) -> SessionResult<CallId>
    where
        F: FnOnce(&RequestKopf<'_>) -> SipMessage,
    {
        let cseq = self.naechste_cseq();
        let sid = self.konto.sid.as_str();
        let domain = self.config.domain.as_str();
        let call_id = self.transaktionen.open(
            art,
            |call_id| {
                baue(&RequestKopf {
                    sid,
                    domain,
                    call_id,
                    cseq,
                })
            },
            rueckruf,
            self.transport.as_mut(),
            jetzt,
        )?;
        self.metrics.transaktion_geoeffnet();
        Ok(call_id)
    }

    /// Baut eine Anfrage und laesst sie auf einen Kanal warten
    pub(crate) fn anfrage_einreihen<F>(
        &mut self,
        kanal: ChannelId,
        art: TransactionKind,
        baue: F,
        rueckruf: Option<Rueckruf>,
        jetzt: Instant,
    ) -> CallId
    where
        F: FnOnce(&RequestKopf<'_>) -> SipMessage,
    {
        let cseq = self.naechste_cseq();
        let sid = self.konto.sid.as_str();
        let domain = self.config.domain.as_str();
        self.transaktionen.enqueue_waiting(
            kanal,
            art,
            |call_id| {
                baue(&RequestKopf {
                    sid,
                    domain,
                    call_id,
                    cseq,
                })
            },
            rueckruf,
            jetzt,
        )
    }

    pub(crate) fn ereignis(&self, ereignis: SessionEvent) {
        if self.host.ereignisse.send(ereignis).is_err() {
            tracing::trace!("Ereignis-Empfaenger geschlossen, Ereignis verworfen");
        }
    }

    /// Meldet fehlgeschlagene Transaktionen an die Host-Anwendung
    pub(crate) fn fehlschlaege_melden(&self, fehlgeschlagen: Vec<Fehlgeschlagen>) {
        for f in fehlgeschlagen {
            tracing::warn!(
                call_id = %f.call_id,
                operation = %f.art.operation(),
                grund = %f.grund,
                "Operation fehlgeschlagen"
            );
            self.ereignis(SessionEvent::OperationFehlgeschlagen {
                operation: f.art.operation(),
                ziel: f.art.ziel().cloned(),
                grund: f.grund,
            });
        }
    }
}

fn verzeichnis_pruefen(ergebnis: DirectoryResult<()>, buddy: &BuddyId) {
    if let Err(e) = ergebnis {
        tracing::warn!(buddy = %buddy, fehler = %e, "Verzeichnis-Aktualisierung fehlgeschlagen");
    }
}

/// Client-Nonce fuer die Registrierung (32 Hex-Zeichen)
fn cnonce_erzeugen() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

// ---------------------------------------------------------------------------
// Kontozustand
// ---------------------------------------------------------------------------

/// Grund fuer einen terminalen Kontofehler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FatalGrund {
    AnderswoAngemeldet,
    AnmeldungFehlgeschlagen { status: u16, grund: String },
}

impl FatalGrund {
    /// Lesbare Meldung fuer den Benutzer
    pub fn meldung(&self) -> String {
        match self {
            Self::AnderswoAngemeldet => ABMELDUNG_TEXT.to_string(),
            Self::AnmeldungFehlgeschlagen { .. } => self.als_fehler().to_string(),
        }
    }

    pub fn als_fehler(&self) -> SessionError {
        match self {
            Self::AnderswoAngemeldet => SessionError::AnderswoAngemeldet,
            Self::AnmeldungFehlgeschlagen { status, grund } => SessionError::AnmeldungFehlgeschlagen {
                status: *status,
                grund: grund.clone(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountState {
    Anmeldung,
    Online,
    Fehler(FatalGrund),
    Geschlossen,
}

/// Was `close` freigegeben hat
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Abbau {
    pub kanaele: usize,
    pub buddies: usize,
    pub gruppen: usize,
    pub transaktionen: usize,
}

// ---------------------------------------------------------------------------
// SessionAccount
// ---------------------------------------------------------------------------

pub struct SessionAccount {
    ctx: SessionContext,
    zustand: AccountState,
    eigener_zustand: PresenceState,
}

impl SessionAccount {
    /// Oeffnet ein Konto und sendet die Registrierung
    pub fn open(
        konto: Credentials,
        transport: Box<dyn Transport>,
        host: HostServices,
        config: Arc<SessionConfig>,
        metrics: SessionMetrics,
    ) -> SessionResult<Self> {
        let mut ctx = SessionContext::neu(konto, config, transport, host, metrics);

        let user_id = ctx.konto.user_id.clone();
        let mobile = ctx.konto.mobile.clone();
        let token = ctx.konto.auth_token.clone();
        let cnonce = cnonce_erzeugen();
        ctx.anfrage_oeffnen(
            TransactionKind::Anmeldung,
            |kopf| request::registrieren(kopf, &user_id, &mobile, &token, &cnonce),
            None,
            Instant::now(),
        )?;
        tracing::info!(sid = %ctx.konto.sid, "Registrierung gesendet");

        Ok(Self {
            ctx,
            zustand: AccountState::Anmeldung,
            eigener_zustand: PresenceState::Offline,
        })
    }

    // --- Abfragen ---

    pub fn zustand(&self) -> &AccountState {
        &self.zustand
    }

    /// Vom Dienst bestaetigter eigener Praesenzzustand
    pub fn eigener_zustand(&self) -> PresenceState {
        self.eigener_zustand
    }

    pub fn ist_online(&self) -> bool {
        self.zustand == AccountState::Online
    }

    /// Fehler oder geschlossen: keine Verarbeitung mehr
    pub fn ist_beendet(&self) -> bool {
        matches!(self.zustand, AccountState::Fehler(_) | AccountState::Geschlossen)
    }

    pub fn metrics(&self) -> &SessionMetrics {
        &self.ctx.metrics
    }

    pub fn config(&self) -> &SessionConfig {
        &self.ctx.config
    }

    pub fn buddy(&self, id: &BuddyId) -> Option<&BuddyEintrag> {
        self.ctx.roster.buddy(id)
    }

    pub fn anzahl_buddies(&self) -> usize {
        self.ctx.roster.anzahl_buddies()
    }

    pub fn anzahl_kanaele(&self) -> usize {
        self.ctx.kanaele.anzahl()
    }

    /// `Some(bereit)` wenn ein Kanal zum Kontakt besteht
    pub fn kanal_bereit(&self, peer: &BuddyId) -> Option<bool> {
        self.ctx.kanaele.get(peer).map(|k| k.ist_bereit())
    }

    pub fn kanal_von(&self, peer: &BuddyId) -> Option<ChannelId> {
        self.ctx.kanaele.kanal_von(peer)
    }

    /// Anzahl wartender Transaktionen fuer den Kanal eines Kontakts
    pub fn anzahl_wartend(&self, peer: &BuddyId) -> usize {
        self.ctx
            .kanaele
            .kanal_von(peer)
            .map_or(0, |k| self.ctx.transaktionen.anzahl_wartend(k))
    }

    pub fn transaktion_offen(&self, call_id: CallId) -> bool {
        self.ctx.transaktionen.ist_offen(call_id)
    }

    fn bereit_pruefen(&self) -> SessionResult<()> {
        match self.zustand {
            AccountState::Online => Ok(()),
            AccountState::Geschlossen => Err(SessionError::Geschlossen),
            AccountState::Anmeldung | AccountState::Fehler(_) => Err(SessionError::NichtAngemeldet),
        }
    }

    fn bekannt(&self, buddy: &BuddyId) -> SessionResult<()> {
        if self.ctx.roster.buddy(buddy).is_some() {
            Ok(())
        } else {
            Err(SessionError::NichtGefunden(buddy.to_string()))
        }
    }

    // --- Eingang ---

    /// Verarbeitet eine empfangene Rohnachricht
    pub fn handle_inbound(&mut self, raw: &str) {
        if self.ist_beendet() {
            tracing::debug!("Konto beendet, Nachricht verworfen");
            self.ctx.metrics.nachricht_verworfen(VerwerfGrund::Beendet);
            return;
        }
        classifier::verteilen(self, raw);
    }

    /// Beendet abgelaufene Transaktionen
    pub fn tick(&mut self, jetzt: Instant) {
        if self.ist_beendet() {
            return;
        }
        let abgelaufen = self.ctx.transaktionen.expire(jetzt);
        if abgelaufen.is_empty() {
            return;
        }
        self.ctx.metrics.transaktionen_abgelaufen(abgelaufen.len());
        for f in abgelaufen {
            tracing::warn!(call_id = %f.call_id, operation = %f.art.operation(), "Transaktion abgelaufen");
            self.fehlschlag(f, STATUS_TIMEOUT);
            if self.ist_beendet() {
                break;
            }
        }
    }

    pub(crate) fn antwort_empfangen(&mut self, antwort: &SipMessage) {
        let status = antwort.status().unwrap_or(0);
        if status < 200 {
            tracing::trace!(call_id = ?antwort.call_id(), status, "Vorlaeufige Antwort");
            return;
        }

        let Some(abschluss) = self.ctx.transaktionen.complete(antwort) else {
            self.ctx.metrics.nachricht_verworfen(VerwerfGrund::Unzugeordnet);
            return;
        };
        self.ctx
            .metrics
            .transaktion_abgeschlossen(status, abschluss.gesendet.elapsed());

        if antwort.is_success() {
            self.erfolg(abschluss, antwort);
        } else {
            let grund = SessionError::abgelehnt(antwort).to_string();
            self.fehlschlag(
                Fehlgeschlagen {
                    call_id: abschluss.call_id,
                    art: abschluss.art,
                    grund,
                },
                status,
            );
        }
    }

    pub(crate) fn chat_empfangen(&mut self, nachricht: &SipMessage) {
        if let Err(e) = self.ctx.transport.send(request::bestaetigung(nachricht)) {
            tracing::warn!(fehler = %e, "Bestaetigung nicht gesendet");
        }

        let absender = nachricht.absender().unwrap_or("");
        let ist_system = nachricht
            .event()
            .is_some_and(|n| n.eq_ignore_ascii_case("system-message"));

        // Systemnachrichten zusaetzlich als Hinweis; zugestellt werden sie
        // wie jede andere Nachricht
        if ist_system {
            match body::system_nachricht(nachricht.body()) {
                Some((text, url)) => {
                    let anzeige = match &url {
                        Some(url) => format!("{text}\n{url}"),
                        None => text.clone(),
                    };
                    self.ctx.host.notifier.notify(SYSTEM_TITEL, &anzeige);
                    self.ctx.ereignis(SessionEvent::SystemNachricht { text, url });
                }
                None => tracing::debug!("Systemnachricht ohne Inhalt"),
            }
        }

        let von = self
            .ctx
            .roster
            .buddy_nach_uri(absender)
            .map(|b| b.id.clone())
            .unwrap_or_else(|| BuddyId::new(absender));
        tracing::debug!(buddy = %von, "Chat empfangen");
        self.ctx.ereignis(SessionEvent::ChatEmpfangen {
            von,
            text: nachricht.body().to_string(),
            empfangen: Utc::now(),
        });
    }

    pub(crate) fn presence_empfangen(&mut self, inhalt: &str) {
        let angewendet = presence::verarbeiten(&mut self.ctx, inhalt);
        tracing::trace!(angewendet, "Presence verarbeitet");
    }

    pub(crate) fn kanal_betreten(&mut self, nachricht: &SipMessage) {
        if let Some(freigabe) = channel::kanal_bereit(&mut self.ctx, nachricht, Instant::now()) {
            self.ctx.fehlschlaege_melden(freigabe.fehlgeschlagen);
        }
    }

    pub(crate) fn kanal_verlassen(&mut self, nachricht: &SipMessage) {
        let fehlgeschlagen = channel::kanal_verlassen(&mut self.ctx, nachricht);
        self.ctx.fehlschlaege_melden(fehlgeschlagen);
    }

    /// Dieselbe Identitaet hat sich anderswo angemeldet
    pub(crate) fn abgemeldet(&mut self) {
        self.fatal(FatalGrund::AnderswoAngemeldet);
    }

    fn fatal(&mut self, grund: FatalGrund) {
        if self.ist_beendet() {
            return;
        }
        let meldung = grund.meldung();
        tracing::error!(sid = %self.ctx.konto.sid, grund = %meldung, "Konto beendet");
        self.zustand = AccountState::Fehler(grund);
        self.ctx.host.notifier.account_error(&meldung);
        self.ctx.ereignis(SessionEvent::Fatal { grund: meldung });
    }

    // --- Abschluss von Transaktionen ---

    fn erfolg(&mut self, abschluss: Abgeschlossen, antwort: &SipMessage) {
        let operation = abschluss.art.operation();
        let ziel = abschluss.art.ziel().cloned();

        match abschluss.art {
            TransactionKind::Anmeldung => {
                self.angemeldet(antwort);
                return;
            }
            TransactionKind::Einladung { ziel } => {
                tracing::debug!(buddy = %ziel, "Einladung angenommen, warte auf Teilnehmer");
                return;
            }
            TransactionKind::Zustand { zustand } => {
                self.eigener_zustand = zustand;
                self.ctx.ereignis(SessionEvent::ZustandGeaendert { zustand });
            }
            TransactionKind::Verschieben { buddy, gruppe } => {
                verzeichnis_pruefen(self.ctx.host.directory.move_buddy(&buddy, &gruppe), &buddy);
                if let Some(eintrag) = self.ctx.roster.buddy_mut(&buddy) {
                    eintrag.gruppe = Some(gruppe);
                }
            }
            TransactionKind::Entfernen { buddy } => {
                verzeichnis_pruefen(self.ctx.host.directory.remove_buddy(&buddy), &buddy);
                self.ctx.roster.buddy_entfernen(&buddy);
                if let Some(kanal) = self.ctx.kanaele.kanal_von(&buddy) {
                    let folgen = channel::kanal_abbauen(&mut self.ctx, kanal);
                    self.ctx.fehlschlaege_melden(folgen);
                }
            }
            TransactionKind::Umbenennen { buddy, name } => {
                verzeichnis_pruefen(self.ctx.host.directory.rename_buddy(&buddy, &name), &buddy);
                if let Some(eintrag) = self.ctx.roster.buddy_mut(&buddy) {
                    eintrag.lokaler_name = (!name.is_empty()).then_some(name);
                }
            }
            TransactionKind::Nachricht { .. } | TransactionKind::KeepAlive | TransactionKind::Info { .. } => {}
        }

        tracing::debug!(call_id = %abschluss.call_id, operation = %operation, "Operation erfolgreich");
        self.ctx
            .ereignis(SessionEvent::OperationErfolgreich { operation, ziel });
    }

    fn fehlschlag(&mut self, f: Fehlgeschlagen, status: u16) {
        match &f.art {
            TransactionKind::Anmeldung => {
                self.fatal(FatalGrund::AnmeldungFehlgeschlagen {
                    status,
                    grund: f.grund,
                });
                return;
            }
            TransactionKind::Einladung { .. } => {
                let folgen = channel::kanal_abbauen(&mut self.ctx, ChannelId::from(f.call_id));
                self.ctx.fehlschlaege_melden(folgen);
            }
            TransactionKind::Nachricht {
                ziel,
                kanal: Some(kanal),
            } => {
                // Nur der Kanal, auf den die Nachricht gewartet hat, und nur
                // solange er nie bereit wurde
                if self.ctx.kanaele.kanal_von(ziel) == Some(*kanal)
                    && self.kanal_bereit(ziel) == Some(false)
                {
                    let folgen = channel::kanal_abbauen(&mut self.ctx, *kanal);
                    self.ctx.fehlschlaege_melden(folgen);
                }
            }
            _ => {}
        }
        self.ctx.fehlschlaege_melden(vec![f]);
    }

    /// Registrierung bestaetigt: Kontaktliste uebernehmen
    fn angemeldet(&mut self, antwort: &SipMessage) {
        let liste = body::kontaktliste(antwort.body());
        let ctx = &mut self.ctx;

        for g in liste.gruppen {
            let id = GroupId::new(g.id);
            if let Err(e) = ctx.host.directory.create_group(&id, &g.name) {
                tracing::warn!(gruppe = %id, fehler = %e, "Gruppe nicht angelegt");
            }
            ctx.roster.gruppe_eintragen(GruppenEintrag { id, name: g.name });
        }

        for k in liste.kontakte {
            let id = BuddyId::new(k.user_id);
            let gruppe = k
                .gruppe
                .map(GroupId::new)
                .filter(|g| ctx.roster.gruppe(g).is_some());
            verzeichnis_pruefen(
                ctx.host
                    .directory
                    .create_buddy(&id, gruppe.as_ref(), k.lokaler_name.as_deref()),
                &id,
            );
            let mut eintrag = BuddyEintrag::neu(id, k.uri);
            eintrag.gruppe = gruppe;
            eintrag.lokaler_name = k.lokaler_name;
            ctx.roster.eintragen(eintrag);
        }

        let buddies = ctx.roster.anzahl_buddies();
        let gruppen = ctx.roster.anzahl_gruppen();
        self.zustand = AccountState::Online;
        self.eigener_zustand = PresenceState::Online;
        tracing::info!(sid = %self.ctx.konto.sid, buddies, gruppen, "Angemeldet");
        self.ctx.ereignis(SessionEvent::Angemeldet { buddies, gruppen });
    }

    // --- Operationen der Host-Anwendung ---

    /// Sendet Text an einen Kontakt
    pub fn send_chat(&mut self, ziel: &BuddyId, text: &str) -> SessionResult<CallId> {
        self.bereit_pruefen()?;
        channel::chat_senden(&mut self.ctx, ziel, text, Instant::now())
    }

    /// Setzt den eigenen Praesenzzustand
    ///
    /// `Offline` ist kein setzbares Ziel und wird wie `Online` gesendet.
    pub fn change_state(&mut self, zustand: PresenceState) -> SessionResult<CallId> {
        self.bereit_pruefen()?;
        let code = presence::code_aus_zustand(zustand);
        let ziel = match zustand {
            PresenceState::Offline => PresenceState::Online,
            anders => anders,
        };
        self.ctx.anfrage_oeffnen(
            TransactionKind::Zustand { zustand: ziel },
            |kopf| request::zustand_setzen(kopf, code),
            None,
            Instant::now(),
        )
    }

    pub fn keep_alive(&mut self) -> SessionResult<CallId> {
        self.bereit_pruefen()?;
        self.ctx.anfrage_oeffnen(
            TransactionKind::KeepAlive,
            request::keep_alive,
            None,
            Instant::now(),
        )
    }

    pub fn move_buddy(&mut self, buddy: &BuddyId, gruppe: &GroupId) -> SessionResult<CallId> {
        self.bereit_pruefen()?;
        self.bekannt(buddy)?;
        self.ctx.anfrage_oeffnen(
            TransactionKind::Verschieben {
                buddy: buddy.clone(),
                gruppe: gruppe.clone(),
            },
            |kopf| request::buddy_verschieben(kopf, buddy.as_str(), gruppe.as_str()),
            None,
            Instant::now(),
        )
    }

    pub fn remove_buddy(&mut self, buddy: &BuddyId) -> SessionResult<CallId> {
        self.bereit_pruefen()?;
        self.bekannt(buddy)?;
        self.ctx.anfrage_oeffnen(
            TransactionKind::Entfernen {
                buddy: buddy.clone(),
            },
            |kopf| request::buddy_entfernen(kopf, buddy.as_str()),
            None,
            Instant::now(),
        )
    }

    /// Setzt den lokalen Namen (leer = Alias entfernen)
    pub fn rename_buddy(&mut self, buddy: &BuddyId, name: &str) -> SessionResult<CallId> {
        self.bereit_pruefen()?;
        self.bekannt(buddy)?;
        self.ctx.anfrage_oeffnen(
            TransactionKind::Umbenennen {
                buddy: buddy.clone(),
                name: name.to_string(),
            },
            |kopf| request::buddy_umbenennen(kopf, buddy.as_str(), name),
            None,
            Instant::now(),
        )
    }

    /// Fragt Kontaktinformationen ab; `fertig` wird genau einmal aufgerufen,
    /// ausser das Konto wird vorher geschlossen.
    pub fn get_info(&mut self, buddy: &BuddyId, fertig: InfoRueckruf) -> SessionResult<CallId> {
        self.bereit_pruefen()?;
        let lokaler_name = self
            .ctx
            .roster
            .buddy(buddy)
            .and_then(|b| b.lokaler_name.clone());

        let rueckruf: Rueckruf = Box::new(move |ergebnis: Result<&SipMessage, SessionError>| {
            let info = ergebnis.and_then(|antwort| {
                if !antwort.is_success() {
                    return Err(SessionError::abgelehnt(antwort));
                }
                body::kontakt_info(antwort.body())
                    .map(|kontakt| BuddyInfo::aus_kontakt(&kontakt, lokaler_name.as_deref()))
                    .ok_or_else(|| SessionError::UngueltigeAntwort("kein <contact> im Body".into()))
            });
            fertig(info);
        });

        self.ctx.anfrage_oeffnen(
            TransactionKind::Info {
                buddy: buddy.clone(),
            },
            |kopf| request::kontakt_info(kopf, buddy.as_str()),
            Some(rueckruf),
            Instant::now(),
        )
    }

    /// Entfernt eine offene oder wartende Transaktion ohne Rueckruf
    pub fn cancel(&mut self, call_id: CallId) -> bool {
        self.ctx.transaktionen.cancel(call_id)
    }

    /// Schliesst das Konto
    ///
    /// Reihenfolge: Transport, Transaktionen, Kanaele, Gruppen, Kontakte.
    /// Ein zweiter Aufruf tut nichts und gibt `None` zurueck.
    pub fn close(&mut self) -> Option<Abbau> {
        if self.zustand == AccountState::Geschlossen {
            return None;
        }

        self.ctx.transport.close();
        let transaktionen = self.ctx.transaktionen.clear();
        let kanaele = self.ctx.kanaele.leeren();
        self.ctx.metrics.kanaele_geschlossen(kanaele);
        let (buddies, gruppen) = self.ctx.roster.leeren();

        self.zustand = AccountState::Geschlossen;
        let abbau = Abbau {
            kanaele,
            buddies,
            gruppen,
            transaktionen,
        };
        tracing::info!(sid = %self.ctx.konto.sid, ?abbau, "Konto geschlossen");
        Some(abbau)
    }
}

impl std::fmt::Debug for SessionAccount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionAccount")
            .field("sid", &self.ctx.konto.sid)
            .field("zustand", &self.zustand)
            .field("eigener_zustand", &self.eigener_zustand)
            .field("kanaele", &self.ctx.kanaele.anzahl())
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
