//! Verbindungs-Task – betreibt ein Konto ueber eine TCP-Verbindung
//!
//! Jedes Konto laeuft in einem eigenen tokio-Task. Der Task besitzt das
//! Konto exklusiv; die Host-Anwendung spricht es ueber ein `AccountHandle`
//! an (Kommandos per `mpsc`, Antworten per `oneshot`).
//!
//! ```text
//!  AccountHandle ──Kommando──>┐
//!  TCP (SipcCodec) ──Rohtext──>├─> select! ─> ProtocolAccount
//!  Takt (1 s / Keepalive) ────>┘        │
//!  ChannelTransport <──SipMessage───────┘ ──> TCP
//! ```
//!
//! ## Ende
//! - Dienst trennt die Verbindung oder Framing-Fehler
//! - Konto fatal (z.B. anderswo angemeldet) oder `close`
//! - alle Handles verworfen
//!
//! Danach wird das Konto geschlossen und die restliche Ausgangs-Queue
//! noch geschrieben.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::codec::Framed;

use sipline_core::types::{BuddyId, GroupId, PresenceState};
use sipline_protocol::{SipMessage, SipcCodec};

use crate::account::{Abbau, AccountState, HostServices};
use crate::config::{Credentials, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::info::BuddyInfo;
use crate::registry::{ProtocolAccount, ProtocolRegistry};
use crate::transport::ChannelTransport;

/// Takt fuer das Pruefen der Transaktions-Fristen
const SWEEP_INTERVALL: Duration = Duration::from_secs(1);

type Antwort<T> = oneshot::Sender<SessionResult<T>>;

// ---------------------------------------------------------------------------
// Kommandos
// ---------------------------------------------------------------------------

/// Kommando der Host-Anwendung an den Verbindungs-Task
#[derive(Debug)]
pub enum AccountCommand {
    SendChat {
        ziel: BuddyId,
        text: String,
        antwort: Antwort<()>,
    },
    ChangeState {
        zustand: PresenceState,
        antwort: Antwort<()>,
    },
    KeepAlive {
        antwort: Antwort<()>,
    },
    MoveBuddy {
        buddy: BuddyId,
        gruppe: GroupId,
        antwort: Antwort<()>,
    },
    RemoveBuddy {
        buddy: BuddyId,
        antwort: Antwort<()>,
    },
    RenameBuddy {
        buddy: BuddyId,
        name: String,
        antwort: Antwort<()>,
    },
    /// Antwortet erst, wenn der Dienst geantwortet hat
    GetInfo {
        buddy: BuddyId,
        antwort: Antwort<BuddyInfo>,
    },
    Close {
        antwort: oneshot::Sender<Option<Abbau>>,
    },
}

fn kommando_ausfuehren(konto: &mut dyn ProtocolAccount, kommando: AccountCommand) {
    // Verworfene Empfaenger sind kein Fehler: der Aufrufer wartet nicht mehr
    match kommando {
        AccountCommand::SendChat {
            ziel,
            text,
            antwort,
        } => {
            let _ = antwort.send(konto.send_chat(&ziel, &text));
        }
        AccountCommand::ChangeState { zustand, antwort } => {
            let _ = antwort.send(konto.change_state(zustand));
        }
        AccountCommand::KeepAlive { antwort } => {
            let _ = antwort.send(konto.keep_alive());
        }
        AccountCommand::MoveBuddy {
            buddy,
            gruppe,
            antwort,
        } => {
            let _ = antwort.send(konto.move_buddy(&buddy, &gruppe));
        }
        AccountCommand::RemoveBuddy { buddy, antwort } => {
            let _ = antwort.send(konto.remove_buddy(&buddy));
        }
        AccountCommand::RenameBuddy {
            buddy,
            name,
            antwort,
        } => {
            let _ = antwort.send(konto.rename_buddy(&buddy, &name));
        }
        AccountCommand::GetInfo { buddy, antwort } => {
            // Rueckruf und Fehlerpfad teilen sich den einen Sender
            let geteilt = Arc::new(Mutex::new(Some(antwort)));
            let fuer_rueckruf = Arc::clone(&geteilt);
            let ergebnis = konto.get_info(
                &buddy,
                Box::new(move |info| {
                    if let Some(tx) = fuer_rueckruf.lock().take() {
                        let _ = tx.send(info);
                    }
                }),
            );
            if let Err(e) = ergebnis {
                if let Some(tx) = geteilt.lock().take() {
                    let _ = tx.send(Err(e));
                }
            }
        }
        AccountCommand::Close { antwort } => {
            let _ = antwort.send(konto.close());
        }
    }
}

// ---------------------------------------------------------------------------
// AccountHandle
// ---------------------------------------------------------------------------

/// Asynchroner Zugriff auf ein laufendes Konto
///
/// Nach dem Ende des Verbindungs-Tasks liefern alle Operationen
/// `SessionError::Geschlossen`.
#[derive(Debug, Clone)]
pub struct AccountHandle {
    tx: mpsc::Sender<AccountCommand>,
}

impl AccountHandle {
    async fn anfrage<T, F>(&self, baue: F) -> SessionResult<T>
    where
        F: FnOnce(Antwort<T>) -> AccountCommand,
    {
        let (tx, rx) = oneshot::channel();
        self.tx
            .send(baue(tx))
            .await
            .map_err(|_| SessionError::Geschlossen)?;
        rx.await.map_err(|_| SessionError::Geschlossen)?
    }

    pub async fn send_chat(&self, ziel: BuddyId, text: impl Into<String>) -> SessionResult<()> {
        let text = text.into();
        self.anfrage(|antwort| AccountCommand::SendChat {
            ziel,
            text,
            antwort,
        })
        .await
    }

    pub async fn change_state(&self, zustand: PresenceState) -> SessionResult<()> {
        self.anfrage(|antwort| AccountCommand::ChangeState { zustand, antwort })
            .await
    }

    pub async fn keep_alive(&self) -> SessionResult<()> {
        self.anfrage(|antwort| AccountCommand::KeepAlive { antwort })
            .await
    }

    pub async fn move_buddy(&self, buddy: BuddyId, gruppe: GroupId) -> SessionResult<()> {
        self.anfrage(|antwort| AccountCommand::MoveBuddy {
            buddy,
            gruppe,
            antwort,
        })
        .await
    }

    pub async fn remove_buddy(&self, buddy: BuddyId) -> SessionResult<()> {
        self.anfrage(|antwort| AccountCommand::RemoveBuddy { buddy, antwort })
            .await
    }

    pub async fn rename_buddy(&self, buddy: BuddyId, name: impl Into<String>) -> SessionResult<()> {
        let name = name.into();
        self.anfrage(|antwort| AccountCommand::RenameBuddy {
            buddy,
            name,
            antwort,
        })
        .await
    }

    /// Wartet auf die Antwort des Dienstes (oder deren Frist)
    pub async fn get_info(&self, buddy: BuddyId) -> SessionResult<BuddyInfo> {
        self.anfrage(|antwort| AccountCommand::GetInfo { buddy, antwort })
            .await
    }

    /// Schliesst das Konto; `None` wenn es bereits geschlossen war
    pub async fn close(&self) -> Option<Abbau> {
        let (tx, rx) = oneshot::channel();
        self.tx.send(AccountCommand::Close { antwort: tx }).await.ok()?;
        rx.await.ok().flatten()
    }

    /// Ob der Verbindungs-Task beendet ist
    pub fn ist_beendet(&self) -> bool {
        self.tx.is_closed()
    }
}

// ---------------------------------------------------------------------------
// Verbindungs-Task
// ---------------------------------------------------------------------------

/// Betreibt ein Konto bis zum Ende der Verbindung
pub async fn sitzung_betreiben<S>(
    stream: S,
    mut konto: Box<dyn ProtocolAccount>,
    mut ausgehend: mpsc::UnboundedReceiver<SipMessage>,
    mut kommandos: mpsc::Receiver<AccountCommand>,
    config: Arc<SessionConfig>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut framed = Framed::new(stream, SipcCodec::with_max_size(config.max_frame_groesse));

    let mut sweep = tokio::time::interval(SWEEP_INTERVALL);
    sweep.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let keepalive = config.keepalive_intervall();
    let keepalive_start = tokio::time::Instant::now() + keepalive.unwrap_or(SWEEP_INTERVALL);
    let mut keepalive_takt =
        tokio::time::interval_at(keepalive_start, keepalive.unwrap_or(SWEEP_INTERVALL));
    keepalive_takt.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!("Sitzungs-Task gestartet");

    loop {
        tokio::select! {
            // Eingehende Nachricht vom Dienst
            frame = framed.next() => match frame {
                Some(Ok(raw)) => konto.handle_inbound(&raw),
                Some(Err(e)) => {
                    tracing::warn!(fehler = %e, "Frame-Lesefehler");
                    break;
                }
                None => {
                    tracing::info!("Verbindung vom Dienst getrennt");
                    break;
                }
            },

            // Ausgehende Nachricht aus dem Transport
            Some(nachricht) = ausgehend.recv() => {
                if let Err(e) = framed.send(nachricht).await {
                    tracing::warn!(fehler = %e, "Senden fehlgeschlagen");
                    break;
                }
            }

            // Kommando der Host-Anwendung
            kommando = kommandos.recv() => match kommando {
                Some(kommando) => kommando_ausfuehren(konto.as_mut(), kommando),
                None => {
                    tracing::debug!("Alle Handles verworfen");
                    break;
                }
            },

            _ = sweep.tick() => konto.tick(Instant::now()),

            _ = keepalive_takt.tick(), if keepalive.is_some() => {
                if konto.zustand() == AccountState::Online {
                    if let Err(e) = konto.keep_alive() {
                        tracing::warn!(fehler = %e, "Keepalive nicht gesendet");
                    }
                }
            }
        }

        if konto.ist_beendet() {
            break;
        }
    }

    konto.close();

    // Bereits eingereihte Nachrichten (z.B. Bestaetigungen) noch schreiben
    while let Ok(nachricht) = ausgehend.try_recv() {
        if framed.send(nachricht).await.is_err() {
            break;
        }
    }
    if let Err(e) = SinkExt::<SipMessage>::close(&mut framed).await {
        tracing::debug!(fehler = %e, "Verbindung nicht sauber geschlossen");
    }

    tracing::info!("Sitzungs-Task beendet");
}

/// Oeffnet ein Konto ueber einen bestehenden Stream und startet den Task
pub fn starten<S>(
    stream: S,
    registry: &ProtocolRegistry,
    protokoll: &str,
    konto: Credentials,
    host: HostServices,
    config: Arc<SessionConfig>,
) -> SessionResult<(AccountHandle, JoinHandle<()>)>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (transport, ausgehend) = ChannelTransport::neu();
    let konto = registry.open(
        protokoll,
        konto,
        Box::new(transport),
        host,
        Arc::clone(&config),
    )?;

    let (tx, rx) = mpsc::channel(config.kommando_puffer.max(1));
    let task = tokio::spawn(sitzung_betreiben(stream, konto, ausgehend, rx, config));
    Ok((AccountHandle { tx }, task))
}

/// Verbindet per TCP und startet das Konto
pub async fn verbinden(
    adresse: &str,
    registry: &ProtocolRegistry,
    protokoll: &str,
    konto: Credentials,
    host: HostServices,
    config: Arc<SessionConfig>,
) -> SessionResult<(AccountHandle, JoinHandle<()>)> {
    let stream = TcpStream::connect(adresse).await?;
    stream.set_nodelay(true)?;
    tracing::info!(adresse = %adresse, sid = %konto.sid, "Verbunden");
    starten(stream, registry, protokoll, konto, host, config)
}
