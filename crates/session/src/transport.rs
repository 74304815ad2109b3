//! Transport-Schnittstelle
//!
//! Die Sitzung schreibt ausgehende Nachrichten ohne auf eine Bestaetigung zu
//! warten. `ChannelTransport` leitet sie an den Verbindungs-Task weiter, der
//! sie ueber den `Framed`-Stream schreibt.

use sipline_protocol::SipMessage;
use tokio::sync::mpsc;

use crate::error::{SessionError, SessionResult};

/// Geordneter Nachrichtenstrom zum Dienst
pub trait Transport: Send {
    /// Nachricht zum Senden einreihen
    fn send(&mut self, nachricht: SipMessage) -> SessionResult<()>;

    /// Verbindung freigeben; danach schlaegt jedes `send` fehl
    fn close(&mut self);

    fn ist_offen(&self) -> bool;
}

/// Transport ueber einen tokio-Kanal zum Verbindungs-Task
#[derive(Debug)]
pub struct ChannelTransport {
    tx: Option<mpsc::UnboundedSender<SipMessage>>,
}

impl ChannelTransport {
    /// Erstellt den Transport und die Empfangsseite fuer den Verbindungs-Task
    pub fn neu() -> (Self, mpsc::UnboundedReceiver<SipMessage>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx: Some(tx) }, rx)
    }
}

impl Transport for ChannelTransport {
    fn send(&mut self, nachricht: SipMessage) -> SessionResult<()> {
        let tx = self.tx.as_ref().ok_or(SessionError::SendFehler)?;
        tx.send(nachricht).map_err(|_| SessionError::SendFehler)
    }

    fn close(&mut self) {
        if self.tx.take().is_some() {
            tracing::debug!("Transport geschlossen");
        }
    }

    fn ist_offen(&self) -> bool {
        self.tx.as_ref().is_some_and(|tx| !tx.is_closed())
    }
}
