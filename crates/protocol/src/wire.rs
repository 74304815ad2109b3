//! Wire-Format fuer die TCP-Verbindung
//!
//! SIP-C Nachrichten sind textbasiert: der Kopfbereich endet mit einer
//! Leerzeile, danach folgen genau `L` Bytes Body.
//!
//! ## Frame-Format
//!
//! ```text
//! +------------------------+-------+----...----+
//! | Startzeile + Kopfzeilen| CRLF  | Body (L)  |
//! +------------------------+-------+----...----+
//! ```
//!
//! Der Decoder liefert den Rohtext einer Nachricht. Inhaltliche Fehler
//! werden erst bei der Klassifizierung erkannt und verwerfen nur die eine
//! Nachricht; Framing-Fehler beenden die Verbindung.

use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::{Decoder, Encoder};

use crate::parse;
use crate::sipc::SipMessage;

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Body-Groesse (1 MB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 1024 * 1024;

/// Maximale Groesse des Kopfbereichs (64 KB)
pub const MAX_KOPF_GROESSE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// SipcCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer SIP-C ueber TCP
///
/// Implementiert `Decoder` (Rohtext) und `Encoder<SipMessage>` fuer die
/// Verwendung mit `tokio_util::codec::Framed`.
///
/// # Beispiel
///
/// ```rust,no_run
/// use tokio_util::codec::Framed;
/// use sipline_protocol::wire::SipcCodec;
///
/// // let stream = TcpStream::connect(...).await?;
/// // let framed = Framed::new(stream, SipcCodec::new());
/// ```
#[derive(Debug, Clone)]
pub struct SipcCodec {
    /// Maximale erlaubte Body-Groesse in Bytes
    max_frame_size: usize,
}

impl SipcCodec {
    /// Erstellt einen neuen `SipcCodec` mit Standard-Limits
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
        }
    }

    /// Erstellt einen `SipcCodec` mit benutzerdefinierter maximaler Body-Groesse
    pub fn with_max_size(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    /// Gibt die konfigurierte maximale Body-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl Default for SipcCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn ungueltig(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Position und Laenge des Trenners zwischen Kopf und Body
fn kopf_ende(buf: &[u8]) -> Option<(usize, usize)> {
    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
        return Some((pos, 4));
    }
    buf.windows(2).position(|w| w == b"\n\n").map(|pos| (pos, 2))
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl Decoder for SipcCodec {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Leerzeilen zwischen Nachrichten (Keepalive des Servers) ueberspringen
        let fuehrend = src
            .iter()
            .take_while(|b| **b == b'\r' || **b == b'\n')
            .count();
        src.advance(fuehrend);

        if src.is_empty() {
            return Ok(None);
        }

        let Some((pos, trenner)) = kopf_ende(src) else {
            if src.len() > MAX_KOPF_GROESSE {
                return Err(ungueltig(format!(
                    "Kopfbereich zu gross: {} Bytes (Maximum: {} Bytes)",
                    src.len(),
                    MAX_KOPF_GROESSE
                )));
            }
            return Ok(None);
        };

        if pos > MAX_KOPF_GROESSE {
            return Err(ungueltig(format!(
                "Kopfbereich zu gross: {} Bytes (Maximum: {} Bytes)",
                pos, MAX_KOPF_GROESSE
            )));
        }

        let kopf = std::str::from_utf8(&src[..pos])
            .map_err(|e| ungueltig(format!("Kopfbereich ist kein UTF-8: {}", e)))?;
        let laenge = parse::inhaltslaenge(kopf)
            .map_err(|e| ungueltig(e.to_string()))?
            .unwrap_or(0);

        if laenge > self.max_frame_size {
            return Err(ungueltig(format!(
                "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                laenge, self.max_frame_size
            )));
        }

        // Pruefen ob der vollstaendige Body bereits im Buffer ist
        let gesamt = pos + trenner + laenge;
        if src.len() < gesamt {
            src.reserve(gesamt - src.len());
            return Ok(None);
        }

        // Ungueltiges UTF-8 im Body betrifft nur diese Nachricht; sie wird
        // spaeter beim Parsen verworfen, der Stream bleibt lesbar
        let frame = src.split_to(gesamt);
        let text = match String::from_utf8(frame.to_vec()) {
            Ok(text) => text,
            Err(e) => {
                tracing::debug!(fehler = %e, "Nachricht ist kein UTF-8");
                String::from_utf8_lossy(&frame).into_owned()
            }
        };
        Ok(Some(text))
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl Encoder<SipMessage> for SipcCodec {
    type Error = io::Error;

    fn encode(&mut self, item: SipMessage, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body().len() > self.max_frame_size {
            return Err(ungueltig(format!(
                "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                item.body().len(),
                self.max_frame_size
            )));
        }
        item.encode(dst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
