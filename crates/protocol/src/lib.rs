//! sipline-protocol – SIP-C/4.0 Protokoll
//!
//! Dieses Crate definiert das Nachrichtenmodell, den Parser, das Framing
//! fuer TCP und die Auswertung der XML-Bodies. Es kennt keinen
//! Sitzungszustand.

pub mod body;
pub mod error;
pub mod parse;
pub mod request;
pub mod sipc;
pub mod wire;

pub use error::ParseError;
pub use request::RequestKopf;
pub use sipc::{header, Method, SipMessage, StartLine};
pub use wire::SipcCodec;
