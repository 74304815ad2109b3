//! Nom-basierter Parser fuer SIP-C Nachrichten
//!
//! Zerlegt Startzeile und Kopfzeilen; der Body wird anhand des `L`-Headers
//! abgeschnitten. Zeilenenden `\r\n` und `\n` werden beide akzeptiert.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_till1, take_while1},
    character::complete::{char, digit1, space0, space1},
    combinator::{all_consuming, map, map_res, opt, rest},
    sequence::{preceded, separated_pair, terminated, tuple},
    IResult,
};

use crate::error::ParseError;
use crate::sipc::{header, Method, SipMessage, StartLine, PROTOKOLL_VERSION};

/// `SIP-C/4.0 200 OK`
fn statuszeile(input: &str) -> IResult<&str, StartLine> {
    map(
        tuple((
            tag(PROTOKOLL_VERSION),
            space1,
            map_res(digit1, |s: &str| s.parse::<u16>()),
            opt(preceded(space1, rest)),
        )),
        |(_, _, status, reason): (&str, &str, u16, Option<&str>)| StartLine::Response {
            status,
            reason: reason.unwrap_or("").trim().to_string(),
        },
    )(input)
}

/// `M fetion.com.cn SIP-C/4.0`
fn anfragezeile(input: &str) -> IResult<&str, StartLine> {
    map(
        tuple((
            take_while1(|c: char| c.is_ascii_alphabetic()),
            space1,
            take_till1(|c: char| c == ' '),
            space1,
            tag(PROTOKOLL_VERSION),
        )),
        |(method, _, target, _, _): (&str, &str, &str, &str, &str)| StartLine::Request {
            method: Method::from_token(method),
            target: target.to_string(),
        },
    )(input)
}

fn startzeile(input: &str) -> IResult<&str, StartLine> {
    all_consuming(terminated(alt((statuszeile, anfragezeile)), space0))(input)
}

/// `Schluessel: Wert`
fn kopfzeile(input: &str) -> IResult<&str, (&str, &str)> {
    separated_pair(
        take_while1(|c: char| c.is_ascii_alphanumeric() || c == '-'),
        tuple((space0, char(':'))),
        preceded(space0, rest),
    )(input)
}

/// Trennt Kopfbereich und Body am ersten Leerzeilen-Trenner
pub(crate) fn kopf_und_body(raw: &str) -> (&str, &str) {
    if let Some(pos) = raw.find("\r\n\r\n") {
        (&raw[..pos], &raw[pos + 4..])
    } else if let Some(pos) = raw.find("\n\n") {
        (&raw[..pos], &raw[pos + 2..])
    } else {
        (raw, "")
    }
}

/// Liest den `L`-Header aus einem Kopfbereich
pub(crate) fn inhaltslaenge(kopf: &str) -> Result<Option<usize>, ParseError> {
    for zeile in kopf.lines().skip(1) {
        if let Ok((_, (key, value))) = kopfzeile(zeile) {
            if key.eq_ignore_ascii_case(header::CONTENT_LENGTH) {
                return value
                    .trim()
                    .parse::<usize>()
                    .map(Some)
                    .map_err(|_| ParseError::Inhaltslaenge(value.trim().to_string()));
            }
        }
    }
    Ok(None)
}

/// Zerlegt eine vollstaendige Nachricht
pub(crate) fn nachricht(raw: &str) -> Result<SipMessage, ParseError> {
    let raw = raw.trim_start_matches(['\r', '\n']);
    if raw.is_empty() {
        return Err(ParseError::Leer);
    }

    let (kopf, rest_body) = kopf_und_body(raw);
    let mut zeilen = kopf.lines();

    let erste = zeilen.next().ok_or(ParseError::Leer)?;
    let (_, start) = startzeile(erste).map_err(|_| ParseError::Startzeile(erste.to_string()))?;

    let mut headers = Vec::new();
    for zeile in zeilen {
        if zeile.trim().is_empty() {
            continue;
        }
        let (_, (key, value)) =
            kopfzeile(zeile).map_err(|_| ParseError::Kopfzeile(zeile.to_string()))?;
        headers.push((key.to_string(), value.trim_end().to_string()));
    }

    let body = match inhaltslaenge(kopf)? {
        Some(laenge) => {
            if rest_body.len() < laenge {
                return Err(ParseError::BodyUnvollstaendig {
                    erwartet: laenge,
                    erhalten: rest_body.len(),
                });
            }
            rest_body
                .get(..laenge)
                .ok_or_else(|| ParseError::Inhaltslaenge(laenge.to_string()))?
        }
        None => rest_body,
    };

    Ok(SipMessage::aus_teilen(start, headers, body.to_string()))
}
