//! Integration-Tests fuer den Verbindungs-Task ueber einen In-Memory-Stream

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::io::DuplexStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use common::{abmeldung, credentials, KONTAKTLISTE, TestNotifier};
use sipline_core::{BuddyId, MemoryDirectory, SessionEvent};
use sipline_observability::SessionMetrics;
use sipline_protocol::{Method, SipMessage, SipcCodec};
use sipline_session::{
    starten, AccountHandle, HostServices, ProtocolRegistry, SessionConfig, SessionError, SIPC_NAME,
};

type Dienst = Framed<DuplexStream, SipcCodec>;

struct Verbindung {
    handle: AccountHandle,
    task: tokio::task::JoinHandle<()>,
    dienst: Dienst,
    ereignisse: mpsc::UnboundedReceiver<SessionEvent>,
}

async fn empfangen(dienst: &mut Dienst) -> SipMessage {
    let raw = tokio::time::timeout(Duration::from_secs(5), dienst.next())
        .await
        .expect("keine Nachricht vom Client")
        .expect("Stream beendet")
        .expect("Frame-Fehler");
    SipMessage::parse(&raw).expect("Nachricht nicht lesbar")
}

async fn ereignis(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("kein Ereignis")
        .expect("Ereignis-Kanal geschlossen")
}

fn antwort_auf(anfrage: &SipMessage, status: u16, grund: &str, body: &str) -> SipMessage {
    let mut antwort = SipMessage::response(status, grund)
        .with_header("I", anfrage.header("I").unwrap_or("0"))
        .with_header("Q", anfrage.header("Q").unwrap_or("1 R"));
    if !body.is_empty() {
        antwort = antwort.with_body(body);
    }
    antwort
}

/// Startet ein Konto und meldet es ueber den simulierten Dienst an
async fn verbunden() -> Verbindung {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let mut dienst = Framed::new(server, SipcCodec::new());

    let config = SessionConfig {
        keepalive_sek: 0,
        ..SessionConfig::default()
    };
    let registry = ProtocolRegistry::mit_standard(SessionMetrics::neu().unwrap());
    let (tx, mut ereignisse) = mpsc::unbounded_channel();
    let host = HostServices::neu(
        Box::new(MemoryDirectory::neu()),
        Box::new(TestNotifier::default()),
        tx,
    );

    let (handle, task) = starten(
        client,
        &registry,
        SIPC_NAME,
        credentials(),
        host,
        Arc::new(config),
    )
    .unwrap();

    let registrierung = empfangen(&mut dienst).await;
    assert_eq!(registrierung.method(), Some(&Method::Register));
    dienst
        .send(antwort_auf(&registrierung, 200, "OK", KONTAKTLISTE))
        .await
        .unwrap();

    assert_eq!(
        ereignis(&mut ereignisse).await,
        SessionEvent::Angemeldet {
            buddies: 3,
            gruppen: 2
        }
    );

    Verbindung {
        handle,
        task,
        dienst,
        ereignisse,
    }
}

#[tokio::test]
async fn anmelden_und_keepalive() {
    let mut v = verbunden().await;

    v.handle.keep_alive().await.unwrap();
    let anfrage = empfangen(&mut v.dienst).await;
    assert_eq!(anfrage.method(), Some(&Method::Register));
    assert_eq!(anfrage.event(), Some("KeepAlive"));
    assert_eq!(anfrage.header("I"), Some("2"));
}

#[tokio::test]
async fn info_wartet_auf_antwort() {
    let mut v = verbunden().await;

    let handle = v.handle.clone();
    let abfrage = tokio::spawn(async move { handle.get_info(BuddyId::new("501")).await });

    let anfrage = empfangen(&mut v.dienst).await;
    let body = r#"<results><contact user-id="501" sid="7001" nickname="Tom" gender="2" carrier-region=""/></results>"#;
    v.dienst
        .send(antwort_auf(&anfrage, 200, "OK", body))
        .await
        .unwrap();

    let info = abfrage.await.unwrap().unwrap();
    assert_eq!(info.nickname, "Tom");
    assert_eq!(info.land, "Unknown");
}

#[tokio::test]
async fn unbekannter_kontakt_direkt_abgelehnt() {
    let v = verbunden().await;
    let ergebnis = v.handle.send_chat(BuddyId::new("999"), "hallo").await;
    assert!(matches!(ergebnis, Err(SessionError::NichtGefunden(_))));
}

#[tokio::test]
async fn abmeldung_beendet_den_task() {
    let mut v = verbunden().await;

    let raw = abmeldung();
    v.dienst
        .send(SipMessage::parse(&raw).unwrap())
        .await
        .unwrap();

    assert!(matches!(ereignis(&mut v.ereignisse).await, SessionEvent::Fatal { .. }));
    tokio::time::timeout(Duration::from_secs(5), v.task)
        .await
        .expect("Task nicht beendet")
        .unwrap();

    assert!(v.handle.ist_beendet());
    assert!(matches!(
        v.handle.keep_alive().await,
        Err(SessionError::Geschlossen)
    ));
}

#[tokio::test]
async fn schliessen_ueber_handle() {
    let mut v = verbunden().await;

    let abbau = v.handle.close().await.unwrap();
    assert_eq!(abbau.buddies, 3);
    assert_eq!(abbau.gruppen, 2);

    tokio::time::timeout(Duration::from_secs(5), v.task)
        .await
        .expect("Task nicht beendet")
        .unwrap();
    assert!(v.handle.close().await.is_none());

    // Verbindung zum Dienst wurde getrennt
    let rest = tokio::time::timeout(Duration::from_secs(5), v.dienst.next())
        .await
        .expect("Verbindung nicht getrennt");
    assert!(rest.is_none());
}

#[tokio::test]
async fn dienst_trennt_verbindung() {
    let v = verbunden().await;
    drop(v.dienst);

    tokio::time::timeout(Duration::from_secs(5), v.task)
        .await
        .expect("Task nicht beendet")
        .unwrap();
    assert!(v.handle.ist_beendet());
}
