//! sipline-client – Bibliotheks-Root
//!
//! Verbindet ein Konto mit dem Dienst und steuert es ueber Befehle von
//! stdin. Ereignisse der Sitzung werden auf stdout ausgegeben (Text oder,
//! bei JSON-Logging, eine JSON-Zeile pro Ereignis).

pub mod befehl;
pub mod config;

use std::sync::Arc;

use anyhow::Result;
use chrono::Local;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

use sipline_core::{MemoryDirectory, Notifier, SessionEvent};
use sipline_observability::SessionMetrics;
use sipline_session::{verbinden, AccountHandle, HostServices, ProtocolRegistry, SIPC_NAME};

use befehl::{Befehl, HILFE};
use config::ClientConfig;

/// Gibt Hinweise und Kontofehler auf der Konsole aus
#[derive(Debug, Clone, Copy, Default)]
pub struct KonsolenNotifier;

impl Notifier for KonsolenNotifier {
    fn notify(&self, titel: &str, text: &str) {
        tracing::info!(titel = %titel, "Hinweis");
        println!("[{titel}] {text}");
    }

    fn account_error(&self, grund: &str) {
        tracing::error!(grund = %grund, "Kontofehler");
        eprintln!("Konto beendet: {grund}");
    }
}

/// Einzeilige Anzeige eines Ereignisses
pub fn ereignis_text(ereignis: &SessionEvent) -> String {
    match ereignis {
        SessionEvent::Angemeldet { buddies, gruppen } => {
            format!("Angemeldet: {buddies} Kontakte in {gruppen} Gruppen")
        }
        SessionEvent::ZustandGeaendert { zustand } => format!("Eigener Zustand: {zustand}"),
        SessionEvent::Fatal { grund } => format!("Fehler: {grund}"),
        SessionEvent::ChatEmpfangen {
            von,
            text,
            empfangen,
        } => format!(
            "{} <{}> {text}",
            empfangen.with_timezone(&Local).format("%H:%M:%S"),
            von
        ),
        SessionEvent::SystemNachricht { text, url } => match url {
            Some(url) => format!("System: {text} ({url})"),
            None => format!("System: {text}"),
        },
        SessionEvent::OperationErfolgreich { operation, ziel } => match ziel {
            Some(ziel) => format!("{operation} fuer {ziel}: ok"),
            None => format!("{operation}: ok"),
        },
        SessionEvent::OperationFehlgeschlagen {
            operation,
            ziel,
            grund,
        } => match ziel {
            Some(ziel) => format!("{operation} fuer {ziel} fehlgeschlagen: {grund}"),
            None => format!("{operation} fehlgeschlagen: {grund}"),
        },
    }
}

async fn ereignisse_anzeigen(mut rx: mpsc::UnboundedReceiver<SessionEvent>, json: bool) {
    while let Some(ereignis) = rx.recv().await {
        if json {
            match serde_json::to_string(&ereignis) {
                Ok(zeile) => println!("{zeile}"),
                Err(e) => tracing::warn!(fehler = %e, "Ereignis nicht serialisierbar"),
            }
        } else {
            println!("{}", ereignis_text(&ereignis));
        }
    }
}

/// Fuehrt einen Befehl aus; `false` beendet die Eingabeschleife
async fn befehl_ausfuehren(handle: &AccountHandle, metrics: &SessionMetrics, befehl: Befehl) -> bool {
    let ergebnis = match befehl {
        Befehl::Nachricht { ziel, text } => handle.send_chat(ziel, text).await,
        Befehl::Zustand(zustand) => handle.change_state(zustand).await,
        Befehl::KeepAlive => handle.keep_alive().await,
        Befehl::Verschieben { buddy, gruppe } => handle.move_buddy(buddy, gruppe).await,
        Befehl::Entfernen(buddy) => handle.remove_buddy(buddy).await,
        Befehl::Umbenennen { buddy, name } => handle.rename_buddy(buddy, name).await,
        Befehl::Info(buddy) => handle.get_info(buddy).await.map(|info| {
            println!("{info}");
        }),
        Befehl::Metriken => {
            match metrics.exportieren() {
                Ok(text) => print!("{text}"),
                Err(e) => eprintln!("Metriken nicht verfuegbar: {e}"),
            }
            Ok(())
        }
        Befehl::Hilfe => {
            println!("{HILFE}");
            Ok(())
        }
        Befehl::Beenden => return false,
    };
    if let Err(e) = ergebnis {
        eprintln!("{e}");
    }
    true
}

/// Haelt den laufenden Client zusammen
pub struct Client {
    pub config: ClientConfig,
}

impl Client {
    pub fn neu(config: ClientConfig) -> Self {
        Self { config }
    }

    /// Verbindet, meldet an und verarbeitet Befehle bis `/quit`, Ctrl-C
    /// oder bis die Sitzung endet
    pub async fn starten(self) -> Result<()> {
        self.config.pruefen()?;

        let metrics = SessionMetrics::neu()?;
        let registry = ProtocolRegistry::mit_standard(metrics.clone());
        let (tx, rx) = mpsc::unbounded_channel();
        let host = HostServices::neu(
            Box::new(MemoryDirectory::neu()),
            Box::new(KonsolenNotifier),
            tx,
        );

        let adresse = self.config.adresse();
        let (handle, mut task) = verbinden(
            &adresse,
            &registry,
            SIPC_NAME,
            self.config.credentials(),
            host,
            Arc::new(self.config.sitzung_config()),
        )
        .await?;

        let json = self.config.logging.format == "json";
        let anzeige = tokio::spawn(ereignisse_anzeigen(rx, json));

        let mut zeilen = BufReader::new(tokio::io::stdin()).lines();
        let mut sitzung_beendet = false;

        loop {
            tokio::select! {
                zeile = zeilen.next_line() => match zeile? {
                    Some(zeile) => match Befehl::parse(&zeile) {
                        Some(Ok(befehl)) => {
                            if !befehl_ausfuehren(&handle, &metrics, befehl).await {
                                break;
                            }
                        }
                        Some(Err(e)) => eprintln!("{e}"),
                        None => {}
                    },
                    None => break,
                },
                _ = &mut task, if !sitzung_beendet => {
                    sitzung_beendet = true;
                    tracing::info!("Sitzung vom Dienst beendet");
                    break;
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Ctrl-C empfangen, Client wird beendet");
                    break;
                }
            }
        }

        if let Some(abbau) = handle.close().await {
            tracing::info!(?abbau, "Konto geschlossen");
        }
        if !sitzung_beendet {
            if let Err(e) = task.await {
                tracing::warn!(fehler = %e, "Sitzungs-Task abgebrochen");
            }
        }
        drop(handle);
        if let Err(e) = anzeige.await {
            tracing::debug!(fehler = %e, "Anzeige-Task abgebrochen");
        }
        Ok(())
    }
}
