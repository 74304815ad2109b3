//! sipline – Einstiegspunkt
//!
//! Laedt die Konfiguration, initialisiert das Logging und startet den Client.

use anyhow::Result;
use sipline_client::{config::ClientConfig, Client};
use sipline_observability::logging_initialisieren;

#[tokio::main]
async fn main() -> Result<()> {
    let config_pfad = ClientConfig::pfad_aus_env();

    // Konfiguration laden (Standardwerte falls Datei fehlt)
    let config = ClientConfig::laden(&config_pfad)?;

    logging_initialisieren(&config.logging.level, &config.logging.format);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_pfad,
        adresse = %config.adresse(),
        "sipline wird gestartet"
    );

    Client::neu(config).starten().await?;

    Ok(())
}
