//! Structured Logging Setup via tracing-subscriber
//!
//! Konfigurierbar per Umgebungsvariable:
//! - `SIPLINE_LOG_LEVEL`: Filter-Ausdruck (z.B. `debug` oder
//!   `info,sipline_session=trace`), Standard: konfigurierter Level
//! - `SIPLINE_LOG_FORMAT`: Format (text/json), Standard: konfiguriertes Format
//!
//! Sitzungen loggen mit den Feldern `call_id`, `buddy`, `kanal` und `fehler`.

use tracing_subscriber::{fmt, EnvFilter};

/// Umgebungsvariable fuer den Log-Filter
pub const ENV_LOG_LEVEL: &str = "SIPLINE_LOG_LEVEL";

/// Umgebungsvariable fuer das Log-Format
pub const ENV_LOG_FORMAT: &str = "SIPLINE_LOG_FORMAT";

/// Ausgabeformat der Logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    /// Unbekannte Werte ergeben `Text`
    pub fn aus_str(format: &str) -> Self {
        if format.trim().eq_ignore_ascii_case("json") {
            Self::Json
        } else {
            Self::Text
        }
    }
}

/// Filter aus der Umgebung, sonst aus `level`, sonst `info`
fn filter_erstellen(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(ENV_LOG_LEVEL)
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Format aus der Umgebung, sonst `format`
fn format_waehlen(format: &str) -> LogFormat {
    match std::env::var(ENV_LOG_FORMAT) {
        Ok(aus_env) => LogFormat::aus_str(&aus_env),
        Err(_) => LogFormat::aus_str(format),
    }
}

/// Initialisiert das Logging-System.
///
/// Darf nur einmal pro Prozess aufgerufen werden.
pub fn logging_initialisieren(level: &str, format: &str) {
    let filter = filter_erstellen(level);
    let format = format_waehlen(format);

    match format {
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_current_span(true)
                .init();
        }
        LogFormat::Text => {
            fmt().with_env_filter(filter).with_target(false).init();
        }
    }
    tracing::debug!(?format, "Logging initialisiert");
}

/// Validiert ob ein Log-Level-String gueltig ist.
pub fn log_level_gueltig(level: &str) -> bool {
    matches!(level, "trace" | "debug" | "info" | "warn" | "error")
}

/// Validiert ob ein Log-Format-String gueltig ist.
pub fn log_format_gueltig(format: &str) -> bool {
    matches!(format, "text" | "json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_level_werte() {
        for level in ["trace", "debug", "info", "warn", "error"] {
            assert!(log_level_gueltig(level), "{level} sollte gueltig sein");
        }
        assert!(!log_level_gueltig("verbose"));
        assert!(!log_level_gueltig("INFO"));
        assert!(!log_level_gueltig(""));
    }

    #[test]
    fn format_aus_text() {
        assert_eq!(LogFormat::aus_str("json"), LogFormat::Json);
        assert_eq!(LogFormat::aus_str(" JSON "), LogFormat::Json);
        assert_eq!(LogFormat::aus_str("text"), LogFormat::Text);
        assert_eq!(LogFormat::aus_str("xml"), LogFormat::Text);
        assert!(!log_format_gueltig("xml"));
    }

    #[test]
    fn format_aus_umgebung_hat_vorrang() {
        std::env::set_var(ENV_LOG_FORMAT, "json");
        assert_eq!(format_waehlen("text"), LogFormat::Json);
        std::env::remove_var(ENV_LOG_FORMAT);
        assert_eq!(format_waehlen("text"), LogFormat::Text);
    }
}
