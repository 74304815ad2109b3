//! Prometheus-kompatible Metriken fuer sipline-Sitzungen
//!
//! Registrierte Metriken:
//! - `sipline_transactions_opened_total` – Counter: Gesendete Anfragen
//! - `sipline_transactions_completed_total` – Counter: Beantwortete Anfragen (status)
//! - `sipline_transactions_timed_out_total` – Counter: Abgelaufene Transaktionen
//! - `sipline_transaction_duration_seconds` – Histogram: Zeit bis zur Antwort
//! - `sipline_messages_dropped_total` – Counter: Verworfene Nachrichten (grund)
//! - `sipline_presence_updates_total` – Counter: Angewendete Presence-Eintraege
//! - `sipline_channels_active` – Gauge: Offene Chat-Kanaele
//!
//! Mehrere Konten koennen dieselbe Instanz teilen (`Clone` teilt die Registry).

use anyhow::Result;
use prometheus::{
    Encoder, Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use std::sync::Arc;
use std::time::Duration;

/// Grund fuer eine verworfene eingehende Nachricht
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerwerfGrund {
    /// Nachricht nicht lesbar
    Parse,
    /// Klasse oder Ereignis unbekannt
    Unbekannt,
    /// Antwort ohne offene Transaktion
    Unzugeordnet,
    /// Konto ist bereits beendet
    Beendet,
}

impl VerwerfGrund {
    fn label(self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::Unbekannt => "unbekannt",
            Self::Unzugeordnet => "unzugeordnet",
            Self::Beendet => "beendet",
        }
    }
}

/// Alle Sitzungsmetriken
#[derive(Clone)]
pub struct SessionMetrics {
    pub registry: Arc<Registry>,

    pub transactions_opened: IntCounter,
    pub transactions_completed: IntCounterVec,
    pub transactions_timed_out: IntCounter,
    pub transaction_duration_seconds: Histogram,

    pub messages_dropped: IntCounterVec,
    pub presence_updates: IntCounter,
    pub channels_active: IntGauge,
}

impl SessionMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        // --- Transaktionen ---
        let transactions_opened = IntCounter::with_opts(Opts::new(
            "sipline_transactions_opened_total",
            "Gesamtanzahl gesendeter Anfragen",
        ))?;
        registry.register(Box::new(transactions_opened.clone()))?;

        let transactions_completed = IntCounterVec::new(
            Opts::new(
                "sipline_transactions_completed_total",
                "Gesamtanzahl beantworteter Anfragen",
            ),
            &["status"],
        )?;
        registry.register(Box::new(transactions_completed.clone()))?;

        let transactions_timed_out = IntCounter::with_opts(Opts::new(
            "sipline_transactions_timed_out_total",
            "Gesamtanzahl abgelaufener Transaktionen",
        ))?;
        registry.register(Box::new(transactions_timed_out.clone()))?;

        let transaction_duration_seconds = Histogram::with_opts(
            HistogramOpts::new(
                "sipline_transaction_duration_seconds",
                "Zeit zwischen Anfrage und Antwort in Sekunden",
            )
            .buckets(vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]),
        )?;
        registry.register(Box::new(transaction_duration_seconds.clone()))?;

        // --- Eingehende Nachrichten ---
        let messages_dropped = IntCounterVec::new(
            Opts::new(
                "sipline_messages_dropped_total",
                "Gesamtanzahl verworfener eingehender Nachrichten",
            ),
            &["grund"],
        )?;
        registry.register(Box::new(messages_dropped.clone()))?;

        let presence_updates = IntCounter::with_opts(Opts::new(
            "sipline_presence_updates_total",
            "Gesamtanzahl angewendeter Presence-Eintraege",
        ))?;
        registry.register(Box::new(presence_updates.clone()))?;

        // --- Kanaele ---
        let channels_active = IntGauge::with_opts(Opts::new(
            "sipline_channels_active",
            "Anzahl offener Chat-Kanaele",
        ))?;
        registry.register(Box::new(channels_active.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            transactions_opened,
            transactions_completed,
            transactions_timed_out,
            transaction_duration_seconds,
            messages_dropped,
            presence_updates,
            channels_active,
        })
    }

    pub fn transaktion_geoeffnet(&self) {
        self.transactions_opened.inc();
    }

    /// Antwort erhalten; `dauer` ist die Zeit seit dem Senden
    pub fn transaktion_abgeschlossen(&self, status: u16, dauer: Duration) {
        self.transactions_completed
            .with_label_values(&[&status.to_string()])
            .inc();
        self.transaction_duration_seconds
            .observe(dauer.as_secs_f64());
    }

    pub fn transaktionen_abgelaufen(&self, anzahl: usize) {
        self.transactions_timed_out.inc_by(anzahl as u64);
    }

    pub fn nachricht_verworfen(&self, grund: VerwerfGrund) {
        self.messages_dropped.with_label_values(&[grund.label()]).inc();
    }

    pub fn presence_aktualisiert(&self) {
        self.presence_updates.inc();
    }

    pub fn kanal_geoeffnet(&self) {
        self.channels_active.inc();
    }

    pub fn kanaele_geschlossen(&self, anzahl: usize) {
        self.channels_active.sub(anzahl as i64);
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

impl std::fmt::Debug for SessionMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMetrics")
            .field("channels_active", &self.channels_active.get())
            .finish_non_exhaustive()
    }
}
