//! # sipline-observability
//!
//! Observability-Crate fuer sipline:
//! - Structured Logging (Text oder JSON) via tracing-subscriber
//! - Prometheus-kompatible Sitzungsmetriken
//!
//! Ein HTTP-Endpunkt fuer die Metriken gehoert nicht hierher; der Client
//! gibt den Export bei Bedarf selbst aus.

pub mod logging;
pub mod metrics;

pub use logging::logging_initialisieren;
pub use metrics::{SessionMetrics, VerwerfGrund};
