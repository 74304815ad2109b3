//! Protokoll-Registry
//!
//! Die Host-Anwendung waehlt eine Protokoll-Implementierung per Name und
//! bekommt ein `ProtocolAccount`-Objekt mit dem vollstaendigen
//! Operationssatz. Die Registry ist zwischen Tasks teilbar (`Clone`).

use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;

use sipline_core::types::{BuddyId, CallId, GroupId, PresenceState};
use sipline_observability::SessionMetrics;

use crate::account::{Abbau, AccountState, HostServices, SessionAccount};
use crate::config::{Credentials, SessionConfig};
use crate::error::{SessionError, SessionResult};
use crate::info::InfoRueckruf;
use crate::transport::Transport;

/// Name des SIP-C Protokolls in der Registry
pub const SIPC_NAME: &str = "fetion";

/// Operationssatz eines geoeffneten Kontos
///
/// `Ok` bedeutet: Anfrage gesendet oder eingereiht. Das Ergebnis des
/// Dienstes kommt als `SessionEvent` bzw. ueber den Info-Rueckruf.
pub trait ProtocolAccount: Send {
    fn handle_inbound(&mut self, raw: &str);
    fn tick(&mut self, jetzt: Instant);

    fn send_chat(&mut self, ziel: &BuddyId, text: &str) -> SessionResult<()>;
    fn change_state(&mut self, zustand: PresenceState) -> SessionResult<()>;
    fn keep_alive(&mut self) -> SessionResult<()>;
    fn move_buddy(&mut self, buddy: &BuddyId, gruppe: &GroupId) -> SessionResult<()>;
    fn remove_buddy(&mut self, buddy: &BuddyId) -> SessionResult<()>;
    fn rename_buddy(&mut self, buddy: &BuddyId, name: &str) -> SessionResult<()>;
    fn get_info(&mut self, buddy: &BuddyId, fertig: InfoRueckruf) -> SessionResult<()>;
    fn cancel(&mut self, call_id: CallId) -> bool;
    fn close(&mut self) -> Option<Abbau>;

    fn zustand(&self) -> AccountState;
    fn ist_beendet(&self) -> bool;
}

impl ProtocolAccount for SessionAccount {
    fn handle_inbound(&mut self, raw: &str) {
        SessionAccount::handle_inbound(self, raw)
    }

    fn tick(&mut self, jetzt: Instant) {
        SessionAccount::tick(self, jetzt)
    }

    fn send_chat(&mut self, ziel: &BuddyId, text: &str) -> SessionResult<()> {
        SessionAccount::send_chat(self, ziel, text).map(drop)
    }

    fn change_state(&mut self, zustand: PresenceState) -> SessionResult<()> {
        SessionAccount::change_state(self, zustand).map(drop)
    }

    fn keep_alive(&mut self) -> SessionResult<()> {
        SessionAccount::keep_alive(self).map(drop)
    }

    fn move_buddy(&mut self, buddy: &BuddyId, gruppe: &GroupId) -> SessionResult<()> {
        SessionAccount::move_buddy(self, buddy, gruppe).map(drop)
    }

    fn remove_buddy(&mut self, buddy: &BuddyId) -> SessionResult<()> {
        SessionAccount::remove_buddy(self, buddy).map(drop)
    }

    fn rename_buddy(&mut self, buddy: &BuddyId, name: &str) -> SessionResult<()> {
        SessionAccount::rename_buddy(self, buddy, name).map(drop)
    }

    fn get_info(&mut self, buddy: &BuddyId, fertig: InfoRueckruf) -> SessionResult<()> {
        SessionAccount::get_info(self, buddy, fertig).map(drop)
    }

    fn cancel(&mut self, call_id: CallId) -> bool {
        SessionAccount::cancel(self, call_id)
    }

    fn close(&mut self) -> Option<Abbau> {
        SessionAccount::close(self)
    }

    fn zustand(&self) -> AccountState {
        SessionAccount::zustand(self).clone()
    }

    fn ist_beendet(&self) -> bool {
        SessionAccount::ist_beendet(self)
    }
}

/// Eine Protokoll-Implementierung
pub trait Protocol: Send + Sync {
    fn name(&self) -> &str;

    fn open(
        &self,
        konto: Credentials,
        transport: Box<dyn Transport>,
        host: HostServices,
        config: Arc<SessionConfig>,
    ) -> SessionResult<Box<dyn ProtocolAccount>>;
}

/// SIP-C/4.0 (Fetion)
#[derive(Debug, Clone)]
pub struct SipcProtocol {
    metrics: SessionMetrics,
}

impl SipcProtocol {
    pub fn neu(metrics: SessionMetrics) -> Self {
        Self { metrics }
    }
}

impl Protocol for SipcProtocol {
    fn name(&self) -> &str {
        SIPC_NAME
    }

    fn open(
        &self,
        konto: Credentials,
        transport: Box<dyn Transport>,
        host: HostServices,
        config: Arc<SessionConfig>,
    ) -> SessionResult<Box<dyn ProtocolAccount>> {
        let konto = SessionAccount::open(konto, transport, host, config, self.metrics.clone())?;
        Ok(Box::new(konto))
    }
}

// ---------------------------------------------------------------------------
// ProtocolRegistry
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct ProtocolRegistry {
    inner: Arc<DashMap<String, Arc<dyn Protocol>>>,
}

impl ProtocolRegistry {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Registry mit allen eingebauten Protokollen
    pub fn mit_standard(metrics: SessionMetrics) -> Self {
        let registry = Self::neu();
        registry.registrieren(Arc::new(SipcProtocol::neu(metrics)));
        registry
    }

    /// Registriert ein Protokoll; ein gleichnamiges wird ersetzt
    pub fn registrieren(&self, protokoll: Arc<dyn Protocol>) {
        let name = protokoll.name().to_string();
        if self.inner.insert(name.clone(), protokoll).is_some() {
            tracing::debug!(protokoll = %name, "Protokoll ersetzt");
        }
    }

    pub fn protokoll(&self, name: &str) -> Option<Arc<dyn Protocol>> {
        self.inner.get(name).map(|p| Arc::clone(p.value()))
    }

    /// Namen aller registrierten Protokolle, sortiert
    pub fn namen(&self) -> Vec<String> {
        let mut namen: Vec<String> = self.inner.iter().map(|e| e.key().clone()).collect();
        namen.sort();
        namen
    }

    /// Oeffnet ein Konto mit dem Protokoll `name`
    pub fn open(
        &self,
        name: &str,
        konto: Credentials,
        transport: Box<dyn Transport>,
        host: HostServices,
        config: Arc<SessionConfig>,
    ) -> SessionResult<Box<dyn ProtocolAccount>> {
        let protokoll = self
            .protokoll(name)
            .ok_or_else(|| SessionError::UnbekanntesProtokoll(name.to_string()))?;
        protokoll.open(konto, transport, host, config)
    }
}

impl std::fmt::Debug for ProtocolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtocolRegistry")
            .field("namen", &self.namen())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testhilfe::{credentials, AufzeichnenderNotifier, AufzeichnenderTransport};
    use sipline_core::MemoryDirectory;
    use tokio::sync::mpsc;

    fn host() -> HostServices {
        let (tx, _rx) = mpsc::unbounded_channel();
        HostServices::neu(
            Box::new(MemoryDirectory::neu()),
            Box::new(AufzeichnenderNotifier::default()),
            tx,
        )
    }

    #[test]
    fn standard_enthaelt_sipc() {
        let registry = ProtocolRegistry::mit_standard(SessionMetrics::neu().unwrap());
        assert_eq!(registry.namen(), vec![SIPC_NAME.to_string()]);
        assert!(registry.protokoll("fetion").is_some());
    }

    #[test]
    fn oeffnen_per_name() {
        let registry = ProtocolRegistry::mit_standard(SessionMetrics::neu().unwrap());
        let (transport, gesendet) = AufzeichnenderTransport::neu();

        let konto = registry
            .open(
                SIPC_NAME,
                credentials(),
                Box::new(transport),
                host(),
                Arc::new(SessionConfig::default()),
            )
            .unwrap();
        assert_eq!(konto.zustand(), AccountState::Anmeldung);
        assert_eq!(gesendet.lock().len(), 1);
    }

    #[test]
    fn unbekanntes_protokoll() {
        let registry = ProtocolRegistry::neu();
        let (transport, _) = AufzeichnenderTransport::neu();
        let ergebnis = registry.open(
            "msn",
            credentials(),
            Box::new(transport),
            host(),
            Arc::new(SessionConfig::default()),
        );
        assert!(matches!(ergebnis, Err(SessionError::UnbekanntesProtokoll(n)) if n == "msn"));
    }

    #[test]
    fn geschlossener_transport_beim_oeffnen() {
        let registry = ProtocolRegistry::mit_standard(SessionMetrics::neu().unwrap());
        let (mut transport, _) = AufzeichnenderTransport::neu();
        transport.close();
        let ergebnis = registry.open(
            SIPC_NAME,
            credentials(),
            Box::new(transport),
            host(),
            Arc::new(SessionConfig::default()),
        );
        assert!(matches!(ergebnis, Err(SessionError::SendFehler)));
    }
}
