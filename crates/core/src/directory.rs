//! Verzeichnis-Schnittstelle (Buddies und Gruppen)
//!
//! Die Sitzung ruft das Verzeichnis auf, um Kontakte anzulegen, zu finden
//! und zu veraendern. Speicherung und Darstellung liegen bei der
//! Host-Anwendung. `MemoryDirectory` ist eine einfache Implementierung fuer
//! Tests und den Kommandozeilen-Client.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::{DirectoryError, DirectoryResult};
use crate::types::{BuddyId, GroupId, PresenceState};

/// Sicht des Verzeichnisses auf einen Kontakt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuddyRecord {
    pub id: BuddyId,
    pub gruppe: Option<GroupId>,
    /// Lokal vergebener Alias (leer = keiner)
    pub alias: Option<String>,
    /// Vom Dienst gemeldeter Spitzname
    pub nickname: Option<String>,
    pub mood: String,
    pub zustand: PresenceState,
}

impl BuddyRecord {
    pub fn neu(id: BuddyId) -> Self {
        Self {
            id,
            gruppe: None,
            alias: None,
            nickname: None,
            mood: String::new(),
            zustand: PresenceState::Offline,
        }
    }

    /// Ob ein nicht-leerer lokaler Alias gesetzt ist
    pub fn hat_alias(&self) -> bool {
        self.alias.as_deref().is_some_and(|a| !a.is_empty())
    }
}

/// Kollaborateur fuer Kontakt- und Gruppenverwaltung
pub trait Directory: Send {
    /// Legt eine Gruppe an (existiert sie bereits, wird nur der Name gesetzt)
    fn create_group(&mut self, id: &GroupId, name: &str) -> DirectoryResult<()>;

    /// Legt einen Kontakt an (idempotent)
    fn create_buddy(
        &mut self,
        id: &BuddyId,
        gruppe: Option<&GroupId>,
        alias: Option<&str>,
    ) -> DirectoryResult<()>;

    fn find_buddy(&self, id: &BuddyId) -> Option<BuddyRecord>;

    fn rename_buddy(&mut self, id: &BuddyId, alias: &str) -> DirectoryResult<()>;

    fn remove_buddy(&mut self, id: &BuddyId) -> DirectoryResult<()>;

    fn move_buddy(&mut self, id: &BuddyId, gruppe: &GroupId) -> DirectoryResult<()>;

    fn set_state(&mut self, id: &BuddyId, zustand: PresenceState) -> DirectoryResult<()>;

    fn set_mood(&mut self, id: &BuddyId, mood: &str) -> DirectoryResult<()>;

    fn set_nickname(&mut self, id: &BuddyId, nickname: &str) -> DirectoryResult<()>;
}

// ---------------------------------------------------------------------------
// MemoryDirectory
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct MemoryDirectoryInner {
    buddies: HashMap<BuddyId, BuddyRecord>,
    gruppen: HashMap<GroupId, String>,
}

/// In-Memory-Verzeichnis
///
/// Clone teilt den inneren Zustand, damit der Aufrufer nach der Uebergabe
/// an eine Sitzung weiterhin lesen kann.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    inner: Arc<Mutex<MemoryDirectoryInner>>,
}

impl MemoryDirectory {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Name einer Gruppe
    pub fn gruppe(&self, id: &GroupId) -> Option<String> {
        self.inner.lock().gruppen.get(id).cloned()
    }

    pub fn anzahl_buddies(&self) -> usize {
        self.inner.lock().buddies.len()
    }

    pub fn anzahl_gruppen(&self) -> usize {
        self.inner.lock().gruppen.len()
    }

    fn mit_buddy<F>(&self, id: &BuddyId, f: F) -> DirectoryResult<()>
    where
        F: FnOnce(&mut BuddyRecord),
    {
        let mut inner = self.inner.lock();
        let eintrag = inner
            .buddies
            .get_mut(id)
            .ok_or_else(|| DirectoryError::BuddyNichtGefunden(id.0.clone()))?;
        f(eintrag);
        Ok(())
    }
}

impl Directory for MemoryDirectory {
    fn create_group(&mut self, id: &GroupId, name: &str) -> DirectoryResult<()> {
        self.inner.lock().gruppen.insert(id.clone(), name.to_string());
        Ok(())
    }

    fn create_buddy(
        &mut self,
        id: &BuddyId,
        gruppe: Option<&GroupId>,
        alias: Option<&str>,
    ) -> DirectoryResult<()> {
        let mut inner = self.inner.lock();
        if let Some(g) = gruppe {
            if !inner.gruppen.contains_key(g) {
                return Err(DirectoryError::GruppeNichtGefunden(g.0.clone()));
            }
        }
        let eintrag = inner
            .buddies
            .entry(id.clone())
            .or_insert_with(|| BuddyRecord::neu(id.clone()));
        eintrag.gruppe = gruppe.cloned();
        eintrag.alias = alias.filter(|a| !a.is_empty()).map(str::to_string);
        Ok(())
    }

    fn find_buddy(&self, id: &BuddyId) -> Option<BuddyRecord> {
        self.inner.lock().buddies.get(id).cloned()
    }

    fn rename_buddy(&mut self, id: &BuddyId, alias: &str) -> DirectoryResult<()> {
        self.mit_buddy(id, |b| {
            b.alias = if alias.is_empty() {
                None
            } else {
                Some(alias.to_string())
            };
        })
    }

    fn remove_buddy(&mut self, id: &BuddyId) -> DirectoryResult<()> {
        self.inner
            .lock()
            .buddies
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::BuddyNichtGefunden(id.0.clone()))
    }

    fn move_buddy(&mut self, id: &BuddyId, gruppe: &GroupId) -> DirectoryResult<()> {
        if !self.inner.lock().gruppen.contains_key(gruppe) {
            return Err(DirectoryError::GruppeNichtGefunden(gruppe.0.clone()));
        }
        self.mit_buddy(id, |b| b.gruppe = Some(gruppe.clone()))
    }

    fn set_state(&mut self, id: &BuddyId, zustand: PresenceState) -> DirectoryResult<()> {
        self.mit_buddy(id, |b| b.zustand = zustand)
    }

    fn set_mood(&mut self, id: &BuddyId, mood: &str) -> DirectoryResult<()> {
        self.mit_buddy(id, |b| b.mood = mood.to_string())
    }

    fn set_nickname(&mut self, id: &BuddyId, nickname: &str) -> DirectoryResult<()> {
        self.mit_buddy(id, |b| b.nickname = Some(nickname.to_string()))
    }
}
