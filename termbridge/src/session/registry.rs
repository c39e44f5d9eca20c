//! Process-wide session registry.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;
use once_cell::sync::Lazy;
use tokio::sync::mpsc;

use super::output::OutputLog;
use super::{Control, SessionEntry, SessionId, SessionMode};
use crate::error::{Result, SessionError};
use crate::transport::TransportKind;

static GLOBAL: Lazy<Arc<SessionRegistry>> = Lazy::new(|| Arc::new(SessionRegistry::new()));

/// Map from session id to session entry.
///
/// The map lock only guards membership. Per-session state lives in the
/// session task and in the entry's [`OutputLog`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, Arc<SessionEntry>>>,
}

impl SessionRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> Arc<SessionRegistry> {
        Arc::clone(&GLOBAL)
    }

    /// Register a new session with a fresh id and an empty log.
    pub fn create(
        &self,
        kind: TransportKind,
        mode: SessionMode,
        control: mpsc::UnboundedSender<Control>,
    ) -> Arc<SessionEntry> {
        let entry = Arc::new(SessionEntry {
            id: SessionId::new(),
            kind,
            mode,
            output: Arc::new(OutputLog::new()),
            control,
        });

        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(entry.id, Arc::clone(&entry));
        debug!("session {} registered ({}, {:?})", entry.id, kind, mode);
        entry
    }

    /// Get a session by ID.
    pub fn get(&self, id: &SessionId) -> Result<Arc<SessionEntry>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound { id: id.to_string() }.into())
    }

    /// Remove a session and seal its log.
    ///
    /// Returns `None` if the session was already gone.
    pub fn destroy(&self, id: &SessionId) -> Option<Arc<SessionEntry>> {
        let entry = self
            .sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(id)?;
        entry.output.seal();
        debug!("session {} removed", id);
        Some(entry)
    }

    /// Number of registered sessions.
    pub fn len(&self) -> usize {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if no sessions are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// IDs of all registered sessions.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .copied()
            .collect()
    }
}
