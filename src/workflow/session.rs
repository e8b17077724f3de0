//! Per-session storage of in-progress intake forms.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use super::IntakeForm;

/// Errors raised by a [`SessionStore`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("session store lock poisoned")]
    Poisoned,
}

/// Key-value storage of workflow state, keyed by session id.
///
/// A session is driven by at most one request at a time; the store only
/// has to keep distinct sessions apart.
pub trait SessionStore: Send + Sync {
    /// The saved form for `session`, if any.
    fn load(&self, session: &str) -> Result<Option<IntakeForm>, SessionError>;

    /// Replaces the saved form for `session`.
    fn save(&self, session: &str, form: IntakeForm) -> Result<(), SessionError>;

    /// Discards the saved form for `session`.
    fn remove(&self, session: &str) -> Result<(), SessionError>;
}

/// Generates a fresh opaque session id.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Process-local [`SessionStore`].
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    forms: Mutex<HashMap<String, IntakeForm>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, IntakeForm>>, SessionError> {
        self.forms.lock().map_err(|_| SessionError::Poisoned)
    }

    /// Number of sessions with saved state.
    pub fn len(&self) -> usize {
        self.lock().map(|forms| forms.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self, session: &str) -> Result<Option<IntakeForm>, SessionError> {
        Ok(self.lock()?.get(session).cloned())
    }

    fn save(&self, session: &str, form: IntakeForm) -> Result<(), SessionError> {
        self.lock()?.insert(session.to_string(), form);
        Ok(())
    }

    fn remove(&self, session: &str) -> Result<(), SessionError> {
        self.lock()?.remove(session);
        Ok(())
    }
}
