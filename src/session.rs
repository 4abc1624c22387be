//! Per-session interaction state
//!
//! Each browser session gets its own [`SessionState`], owned by the
//! [`SessionRegistry`] and handed to the controller by reference. A session
//! ends when the user ends it or after it has been idle for the TTL.

use crate::processing::StoreHandle;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn parse(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Result of one successful upload-and-process cycle
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedDocument {
    pub file_name: String,
    pub extracted_text: String,
    pub summary: String,
    pub handle: StoreHandle,
}

/// Flags and document of one session. Both flags only ever go false -> true.
#[derive(Debug, Default)]
pub struct SessionState {
    feedback_disabled: bool,
    pdf_present: bool,
    document: Option<ProcessedDocument>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pdf_present(&self) -> bool {
        self.pdf_present
    }

    pub fn feedback_disabled(&self) -> bool {
        self.feedback_disabled
    }

    pub fn document(&self) -> Option<&ProcessedDocument> {
        self.document.as_ref()
    }

    pub fn current_summary(&self) -> Option<&str> {
        self.document.as_ref().map(|d| d.summary.as_str())
    }

    pub fn current_store_handle(&self) -> Option<StoreHandle> {
        self.document.as_ref().map(|d| d.handle)
    }

    /// Summary and handle are always set together
    pub(crate) fn set_document(&mut self, document: ProcessedDocument) {
        self.document = Some(document);
        self.pdf_present = true;
    }

    pub(crate) fn disable_feedback(&mut self) {
        self.feedback_disabled = true;
    }
}

struct SessionEntry {
    state: Arc<tokio::sync::Mutex<SessionState>>,
    last_seen: Instant,
}

/// All live sessions of the server
pub struct SessionRegistry {
    sessions: Mutex<HashMap<SessionId, SessionEntry>>,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// State for an existing session id, or a brand new session.
    /// Returns `true` as the third element when the session was just created.
    pub fn open(&self, id: Option<SessionId>) -> (SessionId, Arc<tokio::sync::Mutex<SessionState>>, bool) {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let now = Instant::now();

        if let Some(id) = id {
            if let Some(entry) = sessions.get_mut(&id) {
                if now.duration_since(entry.last_seen) < self.ttl {
                    entry.last_seen = now;
                    return (id, entry.state.clone(), false);
                }
                sessions.remove(&id);
                debug!("Session {} expired, starting a new one", id);
            }
        }

        let id = SessionId::new();
        let state = Arc::new(tokio::sync::Mutex::new(SessionState::new()));
        sessions.insert(id, SessionEntry { state: state.clone(), last_seen: now });
        info!("Started session {} ({} live)", id, sessions.len());
        (id, state, true)
    }

    /// Discard a session; returns whether it existed
    pub fn end(&self, id: SessionId) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let existed = sessions.remove(&id).is_some();
        if existed {
            info!("Ended session {} ({} live)", id, sessions.len());
        }
        existed
    }

    /// Drop sessions idle for longer than the TTL; returns how many were dropped
    pub fn sweep_expired(&self) -> usize {
        let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        let before = sessions.len();
        let ttl = self.ttl;
        sessions.retain(|_, entry| entry.last_seen.elapsed() < ttl);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
