//! In-memory session store.
//!
//! [`InMemorySession`] implements the kernel [`Session`] contract for a
//! single client session; [`SessionManager`] hands out sessions keyed by
//! a cookie value, creating them (with a fresh CSRF token) on first
//! sight.

use dashmap::DashMap;
use parking_lot::Mutex;
use rampart_kernel::collab::Session;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Mutex-guarded per-session state: flash data, remembered URL, CSRF token.
#[derive(Default)]
pub struct InMemorySession {
    flashes: Mutex<HashMap<String, Value>>,
    previous_url: Mutex<Option<String>>,
    token: Mutex<Option<String>>,
}

impl InMemorySession {
    /// Empty session with no token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Session pre-seeded with a CSRF token.
    pub fn with_token(token: impl Into<String>) -> Self {
        let session = Self::new();
        *session.token.lock() = Some(token.into());
        session
    }

    /// Remember the URL to redirect back to when no `Referer` is present.
    pub fn remember_url(&self, url: impl Into<String>) {
        *self.previous_url.lock() = Some(url.into());
    }

    /// Read a flashed value (inspection / next-request rendering).
    pub fn flashed(&self, key: &str) -> Option<Value> {
        self.flashes.lock().get(key).cloned()
    }

    /// Drain all flashed values, leaving the store empty.
    pub fn take_flashes(&self) -> HashMap<String, Value> {
        std::mem::take(&mut *self.flashes.lock())
    }
}

impl Session for InMemorySession {
    fn flash(&self, key: &str, value: Value) {
        self.flashes.lock().insert(key.to_string(), value);
    }

    fn previous_url(&self) -> Option<String> {
        self.previous_url.lock().clone()
    }

    fn token(&self) -> Option<String> {
        self.token.lock().clone()
    }
}

/// Cookie-keyed session registry shared by the HTTP server.
#[derive(Default)]
pub struct SessionManager {
    sessions: DashMap<String, Arc<InMemorySession>>,
}

impl SessionManager {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// The session for `cookie`, created with a fresh CSRF token on first
    /// sight.
    pub fn get_or_create(&self, cookie: &str) -> Arc<InMemorySession> {
        self.sessions
            .entry(cookie.to_string())
            .or_insert_with(|| Arc::new(InMemorySession::with_token(Uuid::new_v4().to_string())))
            .clone()
    }

    /// Mint a new session id.
    pub fn new_session_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    /// Number of live sessions (used by tests and the health endpoint).
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no sessions are live.
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn flash_and_read_back() {
        let session = InMemorySession::new();
        session.flash("error", json!("nope"));
        assert_eq!(session.flashed("error"), Some(json!("nope")));
        assert_eq!(session.flashed("missing"), None);
    }

    #[test]
    fn take_flashes_drains_the_store() {
        let session = InMemorySession::new();
        session.flash("a", json!(1));
        let drained = session.take_flashes();
        assert_eq!(drained.len(), 1);
        assert!(session.flashed("a").is_none());
    }

    #[test]
    fn token_round_trip() {
        let session = InMemorySession::with_token("abc");
        assert_eq!(session.token(), Some("abc".to_string()));
        assert_eq!(InMemorySession::new().token(), None);
    }

    #[test]
    fn manager_reuses_sessions_per_cookie() {
        let manager = SessionManager::new();
        let first = manager.get_or_create("cookie-1");
        let again = manager.get_or_create("cookie-1");
        let other = manager.get_or_create("cookie-2");

        assert!(Arc::ptr_eq(&first, &again));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(manager.len(), 2);
        // Every new session gets a token for CSRF verification.
        assert!(first.token().is_some());
    }
}
