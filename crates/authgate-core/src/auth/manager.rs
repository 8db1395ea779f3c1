//! The session coordinator.
//!
//! `SessionManager` owns the one `SessionState` of a client, commits every
//! mutation under a lock, and writes the persisted subset to the durable
//! store right after the commit. Share it through `Arc`; there is no global
//! instance.
//!
//! Store I/O runs under the lock and blocks the calling task. File and
//! keychain writes are small enough for that; move them behind
//! `tokio::task::spawn_blocking` if a slower backend is added.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::persist::{PersistedSession, SESSION_SLOT, TOKEN_SLOT};
use super::session::{ActionTicket, AuthPayload, SessionState, User};
use crate::store::DurableStore;

pub struct SessionManager {
    store: Arc<dyn DurableStore>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Start anonymous without reading the store
    pub fn new(store: Arc<dyn DurableStore>) -> Self {
        Self {
            store,
            state: Mutex::new(SessionState::new()),
        }
    }

    /// Start from whatever the store holds. Absent or unreadable blobs
    /// yield an anonymous session.
    pub fn rehydrate(store: Arc<dyn DurableStore>) -> Self {
        let state = match store.read(SESSION_SLOT) {
            Ok(Some(raw)) => match PersistedSession::decode(&raw) {
                Ok(blob) => {
                    debug!(version = blob.version, "Session blob loaded");
                    blob.restore()
                }
                Err(e) => {
                    warn!(error = %e, "Ignoring unreadable session blob");
                    SessionState::new()
                }
            },
            Ok(None) => {
                debug!("No persisted session");
                SessionState::new()
            }
            Err(e) => {
                warn!(error = %e, "Failed to read session blob");
                SessionState::new()
            }
        };
        debug!(authenticated = state.is_authenticated(), "Session rehydrated");

        Self {
            store,
            state: Mutex::new(state),
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> SessionState {
        self.state.lock().clone()
    }

    pub fn token(&self) -> Option<String> {
        self.state.lock().token().map(str::to_string)
    }

    pub fn user(&self) -> Option<User> {
        self.state.lock().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.lock().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().is_loading()
    }

    pub fn generation(&self) -> u64 {
        self.state.lock().generation()
    }

    pub fn check_auth(&self) -> bool {
        self.state.lock().check_auth()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.state.lock().has_role(role)
    }

    /// Commit a successful login unconditionally.
    pub fn login(&self, payload: &AuthPayload) -> User {
        let mut state = self.state.lock();
        let user = state.login(payload);
        self.write_token(state.token());
        self.write_blob(&state);
        info!(email = %user.email, role = %user.role, "Session established");
        user
    }

    /// Commit a login only if `ticket` is still the newest action.
    pub fn commit_login(&self, ticket: ActionTicket, payload: &AuthPayload) -> Option<User> {
        let mut state = self.state.lock();
        if !state.is_current(ticket) {
            debug!(
                ticket = ticket.generation(),
                current = state.generation(),
                "Discarding stale login completion"
            );
            return None;
        }
        let user = state.login(payload);
        self.write_token(state.token());
        self.write_blob(&state);
        info!(email = %user.email, role = %user.role, "Session established");
        Some(user)
    }

    pub fn logout(&self) {
        let mut state = self.state.lock();
        state.logout();
        self.write_token(None);
        self.write_blob(&state);
        info!("Session cleared");
    }

    /// Drop the session after the server rejected the credentials.
    /// Both slots are removed outright. In-flight actions stay valid.
    pub fn clear_rejected(&self) {
        let mut state = self.state.lock();
        state.clear_credentials();
        for slot in [TOKEN_SLOT, SESSION_SLOT] {
            if let Err(e) = self.store.remove(slot) {
                warn!(slot, error = %e, "Failed to remove session slot");
            }
        }
        info!("Session rejected by server, credentials cleared");
    }

    pub fn set_token(&self, token: Option<&str>) {
        let mut state = self.state.lock();
        state.set_token(token);
        self.write_token(state.token());
        self.write_blob(&state);
    }

    pub fn set_user(&self, user: Option<User>) {
        let mut state = self.state.lock();
        state.set_user(user);
        self.write_blob(&state);
    }

    /// Loading is transient, nothing is persisted
    pub fn set_loading(&self, is_loading: bool) {
        self.state.lock().set_loading(is_loading);
    }

    /// Start an auth action: marks the session loading and supersedes any
    /// action already in flight.
    pub fn begin_action(&self) -> ActionTicket {
        self.state.lock().begin_action()
    }

    /// Settle a failed action. Only the newest action may clear the loading
    /// flag; returns whether it did.
    pub fn abandon(&self, ticket: ActionTicket) -> bool {
        let mut state = self.state.lock();
        if state.is_current(ticket) {
            state.set_loading(false);
            true
        } else {
            false
        }
    }

    fn write_token(&self, token: Option<&str>) {
        let result = match token {
            Some(token) => self.store.write(TOKEN_SLOT, token),
            None => self.store.remove(TOKEN_SLOT),
        };
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist token");
        }
    }

    fn write_blob(&self, state: &SessionState) {
        let result = PersistedSession::capture(state)
            .encode()
            .map_err(|e| e.to_string())
            .and_then(|raw| {
                self.store
                    .write(SESSION_SLOT, &raw)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            warn!(error = %e, "Failed to persist session");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::Role;
    use crate::store::{MemoryStore, StoreError};

    fn payload() -> AuthPayload {
        AuthPayload {
            token: "Bearer xyz".into(),
            email: "a@b.com".into(),
            full_name: Some("Jane Doe".into()),
            role: Role::Admin,
        }
    }

    fn manager() -> (Arc<MemoryStore>, SessionManager) {
        let store = Arc::new(MemoryStore::new());
        let manager = SessionManager::new(store.clone());
        (store, manager)
    }

    fn stored_blob(store: &MemoryStore) -> PersistedSession {
        let raw = store.read(SESSION_SLOT).unwrap().expect("blob written");
        PersistedSession::decode(&raw).unwrap()
    }

    #[test]
    fn test_login_persists_both_slots() {
        let (store, manager) = manager();
        manager.login(&payload());

        assert_eq!(store.read(TOKEN_SLOT).unwrap().as_deref(), Some("xyz"));
        let blob = stored_blob(&store);
        assert_eq!(blob.token.as_deref(), Some("xyz"));
        assert!(blob.is_authenticated);
        assert_eq!(blob.user.unwrap().role, Role::Admin);
    }

    #[test]
    fn test_logout_clears_persisted_token() {
        let (store, manager) = manager();
        manager.login(&payload());
        manager.logout();

        assert!(!manager.check_auth());
        assert_eq!(store.read(TOKEN_SLOT).unwrap(), None);
        let blob = stored_blob(&store);
        assert_eq!(blob.token, None);
        assert_eq!(blob.user, None);
        assert!(!blob.is_authenticated);

        manager.logout();
        assert!(!manager.check_auth());
        assert_eq!(stored_blob(&store).token, None);
    }

    #[test]
    fn test_rehydrate_restores_session() {
        let (store, manager) = manager();
        manager.login(&payload());
        drop(manager);

        let restored = SessionManager::rehydrate(store);
        assert!(restored.is_authenticated());
        assert_eq!(restored.token().as_deref(), Some("xyz"));
        assert!(restored.has_role("ADMIN"));
        assert!(!restored.is_loading());
    }

    #[test]
    fn test_rehydrate_corrupt_blob_is_anonymous() {
        let store = Arc::new(MemoryStore::new());
        store.write(SESSION_SLOT, "{not json").unwrap();
        let manager = SessionManager::rehydrate(store);
        assert!(!manager.is_authenticated());
        assert_eq!(manager.token(), None);
    }

    #[test]
    fn test_rehydrate_empty_store_is_anonymous() {
        let manager = SessionManager::rehydrate(Arc::new(MemoryStore::new()));
        assert_eq!(manager.snapshot(), SessionState::new());
    }

    #[test]
    fn test_set_token_strips_and_persists() {
        let (store, manager) = manager();
        manager.set_token(Some("Bearer abc"));
        assert_eq!(manager.token().as_deref(), Some("abc"));
        assert_eq!(store.read(TOKEN_SLOT).unwrap().as_deref(), Some("abc"));
        // Token alone does not authenticate
        assert!(!manager.is_authenticated());

        manager.set_token(None);
        assert_eq!(manager.token(), None);
        assert_eq!(store.read(TOKEN_SLOT).unwrap(), None);
    }

    #[test]
    fn test_set_user_completes_authentication() {
        let (store, manager) = manager();
        manager.set_token(Some("abc"));
        manager.set_user(Some(payload().to_user()));
        assert!(manager.is_authenticated());
        assert!(stored_blob(&store).is_authenticated);
    }

    #[test]
    fn test_stale_commit_is_discarded() {
        let (store, manager) = manager();
        let ticket = manager.begin_action();
        assert!(manager.is_loading());

        manager.logout();
        assert_eq!(manager.commit_login(ticket, &payload()), None);
        assert!(!manager.is_authenticated());
        assert_eq!(store.read(TOKEN_SLOT).unwrap(), None);
    }

    #[test]
    fn test_abandon_only_clears_current_loading() {
        let (_store, manager) = manager();
        let first = manager.begin_action();
        let second = manager.begin_action();

        assert!(!manager.abandon(first));
        assert!(manager.is_loading());
        assert!(manager.abandon(second));
        assert!(!manager.is_loading());
    }

    #[test]
    fn test_clear_rejected_removes_slots() {
        let (store, manager) = manager();
        manager.login(&payload());
        manager.clear_rejected();

        assert!(!manager.check_auth());
        assert_eq!(store.read(TOKEN_SLOT).unwrap(), None);
        assert_eq!(store.read(SESSION_SLOT).unwrap(), None);
    }

    struct BrokenStore;

    impl DurableStore for BrokenStore {
        fn read(&self, _slot: &str) -> Result<Option<String>, StoreError> {
            Err(StoreError::Encoding)
        }
        fn write(&self, _slot: &str, _value: &str) -> Result<(), StoreError> {
            Err(StoreError::Encoding)
        }
        fn remove(&self, _slot: &str) -> Result<(), StoreError> {
            Err(StoreError::Encoding)
        }
    }

    #[test]
    fn test_store_failures_do_not_block_mutations() {
        let manager = SessionManager::rehydrate(Arc::new(BrokenStore));
        manager.login(&payload());
        assert!(manager.is_authenticated());
        manager.logout();
        assert!(!manager.is_authenticated());
    }
}
