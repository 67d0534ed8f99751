use std::sync::{Arc, Mutex, MutexGuard};

use super::credentials::{CredentialStore, Credentials, MemoryCredentialStore};
use crate::api::models::{User, UserId};
use crate::error::ClientResult;

#[derive(Debug, Default)]
struct SessionState {
    credentials: Option<Credentials>,
    user: Option<User>,
}

/// Shared handle on the current credential and authenticated user.
///
/// Cloning is cheap; every clone observes the same session. Only the session
/// reads and writes the persisted credentials.
#[derive(Clone)]
pub struct Session {
    state: Arc<Mutex<SessionState>>,
    store: Arc<dyn CredentialStore>,
}

impl Session {
    /// Build a session over `store`, picking up any credential persisted by
    /// a previous run. An unreadable store is treated as logged out.
    pub fn new(store: Arc<dyn CredentialStore>) -> Self {
        let credentials = match store.load() {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!("Ignoring unreadable credentials: {}", e);
                None
            }
        };

        Self {
            state: Arc::new(Mutex::new(SessionState {
                credentials,
                user: None,
            })),
            store,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryCredentialStore::new()))
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn access_token(&self) -> Option<String> {
        self.state().credentials.as_ref().map(|c| c.access.clone())
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.state()
            .credentials
            .as_ref()
            .and_then(|c| c.refresh.clone())
    }

    pub fn credentials(&self) -> Option<Credentials> {
        self.state().credentials.clone()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state().user.clone()
    }

    pub fn viewer_id(&self) -> Option<UserId> {
        self.state().user.as_ref().map(|u| u.id)
    }

    /// True iff an access credential is held. Validity is only learned on
    /// the next server round trip.
    pub fn is_authenticated(&self) -> bool {
        self.state().credentials.is_some()
    }

    /// Persist and adopt a freshly issued credential pair. The previous user
    /// is dropped until the profile is fetched again.
    pub(crate) fn establish(&self, credentials: Credentials) -> ClientResult<()> {
        self.store.save(&credentials)?;
        let mut state = self.state();
        state.credentials = Some(credentials);
        state.user = None;
        Ok(())
    }

    pub(crate) fn set_user(&self, user: User) {
        self.state().user = Some(user);
    }

    /// Tear the session down: memory and persisted credentials.
    pub fn clear(&self) {
        {
            let mut state = self.state();
            state.credentials = None;
            state.user = None;
        }
        if let Err(e) = self.store.clear() {
            tracing::error!("Failed to remove stored credentials: {}", e);
        }
    }

    /// Called when a request carrying `token` came back unauthenticated.
    /// A credential replaced in the meantime is left alone.
    pub(crate) fn invalidate(&self, token: &str) {
        let stale = self
            .state()
            .credentials
            .as_ref()
            .map(|c| c.access == token)
            .unwrap_or(false);

        if stale {
            tracing::info!("Session rejected by server, logging out");
            self.clear();
        }
    }
}
