//! Screen controllers. Each fetches on mount, reads entities through the
//! shared [`EntityStore`] and stops applying responses once disposed.

pub mod comments;
pub mod explore;
mod feed;
pub mod home;
pub mod profile;
pub mod settings;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub use comments::{CommentAffordances, CommentThread};
pub use explore::ExploreView;
pub use feed::PostFeed;
pub use home::HomeView;
pub use profile::ProfileView;
pub use settings::{Feedback, ProfileForm, SettingsView};

use crate::api::models::UserId;
use crate::api::SocialApi;
use crate::interaction::InteractionController;
use crate::session::{Session, SessionStore};
use crate::store::EntityStore;

/// Everything a view needs, passed in rather than looked up.
#[derive(Clone)]
pub struct ViewContext {
    api: Arc<dyn SocialApi>,
    store: EntityStore,
    sessions: Arc<SessionStore>,
    interactions: InteractionController,
    debounce: Duration,
}

impl ViewContext {
    pub fn new(
        api: Arc<dyn SocialApi>,
        store: EntityStore,
        sessions: Arc<SessionStore>,
        debounce: Duration,
    ) -> Self {
        let interactions = InteractionController::new(api.clone(), store.clone());
        Self {
            api,
            store,
            sessions,
            interactions,
            debounce,
        }
    }

    pub fn api(&self) -> &Arc<dyn SocialApi> {
        &self.api
    }

    pub fn store(&self) -> &EntityStore {
        &self.store
    }

    pub fn sessions(&self) -> &Arc<SessionStore> {
        &self.sessions
    }

    pub fn session(&self) -> &Session {
        self.sessions.session()
    }

    pub fn interactions(&self) -> &InteractionController {
        &self.interactions
    }

    pub fn debounce(&self) -> Duration {
        self.debounce
    }

    pub fn viewer_id(&self) -> Option<UserId> {
        self.session().viewer_id()
    }
}

/// Set once when the view goes away.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle(Arc<AtomicBool>);

impl Lifecycle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dispose(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_disposed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn error(&self) -> Option<&str> {
        match self {
            LoadState::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}
