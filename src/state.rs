use std::sync::Arc;

use crate::api::{ApiGateway, SocialApi};
use crate::config::Config;
use crate::error::ClientResult;
use crate::session::{FileCredentialStore, Session, SessionStore};
use crate::store::EntityStore;
use crate::views::ViewContext;

/// Everything wired together for one client process.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<SessionStore>,
    pub api: Arc<ApiGateway>,
    pub store: EntityStore,
}

impl AppState {
    /// Build the client from config with the credential file it names.
    pub fn from_config(config: Config) -> ClientResult<Self> {
        let credentials = FileCredentialStore::new(config.credentials_path());
        let session = Session::new(Arc::new(credentials));
        Self::with_session(config, session)
    }

    pub fn with_session(config: Config, session: Session) -> ClientResult<Self> {
        let api = ApiGateway::from_config(&config, session)?;
        let store = EntityStore::new();
        Ok(Self {
            sessions: Arc::new(SessionStore::new(api.clone(), store.clone())),
            api: Arc::new(api),
            store,
            config,
        })
    }

    pub fn view_context(&self) -> ViewContext {
        let api: Arc<dyn SocialApi> = self.api.clone();
        ViewContext::new(
            api,
            self.store.clone(),
            self.sessions.clone(),
            self.config.debounce(),
        )
    }
}
