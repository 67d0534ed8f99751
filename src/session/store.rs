use crate::api::models::{ProfileUpdate, User};
use crate::api::ApiGateway;
use crate::error::{ClientError, ClientResult};
use crate::store::{EntityStore, FetchTicket};

use super::credentials::Credentials;
use super::registration::RegistrationForm;
use super::state::Session;

/// Owns the session lifecycle: login, registration, restore and logout.
///
/// Every other component only reads the [`Session`] handle; this is the one
/// place that creates or replaces it. Each session user it fetches is also
/// merged into the entity store, so screens reading the viewer by id see it.
#[derive(Clone)]
pub struct SessionStore {
    api: ApiGateway,
    entities: EntityStore,
}

impl SessionStore {
    pub fn new(api: ApiGateway, entities: EntityStore) -> Self {
        Self { api, entities }
    }

    pub fn api(&self) -> &ApiGateway {
        &self.api
    }

    pub fn session(&self) -> &Session {
        self.api.session()
    }

    pub fn current_user(&self) -> Option<User> {
        self.session().current_user()
    }

    pub fn is_authenticated(&self) -> bool {
        self.session().is_authenticated()
    }

    /// Re-validate a credential persisted by an earlier run by fetching the
    /// profile once. Any failure logs the session out.
    pub async fn restore(&self) -> Option<User> {
        if !self.is_authenticated() {
            return None;
        }

        let ticket = self.entities.begin_fetch();
        match self.api.fetch_own_profile().await {
            Ok(user) => {
                tracing::info!("Restored session for {}", user.username);
                Some(self.install_user(ticket, user))
            }
            Err(e) => {
                tracing::warn!("Stored session is no longer valid: {}", e);
                self.logout();
                None
            }
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> ClientResult<User> {
        let tokens = self.api.login(username, password).await?;
        self.adopt(Credentials::new(tokens.access, Some(tokens.refresh)))
            .await
    }

    /// Validates the form locally before anything is sent.
    pub async fn register(&self, form: &RegistrationForm) -> ClientResult<User> {
        form.validate()?;
        let tokens = self.api.register(form).await?;
        self.adopt(Credentials::new(tokens.access, Some(tokens.refresh)))
            .await
    }

    pub fn logout(&self) {
        if let Some(user) = self.current_user() {
            tracing::info!("Logging out {}", user.username);
        }
        self.session().clear();
    }

    /// Submit a profile edit; the returned user replaces the session user.
    pub async fn update_profile(&self, update: ProfileUpdate) -> ClientResult<User> {
        if !self.is_authenticated() {
            return Err(ClientError::NotAuthenticated);
        }

        let ticket = self.entities.begin_fetch();
        let user = self.api.update_own_profile(update).await?;
        tracing::info!("Updated profile for {}", user.username);
        Ok(self.install_user(ticket, user))
    }

    fn install_user(&self, ticket: FetchTicket, user: User) -> User {
        let user = self.entities.ingest_user(ticket, user);
        self.session().set_user(user.clone());
        user
    }

    async fn adopt(&self, credentials: Credentials) -> ClientResult<User> {
        self.session().establish(credentials)?;

        let ticket = self.entities.begin_fetch();
        match self.api.fetch_own_profile().await {
            Ok(user) => {
                tracing::info!("Logged in as {} ({})", user.username, user.id);
                Ok(self.install_user(ticket, user))
            }
            Err(e) => {
                tracing::error!("Could not load profile after sign-in: {}", e);
                self.logout();
                Err(match e {
                    ClientError::Auth(msg) => ClientError::Auth(msg),
                    other => ClientError::Auth(other.user_message()),
                })
            }
        }
    }
}
