pub mod credentials;
pub mod registration;
mod state;
mod store;

pub use credentials::{CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use registration::RegistrationForm;
pub use state::Session;
pub use store::SessionStore;
