use serde_json::Value;

use crate::api::models::RegisterRequest;
use crate::error::{ClientError, ClientResult};

pub const PASSWORD_MISMATCH: &str = "Passwords do not match";
pub const REGISTRATION_FAILED: &str = "Registration failed";

/// Sign-up form as the user typed it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistrationForm {
    pub username: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

impl RegistrationForm {
    pub fn new(
        username: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        confirm_password: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            email: email.into(),
            password: password.into(),
            confirm_password: confirm_password.into(),
        }
    }

    /// Client-side checks; a failure here means no request is sent.
    pub fn validate(&self) -> ClientResult<()> {
        if self.password != self.confirm_password {
            return Err(ClientError::Validation(PASSWORD_MISMATCH.to_string()));
        }
        Ok(())
    }

    pub(crate) fn to_request(&self) -> RegisterRequest<'_> {
        RegisterRequest {
            username: &self.username,
            email: &self.email,
            password: &self.password,
            password2: &self.confirm_password,
        }
    }
}

/// Render a field -> messages map as `"<field>: <first message>"`, looking
/// only at the first field. `None` when the payload has another shape.
pub fn project_field_errors(body: &Value) -> Option<String> {
    let (field, messages) = body.as_object()?.iter().next()?;
    let first = messages.as_array()?.first()?;
    let message = match first {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };
    Some(format!("{}: {}", field, message))
}

/// Registration error shown to the user for a rejected sign-up body.
pub fn registration_error(body: Option<&Value>) -> String {
    body.and_then(project_field_errors)
        .unwrap_or_else(|| REGISTRATION_FAILED.to_string())
}
