use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad credentials or an expired session. Always tears the session down.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Field-level rejection, rendered verbatim next to the originating form.
    #[error("{0}")]
    Validation(String),

    #[error("Request failed ({status}): {detail}")]
    Api { status: StatusCode, detail: String },

    /// The operation needs a credential and the session holds none.
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unexpected response: {0}")]
    Unexpected(String),
}

impl ClientError {
    pub fn is_auth(&self) -> bool {
        matches!(self, ClientError::Auth(_) | ClientError::NotAuthenticated)
    }

    /// HTTP status of the failed response, if the failure came from the server.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            ClientError::Auth(_) => Some(StatusCode::UNAUTHORIZED),
            ClientError::Validation(_) => Some(StatusCode::BAD_REQUEST),
            ClientError::Network(e) => e.status(),
            _ => None,
        }
    }

    /// Short message suitable for an inline error banner.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Auth(msg) | ClientError::Validation(msg) => msg.clone(),
            ClientError::Api { detail, .. } => detail.clone(),
            ClientError::NotAuthenticated => "Please log in first".to_string(),
            ClientError::Network(_) => "Could not reach the server".to_string(),
            other => {
                tracing::error!("Unexpected client error: {}", other);
                "Something went wrong".to_string()
            }
        }
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
