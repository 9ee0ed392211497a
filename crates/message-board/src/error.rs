use message_tree::ServiceError;
use thiserror::Error;

use crate::compose::ContentError;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Invalid message: {0}")]
    Content(#[from] ContentError),

    #[error(transparent)]
    Service(#[from] ServiceError),
}

impl ClientError {
    /// Text suitable for showing to the person using the board
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Service(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

/// Map a transport failure onto the service error taxonomy
pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ServiceError {
    if err.is_decode() {
        ServiceError::InvalidResponse(err.to_string())
    } else if let Some(status) = err.status() {
        map_status(status, err.to_string())
    } else {
        // connect failures, timeouts and broken bodies
        ServiceError::Connectivity(err.to_string())
    }
}

/// Map a non-success HTTP status onto the service error taxonomy
pub(crate) fn map_status(status: reqwest::StatusCode, body: String) -> ServiceError {
    let detail = if body.trim().is_empty() {
        status.to_string()
    } else {
        format!("{} - {}", status, body.trim())
    };

    if status == reqwest::StatusCode::NOT_FOUND {
        ServiceError::NotFound(detail)
    } else if status.is_client_error() {
        ServiceError::Rejected(detail)
    } else {
        ServiceError::Connectivity(detail)
    }
}

pub type ClientResult<T> = Result<T, ClientError>;
