use thiserror::Error;

/// Failure reported by a message service
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("Connection error: {0}")]
    Connectivity(String),

    #[error("Request rejected: {0}")]
    Rejected(String),

    #[error("Message not found: {0}")]
    NotFound(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Failure categories the tree controller recovers from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The service could not be reached or did not answer usefully
    Connectivity,
    /// The service answered and declined the request
    Rejection,
    /// The target message no longer exists
    NotFound,
}

impl ServiceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServiceError::Connectivity(_) | ServiceError::InvalidResponse(_) => {
                ErrorKind::Connectivity
            }
            ServiceError::Rejected(_) => ErrorKind::Rejection,
            ServiceError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    /// Text suitable for showing to the person using the board
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Connectivity(_) => "Cannot connect to the message service. \
                 Please check that the server is running and reachable."
                .to_string(),
            ServiceError::InvalidResponse(_) => {
                "The message service sent a response that could not be understood.".to_string()
            }
            ServiceError::Rejected(reason) => {
                format!("The message service declined the request: {}", reason)
            }
            ServiceError::NotFound(_) => "That message no longer exists.".to_string(),
        }
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;
