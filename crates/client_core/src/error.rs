use shared::error::{ErrorCode, ValidationErrors};
use thiserror::Error;

/// Why a call to the back-office REST API did not produce a usable response.
#[derive(Debug, Clone, Error)]
pub enum ApiFailure {
    /// No response was received (connect failure, timeout, reset).
    #[error("network failure: {0}")]
    Network(String),
    /// The server answered with a non-success status.
    #[error("server responded {status}: {message}")]
    Status {
        status: u16,
        code: ErrorCode,
        message: String,
    },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("invalid api base url: {0}")]
    InvalidUrl(String),
    #[error(transparent)]
    Validation(#[from] ValidationErrors),
}

impl ApiFailure {
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiFailure::Status {
            status,
            code: ErrorCode::from_status(status),
            message: message.into(),
        }
    }

    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ApiFailure::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.code() == Some(ErrorCode::NotFound)
    }

    pub fn is_unauthenticated(&self) -> bool {
        matches!(
            self.code(),
            Some(ErrorCode::Unauthorized) | Some(ErrorCode::Forbidden)
        )
    }
}

impl From<reqwest::Error> for ApiFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ApiFailure::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ApiFailure::status(status.as_u16(), err.to_string())
        } else {
            ApiFailure::Network(err.to_string())
        }
    }
}

/// Intents the list controller refuses before any request is made.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("page size {0} is not one of 5, 10, 15, 20")]
    InvalidPageSize(u32),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    #[error("no authenticated session")]
    Unauthenticated,
}
