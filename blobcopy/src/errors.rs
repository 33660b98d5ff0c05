use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// A required request field was absent, null or empty
    #[error("Please pass {field} in the input object")]
    MissingField { field: &'static str },

    /// The request body could not be decoded
    #[error("{message}")]
    BadRequest { message: String },

    /// Credential construction, reference resolution or copy initiation failed
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            // Provider failures are reported to the caller as a client error, whatever their cause
            Error::MissingField { .. } | Error::BadRequest { .. } | Error::Storage(_) => StatusCode::BAD_REQUEST,
            Error::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns the body sent to the caller
    pub fn user_message(&self) -> String {
        match self {
            Error::MissingField { .. } | Error::BadRequest { .. } => self.to_string(),
            Error::Storage(err) => format!("Error: {err}"),
            Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::Storage(err) => {
                tracing::error!("ERROR: Exception with message: {}", err);
            }
            Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::MissingField { .. } | Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
