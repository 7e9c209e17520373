use crate::transcribe::TranscribeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Session cookie missing, expired, or failed verification
    #[error("Not authenticated")]
    Unauthenticated,

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Requested artifact not found
    #[error("{resource} '{name}' not found")]
    NotFound { resource: String, name: String },

    /// A hosted generation API returned a failure or could not be reached
    #[error("{service} API request failed{}", status.map(|s| format!(" with status {s}")).unwrap_or_default())]
    Upstream {
        service: &'static str,
        status: Option<u16>,
        detail: String,
    },

    /// Speech-to-text failure
    #[error(transparent)]
    Transcription(#[from] TranscribeError),

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Filesystem error while handling artifacts
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Upstream { .. } => StatusCode::BAD_GATEWAY,
            Error::Transcription(_) | Error::Internal { .. } | Error::Io(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated => "Authentication required".to_string(),
            Error::BadRequest { message } => message.clone(),
            Error::NotFound { resource, name } => format!("{resource} '{name}' not found"),
            Error::Upstream { service, .. } => format!("The {service} service is currently unavailable"),
            Error::Transcription(_) => "Failed to transcribe the uploaded recording".to_string(),
            Error::Internal { .. } | Error::Io(_) | Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Transcription(_) | Error::Internal { .. } | Error::Io(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Upstream { service, status, detail } => {
                tracing::error!(service, ?status, detail = %detail, "Upstream API error");
            }
            Error::Unauthenticated => {
                tracing::info!("Authentication error: {}", self);
            }
            Error::BadRequest { .. } | Error::NotFound { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
