use crate::api::models::compress::CompressResponse;
use crate::codec::CodecError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Multipart body could not be parsed, exceeded the upload ceiling, or had no `image` part
    #[error("Failed to upload image: {reason}")]
    UploadFailed { reason: String },

    /// The `image` part was present but contained no bytes
    #[error("Uploaded image is empty")]
    EmptyUpload,

    /// The upload could not be decoded by any registered codec
    #[error("Unsupported image format: {0}")]
    UnsupportedImage(#[source] CodecError),

    /// The output artifact could not be created
    #[error("Failed to create output file: {0}")]
    CreateOutput(#[source] std::io::Error),

    /// JPEG encoding or writing the artifact failed
    #[error("Compression failed: {0}")]
    Compression(#[source] CodecError),

    /// Wrong HTTP verb for the route
    #[error("Method not allowed")]
    MethodNotAllowed,

    /// Rejected configuration
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::UploadFailed { .. } | Error::EmptyUpload | Error::UnsupportedImage(_) => StatusCode::BAD_REQUEST,
            Error::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Error::CreateOutput(_) | Error::Compression(_) | Error::InvalidConfig { .. } | Error::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details.
    ///
    /// Decoder errors are the exception: their text tells the caller what was wrong with the upload.
    pub fn user_message(&self) -> String {
        match self {
            Error::UploadFailed { .. } => "Failed to upload image".to_string(),
            Error::EmptyUpload => self.to_string(),
            Error::UnsupportedImage(_) => self.to_string(),
            Error::CreateOutput(_) => "Failed to create output file".to_string(),
            Error::Compression(_) => "Compression failed".to_string(),
            Error::MethodNotAllowed => "Method not allowed".to_string(),
            Error::InvalidConfig { .. } | Error::Internal { .. } => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match &self {
            Error::CreateOutput(_) | Error::Compression(_) | Error::InvalidConfig { .. } | Error::Internal { .. } => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::UploadFailed { .. } | Error::EmptyUpload | Error::UnsupportedImage(_) => {
                tracing::debug!("Client error: {}", self);
            }
            Error::MethodNotAllowed => {}
        }

        let status = self.status_code();

        match self {
            // Wrong verbs get a plain text body, everything else the JSON envelope
            Error::MethodNotAllowed => (status, self.user_message()).into_response(),
            _ => (status, Json(CompressResponse::failure(self.user_message()))).into_response(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;
