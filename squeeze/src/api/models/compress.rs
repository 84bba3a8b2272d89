use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::codec::Quality;

pub const WELCOME_MESSAGE: &str = "Welcome to Squeeze API";

/// Parsed multipart upload, alive for a single request
#[derive(Debug)]
pub struct UploadRequest {
    pub image: bytes::Bytes,
    pub quality: Quality,
}

impl UploadRequest {
    /// Size of the uploaded `image` part in bytes
    pub fn original_size(&self) -> u64 {
        self.image.len() as u64
    }
}

/// Envelope returned by every JSON endpoint.
///
/// Fields that do not apply to a response are omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompressResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// Bytes received in the `image` field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_size: Option<u64>,
    /// Bytes written to the stored JPEG
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compressed_size: Option<u64>,
    /// Percentage saved; negative when the JPEG is larger than the upload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub savings: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_url: Option<String>,
    /// Detected source format (`jpeg`, `png`, `gif`, `webp`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
}

impl CompressResponse {
    pub fn welcome() -> Self {
        Self::message(true, WELCOME_MESSAGE)
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self::message(false, message)
    }

    fn message(success: bool, message: impl Into<String>) -> Self {
        Self {
            success,
            message: Some(message.into()),
            original_size: None,
            compressed_size: None,
            savings: None,
            download_url: None,
            format: None,
        }
    }
}

/// Percentage saved going from `original` to `compressed` bytes.
///
/// Callers must reject empty uploads first; a zero `original` yields a non-finite value.
pub fn savings_percent(original: u64, compressed: u64) -> f64 {
    100.0 - (compressed as f64 / original as f64 * 100.0)
}
