use axum::body::Bytes;
use serde::Serialize;

/// A validated upload: an accepted image plus the ordered target languages.
#[derive(Debug, Clone)]
pub(crate) struct UploadRequest {
    pub(crate) file_name: String,
    pub(crate) extension: String,
    pub(crate) bytes: Bytes,
    pub(crate) languages: Vec<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct HealthResponse {
    pub(crate) status: &'static str,
}
