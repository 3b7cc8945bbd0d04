use axum::Json;
use axum::body::Body;
use axum::http::{HeaderValue, Response, StatusCode, header};
use axum::response::IntoResponse;
use tracing::{error, warn};
use uuid::Uuid;

use super::models::ErrorResponse;
use crate::data;
use crate::ocr::ExtractionError;

pub(crate) const INVALID_FILE_OR_LANGUAGE: &str = "Invalid file or language";
pub(crate) const UNSUPPORTED_FILE_TYPE: &str =
    "Unsupported file type. Please upload an image file.";
pub(crate) const FILE_TOO_LARGE: &str = "Uploaded file is too large.";
pub(crate) const UNREADABLE_IMAGE: &str = "Could not extract text from the uploaded image.";
pub(crate) const INTERNAL_ERROR: &str = "Internal server error";

pub const OUTPUT_FILENAME: &str = "translated_output.docx";
pub const REQUEST_ID_HEADER: &str = "x-request-id";

#[derive(Debug)]
pub(crate) struct ServerError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
}

impl ServerError {
    pub(crate) fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub(crate) fn payload_too_large() -> Self {
        Self {
            status: StatusCode::PAYLOAD_TOO_LARGE,
            message: FILE_TOO_LARGE.to_string(),
        }
    }

    pub(crate) fn unprocessable(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            message: message.into(),
        }
    }

    /// The cause is logged; the client only sees a generic message.
    pub(crate) fn internal(cause: impl std::fmt::Display) -> Self {
        error!("request failed: {}", cause);
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: INTERNAL_ERROR.to_string(),
        }
    }

    pub(crate) fn extraction(request_id: Uuid, err: ExtractionError) -> Self {
        if err.is_unreadable_image() {
            warn!("request {}: {}", request_id, err);
            return Self::unprocessable(UNREADABLE_IMAGE);
        }
        Self::internal(format_args!("request {}: {}", request_id, err))
    }
}

impl From<anyhow::Error> for ServerError {
    fn from(err: anyhow::Error) -> Self {
        ServerError::internal(format_args!("{:#}", err))
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        (
            self.status,
            Json(ErrorResponse {
                error: self.message,
            }),
        )
            .into_response()
    }
}

/// A composed document returned as a file download.
#[derive(Debug)]
pub(crate) struct DocumentAttachment {
    pub(crate) request_id: Uuid,
    pub(crate) bytes: Vec<u8>,
}

impl IntoResponse for DocumentAttachment {
    fn into_response(self) -> axum::response::Response {
        let mut response = Response::new(Body::from(self.bytes));
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(data::DOCX_MIME),
        );
        headers.insert(
            header::CONTENT_DISPOSITION,
            HeaderValue::from_static("attachment; filename=\"translated_output.docx\""),
        );
        if let Ok(value) = HeaderValue::from_str(&self.request_id.to_string()) {
            headers.insert(REQUEST_ID_HEADER, value);
        }
        response
    }
}
