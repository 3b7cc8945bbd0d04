use axum::extract::Multipart;
use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use tracing::debug;

use super::models::UploadRequest;
use super::response::{INVALID_FILE_OR_LANGUAGE, ServerError, UNSUPPORTED_FILE_TYPE};
use crate::data;

/// Reads the `file` and `language` fields. Presence is checked before the
/// file name suffix.
pub(crate) async fn read_upload(mut multipart: Multipart) -> Result<UploadRequest, ServerError> {
    let mut file = None;
    let mut raw_languages = Vec::new();

    while let Some(field) = multipart.next_field().await.map_err(field_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let bytes = field.bytes().await.map_err(field_error)?;
                if file.is_none() && !file_name.trim().is_empty() {
                    file = Some((file_name, bytes));
                }
            }
            "language" => raw_languages.push(field.text().await.map_err(field_error)?),
            other => debug!("ignoring multipart field '{}'", other),
        }
    }

    let Some((file_name, bytes)) = file else {
        return Err(ServerError::bad_request(INVALID_FILE_OR_LANGUAGE));
    };
    let languages = data::normalize_languages(&raw_languages);
    if languages.is_empty() {
        return Err(ServerError::bad_request(INVALID_FILE_OR_LANGUAGE));
    }
    let Some(extension) = data::image_extension(&file_name) else {
        debug!("rejecting upload '{}': unsupported suffix", file_name);
        return Err(ServerError::bad_request(UNSUPPORTED_FILE_TYPE));
    };

    Ok(UploadRequest {
        file_name,
        extension,
        bytes,
        languages,
    })
}

fn field_error(err: MultipartError) -> ServerError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ServerError::payload_too_large();
    }
    debug!("malformed multipart body: {}", err.body_text());
    ServerError::bad_request(INVALID_FILE_OR_LANGUAGE)
}
