use tracing::info;
use uuid::Uuid;

use super::models::UploadRequest;
use super::response::{DocumentAttachment, ServerError};
use super::state::AppState;
use crate::document;

/// Runs one accepted upload through extraction, translation and composition.
/// Every path touched is keyed by a fresh request id.
pub(crate) async fn translate_upload(
    state: &AppState,
    upload: UploadRequest,
) -> Result<DocumentAttachment, ServerError> {
    let request_id = Uuid::new_v4();
    info!(
        "request {}: '{}' ({} bytes) -> [{}]",
        request_id,
        upload.file_name,
        upload.bytes.len(),
        upload.languages.join(", ")
    );

    let image_path = state
        .storage
        .store_upload(request_id, &upload.extension, &upload.bytes)
        .await?;
    let text = state
        .extractor
        .extract(&image_path)
        .await
        .map_err(|err| ServerError::extraction(request_id, err))?;

    let outcomes = state
        .translator
        .translate_all(&text, &upload.languages)
        .await;
    let failed = outcomes
        .iter()
        .filter(|item| item.outcome.is_failed())
        .count();

    let document = document::compose(&outcomes);
    let output_path = state.storage.output_path(request_id);
    let bytes = document.write_to(&output_path).await?;
    info!(
        "request {}: wrote {} page(s), {} failed, to {}",
        request_id,
        document.pages().len(),
        failed,
        output_path.display()
    );

    Ok(DocumentAttachment { request_id, bytes })
}
