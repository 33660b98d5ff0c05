//! HTTP handler for starting blob copies.

use axum::{Json, extract::State};
use bytes::Bytes;
use tracing::{debug, info};

use crate::{
    AppState,
    api::models::copy::{CopyRequest, CopyResponse},
    errors::{Error, Result},
};

fn record_outcome(outcome: &'static str) {
    metrics::counter!("blobcopy_copy_requests_total", "outcome" => outcome).increment(1);
}

fn outcome_label(err: &Error) -> &'static str {
    match err {
        Error::MissingField { .. } => "missing_field",
        Error::BadRequest { .. } => "bad_request",
        Error::Storage(_) => "storage_error",
        Error::Internal { .. } => "internal_error",
    }
}

/// Start a server-side copy of `sourceUrl` into `destContainer/destFilename` of the
/// destination account.
///
/// The copy itself runs on the storage service after this returns; the response only
/// carries the status the service reported when it accepted the copy. Nothing is
/// deduplicated: sending the same request twice starts two copies.
#[utoipa::path(
    post,
    path = "/api/CopyBlobBetweenStorage",
    tag = "copy",
    summary = "Copy blob between storage accounts",
    description = "Start a server-side copy from a source URL into a blob of the destination storage account",
    request_body = CopyRequest,
    responses(
        (status = 200, description = "Copy accepted by the storage service", body = CopyResponse),
        (status = 400, description = "A required field is missing, or the storage service rejected the copy", body = String, content_type = "text/plain"),
        (status = 413, description = "Request body too large"),
    )
)]
#[tracing::instrument(skip_all, fields(account, container, blob))]
pub async fn copy_blob(State(state): State<AppState>, body: Bytes) -> Result<Json<CopyResponse>> {
    info!("CopyBlobBetweenStorage was triggered!");

    let result = start_copy(&state, &body).await;
    match &result {
        Ok(_) => record_outcome("started"),
        Err(err) => record_outcome(outcome_label(err)),
    }
    result
}

async fn start_copy(state: &AppState, body: &[u8]) -> Result<Json<CopyResponse>> {
    let data = CopyRequest::from_json(body)?;
    if let Some(source_account) = data.source_storage_account_name.as_deref() {
        debug!("Source storage account: {}", source_account);
    }

    let request = data.validate()?;

    let span = tracing::Span::current();
    span.record("account", request.account.as_str());
    span.record("container", request.container.as_str());
    span.record("blob", request.blob.as_str());

    let started = state.copier.start_copy(&request).await?;
    info!(status = %started.status, copy_id = ?started.copy_id, "Copy started");

    Ok(Json(CopyResponse { status: started.status }))
}
