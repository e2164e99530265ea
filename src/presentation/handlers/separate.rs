use axum::Json;
use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::application::services::SeparationServiceError;
use crate::domain::{StemTarget, UploadedAudio};
use crate::presentation::state::AppState;

const UPLOAD_FIELD: &str = "file";

#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

#[tracing::instrument(skip(state, multipart))]
pub async fn separate_handler(
    State(state): State<AppState>,
    Path(label): Path<String>,
    mut multipart: Multipart,
) -> Response {
    let target = match label.parse::<StemTarget>() {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(label = %label, "Unknown separation target");
            return error_response(StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    let upload = match read_upload(&mut multipart).await {
        Ok(Some(upload)) => upload,
        Ok(None) => {
            tracing::warn!("Separation request with no file");
            return error_response(StatusCode::BAD_REQUEST, "No file uploaded".to_string());
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to read multipart");
            return error_response(e.status(), format!("Failed to read multipart: {}", e));
        }
    };

    tracing::debug!(
        filename = upload.filename.as_deref().unwrap_or("unknown"),
        bytes = upload.len(),
        "File upload received"
    );

    match state.separation_service.separate(target, upload).await {
        Ok(stem) => {
            tracing::info!(
                stem = %target,
                sample_rate = stem.sample_rate,
                channels = stem.channels,
                frames = stem.frames,
                "Returning separated stem"
            );
            (
                StatusCode::OK,
                [
                    (CONTENT_TYPE, stem.content_type.to_string()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{}\"", target.output_file_name()),
                    ),
                ],
                stem.data,
            )
                .into_response()
        }
        Err(e) => {
            let status = status_for(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, stem = %target, "Separation failed");
            } else {
                tracing::warn!(error = %e, stem = %target, "Separation rejected");
            }
            error_response(status, e.to_string())
        }
    }
}

/// Takes the field named `file`, or failing that the first field that carries
/// a filename.
async fn read_upload(
    multipart: &mut Multipart,
) -> Result<Option<UploadedAudio>, MultipartError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() == Some(UPLOAD_FIELD) || field.file_name().is_some() {
            let filename = field.file_name().map(str::to_string);
            let data = field.bytes().await?;
            return Ok(Some(UploadedAudio::new(filename, data)));
        }
    }
    Ok(None)
}

fn status_for(error: &SeparationServiceError) -> StatusCode {
    match error {
        SeparationServiceError::EmptyUpload => StatusCode::BAD_REQUEST,
        SeparationServiceError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}
