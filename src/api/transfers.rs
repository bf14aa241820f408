// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Upload and download handlers.
//!
//! Both hand the registry call to the blocking pool: it performs file I/O
//! and, on download, holds the record's mutex for the whole lifecycle check.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartError, Multipart, Path, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use tokio::task::JoinError;

use crate::{
    error::ApiError,
    models::{StatusBody, UploadForm, UploadResponse},
    state::AppState,
};

/// Receiver label used when the form omits one.
pub const DEFAULT_RECEIVER: &str = "unknown";

#[utoipa::path(
    post,
    path = "/upload",
    request_body(content = UploadForm, content_type = "multipart/form-data"),
    tag = "Transfers",
    responses(
        (status = 200, description = "File stored, link issued", body = UploadResponse),
        (status = 400, description = "No file part in the request", body = StatusBody),
        (status = 413, description = "Upload exceeds the configured size limit", body = StatusBody)
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    let mut receiver: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error("Malformed multipart body", e))?
    {
        let name = field.name().unwrap_or_default().to_string();

        match name.as_str() {
            // A `file` field without a filename is a plain form value, not a file part.
            "file" => {
                let Some(filename) = field.file_name().map(str::to_string) else {
                    continue;
                };
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| multipart_error("Failed to read file", e))?;
                file = Some((filename, data.to_vec()));
            }
            "receiver" => {
                receiver = Some(
                    field
                        .text()
                        .await
                        .map_err(|e| multipart_error("Failed to read receiver", e))?,
                );
            }
            _ => {}
        }
    }

    let (filename, data) = file.ok_or_else(ApiError::missing_file)?;
    let receiver = receiver.unwrap_or_else(|| DEFAULT_RECEIVER.to_string());

    let registry = Arc::clone(&state.registry);
    let transfer_id =
        tokio::task::spawn_blocking(move || registry.create(&data, &filename, &receiver))
            .await
            .map_err(join_error)??;

    Ok(Json(UploadResponse::for_transfer(&transfer_id)))
}

#[utoipa::path(
    get,
    path = "/download/{transfer_id}",
    params(
        ("transfer_id" = String, Path, description = "Capability token returned by the upload")
    ),
    tag = "Transfers",
    responses(
        (status = 200, description = "File contents as an `application/octet-stream` attachment"),
        (status = 403, description = "Link expired or download limit reached", body = StatusBody),
        (status = 404, description = "Unknown link", body = StatusBody)
    )
)]
pub async fn download(
    State(state): State<AppState>,
    Path(transfer_id): Path<String>,
) -> Result<Response, ApiError> {
    let registry = Arc::clone(&state.registry);
    let download = tokio::task::spawn_blocking(move || registry.attempt_download(&transfer_id))
        .await
        .map_err(join_error)??;

    // Filenames are sanitized to [A-Za-z0-9_.-], so quoting is safe.
    let disposition = format!("attachment; filename=\"{}\"", download.filename);

    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        download.bytes,
    )
        .into_response())
}

/// Keeps the status axum assigns, e.g. 413 once `MAX_UPLOAD_BYTES` is exceeded.
fn multipart_error(context: &str, e: MultipartError) -> ApiError {
    ApiError::new(e.status(), format!("{context}: {}", e.body_text()))
}

fn join_error(e: JoinError) -> ApiError {
    tracing::error!(error = %e, "Blocking registry task failed");
    ApiError::internal("Internal error")
}
