// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{extract::State, http::header, response::IntoResponse};

use crate::{error::ApiError, state::AppState};

/// Body served before the first event has been recorded.
pub const NO_LOGS_MESSAGE: &str = "No logs yet.";

/// Dump the whole audit log as plain text.
#[utoipa::path(
    get,
    path = "/logs",
    tag = "Audit",
    responses(
        (status = 200, description = "Audit log, one event per line", content_type = "text/plain", body = String)
    )
)]
pub async fn logs(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let content = state
        .registry
        .audit()
        .read_all()
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to read audit log");
            ApiError::internal("Failed to read audit log")
        })?
        .unwrap_or_else(|| NO_LOGS_MESSAGE.to_string());

    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], content))
}
