// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    models::{Status, StatusBody, UploadForm, UploadResponse},
    state::AppState,
};

pub mod health;
pub mod logs;
pub mod transfers;

pub fn router(state: AppState) -> Router {
    let client_bundle = ServeDir::new(&state.client_dir);
    let upload_limit = DefaultBodyLimit::max(state.max_upload_bytes);

    let api_routes = Router::new()
        .route("/upload", post(transfers::upload).layer(upload_limit))
        .route("/download/{transfer_id}", get(transfers::download))
        .route("/logs", get(logs::logs))
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .with_state(state);

    Router::new()
        .merge(api_routes)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .fallback_service(client_bundle)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        transfers::upload,
        transfers::download,
        logs::logs,
        health::health,
        health::liveness,
        health::readiness
    ),
    components(
        schemas(
            Status,
            StatusBody,
            UploadForm,
            UploadResponse,
            health::ReadyResponse,
            health::HealthChecks,
            health::HealthResponse
        )
    ),
    tags(
        (name = "Transfers", description = "Upload files and redeem download links"),
        (name = "Audit", description = "Lifecycle event log"),
        (name = "Health", description = "Liveness and readiness probes")
    )
)]
pub struct ApiDoc;
