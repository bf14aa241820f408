// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::models::StatusBody;
use crate::registry::{DenialReason, RegistryError};

/// Message returned when an upload carries no `file` part.
pub const MISSING_FILE_MESSAGE: &str = "No file";

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn missing_file() -> Self {
        Self::bad_request(MISSING_FILE_MESSAGE)
    }
}

impl From<DenialReason> for ApiError {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::NotFound => Self::not_found(reason.to_string()),
            DenialReason::Expired | DenialReason::LimitReached => {
                Self::forbidden(reason.to_string())
            }
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::Denied(reason) => reason.into(),
            // Details are already logged by the registry.
            RegistryError::Storage(_) => Self::internal("Storage failure"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(StatusBody::error(self.message))).into_response()
    }
}
