// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # API Data Models
//!
//! Request and response bodies for the HTTP surface. All types derive
//! `ToSchema` for the OpenAPI document served at `/docs`.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Outcome marker used in every JSON body.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Ok,
    Error,
}

/// Returned after a successful upload.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct UploadResponse {
    pub status: Status,
    /// Relative link handing out the file, e.g. `/download/{id}`.
    pub download_link: String,
}

impl UploadResponse {
    pub fn for_transfer(transfer_id: &str) -> Self {
        Self {
            status: Status::Ok,
            download_link: download_link(transfer_id),
        }
    }
}

/// Error body: `{"status":"error","msg":"..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, PartialEq, Eq)]
pub struct StatusBody {
    pub status: Status,
    pub msg: String,
}

impl StatusBody {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            status: Status::Error,
            msg: msg.into(),
        }
    }
}

/// Multipart form accepted by `POST /upload` (documentation only).
#[derive(Debug, ToSchema)]
pub struct UploadForm {
    /// File contents.
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
    /// Free-text label for the intended receiver. Defaults to `unknown`.
    pub receiver: Option<String>,
}

/// Path under which a transfer is downloadable.
pub fn download_link(transfer_id: &str) -> String {
    format!("/download/{transfer_id}")
}
