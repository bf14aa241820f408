// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Audit logging for link lifecycle events.
//!
//! Every upload and every download attempt, successful or not, is appended
//! to a plain-text log, one event per line:
//!
//! ```text
//! 2026-10-18 09:14:03 | UPLOAD | 5f0c...e2 | Receiver=bob
//! 2026-10-18 09:15:10 | DOWNLOAD | 5f0c...e2 | Count=1
//! ```
//!
//! Writing is best-effort: a failed append is reported through `tracing`
//! and never fails the request that produced the event.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::StorageResult;

/// Timestamp layout of each log line.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Types of auditable events.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditEventKind {
    Upload,
    Download,
    InvalidLink,
    ExpiredLink,
    DownloadLimitReached,
}

impl AuditEventKind {
    /// Name written to the log.
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventKind::Upload => "UPLOAD",
            AuditEventKind::Download => "DOWNLOAD",
            AuditEventKind::InvalidLink => "INVALID_LINK",
            AuditEventKind::ExpiredLink => "EXPIRED_LINK",
            AuditEventKind::DownloadLimitReached => "DOWNLOAD_LIMIT_REACHED",
        }
    }
}

impl std::fmt::Display for AuditEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Append-only audit log backed by a single text file.
#[derive(Debug)]
pub struct AuditLog {
    path: PathBuf,
    // Serializes appends so concurrent events never interleave.
    write_lock: Mutex<()>,
}

impl AuditLog {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record an event stamped with the current wall-clock time.
    pub fn record(&self, kind: AuditEventKind, detail: impl AsRef<str>) {
        self.record_at(Utc::now(), kind, detail);
    }

    /// Record an event stamped with `at`.
    pub fn record_at(&self, at: DateTime<Utc>, kind: AuditEventKind, detail: impl AsRef<str>) {
        let detail = detail.as_ref();
        let line = format_line(&at.format(TIMESTAMP_FORMAT).to_string(), kind, detail);

        tracing::info!(event = %kind, detail, "audit");

        if let Err(e) = self.append(&line) {
            tracing::warn!(
                event = %kind,
                path = %self.path.display(),
                error = %e,
                "Failed to append audit event"
            );
        }
    }

    fn append(&self, line: &str) -> io::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(line.as_bytes())?;
        file.flush()
    }

    /// Full log contents, or `None` if nothing has been recorded yet.
    pub fn read_all(&self) -> StorageResult<Option<String>> {
        match fs::read_to_string(&self.path) {
            Ok(content) if content.is_empty() => Ok(None),
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn format_line(timestamp: &str, kind: AuditEventKind, detail: &str) -> String {
    // Keep one event per line even if a detail carries user-supplied newlines.
    let detail = detail.replace(['\r', '\n'], " ");
    format!("{timestamp} | {kind} | {detail}\n")
}
