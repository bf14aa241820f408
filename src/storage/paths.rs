// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Path utilities for the on-disk storage layout.

use std::path::{Path, PathBuf};

use crate::config::{DEFAULT_AUDIT_LOG_PATH, DEFAULT_STORAGE_DIR};

/// Storage path utilities.
///
/// ```text
/// <storage_dir>/
///   {transfer_id}_{sanitized_filename}   # Uploaded bytes
/// <audit_log>                            # One event per line
/// ```
#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
    audit_log: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DEFAULT_STORAGE_DIR, DEFAULT_AUDIT_LOG_PATH)
    }
}

impl StoragePaths {
    /// Create a new StoragePaths with custom locations (useful for testing).
    pub fn new(root: impl AsRef<Path>, audit_log: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
            audit_log: audit_log.as_ref().to_path_buf(),
        }
    }

    /// Directory holding uploaded files.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Append-only audit log file.
    pub fn audit_log(&self) -> &Path {
        &self.audit_log
    }

    /// Path of an uploaded file.
    ///
    /// `filename` must already be sanitized.
    pub fn transfer_file(&self, transfer_id: &str, filename: &str) -> PathBuf {
        self.root.join(format!("{transfer_id}_{filename}"))
    }
}
