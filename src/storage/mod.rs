// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Persistent state lives in two places on the serving node:
//!
//! ```text
//! <STORAGE_DIR>/
//!   {transfer_id}_{sanitized_filename}   # Uploaded bytes, written before the link exists
//! <AUDIT_LOG_PATH>                       # Append-only text log, one event per line
//! ```
//!
//! Transfer records themselves are held in memory by the
//! [`LinkRegistry`](crate::registry::LinkRegistry); a restart forgets every
//! link while uploaded files stay on disk.

pub mod audit;
pub mod file_store;
pub mod filename;
pub mod paths;

pub use audit::{AuditEventKind, AuditLog};
pub use file_store::{FileStore, StorageError, StorageResult};
pub use filename::sanitize_filename;
pub use paths::StoragePaths;
