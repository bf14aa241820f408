// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::path::PathBuf;
use std::sync::Arc;

use crate::config::ServerConfig;
use crate::registry::{Clock, LinkPolicy, LinkRegistry, SystemClock};
use crate::storage::{AuditLog, FileStore, StoragePaths, StorageResult};

/// Shared context handed to every handler.
#[derive(Clone, Debug)]
pub struct AppState {
    pub registry: Arc<LinkRegistry>,
    pub client_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(registry: Arc<LinkRegistry>, client_dir: impl Into<PathBuf>) -> Self {
        Self {
            registry,
            client_dir: client_dir.into(),
            max_upload_bytes: crate::config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    /// Build state from configuration, creating the storage directories.
    pub fn from_config(config: &ServerConfig) -> StorageResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Like [`AppState::from_config`] with an explicit time source.
    pub fn with_clock(config: &ServerConfig, clock: Arc<dyn Clock>) -> StorageResult<Self> {
        let paths = StoragePaths::new(&config.storage_dir, &config.audit_log_path);
        let audit = Arc::new(AuditLog::new(paths.audit_log()));
        let mut store = FileStore::new(paths);
        store.initialize()?;

        let policy = LinkPolicy {
            max_downloads: config.max_downloads,
            expiry: config.link_expiry,
        };
        let registry = Arc::new(LinkRegistry::new(store, audit, policy, clock));

        let mut state = Self::new(registry, config.client_dir.clone());
        state.max_upload_bytes = config.max_upload_bytes;
        Ok(state)
    }
}
