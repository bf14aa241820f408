// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Link Registry
//!
//! Maps opaque transfer ids to [`TransferRecord`]s and enforces the link
//! lifecycle on every download attempt.
//!
//! ## Lifecycle Check
//!
//! Each attempt runs, in order:
//!
//! 1. unknown id → [`DenialReason::NotFound`] (`INVALID_LINK`)
//! 2. `now - created_at > expiry` → [`DenialReason::Expired`] (`EXPIRED_LINK`)
//! 3. `download_count >= max_downloads` → [`DenialReason::LimitReached`]
//!    (`DOWNLOAD_LIMIT_REACHED`)
//!
//! Otherwise the count is incremented and `DOWNLOAD` is recorded. Expired and
//! exhausted links stay in the registry and keep returning the same denial.
//!
//! ## Concurrency
//!
//! The id map sits behind a read/write lock that is only held long enough to
//! clone the record handle. Each record has its own mutex covering the whole
//! check-read-increment sequence, so concurrent attempts on one id can never
//! exceed `max_downloads` while different ids do not contend. [`LinkRegistry::reap`]
//! inspects records with no map lock held and skips any record it cannot lock
//! immediately.

pub mod clock;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{
    Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard, TryLockError,
};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::{DEFAULT_LINK_EXPIRY_SECONDS, DEFAULT_MAX_DOWNLOADS};
use crate::storage::{sanitize_filename, AuditEventKind, AuditLog, FileStore, StorageError};

pub use clock::{Clock, ManualClock, SystemClock};

/// Limits applied to every link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkPolicy {
    pub max_downloads: u32,
    pub expiry: Duration,
}

impl Default for LinkPolicy {
    fn default() -> Self {
        Self {
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            expiry: Duration::from_secs(DEFAULT_LINK_EXPIRY_SECONDS),
        }
    }
}

impl LinkPolicy {
    /// Whether a link created at `created_at` is past its expiry at `now`.
    pub fn is_expired(&self, created_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        elapsed_exceeds(created_at, now, self.expiry)
    }
}

/// Strict comparison; a clock that went backwards never counts as elapsed.
fn elapsed_exceeds(since: DateTime<Utc>, now: DateTime<Utc>, limit: Duration) -> bool {
    match now.signed_duration_since(since).to_std() {
        Ok(elapsed) => elapsed > limit,
        Err(_) => false,
    }
}

/// Metadata for one uploaded file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransferRecord {
    /// Capability token; the only thing needed to download.
    pub id: String,
    /// Location of the stored bytes.
    pub stored_path: PathBuf,
    /// Sanitized original filename, used for `Content-Disposition`.
    pub filename: String,
    /// Informational only, never used for access control.
    pub receiver: String,
    pub download_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Why a download was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DenialReason {
    #[error("Link not found")]
    NotFound,

    #[error("Link expired")]
    Expired,

    #[error("Download limit reached")]
    LimitReached,
}

impl DenialReason {
    /// Audit event emitted for this denial.
    pub fn audit_kind(&self) -> AuditEventKind {
        match self {
            DenialReason::NotFound => AuditEventKind::InvalidLink,
            DenialReason::Expired => AuditEventKind::ExpiredLink,
            DenialReason::LimitReached => AuditEventKind::DownloadLimitReached,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error(transparent)]
    Denied(#[from] DenialReason),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl RegistryError {
    pub fn denial(&self) -> Option<DenialReason> {
        match self {
            RegistryError::Denied(reason) => Some(*reason),
            RegistryError::Storage(_) => None,
        }
    }
}

/// A successful download.
#[derive(Debug, Clone)]
pub struct Download {
    pub bytes: Vec<u8>,
    pub filename: String,
    /// Count after this download.
    pub download_count: u32,
}

type RecordMap = HashMap<String, Arc<Mutex<TransferRecord>>>;

/// In-memory registry of live links.
pub struct LinkRegistry {
    store: FileStore,
    audit: Arc<AuditLog>,
    policy: LinkPolicy,
    clock: Arc<dyn Clock>,
    records: RwLock<RecordMap>,
}

impl std::fmt::Debug for LinkRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinkRegistry")
            .field("policy", &self.policy)
            .field("records", &self.len())
            .finish_non_exhaustive()
    }
}

impl LinkRegistry {
    pub fn new(
        store: FileStore,
        audit: Arc<AuditLog>,
        policy: LinkPolicy,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            audit,
            policy,
            clock,
            records: RwLock::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> LinkPolicy {
        self.policy
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn store(&self) -> &FileStore {
        &self.store
    }

    /// Store uploaded bytes and register a new link for them.
    ///
    /// The bytes are fully written before the record becomes visible, so a
    /// download can never observe a partial file. Returns the new id.
    pub fn create(
        &self,
        data: &[u8],
        original_filename: &str,
        receiver: &str,
    ) -> Result<String, RegistryError> {
        let id = self.fresh_id();
        let filename = sanitize_filename(original_filename);
        let stored_path = self.store.paths().transfer_file(&id, &filename);

        self.store.write_raw(&stored_path, data).map_err(|e| {
            tracing::error!(transfer_id = %id, error = %e, "Failed to store upload");
            e
        })?;

        let created_at = self.clock.now();
        let record = TransferRecord {
            id: id.clone(),
            stored_path,
            filename,
            receiver: receiver.to_string(),
            download_count: 0,
            created_at,
        };
        self.write_records()
            .insert(id.clone(), Arc::new(Mutex::new(record)));

        self.audit.record_at(
            created_at,
            AuditEventKind::Upload,
            format!("{id} | Receiver={receiver}"),
        );
        tracing::debug!(transfer_id = %id, size = data.len(), "Transfer registered");

        Ok(id)
    }

    /// Run the lifecycle check for `id` and, if it passes, hand out the file.
    pub fn attempt_download(&self, id: &str) -> Result<Download, RegistryError> {
        let entry = self.read_records().get(id).cloned();
        let Some(entry) = entry else {
            return Err(self.deny(self.clock.now(), id, DenialReason::NotFound));
        };

        let mut record = lock_record(&entry);
        let now = self.clock.now();

        if self.policy.is_expired(record.created_at, now) {
            return Err(self.deny(now, id, DenialReason::Expired));
        }

        if record.download_count >= self.policy.max_downloads {
            return Err(self.deny(now, id, DenialReason::LimitReached));
        }

        // Read before counting so a storage failure does not burn a download.
        let bytes = self.store.read_raw(&record.stored_path).map_err(|e| {
            tracing::error!(transfer_id = %id, error = %e, "Failed to read stored file");
            e
        })?;

        record.download_count += 1;
        self.audit.record_at(
            now,
            AuditEventKind::Download,
            format!("{id} | Count={}", record.download_count),
        );

        Ok(Download {
            bytes,
            filename: record.filename.clone(),
            download_count: record.download_count,
        })
    }

    /// Snapshot of a record.
    pub fn record(&self, id: &str) -> Option<TransferRecord> {
        let entry = self.read_records().get(id).cloned()?;
        let record = lock_record(&entry).clone();
        Some(record)
    }

    pub fn len(&self) -> usize {
        self.read_records().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Evict records whose age exceeds expiry plus `grace`, deleting their files.
    ///
    /// Evicted ids report [`DenialReason::NotFound`] afterwards. Records busy
    /// with a download are skipped until the next sweep. Returns the number of
    /// records removed.
    pub fn reap(&self, grace: Duration) -> usize {
        let now = self.clock.now();
        let retention = self.policy.expiry.saturating_add(grace);

        let snapshot: Vec<(String, Arc<Mutex<TransferRecord>>)> = self
            .read_records()
            .iter()
            .map(|(id, entry)| (id.clone(), Arc::clone(entry)))
            .collect();

        // No map lock is held while inspecting records.
        let stale: Vec<(String, PathBuf)> = snapshot
            .iter()
            .filter_map(|(id, entry)| {
                let record = try_lock_record(entry)?;
                elapsed_exceeds(record.created_at, now, retention)
                    .then(|| (id.clone(), record.stored_path.clone()))
            })
            .collect();

        if stale.is_empty() {
            return 0;
        }

        {
            let mut records = self.write_records();
            for (id, _) in &stale {
                records.remove(id);
            }
        }

        for (id, path) in &stale {
            if let Err(e) = self.store.delete(path) {
                tracing::warn!(
                    transfer_id = %id,
                    path = %path.display(),
                    error = %e,
                    "Failed to delete evicted file"
                );
            }
        }

        tracing::info!(count = stale.len(), "Evicted expired transfers");
        stale.len()
    }

    fn deny(&self, at: DateTime<Utc>, id: &str, reason: DenialReason) -> RegistryError {
        self.audit.record_at(at, reason.audit_kind(), id);
        reason.into()
    }

    fn fresh_id(&self) -> String {
        let records = self.read_records();
        loop {
            let id = Uuid::new_v4().to_string();
            if !records.contains_key(&id) {
                return id;
            }
        }
    }

    fn read_records(&self) -> RwLockReadGuard<'_, RecordMap> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_records(&self) -> RwLockWriteGuard<'_, RecordMap> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn lock_record(entry: &Mutex<TransferRecord>) -> MutexGuard<'_, TransferRecord> {
    entry.lock().unwrap_or_else(PoisonError::into_inner)
}

fn try_lock_record(entry: &Mutex<TransferRecord>) -> Option<MutexGuard<'_, TransferRecord>> {
    match entry.try_lock() {
        Ok(guard) => Some(guard),
        Err(TryLockError::Poisoned(e)) => Some(e.into_inner()),
        Err(TryLockError::WouldBlock) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{audit::TIMESTAMP_FORMAT, StoragePaths};
    use chrono::TimeDelta;
    use std::sync::Barrier;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        clock: Arc<ManualClock>,
        registry: Arc<LinkRegistry>,
    }

    fn setup(policy: LinkPolicy) -> Fixture {
        let temp = TempDir::new().unwrap();
        let paths = StoragePaths::new(temp.path().join("storage"), temp.path().join("audit.log"));
        let audit = Arc::new(AuditLog::new(paths.audit_log()));
        let mut store = FileStore::new(paths);
        store.initialize().unwrap();

        let clock = Arc::new(ManualClock::default());
        let registry = Arc::new(LinkRegistry::new(store, audit, policy, clock.clone()));
        Fixture {
            _temp: temp,
            clock,
            registry,
        }
    }

    fn audit_kinds(registry: &LinkRegistry) -> Vec<String> {
        registry
            .audit()
            .read_all()
            .unwrap()
            .unwrap_or_default()
            .lines()
            .map(|line| line.split(" | ").nth(1).unwrap().to_string())
            .collect()
    }

    #[test]
    fn upload_then_download_returns_identical_bytes() {
        let fx = setup(LinkPolicy::default());
        let payload: Vec<u8> = (0..=255u8).cycle().take(4096).collect();

        let id = fx.registry.create(&payload, "blob.bin", "alice").unwrap();
        let download = fx.registry.attempt_download(&id).unwrap();

        assert_eq!(download.bytes, payload);
        assert_eq!(download.filename, "blob.bin");
        assert_eq!(download.download_count, 1);
    }

    #[test]
    fn create_persists_file_and_record() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "../a.txt", "bob").unwrap();

        let record = fx.registry.record(&id).unwrap();
        assert_eq!(record.download_count, 0);
        assert_eq!(record.receiver, "bob");
        assert_eq!(record.filename, "a.txt");
        assert_eq!(record.created_at, fx.clock.now());
        assert_eq!(
            record.stored_path,
            fx.registry.store().paths().transfer_file(&id, "a.txt")
        );
        assert!(record.stored_path.is_file());
    }

    #[test]
    fn ids_are_unique_and_not_derived_from_input() {
        let fx = setup(LinkPolicy::default());
        let a = fx.registry.create(b"same", "same.txt", "x").unwrap();
        let b = fx.registry.create(b"same", "same.txt", "x").unwrap();

        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
        assert_eq!(fx.registry.len(), 2);
    }

    #[test]
    fn limit_is_enforced_and_denial_is_idempotent() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();

        assert_eq!(fx.registry.attempt_download(&id).unwrap().download_count, 1);
        assert_eq!(fx.registry.attempt_download(&id).unwrap().download_count, 2);

        for _ in 0..3 {
            let err = fx.registry.attempt_download(&id).unwrap_err();
            assert_eq!(err.denial(), Some(DenialReason::LimitReached));
        }
        assert_eq!(fx.registry.record(&id).unwrap().download_count, 2);
    }

    #[test]
    fn exhausted_link_far_in_the_future_reports_expired() {
        // Expiry is checked first, so an exhausted link eventually reports Expired.
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();
        fx.registry.attempt_download(&id).unwrap();
        fx.registry.attempt_download(&id).unwrap();

        fx.clock.advance(TimeDelta::days(7));
        for _ in 0..3 {
            let err = fx.registry.attempt_download(&id).unwrap_err();
            assert_eq!(err.denial(), Some(DenialReason::Expired));
        }
        assert_eq!(fx.registry.record(&id).unwrap().download_count, 2);
    }

    #[test]
    fn expired_link_denied_even_when_unused() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();

        fx.clock.advance(TimeDelta::seconds(601));
        for _ in 0..3 {
            let err = fx.registry.attempt_download(&id).unwrap_err();
            assert_eq!(err.denial(), Some(DenialReason::Expired));
        }
        assert_eq!(fx.registry.record(&id).unwrap().download_count, 0);
        assert_eq!(
            audit_kinds(&fx.registry),
            vec!["UPLOAD", "EXPIRED_LINK", "EXPIRED_LINK", "EXPIRED_LINK"]
        );
    }

    #[test]
    fn expiry_boundary_is_strict() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();

        fx.clock.advance(TimeDelta::seconds(600));
        assert!(fx.registry.attempt_download(&id).is_ok());

        fx.clock.advance(TimeDelta::milliseconds(1));
        let err = fx.registry.attempt_download(&id).unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::Expired));
    }

    #[test]
    fn expiry_checked_before_limit() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();
        fx.registry.attempt_download(&id).unwrap();

        fx.clock.advance(TimeDelta::seconds(601));
        let err = fx.registry.attempt_download(&id).unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::Expired));
        assert_eq!(fx.registry.record(&id).unwrap().download_count, 1);
    }

    #[test]
    fn unknown_id_is_not_found() {
        let fx = setup(LinkPolicy::default());
        for _ in 0..10 {
            fx.registry.create(b"x", "x.txt", "x").unwrap();
        }

        let err = fx
            .registry
            .attempt_download(&Uuid::new_v4().to_string())
            .unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::NotFound));
    }

    #[test]
    fn storage_failure_does_not_consume_a_download() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();
        let path = fx.registry.record(&id).unwrap().stored_path;
        std::fs::remove_file(&path).unwrap();

        let err = fx.registry.attempt_download(&id).unwrap_err();
        assert!(matches!(err, RegistryError::Storage(_)));
        assert_eq!(fx.registry.record(&id).unwrap().download_count, 0);
    }

    #[test]
    fn concurrent_downloads_never_exceed_limit() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"race", "race.txt", "bob").unwrap();

        let workers = 16;
        let barrier = Arc::new(Barrier::new(workers));
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let registry = Arc::clone(&fx.registry);
                let barrier = Arc::clone(&barrier);
                let id = id.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    registry.attempt_download(&id)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let limited = results
            .iter()
            .filter(|r| matches!(r, Err(e) if e.denial() == Some(DenialReason::LimitReached)))
            .count();

        assert_eq!(successes, 2);
        assert_eq!(limited, workers - 2);
        assert_eq!(fx.registry.record(&id).unwrap().download_count, 2);
    }

    #[test]
    fn custom_policy_is_respected() {
        let fx = setup(LinkPolicy {
            max_downloads: 1,
            expiry: Duration::from_secs(5),
        });
        let id = fx.registry.create(b"once", "once.txt", "bob").unwrap();

        fx.registry.attempt_download(&id).unwrap();
        let err = fx.registry.attempt_download(&id).unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::LimitReached));
    }

    #[test]
    fn scenario_writes_expected_audit_trail() {
        let fx = setup(LinkPolicy::default());
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();

        fx.registry.attempt_download(&id).unwrap();
        fx.registry.attempt_download(&id).unwrap();
        fx.registry.attempt_download(&id).unwrap_err();
        fx.registry
            .attempt_download(&Uuid::new_v4().to_string())
            .unwrap_err();

        assert_eq!(
            audit_kinds(&fx.registry),
            vec![
                "UPLOAD",
                "DOWNLOAD",
                "DOWNLOAD",
                "DOWNLOAD_LIMIT_REACHED",
                "INVALID_LINK"
            ]
        );

        let log = fx.registry.audit().read_all().unwrap().unwrap();
        assert!(log.contains(&format!("UPLOAD | {id} | Receiver=bob")));
        assert!(log.contains(&format!("DOWNLOAD | {id} | Count=2")));
    }

    #[test]
    fn reap_evicts_only_after_grace_and_deletes_files() {
        let fx = setup(LinkPolicy::default());
        let old = fx.registry.create(b"old", "old.txt", "bob").unwrap();
        let old_path = fx.registry.record(&old).unwrap().stored_path;

        fx.clock.advance(TimeDelta::seconds(650));
        let fresh = fx.registry.create(b"new", "new.txt", "bob").unwrap();

        let grace = Duration::from_secs(60);
        assert_eq!(fx.registry.reap(grace), 0);

        fx.clock.advance(TimeDelta::seconds(11));
        assert_eq!(fx.registry.reap(grace), 1);

        assert!(!old_path.exists());
        assert!(fx.registry.record(&old).is_none());
        assert!(fx.registry.record(&fresh).is_some());

        let err = fx.registry.attempt_download(&old).unwrap_err();
        assert_eq!(err.denial(), Some(DenialReason::NotFound));
    }

    #[test]
    fn reap_skips_busy_record_without_blocking_other_ids() {
        let fx = setup(LinkPolicy::default());
        let busy = fx.registry.create(b"busy", "busy.txt", "bob").unwrap();
        let idle = fx.registry.create(b"idle", "idle.txt", "bob").unwrap();

        fx.clock.advance(TimeDelta::seconds(600 + 61));
        let grace = Duration::from_secs(60);

        let entry = fx.registry.read_records().get(&busy).cloned().unwrap();
        let guard = lock_record(&entry);

        assert_eq!(fx.registry.reap(grace), 1);
        assert!(fx.registry.record(&idle).is_none());

        let other = fx.registry.create(b"other", "other.txt", "carol").unwrap();
        assert_eq!(fx.registry.attempt_download(&other).unwrap().bytes, b"other");

        drop(guard);
        assert_eq!(fx.registry.reap(grace), 1);
        assert!(fx.registry.record(&busy).is_none());
        assert!(fx.registry.record(&other).is_some());
    }

    #[test]
    fn audit_timestamps_follow_registry_clock() {
        let fx = setup(LinkPolicy::default());
        fx.clock.advance(TimeDelta::days(3));
        let id = fx.registry.create(b"hello", "a.txt", "bob").unwrap();
        let uploaded_at = fx.clock.now().format(TIMESTAMP_FORMAT).to_string();

        fx.clock.advance(TimeDelta::seconds(601));
        fx.registry.attempt_download(&id).unwrap_err();
        let denied_at = fx.clock.now().format(TIMESTAMP_FORMAT).to_string();

        let log = fx.registry.audit().read_all().unwrap().unwrap();
        let lines: Vec<&str> = log.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with(&format!("{uploaded_at} | UPLOAD | {id}")));
        assert!(lines[1].starts_with(&format!("{denied_at} | EXPIRED_LINK | {id}")));
    }
}
