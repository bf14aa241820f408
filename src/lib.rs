// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Ephemeral Share - limited-use file transfer links
//!
//! A sender uploads a file and receives a download link that works for a
//! bounded number of downloads within a fixed time window. Every upload and
//! download attempt lands in an append-only audit log.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `registry` - Link lifecycle enforcement (expiry + download quota)
//! - `reaper` - Background eviction of long-expired links
//! - `storage` - Uploaded bytes on disk and the audit log

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod reaper;
pub mod registry;
pub mod state;
pub mod storage;
