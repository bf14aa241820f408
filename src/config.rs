// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `127.0.0.1` |
//! | `PORT` | Server bind port | `5000` |
//! | `STORAGE_DIR` | Directory holding uploaded files | `./storage` |
//! | `AUDIT_LOG_PATH` | Append-only audit log file | `./audit.log` |
//! | `CLIENT_DIR` | Static client bundle | `../client` |
//! | `MAX_DOWNLOADS` | Successful downloads allowed per link | `2` |
//! | `LINK_EXPIRY_SECONDS` | Link lifetime after upload | `600` |
//! | `REAPER_INTERVAL_SECONDS` | Pause between eviction sweeps | `60` |
//! | `REAPER_GRACE_SECONDS` | Extra retention after expiry before eviction | `3600` |
//! | `MAX_UPLOAD_BYTES` | Request body limit for uploads | `104857600` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::collections::HashMap;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const STORAGE_DIR_ENV: &str = "STORAGE_DIR";
pub const AUDIT_LOG_PATH_ENV: &str = "AUDIT_LOG_PATH";
pub const CLIENT_DIR_ENV: &str = "CLIENT_DIR";
pub const MAX_DOWNLOADS_ENV: &str = "MAX_DOWNLOADS";
pub const LINK_EXPIRY_SECONDS_ENV: &str = "LINK_EXPIRY_SECONDS";
pub const REAPER_INTERVAL_SECONDS_ENV: &str = "REAPER_INTERVAL_SECONDS";
pub const REAPER_GRACE_SECONDS_ENV: &str = "REAPER_GRACE_SECONDS";
pub const MAX_UPLOAD_BYTES_ENV: &str = "MAX_UPLOAD_BYTES";

/// Environment variable selecting the log output format.
///
/// `json` switches to structured JSON lines; anything else is pretty text.
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_STORAGE_DIR: &str = "./storage";
pub const DEFAULT_AUDIT_LOG_PATH: &str = "./audit.log";
pub const DEFAULT_CLIENT_DIR: &str = "../client";
pub const DEFAULT_MAX_DOWNLOADS: u32 = 2;
pub const DEFAULT_LINK_EXPIRY_SECONDS: u64 = 600;
pub const DEFAULT_REAPER_INTERVAL_SECONDS: u64 = 60;
pub const DEFAULT_REAPER_GRACE_SECONDS: u64 = 3600;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;

/// Errors raised while reading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?}")]
    InvalidValue { name: &'static str, value: String },

    #[error("{name} must be at least 1")]
    MustBePositive { name: &'static str },
}

/// Fully resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub storage_dir: PathBuf,
    pub audit_log_path: PathBuf,
    pub client_dir: PathBuf,
    pub max_downloads: u32,
    pub link_expiry: Duration,
    pub reaper_interval: Duration,
    pub reaper_grace: Duration,
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            storage_dir: PathBuf::from(DEFAULT_STORAGE_DIR),
            audit_log_path: PathBuf::from(DEFAULT_AUDIT_LOG_PATH),
            client_dir: PathBuf::from(DEFAULT_CLIENT_DIR),
            max_downloads: DEFAULT_MAX_DOWNLOADS,
            link_expiry: Duration::from_secs(DEFAULT_LINK_EXPIRY_SECONDS),
            reaper_interval: Duration::from_secs(DEFAULT_REAPER_INTERVAL_SECONDS),
            reaper_grace: Duration::from_secs(DEFAULT_REAPER_GRACE_SECONDS),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration from an arbitrary variable source.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Self::from_lookup(|name| vars.get(name).cloned())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let defaults = Self::default();

        let max_downloads: u32 = parse_or(&lookup, MAX_DOWNLOADS_ENV, defaults.max_downloads)?;
        if max_downloads == 0 {
            return Err(ConfigError::MustBePositive {
                name: MAX_DOWNLOADS_ENV,
            });
        }

        Ok(Self {
            host: lookup(HOST_ENV).unwrap_or(defaults.host),
            port: parse_or(&lookup, PORT_ENV, defaults.port)?,
            storage_dir: lookup(STORAGE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.storage_dir),
            audit_log_path: lookup(AUDIT_LOG_PATH_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.audit_log_path),
            client_dir: lookup(CLIENT_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or(defaults.client_dir),
            max_downloads,
            link_expiry: Duration::from_secs(parse_or(
                &lookup,
                LINK_EXPIRY_SECONDS_ENV,
                DEFAULT_LINK_EXPIRY_SECONDS,
            )?),
            reaper_interval: Duration::from_secs(parse_or(
                &lookup,
                REAPER_INTERVAL_SECONDS_ENV,
                DEFAULT_REAPER_INTERVAL_SECONDS,
            )?),
            reaper_grace: Duration::from_secs(parse_or(
                &lookup,
                REAPER_GRACE_SECONDS_ENV,
                DEFAULT_REAPER_GRACE_SECONDS,
            )?),
            max_upload_bytes: parse_or(&lookup, MAX_UPLOAD_BYTES_ENV, defaults.max_upload_bytes)?,
        })
    }

    /// `host:port` string suitable for binding a listener.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    F: Fn(&'static str) -> Option<String>,
{
    match lookup(name) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value: raw }),
        None => Ok(default),
    }
}
