// src/config.rs

//! Configuration loading utilities.
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment variables (a `.env` file in the working directory is read
//! first and never overrides variables already set).

use std::fmt::Display;
use std::path::Path;
use std::str::FromStr;

use crate::error::{AppError, Result};
use crate::models::Config;

/// Environment variable names.
pub mod keys {
    pub const REST_TIMEOUT_IN_SEC: &str = "REST_TIMEOUT_IN_SEC";
    pub const PORT: &str = "PORT";
    pub const DB_URL: &str = "DB_URL";
    pub const DB_MAX_CONNECTIONS: &str = "DB_MAX_CONNECTIONS";
    pub const NATS_URL: &str = "NATS_URL";
    pub const NATS_SUBJECT: &str = "NATS_SUBJECT";
    pub const MAX_WORKERS: &str = "MAX_WORKERS";
    pub const MAX_CAPACITY: &str = "MAX_CAPACITY";
    pub const HN_BASE_URL: &str = "HN_BASE_URL";
    pub const HN_PRETTY: &str = "HN_PRETTY";
    pub const FETCH_LIMIT: &str = "FETCH_LIMIT";
    pub const FETCH_INTERVAL_SECS: &str = "FETCH_INTERVAL_SECS";
}

/// Load configuration from an optional TOML file and the environment.
///
/// A missing file falls back to defaults. A malformed file, an unparsable
/// environment value or a configuration that fails validation is an error.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            log::warn!("Ignoring unreadable .env file: {e}");
        }
    }

    let mut config = match path {
        Some(path) if path.exists() => {
            log::info!("Loading configuration from {}", path.display());
            Config::load(path)?
        }
        Some(path) => {
            log::warn!("Config file {} not found. Using defaults.", path.display());
            Config::default()
        }
        None => Config::default(),
    };

    apply_env(&mut config, |key| std::env::var(key).ok())?;
    config.validate()?;
    Ok(config)
}

/// Override configuration values with variables returned by `lookup`.
pub fn apply_env<F>(config: &mut Config, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = parse_var(&lookup, keys::REST_TIMEOUT_IN_SEC)? {
        config.source.timeout_secs = v;
    }
    if let Some(v) = parse_var(&lookup, keys::PORT)? {
        config.server.port = v;
    }
    if let Some(v) = lookup(keys::DB_URL) {
        config.database.url = v;
    }
    if let Some(v) = parse_var(&lookup, keys::DB_MAX_CONNECTIONS)? {
        config.database.max_connections = v;
    }
    if let Some(v) = lookup(keys::NATS_URL) {
        config.broker.url = v;
    }
    if let Some(v) = lookup(keys::NATS_SUBJECT) {
        config.broker.subject = v;
    }
    if let Some(v) = parse_var(&lookup, keys::MAX_WORKERS)? {
        config.workers.max_workers = v;
    }
    if let Some(v) = parse_var(&lookup, keys::MAX_CAPACITY)? {
        config.workers.max_capacity = v;
    }
    if let Some(v) = lookup(keys::HN_BASE_URL) {
        config.source.base_url = v;
    }
    if let Some(v) = parse_var(&lookup, keys::HN_PRETTY)? {
        config.source.pretty = v;
    }
    if let Some(v) = parse_var(&lookup, keys::FETCH_LIMIT)? {
        config.source.fetch_limit = v;
    }
    if let Some(v) = parse_var(&lookup, keys::FETCH_INTERVAL_SECS)? {
        config.schedule.interval_secs = v;
    }
    Ok(())
}

fn parse_var<T, F>(lookup: &F, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::config(format!("{key}={raw:?} is invalid: {e}"))),
    }
}
