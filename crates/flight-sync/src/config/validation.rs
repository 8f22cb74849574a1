//! Configuration validation.

use super::{Config, ConnectionConfig};
use crate::error::{Result, SyncError};

/// Widest lookback or lookahead accepted, in days.
pub const MAX_WINDOW_DAYS: i64 = 3650;

/// Longest interval between scheduled passes, in minutes (one week).
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    validate_connection("source", &config.source.connection)?;
    if config.source.window_query_file.as_os_str().is_empty() {
        return Err(SyncError::Config(
            "source.window_query_file is required".into(),
        ));
    }
    if config.source.crew_query_file.as_os_str().is_empty() {
        return Err(SyncError::Config("source.crew_query_file is required".into()));
    }

    validate_connection("target", &config.target.connection)?;
    if config.target.schema.is_empty() {
        return Err(SyncError::Config("target.schema is required".into()));
    }
    if config.target.table.is_empty() {
        return Err(SyncError::Config("target.table is required".into()));
    }

    if config.sync.lookback_days < 0 || config.sync.lookahead_days < 0 {
        return Err(SyncError::Config(
            "sync.lookback_days and sync.lookahead_days must not be negative".into(),
        ));
    }
    if config.sync.lookback_days > MAX_WINDOW_DAYS || config.sync.lookahead_days > MAX_WINDOW_DAYS {
        return Err(SyncError::Config(format!(
            "sync.lookback_days and sync.lookahead_days must not exceed {}",
            MAX_WINDOW_DAYS
        )));
    }
    if config.sync.interval_minutes == 0 {
        return Err(SyncError::Config(
            "sync.interval_minutes must be at least 1".into(),
        ));
    }
    if config.sync.interval_minutes > MAX_INTERVAL_MINUTES {
        return Err(SyncError::Config(format!(
            "sync.interval_minutes must not exceed {}",
            MAX_INTERVAL_MINUTES
        )));
    }

    if let Some(url) = &config.notify.webhook_url {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(SyncError::Config(format!(
                "notify.webhook_url must be an http(s) URL, got '{}'",
                url
            )));
        }
    }

    Ok(())
}

fn validate_connection(side: &str, conn: &ConnectionConfig) -> Result<()> {
    if conn.host.is_empty() {
        return Err(SyncError::Config(format!("{}.host is required", side)));
    }
    if conn.database.is_empty() {
        return Err(SyncError::Config(format!("{}.database is required", side)));
    }
    if conn.user.is_empty() {
        return Err(SyncError::Config(format!("{}.user is required", side)));
    }
    Ok(())
}
