//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source database (schedule system) configuration.
    pub source: SourceConfig,

    /// Target database (synchronized table) configuration.
    pub target: TargetConfig,

    /// Window and scheduling behavior.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Failure notification.
    #[serde(default)]
    pub notify: NotifyConfig,
}

/// SQL Server connection settings shared by source and target.
#[derive(Clone, Serialize, Deserialize)]
pub struct ConnectionConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 1433).
    #[serde(default = "default_mssql_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    #[serde(default)]
    pub password: String,

    /// Encrypt connection (default: "true").
    #[serde(default = "default_true_string")]
    pub encrypt: String,

    /// Trust server certificate (default: false).
    #[serde(default)]
    pub trust_server_cert: bool,
}

impl fmt::Debug for ConnectionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("encrypt", &self.encrypt)
            .field("trust_server_cert", &self.trust_server_cert)
            .finish()
    }
}

/// Source database configuration.
///
/// The extraction queries are opaque SQL scripts read from disk. Both are
/// bound with `@P1` = window start and `@P2` = window end (dates).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,

    /// Script returning one row per scheduled flight leg.
    pub window_query_file: PathBuf,

    /// Script returning crew counts grouped by date, flight code and origin.
    pub crew_query_file: PathBuf,
}

/// Target database configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    #[serde(flatten)]
    pub connection: ConnectionConfig,

    /// Target schema (default: "dbo").
    #[serde(default = "default_dbo_schema")]
    pub schema: String,

    /// Target table (default: "FlightSchedule").
    #[serde(default = "default_table")]
    pub table: String,
}

/// Sync window and scheduling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Days before today covered by the window (default: 1).
    #[serde(default = "default_lookback_days")]
    pub lookback_days: i64,

    /// Days after today covered by the window (default: 2).
    #[serde(default = "default_lookahead_days")]
    pub lookahead_days: i64,

    /// Delay between the end of one run and the start of the next (default: 30).
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            lookahead_days: default_lookahead_days(),
            interval_minutes: default_interval_minutes(),
        }
    }
}

/// Failure notification configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook receiving failure messages. Failures are only logged when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub webhook_url: Option<String>,

    /// Request timeout in seconds (default: 10).
    #[serde(default = "default_notify_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_secs: default_notify_timeout(),
        }
    }
}

// Default value functions for serde
fn default_mssql_port() -> u16 {
    1433
}

fn default_true_string() -> String {
    "true".to_string()
}

fn default_dbo_schema() -> String {
    "dbo".to_string()
}

fn default_table() -> String {
    "FlightSchedule".to_string()
}

fn default_lookback_days() -> i64 {
    1
}

fn default_lookahead_days() -> i64 {
    2
}

fn default_interval_minutes() -> u64 {
    30
}

fn default_notify_timeout() -> u64 {
    10
}
