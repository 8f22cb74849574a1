//! TDS connections to SQL Server.
//!
//! Each phase of a run opens its own connection and drops it when the
//! phase ends; nothing is pooled across phases or runs.

use crate::config::ConnectionConfig;
use crate::error::{Result, SyncError};
use std::time::{Duration, Instant};
use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};
use tracing::debug;

/// A connected tiberius client.
pub type MssqlClient = Client<Compat<TcpStream>>;

/// Open a connection. `context` names the phase for error messages.
pub async fn connect(config: &ConnectionConfig, context: &str) -> Result<MssqlClient> {
    let tds = config.tiberius_config();
    let tcp = TcpStream::connect(tds.get_addr())
        .await
        .map_err(|e| SyncError::connection(e, format!("{} ({})", context, config.describe())))?;

    tcp.set_nodelay(true).ok();

    let client = Client::connect(tds, tcp.compat_write())
        .await
        .map_err(|e| SyncError::connection(e, format!("{} ({})", context, config.describe())))?;

    debug!("Connected to {} for {}", config.describe(), context);
    Ok(client)
}

/// Connect and run `SELECT 1`, returning the round-trip latency.
pub async fn ping(config: &ConnectionConfig, context: &str) -> Result<Duration> {
    let start = Instant::now();
    let mut client = connect(config, context).await?;
    client.simple_query("SELECT 1").await?.into_row().await?;
    Ok(start.elapsed())
}
