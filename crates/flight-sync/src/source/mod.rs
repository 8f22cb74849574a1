//! Source database: flight schedule extraction and crew aggregates.

use crate::config::SourceConfig;
use crate::db;
use crate::error::{Result, SyncError};
use crate::value::{CrewCountRow, SourceRow, SqlValue};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use std::time::Duration;
use tiberius::{ColumnData, FromSql, Row};
use tracing::{debug, info};

/// Trait for source database reads.
#[async_trait]
pub trait SourceStore: Send + Sync {
    /// Flight legs whose sector falls in `[from, to]`.
    async fn fetch_source_window(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<SourceRow>>;

    /// Crew counts grouped by flight date, raw flight code and origin.
    async fn fetch_crew_counts(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CrewCountRow>>;
}

/// SQL Server source running the configured extraction scripts.
pub struct MssqlSource {
    config: SourceConfig,
    window_query: String,
    crew_query: String,
}

impl MssqlSource {
    /// Read both query scripts from disk.
    pub fn new(config: SourceConfig) -> Result<Self> {
        let window_query = read_query(&config.window_query_file)?;
        let crew_query = read_query(&config.crew_query_file)?;
        Ok(Self {
            config,
            window_query,
            crew_query,
        })
    }

    /// Build from query text already in memory.
    pub fn with_queries(config: SourceConfig, window_query: String, crew_query: String) -> Self {
        Self {
            config,
            window_query,
            crew_query,
        }
    }

    /// Connect and run `SELECT 1`.
    pub async fn ping(&self) -> Result<Duration> {
        db::ping(&self.config.connection, "source health check").await
    }

    async fn query(&self, what: &str, sql: &str, from: NaiveDate, to: NaiveDate) -> Result<Vec<Row>> {
        let mut client = db::connect(&self.config.connection, what).await?;
        let stream = client
            .query(sql, &[&from, &to])
            .await
            .map_err(|e| SyncError::fetch(what, e))?;
        let rows = stream
            .into_first_result()
            .await
            .map_err(|e| SyncError::fetch(what, e))?;
        debug!("{}: {} rows for {}..{}", what, rows.len(), from, to);
        Ok(rows)
    }
}

#[async_trait]
impl SourceStore for MssqlSource {
    async fn fetch_source_window(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<SourceRow>> {
        let rows = self
            .query("source window", &self.window_query, from, to)
            .await?;
        let rows: Vec<SourceRow> = rows.into_iter().map(row_to_source_row).collect();
        info!(
            "Fetched {} source rows from {}",
            rows.len(),
            self.config.connection.describe()
        );
        Ok(rows)
    }

    async fn fetch_crew_counts(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<CrewCountRow>> {
        let rows = self.query("crew counts", &self.crew_query, from, to).await?;
        let counts = rows
            .iter()
            .map(row_to_crew_count)
            .collect::<Result<Vec<_>>>()?;
        info!("Fetched {} crew count groups", counts.len());
        Ok(counts)
    }
}

fn read_query(path: &std::path::Path) -> Result<String> {
    let sql = std::fs::read_to_string(path).map_err(|e| {
        SyncError::Config(format!("cannot read query file {}: {}", path.display(), e))
    })?;
    if sql.trim().is_empty() {
        return Err(SyncError::Config(format!(
            "query file {} is empty",
            path.display()
        )));
    }
    Ok(sql)
}

/// Convert a result row into a name-addressed source row.
fn row_to_source_row(row: Row) -> SourceRow {
    let names: Vec<String> = row.columns().iter().map(|c| c.name().to_string()).collect();
    let mut out = SourceRow::new();
    for (name, data) in names.iter().zip(row.into_iter()) {
        out.insert(name, column_data_to_value(&data));
    }
    out
}

/// Map a TDS value onto the raw value model.
pub(crate) fn column_data_to_value(data: &ColumnData<'static>) -> SqlValue {
    let value = match data {
        ColumnData::U8(v) => v.map(|v| SqlValue::I64(v as i64)),
        ColumnData::I16(v) => v.map(|v| SqlValue::I64(v as i64)),
        ColumnData::I32(v) => v.map(|v| SqlValue::I64(v as i64)),
        ColumnData::I64(v) => v.map(SqlValue::I64),
        ColumnData::F32(v) => v.map(|v| SqlValue::F64(v as f64)),
        ColumnData::F64(v) => v.map(SqlValue::F64),
        ColumnData::Bit(v) => v.map(SqlValue::Bool),
        ColumnData::String(v) => v.as_ref().map(|s| SqlValue::String(s.to_string())),
        ColumnData::Guid(v) => v.as_ref().map(|g| SqlValue::String(g.to_string())),
        ColumnData::Binary(v) => v.as_ref().map(|b| SqlValue::Bytes(b.to_vec())),
        ColumnData::Numeric(v) => v.as_ref().map(|n| {
            if n.scale() == 0 {
                SqlValue::I64(n.value() as i64)
            } else {
                SqlValue::F64(n.value() as f64 / 10f64.powi(n.scale() as i32))
            }
        }),
        ColumnData::DateTime(_) | ColumnData::SmallDateTime(_) | ColumnData::DateTime2(_) => {
            NaiveDateTime::from_sql(data)
                .ok()
                .flatten()
                .map(SqlValue::DateTime)
        }
        ColumnData::Date(_) => NaiveDate::from_sql(data).ok().flatten().map(SqlValue::Date),
        ColumnData::Time(_) => NaiveTime::from_sql(data)
            .ok()
            .flatten()
            .map(|t| SqlValue::String(t.format("%H:%M").to_string())),
        ColumnData::DateTimeOffset(_) => DateTime::<FixedOffset>::from_sql(data)
            .ok()
            .flatten()
            .map(|dto| SqlValue::DateTime(dto.naive_local())),
        _ => None,
    };
    value.unwrap_or(SqlValue::Null)
}

fn row_to_crew_count(row: &Row) -> Result<CrewCountRow> {
    let flight_date = match row.try_get::<NaiveDate, _>("FlightDate") {
        Ok(Some(d)) => d,
        // Some scripts group on a datetime column; keep its date part.
        _ => row
            .try_get::<NaiveDateTime, _>("FlightDate")
            .map_err(|e| SyncError::fetch("crew counts", e))?
            .map(|dt| dt.date())
            .ok_or_else(|| SyncError::fetch("crew counts", "FlightDate is null"))?,
    };
    let flight_code = row
        .try_get::<&str, _>("FlightCode")
        .map_err(|e| SyncError::fetch("crew counts", e))?
        .unwrap_or_default()
        .to_string();
    let origin = row
        .try_get::<&str, _>("Origin")
        .map_err(|e| SyncError::fetch("crew counts", e))?
        .unwrap_or_default()
        .to_string();
    let crew_count = match row.try_get::<i32, _>("CrewCount") {
        Ok(v) => v.map(i64::from),
        Err(_) => row
            .try_get::<i64, _>("CrewCount")
            .map_err(|e| SyncError::fetch("crew counts", e))?,
    }
    .unwrap_or(0);

    Ok(CrewCountRow {
        flight_date,
        flight_code,
        origin,
        crew_count,
    })
}
