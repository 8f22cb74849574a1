//! SQL Server target implementation.

use super::{
    build_merge_sql, record_to_token_row, select_window_sql, staging_create_sql, BulkWriter,
    TargetStore, STAGING_TABLE,
};
use crate::config::TargetConfig;
use crate::db::{self, MssqlClient};
use crate::error::{Result, SyncError};
use crate::record::{ActionCode, FlightRecord};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use std::time::Duration;
use tiberius::Row;
use tracing::{debug, info, warn};

/// Target flight schedule table on SQL Server.
pub struct MssqlTarget {
    config: TargetConfig,
    qualified_table: String,
}

impl MssqlTarget {
    pub fn new(config: TargetConfig) -> Self {
        let qualified_table = config.qualified_table();
        Self {
            config,
            qualified_table,
        }
    }

    /// Connect and run `SELECT 1`.
    pub async fn ping(&self) -> Result<Duration> {
        db::ping(&self.config.connection, "target health check").await
    }

    pub fn qualified_table(&self) -> &str {
        &self.qualified_table
    }

    /// Stream all records into `table` over an open connection.
    async fn bulk_load(
        conn: &mut MssqlClient,
        table: &str,
        records: &[FlightRecord],
    ) -> std::result::Result<u64, String> {
        let mut bulk_load = conn
            .bulk_insert(table)
            .await
            .map_err(|e| format!("bulk insert init: {}", e))?;

        for record in records {
            bulk_load
                .send(record_to_token_row(record))
                .await
                .map_err(|e| format!("bulk insert send: {}", e))?;
        }

        let result = bulk_load
            .finalize()
            .await
            .map_err(|e| format!("bulk insert finalize: {}", e))?;
        debug!(
            "Bulk loaded {} rows into {} (reported: {})",
            records.len(),
            table,
            result.total()
        );
        Ok(records.len() as u64)
    }

    /// Staging load and merge. Runs after `BEGIN TRANSACTION`.
    async fn load_and_merge(&self, conn: &mut MssqlClient, records: &[FlightRecord]) -> Result<u64> {
        Self::bulk_load(conn, STAGING_TABLE, records)
            .await
            .map_err(|e| SyncError::bulk_update(&self.qualified_table, e))?;

        let merged = conn
            .execute(build_merge_sql(&self.qualified_table), &[])
            .await
            .map_err(|e| SyncError::bulk_update(&self.qualified_table, format!("merge: {}", e)))?
            .total();
        Ok(merged)
    }
}

#[async_trait]
impl TargetStore for MssqlTarget {
    async fn fetch_target_window(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<FlightRecord>> {
        let mut conn = db::connect(&self.config.connection, "target window").await?;
        let rows = conn
            .query(select_window_sql(&self.qualified_table), &[&from, &to])
            .await
            .map_err(|e| SyncError::fetch("target window", e))?
            .into_first_result()
            .await
            .map_err(|e| SyncError::fetch("target window", e))?;

        let records = rows
            .iter()
            .map(row_to_record)
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| SyncError::fetch("target window", e))?;
        info!(
            "Fetched {} target rows from {}",
            records.len(),
            self.qualified_table
        );
        Ok(records)
    }
}

#[async_trait]
impl BulkWriter for MssqlTarget {
    async fn bulk_insert(&self, records: &[FlightRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = db::connect(&self.config.connection, "bulk insert").await?;
        let inserted = Self::bulk_load(&mut conn, &self.qualified_table, records)
            .await
            .map_err(|e| SyncError::bulk_insert(&self.qualified_table, e))?;

        info!("Inserted {} rows into {}", inserted, self.qualified_table);
        Ok(inserted)
    }

    async fn bulk_update_via_merge(&self, records: &[FlightRecord]) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut conn = db::connect(&self.config.connection, "bulk update").await?;

        conn.simple_query(staging_create_sql(&self.qualified_table))
            .await
            .map_err(|e| {
                SyncError::bulk_update(&self.qualified_table, format!("create staging: {}", e))
            })?
            .into_results()
            .await
            .map_err(|e| {
                SyncError::bulk_update(&self.qualified_table, format!("create staging: {}", e))
            })?;

        conn.execute("BEGIN TRANSACTION", &[]).await.map_err(|e| {
            SyncError::bulk_update(&self.qualified_table, format!("begin transaction: {}", e))
        })?;

        let merged = match self.load_and_merge(&mut conn, records).await {
            Ok(merged) => merged,
            Err(e) => {
                rollback(&mut conn, &self.qualified_table).await;
                return Err(e);
            }
        };

        if let Err(e) = conn.execute("COMMIT TRANSACTION", &[]).await {
            rollback(&mut conn, &self.qualified_table).await;
            return Err(SyncError::bulk_update(
                &self.qualified_table,
                format!("commit transaction: {}", e),
            ));
        }

        let updated = merged_rows(&self.qualified_table, records.len(), merged);
        info!(
            "Merged {} staged rows into {} ({} matched)",
            records.len(),
            self.qualified_table,
            updated
        );
        Ok(updated)
    }
}

async fn rollback(conn: &mut MssqlClient, table: &str) {
    let result = conn.execute("ROLLBACK TRANSACTION", &[]).await;
    note_rollback(table, result.map(|_| ()));
}

/// Log a rollback that did not go through. Returns whether it succeeded.
fn note_rollback<E: std::fmt::Display>(table: &str, result: std::result::Result<(), E>) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!("Rollback on {} failed: {}", table, e);
            false
        }
    }
}

/// Rows the MERGE actually updated. Fewer than staged means some keys
/// were deleted from the target after the snapshot was read.
fn merged_rows(table: &str, staged: usize, merged: u64) -> u64 {
    if merged != staged as u64 {
        warn!(
            "MERGE into {} matched {} of {} staged rows",
            table, merged, staged
        );
    }
    merged
}

/// Decode one target row. Text columns may be `nvarchar` or `nchar`.
fn row_to_record(row: &Row) -> std::result::Result<FlightRecord, tiberius::error::Error> {
    let text = |name: &str| -> std::result::Result<Option<String>, tiberius::error::Error> {
        Ok(row.try_get::<&str, _>(name)?.map(str::to_string))
    };

    let sector_date = match row.try_get::<NaiveDate, _>("SectorDate") {
        Ok(Some(date)) => date,
        Ok(None) => crate::transform::unparsed_date(),
        Err(_) => row
            .try_get::<NaiveDateTime, _>("SectorDate")?
            .map(|dt| dt.date())
            .unwrap_or_else(crate::transform::unparsed_date),
    };

    let mut record = FlightRecord::new(sector_date);
    record.identifier = text("Identifier")?;
    record.flight_direction = text("FlightDirection")?;
    record.international_domestic_indicator = text("InternationalDomesticIndicator")?;
    record.airline_iata_code = text("AirlineIataCode")?;
    record.airline_icao_code = text("AirlineIcaoCode")?;
    record.flight_number = text("FlightNumber")?;
    record.flight_suffix = text("FlightSuffix")?;
    record.origin = text("Origin")?;
    record.destination = text("Destination")?;
    record.flight_start_date = text("FlightStartDate")?;
    record.flight_end_date = text("FlightEndDate")?;
    record.day_of_week = text("DayOfWeek")?;
    record.flight_type = text("FlightType")?;
    record.station_code = text("StationCode")?;
    record.scheduled_departure = text("ScheduledDeparture")?;
    record.scheduled_arrival = text("ScheduledArrival")?;
    record.actual_departure = text("ActualDeparture")?;
    record.actual_arrival = text("ActualArrival")?;
    record.aircraft_reg_no = text("AircraftRegNo")?;
    record.fleet_type = text("FleetType")?;
    record.adult_count = text("AdultCount")?;
    record.child_count = text("ChildCount")?;
    record.crew_count = text("CrewCount")?;
    record.leg_airline_code = text("LegAirlineCode")?;
    record.leg_airline_flight_number = text("LegAirlineFlightNumber")?;
    record.leg_scheduled_departure = text("LegScheduledDeparture")?;
    record.leg_scheduled_arrival = text("LegScheduledArrival")?;
    record.dep_delay = text("DepDelay")?;
    record.arr_delay = text("ArrDelay")?;
    record.estimated_time = text("EstimatedTime")?;
    record.service_type = text("ServiceType")?;
    record.schedule_code = text("ScheduleCode")?;
    record.operation_comments = text("OperationComments")?;
    record.last_action_at = row.try_get::<NaiveDateTime, _>("LastActionDate")?;
    record.last_action_code = text("LastActionCode")?.as_deref().and_then(ActionCode::parse);
    Ok(record)
}
