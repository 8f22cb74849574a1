//! Target database: snapshot reads, bulk insert and staged merge updates.

mod mssql;

pub use mssql::MssqlTarget;

use crate::error::Result;
use crate::record::{FlightRecord, TrackedField, COLUMNS, KEY_COLUMNS};
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use std::borrow::Cow;
use tiberius::{ColumnData, TokenRow};
use tracing::warn;

/// Session temp table the update batch is loaded into.
pub const STAGING_TABLE: &str = "#FlightScheduleStaging";

/// Trait for target snapshot reads.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Stored records whose sector date falls in `[from, to]`.
    async fn fetch_target_window(&self, from: NaiveDate, to: NaiveDate)
        -> Result<Vec<FlightRecord>>;
}

/// Trait for batch writes into the target table.
#[async_trait]
pub trait BulkWriter: Send + Sync {
    /// Bulk load new records. Returns the number of rows sent.
    async fn bulk_insert(&self, records: &[FlightRecord]) -> Result<u64>;

    /// Overwrite tracked fields of existing records in one transaction.
    /// Returns the number of target rows the merge matched.
    async fn bulk_update_via_merge(&self, records: &[FlightRecord]) -> Result<u64>;
}

/// Quote a SQL Server identifier with brackets.
pub fn quote_ident(name: &str) -> String {
    format!("[{}]", name.replace(']', "]]"))
}

fn column_list() -> String {
    COLUMNS
        .iter()
        .map(|c| quote_ident(c))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Window read against the target table, parameterized on `@P1`/`@P2`.
pub fn select_window_sql(qualified_table: &str) -> String {
    format!(
        "SELECT {} FROM {} WHERE {} BETWEEN @P1 AND @P2",
        column_list(),
        qualified_table,
        quote_ident("SectorDate")
    )
}

/// Create an empty staging table with the target's column shape.
pub fn staging_create_sql(qualified_table: &str) -> String {
    format!(
        "IF OBJECT_ID('tempdb..{0}') IS NOT NULL DROP TABLE {0};\n\
         SELECT TOP 0 {1} INTO {0} FROM {2};",
        STAGING_TABLE,
        column_list(),
        qualified_table
    )
}

/// MERGE from staging into the target, updating matched rows only.
///
/// Write-once columns and the key itself are left untouched.
pub fn build_merge_sql(qualified_table: &str) -> String {
    let join_condition: Vec<String> = KEY_COLUMNS
        .iter()
        .map(|k| format!("target.{0} = source.{0}", quote_ident(k)))
        .collect();

    let mut set_cols: Vec<&str> = TrackedField::ALL.iter().map(|f| f.column()).collect();
    set_cols.push("LastActionDate");
    set_cols.push("LastActionCode");
    let update_set: Vec<String> = set_cols
        .iter()
        .map(|c| format!("target.{0} = source.{0}", quote_ident(c)))
        .collect();

    // TABLOCK keeps a concurrent writer from deadlocking on S->X conversion.
    format!(
        "MERGE INTO {} WITH (TABLOCK) AS target\n\
         USING {} AS source\n\
         ON {}\n\
         WHEN MATCHED THEN UPDATE SET {};",
        qualified_table,
        STAGING_TABLE,
        join_condition.join(" AND "),
        update_set.join(", ")
    )
}

/// Bulk-load row in `COLUMNS` order.
pub(crate) fn record_to_token_row(record: &FlightRecord) -> TokenRow<'static> {
    let text = |v: &Option<String>| ColumnData::String(v.clone().map(Cow::Owned));

    let mut row = TokenRow::new();
    row.push(text(&record.identifier));
    row.push(text(&record.flight_direction));
    row.push(text(&record.international_domestic_indicator));
    row.push(text(&record.airline_iata_code));
    row.push(text(&record.airline_icao_code));
    row.push(text(&record.flight_number));
    row.push(text(&record.flight_suffix));
    row.push(text(&record.origin));
    row.push(text(&record.destination));
    row.push(text(&record.flight_start_date));
    row.push(text(&record.flight_end_date));
    row.push(text(&record.day_of_week));
    row.push(text(&record.flight_type));
    row.push(text(&record.station_code));
    row.push(text(&record.scheduled_departure));
    row.push(text(&record.scheduled_arrival));
    row.push(text(&record.actual_departure));
    row.push(text(&record.actual_arrival));
    row.push(text(&record.aircraft_reg_no));
    row.push(text(&record.fleet_type));
    row.push(text(&record.adult_count));
    row.push(text(&record.child_count));
    row.push(text(&record.crew_count));
    row.push(text(&record.leg_airline_code));
    row.push(text(&record.leg_airline_flight_number));
    row.push(text(&record.leg_scheduled_departure));
    row.push(text(&record.leg_scheduled_arrival));
    row.push(text(&record.dep_delay));
    row.push(text(&record.arr_delay));
    row.push(text(&record.estimated_time));
    row.push(text(&record.service_type));
    row.push(text(&record.schedule_code));
    row.push(text(&record.operation_comments));
    row.push(date_column(record.sector_date));
    row.push(datetime_column(record.last_action_at));
    row.push(ColumnData::String(
        record
            .last_action_code
            .map(|code| Cow::Borrowed(code.as_str())),
    ));
    row
}

/// Days since 0001-01-01, the TDS date epoch.
fn tds_days(date: NaiveDate) -> Option<u32> {
    let epoch = NaiveDate::from_ymd_opt(1, 1, 1)?;
    u32::try_from((date - epoch).num_days()).ok()
}

fn date_column(date: NaiveDate) -> ColumnData<'static> {
    match tds_days(date) {
        Some(days) => ColumnData::Date(Some(tiberius::time::Date::new(days))),
        None => {
            warn!("Date {} out of range, sending NULL", date);
            ColumnData::Date(None)
        }
    }
}

fn datetime_column(value: Option<NaiveDateTime>) -> ColumnData<'static> {
    let Some(dt) = value else {
        return ColumnData::DateTime2(None);
    };
    let Some(days) = tds_days(dt.date()) else {
        warn!("Timestamp {} out of range, sending NULL", dt);
        return ColumnData::DateTime2(None);
    };
    let time = dt.time();
    let nanos = time.num_seconds_from_midnight() as u64 * 1_000_000_000 + time.nanosecond() as u64;
    // Scale 7: 100ns increments.
    let time = tiberius::time::Time::new(nanos / 100, 7);
    ColumnData::DateTime2(Some(tiberius::time::DateTime2::new(
        tiberius::time::Date::new(days),
        time,
    )))
}
