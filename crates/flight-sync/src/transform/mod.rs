//! Source row to canonical flight record.
//!
//! Normalization rules:
//! - Text is trimmed; blank reads as absent
//! - Passenger and crew counts default to "0", delays default to ""
//! - Registrations lose their separator characters
//! - Timestamps are rendered as `%Y-%m-%d %H:%M:%S`; unparseable values
//!   resolve to 0001-01-01 00:00:00
//! - Crew counts are keyed by the start timestamp's date and the raw
//!   flight code, not the sector date or the derived flight number

pub mod routes;

use crate::crew::CrewCountLookup;
use crate::error::TransformError;
use crate::record::FlightRecord;
use crate::value::{SourceRow, SqlValue};
use chrono::{NaiveDate, NaiveDateTime};

/// Source column names of the extraction query.
pub mod columns {
    pub const IDENTIFIER: &str = "Identifier";
    pub const AIRLINE_IATA_CODE: &str = "AirlineIataCode";
    pub const AIRLINE_ICAO_CODE: &str = "AirlineIcaoCode";
    pub const FLIGHT_CODE: &str = "FlightCode";
    pub const FLIGHT_SUFFIX: &str = "FlightSuffix";
    pub const ORIGIN: &str = "Origin";
    pub const DESTINATION: &str = "Destination";
    pub const FLIGHT_START_DATE: &str = "FlightStartDate";
    pub const FLIGHT_END_DATE: &str = "FlightEndDate";
    pub const FLIGHT_TYPE: &str = "FlightType";
    pub const SCHEDULED_DEPARTURE: &str = "ScheduledDeparture";
    pub const SCHEDULED_ARRIVAL: &str = "ScheduledArrival";
    pub const ACTUAL_DEPARTURE: &str = "ActualDeparture";
    pub const ACTUAL_ARRIVAL: &str = "ActualArrival";
    pub const AIRCRAFT_REG_NO: &str = "AircraftRegNo";
    pub const FLEET_TYPE: &str = "FleetType";
    pub const ADULT_COUNT: &str = "AdultCount";
    pub const CHILD_COUNT: &str = "ChildCount";
    pub const DEP_DELAY: &str = "DepDelay";
    pub const ARR_DELAY: &str = "ArrDelay";
    pub const ESTIMATED_TIME: &str = "EstimatedTime";
    pub const SERVICE_TYPE: &str = "ServiceType";
    pub const SCHEDULE_CODE: &str = "ScheduleCode";
    pub const OPERATION_COMMENTS: &str = "OperationComments";
    pub const SECTOR_DATE: &str = "SectorDate";
}

/// Format of flight start/end timestamps in the target table.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

const DATETIME_PARSE_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%m/%d/%Y %I:%M:%S %p",
];

const DATE_PARSE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d/%m/%Y", "%Y%m%d"];

/// Stand-in for a date that could not be parsed.
pub fn unparsed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Stand-in for a timestamp that could not be parsed.
pub fn unparsed_datetime() -> NaiveDateTime {
    unparsed_date().and_time(chrono::NaiveTime::MIN)
}

/// Turn one source row into a flight record.
pub fn transform_row(
    row: &SourceRow,
    crew: &CrewCountLookup,
) -> Result<FlightRecord, TransformError> {
    use columns::*;

    let raw_flight_code = required_text(row, FLIGHT_CODE)?.unwrap_or_default();
    let origin = required_text(row, ORIGIN)?;
    let destination = text(row, DESTINATION)?;
    let start = required_timestamp(row, FLIGHT_START_DATE)?;
    let end = timestamp(row, FLIGHT_END_DATE)?;

    let sector_date = match row.get(SECTOR_DATE) {
        None | Some(SqlValue::Null) => start.date(),
        Some(value) => parse_date_value(value),
    };

    let origin_code = origin.as_deref().unwrap_or_default();
    let destination_code = destination.as_deref().unwrap_or_default();
    let departure = routes::is_hub(origin_code);

    let flight_number = remap_flight_number(&raw_flight_code)?;
    let scheduled_departure = text(row, SCHEDULED_DEPARTURE)?;
    let scheduled_arrival = text(row, SCHEDULED_ARRIVAL)?;
    // Looked up before origin moves into the record.
    let crew_count = crew.count_text(start.date(), &raw_flight_code, origin_code);

    let mut record = FlightRecord::new(sector_date);
    record.identifier = text(row, IDENTIFIER)?;
    record.flight_direction = Some(if departure { "Departure" } else { "Arrival" }.to_string());
    record.international_domestic_indicator = Some(
        if routes::is_domestic(origin_code, destination_code) {
            "Domestic"
        } else {
            "International"
        }
        .to_string(),
    );
    record.airline_iata_code = text(row, AIRLINE_IATA_CODE)?;
    record.airline_icao_code = text(row, AIRLINE_ICAO_CODE)?;
    record.flight_suffix = text(row, FLIGHT_SUFFIX)?;
    record.station_code = if departure {
        origin.clone()
    } else {
        destination.clone()
    };
    record.origin = origin;
    record.destination = destination;
    record.flight_start_date = Some(start.format(TIMESTAMP_FORMAT).to_string());
    record.flight_end_date = end.map(|ts| ts.format(TIMESTAMP_FORMAT).to_string());
    record.day_of_week = Some(start.format("%A").to_string());
    record.flight_type = text(row, FLIGHT_TYPE)?;
    record.actual_departure = text(row, ACTUAL_DEPARTURE)?;
    record.actual_arrival = text(row, ACTUAL_ARRIVAL)?;
    record.aircraft_reg_no = text(row, AIRCRAFT_REG_NO)?.map(|reg| strip_registration(&reg));
    record.fleet_type = text(row, FLEET_TYPE)?;
    record.adult_count = Some(count(row, ADULT_COUNT)?);
    record.child_count = Some(count(row, CHILD_COUNT)?);
    record.crew_count = Some(crew_count);
    record.leg_airline_code = Some(routes::LEG_CARRIER_CODE.to_string());
    record.leg_airline_flight_number = Some(format!("{}{}", routes::LEG_CARRIER_CODE, flight_number));
    record.leg_scheduled_departure = scheduled_departure.clone();
    record.leg_scheduled_arrival = scheduled_arrival.clone();
    record.scheduled_departure = scheduled_departure;
    record.scheduled_arrival = scheduled_arrival;
    record.dep_delay = Some(text(row, DEP_DELAY)?.unwrap_or_default());
    record.arr_delay = Some(text(row, ARR_DELAY)?.unwrap_or_default());
    record.estimated_time = text(row, ESTIMATED_TIME)?;
    record.service_type = text(row, SERVICE_TYPE)?;
    record.schedule_code = text(row, SCHEDULE_CODE)?;
    record.operation_comments = text(row, OPERATION_COMMENTS)?.map(|c| c.replace('\'', ""));
    record.flight_number = Some(flight_number);

    Ok(record)
}

/// Legacy flight-number remap.
///
/// A code containing `.` loses the character just before its last
/// character and gains a leading `1`: `"123.4"` becomes `"11234"`.
/// Codes without a dot pass through.
pub fn remap_flight_number(raw: &str) -> Result<String, TransformError> {
    if !raw.contains('.') {
        return Ok(raw.to_string());
    }

    let chars: Vec<char> = raw.chars().collect();
    if chars.len() < 2 {
        return Err(TransformError::MalformedFlightCode(raw.to_string()));
    }

    let drop_at = chars.len() - 2;
    let mut out = String::with_capacity(raw.len() + 1);
    out.push('1');
    out.extend(
        chars
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != drop_at)
            .map(|(_, c)| *c),
    );
    Ok(out)
}

/// Remove registration separators (`-`, `=`, space, `_`).
pub fn strip_registration(raw: &str) -> String {
    raw.chars()
        .filter(|c| !matches!(c, '-' | '=' | ' ' | '_'))
        .collect()
}

fn text(row: &SourceRow, column: &'static str) -> Result<Option<String>, TransformError> {
    match row.get(column) {
        None => Ok(None),
        Some(value) => value_text(value, column),
    }
}

fn required_text(row: &SourceRow, column: &'static str) -> Result<Option<String>, TransformError> {
    match row.get(column) {
        None => Err(TransformError::MissingColumn(column)),
        Some(value) => value_text(value, column),
    }
}

fn value_text(value: &SqlValue, column: &'static str) -> Result<Option<String>, TransformError> {
    let text = match value {
        SqlValue::Null => return Ok(None),
        SqlValue::String(s) => s.trim().to_string(),
        SqlValue::I64(i) => i.to_string(),
        SqlValue::F64(f) => f.to_string(),
        SqlValue::Bool(b) => if *b { "1" } else { "0" }.to_string(),
        SqlValue::Date(d) => d.format("%Y-%m-%d").to_string(),
        SqlValue::DateTime(dt) => dt.format(TIMESTAMP_FORMAT).to_string(),
        SqlValue::Bytes(_) => {
            return Err(TransformError::UnexpectedType {
                column,
                found: value.kind(),
            })
        }
    };
    Ok(if text.is_empty() { None } else { Some(text) })
}

fn count(row: &SourceRow, column: &'static str) -> Result<String, TransformError> {
    Ok(text(row, column)?.unwrap_or_else(|| "0".to_string()))
}

fn timestamp(row: &SourceRow, column: &'static str) -> Result<Option<NaiveDateTime>, TransformError> {
    match row.get(column) {
        None | Some(SqlValue::Null) => Ok(None),
        Some(value) => parse_timestamp_value(value, column).map(Some),
    }
}

fn required_timestamp(row: &SourceRow, column: &'static str) -> Result<NaiveDateTime, TransformError> {
    match row.get(column) {
        None => Err(TransformError::MissingColumn(column)),
        Some(SqlValue::Null) => Ok(unparsed_datetime()),
        Some(value) => parse_timestamp_value(value, column),
    }
}

fn parse_timestamp_value(value: &SqlValue, column: &'static str) -> Result<NaiveDateTime, TransformError> {
    match value {
        SqlValue::DateTime(dt) => Ok(*dt),
        SqlValue::Date(d) => Ok(d.and_time(chrono::NaiveTime::MIN)),
        SqlValue::String(s) => Ok(parse_datetime(s).unwrap_or_else(unparsed_datetime)),
        SqlValue::Bytes(_) => Err(TransformError::UnexpectedType {
            column,
            found: value.kind(),
        }),
        _ => Ok(unparsed_datetime()),
    }
}

fn parse_date_value(value: &SqlValue) -> NaiveDate {
    match value {
        SqlValue::Date(d) => *d,
        SqlValue::DateTime(dt) => dt.date(),
        SqlValue::String(s) => parse_datetime(s)
            .map(|dt| dt.date())
            .unwrap_or_else(unparsed_date),
        _ => unparsed_date(),
    }
}

/// Parse a timestamp or a bare date written in one of the accepted layouts.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    for fmt in DATETIME_PARSE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(dt);
        }
    }
    for fmt in DATE_PARSE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(d.and_time(chrono::NaiveTime::MIN));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::CrewCountRow;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    fn s(v: &str) -> SqlValue {
        SqlValue::String(v.to_string())
    }

    fn base_row() -> SourceRow {
        SourceRow::new()
            .with(columns::IDENTIFIER, s("SCH"))
            .with(columns::AIRLINE_IATA_CODE, s("XY"))
            .with(columns::AIRLINE_ICAO_CODE, s("KNE"))
            .with(columns::FLIGHT_CODE, s("123"))
            .with(columns::ORIGIN, s("RUH"))
            .with(columns::DESTINATION, s("DMM"))
            .with(columns::FLIGHT_START_DATE, SqlValue::DateTime(dt(2024, 5, 1, 23, 40)))
            .with(columns::FLIGHT_END_DATE, SqlValue::DateTime(dt(2024, 5, 2, 0, 45)))
            .with(columns::SCHEDULED_DEPARTURE, s("23:40"))
            .with(columns::SCHEDULED_ARRIVAL, s("00:45"))
            .with(columns::AIRCRAFT_REG_NO, s("HZ-NS1"))
            .with(columns::FLEET_TYPE, s("A320"))
            .with(columns::ADULT_COUNT, SqlValue::I64(150))
            .with(columns::CHILD_COUNT, SqlValue::Null)
            .with(columns::DEP_DELAY, SqlValue::Null)
            .with(columns::ARR_DELAY, s("5"))
            .with(columns::OPERATION_COMMENTS, s("crew's change"))
            .with(columns::SECTOR_DATE, SqlValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()))
    }

    #[test]
    fn test_transform_full_row() {
        let crew = CrewCountLookup::from_rows(vec![CrewCountRow {
            flight_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            flight_code: "123".to_string(),
            origin: "RUH".to_string(),
            crew_count: 6,
        }]);
        let record = transform_row(&base_row(), &crew).unwrap();

        assert_eq!(record.flight_number.as_deref(), Some("123"));
        assert_eq!(record.flight_direction.as_deref(), Some("Departure"));
        assert_eq!(record.international_domestic_indicator.as_deref(), Some("Domestic"));
        assert_eq!(record.station_code.as_deref(), Some("RUH"));
        assert_eq!(record.flight_start_date.as_deref(), Some("2024-05-01 23:40:00"));
        assert_eq!(record.flight_end_date.as_deref(), Some("2024-05-02 00:45:00"));
        assert_eq!(record.day_of_week.as_deref(), Some("Wednesday"));
        assert_eq!(record.aircraft_reg_no.as_deref(), Some("HZNS1"));
        assert_eq!(record.adult_count.as_deref(), Some("150"));
        assert_eq!(record.child_count.as_deref(), Some("0"));
        assert_eq!(record.crew_count.as_deref(), Some("6"));
        assert_eq!(record.dep_delay.as_deref(), Some(""));
        assert_eq!(record.arr_delay.as_deref(), Some("5"));
        assert_eq!(record.operation_comments.as_deref(), Some("crews change"));
        assert_eq!(record.leg_airline_code.as_deref(), Some("XY"));
        assert_eq!(record.leg_airline_flight_number.as_deref(), Some("XY123"));
        assert_eq!(record.leg_scheduled_departure.as_deref(), Some("23:40"));
        assert_eq!(record.leg_scheduled_arrival.as_deref(), Some("00:45"));
        assert_eq!(record.sector_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        assert!(record.last_action_code.is_none());
    }

    #[test]
    fn test_arrival_and_international() {
        let row = base_row()
            .with(columns::ORIGIN, s("JFK"))
            .with(columns::DESTINATION, s("RUH"));
        let record = transform_row(&row, &CrewCountLookup::default()).unwrap();
        assert_eq!(record.flight_direction.as_deref(), Some("Arrival"));
        assert_eq!(record.international_domestic_indicator.as_deref(), Some("International"));
        assert_eq!(record.station_code.as_deref(), Some("RUH"));
    }

    #[test]
    fn test_domestic_indicator_examples() {
        let domestic = transform_row(&base_row(), &CrewCountLookup::default()).unwrap();
        assert_eq!(domestic.international_domestic_indicator.as_deref(), Some("Domestic"));

        let row = base_row().with(columns::DESTINATION, s("JFK"));
        let international = transform_row(&row, &CrewCountLookup::default()).unwrap();
        assert_eq!(
            international.international_domestic_indicator.as_deref(),
            Some("International")
        );
    }

    #[test]
    fn test_crew_key_uses_start_date_and_raw_code() {
        // Sector date is a day earlier than the departure timestamp, and the
        // raw code differs from the remapped flight number.
        let row = base_row()
            .with(columns::FLIGHT_CODE, s("123.4"))
            .with(columns::FLIGHT_START_DATE, SqlValue::DateTime(dt(2024, 5, 2, 0, 30)))
            .with(columns::SECTOR_DATE, SqlValue::Date(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap()));
        let crew = CrewCountLookup::from_rows(vec![
            CrewCountRow {
                flight_date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
                flight_code: "123.4".to_string(),
                origin: "RUH".to_string(),
                crew_count: 7,
            },
            CrewCountRow {
                flight_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                flight_code: "11234".to_string(),
                origin: "RUH".to_string(),
                crew_count: 99,
            },
        ]);
        let record = transform_row(&row, &crew).unwrap();
        assert_eq!(record.flight_number.as_deref(), Some("11234"));
        assert_eq!(record.crew_count.as_deref(), Some("7"));
        assert_eq!(record.sector_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_crew_key_uses_origin_on_arrivals() {
        let row = base_row()
            .with(columns::ORIGIN, s("DMM"))
            .with(columns::DESTINATION, s("RUH"));
        let crew = CrewCountLookup::from_rows(vec![
            CrewCountRow {
                flight_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                flight_code: "123".to_string(),
                origin: "DMM".to_string(),
                crew_count: 5,
            },
            CrewCountRow {
                flight_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                flight_code: "123".to_string(),
                origin: "RUH".to_string(),
                crew_count: 8,
            },
        ]);
        let record = transform_row(&row, &crew).unwrap();
        assert_eq!(record.flight_direction.as_deref(), Some("Arrival"));
        assert_eq!(record.station_code.as_deref(), Some("RUH"));
        assert_eq!(record.origin.as_deref(), Some("DMM"));
        assert_eq!(record.crew_count.as_deref(), Some("5"));
    }

    #[test]
    fn test_crew_count_defaults_to_zero() {
        let record = transform_row(&base_row(), &CrewCountLookup::default()).unwrap();
        assert_eq!(record.crew_count.as_deref(), Some("0"));
    }

    #[test]
    fn test_registration_strip() {
        assert_eq!(strip_registration("HZAS1"), "HZAS1");
        assert_eq!(strip_registration("HZ-AS1"), "HZAS1");
        assert_eq!(strip_registration("HZ_AS-1 "), "HZAS1");
        assert_eq!(strip_registration("HZ=AS 1"), "HZAS1");
        assert_eq!(strip_registration(&strip_registration("HZ-AS1")), "HZAS1");
    }

    // The dot remap is a legacy data-cleanup rule kept exactly as observed:
    // the character before the last one is removed, whatever it is.
    #[test]
    fn test_flight_number_dot_remap_literal() {
        assert_eq!(remap_flight_number("123.4").unwrap(), "11234");
        assert_eq!(remap_flight_number("12.3").unwrap(), "1123");
        assert_eq!(remap_flight_number("1.23").unwrap(), "11.3");
        assert_eq!(remap_flight_number("123").unwrap(), "123");
    }

    #[test]
    fn test_flight_number_dot_only_is_malformed() {
        assert_eq!(
            remap_flight_number("."),
            Err(TransformError::MalformedFlightCode(".".to_string()))
        );
    }

    #[test]
    fn test_missing_flight_code_fails() {
        let mut row = SourceRow::new();
        row.insert(columns::ORIGIN, s("RUH"));
        row.insert(columns::FLIGHT_START_DATE, SqlValue::DateTime(dt(2024, 5, 1, 8, 0)));
        let err = transform_row(&row, &CrewCountLookup::default()).unwrap_err();
        assert_eq!(err, TransformError::MissingColumn(columns::FLIGHT_CODE));
    }

    #[test]
    fn test_binary_text_column_fails() {
        let row = base_row().with(columns::AIRCRAFT_REG_NO, SqlValue::Bytes(vec![0x48, 0x5a]));
        let err = transform_row(&row, &CrewCountLookup::default()).unwrap_err();
        assert!(err.to_string().contains("AircraftRegNo"));
    }

    #[test]
    fn test_unparseable_sector_date_resolves_to_minimum() {
        let row = base_row().with(columns::SECTOR_DATE, s("not a date"));
        let record = transform_row(&row, &CrewCountLookup::default()).unwrap();
        assert_eq!(record.sector_date, unparsed_date());
    }

    #[test]
    fn test_sector_date_falls_back_to_start_date() {
        let row = base_row().with(columns::SECTOR_DATE, SqlValue::Null);
        let record = transform_row(&row, &CrewCountLookup::default()).unwrap();
        assert_eq!(record.sector_date, NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
    }

    #[test]
    fn test_string_timestamps_are_parsed() {
        let row = base_row()
            .with(columns::FLIGHT_START_DATE, s("2024-05-01 07:05"))
            .with(columns::FLIGHT_END_DATE, s("garbage"));
        let record = transform_row(&row, &CrewCountLookup::default()).unwrap();
        assert_eq!(record.flight_start_date.as_deref(), Some("2024-05-01 07:05:00"));
        assert_eq!(record.flight_end_date.as_deref(), Some("0001-01-01 00:00:00"));
    }

    #[test]
    fn test_parse_datetime_layouts() {
        assert_eq!(parse_datetime("2024-05-01 07:05:00"), Some(dt(2024, 5, 1, 7, 5)));
        assert_eq!(parse_datetime("2024-05-01T07:05:00.000"), Some(dt(2024, 5, 1, 7, 5)));
        assert_eq!(parse_datetime("01/05/2024 07:05"), Some(dt(2024, 5, 1, 7, 5)));
        assert_eq!(parse_datetime("2024-05-01"), Some(dt(2024, 5, 1, 0, 0)));
        assert_eq!(parse_datetime(""), None);
    }
}
