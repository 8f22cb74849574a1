//! Canonical flight record shape, natural key and tracked fields.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Persisted column order of the target and staging tables.
pub const COLUMNS: [&str; 36] = [
    "Identifier",
    "FlightDirection",
    "InternationalDomesticIndicator",
    "AirlineIataCode",
    "AirlineIcaoCode",
    "FlightNumber",
    "FlightSuffix",
    "Origin",
    "Destination",
    "FlightStartDate",
    "FlightEndDate",
    "DayOfWeek",
    "FlightType",
    "StationCode",
    "ScheduledDeparture",
    "ScheduledArrival",
    "ActualDeparture",
    "ActualArrival",
    "AircraftRegNo",
    "FleetType",
    "AdultCount",
    "ChildCount",
    "CrewCount",
    "LegAirlineCode",
    "LegAirlineFlightNumber",
    "LegScheduledDeparture",
    "LegScheduledArrival",
    "DepDelay",
    "ArrDelay",
    "EstimatedTime",
    "ServiceType",
    "ScheduleCode",
    "OperationComments",
    "SectorDate",
    "LastActionDate",
    "LastActionCode",
];

/// Key columns used to join staging rows to target rows.
pub const KEY_COLUMNS: [&str; 3] = ["FlightNumber", "SectorDate", "Origin"];

/// How a record reached the target table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionCode {
    Add,
    Update,
}

impl ActionCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionCode::Add => "Add",
            ActionCode::Update => "Update",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "Add" => Some(ActionCode::Add),
            "Update" => Some(ActionCode::Update),
            _ => None,
        }
    }
}

impl fmt::Display for ActionCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Natural key: (flight number, origin station, sector date).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FlightKey {
    pub flight_number: String,
    pub origin: String,
    pub sector_date: NaiveDate,
}

impl FlightKey {
    /// Build a key; text components are trimmed so padded `nchar` values match.
    pub fn new(flight_number: Option<&str>, origin: Option<&str>, sector_date: NaiveDate) -> Self {
        Self {
            flight_number: flight_number.unwrap_or_default().trim().to_string(),
            origin: origin.unwrap_or_default().trim().to_string(),
            sector_date,
        }
    }
}

impl fmt::Display for FlightKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.flight_number, self.origin, self.sector_date)
    }
}

/// One synchronized flight leg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlightRecord {
    pub identifier: Option<String>,
    pub flight_direction: Option<String>,
    pub international_domestic_indicator: Option<String>,
    pub airline_iata_code: Option<String>,
    pub airline_icao_code: Option<String>,
    pub flight_number: Option<String>,
    pub flight_suffix: Option<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
    pub flight_start_date: Option<String>,
    pub flight_end_date: Option<String>,
    pub day_of_week: Option<String>,
    pub flight_type: Option<String>,
    pub station_code: Option<String>,
    pub scheduled_departure: Option<String>,
    pub scheduled_arrival: Option<String>,
    pub actual_departure: Option<String>,
    pub actual_arrival: Option<String>,
    pub aircraft_reg_no: Option<String>,
    pub fleet_type: Option<String>,
    pub adult_count: Option<String>,
    pub child_count: Option<String>,
    pub crew_count: Option<String>,
    pub leg_airline_code: Option<String>,
    pub leg_airline_flight_number: Option<String>,
    pub leg_scheduled_departure: Option<String>,
    pub leg_scheduled_arrival: Option<String>,
    pub dep_delay: Option<String>,
    pub arr_delay: Option<String>,
    pub estimated_time: Option<String>,
    pub service_type: Option<String>,
    pub schedule_code: Option<String>,
    pub operation_comments: Option<String>,
    pub sector_date: NaiveDate,
    pub last_action_at: Option<NaiveDateTime>,
    pub last_action_code: Option<ActionCode>,
}

impl FlightRecord {
    /// Empty record for the given sector date.
    pub fn new(sector_date: NaiveDate) -> Self {
        Self {
            identifier: None,
            flight_direction: None,
            international_domestic_indicator: None,
            airline_iata_code: None,
            airline_icao_code: None,
            flight_number: None,
            flight_suffix: None,
            origin: None,
            destination: None,
            flight_start_date: None,
            flight_end_date: None,
            day_of_week: None,
            flight_type: None,
            station_code: None,
            scheduled_departure: None,
            scheduled_arrival: None,
            actual_departure: None,
            actual_arrival: None,
            aircraft_reg_no: None,
            fleet_type: None,
            adult_count: None,
            child_count: None,
            crew_count: None,
            leg_airline_code: None,
            leg_airline_flight_number: None,
            leg_scheduled_departure: None,
            leg_scheduled_arrival: None,
            dep_delay: None,
            arr_delay: None,
            estimated_time: None,
            service_type: None,
            schedule_code: None,
            operation_comments: None,
            sector_date,
            last_action_at: None,
            last_action_code: None,
        }
    }

    pub fn key(&self) -> FlightKey {
        FlightKey::new(
            self.flight_number.as_deref(),
            self.origin.as_deref(),
            self.sector_date,
        )
    }

    /// Stamp the record with the action that will write it.
    pub fn stamped(mut self, code: ActionCode, at: NaiveDateTime) -> Self {
        self.last_action_code = Some(code);
        self.last_action_at = Some(at);
        self
    }
}

/// Fields compared between source and target to detect an update.
///
/// Identifier, airline codes, direction, indicator, flight type, station
/// code, suffix and the leg carrier pair are written on insert only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackedField {
    Origin,
    Destination,
    FlightStartDate,
    FlightEndDate,
    DayOfWeek,
    ScheduledDeparture,
    ScheduledArrival,
    ActualDeparture,
    ActualArrival,
    AircraftRegNo,
    FleetType,
    AdultCount,
    ChildCount,
    CrewCount,
    LegScheduledDeparture,
    LegScheduledArrival,
    EstimatedTime,
    DepDelay,
    ArrDelay,
    ServiceType,
    ScheduleCode,
    OperationComments,
}

impl TrackedField {
    pub const ALL: [TrackedField; 22] = [
        TrackedField::Origin,
        TrackedField::Destination,
        TrackedField::FlightStartDate,
        TrackedField::FlightEndDate,
        TrackedField::DayOfWeek,
        TrackedField::ScheduledDeparture,
        TrackedField::ScheduledArrival,
        TrackedField::ActualDeparture,
        TrackedField::ActualArrival,
        TrackedField::AircraftRegNo,
        TrackedField::FleetType,
        TrackedField::AdultCount,
        TrackedField::ChildCount,
        TrackedField::CrewCount,
        TrackedField::LegScheduledDeparture,
        TrackedField::LegScheduledArrival,
        TrackedField::EstimatedTime,
        TrackedField::DepDelay,
        TrackedField::ArrDelay,
        TrackedField::ServiceType,
        TrackedField::ScheduleCode,
        TrackedField::OperationComments,
    ];

    /// Target column holding this field.
    pub fn column(self) -> &'static str {
        match self {
            TrackedField::Origin => "Origin",
            TrackedField::Destination => "Destination",
            TrackedField::FlightStartDate => "FlightStartDate",
            TrackedField::FlightEndDate => "FlightEndDate",
            TrackedField::DayOfWeek => "DayOfWeek",
            TrackedField::ScheduledDeparture => "ScheduledDeparture",
            TrackedField::ScheduledArrival => "ScheduledArrival",
            TrackedField::ActualDeparture => "ActualDeparture",
            TrackedField::ActualArrival => "ActualArrival",
            TrackedField::AircraftRegNo => "AircraftRegNo",
            TrackedField::FleetType => "FleetType",
            TrackedField::AdultCount => "AdultCount",
            TrackedField::ChildCount => "ChildCount",
            TrackedField::CrewCount => "CrewCount",
            TrackedField::LegScheduledDeparture => "LegScheduledDeparture",
            TrackedField::LegScheduledArrival => "LegScheduledArrival",
            TrackedField::EstimatedTime => "EstimatedTime",
            TrackedField::DepDelay => "DepDelay",
            TrackedField::ArrDelay => "ArrDelay",
            TrackedField::ServiceType => "ServiceType",
            TrackedField::ScheduleCode => "ScheduleCode",
            TrackedField::OperationComments => "OperationComments",
        }
    }

    pub fn value(self, record: &FlightRecord) -> Option<&str> {
        let value = match self {
            TrackedField::Origin => &record.origin,
            TrackedField::Destination => &record.destination,
            TrackedField::FlightStartDate => &record.flight_start_date,
            TrackedField::FlightEndDate => &record.flight_end_date,
            TrackedField::DayOfWeek => &record.day_of_week,
            TrackedField::ScheduledDeparture => &record.scheduled_departure,
            TrackedField::ScheduledArrival => &record.scheduled_arrival,
            TrackedField::ActualDeparture => &record.actual_departure,
            TrackedField::ActualArrival => &record.actual_arrival,
            TrackedField::AircraftRegNo => &record.aircraft_reg_no,
            TrackedField::FleetType => &record.fleet_type,
            TrackedField::AdultCount => &record.adult_count,
            TrackedField::ChildCount => &record.child_count,
            TrackedField::CrewCount => &record.crew_count,
            TrackedField::LegScheduledDeparture => &record.leg_scheduled_departure,
            TrackedField::LegScheduledArrival => &record.leg_scheduled_arrival,
            TrackedField::EstimatedTime => &record.estimated_time,
            TrackedField::DepDelay => &record.dep_delay,
            TrackedField::ArrDelay => &record.arr_delay,
            TrackedField::ServiceType => &record.service_type,
            TrackedField::ScheduleCode => &record.schedule_code,
            TrackedField::OperationComments => &record.operation_comments,
        };
        value.as_deref()
    }

    /// Stored padding is tolerated on the target side for these two fields.
    pub fn trims_target(self) -> bool {
        matches!(self, TrackedField::Origin | TrackedField::Destination)
    }
}
