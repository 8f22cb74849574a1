//! Static route tables used by the field transformer.
//!
//! The domestic list is enumerated per direction. A new domestic route
//! needs both of its directed pairs added here.

/// Hub stations; a leg leaving one of these is a departure.
pub const HUB_STATIONS: [&str; 2] = ["RUH", "JED"];

/// Carrier code prefixed to the derived flight number on the leg fields.
pub const LEG_CARRIER_CODE: &str = "XY";

/// Directed (origin, destination) pairs flown within the country.
pub const DOMESTIC_ROUTES: [(&str, &str); 34] = [
    ("RUH", "JED"),
    ("JED", "RUH"),
    ("RUH", "DMM"),
    ("DMM", "RUH"),
    ("RUH", "MED"),
    ("MED", "RUH"),
    ("RUH", "AHB"),
    ("AHB", "RUH"),
    ("RUH", "TUU"),
    ("TUU", "RUH"),
    ("RUH", "GIZ"),
    ("GIZ", "RUH"),
    ("RUH", "ELQ"),
    ("ELQ", "RUH"),
    ("RUH", "HAS"),
    ("HAS", "RUH"),
    ("RUH", "TIF"),
    ("TIF", "RUH"),
    ("RUH", "AJF"),
    ("AJF", "RUH"),
    ("JED", "DMM"),
    ("DMM", "JED"),
    ("JED", "AHB"),
    ("AHB", "JED"),
    ("JED", "TUU"),
    ("TUU", "JED"),
    ("JED", "GIZ"),
    ("GIZ", "JED"),
    ("JED", "ELQ"),
    ("ELQ", "JED"),
    ("JED", "HAS"),
    ("HAS", "JED"),
    ("DMM", "MED"),
    ("MED", "DMM"),
];

pub fn is_hub(station: &str) -> bool {
    HUB_STATIONS.contains(&station)
}

pub fn is_domestic(origin: &str, destination: &str) -> bool {
    DOMESTIC_ROUTES
        .iter()
        .any(|(o, d)| *o == origin && *d == destination)
}
