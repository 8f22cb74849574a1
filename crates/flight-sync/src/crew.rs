//! Crew-count lookup built from the source crew aggregate.

use crate::value::CrewCountRow;
use chrono::NaiveDate;
use std::collections::HashMap;

/// Key: (flight date, raw flight code, origin).
pub type CrewKey = (NaiveDate, String, String);

/// Crew counts for one run, keyed by date, raw flight code and origin.
#[derive(Debug, Default)]
pub struct CrewCountLookup {
    counts: HashMap<CrewKey, i64>,
}

impl CrewCountLookup {
    /// Build the lookup. A repeated key overwrites the earlier count.
    pub fn from_rows(rows: impl IntoIterator<Item = CrewCountRow>) -> Self {
        let mut counts = HashMap::new();
        for row in rows {
            let key = (
                row.flight_date,
                row.flight_code.trim().to_string(),
                row.origin.trim().to_string(),
            );
            counts.insert(key, row.crew_count);
        }
        Self { counts }
    }

    /// Crew count for the key, 0 when absent.
    pub fn get(&self, flight_date: NaiveDate, flight_code: &str, origin: &str) -> i64 {
        self.counts
            .get(&(flight_date, flight_code.to_string(), origin.to_string()))
            .copied()
            .unwrap_or(0)
    }

    /// Crew count rendered the way the target column stores it.
    pub fn count_text(&self, flight_date: NaiveDate, flight_code: &str, origin: &str) -> String {
        self.get(flight_date, flight_code, origin).to_string()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(day: u32, code: &str, origin: &str, count: i64) -> CrewCountRow {
        CrewCountRow {
            flight_date: NaiveDate::from_ymd_opt(2024, 5, day).unwrap(),
            flight_code: code.to_string(),
            origin: origin.to_string(),
            crew_count: count,
        }
    }

    #[test]
    fn test_lookup_hit() {
        let lookup = CrewCountLookup::from_rows(vec![row(1, "123", "RUH", 9)]);
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(lookup.get(date, "123", "RUH"), 9);
        assert_eq!(lookup.count_text(date, "123", "RUH"), "9");
    }

    #[test]
    fn test_absent_key_is_zero() {
        let lookup = CrewCountLookup::from_rows(vec![row(1, "123", "RUH", 9)]);
        let date = NaiveDate::from_ymd_opt(2024, 5, 2).unwrap();
        assert_eq!(lookup.get(date, "123", "RUH"), 0);
        assert_eq!(lookup.count_text(date, "123", "RUH"), "0");
        assert_eq!(CrewCountLookup::default().count_text(date, "1", "JED"), "0");
    }

    #[test]
    fn test_duplicate_key_overwrites() {
        let lookup =
            CrewCountLookup::from_rows(vec![row(1, "123", "RUH", 9), row(1, "123 ", "RUH", 11)]);
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        assert_eq!(lookup.len(), 1);
        assert_eq!(lookup.get(date, "123", "RUH"), 11);
    }
}
