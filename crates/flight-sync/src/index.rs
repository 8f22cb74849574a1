//! Target-side record index keyed by the natural key.

use crate::record::{FlightKey, FlightRecord};
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Lookup over the target snapshot for one run.
#[derive(Debug, Default)]
pub struct RecordIndex {
    records: HashMap<FlightKey, FlightRecord>,
    duplicates: usize,
}

impl RecordIndex {
    /// Build the index in one pass. The first row seen for a key is kept;
    /// later rows with the same key are ignored.
    pub fn build(rows: impl IntoIterator<Item = FlightRecord>) -> Self {
        let mut records = HashMap::new();
        let mut duplicates = 0;
        for row in rows {
            match records.entry(row.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(row);
                }
                Entry::Occupied(_) => duplicates += 1,
            }
        }
        Self {
            records,
            duplicates,
        }
    }

    pub fn get(&self, key: &FlightKey) -> Option<&FlightRecord> {
        self.records.get(key)
    }

    pub fn contains(&self, key: &FlightKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of target rows dropped because their key was already indexed.
    pub fn duplicates(&self) -> usize {
        self.duplicates
    }
}
