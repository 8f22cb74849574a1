//! Diff engine: classify transformed records as inserts, updates or unchanged.

use crate::index::RecordIndex;
use crate::record::{ActionCode, FlightKey, FlightRecord, TrackedField};
use chrono::NaiveDateTime;
use std::collections::HashMap;
use tracing::debug;

/// Outcome for one record pushed through the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Insert,
    Update(Vec<TrackedField>),
    Unchanged,
}

/// Insert and update batches produced by one run.
#[derive(Debug, Default)]
pub struct SyncBatches {
    pub inserts: Vec<FlightRecord>,
    pub updates: Vec<FlightRecord>,
    /// Records equal to their target row in every tracked field.
    pub unchanged: usize,
    /// Earlier source rows replaced by a later row with the same key.
    pub superseded: usize,
}

impl SyncBatches {
    pub fn is_empty(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty()
    }

    /// Move the last-action timestamp of every batched record to `at`.
    pub fn restamp(&mut self, at: NaiveDateTime) {
        for record in self.inserts.iter_mut().chain(self.updates.iter_mut()) {
            record.last_action_at = Some(at);
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Slot {
    Insert(usize),
    Update(usize),
}

/// Accumulates batches against a target index.
///
/// Batch order follows push order. A key pushed twice keeps the batch
/// position of its first occurrence and the content of its last.
pub struct Reconciler<'a> {
    index: &'a RecordIndex,
    action_at: NaiveDateTime,
    inserts: Vec<Option<FlightRecord>>,
    updates: Vec<Option<FlightRecord>>,
    pending: HashMap<FlightKey, Slot>,
    unchanged: usize,
    superseded: usize,
}

impl<'a> Reconciler<'a> {
    /// `action_at` is written to the last-action timestamp of every record.
    pub fn new(index: &'a RecordIndex, action_at: NaiveDateTime) -> Self {
        Self {
            index,
            action_at,
            inserts: Vec::new(),
            updates: Vec::new(),
            pending: HashMap::new(),
            unchanged: 0,
            superseded: 0,
        }
    }

    pub fn push(&mut self, record: FlightRecord) -> Decision {
        let key = record.key();

        let decision = match self.index.get(&key) {
            None => Decision::Insert,
            Some(target) => {
                let changed = diff(&record, target);
                if changed.is_empty() {
                    Decision::Unchanged
                } else {
                    Decision::Update(changed)
                }
            }
        };

        let previous = self.pending.get(&key).copied();
        if previous.is_some() {
            self.superseded += 1;
        }

        match (&decision, previous) {
            (Decision::Insert, Some(Slot::Insert(pos))) => {
                self.inserts[pos] = Some(record.stamped(ActionCode::Add, self.action_at));
            }
            (Decision::Insert, _) => {
                self.pending.insert(key.clone(), Slot::Insert(self.inserts.len()));
                self.inserts
                    .push(Some(record.stamped(ActionCode::Add, self.action_at)));
            }
            (Decision::Update(_), Some(Slot::Update(pos))) => {
                self.updates[pos] = Some(record.stamped(ActionCode::Update, self.action_at));
            }
            (Decision::Update(_), _) => {
                self.pending.insert(key.clone(), Slot::Update(self.updates.len()));
                self.updates
                    .push(Some(record.stamped(ActionCode::Update, self.action_at)));
            }
            (Decision::Unchanged, previous) => {
                // The latest row matches the target; an earlier pending update is stale.
                if let Some(Slot::Update(pos)) = previous {
                    self.updates[pos] = None;
                    self.pending.remove(&key);
                }
                self.unchanged += 1;
            }
        }

        match &decision {
            Decision::Insert => debug!("{}: insert", key),
            Decision::Update(fields) => debug!("{}: update {:?}", key, fields),
            Decision::Unchanged => debug!("{}: unchanged", key),
        }

        decision
    }

    pub fn finish(self) -> SyncBatches {
        SyncBatches {
            inserts: self.inserts.into_iter().flatten().collect(),
            updates: self.updates.into_iter().flatten().collect(),
            unchanged: self.unchanged,
            superseded: self.superseded,
        }
    }
}

/// Tracked fields whose source value differs from the stored target value.
///
/// Comparison is exact and case-sensitive. Only the target's origin and
/// destination are trimmed, to tolerate padded storage.
pub fn diff(source: &FlightRecord, target: &FlightRecord) -> Vec<TrackedField> {
    TrackedField::ALL
        .into_iter()
        .filter(|field| {
            let ours = field.value(source);
            let theirs = field.value(target);
            if field.trims_target() {
                ours != theirs.map(str::trim)
            } else {
                ours != theirs
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::collections::HashSet;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    fn record(flight: &str, reg: &str) -> FlightRecord {
        let mut r = FlightRecord::new(NaiveDate::from_ymd_opt(2024, 5, 1).unwrap());
        r.flight_number = Some(flight.to_string());
        r.origin = Some("RUH".to_string());
        r.destination = Some("DMM".to_string());
        r.aircraft_reg_no = Some(reg.to_string());
        r.adult_count = Some("0".to_string());
        r
    }

    #[test]
    fn test_unknown_key_is_insert() {
        let index = RecordIndex::default();
        let mut rec = Reconciler::new(&index, now());
        assert_eq!(rec.push(record("1", "HZAS1")), Decision::Insert);

        let batches = rec.finish();
        assert_eq!(batches.inserts.len(), 1);
        assert!(batches.updates.is_empty());
        assert_eq!(batches.inserts[0].last_action_code, Some(ActionCode::Add));
        assert_eq!(batches.inserts[0].last_action_at, Some(now()));
    }

    #[test]
    fn test_changed_field_is_update() {
        let index = RecordIndex::build(vec![record("1", "HZAS1")]);
        let mut rec = Reconciler::new(&index, now());
        assert_eq!(
            rec.push(record("1", "HZAS2")),
            Decision::Update(vec![TrackedField::AircraftRegNo])
        );

        let batches = rec.finish();
        assert!(batches.inserts.is_empty());
        assert_eq!(batches.updates.len(), 1);
        assert_eq!(batches.updates[0].last_action_code, Some(ActionCode::Update));
    }

    #[test]
    fn test_identical_record_is_dropped() {
        let index = RecordIndex::build(vec![record("1", "HZAS1")]);
        let mut rec = Reconciler::new(&index, now());
        assert_eq!(rec.push(record("1", "HZAS1")), Decision::Unchanged);

        let batches = rec.finish();
        assert!(batches.is_empty());
        assert_eq!(batches.unchanged, 1);
    }

    #[test]
    fn test_write_once_fields_do_not_trigger_update() {
        let mut stored = record("1", "HZAS1");
        stored.identifier = Some("OLD".to_string());
        stored.flight_type = Some("J".to_string());
        stored.leg_airline_flight_number = Some("XY9".to_string());
        let index = RecordIndex::build(vec![stored]);

        let mut incoming = record("1", "HZAS1");
        incoming.identifier = Some("NEW".to_string());
        incoming.flight_type = Some("C".to_string());
        incoming.leg_airline_flight_number = Some("XY1".to_string());

        let mut rec = Reconciler::new(&index, now());
        assert_eq!(rec.push(incoming), Decision::Unchanged);
    }

    #[test]
    fn test_target_origin_padding_is_tolerated() {
        let mut stored = record("1", "HZAS1");
        stored.origin = Some("RUH ".to_string());
        stored.destination = Some("DMM  ".to_string());
        let index = RecordIndex::build(vec![stored]);

        let mut rec = Reconciler::new(&index, now());
        assert_eq!(rec.push(record("1", "HZAS1")), Decision::Unchanged);
    }

    #[test]
    fn test_comparison_is_case_sensitive_and_untrimmed() {
        let index = RecordIndex::build(vec![record("1", "HZAS1")]);

        let mut rec = Reconciler::new(&index, now());
        assert!(matches!(rec.push(record("1", "hzas1")), Decision::Update(_)));

        let mut padded = record("1", "HZAS1");
        padded.fleet_type = Some("A320 ".to_string());
        let mut stored = record("1", "HZAS1");
        stored.fleet_type = Some("A320".to_string());
        let index = RecordIndex::build(vec![stored]);
        let mut rec = Reconciler::new(&index, now());
        assert_eq!(rec.push(padded), Decision::Update(vec![TrackedField::FleetType]));
    }

    #[test]
    fn test_batches_are_disjoint_and_ordered() {
        let index = RecordIndex::build(vec![record("2", "HZAS1"), record("4", "HZAS1")]);
        let mut rec = Reconciler::new(&index, now());
        for (flight, reg) in [("1", "A"), ("2", "B"), ("3", "C"), ("4", "HZAS1"), ("5", "E")] {
            rec.push(record(flight, reg));
        }
        let batches = rec.finish();

        let insert_keys: Vec<_> = batches.inserts.iter().map(|r| r.key()).collect();
        let update_keys: Vec<_> = batches.updates.iter().map(|r| r.key()).collect();
        let flights: Vec<_> = insert_keys.iter().map(|k| k.flight_number.as_str()).collect();
        assert_eq!(flights, vec!["1", "3", "5"]);
        assert_eq!(update_keys.len(), 1);
        assert_eq!(update_keys[0].flight_number, "2");

        let inserts: HashSet<_> = insert_keys.into_iter().collect();
        assert!(update_keys.iter().all(|k| !inserts.contains(k)));
        assert_eq!(batches.unchanged, 1);
    }

    #[test]
    fn test_duplicate_source_key_last_write_wins() {
        let index = RecordIndex::default();
        let mut rec = Reconciler::new(&index, now());
        rec.push(record("1", "FIRST"));
        rec.push(record("2", "OTHER"));
        rec.push(record("1", "LAST"));

        let batches = rec.finish();
        assert_eq!(batches.inserts.len(), 2);
        assert_eq!(batches.superseded, 1);
        assert_eq!(batches.inserts[0].aircraft_reg_no.as_deref(), Some("LAST"));
        assert_eq!(batches.inserts[1].aircraft_reg_no.as_deref(), Some("OTHER"));
    }

    #[test]
    fn test_duplicate_update_reverting_to_target_is_dropped() {
        let index = RecordIndex::build(vec![record("1", "HZAS1")]);
        let mut rec = Reconciler::new(&index, now());
        rec.push(record("1", "HZAS2"));
        rec.push(record("1", "HZAS1"));

        let batches = rec.finish();
        assert!(batches.updates.is_empty());
    }

    #[test]
    fn test_restamp_moves_timestamp_and_keeps_action() {
        let index = RecordIndex::build(vec![record("1", "HZAS1")]);
        let mut rec = Reconciler::new(&index, now());
        rec.push(record("1", "HZAS2"));
        rec.push(record("2", "HZAS1"));

        let mut batches = rec.finish();
        let written_at = now() + chrono::Duration::seconds(42);
        batches.restamp(written_at);
        assert_eq!(batches.inserts[0].last_action_at, Some(written_at));
        assert_eq!(batches.inserts[0].last_action_code, Some(ActionCode::Add));
        assert_eq!(batches.updates[0].last_action_at, Some(written_at));
        assert_eq!(batches.updates[0].last_action_code, Some(ActionCode::Update));
    }

    #[test]
    fn test_diff_lists_every_changed_field() {
        let stored = record("1", "HZAS1");
        let mut incoming = record("1", "HZAS2");
        incoming.crew_count = Some("6".to_string());
        incoming.operation_comments = Some("late".to_string());
        assert_eq!(
            diff(&incoming, &stored),
            vec![
                TrackedField::AircraftRegNo,
                TrackedField::CrewCount,
                TrackedField::OperationComments
            ]
        );
    }
}
