//! Stay history
//!
//! Records are appended when a space becomes occupied and completed exactly
//! once when it is freed. Nothing is ever removed.

use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{BTreeMap, HashSet};

use crate::error::{Error, Result};
use crate::fee::Charge;
use crate::models::{DailyStats, RecordFilter, RecordId, RecordStatus, StayRecord};
use crate::registry::SpotRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordLedger {
    records: BTreeMap<RecordId, StayRecord>,
    next_id: u64,
}

impl Default for RecordLedger {
    fn default() -> Self {
        Self {
            records: BTreeMap::new(),
            next_id: 1,
        }
    }
}

impl RecordLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger (or a working subset of one) from persisted records.
    ///
    /// `next_id` is raised past the highest loaded id if needed.
    pub fn from_parts(records: impl IntoIterator<Item = StayRecord>, next_id: u64) -> Self {
        let records: BTreeMap<_, _> = records.into_iter().map(|r| (r.id, r)).collect();
        let floor = records.keys().next_back().map_or(1, |id| id.0 + 1);

        Self {
            records,
            next_id: next_id.max(floor),
        }
    }

    /// Id the next opened record will receive
    pub fn next_id(&self) -> u64 {
        self.next_id
    }

    /// Append an in-progress record
    pub fn open_record(&mut self, license_plate: &str, entry_time: DateTime<Utc>) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;

        self.records
            .insert(id, StayRecord::open(id, license_plate.to_string(), entry_time));
        id
    }

    /// Complete the most recent open record for `license_plate`
    pub fn close_record(
        &mut self,
        license_plate: &str,
        exit_time: DateTime<Utc>,
        charge: Charge,
    ) -> Result<&StayRecord> {
        let id = self
            .records
            .values()
            .filter(|r| r.is_open() && r.license_plate == license_plate)
            .max_by_key(|r| (r.entry_time, r.id))
            .map(|r| r.id)
            .ok_or_else(|| Error::NoOpenRecord(license_plate.to_string()))?;

        self.close_record_by_id(id, exit_time, charge)
    }

    /// Complete exactly the record `id`
    pub fn close_record_by_id(
        &mut self,
        id: RecordId,
        exit_time: DateTime<Utc>,
        charge: Charge,
    ) -> Result<&StayRecord> {
        let record = self
            .records
            .get_mut(&id)
            .filter(|r| r.is_open())
            .ok_or_else(|| Error::NoOpenRecord(format!("record #{}", id)))?;

        if exit_time < record.entry_time {
            return Err(Error::InvalidInterval {
                entry: record.entry_time,
                exit: exit_time,
            });
        }

        record.exit_time = Some(exit_time);
        record.duration_minutes = Some(charge.duration_minutes);
        record.fee = Some(charge.fee);
        record.status = RecordStatus::Completed;

        Ok(&*record)
    }

    pub fn get(&self, id: RecordId) -> Option<&StayRecord> {
        self.records.get(&id)
    }

    /// All records in id order
    pub fn records(&self) -> impl Iterator<Item = &StayRecord> {
        self.records.values()
    }

    pub fn open_records(&self) -> impl Iterator<Item = &StayRecord> {
        self.records.values().filter(|r| r.is_open())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records matching `filter`, newest entry first
    pub fn query(&self, filter: &RecordFilter) -> Vec<StayRecord> {
        let mut records: Vec<StayRecord> = self
            .records
            .values()
            .filter(|r| filter.matches(r.entry_time))
            .cloned()
            .collect();

        records.sort_by(|a, b| (b.entry_time, b.id).cmp(&(a.entry_time, a.id)));
        records
    }

    /// Entries started on `day` and revenue from stays completed on `day`
    pub fn daily_stats(&self, day: NaiveDate) -> DailyStats {
        let entries = self
            .records
            .values()
            .filter(|r| r.entry_time.date_naive() == day)
            .count();

        let revenue = self
            .records
            .values()
            .filter(|r| r.status == RecordStatus::Completed)
            .filter(|r| r.exit_time.is_some_and(|t| t.date_naive() == day))
            .filter_map(|r| r.fee)
            .sum();

        DailyStats { entries, revenue }
    }

    /// Open records that no occupied space points at
    pub fn orphaned_records(&self, registry: &SpotRegistry) -> Vec<StayRecord> {
        let referenced: HashSet<RecordId> = registry
            .iter()
            .filter_map(|s| s.occupant.as_ref().map(|o| o.record_id))
            .collect();

        self.open_records()
            .filter(|r| !referenced.contains(&r.id))
            .cloned()
            .collect()
    }
}
