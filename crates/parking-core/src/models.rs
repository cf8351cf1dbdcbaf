//! Domain types shared by the registry, the ledger and the lot service

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of one physical parking space (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SpotId(pub u32);

impl fmt::Display for SpotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a stay record, assigned monotonically by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub u64);

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The vehicle currently parked in a space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Occupant {
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    /// Ledger record opened for this stay
    pub record_id: RecordId,
}

/// Current state of one parking space
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParkingSpace {
    pub id: SpotId,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub occupant: Option<Occupant>,
}

impl ParkingSpace {
    /// Create a free space
    pub fn new(id: SpotId) -> Self {
        Self { id, occupant: None }
    }

    pub fn is_occupied(&self) -> bool {
        self.occupant.is_some()
    }

    pub fn license_plate(&self) -> Option<&str> {
        self.occupant.as_ref().map(|o| o.license_plate.as_str())
    }

    pub fn entry_time(&self) -> Option<DateTime<Utc>> {
        self.occupant.as_ref().map(|o| o.entry_time)
    }
}

/// Stay record status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordStatus {
    /// Vehicle is still parked
    InProgress,
    /// Vehicle has left and the stay was billed
    Completed,
}

/// One ledger entry: a vehicle's stay in the lot
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StayRecord {
    pub id: RecordId,

    pub license_plate: String,

    pub entry_time: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub exit_time: Option<DateTime<Utc>>,

    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub duration_minutes: Option<u64>,

    /// Fee in the smallest currency unit
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub fee: Option<u64>,

    pub status: RecordStatus,
}

impl StayRecord {
    /// Create an open record
    pub fn open(id: RecordId, license_plate: String, entry_time: DateTime<Utc>) -> Self {
        Self {
            id,
            license_plate,
            entry_time,
            exit_time: None,
            duration_minutes: None,
            fee: None,
            status: RecordStatus::InProgress,
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == RecordStatus::InProgress
    }
}

/// Inclusive calendar-day range matched against a record's entry time (UTC)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFilter {
    #[serde(default)]
    pub start_date: Option<NaiveDate>,

    #[serde(default)]
    pub end_date: Option<NaiveDate>,
}

impl RecordFilter {
    pub fn between(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }

    /// Whether `time` falls in `[start_date, end_date + 1 day)`
    pub fn matches(&self, time: DateTime<Utc>) -> bool {
        let day = time.date_naive();
        self.start_date.map_or(true, |start| day >= start)
            && self.end_date.map_or(true, |end| day <= end)
    }
}

/// Ledger figures for one calendar day
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DailyStats {
    pub entries: usize,
    pub revenue: u64,
}

/// Dashboard summary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LotStats {
    pub occupied: usize,
    pub available: usize,
    pub today_entries: usize,
    pub today_revenue: u64,
}

/// Result of a successful vehicle entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReceipt {
    pub spot_id: SpotId,
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    pub record_id: RecordId,
}

/// Result of a successful vehicle exit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExitReceipt {
    pub spot_id: SpotId,
    pub record_id: RecordId,
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub fee: u64,
    pub duration_minutes: u64,
}
