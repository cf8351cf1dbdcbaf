//! Request and response bodies for the Parking API

use chrono::{DateTime, NaiveDate, Utc};
use parking_core::{
    EntryReceipt, ExitReceipt, LotStats, ParkingSpace, RecordStatus, StayRecord,
};
use serde::{Deserialize, Serialize};

/// List wrapper used by every collection endpoint
#[derive(Debug, Serialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
}

/// One space as shown on the dashboard
#[derive(Debug, Serialize)]
pub struct SpaceView {
    pub id: u32,
    pub is_occupied: bool,
    pub license_plate: Option<String>,
    pub entry_time: Option<DateTime<Utc>>,
}

impl From<ParkingSpace> for SpaceView {
    fn from(space: ParkingSpace) -> Self {
        let (license_plate, entry_time) = match space.occupant {
            Some(o) => (Some(o.license_plate), Some(o.entry_time)),
            None => (None, None),
        };

        Self {
            id: space.id.0,
            is_occupied: license_plate.is_some(),
            license_plate,
            entry_time,
        }
    }
}

/// One history row
#[derive(Debug, Serialize)]
pub struct RecordView {
    pub id: u64,
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: Option<DateTime<Utc>>,
    pub duration_minutes: Option<u64>,
    pub fee: Option<u64>,
    pub status: RecordStatus,
}

impl From<StayRecord> for RecordView {
    fn from(record: StayRecord) -> Self {
        Self {
            id: record.id.0,
            license_plate: record.license_plate,
            entry_time: record.entry_time,
            exit_time: record.exit_time,
            duration_minutes: record.duration_minutes,
            fee: record.fee,
            status: record.status,
        }
    }
}

/// Query string for `/api/stats`
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    /// Day to report on (UTC); today when absent
    #[serde(default)]
    pub day: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub occupied_spots: usize,
    pub available_spots: usize,
    pub today_entries: usize,
    pub today_revenue: u64,
}

impl From<LotStats> for StatsResponse {
    fn from(stats: LotStats) -> Self {
        Self {
            occupied_spots: stats.occupied,
            available_spots: stats.available,
            today_entries: stats.today_entries,
            today_revenue: stats.today_revenue,
        }
    }
}

/// Request to park a vehicle
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    pub spot_id: u32,
    pub license_plate: String,
}

#[derive(Debug, Serialize)]
pub struct EntryResponse {
    pub message: String,
    pub spot_id: u32,
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    pub record_id: u64,
}

impl From<EntryReceipt> for EntryResponse {
    fn from(receipt: EntryReceipt) -> Self {
        Self {
            message: "Entry recorded".to_string(),
            spot_id: receipt.spot_id.0,
            license_plate: receipt.license_plate,
            entry_time: receipt.entry_time,
            record_id: receipt.record_id.0,
        }
    }
}

/// Request to release a space
#[derive(Debug, Deserialize)]
pub struct ExitRequest {
    pub spot_id: u32,
}

#[derive(Debug, Serialize)]
pub struct ExitResponse {
    pub message: String,
    pub spot_id: u32,
    pub record_id: u64,
    pub license_plate: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    /// Fee in the smallest currency unit
    pub fee: u64,
    /// Billed duration in minutes
    pub duration: u64,
}

impl From<ExitReceipt> for ExitResponse {
    fn from(receipt: ExitReceipt) -> Self {
        Self {
            message: "Exit recorded".to_string(),
            spot_id: receipt.spot_id.0,
            record_id: receipt.record_id.0,
            license_plate: receipt.license_plate,
            entry_time: receipt.entry_time,
            exit_time: receipt.exit_time,
            fee: receipt.fee,
            duration: receipt.duration_minutes,
        }
    }
}
