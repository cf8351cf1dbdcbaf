//! Parking lot service
//!
//! Composes the registry, the ledger and the fee schedule into the entry and
//! exit operations. Each composite runs inside a single store transaction, so
//! a space is never seen occupied without its open record, or freed without
//! its record being completed.

use chrono::NaiveDate;
use std::sync::Arc;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::fee::{Charge, FeeSchedule};
use crate::models::{
    EntryReceipt, ExitReceipt, LotStats, ParkingSpace, RecordFilter, SpotId, StayRecord,
};
use crate::registry::OccupyPolicy;
use crate::store::ParkingStore;

/// Default number of spaces in the lot
pub const DEFAULT_SPOT_COUNT: u32 = 8;

/// Longest accepted license plate, after trimming
pub const MAX_PLATE_LEN: usize = 16;

/// Lot-wide settings received at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LotConfig {
    pub spot_count: u32,
    pub fees: FeeSchedule,
    pub occupy_policy: OccupyPolicy,
}

impl Default for LotConfig {
    fn default() -> Self {
        Self {
            spot_count: DEFAULT_SPOT_COUNT,
            fees: FeeSchedule::default(),
            occupy_policy: OccupyPolicy::default(),
        }
    }
}

pub struct ParkingLot<S> {
    store: S,
    clock: Arc<dyn Clock>,
    config: LotConfig,
}

impl<S: ParkingStore> ParkingLot<S> {
    pub fn new(store: S, clock: Arc<dyn Clock>, config: LotConfig) -> Self {
        Self {
            store,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &LotConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Current UTC calendar day according to the lot's clock
    pub fn today(&self) -> NaiveDate {
        self.clock.now().date_naive()
    }

    /// Create any missing spaces. Safe to call on every start-up.
    pub async fn initialize(&self) -> Result<usize> {
        let count = self.config.spot_count;
        let created = self
            .store
            .transact(move |lot| Ok(lot.registry.initialize(count)))
            .await?;

        if created > 0 {
            info!("Created {} parking spaces", created);
        }
        Ok(created)
    }

    /// Park a vehicle in `spot_id`
    pub async fn record_entry(&self, spot_id: SpotId, license_plate: &str) -> Result<EntryReceipt> {
        let license_plate = normalize_plate(license_plate)?;
        let entry_time = self.clock.now();
        let policy = self.config.occupy_policy;
        let fees = self.config.fees;

        let result = self
            .store
            .transact(move |lot| {
                // Discarded with the transaction if the space can't be taken
                let record_id = lot.ledger.open_record(&license_plate, entry_time);

                let displaced = lot.registry.occupy(
                    spot_id,
                    &license_plate,
                    entry_time,
                    record_id,
                    policy,
                )?;

                if let Some(previous) = displaced {
                    let still_open = lot
                        .ledger
                        .get(previous.record_id)
                        .is_some_and(|r| r.is_open());
                    if still_open {
                        // A clock step back must not block the correction
                        let closed_at = previous.entry_time.max(entry_time);
                        let measured = fees.compute_fee(previous.entry_time, closed_at)?;
                        let correction = Charge {
                            fee: 0,
                            duration_minutes: measured.duration_minutes,
                        };
                        lot.ledger
                            .close_record_by_id(previous.record_id, closed_at, correction)?;
                    }
                    warn!(
                        "Spot {} overwritten: {} replaced by {}",
                        spot_id, previous.license_plate, license_plate
                    );
                }

                Ok(EntryReceipt {
                    spot_id,
                    license_plate,
                    entry_time,
                    record_id,
                })
            })
            .await;

        match &result {
            Ok(receipt) => info!(
                "Vehicle {} entered spot {} (record {})",
                receipt.license_plate, spot_id, receipt.record_id
            ),
            Err(e) => warn!("Entry to spot {} rejected: {}", spot_id, e),
        }
        result
    }

    /// Release `spot_id` and bill the stay
    pub async fn record_exit(&self, spot_id: SpotId) -> Result<ExitReceipt> {
        let exit_time = self.clock.now();
        let fees = self.config.fees;

        let result = self
            .store
            .transact(move |lot| {
                let occupant = lot.registry.vacate(spot_id, exit_time)?;
                let charge = fees.compute_fee(occupant.entry_time, exit_time)?;
                lot.ledger
                    .close_record_by_id(occupant.record_id, exit_time, charge)?;

                Ok(ExitReceipt {
                    spot_id,
                    record_id: occupant.record_id,
                    license_plate: occupant.license_plate,
                    entry_time: occupant.entry_time,
                    exit_time,
                    fee: charge.fee,
                    duration_minutes: charge.duration_minutes,
                })
            })
            .await;

        match &result {
            Ok(receipt) => info!(
                "Vehicle {} left spot {} after {} min, fee {}",
                receipt.license_plate, spot_id, receipt.duration_minutes, receipt.fee
            ),
            Err(e) => warn!("Exit from spot {} rejected: {}", spot_id, e),
        }
        result
    }

    /// All spaces ordered by id
    pub async fn list_spaces(&self) -> Result<Vec<ParkingSpace>> {
        Ok(self.store.load().await?.registry.snapshot())
    }

    /// Stay history, newest entry first
    pub async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<StayRecord>> {
        Ok(self.store.load().await?.ledger.query(filter))
    }

    /// Occupancy counts plus the ledger figures for `day`
    pub async fn get_stats(&self, day: NaiveDate) -> Result<LotStats> {
        let lot = self.store.load().await?;
        let daily = lot.ledger.daily_stats(day);

        Ok(LotStats {
            occupied: lot.registry.occupied_count(),
            available: lot.registry.available_count(),
            today_entries: daily.entries,
            today_revenue: daily.revenue,
        })
    }

    /// Open records that no space points at
    pub async fn orphaned_records(&self) -> Result<Vec<StayRecord>> {
        let lot = self.store.load().await?;
        Ok(lot.ledger.orphaned_records(&lot.registry))
    }
}

/// Trim and upper-case a plate, rejecting empty or oversized input
pub fn normalize_plate(raw: &str) -> Result<String> {
    let plate = raw.trim();
    if plate.is_empty()
        || plate.chars().count() > MAX_PLATE_LEN
        || plate.chars().any(|c| c.is_control())
    {
        return Err(Error::InvalidPlate(raw.to_string()));
    }
    Ok(plate.to_uppercase())
}
