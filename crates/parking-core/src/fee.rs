//! Tiered parking fee calculation
//!
//! A stay of up to one hour pays the flat `base_fee`. Every further started
//! hour adds `hourly_rate`, and the total never exceeds `max_fee`. Amounts are
//! in the smallest currency unit.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default first-hour flat fee
pub const DEFAULT_BASE_FEE: u64 = 2000;

/// Default fee per additional started hour
pub const DEFAULT_HOURLY_RATE: u64 = 1500;

/// Default cap on a single stay
pub const DEFAULT_MAX_FEE: u64 = 15000;

const MILLIS_PER_MINUTE: u64 = 60_000;
const MINUTES_PER_HOUR: u64 = 60;

/// Fee tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeeSchedule {
    pub base_fee: u64,
    pub hourly_rate: u64,
    pub max_fee: u64,
}

impl Default for FeeSchedule {
    fn default() -> Self {
        Self {
            base_fee: DEFAULT_BASE_FEE,
            hourly_rate: DEFAULT_HOURLY_RATE,
            max_fee: DEFAULT_MAX_FEE,
        }
    }
}

/// Billed outcome of one stay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Charge {
    pub fee: u64,
    pub duration_minutes: u64,
}

impl FeeSchedule {
    pub fn new(base_fee: u64, hourly_rate: u64, max_fee: u64) -> Self {
        Self {
            base_fee,
            hourly_rate,
            max_fee,
        }
    }

    /// Compute the fee for a stay from `entry` to `exit`
    ///
    /// Any partial minute counts as a full minute, and any partial hour past
    /// the first counts as a full hour.
    pub fn compute_fee(&self, entry: DateTime<Utc>, exit: DateTime<Utc>) -> Result<Charge> {
        if exit < entry {
            return Err(Error::InvalidInterval { entry, exit });
        }

        let elapsed_ms = (exit - entry).num_milliseconds().unsigned_abs();
        let duration_minutes = elapsed_ms.div_ceil(MILLIS_PER_MINUTE);

        Ok(Charge {
            fee: self.fee_for_minutes(duration_minutes),
            duration_minutes,
        })
    }

    /// Fee for a stay of `minutes` whole minutes
    pub fn fee_for_minutes(&self, minutes: u64) -> u64 {
        if minutes <= MINUTES_PER_HOUR {
            return self.base_fee.min(self.max_fee);
        }

        let billed_hours = minutes.div_ceil(MINUTES_PER_HOUR);
        let fee = self
            .base_fee
            .saturating_add((billed_hours - 1).saturating_mul(self.hourly_rate));

        fee.min(self.max_fee)
    }
}
