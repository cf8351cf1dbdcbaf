//! Parking lot core
//!
//! Occupancy state machine and fee engine for a small parking lot.
//!
//! **Components:**
//! - `registry`: which space holds which vehicle, and valid occupy/vacate transitions
//! - `ledger`: stay history, opened on entry and completed on exit
//! - `fee`: tiered fee schedule
//! - `store`: transactional persistence capability
//! - `lot`: entry/exit composites and dashboard queries

pub mod clock;
pub mod error;
pub mod fee;
pub mod ledger;
pub mod lot;
pub mod models;
pub mod registry;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use error::{Error, Result};
pub use fee::{Charge, FeeSchedule};
pub use ledger::RecordLedger;
pub use lot::{LotConfig, ParkingLot};
pub use models::{
    DailyStats, EntryReceipt, ExitReceipt, LotStats, Occupant, ParkingSpace, RecordFilter,
    RecordId, RecordStatus, SpotId, StayRecord,
};
pub use registry::{OccupyPolicy, SpotRegistry};
pub use store::{LotState, MemoryStore, ParkingStore};
