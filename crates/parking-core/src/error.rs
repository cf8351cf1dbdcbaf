use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::SpotId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid spot: {0}")]
    InvalidSpot(SpotId),

    #[error("Spot {0} is already occupied")]
    AlreadyOccupied(SpotId),

    #[error("Spot {0} is not occupied")]
    NotOccupied(SpotId),

    #[error("No open record for {0}")]
    NoOpenRecord(String),

    #[error("Exit time {exit} is before entry time {entry}")]
    InvalidInterval {
        entry: DateTime<Utc>,
        exit: DateTime<Utc>,
    },

    #[error("Invalid license plate: {0:?}")]
    InvalidPlate(String),

    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("JSON serialization error: {0}")]
    JsonSerialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
