//! Transactional persistence capability for the lot
//!
//! The lot service never touches storage directly: it hands a closure to
//! [`ParkingStore::transact`], which runs it against a working copy of the
//! [`LotState`] and makes the result visible only if the closure succeeds.

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::ledger::RecordLedger;
use crate::registry::SpotRegistry;

/// Space table plus stay history
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LotState {
    pub registry: SpotRegistry,
    pub ledger: RecordLedger,
}

#[async_trait]
pub trait ParkingStore: Send + Sync {
    /// Consistent snapshot of the whole lot
    async fn load(&self) -> Result<LotState>;

    /// Apply `op` atomically.
    ///
    /// Transactions are serialized. If `op` returns an error nothing it did
    /// is persisted. The state handed to `op` always contains every space and
    /// every open record; completed records may be omitted.
    async fn transact<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut LotState) -> Result<T> + Send + 'static;
}

/// Process-local store
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<LotState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_state(state: LotState) -> Self {
        Self {
            state: RwLock::new(state),
        }
    }
}

#[async_trait]
impl ParkingStore for MemoryStore {
    async fn load(&self) -> Result<LotState> {
        Ok(self.state.read().await.clone())
    }

    async fn transact<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut LotState) -> Result<T> + Send + 'static,
    {
        let mut state = self.state.write().await;

        let mut working = state.clone();
        let output = op(&mut working)?;
        *state = working;

        debug!("Committed in-memory transaction");
        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::SpotId;
    use chrono::Utc;

    #[tokio::test]
    async fn test_commit_on_success() {
        let store = MemoryStore::new();

        let created = store
            .transact(|lot| Ok(lot.registry.initialize(8)))
            .await
            .unwrap();
        assert_eq!(created, 8);

        let lot = store.load().await.unwrap();
        assert_eq!(lot.registry.len(), 8);
    }

    #[tokio::test]
    async fn test_rollback_on_error() {
        let store = MemoryStore::new();
        store
            .transact(|lot| Ok(lot.registry.initialize(2)))
            .await
            .unwrap();
        let before = store.load().await.unwrap();

        let result: Result<()> = store
            .transact(|lot| {
                lot.ledger.open_record("HALF", Utc::now());
                Err(Error::NotOccupied(SpotId(1)))
            })
            .await;

        assert!(matches!(result, Err(Error::NotOccupied(_))));
        assert_eq!(store.load().await.unwrap(), before);
    }
}
