//! Storage backends for the parking lot
//!
//! Redis data model:
//! - parking:spaces → Hash, field = spot id, value = space JSON
//! - parking:records → Hash, field = record id, value = record JSON
//! - parking:records:open → Set of in-progress record ids
//! - parking:records:next_id → next record id
//! - parking:lease → writer lease token (SET NX PX)

use anyhow::Context;
use async_trait::async_trait;
use parking_core::{
    Error, LotState, MemoryStore, ParkingSpace, ParkingStore, RecordLedger, RecordStatus, Result,
    SpotRegistry, StayRecord,
};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::{Config, StorageBackend};

const SPACES_KEY: &str = "parking:spaces";
const RECORDS_KEY: &str = "parking:records";
const OPEN_RECORDS_KEY: &str = "parking:records:open";
const NEXT_ID_KEY: &str = "parking:records:next_id";
const LEASE_KEY: &str = "parking:lease";

/// Lease expiry, in case a holder dies before releasing it
const LEASE_TTL_MS: u64 = 5_000;

/// Attempts to take the lease before giving up
const LEASE_ATTEMPTS: u32 = 50;

const LEASE_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Deletes the lease only if we still hold it
const RELEASE_LEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

/// Applies a transaction's writes only while `ARGV[1]` still holds the lease.
///
/// ARGV layout after the token: space count, then `id json` pairs; record
/// count, then `id json status` triples; finally the next id or "".
const COMMIT_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) ~= ARGV[1] then
    return 0
end
local i = 3
for _ = 1, tonumber(ARGV[2]) do
    redis.call("HSET", KEYS[2], ARGV[i], ARGV[i + 1])
    i = i + 2
end
local records = tonumber(ARGV[i])
i = i + 1
for _ = 1, records do
    redis.call("HSET", KEYS[3], ARGV[i], ARGV[i + 1])
    if ARGV[i + 2] == "open" then
        redis.call("SADD", KEYS[4], ARGV[i])
    else
        redis.call("SREM", KEYS[4], ARGV[i])
    end
    i = i + 3
end
if ARGV[i] ~= "" then
    redis.call("SET", KEYS[5], ARGV[i])
end
return 1
"#;

fn storage_err(e: redis::RedisError) -> Error {
    Error::StorageUnavailable(e.to_string())
}

/// Redis-backed lot storage
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl RedisStore {
    /// Create a new storage instance
    pub async fn new(redis_url: &str) -> anyhow::Result<Self> {
        let client = redis::Client::open(redis_url).context("Failed to create Redis client")?;

        let conn = ConnectionManager::new(client)
            .await
            .context("Failed to connect to Redis")?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }

    /// Health check - verify Redis connection
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.conn.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Take the writer lease, retrying for a bounded time
    async fn acquire_lease(conn: &mut ConnectionManager) -> Result<String> {
        let token = Uuid::new_v4().to_string();

        for attempt in 1..=LEASE_ATTEMPTS {
            let acquired: Option<String> = redis::cmd("SET")
                .arg(LEASE_KEY)
                .arg(&token)
                .arg("NX")
                .arg("PX")
                .arg(LEASE_TTL_MS)
                .query_async(conn)
                .await
                .map_err(storage_err)?;

            if acquired.is_some() {
                if attempt > 1 {
                    debug!("Acquired lot lease after {} attempts", attempt);
                }
                return Ok(token);
            }

            tokio::time::sleep(LEASE_RETRY_DELAY).await;
        }

        warn!("Gave up waiting for the lot lease");
        Err(Error::StorageUnavailable(
            "parking lot is busy, try again".to_string(),
        ))
    }

    async fn release_lease(conn: &mut ConnectionManager, token: &str) -> Result<()> {
        let _: i64 = redis::Script::new(RELEASE_LEASE_SCRIPT)
            .key(LEASE_KEY)
            .arg(token)
            .invoke_async(conn)
            .await
            .map_err(storage_err)?;
        Ok(())
    }

    /// Every space plus the open records: all a transaction may touch
    async fn load_working_set(conn: &mut ConnectionManager) -> Result<LotState> {
        let spaces: HashMap<String, String> =
            conn.hgetall(SPACES_KEY).await.map_err(storage_err)?;
        let open_ids: Vec<u64> = conn.smembers(OPEN_RECORDS_KEY).await.map_err(storage_err)?;
        let next_id: Option<u64> = conn.get(NEXT_ID_KEY).await.map_err(storage_err)?;

        let open_records: Vec<Option<String>> = if open_ids.is_empty() {
            Vec::new()
        } else {
            redis::cmd("HMGET")
                .arg(RECORDS_KEY)
                .arg(&open_ids)
                .query_async(conn)
                .await
                .map_err(storage_err)?
        };

        decode_state(spaces.values(), open_records.iter().flatten(), next_id)
    }

    async fn run_locked<T, F>(conn: &mut ConnectionManager, token: &str, op: F) -> Result<T>
    where
        F: FnOnce(&mut LotState) -> Result<T>,
    {
        let before = Self::load_working_set(conn).await?;
        let mut after = before.clone();
        let output = op(&mut after)?;

        let changes = Changes::between(&before, &after);
        if changes.is_empty() {
            return Ok(output);
        }

        let script = redis::Script::new(COMMIT_SCRIPT);
        let mut invocation = script.prepare_invoke();
        invocation
            .key(LEASE_KEY)
            .key(SPACES_KEY)
            .key(RECORDS_KEY)
            .key(OPEN_RECORDS_KEY)
            .key(NEXT_ID_KEY);
        for arg in changes.script_args(token)? {
            invocation.arg(arg);
        }

        let committed: i64 = invocation.invoke_async(conn).await.map_err(storage_err)?;
        if committed == 0 {
            warn!("Lot lease expired before commit; transaction discarded");
            return Err(Error::StorageUnavailable(
                "lot lease lost before commit, try again".to_string(),
            ));
        }

        debug!(
            "Committed {} space and {} record updates",
            changes.spaces.len(),
            changes.records.len()
        );
        Ok(output)
    }
}

#[async_trait]
impl ParkingStore for RedisStore {
    async fn load(&self) -> Result<LotState> {
        let mut conn = self.conn.clone();

        type Snapshot = (HashMap<String, String>, HashMap<String, String>, Option<u64>);

        let (spaces, records, next_id): Snapshot = redis::pipe()
            .atomic()
            .hgetall(SPACES_KEY)
            .hgetall(RECORDS_KEY)
            .get(NEXT_ID_KEY)
            .query_async(&mut conn)
            .await
            .map_err(storage_err)?;

        decode_state(spaces.values(), records.values(), next_id)
    }

    async fn transact<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut LotState) -> Result<T> + Send + 'static,
    {
        let mut conn = self.conn.clone();
        let token = Self::acquire_lease(&mut conn).await?;

        let result = Self::run_locked(&mut conn, &token, op).await;

        if let Err(e) = Self::release_lease(&mut conn, &token).await {
            warn!("Failed to release lot lease: {}", e);
        }
        result
    }
}

fn decode_state<'a>(
    spaces: impl Iterator<Item = &'a String>,
    records: impl Iterator<Item = &'a String>,
    next_id: Option<u64>,
) -> Result<LotState> {
    let spaces = spaces
        .map(|json| serde_json::from_str::<ParkingSpace>(json))
        .collect::<std::result::Result<Vec<_>, _>>()?;
    let records = records
        .map(|json| serde_json::from_str::<StayRecord>(json))
        .collect::<std::result::Result<Vec<_>, _>>()?;

    Ok(LotState {
        registry: SpotRegistry::from_spaces(spaces),
        ledger: RecordLedger::from_parts(records, next_id.unwrap_or(1)),
    })
}

/// Entries a transaction created or modified
#[derive(Debug, Default)]
struct Changes<'a> {
    spaces: Vec<&'a ParkingSpace>,
    records: Vec<&'a StayRecord>,
    next_id: Option<u64>,
}

impl<'a> Changes<'a> {
    fn between(before: &LotState, after: &'a LotState) -> Self {
        let spaces = after
            .registry
            .iter()
            .filter(|s| before.registry.get(s.id) != Some(*s))
            .collect();
        let records = after
            .ledger
            .records()
            .filter(|r| before.ledger.get(r.id) != Some(*r))
            .collect();
        let next_id = (after.ledger.next_id() != before.ledger.next_id())
            .then(|| after.ledger.next_id());

        Self {
            spaces,
            records,
            next_id,
        }
    }

    fn is_empty(&self) -> bool {
        self.spaces.is_empty() && self.records.is_empty() && self.next_id.is_none()
    }

    /// Arguments for `COMMIT_SCRIPT`, starting with the lease token
    fn script_args(&self, token: &str) -> Result<Vec<String>> {
        let mut args = vec![token.to_string(), self.spaces.len().to_string()];
        for space in &self.spaces {
            args.push(space.id.to_string());
            args.push(serde_json::to_string(space)?);
        }

        args.push(self.records.len().to_string());
        for record in &self.records {
            args.push(record.id.to_string());
            args.push(serde_json::to_string(record)?);
            args.push(
                match record.status {
                    RecordStatus::InProgress => "open",
                    RecordStatus::Completed => "closed",
                }
                .to_string(),
            );
        }

        args.push(self.next_id.map(|id| id.to_string()).unwrap_or_default());
        Ok(args)
    }
}

/// Storage selected at start-up
pub enum Store {
    Memory(MemoryStore),
    Redis(RedisStore),
}

impl Store {
    /// Open the backend named in `config`
    pub async fn connect(config: &Config) -> anyhow::Result<Self> {
        match config.storage {
            StorageBackend::Memory => {
                info!("Using in-memory storage; state is lost on restart");
                Ok(Store::Memory(MemoryStore::new()))
            }
            StorageBackend::Redis => Ok(Store::Redis(RedisStore::new(&config.redis_url).await?)),
        }
    }

    pub async fn health_check(&self) -> Result<()> {
        match self {
            Store::Memory(_) => Ok(()),
            Store::Redis(store) => store.health_check().await,
        }
    }
}

#[async_trait]
impl ParkingStore for Store {
    async fn load(&self) -> Result<LotState> {
        match self {
            Store::Memory(store) => store.load().await,
            Store::Redis(store) => store.load().await,
        }
    }

    async fn transact<T, F>(&self, op: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut LotState) -> Result<T> + Send + 'static,
    {
        match self {
            Store::Memory(store) => store.transact(op).await,
            Store::Redis(store) => store.transact(op).await,
        }
    }
}
