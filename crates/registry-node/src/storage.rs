//! Storage backends for the registry ledger
//!
//! Data model (Redis):
//! - registration:{hash} → JSON registration, written with SET NX
//! - registry:sequence → ledger transaction counter
//! - registry:events → List of JSON events, entry N-1 holds sequence N
//! - role:{name} → Set of member addresses

use async_trait::async_trait;
use provenance_common::{
    Address, ContentHash, Error, Registration, RegistrationEvent, Result, Role,
};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Persistence seam for the registry.
///
/// `commit_registration` is the only write path for registrations and must
/// be atomic: the registration, its sequence number and its log entry land
/// together or not at all, and of two concurrent commits for the same hash
/// exactly one succeeds.
#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Short backend name for health reporting
    fn backend(&self) -> &'static str;

    /// Store the registration described by `event` unless its hash is
    /// already registered, assign the next sequence number (starting at 1)
    /// and append `event` to the log.
    ///
    /// Returns `None` for an already registered hash; nothing is written
    /// and no sequence number is consumed.
    async fn commit_registration(&self, event: &RegistrationEvent) -> Result<Option<u64>>;

    async fn get(&self, hash: &ContentHash) -> Result<Option<Registration>>;

    /// Up to `limit` logged events with sequence >= `from`, in order
    async fn events_since(&self, from: u64, limit: usize)
        -> Result<Vec<(u64, RegistrationEvent)>>;

    /// Returns true if the account was not already a member
    async fn add_role_member(&self, role: Role, account: &Address) -> Result<bool>;

    /// Returns true if the account was a member
    async fn remove_role_member(&self, role: Role, account: &Address) -> Result<bool>;

    async fn is_role_member(&self, role: Role, account: &Address) -> Result<bool>;

    async fn role_members(&self, role: Role) -> Result<Vec<Address>>;
}

#[derive(Default)]
struct MemoryState {
    registrations: HashMap<ContentHash, Registration>,
    roles: HashMap<Role, BTreeSet<Address>>,
    /// Entry N-1 holds sequence N
    events: Vec<RegistrationEvent>,
}

/// In-process store, used for development and tests
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn commit_registration(&self, event: &RegistrationEvent) -> Result<Option<u64>> {
        let mut state = self.state.lock().await;
        if state.registrations.contains_key(&event.hash) {
            return Ok(None);
        }
        state.registrations.insert(event.hash, event.registration());
        state.events.push(event.clone());
        Ok(Some(state.events.len() as u64))
    }

    async fn get(&self, hash: &ContentHash) -> Result<Option<Registration>> {
        let state = self.state.lock().await;
        Ok(state.registrations.get(hash).cloned())
    }

    async fn events_since(
        &self,
        from: u64,
        limit: usize,
    ) -> Result<Vec<(u64, RegistrationEvent)>> {
        let state = self.state.lock().await;
        let start = from.max(1);
        Ok(state
            .events
            .iter()
            .zip(1u64..)
            .skip((start - 1) as usize)
            .take(limit)
            .map(|(event, sequence)| (sequence, event.clone()))
            .collect())
    }

    async fn add_role_member(&self, role: Role, account: &Address) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state.roles.entry(role).or_default().insert(*account))
    }

    async fn remove_role_member(&self, role: Role, account: &Address) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state
            .roles
            .get_mut(&role)
            .map(|members| members.remove(account))
            .unwrap_or(false))
    }

    async fn is_role_member(&self, role: Role, account: &Address) -> Result<bool> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .get(&role)
            .map(|members| members.contains(account))
            .unwrap_or(false))
    }

    async fn role_members(&self, role: Role) -> Result<Vec<Address>> {
        let state = self.state.lock().await;
        Ok(state
            .roles
            .get(&role)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default())
    }
}

const SEQUENCE_KEY: &str = "registry:sequence";
const EVENTS_KEY: &str = "registry:events";

/// SET NX, INCR and RPUSH in one server-side step.
/// KEYS: registration, sequence, events. ARGV: registration JSON, event JSON.
/// Returns the new sequence, or 0 when the hash was already registered.
const COMMIT_SCRIPT: &str = r#"
if not redis.call('SET', KEYS[1], ARGV[1], 'NX') then
    return 0
end
local sequence = redis.call('INCR', KEYS[2])
redis.call('RPUSH', KEYS[3], ARGV[2])
return sequence
"#;

/// Redis-backed store
pub struct RedisStore {
    conn: ConnectionManager,
}

fn unavailable(err: redis::RedisError) -> Error {
    Error::TransientChain(format!("redis: {}", err))
}

fn registration_key(hash: &ContentHash) -> String {
    format!("registration:{}", hash.to_hex())
}

fn role_key(role: Role) -> String {
    format!("role:{}", role.as_str())
}

impl RedisStore {
    pub async fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url).map_err(unavailable)?;
        let conn = ConnectionManager::new(client).await.map_err(unavailable)?;

        info!("Connected to Redis at {}", redis_url);

        Ok(Self { conn })
    }
}

#[async_trait]
impl RegistrationStore for RedisStore {
    fn backend(&self) -> &'static str {
        "redis"
    }

    async fn commit_registration(&self, event: &RegistrationEvent) -> Result<Option<u64>> {
        let registration_json = serde_json::to_string(&event.registration())?;
        let event_json = serde_json::to_string(event)?;
        let mut conn = self.conn.clone();

        // SET NX inside the script is the uniqueness guarantee
        let script = redis::Script::new(COMMIT_SCRIPT);
        let sequence: u64 = script
            .key(registration_key(&event.hash))
            .key(SEQUENCE_KEY)
            .key(EVENTS_KEY)
            .arg(registration_json)
            .arg(event_json)
            .invoke_async(&mut conn)
            .await
            .map_err(unavailable)?;

        if sequence == 0 {
            debug!("Registration already present for {}", event.hash);
            return Ok(None);
        }
        Ok(Some(sequence))
    }

    async fn get(&self, hash: &ContentHash) -> Result<Option<Registration>> {
        let mut conn = self.conn.clone();
        let json: Option<String> = conn.get(registration_key(hash)).await.map_err(unavailable)?;

        match json {
            Some(data) => Ok(Some(serde_json::from_str(&data)?)),
            None => Ok(None),
        }
    }

    async fn events_since(
        &self,
        from: u64,
        limit: usize,
    ) -> Result<Vec<(u64, RegistrationEvent)>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let start = from.max(1);
        let first = (start - 1) as isize;
        let last = first + limit as isize - 1;

        let mut conn = self.conn.clone();
        let entries: Vec<String> = conn
            .lrange(EVENTS_KEY, first, last)
            .await
            .map_err(unavailable)?;

        entries
            .iter()
            .zip(start..)
            .map(|(json, sequence)| -> Result<(u64, RegistrationEvent)> {
                Ok((sequence, serde_json::from_str(json)?))
            })
            .collect()
    }

    async fn add_role_member(&self, role: Role, account: &Address) -> Result<bool> {
        let mut conn = self.conn.clone();
        let added: u64 = conn
            .sadd(role_key(role), account.to_checksum())
            .await
            .map_err(unavailable)?;
        Ok(added > 0)
    }

    async fn remove_role_member(&self, role: Role, account: &Address) -> Result<bool> {
        let mut conn = self.conn.clone();
        let removed: u64 = conn
            .srem(role_key(role), account.to_checksum())
            .await
            .map_err(unavailable)?;
        Ok(removed > 0)
    }

    async fn is_role_member(&self, role: Role, account: &Address) -> Result<bool> {
        let mut conn = self.conn.clone();
        conn.sismember(role_key(role), account.to_checksum())
            .await
            .map_err(unavailable)
    }

    async fn role_members(&self, role: Role) -> Result<Vec<Address>> {
        let mut conn = self.conn.clone();
        let members: Vec<String> = conn.smembers(role_key(role)).await.map_err(unavailable)?;
        let mut accounts = members
            .iter()
            .map(|m| Address::parse(m))
            .collect::<Result<Vec<_>>>()?;
        accounts.sort();
        Ok(accounts)
    }
}
