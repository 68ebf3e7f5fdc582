//! Query cache storage.
//!
//! One LRU of query results plus the table of in-flight fetches, both behind a
//! single mutex so that a freshness check and the registration of a new fetch
//! happen atomically. The lock is never held across an await.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use metrics::counter;
use tokio::sync::oneshot;
use tokio::time::Instant;
use tracing::debug;

use crate::domain::{Page, Resource};

use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::QueryKey;
use super::lock::mutex_lock;
use super::planner::{CacheAction, MutationPlan};

const SOURCE: &str = "cache::store";
const METRIC_CACHE_EVICT: &str = "folio_cache_evict_total";

/// A cached query result: one entity or one page of entities.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedData {
    Entity(Resource),
    Page(Page<Resource>),
}

impl CachedData {
    pub fn as_entity(&self) -> Option<&Resource> {
        match self {
            CachedData::Entity(resource) => Some(resource),
            CachedData::Page(_) => None,
        }
    }

    pub fn as_page(&self) -> Option<&Page<Resource>> {
        match self {
            CachedData::Page(page) => Some(page),
            CachedData::Entity(_) => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub data: CachedData,
    pub fetched_at: Instant,
    pub stale: bool,
}

impl CacheEntry {
    fn new(data: CachedData, stale: bool) -> Self {
        Self {
            data,
            fetched_at: Instant::now(),
            stale,
        }
    }

    pub fn is_fresh(&self, stale_time: Duration) -> bool {
        !self.stale && self.fetched_at.elapsed() < stale_time
    }
}

/// Observable lifecycle of one key.
///
/// `Empty → Fetching → Fresh → Stale → Fetching → Fresh`; only a removal
/// returns a populated key to `Empty`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryState {
    Empty,
    Fetching,
    Fresh,
    Stale,
}

/// Point-in-time view of one key.
#[derive(Debug, Clone)]
pub struct EntrySnapshot {
    pub state: EntryState,
    /// Cached data, fresh or stale.
    pub data: Option<CachedData>,
    /// Error of the most recent failed fetch, cleared by the next success.
    pub error: Option<CacheError>,
}

pub type FetchResult = Result<CachedData, CacheError>;
pub(crate) type SharedFetch = Shared<BoxFuture<'static, FetchResult>>;

/// Ordered by precedence: a later instruction never downgrades a fate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum FetchFate {
    Current,
    /// A mutation touched the key; the result is stored stale.
    Superseded,
    /// A mutation wrote the key; the older result is not stored.
    Patched,
    /// A mutation removed the key; the result is not stored.
    Removed,
}

struct InFlight {
    id: u64,
    future: SharedFetch,
    fate: FetchFate,
}

/// Right to complete the fetch registered for one key.
pub(crate) struct FetchTicket {
    key: QueryKey,
    id: u64,
    sender: oneshot::Sender<FetchResult>,
}

impl FetchTicket {
    pub(crate) fn key(&self) -> &QueryKey {
        &self.key
    }
}

pub(crate) enum Lookup {
    Hit(CachedData),
    /// Another caller is fetching this key.
    Join(SharedFetch),
    /// The caller must fetch and hand the result to `CacheStore::complete`.
    Lead(FetchTicket, SharedFetch),
    /// The store was disposed; read straight from the source.
    Bypass,
}

/// Effect of one applied plan.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ApplyReport {
    pub patched: usize,
    pub invalidated: usize,
    pub removed: usize,
    pub superseded: usize,
}

struct StoreState {
    entries: LruCache<QueryKey, CacheEntry>,
    errors: LruCache<QueryKey, CacheError>,
    in_flight: HashMap<QueryKey, InFlight>,
    next_fetch_id: u64,
}

/// Owner of every cached query result.
///
/// Created once and shared (as `Arc`) by the coordinators that read and write
/// it. After [`CacheStore::dispose`] it holds nothing and every lookup
/// bypasses caching.
pub struct CacheStore {
    state: Mutex<StoreState>,
    stale_time: Duration,
    disposed: AtomicBool,
}

impl CacheStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            state: Mutex::new(StoreState {
                entries: LruCache::new(config.max_entries_non_zero()),
                errors: LruCache::new(config.max_entries_non_zero()),
                in_flight: HashMap::new(),
                next_fetch_id: 0,
            }),
            stale_time: config.stale_time(),
            disposed: AtomicBool::new(false),
        }
    }

    pub fn stale_time(&self) -> Duration {
        self.stale_time
    }

    /// Serve a fresh entry, join the running fetch, or register a new one.
    pub(crate) fn lookup(&self, key: &QueryKey) -> Lookup {
        if self.is_disposed() {
            return Lookup::Bypass;
        }
        let mut state = mutex_lock(&self.state, SOURCE, "lookup");

        if let Some(entry) = state.entries.get(key) {
            if entry.is_fresh(self.stale_time) {
                return Lookup::Hit(entry.data.clone());
            }
        }

        // Only a fetch no mutation has overtaken may be joined. Anything else
        // (including a handle whose task never reported back) is replaced
        // below, and the old ticket's result is discarded by `complete`.
        if let Some(in_flight) = state.in_flight.get(key) {
            if in_flight.fate == FetchFate::Current && in_flight.future.peek().is_none() {
                return Lookup::Join(in_flight.future.clone());
            }
        }

        let (sender, receiver) = oneshot::channel::<FetchResult>();
        let future = receiver
            .map(|received| {
                received.unwrap_or_else(|_| {
                    Err(CacheError::network("fetch task ended without a result"))
                })
            })
            .boxed()
            .shared();

        state.next_fetch_id += 1;
        let id = state.next_fetch_id;
        state.in_flight.insert(
            key.clone(),
            InFlight {
                id,
                future: future.clone(),
                fate: FetchFate::Current,
            },
        );

        Lookup::Lead(
            FetchTicket {
                key: key.clone(),
                id,
                sender,
            },
            future,
        )
    }

    /// Record the outcome of a fetch and wake every caller joined on it.
    ///
    /// Success stores the data, stale if a mutation superseded the fetch and
    /// not at all if a mutation patched or removed the key. `NotFound` removes
    /// the entry without recording an error; other errors leave it untouched.
    pub(crate) fn complete(&self, ticket: FetchTicket, result: FetchResult) {
        let FetchTicket { key, id, sender } = ticket;
        {
            let mut state = mutex_lock(&self.state, SOURCE, "complete");
            let fate = match state.in_flight.get(&key) {
                Some(in_flight) if in_flight.id == id => {
                    let fate = in_flight.fate;
                    state.in_flight.remove(&key);
                    fate
                }
                // Cleared or disposed while fetching.
                _ => FetchFate::Removed,
            };

            match (&result, fate) {
                (_, FetchFate::Patched | FetchFate::Removed) => {}
                (Ok(data), fate) => {
                    let entry = CacheEntry::new(data.clone(), fate == FetchFate::Superseded);
                    insert(&mut state, key.clone(), entry);
                    state.errors.pop(&key);
                }
                (Err(err), _) if err.is_not_found() => {
                    state.entries.pop(&key);
                    state.errors.pop(&key);
                }
                (Err(err), _) => {
                    state.errors.put(key.clone(), err.clone());
                }
            }
        }
        // Every waiter may have gone away; the store is already up to date.
        let _ = sender.send(result);
    }

    /// Execute a mutation plan atomically, in instruction order.
    pub fn apply(&self, plan: &MutationPlan) -> ApplyReport {
        let mut report = ApplyReport::default();
        if self.is_disposed() {
            return report;
        }
        let mut state = mutex_lock(&self.state, SOURCE, "apply");

        for instruction in &plan.instructions {
            let keys: Vec<QueryKey> = state
                .entries
                .iter()
                .map(|(key, _)| key)
                .filter(|key| instruction.target.matches(key))
                .cloned()
                .collect();

            let fate = match &instruction.action {
                CacheAction::Patch(resource) => {
                    // A key still being fetched gets the patch too; the fetch
                    // started earlier and its result is dropped.
                    let fetching: Vec<QueryKey> = state
                        .in_flight
                        .keys()
                        .filter(|key| instruction.target.matches(key) && !keys.contains(key))
                        .cloned()
                        .collect();
                    for key in keys.iter().chain(&fetching) {
                        let entry = CacheEntry::new(CachedData::Entity(resource.clone()), false);
                        insert(&mut state, key.clone(), entry);
                        state.errors.pop(key);
                        report.patched += 1;
                    }
                    FetchFate::Patched
                }
                CacheAction::Invalidate => {
                    for key in &keys {
                        if let Some(entry) = state.entries.peek_mut(key) {
                            entry.stale = true;
                            report.invalidated += 1;
                        }
                    }
                    FetchFate::Superseded
                }
                CacheAction::Remove => {
                    for key in &keys {
                        state.entries.pop(key);
                        state.errors.pop(key);
                        report.removed += 1;
                    }
                    FetchFate::Removed
                }
            };

            for (key, in_flight) in state.in_flight.iter_mut() {
                if in_flight.fate < fate && instruction.target.matches(key) {
                    in_flight.fate = fate;
                    report.superseded += 1;
                }
            }
        }

        report
    }

    pub fn snapshot(&self, key: &QueryKey) -> EntrySnapshot {
        let state = mutex_lock(&self.state, SOURCE, "snapshot");
        let entry = state.entries.peek(key);
        let status = if state.in_flight.contains_key(key) {
            EntryState::Fetching
        } else {
            match entry {
                Some(entry) if entry.is_fresh(self.stale_time) => EntryState::Fresh,
                Some(_) => EntryState::Stale,
                None => EntryState::Empty,
            }
        };
        EntrySnapshot {
            state: status,
            data: entry.map(|entry| entry.data.clone()),
            error: state.errors.peek(key).cloned(),
        }
    }

    pub fn state(&self, key: &QueryKey) -> EntryState {
        self.snapshot(key).state
    }

    /// The cached entry for `key`, without touching recency.
    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        mutex_lock(&self.state, SOURCE, "entry")
            .entries
            .peek(key)
            .cloned()
    }

    /// The single entity cached under `key`, if any.
    pub fn cached_entity(&self, key: &QueryKey) -> Option<Resource> {
        mutex_lock(&self.state, SOURCE, "cached_entity")
            .entries
            .peek(key)
            .and_then(|entry| entry.data.as_entity().cloned())
    }

    /// Drop every entry. Running fetches still resolve for their callers but
    /// are not stored.
    pub fn clear(&self) {
        let mut state = mutex_lock(&self.state, SOURCE, "clear");
        state.entries.clear();
        state.errors.clear();
        state.in_flight.clear();
    }

    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::Release);
        self.clear();
        debug!(target_module = SOURCE, "cache store disposed");
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    pub fn len(&self) -> usize {
        mutex_lock(&self.state, SOURCE, "len").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn insert(state: &mut StoreState, key: QueryKey, entry: CacheEntry) {
    if let Some((evicted, _)) = state.entries.push(key.clone(), entry) {
        if evicted != key {
            counter!(METRIC_CACHE_EVICT).increment(1);
            debug!(key = %evicted, "evicted cache entry");
        }
    }
}
