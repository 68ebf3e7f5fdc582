//! Folio query cache.
//!
//! - **Keys** identify every cached query result structurally
//!   (`[domain, "list", params]`, `[domain, "detail", id]`, ...).
//! - **Store** holds results in an LRU together with in-flight fetches.
//! - **Coordinator** serves reads through the store, coalescing concurrent
//!   fetches of one key, and turns successful mutations into a
//!   [`MutationPlan`] that the store applies atomically.
//!
//! ## Configuration
//!
//! ```toml
//! [cache]
//! enabled = true
//! stale_time_ms = 30000
//! max_entries = 500
//! ```

mod config;
mod coordinator;
mod error;
mod keys;
mod lock;
mod planner;
mod state;
mod store;

pub use config::CacheConfig;
pub use coordinator::CacheCoordinator;
pub use error::{CacheError, FieldErrors};
pub use keys::{KeySegment, ParamValue, QueryKey, QueryKind, QueryParams};
pub use planner::{CacheAction, CacheInstruction, KeyTarget, MutationKind, MutationPlan};
pub use state::{MutationHandle, QueryState};
pub use store::{
    ApplyReport, CacheEntry, CacheStore, CachedData, EntrySnapshot, EntryState, FetchResult,
};
