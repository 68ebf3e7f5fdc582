//! What a view renders: query state and mutation status.

use std::future::Future;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use super::error::CacheError;
use super::lock::mutex_lock;
use super::store::{EntrySnapshot, EntryState};

const SOURCE: &str = "cache::state";

#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// Last known data, possibly stale.
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<CacheError>,
}

impl<T> QueryState<T> {
    /// Convert the data; data `convert` rejects is treated as absent.
    pub fn map_data<U>(self, convert: impl FnOnce(T) -> Option<U>) -> QueryState<U> {
        QueryState {
            data: self.data.and_then(convert),
            is_loading: self.is_loading,
            error: self.error,
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

impl From<EntrySnapshot> for QueryState<super::store::CachedData> {
    fn from(snapshot: EntrySnapshot) -> Self {
        Self {
            is_loading: snapshot.state == EntryState::Fetching,
            data: snapshot.data,
            error: snapshot.error,
        }
    }
}

#[derive(Debug, Default)]
struct MutationStatus {
    pending: AtomicUsize,
    error: Mutex<Option<CacheError>>,
}

/// Tracks mutations issued from one place in the UI.
///
/// Clones share status, so a form and its submit button can observe the same
/// `is_pending` flag.
#[derive(Debug, Clone, Default)]
pub struct MutationHandle {
    status: Arc<MutationStatus>,
}

impl MutationHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `mutation`, tracking it as pending until it settles or is dropped.
    /// The error of the last failed run is kept until the next run starts.
    pub async fn mutate<T, Fut>(&self, mutation: Fut) -> Result<T, CacheError>
    where
        Fut: Future<Output = Result<T, CacheError>>,
    {
        *mutex_lock(&self.status.error, SOURCE, "mutate.reset") = None;
        let _pending = PendingGuard::enter(&self.status);

        let result = mutation.await;
        if let Err(err) = &result {
            *mutex_lock(&self.status.error, SOURCE, "mutate.error") = Some(err.clone());
        }
        result
    }

    pub fn is_pending(&self) -> bool {
        self.status.pending.load(Ordering::Acquire) > 0
    }

    pub fn error(&self) -> Option<CacheError> {
        mutex_lock(&self.status.error, SOURCE, "error").clone()
    }
}

struct PendingGuard<'a> {
    status: &'a MutationStatus,
}

impl<'a> PendingGuard<'a> {
    fn enter(status: &'a MutationStatus) -> Self {
        status.pending.fetch_add(1, Ordering::AcqRel);
        Self { status }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.status.pending.fetch_sub(1, Ordering::AcqRel);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::oneshot;

    use super::*;

    #[tokio::test]
    async fn handle_tracks_pending_and_error() {
        let handle = MutationHandle::new();
        let (release, wait) = oneshot::channel::<()>();

        let observer = handle.clone();
        let running = tokio::spawn(async move {
            observer
                .mutate(async move {
                    let _ = wait.await;
                    Err::<(), _>(CacheError::network("offline"))
                })
                .await
        });

        tokio::task::yield_now().await;
        while !handle.is_pending() {
            tokio::task::yield_now().await;
        }
        release.send(()).expect("mutation still waiting");
        let result = running.await.expect("task completes");

        assert_eq!(result, Err(CacheError::network("offline")));
        assert!(!handle.is_pending());
        assert_eq!(handle.error(), Some(CacheError::network("offline")));

        handle.mutate(async { Ok(()) }).await.expect("succeeds");
        assert_eq!(handle.error(), None);
    }

    #[test]
    fn snapshot_maps_to_view_state() {
        let fetching = QueryState::from(EntrySnapshot {
            state: EntryState::Fetching,
            data: None,
            error: Some(CacheError::network("offline")),
        });
        assert!(fetching.is_loading);
        assert!(fetching.data.is_none());

        let mapped = fetching.map_data(|_| Some(1_u8));
        assert_eq!(mapped.error, Some(CacheError::network("offline")));
    }
}
