//! Read-through caching and mutation-driven cache maintenance.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::Value;
use tracing::{Instrument, debug, info, instrument, warn};

use crate::domain::{Domain, NormalizationError, Resource};
use crate::normalize::{normalize_entity, normalize_envelope};

use super::config::CacheConfig;
use super::error::CacheError;
use super::keys::{QueryKey, QueryKind, QueryParams};
use super::planner::{MutationKind, MutationPlan};
use super::state::QueryState;
use super::store::{CacheStore, CachedData, FetchResult, Lookup};

const METRIC_CACHE_HIT: &str = "folio_cache_hit_total";
const METRIC_CACHE_MISS: &str = "folio_cache_miss_total";
const METRIC_CACHE_COALESCED: &str = "folio_cache_coalesced_total";
const METRIC_CACHE_INVALIDATED: &str = "folio_cache_invalidated_total";
const METRIC_CACHE_FETCH_MS: &str = "folio_cache_fetch_ms";
const METRIC_CACHE_MUTATION_MS: &str = "folio_cache_mutation_ms";

/// Entry point for every cached read and every cache-affecting write.
///
/// Reads are served from the store while fresh; otherwise one fetch per key
/// runs and every concurrent reader of that key awaits it. Writes run first
/// and only a successful one changes the cache, through a [`MutationPlan`].
#[derive(Clone)]
pub struct CacheCoordinator {
    enabled: bool,
    store: Arc<CacheStore>,
}

impl CacheCoordinator {
    pub fn new(config: &CacheConfig, store: Arc<CacheStore>) -> Self {
        Self {
            enabled: config.enabled,
            store,
        }
    }

    pub fn store(&self) -> &Arc<CacheStore> {
        &self.store
    }

    /// Read `(domain, kind, params)` through the cache.
    ///
    /// `fetcher` returns the raw response body; it is normalized as one entity
    /// for detail kinds and as a page envelope otherwise. The fetch runs on its
    /// own task and populates the cache even if every caller stops waiting.
    #[instrument(skip_all, fields(%domain))]
    pub async fn query<F, Fut>(
        &self,
        domain: Domain,
        kind: &QueryKind,
        params: &QueryParams,
        fetcher: F,
    ) -> FetchResult
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, CacheError>> + Send + 'static,
    {
        let key = QueryKey::build(domain, kind, Some(params));
        let single = kind.is_single();

        if !self.enabled {
            return fetch_and_normalize(domain, single, params.clone(), fetcher()).await;
        }

        match self.store.lookup(&key) {
            Lookup::Hit(data) => {
                counter!(METRIC_CACHE_HIT).increment(1);
                debug!(%key, "Cache hit");
                Ok(data)
            }
            Lookup::Join(shared) => {
                counter!(METRIC_CACHE_COALESCED).increment(1);
                debug!(%key, "Joined in-flight fetch");
                shared.await
            }
            Lookup::Lead(ticket, shared) => {
                counter!(METRIC_CACHE_MISS).increment(1);
                debug!(%key, "Cache miss; fetching");
                let fetch = fetcher();
                let store = Arc::clone(&self.store);
                let params = params.clone();
                tokio::spawn(
                    async move {
                        let started_at = Instant::now();
                        let result = fetch_and_normalize(domain, single, params, fetch).await;
                        histogram!(METRIC_CACHE_FETCH_MS)
                            .record(started_at.elapsed().as_secs_f64() * 1000.0);
                        if let Err(err) = &result {
                            debug!(key = %ticket.key(), error = %err, "Fetch failed");
                        }
                        store.complete(ticket, result);
                    }
                    .in_current_span(),
                );
                shared.await
            }
            Lookup::Bypass => {
                debug!(%key, "Cache store disposed; reading through");
                fetch_and_normalize(domain, single, params.clone(), fetcher()).await
            }
        }
    }

    /// Run a write and bring the cache in line with its result.
    ///
    /// On success, in order: the detail entry of the mutated id is patched,
    /// every list of `domain` is marked stale, each prefix in `affected` is
    /// marked stale, and on delete the detail entry is removed. A failed write
    /// changes nothing. A successful write whose response cannot be
    /// normalized invalidates instead of patching and returns the
    /// normalization error.
    #[instrument(skip_all, fields(%domain, op = kind.label()))]
    pub async fn mutate<F, Fut>(
        &self,
        domain: Domain,
        kind: MutationKind,
        fetcher: F,
        affected: &[QueryKey],
    ) -> Result<Option<Resource>, CacheError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Value, CacheError>>,
    {
        let started_at = Instant::now();
        let previous = kind
            .target_id()
            .and_then(|id| self.store.cached_entity(&QueryKey::detail(domain, id)));

        let body = match fetcher().await {
            Ok(body) => body,
            Err(err) => {
                info!(error = %err, error_kind = err.kind(), "Mutation failed; cache untouched");
                return Err(err);
            }
        };

        let (updated, failure) = match &kind {
            // Delete responses are often empty; the entity is optional.
            MutationKind::Delete { .. } => (normalize_entity(domain, &body).ok(), None),
            _ => match normalize_entity(domain, &body) {
                Ok(resource) => (Some(resource), None),
                Err(err) => {
                    log_normalization_failure(&err);
                    (None, Some(err))
                }
            },
        };

        if self.enabled {
            let plan = MutationPlan::for_mutation(
                domain,
                &kind,
                updated.as_ref(),
                previous.as_ref(),
                affected,
            );
            let report = self.store.apply(&plan);
            counter!(METRIC_CACHE_INVALIDATED).increment(report.invalidated as u64);
            info!(
                plan = %plan,
                patched = report.patched,
                invalidated = report.invalidated,
                removed = report.removed,
                superseded = report.superseded,
                "Applied mutation plan"
            );
        }

        histogram!(METRIC_CACHE_MUTATION_MS, "op" => kind.label())
            .record(started_at.elapsed().as_secs_f64() * 1000.0);

        match failure {
            Some(err) => Err(err.into()),
            None => Ok(updated),
        }
    }

    /// Current state of `key` without fetching.
    pub fn peek(&self, key: &QueryKey) -> QueryState<CachedData> {
        QueryState::from(self.store.snapshot(key))
    }
}

async fn fetch_and_normalize<Fut>(
    domain: Domain,
    single: bool,
    params: QueryParams,
    fetch: Fut,
) -> FetchResult
where
    Fut: Future<Output = Result<Value, CacheError>>,
{
    let body = fetch.await?;
    let normalized = if single {
        normalize_entity(domain, &body).map(CachedData::Entity)
    } else {
        normalize_envelope(domain, &body, &params).map(CachedData::Page)
    };
    normalized.map_err(|err| {
        log_normalization_failure(&err);
        CacheError::from(err)
    })
}

fn log_normalization_failure(err: &NormalizationError) {
    warn!(
        resource = err.resource,
        field = %err.field,
        reason = %err.reason,
        "Server payload could not be normalized"
    );
}
