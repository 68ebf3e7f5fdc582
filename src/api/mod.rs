//! Typed per-resource handles over the cached transport.
//!
//! Every read goes through the [`CacheCoordinator`] and every write through
//! [`CacheCoordinator::mutate`], so views built on these handles always see
//! the cache kept consistent after their own mutations.

use std::marker::PhantomData;

use serde_json::Value;

use crate::cache::{
    CacheCoordinator, CacheError, CachedData, MutationKind, QueryKey, QueryKind, QueryParams,
    QueryState,
};
use crate::domain::{
    Article, Canonical, Category, Collection, Domain, NormalizationError, Page, Resource,
};
use crate::infra::http::ResourceClient;

#[derive(Clone)]
pub struct ContentApi {
    coordinator: CacheCoordinator,
    client: ResourceClient,
}

impl ContentApi {
    pub fn new(coordinator: CacheCoordinator, client: ResourceClient) -> Self {
        Self {
            coordinator,
            client,
        }
    }

    pub fn coordinator(&self) -> &CacheCoordinator {
        &self.coordinator
    }

    pub fn articles(&self) -> ResourceApi<Article> {
        self.resource()
    }

    pub fn categories(&self) -> ResourceApi<Category> {
        self.resource()
    }

    pub fn collections(&self) -> ResourceApi<Collection> {
        self.resource()
    }

    pub fn resource<T: Canonical>(&self) -> ResourceApi<T> {
        ResourceApi {
            coordinator: self.coordinator.clone(),
            client: self.client.clone(),
            _marker: PhantomData,
        }
    }
}

/// Reads and writes for the resource type `T`.
pub struct ResourceApi<T> {
    coordinator: CacheCoordinator,
    client: ResourceClient,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ResourceApi<T> {
    fn clone(&self) -> Self {
        Self {
            coordinator: self.coordinator.clone(),
            client: self.client.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T: Canonical> ResourceApi<T> {
    pub async fn list(&self, params: &QueryParams) -> Result<Page<T>, CacheError> {
        self.page(QueryKind::List, params, params.clone()).await
    }

    /// Full-text search; the term travels as the `search` parameter.
    pub async fn search(&self, term: &str, params: &QueryParams) -> Result<Page<T>, CacheError> {
        let params = params.clone().with("search", term);
        self.page(QueryKind::Search, &params, params.clone()).await
    }

    pub async fn by_category(
        &self,
        category_id: &str,
        params: &QueryParams,
    ) -> Result<Page<T>, CacheError> {
        let request = params.clone().with("category", category_id);
        self.page(QueryKind::ByCategory(category_id.to_string()), params, request)
            .await
    }

    pub async fn by_tag(&self, tag: &str, params: &QueryParams) -> Result<Page<T>, CacheError> {
        let request = params.clone().with("tag", tag);
        self.page(QueryKind::ByTag(tag.to_string()), params, request).await
    }

    pub async fn by_author(&self, author: &str, params: &QueryParams) -> Result<Page<T>, CacheError> {
        let request = params.clone().with("author", author);
        self.page(QueryKind::ByAuthor(author.to_string()), params, request)
            .await
    }

    pub async fn detail(&self, id: &str) -> Result<T, CacheError> {
        let client = self.client.clone();
        let id = id.to_string();
        let kind = QueryKind::Detail(id.clone());
        let data = self
            .coordinator
            .query(T::DOMAIN, &kind, &QueryParams::new(), move || async move {
                client.detail(T::DOMAIN, &id).await
            })
            .await?;
        into_entity(data)
    }

    pub async fn by_slug(&self, slug: &str) -> Result<T, CacheError> {
        let client = self.client.clone();
        let slug = slug.to_string();
        let kind = QueryKind::BySlug(slug.clone());
        let data = self
            .coordinator
            .query(T::DOMAIN, &kind, &QueryParams::new(), move || async move {
                client.by_slug(T::DOMAIN, &slug).await
            })
            .await?;
        into_entity(data)
    }

    pub async fn create(&self, body: Value) -> Result<T, CacheError> {
        let client = self.client.clone();
        let created = self
            .coordinator
            .mutate(
                T::DOMAIN,
                MutationKind::Create,
                move || async move { client.create(T::DOMAIN, &body).await },
                &dependent_keys(T::DOMAIN),
            )
            .await?;
        written(created)
    }

    pub async fn update(&self, id: &str, body: Value) -> Result<T, CacheError> {
        let client = self.client.clone();
        let target = id.to_string();
        let updated = self
            .coordinator
            .mutate(
                T::DOMAIN,
                MutationKind::update(id),
                move || async move { client.update(T::DOMAIN, &target, &body).await },
                &dependent_keys(T::DOMAIN),
            )
            .await?;
        written(updated)
    }

    pub async fn delete(&self, id: &str) -> Result<(), CacheError> {
        let client = self.client.clone();
        let target = id.to_string();
        self.coordinator
            .mutate(
                T::DOMAIN,
                MutationKind::delete(id),
                move || async move { client.delete(T::DOMAIN, &target).await },
                &dependent_keys(T::DOMAIN),
            )
            .await?;
        Ok(())
    }

    /// Cached state of `detail(id)` for rendering without a fetch.
    pub fn peek_detail(&self, id: &str) -> QueryState<T> {
        self.coordinator
            .peek(&QueryKey::detail(T::DOMAIN, id))
            .map_data(|data| into_entity(data).ok())
    }

    pub fn peek_list(&self, params: &QueryParams) -> QueryState<Page<T>> {
        self.coordinator
            .peek(&QueryKey::list(T::DOMAIN, params))
            .map_data(|data| into_page(data).ok())
    }

    async fn page(
        &self,
        kind: QueryKind,
        key_params: &QueryParams,
        request: QueryParams,
    ) -> Result<Page<T>, CacheError> {
        let client = self.client.clone();
        let data = self
            .coordinator
            .query(T::DOMAIN, &kind, key_params, move || async move {
                client.list(T::DOMAIN, &request).await
            })
            .await?;
        into_page(data)
    }
}

/// Prefixes whose cached data embeds or counts entities of `domain`.
fn dependent_keys(domain: Domain) -> Vec<QueryKey> {
    match domain {
        Domain::Articles => vec![
            QueryKey::all(Domain::Categories),
            QueryKey::all(Domain::Collections),
        ],
        Domain::Categories | Domain::Collections => Vec::new(),
    }
}

fn foreign<T: Canonical>() -> CacheError {
    NormalizationError::new(T::DOMAIN.as_str(), "<root>", "belongs to another resource type").into()
}

fn into_entity<T: Canonical>(data: CachedData) -> Result<T, CacheError> {
    match data {
        CachedData::Entity(resource) => T::from_resource(resource).ok_or_else(foreign::<T>),
        CachedData::Page(_) => Err(NormalizationError::not_an_object(T::DOMAIN.as_str(), "<root>").into()),
    }
}

fn into_page<T: Canonical>(data: CachedData) -> Result<Page<T>, CacheError> {
    match data {
        CachedData::Page(page) => {
            page.try_map(|resource| T::from_resource(resource).ok_or_else(foreign::<T>))
        }
        CachedData::Entity(_) => Err(NormalizationError::new(
            T::DOMAIN.as_str(),
            "data",
            "is not an array",
        )
        .into()),
    }
}

fn written<T: Canonical>(resource: Option<Resource>) -> Result<T, CacheError> {
    resource
        .and_then(T::from_resource)
        .ok_or_else(foreign::<T>)
}
