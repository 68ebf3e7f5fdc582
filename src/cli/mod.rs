//! Command execution for the `folio` binary.
//!
//! Commands run against a [`ContentApi`], so repeated reads within one
//! process share the query cache.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{Value, json};
use thiserror::Error;

use crate::api::{ContentApi, ResourceApi};
use crate::cache::{CacheConfig, CacheCoordinator, CacheError, CacheStore, QueryParams};
use crate::config::{
    Command, CreateArgs, EntityArgs, ListArgs, LoadError, Settings, SlugArgs, UpdateArgs,
};
use crate::domain::{Canonical, Domain};
use crate::infra::error::InfraError;
use crate::infra::http::{ResourceClient, StaticToken, TokenProvider};

mod io;
mod print;

pub use io::read_payload;
pub use print::print_json;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("failed to load configuration: {0}")]
    Config(#[from] LoadError),
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error(transparent)]
    Api(#[from] CacheError),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("failed to render output: {0}")]
    Output(String),
}

/// Wire the cache, transport and resource handles from settings.
pub fn build_api(settings: &Settings) -> Result<ContentApi, CliError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = Arc::new(CacheStore::new(&cache_config));
    let coordinator = CacheCoordinator::new(&cache_config, store);

    let tokens: Arc<dyn TokenProvider> = Arc::new(StaticToken::from(settings.api.token.clone()));
    let client = ResourceClient::new(settings.api.base_url.as_str(), tokens, settings.api.timeout)?;

    Ok(ContentApi::new(coordinator, client))
}

macro_rules! for_domain {
    ($api:expr, $domain:expr, $handler:ident($($arg:expr),*)) => {
        match $domain {
            Domain::Articles => $handler($api.articles(), $($arg),*).await,
            Domain::Categories => $handler($api.categories(), $($arg),*).await,
            Domain::Collections => $handler($api.collections(), $($arg),*).await,
        }
    };
}

/// Run one command and return the document to print.
pub async fn execute(api: &ContentApi, command: Command) -> Result<Value, CliError> {
    match command {
        Command::List(args) => for_domain!(api, args.domain, list(&args)),
        Command::Get(EntityArgs { domain, id }) => for_domain!(api, domain, get(&id)),
        Command::Slug(SlugArgs { domain, slug }) => for_domain!(api, domain, by_slug(&slug)),
        Command::Create(CreateArgs { domain, payload }) => {
            let body = read_payload(payload)?;
            for_domain!(api, domain, create(body))
        }
        Command::Update(UpdateArgs {
            domain,
            id,
            payload,
        }) => {
            let body = read_payload(payload)?;
            for_domain!(api, domain, update(&id, body))
        }
        Command::Delete(EntityArgs { domain, id }) => {
            for_domain!(api, domain, delete(&id))?;
            Ok(json!({ "domain": domain, "id": id, "deleted": true }))
        }
    }
}

async fn list<T: Canonical + Serialize>(
    resource: ResourceApi<T>,
    args: &ListArgs,
) -> Result<Value, CliError> {
    let params = QueryParams::new()
        .with_opt("page", args.page)
        .with_opt("limit", args.limit);

    let page = if let Some(term) = args.search.as_deref() {
        resource.search(term, &params).await?
    } else if let Some(category) = args.category.as_deref() {
        resource.by_category(category, &params).await?
    } else if let Some(tag) = args.tag.as_deref() {
        resource.by_tag(tag, &params).await?
    } else if let Some(author) = args.author.as_deref() {
        resource.by_author(author, &params).await?
    } else {
        resource.list(&params).await?
    };
    to_value(&page)
}

async fn get<T: Canonical + Serialize>(resource: ResourceApi<T>, id: &str) -> Result<Value, CliError> {
    to_value(&resource.detail(id).await?)
}

async fn by_slug<T: Canonical + Serialize>(
    resource: ResourceApi<T>,
    slug: &str,
) -> Result<Value, CliError> {
    to_value(&resource.by_slug(slug).await?)
}

async fn create<T: Canonical + Serialize>(
    resource: ResourceApi<T>,
    body: Value,
) -> Result<Value, CliError> {
    to_value(&resource.create(body).await?)
}

async fn update<T: Canonical + Serialize>(
    resource: ResourceApi<T>,
    id: &str,
    body: Value,
) -> Result<Value, CliError> {
    to_value(&resource.update(id, body).await?)
}

async fn delete<T: Canonical>(resource: ResourceApi<T>, id: &str) -> Result<(), CliError> {
    resource.delete(id).await.map_err(CliError::from)
}

fn to_value<T: Serialize>(value: &T) -> Result<Value, CliError> {
    serde_json::to_value(value).map_err(|err| CliError::Output(err.to_string()))
}
