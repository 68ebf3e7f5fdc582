use serde_json::Value;

use crate::domain::slug::derive_slug;
use crate::domain::{Article, Collection, NormalizationError};

use super::article::normalize_article;
use super::category::ARTICLE_COUNT;
use super::fields::{
    IdRule, RawObject, TextRule, as_object, require_id, require_text, resolve_count, resolve_text,
    resolve_timestamp,
};

const RESOURCE: &str = "collections";

const ID: &[IdRule] = &[IdRule::Field("id")];
const NAME: &[TextRule] = &[TextRule::Field("name"), TextRule::Field("title")];
const SLUG: &[TextRule] = &[TextRule::Field("slug")];
const DESCRIPTION: &[TextRule] = &[TextRule::Field("description")];
const CREATED_AT: &[TextRule] = &[TextRule::Field("created_at"), TextRule::Field("createdAt")];
const UPDATED_AT: &[TextRule] = &[TextRule::Field("updated_at"), TextRule::Field("updatedAt")];

pub fn normalize_collection(raw: &Value) -> Result<Collection, NormalizationError> {
    let object = as_object(RESOURCE, raw)?;

    let id = require_id(RESOURCE, object, ID)?;
    let name = require_text(RESOURCE, object, NAME)?;
    let slug = resolve_text(RESOURCE, object, SLUG)?
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| derive_slug(&name, &id));

    Ok(Collection {
        slug,
        description: resolve_text(RESOURCE, object, DESCRIPTION)?,
        article_count: resolve_count(object, ARTICLE_COUNT).unwrap_or(0),
        articles: articles(object)?,
        created_at: resolve_timestamp(RESOURCE, object, CREATED_AT)?,
        updated_at: resolve_timestamp(RESOURCE, object, UPDATED_AT)?,
        id,
        name,
    })
}

fn articles(object: &RawObject) -> Result<Vec<Article>, NormalizationError> {
    let Some(items) = object.get("articles").and_then(Value::as_array) else {
        return Ok(Vec::new());
    };
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            normalize_article(item)
                .map_err(|err| err.nested(RESOURCE, &format!("articles[{index}]")))
        })
        .collect()
}
