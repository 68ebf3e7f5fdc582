use serde_json::Value;

use crate::domain::slug::derive_slug;
use crate::domain::{Article, NormalizationError};

use super::fields::{
    CountRule, IdRule, RawObject, TextRule, as_object, require_id, require_text, resolve_count,
    resolve_id, resolve_text, resolve_timestamp,
};

const RESOURCE: &str = "articles";

const ID: &[IdRule] = &[IdRule::Field("id")];
const TITLE: &[TextRule] = &[TextRule::Field("title"), TextRule::Field("name")];
const SLUG: &[TextRule] = &[TextRule::Field("slug")];
const EXCERPT: &[TextRule] = &[
    TextRule::Field("excerpt"),
    TextRule::Field("summary"),
    TextRule::Field("description"),
];
const BODY: &[TextRule] = &[TextRule::Field("content"), TextRule::Field("body")];
const CATEGORY_ID: &[IdRule] = &[
    IdRule::Field("category_id"),
    IdRule::Nested("category", "id"),
    IdRule::Field("category"),
];
const AUTHOR: &[TextRule] = &[
    TextRule::Field("author"),
    TextRule::Nested("author", "name"),
    TextRule::Nested("author", "username"),
    TextRule::Field("author_name"),
];
const COMMENT_COUNT: &[CountRule] = &[
    CountRule::Number("comment_count"),
    CountRule::Number("comments_count"),
    CountRule::Length("comments"),
];
const REACTION_COUNT: &[CountRule] = &[
    CountRule::Number("reaction_count"),
    CountRule::Number("reactions_count"),
    CountRule::Length("reactions"),
];
const PUBLISHED_AT: &[TextRule] = &[TextRule::Field("published_at"), TextRule::Field("publishedAt")];
const CREATED_AT: &[TextRule] = &[TextRule::Field("created_at"), TextRule::Field("createdAt")];
const UPDATED_AT: &[TextRule] = &[TextRule::Field("updated_at"), TextRule::Field("updatedAt")];

/// Normalize one raw article payload.
pub fn normalize_article(raw: &Value) -> Result<Article, NormalizationError> {
    let object = as_object(RESOURCE, raw)?;

    let id = require_id(RESOURCE, object, ID)?;
    let title = require_text(RESOURCE, object, TITLE)?;
    let slug = resolve_text(RESOURCE, object, SLUG)?
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| derive_slug(&title, &id));

    Ok(Article {
        slug,
        excerpt: resolve_text(RESOURCE, object, EXCERPT)?,
        body: resolve_text(RESOURCE, object, BODY)?,
        category_id: resolve_id(RESOURCE, object, CATEGORY_ID)?,
        author: resolve_text(RESOURCE, object, AUTHOR)?,
        tags: tags(object),
        comment_count: resolve_count(object, COMMENT_COUNT).unwrap_or(0),
        reaction_count: resolve_count(object, REACTION_COUNT).unwrap_or(0),
        published_at: resolve_timestamp(RESOURCE, object, PUBLISHED_AT)?,
        created_at: resolve_timestamp(RESOURCE, object, CREATED_AT)?,
        updated_at: resolve_timestamp(RESOURCE, object, UPDATED_AT)?,
        id,
        title,
    })
}

// Tags arrive either as plain names or as `{ "name": ... }` objects.
fn tags(object: &RawObject) -> Vec<String> {
    let Some(items) = object.get("tags").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            item.as_str()
                .or_else(|| item.get("name").and_then(Value::as_str))
                .map(str::to_string)
        })
        .collect()
}
