use serde_json::Value;

use crate::domain::slug::derive_slug;
use crate::domain::{Category, NormalizationError};

use super::fields::{
    CountRule, IdRule, TextRule, as_object, require_id, require_text, resolve_count, resolve_text,
    resolve_timestamp,
};

const RESOURCE: &str = "categories";

const ID: &[IdRule] = &[IdRule::Field("id")];
const NAME: &[TextRule] = &[TextRule::Field("name"), TextRule::Field("title")];
const SLUG: &[TextRule] = &[TextRule::Field("slug")];
const DESCRIPTION: &[TextRule] = &[TextRule::Field("description")];
/// Displayed article counts depend on this order.
pub(crate) const ARTICLE_COUNT: &[CountRule] = &[
    CountRule::Number("article_count"),
    CountRule::Number("articles_count"),
    CountRule::Length("articles"),
];
const CREATED_AT: &[TextRule] = &[TextRule::Field("created_at"), TextRule::Field("createdAt")];
const UPDATED_AT: &[TextRule] = &[TextRule::Field("updated_at"), TextRule::Field("updatedAt")];

pub fn normalize_category(raw: &Value) -> Result<Category, NormalizationError> {
    let object = as_object(RESOURCE, raw)?;

    let id = require_id(RESOURCE, object, ID)?;
    let name = require_text(RESOURCE, object, NAME)?;
    let slug = resolve_text(RESOURCE, object, SLUG)?
        .filter(|slug| !slug.is_empty())
        .unwrap_or_else(|| derive_slug(&name, &id));

    Ok(Category {
        slug,
        description: resolve_text(RESOURCE, object, DESCRIPTION)?,
        article_count: resolve_count(object, ARTICLE_COUNT).unwrap_or(0),
        created_at: resolve_timestamp(RESOURCE, object, CREATED_AT)?,
        updated_at: resolve_timestamp(RESOURCE, object, UPDATED_AT)?,
        id,
        name,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn every_count_variant_yields_the_same_count() {
        let variants = [
            json!({"id": 1, "name": "Energy", "article_count": 3}),
            json!({"id": 1, "name": "Energy", "articles_count": 3}),
            json!({"id": 1, "name": "Energy", "articles": [{}, {}, {}]}),
            json!({"id": 1, "name": "Energy", "article_count": null, "articles_count": 3}),
        ];

        for raw in &variants {
            let category = normalize_category(raw).expect("valid category");
            assert_eq!(category.article_count, 3, "variant {raw}");
        }
    }

    #[test]
    fn absent_counts_default_to_zero() {
        let category = normalize_category(&json!({"id": 1, "title": "Energy"})).expect("valid");
        assert_eq!(category.article_count, 0);
        assert_eq!(category.name, "Energy");
        assert_eq!(category.slug, "energy");
        assert!(category.description.is_none());
    }

    #[test]
    fn empty_name_falls_back_to_id_for_slug() {
        let category = normalize_category(&json!({"id": 31, "name": ""})).expect("valid");
        assert_eq!(category.slug, "31");
    }

    #[test]
    fn missing_id_is_reported() {
        let err = normalize_category(&json!({"name": "Energy"})).expect_err("id required");
        assert_eq!(err, NormalizationError::missing("categories", "id"));
    }

    #[test]
    fn serialized_canonical_round_trips() {
        let original = normalize_category(&json!({
            "id": "7",
            "name": "Ocean Policy",
            "articles_count": 12,
            "description": "Seas and law",
            "created_at": "2024-01-02T03:04:05Z"
        }))
        .expect("valid category");

        let raw = serde_json::to_value(&original).expect("serializable");
        let again = normalize_category(&raw).expect("canonical form is a valid raw form");

        assert_eq!(again.id, original.id);
        assert_eq!(again.name, original.name);
        assert_eq!(again.slug, original.slug);
        assert_eq!(again, original);
    }
}
