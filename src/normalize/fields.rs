//! Field resolution rules shared by every resource normalizer.
//!
//! Each canonical field is backed by an ordered table of rules; the first rule
//! whose raw value has the expected JSON type wins. Supporting a new server
//! variant means adding one entry to the relevant table.

use serde_json::{Map, Value};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::domain::NormalizationError;

pub(crate) type RawObject = Map<String, Value>;

/// Sources for a non-negative count.
#[derive(Debug, Clone, Copy)]
pub(crate) enum CountRule {
    /// A whole, non-negative JSON number at the field.
    Number(&'static str),
    /// The length of a JSON array at the field.
    Length(&'static str),
}

/// Sources for a string.
#[derive(Debug, Clone, Copy)]
pub(crate) enum TextRule {
    Field(&'static str),
    Nested(&'static str, &'static str),
}

/// Sources for an identifier; numbers are rendered in decimal.
#[derive(Debug, Clone, Copy)]
pub(crate) enum IdRule {
    Field(&'static str),
    Nested(&'static str, &'static str),
}

/// Sources for a boolean.
#[derive(Debug, Clone, Copy)]
pub(crate) enum FlagRule {
    /// A JSON boolean at the field.
    Bool(&'static str),
    /// `true` when the field holds anything but `null`, `false` for `null`.
    NonNull(&'static str),
}

impl TextRule {
    fn path(self) -> String {
        match self {
            TextRule::Field(field) => field.to_string(),
            TextRule::Nested(outer, inner) => format!("{outer}.{inner}"),
        }
    }

    fn value(self, object: &RawObject) -> Option<&Value> {
        match self {
            TextRule::Field(field) => lookup(object, field, None),
            TextRule::Nested(outer, inner) => lookup(object, outer, Some(inner)),
        }
    }

    /// An object at this field is read by a nested rule of the same table.
    fn reads_through(self, rules: &[TextRule]) -> bool {
        match self {
            TextRule::Field(field) => rules
                .iter()
                .any(|rule| matches!(rule, TextRule::Nested(outer, _) if *outer == field)),
            TextRule::Nested(..) => false,
        }
    }
}

impl IdRule {
    fn path(self) -> String {
        match self {
            IdRule::Field(field) => field.to_string(),
            IdRule::Nested(outer, inner) => format!("{outer}.{inner}"),
        }
    }

    fn value(self, object: &RawObject) -> Option<&Value> {
        match self {
            IdRule::Field(field) => lookup(object, field, None),
            IdRule::Nested(outer, inner) => lookup(object, outer, Some(inner)),
        }
    }

    fn reads_through(self, rules: &[IdRule]) -> bool {
        match self {
            IdRule::Field(field) => rules
                .iter()
                .any(|rule| matches!(rule, IdRule::Nested(outer, _) if *outer == field)),
            IdRule::Nested(..) => false,
        }
    }
}

pub(crate) fn as_object<'a>(
    resource: &'static str,
    raw: &'a Value,
) -> Result<&'a RawObject, NormalizationError> {
    raw.as_object()
        .ok_or_else(|| NormalizationError::not_an_object(resource, "<root>"))
}

fn lookup<'a>(object: &'a RawObject, field: &str, inner: Option<&str>) -> Option<&'a Value> {
    let value = object.get(field)?;
    match inner {
        Some(inner) => value.as_object()?.get(inner),
        None => Some(value),
    }
}

fn whole_number(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    let n = value.as_f64()?;
    // Serializers that emit `3.0` for integer columns still mean 3.
    (n.is_finite() && n >= 0.0 && n.fract() == 0.0 && n < u64::MAX as f64).then_some(n as u64)
}

pub(crate) fn resolve_count(object: &RawObject, rules: &[CountRule]) -> Option<u64> {
    rules.iter().find_map(|rule| match *rule {
        CountRule::Number(field) => object.get(field).and_then(whole_number),
        CountRule::Length(field) => object
            .get(field)
            .and_then(Value::as_array)
            .map(|items| items.len() as u64),
    })
}

/// First string a rule yields. `null` and absent fields fall through; any
/// other type is contract drift and fails.
pub(crate) fn resolve_text(
    resource: &'static str,
    object: &RawObject,
    rules: &[TextRule],
) -> Result<Option<String>, NormalizationError> {
    for rule in rules {
        match rule.value(object) {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => return Ok(Some(text.clone())),
            Some(Value::Object(_)) if rule.reads_through(rules) => {}
            Some(_) => {
                return Err(NormalizationError::new(resource, rule.path(), "is not a string"));
            }
        }
    }
    Ok(None)
}

pub(crate) fn resolve_id(
    resource: &'static str,
    object: &RawObject,
    rules: &[IdRule],
) -> Result<Option<String>, NormalizationError> {
    for rule in rules {
        match rule.value(object) {
            None | Some(Value::Null) => {}
            Some(Value::String(id)) if id.is_empty() => {}
            Some(Value::String(id)) => return Ok(Some(id.clone())),
            Some(Value::Number(id)) => return Ok(Some(id.to_string())),
            Some(Value::Object(_)) if rule.reads_through(rules) => {}
            Some(_) => {
                return Err(NormalizationError::new(
                    resource,
                    rule.path(),
                    "is not a string or number",
                ));
            }
        }
    }
    Ok(None)
}

pub(crate) fn resolve_flag(object: &RawObject, rules: &[FlagRule]) -> Option<bool> {
    rules.iter().find_map(|rule| match *rule {
        FlagRule::Bool(field) => object.get(field).and_then(Value::as_bool),
        FlagRule::NonNull(field) => object.get(field).map(|value| !value.is_null()),
    })
}

pub(crate) fn require_id(
    resource: &'static str,
    object: &RawObject,
    rules: &[IdRule],
) -> Result<String, NormalizationError> {
    resolve_id(resource, object, rules)?.ok_or_else(|| {
        let field = rules.first().map(|rule| rule.path()).unwrap_or_default();
        NormalizationError::missing(resource, field)
    })
}

pub(crate) fn require_text(
    resource: &'static str,
    object: &RawObject,
    rules: &[TextRule],
) -> Result<String, NormalizationError> {
    resolve_text(resource, object, rules)?.ok_or_else(|| {
        let field = rules.first().map(|rule| rule.path()).unwrap_or_default();
        NormalizationError::missing(resource, field)
    })
}

/// Resolve an RFC 3339 timestamp. A string that does not parse is contract
/// drift and fails rather than silently dropping the value.
pub(crate) fn resolve_timestamp(
    resource: &'static str,
    object: &RawObject,
    rules: &[TextRule],
) -> Result<Option<OffsetDateTime>, NormalizationError> {
    for rule in rules {
        match rule.value(object) {
            None | Some(Value::Null) => {}
            Some(Value::String(text)) => {
                return OffsetDateTime::parse(text, &Rfc3339).map(Some).map_err(|err| {
                    NormalizationError::new(
                        resource,
                        rule.path(),
                        format!("is not an RFC 3339 timestamp: {err}"),
                    )
                });
            }
            Some(_) => {
                return Err(NormalizationError::new(resource, rule.path(), "is not a string"));
            }
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn object(value: Value) -> RawObject {
        value.as_object().cloned().expect("fixture is an object")
    }

    #[test]
    fn count_rules_apply_in_order_and_skip_wrong_types() {
        let rules = [
            CountRule::Number("article_count"),
            CountRule::Number("articles_count"),
            CountRule::Length("articles"),
        ];

        let raw = object(json!({"article_count": "3", "articles_count": 4, "articles": [1]}));
        assert_eq!(resolve_count(&raw, &rules), Some(4));

        let raw = object(json!({"articles": [1, 2]}));
        assert_eq!(resolve_count(&raw, &rules), Some(2));

        let raw = object(json!({"article_count": 5.0}));
        assert_eq!(resolve_count(&raw, &rules), Some(5));

        let raw = object(json!({"article_count": -1}));
        assert_eq!(resolve_count(&raw, &rules), None);
    }

    #[test]
    fn id_accepts_strings_and_numbers() -> Result<(), NormalizationError> {
        let rules = [IdRule::Field("id"), IdRule::Nested("category", "id")];
        assert_eq!(resolve_id("articles", &object(json!({"id": 12})), &rules)?, Some("12".to_string()));
        assert_eq!(resolve_id("articles", &object(json!({"id": "ab"})), &rules)?, Some("ab".to_string()));
        assert_eq!(
            resolve_id("articles", &object(json!({"id": "", "category": {"id": 3}})), &rules)?,
            Some("3".to_string())
        );

        let err = resolve_id("articles", &object(json!({"id": true})), &rules)
            .expect_err("boolean id");
        assert_eq!(err.field, "id");
        assert_eq!(err.reason, "is not a string or number");
        Ok(())
    }

    #[test]
    fn object_falls_through_only_to_a_nested_rule() -> Result<(), NormalizationError> {
        let author = [TextRule::Field("author"), TextRule::Nested("author", "name")];
        let raw = object(json!({"author": {"name": "Ada"}}));
        assert_eq!(resolve_text("articles", &raw, &author)?, Some("Ada".to_string()));

        let category = [IdRule::Field("category_id"), IdRule::Nested("category", "id"), IdRule::Field("category")];
        assert_eq!(resolve_id("articles", &object(json!({"category": 4})), &category)?, Some("4".to_string()));

        let description = [TextRule::Field("description")];
        let err = resolve_text("categories", &object(json!({"description": {"text": "x"}})), &description)
            .expect_err("object description");
        assert_eq!(err.field, "description");
        Ok(())
    }

    #[test]
    fn missing_required_field_names_first_rule() {
        let rules = [TextRule::Field("name"), TextRule::Field("title")];
        let err = require_text("categories", &object(json!({"title": null})), &rules)
            .expect_err("no name");
        assert_eq!(err.field, "name");
        assert_eq!(err.reason, "is missing");
    }

    #[test]
    fn mistyped_text_field_is_reported_not_skipped() -> Result<(), NormalizationError> {
        let rules = [TextRule::Field("name"), TextRule::Field("title")];
        let err = require_text("categories", &object(json!({"name": 1, "title": "Energy"})), &rules)
            .expect_err("numeric name");
        assert_eq!(err.field, "name");
        assert_eq!(err.reason, "is not a string");

        let raw = object(json!({"name": null, "title": "Energy"}));
        assert_eq!(require_text("categories", &raw, &rules)?, "Energy");
        Ok(())
    }

    #[test]
    fn flags_distinguish_null_from_absent() {
        let rules = [FlagRule::Bool("has_next_page"), FlagRule::NonNull("next")];
        assert_eq!(resolve_flag(&object(json!({"next": null})), &rules), Some(false));
        assert_eq!(resolve_flag(&object(json!({"next": "/x?page=2"})), &rules), Some(true));
        assert_eq!(resolve_flag(&object(json!({})), &rules), None);
    }

    #[test]
    fn malformed_timestamp_is_an_error() {
        let rules = [TextRule::Field("created_at"), TextRule::Field("createdAt")];
        let ok = resolve_timestamp(
            "articles",
            &object(json!({"createdAt": "2024-05-01T10:00:00Z"})),
            &rules,
        )
        .expect("valid timestamp");
        assert!(ok.is_some());

        let err = resolve_timestamp("articles", &object(json!({"created_at": "yesterday"})), &rules)
            .expect_err("invalid timestamp");
        assert_eq!(err.field, "created_at");
    }
}
