//! Query key definitions.
//!
//! A `QueryKey` is the structural identity of one cached query result:
//! `[domain]`, `[domain, "list", ...qualifiers, params]` or
//! `[domain, "detail", ...]`. Keys are rebuilt from parameters on every read,
//! so equal inputs must yield equal keys.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::domain::Domain;

const LIST: &str = "list";
const DETAIL: &str = "detail";
const SLUG: &str = "slug";

/// One normalized query parameter value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Text(String),
    List(Vec<ParamValue>),
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(value) => write!(f, "{value}"),
            ParamValue::Int(value) => write!(f, "{value}"),
            ParamValue::Text(value) => f.write_str(value),
            ParamValue::List(values) => {
                let joined: Vec<String> = values.iter().map(ToString::to_string).collect();
                f.write_str(&joined.join(","))
            }
        }
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Int(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Int(i64::from(value))
    }
}

impl From<u64> for ParamValue {
    fn from(value: u64) -> Self {
        // Integers share one representation so `1_u64` and `1_i32` key alike.
        i64::try_from(value)
            .map(ParamValue::Int)
            .unwrap_or_else(|_| ParamValue::Text(value.to_string()))
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl ParamValue {
    /// Convert a JSON value; `null` is treated as absent.
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::Bool(value) => Some(ParamValue::Bool(*value)),
            Value::Number(number) => Some(
                number
                    .as_i64()
                    .map(ParamValue::Int)
                    .unwrap_or_else(|| ParamValue::Text(number.to_string())),
            ),
            Value::String(value) => Some(ParamValue::Text(value.clone())),
            Value::Array(values) => Some(ParamValue::List(
                values.iter().filter_map(ParamValue::from_json).collect(),
            )),
            // serde_json maps are key-ordered, so the rendering is canonical.
            Value::Object(_) => Some(ParamValue::Text(value.to_string())),
        }
    }
}

/// Query parameters with absent values dropped and keys kept in order.
///
/// `{page: 1, limit: None}` and `{page: 1}` are the same parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct QueryParams(BTreeMap<String, ParamValue>);

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ParamValue>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Insert `value` when present; `None` leaves the parameters unchanged.
    #[must_use]
    pub fn with_opt<V: Into<ParamValue>>(self, key: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.with(key, value),
            None => self,
        }
    }

    /// Build from a JSON object, dropping `null` members. Non-objects yield
    /// empty parameters.
    pub fn from_json(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return Self::default();
        };
        Self(
            object
                .iter()
                .filter_map(|(key, value)| {
                    ParamValue::from_json(value).map(|value| (key.clone(), value))
                })
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.0.get(key)
    }

    pub fn get_u64(&self, key: &str) -> Option<u64> {
        match self.0.get(key)? {
            ParamValue::Int(value) => u64::try_from(*value).ok(),
            ParamValue::Text(value) => value.parse().ok(),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Render as URL query pairs in key order.
    pub fn to_query_pairs(&self) -> Vec<(String, String)> {
        self.0
            .iter()
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect()
    }
}

impl<K: Into<String>, V: Into<ParamValue>> FromIterator<(K, Option<V>)> for QueryParams {
    fn from_iter<I: IntoIterator<Item = (K, Option<V>)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::default(), |params, (key, value)| params.with_opt(key, value))
    }
}

impl fmt::Display for QueryParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (key, value) in &self.0 {
            if !first {
                f.write_str("&")?;
            }
            first = false;
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

/// What a query asks for within a domain.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// Every cached query of the domain; used as an invalidation prefix and as
    /// the unfiltered collection read.
    All,
    List,
    Detail(String),
    BySlug(String),
    ByCategory(String),
    ByTag(String),
    ByAuthor(String),
    Search,
}

impl QueryKind {
    /// Detail kind for any id, numbers included.
    pub fn detail(id: impl ToString) -> Self {
        QueryKind::Detail(id.to_string())
    }

    pub fn by_slug(slug: impl Into<String>) -> Self {
        QueryKind::BySlug(slug.into())
    }

    /// Whether the response is a single entity rather than a page.
    pub fn is_single(&self) -> bool {
        matches!(self, QueryKind::Detail(_) | QueryKind::BySlug(_))
    }
}

/// One key segment: a literal or the normalized parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeySegment {
    Text(String),
    Params(QueryParams),
}

impl KeySegment {
    fn text(value: impl Into<String>) -> Self {
        KeySegment::Text(value.into())
    }

    fn is_text(&self, expected: &str) -> bool {
        matches!(self, KeySegment::Text(value) if value == expected)
    }
}

/// Structural identity of one cached query result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey {
    domain: Domain,
    segments: Vec<KeySegment>,
}

impl QueryKey {
    /// Derive the key for `(domain, kind, params)`.
    ///
    /// List-like kinds always carry a params segment, possibly empty, so that
    /// `None` and empty parameters share a key. Single-entity kinds ignore
    /// `params`.
    pub fn build(domain: Domain, kind: &QueryKind, params: Option<&QueryParams>) -> Self {
        let params = || KeySegment::Params(params.cloned().unwrap_or_default());
        let mut key = Self::all(domain);
        match kind {
            QueryKind::All => {}
            QueryKind::List => {
                key.push(KeySegment::text(LIST));
                key.push(params());
            }
            QueryKind::Search => {
                key.push(KeySegment::text(LIST));
                key.push(KeySegment::text("search"));
                key.push(params());
            }
            QueryKind::ByCategory(category) => {
                key.extend_filtered("category", category, params());
            }
            QueryKind::ByTag(tag) => {
                key.extend_filtered("tag", tag, params());
            }
            QueryKind::ByAuthor(author) => {
                key.extend_filtered("author", author, params());
            }
            QueryKind::Detail(id) => {
                key.push(KeySegment::text(DETAIL));
                key.push(KeySegment::text(id.as_str()));
            }
            QueryKind::BySlug(slug) => {
                key.push(KeySegment::text(DETAIL));
                key.push(KeySegment::text(SLUG));
                key.push(KeySegment::text(slug.as_str()));
            }
        }
        key
    }

    /// `[domain]`: prefix of every key in the domain.
    pub fn all(domain: Domain) -> Self {
        Self {
            domain,
            segments: vec![KeySegment::text(domain.as_str())],
        }
    }

    /// `[domain, "list"]`: prefix of every list-like key in the domain.
    pub fn lists(domain: Domain) -> Self {
        let mut key = Self::all(domain);
        key.push(KeySegment::text(LIST));
        key
    }

    /// `[domain, "detail"]`: prefix of every single-entity key in the domain.
    pub fn details(domain: Domain) -> Self {
        let mut key = Self::all(domain);
        key.push(KeySegment::text(DETAIL));
        key
    }

    pub fn detail(domain: Domain, id: impl ToString) -> Self {
        Self::build(domain, &QueryKind::detail(id), None)
    }

    pub fn by_slug(domain: Domain, slug: impl Into<String>) -> Self {
        Self::build(domain, &QueryKind::by_slug(slug), None)
    }

    pub fn list(domain: Domain, params: &QueryParams) -> Self {
        Self::build(domain, &QueryKind::List, Some(params))
    }

    fn push(&mut self, segment: KeySegment) {
        self.segments.push(segment);
    }

    fn extend_filtered(&mut self, filter: &str, value: &str, params: KeySegment) {
        self.push(KeySegment::text(LIST));
        self.push(KeySegment::text(filter));
        self.push(KeySegment::text(value));
        self.push(params);
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    pub fn segments(&self) -> &[KeySegment] {
        &self.segments
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.segments.starts_with(&prefix.segments)
    }

    pub fn is_list(&self) -> bool {
        self.segments.get(1).is_some_and(|segment| segment.is_text(LIST))
    }

    pub fn is_detail(&self) -> bool {
        self.segments.get(1).is_some_and(|segment| segment.is_text(DETAIL))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut path = Vec::new();
        let mut query = None;
        for segment in &self.segments {
            match segment {
                KeySegment::Text(text) => path.push(text.as_str()),
                KeySegment::Params(params) if !params.is_empty() => query = Some(params),
                KeySegment::Params(_) => {}
            }
        }
        f.write_str(&path.join("/"))?;
        if let Some(params) = query {
            write!(f, "?{params}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn undefined_params_do_not_fragment_keys() {
        let with_undefined: QueryParams = [("limit", None), ("page", Some(2_u64))]
            .into_iter()
            .collect();
        let plain = QueryParams::new().with("page", 2_u64);

        assert_eq!(
            QueryKey::build(Domain::Categories, &QueryKind::List, Some(&with_undefined)),
            QueryKey::build(Domain::Categories, &QueryKind::List, Some(&plain)),
        );
    }

    #[test]
    fn key_order_and_json_nulls_are_irrelevant() {
        let a = QueryParams::from_json(&json!({"search": "sun", "page": 1, "limit": null}));
        let b = QueryParams::new().with("page", 1_i32).with("search", "sun");
        assert_eq!(a, b);
        assert_eq!(
            QueryKey::build(Domain::Articles, &QueryKind::Search, Some(&a)),
            QueryKey::build(Domain::Articles, &QueryKind::Search, Some(&b)),
        );
    }

    #[test]
    fn missing_and_empty_params_share_a_key() {
        assert_eq!(
            QueryKey::build(Domain::Articles, &QueryKind::List, None),
            QueryKey::build(Domain::Articles, &QueryKind::List, Some(&QueryParams::new())),
        );
    }

    #[test]
    fn different_queries_do_not_collide() {
        let params = QueryParams::new().with("page", 1_u64);
        let keys = [
            QueryKey::build(Domain::Articles, &QueryKind::List, Some(&params)),
            QueryKey::build(Domain::Articles, &QueryKind::Search, Some(&params)),
            QueryKey::build(Domain::Articles, &QueryKind::ByTag("x".into()), Some(&params)),
            QueryKey::build(Domain::Articles, &QueryKind::ByCategory("x".into()), Some(&params)),
            QueryKey::build(Domain::Articles, &QueryKind::ByAuthor("x".into()), Some(&params)),
            QueryKey::build(Domain::Categories, &QueryKind::List, Some(&params)),
            QueryKey::build(Domain::Articles, &QueryKind::List, Some(&QueryParams::new().with("page", 2_u64))),
        ];
        for (i, a) in keys.iter().enumerate() {
            for b in keys.iter().skip(i + 1) {
                assert_ne!(a, b, "{a} collides with {b}");
            }
        }
    }

    #[test]
    fn slug_keys_never_equal_id_keys() {
        let by_id = QueryKey::detail(Domain::Articles, "hello");
        let by_slug = QueryKey::by_slug(Domain::Articles, "hello");
        let id_named_slug = QueryKey::detail(Domain::Articles, "slug");

        assert_ne!(by_id, by_slug);
        assert_ne!(id_named_slug, by_slug);
        assert!(by_slug.is_detail());
        assert!(by_slug.starts_with(&QueryKey::details(Domain::Articles)));
    }

    #[test]
    fn numeric_ids_are_coerced() {
        assert_eq!(
            QueryKey::detail(Domain::Categories, 7),
            QueryKey::detail(Domain::Categories, "7")
        );
        assert_eq!(
            QueryParams::new().with("page", 3_u64),
            QueryParams::new().with("page", 3_i32)
        );
    }

    #[test]
    fn filtered_kinds_live_under_the_list_prefix() {
        let lists = QueryKey::lists(Domain::Articles);
        for kind in [
            QueryKind::List,
            QueryKind::Search,
            QueryKind::ByCategory("7".into()),
            QueryKind::ByTag("rust".into()),
            QueryKind::ByAuthor("mira".into()),
        ] {
            let key = QueryKey::build(Domain::Articles, &kind, None);
            assert!(key.is_list(), "{key}");
            assert!(key.starts_with(&lists), "{key}");
            assert!(key.starts_with(&QueryKey::all(Domain::Articles)));
        }
        assert!(!QueryKey::detail(Domain::Articles, 1).starts_with(&lists));
    }

    #[test]
    fn display_reads_like_a_path() {
        let params = QueryParams::new().with("page", 2_u64).with("limit", 10_u64);
        assert_eq!(
            QueryKey::list(Domain::Categories, &params).to_string(),
            "categories/list?limit=10&page=2"
        );
        assert_eq!(QueryKey::by_slug(Domain::Articles, "a-b").to_string(), "articles/detail/slug/a-b");
    }

    #[test]
    fn query_pairs_are_ordered() {
        let params = QueryParams::new()
            .with("tag", "rust")
            .with("ids", ParamValue::List(vec![1_i64.into(), 2_i64.into()]))
            .with("draft", false);
        assert_eq!(
            params.to_query_pairs(),
            vec![
                ("draft".to_string(), "false".to_string()),
                ("ids".to_string(), "1,2".to_string()),
                ("tag".to_string(), "rust".to_string()),
            ]
        );
        assert_eq!(params.get_u64("tag"), None);
    }
}
