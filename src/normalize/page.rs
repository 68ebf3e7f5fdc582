use serde_json::Value;

use crate::cache::QueryParams;
use crate::domain::{Domain, NormalizationError, Page, PaginationMeta, Resource};

use super::fields::{CountRule, FlagRule, RawObject, resolve_count, resolve_flag};
use super::normalize_entity;

const TOTAL: &[CountRule] = &[
    CountRule::Number("total"),
    CountRule::Number("total_count"),
    CountRule::Number("count"),
];
const PAGE: &[CountRule] = &[CountRule::Number("page"), CountRule::Number("current_page")];
const LIMIT: &[CountRule] = &[
    CountRule::Number("limit"),
    CountRule::Number("per_page"),
    CountRule::Number("page_size"),
];
const HAS_NEXT: &[FlagRule] = &[
    FlagRule::Bool("has_next_page"),
    FlagRule::Bool("has_next"),
    FlagRule::NonNull("next"),
];
const HAS_PREV: &[FlagRule] = &[
    FlagRule::Bool("has_prev_page"),
    FlagRule::Bool("has_prev"),
    FlagRule::NonNull("previous"),
    FlagRule::NonNull("prev"),
];

const ITEM_FIELDS: &[&str] = &["data", "results", "items"];
const META_FIELDS: &[&str] = &["meta", "pagination"];
const TOP_LEVEL_META_FIELDS: &[&str] = &["count", "total", "next", "previous"];

/// Normalize a list of raw entities together with optional pagination metadata.
///
/// Without metadata the result is a single page holding every returned row;
/// partial metadata is completed from the page position and the request.
pub fn normalize_page(
    domain: Domain,
    raw_list: &Value,
    raw_meta: Option<&Value>,
    params: &QueryParams,
) -> Result<Page<Resource>, NormalizationError> {
    let resource = domain.as_str();
    let items = raw_list
        .as_array()
        .ok_or_else(|| NormalizationError::new(resource, "data", "is not an array"))?;

    let data = items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            normalize_entity(domain, item).map_err(|err| err.nested(resource, &format!("data[{index}]")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let meta = match raw_meta {
        None | Some(Value::Null) => PaginationMeta::single_page(data.len(), params.get_u64("limit")),
        Some(Value::Object(meta)) => resolve_meta(meta, data.len(), params),
        Some(_) => return Err(NormalizationError::not_an_object(resource, "meta")),
    };

    Ok(Page::new(data, meta))
}

/// Normalize a list response body in any of the envelopes the API has used:
/// `{data, meta}`, `{data, pagination}`, `{results, count, next, previous}`,
/// or a bare array.
pub fn normalize_envelope(
    domain: Domain,
    body: &Value,
    params: &QueryParams,
) -> Result<Page<Resource>, NormalizationError> {
    match body {
        Value::Array(_) => normalize_page(domain, body, None, params),
        Value::Object(object) => {
            let items = ITEM_FIELDS
                .iter()
                .find_map(|field| object.get(*field).filter(|value| value.is_array()))
                .ok_or_else(|| NormalizationError::missing(domain.as_str(), "data"))?;
            normalize_page(domain, items, envelope_meta(body, object), params)
        }
        _ => Err(NormalizationError::not_an_object(domain.as_str(), "<root>")),
    }
}

fn envelope_meta<'a>(body: &'a Value, object: &'a RawObject) -> Option<&'a Value> {
    if let Some(meta) = META_FIELDS
        .iter()
        .find_map(|field| object.get(*field).filter(|value| value.is_object()))
    {
        return Some(meta);
    }
    // DRF-style bodies keep their counters beside the results.
    TOP_LEVEL_META_FIELDS
        .iter()
        .any(|field| object.contains_key(*field))
        .then_some(body)
}

fn resolve_meta(meta: &RawObject, len: usize, params: &QueryParams) -> PaginationMeta {
    let len = len as u64;
    let total = resolve_count(meta, TOTAL).unwrap_or(len);
    let page = resolve_count(meta, PAGE)
        .or_else(|| params.get_u64("page"))
        .filter(|page| *page > 0)
        .unwrap_or(1);
    let limit = resolve_count(meta, LIMIT)
        .or_else(|| params.get_u64("limit"))
        .unwrap_or(len);

    PaginationMeta {
        total,
        page,
        limit,
        has_next_page: resolve_flag(meta, HAS_NEXT).unwrap_or(page.saturating_mul(limit) < total),
        has_prev_page: resolve_flag(meta, HAS_PREV).unwrap_or(page > 1),
    }
}
