//! Raw payload → canonical entity mapping.
//!
//! Every resource resolves drifting server field names through fixed rule
//! tables (see `fields`), so a given payload always normalizes the same way no
//! matter which call site asked for it.

mod article;
mod category;
mod collection;
mod fields;
mod page;

use serde_json::Value;

use crate::domain::{Domain, NormalizationError, Resource};

pub use article::normalize_article;
pub use category::normalize_category;
pub use collection::normalize_collection;
pub use page::{normalize_envelope, normalize_page};

/// Normalize one raw entity of `domain`.
pub fn normalize_entity(domain: Domain, raw: &Value) -> Result<Resource, NormalizationError> {
    match domain {
        Domain::Articles => normalize_article(raw).map(Resource::Article),
        Domain::Categories => normalize_category(raw).map(Resource::Category),
        Domain::Collections => normalize_collection(raw).map(Resource::Collection),
    }
}
