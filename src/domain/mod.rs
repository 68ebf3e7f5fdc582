//! Canonical client-side model: entities, pagination, and their invariants.

pub mod entities;
pub mod error;
pub mod pagination;
pub mod resource;
pub mod slug;

pub use entities::{Article, Category, Collection};
pub use error::NormalizationError;
pub use pagination::{Page, PaginationMeta};
pub use resource::{Canonical, Domain, Resource, UnknownDomain};
