//! Client-side data access for the content platform: typed resources,
//! payload normalization, and a query cache kept consistent across writes.

pub mod api;
pub mod cache;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infra;
pub mod normalize;
