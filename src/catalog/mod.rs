//! Normalized model records.
//!
//! Upstream payloads arrive as untyped JSON. [`RecordBuilder`] turns them
//! into [`ModelRecord`]s: the fields this service computes (icon, links,
//! converted pricing, creation date, generated descriptions and documents)
//! are typed, and every other upstream field passes through untouched.

mod records;
mod types;

pub use records::{RecordBuilder, RecordError, format_timestamp};
pub use types::{CatalogKind, DetailRecord, ModelRecord};
