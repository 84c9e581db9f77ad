//! Observability: structured logging through `tracing`.
//!
//! Console output supports pretty, compact and JSON formats; filtering
//! follows `RUST_LOG` when set, otherwise the configured level and filter.

mod tracing_init;

pub use tracing_init::*;
