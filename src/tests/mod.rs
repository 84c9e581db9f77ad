//! Consolidated test modules.
//!
//! End-to-end tests drive the full router with an in-process upstream.
