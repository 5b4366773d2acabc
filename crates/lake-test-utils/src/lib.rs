//! Shared test utilities for the lake-mcp workspace.
//!
//! This crate is a dev-dependency only, never published.
//!
//! # Modules
//!
//! - [`memory`]: [`MemoryStore`], an in-memory [`lake_core::ContentStore`]
//!   that applies action batches atomically and owns release state
//! - [`fixtures`]: document and clock fixtures

pub mod fixtures;
pub mod memory;

pub use fixtures::{article, fixed_dates, reference_time};
pub use memory::{Call, MemoryStore};
