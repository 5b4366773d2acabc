//! Content store client for the content lake
//!
//! [`HttpStore`] implements [`lake_core::ContentStore`] over the vendor data
//! API, configured by a [`StoreConfig`] loaded from a TOML file and/or
//! command-line overrides.

pub mod client;
pub mod config;
pub mod error;

pub use client::HttpStore;
pub use config::{StoreConfig, StoreOverrides};
pub use error::{Error, Result};
