//! Core of the content lake tool server
//!
//! This crate holds everything that does not depend on a particular transport:
//!
//! - **Identifiers**: the published / draft / version id scheme in [`id`]
//! - **Actions**: typed wire actions ([`action`]) and validating builders ([`builder`])
//! - **Dispatch**: atomic submission of action batches through a [`ContentStore`]
//! - **Bulk**: settle-all concurrent execution with per-item attribution
//! - **Orchestration**: document and release workflows in [`Orchestrator`]
//!
//! # Architecture
//!
//! ```text
//!               lake-mcp (JSON-RPC tools)
//!                        |
//!                   Orchestrator
//!                   /          \
//!              builder       run_bulk
//!                   \          /
//!                    Dispatcher
//!                        |
//!                  dyn ContentStore
//!                   /          \
//!         lake-store::HttpStore  lake-test-utils::MemoryStore
//! ```

pub mod action;
pub mod builder;
pub mod bulk;
pub mod dates;
pub mod dispatch;
pub mod error;
pub mod id;
pub mod orchestrator;
pub mod release;
pub mod store;

pub use action::{Action, IfExists, Patch};
pub use bulk::{BulkOperationResult, BulkResponse, BulkSummary, run_bulk};
pub use dates::{DateResolver, NaturalDateParser};
pub use dispatch::{Dispatcher, TransactionResult};
pub use error::{Error, Result};
pub use id::{DocumentId, IdCategory, ReleaseOverride};
pub use orchestrator::{
    CreateReleaseRequest, CreatedRelease, DocumentOutcome, EditReleaseRequest, Orchestrator,
    ReleaseOutcome, VersionOutcome,
};
pub use release::{ReleaseActionKind, ReleaseMetadata, ReleaseState, ReleaseSummary, ReleaseType};
pub use store::{ActionResponse, ContentStore, DatasetInfo, StoreError};
