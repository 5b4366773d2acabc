//! Orchestration of document and release operations
//!
//! The [`Orchestrator`] turns caller intent into correctly sequenced action
//! batches:
//! - **documents**: create, patch, publish, unpublish, discard and delete
//! - **releases**: create, edit, list, schedule and the single-action
//!   lifecycle transitions
//! - **versions**: add, replace, discard and mark-for-unpublish within a release
//!
//! No state is kept between calls. Each operation resolves identifiers, builds
//! its actions and dispatches them; the store stays authoritative for whether
//! documents and releases exist.

mod documents;
mod releases;

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::dates::{DateResolver, NaturalDateParser};
use crate::dispatch::Dispatcher;
use crate::id::{DocumentId, IdCategory};
use crate::store::{ContentStore, DatasetInfo};
use crate::{Error, Result};

pub use documents::DocumentOutcome;
pub use releases::{
    CreateReleaseRequest, CreatedRelease, EditReleaseRequest, ReleaseOutcome, VersionOutcome,
};

/// Entry point for every store-mutating operation
#[derive(Clone)]
pub struct Orchestrator {
    dispatcher: Dispatcher,
    dates: Arc<dyn DateResolver>,
}

impl Orchestrator {
    /// Create an orchestrator resolving dates against the system clock
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self::with_date_resolver(store, Arc::new(NaturalDateParser::new()))
    }

    pub fn with_date_resolver(store: Arc<dyn ContentStore>, dates: Arc<dyn DateResolver>) -> Self {
        Self {
            dispatcher: Dispatcher::new(store),
            dates,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn dates(&self) -> &dyn DateResolver {
        self.dates.as_ref()
    }

    fn store(&self) -> &dyn ContentStore {
        self.dispatcher.store().as_ref()
    }

    /// Run a query against the store
    pub async fn query(&self, query: &str, params: &Map<String, Value>) -> Result<Value> {
        self.store().fetch(query, params).await
    }

    /// Fetch a document by exact id
    pub async fn get_document(&self, id: &str) -> Result<Value> {
        DocumentId::parse(id)?;
        self.store()
            .get_document(id)
            .await?
            .ok_or_else(|| Error::NotFound(format!("document {id}")))
    }

    pub async fn list_datasets(&self) -> Result<Vec<DatasetInfo>> {
        self.store().list_datasets().await
    }

    /// Load the current content of a logical document for snapshotting.
    ///
    /// A draft-shaped id prefers the draft and falls back to the published
    /// document; any other id prefers the published document and falls back
    /// to the draft. Version ids are refused since a version cannot be
    /// versioned again.
    pub async fn load_snapshot(&self, id: &str) -> Result<Value> {
        let parsed = DocumentId::parse(id)?;
        let candidates = match parsed.category() {
            IdCategory::Draft => [parsed.to_draft(), parsed.to_published()],
            IdCategory::Published => [parsed.to_published(), parsed.to_draft()],
            IdCategory::Version => {
                return Err(Error::InvalidOperation(format!(
                    "{id} is already a version; a version cannot itself be versioned"
                )));
            }
        };

        for candidate in &candidates {
            let candidate_id = candidate.to_string();
            if let Some(document) = self.store().get_document(&candidate_id).await? {
                debug!(requested = %id, resolved = %candidate_id, "Loaded document snapshot");
                return Ok(document);
            }
        }

        Err(Error::NotFound(format!(
            "no draft or published document for {}",
            parsed.base_id()
        )))
    }
}
