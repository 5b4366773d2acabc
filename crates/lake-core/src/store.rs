//! The content store seam
//!
//! Everything this crate needs from the store goes through [`ContentStore`],
//! so the HTTP client and test doubles are interchangeable.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::Result;
use crate::action::Action;

/// Outcome of submitting an action batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionResponse {
    /// The whole batch was applied
    #[serde(rename_all = "camelCase")]
    Committed { transaction_id: String },
    /// The store refused the batch; nothing was applied
    Rejected { error: StoreError },
}

/// Structured error body returned by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreError {
    pub description: String,
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
}

/// A dataset in the project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acl_mode: Option<String>,
}

/// Narrow interface to the content store.
///
/// Transport failures surface as [`crate::Error::Transport`]; a store that
/// declines an action batch answers with [`ActionResponse::Rejected`] rather
/// than an error.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Run a query and return its `result` value
    async fn fetch(&self, query: &str, params: &Map<String, Value>) -> Result<Value>;

    /// Fetch a single document by exact id
    async fn get_document(&self, id: &str) -> Result<Option<Value>>;

    /// Create a document outside the action API
    async fn create(&self, document: Value) -> Result<Value>;

    /// Delete a document by exact id
    async fn delete(&self, id: &str) -> Result<()>;

    /// Submit `actions` as one transaction
    async fn submit_actions(&self, actions: &[Action]) -> Result<ActionResponse>;

    /// Datasets of the configured project
    async fn list_datasets(&self) -> Result<Vec<DatasetInfo>>;
}
