//! Submission of action batches to the store

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::action::Action;
use crate::store::{ActionResponse, ContentStore};
use crate::{Error, Result};

/// A committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionResult {
    pub transaction_id: String,
    pub action_count: usize,
}

/// Sends action batches to the store's transactional endpoint.
///
/// Actions passed to one [`dispatch`](Dispatcher::dispatch) call are applied
/// together or not at all. Nothing is retried.
#[derive(Clone)]
pub struct Dispatcher {
    store: Arc<dyn ContentStore>,
}

impl Dispatcher {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    pub async fn dispatch(&self, actions: &[Action]) -> Result<TransactionResult> {
        if actions.is_empty() {
            return Err(Error::InvalidOperation("no actions to submit".to_string()));
        }

        let types: Vec<&str> = actions.iter().map(Action::action_type).collect();
        debug!(actions = ?types, "Submitting actions");

        match self.store.submit_actions(actions).await? {
            ActionResponse::Committed { transaction_id } => {
                debug!(%transaction_id, count = actions.len(), "Actions committed");
                Ok(TransactionResult {
                    transaction_id,
                    action_count: actions.len(),
                })
            }
            ActionResponse::Rejected { error } => {
                warn!(actions = ?types, description = %error.description, "Actions rejected");
                Err(Error::ActionRejected {
                    description: error.description,
                })
            }
        }
    }

    /// Convenience for a batch of one
    pub async fn dispatch_one(&self, action: Action) -> Result<TransactionResult> {
        self.dispatch(std::slice::from_ref(&action)).await
    }

    pub fn store(&self) -> &Arc<dyn ContentStore> {
        &self.store
    }
}
