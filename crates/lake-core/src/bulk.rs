//! Settle-all execution of independent per-item operations
//!
//! A batch runs every item's operation concurrently and collects each outcome
//! next to the item it came from. One item failing never cancels the others.

use std::future::Future;

use futures::future::join_all;
use serde::ser::{Serialize, SerializeStruct, Serializer};
use tracing::warn;

use crate::Result;

/// Outcome of one item in a batch
#[derive(Debug, Clone, PartialEq)]
pub enum BulkOperationResult<I, T> {
    Succeeded { item: I, data: T },
    Failed { item: I, error: String },
}

impl<I, T> BulkOperationResult<I, T> {
    pub fn is_success(&self) -> bool {
        matches!(self, BulkOperationResult::Succeeded { .. })
    }

    pub fn item(&self) -> &I {
        match self {
            BulkOperationResult::Succeeded { item, .. } | BulkOperationResult::Failed { item, .. } => {
                item
            }
        }
    }

    pub fn data(&self) -> Option<&T> {
        match self {
            BulkOperationResult::Succeeded { data, .. } => Some(data),
            BulkOperationResult::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            BulkOperationResult::Succeeded { .. } => None,
            BulkOperationResult::Failed { error, .. } => Some(error),
        }
    }
}

impl<I: Serialize, T: Serialize> Serialize for BulkOperationResult<I, T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("BulkOperationResult", 3)?;
        match self {
            BulkOperationResult::Succeeded { item, data } => {
                state.serialize_field("success", &true)?;
                state.serialize_field("item", item)?;
                state.serialize_field("data", data)?;
            }
            BulkOperationResult::Failed { item, error } => {
                state.serialize_field("success", &false)?;
                state.serialize_field("item", item)?;
                state.serialize_field("error", error)?;
            }
        }
        state.end()
    }
}

/// Aggregate counts for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize)]
pub struct BulkSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
}

/// Per-item results, in input order, plus their summary
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BulkResponse<I, T> {
    pub results: Vec<BulkOperationResult<I, T>>,
    pub summary: BulkSummary,
}

impl<I, T> BulkResponse<I, T> {
    pub fn from_results(results: Vec<BulkOperationResult<I, T>>) -> Self {
        let successful = results.iter().filter(|r| r.is_success()).count();
        let summary = BulkSummary {
            total: results.len(),
            successful,
            failed: results.len() - successful,
        };
        Self { results, summary }
    }

    pub fn successful_results(&self) -> impl Iterator<Item = (&I, &T)> {
        self.results.iter().filter_map(|r| match r {
            BulkOperationResult::Succeeded { item, data } => Some((item, data)),
            BulkOperationResult::Failed { .. } => None,
        })
    }

    pub fn failed_results(&self) -> impl Iterator<Item = (&I, &str)> {
        self.results.iter().filter_map(|r| match r {
            BulkOperationResult::Failed { item, error } => Some((item, error.as_str())),
            BulkOperationResult::Succeeded { .. } => None,
        })
    }

    pub fn is_complete_success(&self) -> bool {
        self.summary.failed == 0
    }
}

/// Run `op` for every item concurrently and settle all of them.
///
/// Each item is paired with its input position before its operation starts,
/// so results come back in input order and every failure stays attached to
/// the item that produced it, whatever order the operations finish in.
pub async fn run_bulk<I, T, F, Fut>(items: Vec<I>, op: F) -> BulkResponse<I, T>
where
    I: Clone + std::fmt::Debug,
    F: Fn(I) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let pending = items.into_iter().enumerate().map(|(index, item)| {
        let fut = op(item.clone());
        async move { (index, item, fut.await) }
    });

    let mut settled = join_all(pending).await;
    settled.sort_by_key(|(index, _, _)| *index);

    let results = settled
        .into_iter()
        .map(|(index, item, outcome)| match outcome {
            Ok(data) => BulkOperationResult::Succeeded { item, data },
            Err(e) => {
                warn!(index, item = ?item, error = %e, "Bulk item failed");
                BulkOperationResult::Failed {
                    item,
                    error: e.to_string(),
                }
            }
        })
        .collect();

    BulkResponse::from_results(results)
}
