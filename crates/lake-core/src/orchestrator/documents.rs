//! Document-level operations

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::info;

use super::Orchestrator;
use crate::action::{IfExists, Patch};
use crate::builder::{
    build_document_create, build_document_delete, build_document_discard, build_document_edit,
    build_publish, build_unpublish, build_version_create,
};
use crate::bulk::{BulkResponse, run_bulk};
use crate::id::{DocumentId, IdCategory, ReleaseOverride, normalize_release_id, resolve_for_action};
use crate::{Error, Result};

/// A document mutated by a committed transaction
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentOutcome {
    /// Concrete id the action targeted
    pub document_id: String,
    pub published_id: String,
    pub transaction_id: String,
}

impl Orchestrator {
    /// Create documents concurrently.
    ///
    /// Without a release each document becomes a draft. With a release each
    /// document is created directly as a version in that release. Documents
    /// without an `_id` are assigned one up front so every result can be
    /// reported against an id.
    pub async fn create_documents(
        &self,
        documents: Vec<Value>,
        release_id: Option<&str>,
        if_exists: IfExists,
    ) -> Result<BulkResponse<String, DocumentOutcome>> {
        let release_id = release_id.map(normalize_release_id).transpose()?;

        let mut ids = Vec::with_capacity(documents.len());
        let mut by_id = HashMap::with_capacity(documents.len());
        for mut document in documents {
            let id = assign_id(&mut document)?;
            if by_id.insert(id.clone(), document).is_some() {
                return Err(Error::Validation(format!(
                    "document {id} appears more than once"
                )));
            }
            ids.push(id);
        }

        let response = run_bulk(ids, |id| {
            self.create_one(&by_id, id, release_id.as_deref(), if_exists)
        })
        .await;

        info!(
            total = response.summary.total,
            failed = response.summary.failed,
            release = ?release_id,
            "Created documents"
        );
        Ok(response)
    }

    async fn create_one(
        &self,
        documents: &HashMap<String, Value>,
        key: String,
        release_id: Option<&str>,
        if_exists: IfExists,
    ) -> Result<DocumentOutcome> {
        let document = documents
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("document {key}")))?;
        let id = DocumentId::parse(&key)?;
        let published_id = id.to_published().to_string();

        let (action, document_id) = match release_id {
            Some(release_id) => (
                build_version_create(&published_id, document, release_id)?,
                id.in_release(release_id)?.to_string(),
            ),
            None => (
                build_document_create(document, if_exists)?,
                id.to_draft().to_string(),
            ),
        };

        let tx = self.dispatcher.dispatch_one(action).await?;
        Ok(DocumentOutcome {
            document_id,
            published_id,
            transaction_id: tx.transaction_id,
        })
    }

    /// Apply a patch to a document.
    ///
    /// The target is resolved with [`resolve_for_action`]: a release override
    /// or a version id edits that version, otherwise the draft is edited.
    pub async fn patch_document(
        &self,
        id: &str,
        release: &ReleaseOverride,
        patch: Patch,
    ) -> Result<DocumentOutcome> {
        let target = resolve_for_action(id, release)?;
        let document_id = match target.category() {
            IdCategory::Published => target.to_draft().to_string(),
            IdCategory::Draft | IdCategory::Version => target.to_string(),
        };
        let tx = self
            .dispatcher
            .dispatch_one(build_document_edit(&target, patch)?)
            .await?;
        Ok(DocumentOutcome {
            document_id,
            published_id: target.base_id().to_string(),
            transaction_id: tx.transaction_id,
        })
    }

    /// Publish the drafts of the given documents, one transaction each
    pub async fn publish_documents(&self, ids: Vec<String>) -> BulkResponse<String, DocumentOutcome> {
        run_bulk(ids, |id| self.publish_one(id)).await
    }

    async fn publish_one(&self, id: String) -> Result<DocumentOutcome> {
        let draft = draft_of(&id, "publish")?;
        let published = draft.to_published().to_string();
        let tx = self
            .dispatcher
            .dispatch_one(build_publish(&draft.to_string(), &published)?)
            .await?;
        Ok(DocumentOutcome {
            document_id: published.clone(),
            published_id: published,
            transaction_id: tx.transaction_id,
        })
    }

    /// Unpublish the given documents, keeping their content as drafts
    pub async fn unpublish_documents(
        &self,
        ids: Vec<String>,
    ) -> BulkResponse<String, DocumentOutcome> {
        run_bulk(ids, |id| self.unpublish_one(id)).await
    }

    async fn unpublish_one(&self, id: String) -> Result<DocumentOutcome> {
        let draft = draft_of(&id, "unpublish")?;
        let published = draft.to_published().to_string();
        let tx = self
            .dispatcher
            .dispatch_one(build_unpublish(&draft.to_string(), &published)?)
            .await?;
        Ok(DocumentOutcome {
            document_id: draft.to_string(),
            published_id: published,
            transaction_id: tx.transaction_id,
        })
    }

    /// Discard the drafts of the given documents
    pub async fn discard_drafts(
        &self,
        ids: Vec<String>,
        purge: Option<bool>,
    ) -> BulkResponse<String, DocumentOutcome> {
        run_bulk(ids, |id| self.discard_one(id, purge)).await
    }

    async fn discard_one(&self, id: String, purge: Option<bool>) -> Result<DocumentOutcome> {
        let draft = draft_of(&id, "discard")?;
        let tx = self
            .dispatcher
            .dispatch_one(build_document_discard(&draft.to_string(), purge)?)
            .await?;
        Ok(DocumentOutcome {
            document_id: draft.to_string(),
            published_id: draft.base_id().to_string(),
            transaction_id: tx.transaction_id,
        })
    }

    /// Delete the given documents, optionally with their drafts
    pub async fn delete_documents(
        &self,
        ids: Vec<String>,
        include_drafts: bool,
    ) -> BulkResponse<String, DocumentOutcome> {
        run_bulk(ids, |id| self.delete_one(id, include_drafts)).await
    }

    async fn delete_one(&self, id: String, include_drafts: bool) -> Result<DocumentOutcome> {
        let parsed = DocumentId::parse(&id)?;
        if parsed.is_version() {
            return Err(Error::InvalidOperation(format!(
                "{id} is a version; discard it from its release instead"
            )));
        }
        let published = parsed.to_published().to_string();
        let tx = self
            .dispatcher
            .dispatch_one(build_document_delete(&published, include_drafts)?)
            .await?;
        Ok(DocumentOutcome {
            document_id: published.clone(),
            published_id: published,
            transaction_id: tx.transaction_id,
        })
    }
}

/// Draft form of `id`, refusing version ids for draft-level operations
fn draft_of(id: &str, operation: &str) -> Result<DocumentId> {
    let parsed = DocumentId::parse(id)?;
    if parsed.is_version() {
        return Err(Error::InvalidOperation(format!(
            "cannot {operation} version {id} directly; act on its release instead"
        )));
    }
    Ok(parsed.to_draft())
}

/// Ensure `document` has an `_id`, returning it
fn assign_id(document: &mut Value) -> Result<String> {
    let Value::Object(fields) = document else {
        return Err(Error::Validation(
            "document must be a JSON object".to_string(),
        ));
    };
    match fields.get("_id").and_then(Value::as_str) {
        Some(id) => Ok(id.to_string()),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            fields.insert("_id".to_string(), Value::String(id.clone()));
            Ok(id)
        }
    }
}
