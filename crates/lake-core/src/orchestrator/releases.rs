//! Release lifecycle and document versions within releases

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing::{info, warn};

use super::Orchestrator;
use crate::action::{Action, Patch};
use crate::builder::{
    build_release_action, build_release_create, build_release_edit,
    build_release_schedule_from_input, build_version_create, build_version_discard,
    build_version_replace, build_version_unpublish, strip_system_fields,
};
use crate::bulk::{BulkResponse, run_bulk};
use crate::dates::resolve_date;
use crate::id::{
    DocumentId, ReleaseOverride, generate_release_id, normalize_release_id, resolve_for_action,
};
use crate::release::{ReleaseActionKind, ReleaseMetadata, ReleaseState, ReleaseSummary, ReleaseType};
use crate::{Error, Result};

const RELEASES_QUERY: &str = r#"*[_type == "system.release"] | order(_createdAt desc) {"releaseId": name, state, metadata, publishAt}"#;

const RELEASES_BY_STATE_QUERY: &str = r#"*[_type == "system.release" && state == $state] | order(_createdAt desc) {"releaseId": name, state, metadata, publishAt}"#;

/// Input for [`Orchestrator::create_release`]
///
/// Title and release type are mandatory, so there is no `Default`; start
/// from [`CreateReleaseRequest::new`].
#[derive(Debug, Clone)]
pub struct CreateReleaseRequest {
    /// Caller-chosen id; generated when absent
    pub release_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub release_type: ReleaseType,
    /// ISO-8601 or natural-language intended publish time
    pub intended_publish_at: Option<String>,
    /// Documents to add as versions right after the release is created
    pub document_ids: Vec<String>,
}

impl CreateReleaseRequest {
    pub fn new(title: impl Into<String>, release_type: ReleaseType) -> Self {
        Self {
            release_id: None,
            title: title.into(),
            description: None,
            release_type,
            intended_publish_at: None,
            document_ids: Vec::new(),
        }
    }
}

/// Input for [`Orchestrator::edit_release`]
#[derive(Debug, Clone, Default)]
pub struct EditReleaseRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub release_type: Option<ReleaseType>,
    pub intended_publish_at: Option<String>,
}

/// A release-level action that was committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseOutcome {
    pub release_id: String,
    pub action: String,
    pub transaction_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<DateTime<Utc>>,
}

/// A version-level action that was committed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionOutcome {
    pub version_id: String,
    pub published_id: String,
    pub release_id: String,
    pub transaction_id: String,
}

/// Result of creating a release, including any versions seeded into it.
///
/// The release is committed before the versions are added, so a failed
/// version leaves the release in place and shows up in `documents`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatedRelease {
    pub release: ReleaseOutcome,
    pub metadata: ReleaseMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents: Option<BulkResponse<String, VersionOutcome>>,
}

impl Orchestrator {
    /// Create a release, then add the requested documents to it
    pub async fn create_release(&self, request: CreateReleaseRequest) -> Result<CreatedRelease> {
        let release_id = match request.release_id.as_deref() {
            Some(id) => normalize_release_id(id)?,
            None => generate_release_id(),
        };

        let intended_publish_at = request
            .intended_publish_at
            .as_deref()
            .map(|input| resolve_date(self.dates(), input))
            .transpose()?;

        let metadata = ReleaseMetadata {
            title: request.title,
            description: request.description,
            release_type: request.release_type,
            intended_publish_at,
        };

        let action = build_release_create(&release_id, metadata.clone())?;
        let tx = self.dispatcher.dispatch_one(action).await?;
        info!(%release_id, title = %metadata.title, "Created release");

        let release = ReleaseOutcome {
            release_id: release_id.clone(),
            action: "create".to_string(),
            transaction_id: tx.transaction_id,
            publish_at: None,
        };

        let documents = if request.document_ids.is_empty() {
            None
        } else {
            let added = self.add_document_versions(&release_id, request.document_ids).await?;
            if !added.is_complete_success() {
                warn!(
                    %release_id,
                    failed = added.summary.failed,
                    "Release created but some documents could not be added"
                );
            }
            Some(added)
        };

        Ok(CreatedRelease {
            release,
            metadata,
            documents,
        })
    }

    /// Edit release metadata
    pub async fn edit_release(
        &self,
        release_id: &str,
        request: EditReleaseRequest,
    ) -> Result<ReleaseOutcome> {
        let release_id = normalize_release_id(release_id)?;
        let intended_publish_at = request
            .intended_publish_at
            .as_deref()
            .map(|input| resolve_date(self.dates(), input))
            .transpose()?;

        if request.release_type == Some(ReleaseType::Scheduled) && intended_publish_at.is_none() {
            return Err(Error::Validation(
                "intendedPublishAt is required when changing releaseType to 'scheduled'"
                    .to_string(),
            ));
        }

        let mut set = Map::new();
        if let Some(title) = request.title {
            if title.trim().is_empty() {
                return Err(Error::Validation("release title cannot be blank".to_string()));
            }
            set.insert("metadata.title".to_string(), Value::String(title));
        }
        if let Some(description) = request.description {
            set.insert("metadata.description".to_string(), Value::String(description));
        }
        if let Some(release_type) = request.release_type {
            set.insert("metadata.releaseType".to_string(), serde_json::to_value(release_type)?);
        }
        if let Some(at) = intended_publish_at {
            set.insert("metadata.intendedPublishAt".to_string(), json!(at));
        }

        let patch = Patch {
            set: Some(set),
            ..Patch::default()
        };
        let tx = self
            .dispatcher
            .dispatch_one(build_release_edit(&release_id, patch)?)
            .await?;
        Ok(ReleaseOutcome {
            release_id,
            action: "edit".to_string(),
            transaction_id: tx.transaction_id,
            publish_at: None,
        })
    }

    /// List releases known to the store, optionally only those in `state`
    pub async fn list_releases(&self, state: Option<ReleaseState>) -> Result<Vec<ReleaseSummary>> {
        let mut params = Map::new();
        let query = match state {
            Some(state) => {
                params.insert("state".to_string(), Value::String(state.to_string()));
                RELEASES_BY_STATE_QUERY
            }
            None => RELEASES_QUERY,
        };
        let value = self.query(query, &params).await?;
        if value.is_null() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Schedule a release for publishing at `publish_at`.
    ///
    /// `publish_at` may be ISO-8601 or natural language and must resolve to a
    /// future instant.
    pub async fn schedule_release(&self, release_id: &str, publish_at: &str) -> Result<ReleaseOutcome> {
        let release_id = normalize_release_id(release_id)?;
        let action = build_release_schedule_from_input(&release_id, publish_at, self.dates())?;
        let scheduled_at = match &action {
            Action::ReleaseSchedule { publish_at, .. } => Some(*publish_at),
            _ => None,
        };
        let tx = self.dispatcher.dispatch_one(action).await?;
        info!(%release_id, publish_at = ?scheduled_at, "Scheduled release");
        Ok(ReleaseOutcome {
            release_id,
            action: ReleaseActionKind::Schedule.to_string(),
            transaction_id: tx.transaction_id,
            publish_at: scheduled_at,
        })
    }

    /// Publish, archive, unarchive, unschedule or delete a release
    pub async fn release_action(
        &self,
        kind: ReleaseActionKind,
        release_id: &str,
    ) -> Result<ReleaseOutcome> {
        let release_id = normalize_release_id(release_id)?;
        let tx = self
            .dispatcher
            .dispatch_one(build_release_action(kind, &release_id)?)
            .await?;
        info!(%release_id, action = %kind, "Applied release action");
        Ok(ReleaseOutcome {
            release_id,
            action: kind.to_string(),
            transaction_id: tx.transaction_id,
            publish_at: None,
        })
    }

    /// Snapshot a document into a release as a new version
    pub async fn add_document_version(
        &self,
        release_id: &str,
        document_id: &str,
    ) -> Result<VersionOutcome> {
        let release_id = normalize_release_id(release_id)?;
        self.add_version_normalized(&release_id, document_id.to_string())
            .await
    }

    /// Snapshot each document into a release concurrently
    pub async fn add_document_versions(
        &self,
        release_id: &str,
        document_ids: Vec<String>,
    ) -> Result<BulkResponse<String, VersionOutcome>> {
        let release_id = normalize_release_id(release_id)?;
        let response = run_bulk(document_ids, |id| {
            self.add_version_normalized(&release_id, id)
        })
        .await;
        info!(
            %release_id,
            total = response.summary.total,
            failed = response.summary.failed,
            "Added document versions"
        );
        Ok(response)
    }

    async fn add_version_normalized(
        &self,
        release_id: &str,
        document_id: String,
    ) -> Result<VersionOutcome> {
        let snapshot = self.load_snapshot(&document_id).await?;
        let published_id = DocumentId::parse(&document_id)?.to_published().to_string();
        let action = build_version_create(&published_id, snapshot, release_id)?;
        let version_id = DocumentId::version(published_id.clone(), release_id)?.to_string();
        let tx = self.dispatcher.dispatch_one(action).await?;
        Ok(VersionOutcome {
            version_id,
            published_id,
            release_id: release_id.to_string(),
            transaction_id: tx.transaction_id,
        })
    }

    /// Replace the content of a version with the current content of another
    /// document.
    ///
    /// `document_id` is either a version id or a document id combined with
    /// `release_id`.
    pub async fn replace_version(
        &self,
        document_id: &str,
        release_id: Option<&str>,
        source_document_id: &str,
    ) -> Result<VersionOutcome> {
        let target = resolve_version(document_id, release_id)?;
        let source = DocumentId::parse(source_document_id)?;
        let mut snapshot = if source.is_version() {
            self.get_document(source_document_id).await?
        } else {
            self.load_snapshot(source_document_id).await?
        };

        let Value::Object(fields) = &mut snapshot else {
            return Err(Error::Validation(format!(
                "source document {source_document_id} is not an object"
            )));
        };
        strip_system_fields(fields);
        fields.insert("_id".to_string(), Value::String(target.to_string()));

        let tx = self
            .dispatcher
            .dispatch_one(build_version_replace(snapshot)?)
            .await?;
        Ok(version_outcome(&target, tx.transaction_id))
    }

    /// Discard a version, leaving the published document untouched
    pub async fn discard_version(
        &self,
        document_id: &str,
        release_id: Option<&str>,
        purge: Option<bool>,
    ) -> Result<VersionOutcome> {
        let target = resolve_version(document_id, release_id)?;
        let tx = self
            .dispatcher
            .dispatch_one(build_version_discard(&target.to_string(), purge)?)
            .await?;
        Ok(version_outcome(&target, tx.transaction_id))
    }

    /// Mark documents to be unpublished when `release_id` is published
    pub async fn mark_for_unpublish(
        &self,
        release_id: &str,
        document_ids: Vec<String>,
    ) -> Result<BulkResponse<String, VersionOutcome>> {
        let release_id = normalize_release_id(release_id)?;
        Ok(run_bulk(document_ids, |id| self.mark_one_for_unpublish(&release_id, id)).await)
    }

    async fn mark_one_for_unpublish(
        &self,
        release_id: &str,
        document_id: String,
    ) -> Result<VersionOutcome> {
        let release = ReleaseOverride::Release(release_id.to_string());
        let target = resolve_for_action(&document_id, &release)?;
        if target.release_id() != Some(release_id) {
            return Err(Error::InvalidOperation(format!(
                "{document_id} belongs to release {}, not {release_id}",
                target.release_id().unwrap_or("<none>")
            )));
        }
        let published = target.to_published().to_string();
        let tx = self
            .dispatcher
            .dispatch_one(build_version_unpublish(&target.to_string(), &published)?)
            .await?;
        Ok(version_outcome(&target, tx.transaction_id))
    }
}

/// Resolve `document_id` (plus optional release) to a version id
fn resolve_version(document_id: &str, release_id: Option<&str>) -> Result<DocumentId> {
    let release = ReleaseOverride::from_release(release_id)?;
    let target = resolve_for_action(document_id, &release)?;
    if !target.is_version() {
        return Err(Error::InvalidOperation(format!(
            "{document_id} does not identify a version; pass a version id or a release id"
        )));
    }
    Ok(target)
}

fn version_outcome(target: &DocumentId, transaction_id: String) -> VersionOutcome {
    VersionOutcome {
        version_id: target.to_string(),
        published_id: target.base_id().to_string(),
        release_id: target.release_id().unwrap_or_default().to_string(),
        transaction_id,
    }
}
