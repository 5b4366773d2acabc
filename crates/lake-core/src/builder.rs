//! Construction of action payloads from resolved identifiers
//!
//! Every builder is a pure function: it validates its inputs and returns the
//! wire-shape [`Action`], or the reason the action would be inconsistent.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::action::{Action, IfExists, Patch};
use crate::dates::{DateResolver, resolve_future_date};
use crate::id::{DocumentId, IdCategory};
use crate::release::{ReleaseActionKind, ReleaseMetadata};
use crate::{Error, Result};

/// Fields maintained by the store that must not be copied into a new document
pub const SYSTEM_FIELDS: &[&str] = &["_rev", "_createdAt", "_updatedAt"];

/// `version.create`: snapshot `document` into `release_id` as a version of
/// `published_id`.
pub fn build_version_create(
    published_id: &str,
    document: Value,
    release_id: &str,
) -> Result<Action> {
    let published = DocumentId::parse(published_id)?;
    match published.category() {
        IdCategory::Published => {}
        IdCategory::Version => {
            return Err(Error::InvalidOperation(format!(
                "{published_id} is already a version; a version cannot itself be versioned"
            )));
        }
        IdCategory::Draft => {
            return Err(Error::InvalidOperation(format!(
                "expected a published id, got draft id {published_id}"
            )));
        }
    }

    let mut fields = into_object(document)?;
    if let Some(source_id) = fields.get("_id").and_then(Value::as_str) {
        let source = DocumentId::parse(source_id)?;
        if source.is_version() {
            return Err(Error::InvalidOperation(format!(
                "source document {source_id} is already a version; a version cannot itself be versioned"
            )));
        }
        if source.base_id() != published.base_id() {
            return Err(Error::InvalidOperation(format!(
                "source document {source_id} does not belong to {published_id}"
            )));
        }
    }

    let version_id = published.in_release(release_id)?;
    strip_system_fields(&mut fields);
    fields.insert("_id".to_string(), Value::String(version_id.to_string()));

    Ok(Action::VersionCreate {
        published_id: published.to_string(),
        document: Value::Object(fields),
    })
}

/// `version.replace`: overwrite an existing version with `document`, whose
/// `_id` must be a version id.
pub fn build_version_replace(document: Value) -> Result<Action> {
    let mut fields = into_object(document)?;
    let id = fields
        .get("_id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("replacement document needs an _id".to_string()))?;
    let parsed = DocumentId::parse(id)?;
    if !parsed.is_version() {
        return Err(Error::InvalidOperation(format!(
            "{id} is not a version id; only versions can be replaced"
        )));
    }
    strip_system_fields(&mut fields);
    Ok(Action::VersionReplace {
        document: Value::Object(fields),
    })
}

/// `version.discard`: delete the version copy, leaving the published document
pub fn build_version_discard(version_id: &str, purge: Option<bool>) -> Result<Action> {
    let version = require_version(version_id)?;
    Ok(Action::VersionDiscard {
        version_id: version.to_string(),
        purge,
    })
}

/// `version.unpublish`: mark the document to be unpublished when the
/// version's release is published
pub fn build_version_unpublish(version_id: &str, published_id: &str) -> Result<Action> {
    let version = require_version(version_id)?;
    let published = require_pair(&version, published_id)?;
    Ok(Action::VersionUnpublish {
        version_id: version.to_string(),
        published_id: published.to_string(),
    })
}

/// `document.publish`
pub fn build_publish(draft_id: &str, published_id: &str) -> Result<Action> {
    let draft = require_draft(draft_id)?;
    let published = require_pair(&draft, published_id)?;
    Ok(Action::Publish {
        draft_id: draft.to_string(),
        published_id: published.to_string(),
    })
}

/// `document.unpublish`
pub fn build_unpublish(draft_id: &str, published_id: &str) -> Result<Action> {
    let draft = require_draft(draft_id)?;
    let published = require_pair(&draft, published_id)?;
    Ok(Action::Unpublish {
        draft_id: draft.to_string(),
        published_id: published.to_string(),
    })
}

/// `document.create`: create `document` as a draft.
///
/// The document needs a `_type`; its `_id`, when given, may be in published
/// or draft form and is rewritten to the draft form.
pub fn build_document_create(document: Value, if_exists: IfExists) -> Result<Action> {
    let mut fields = into_object(document)?;
    if fields.get("_type").and_then(Value::as_str).is_none_or(str::is_empty) {
        return Err(Error::Validation("document needs a _type".to_string()));
    }

    let id = match fields.get("_id").and_then(Value::as_str) {
        Some(raw) => {
            let parsed = DocumentId::parse(raw)?;
            if parsed.is_version() {
                return Err(Error::InvalidOperation(format!(
                    "{raw} is a version id; create versions through a release"
                )));
            }
            parsed
        }
        None => DocumentId::published(uuid::Uuid::new_v4().to_string())?,
    };

    strip_system_fields(&mut fields);
    fields.insert("_id".to_string(), Value::String(id.to_draft().to_string()));

    Ok(Action::DocumentCreate {
        published_id: id.to_published().to_string(),
        attributes: Value::Object(fields),
        if_exists,
    })
}

/// `document.edit`: apply `patch` to a draft or version.
///
/// A published target is edited through its draft, which the store creates
/// from the published document when missing.
pub fn build_document_edit(target: &DocumentId, patch: Patch) -> Result<Action> {
    if patch.is_empty() {
        return Err(Error::Validation("patch has no operations".to_string()));
    }
    let draft_id = match target.category() {
        IdCategory::Published => target.to_draft(),
        IdCategory::Draft | IdCategory::Version => target.clone(),
    };
    Ok(Action::DocumentEdit {
        draft_id: draft_id.to_string(),
        published_id: target.to_published().to_string(),
        patch,
    })
}

/// `document.delete`: delete the published document, and its draft when
/// `include_drafts` is set
pub fn build_document_delete(published_id: &str, include_drafts: bool) -> Result<Action> {
    let published = DocumentId::parse(published_id)?;
    if !published.is_published() {
        return Err(Error::InvalidOperation(format!(
            "{published_id} is not a published id"
        )));
    }
    let include_drafts = if include_drafts {
        vec![published.to_draft().to_string()]
    } else {
        Vec::new()
    };
    Ok(Action::DocumentDelete {
        published_id: published.to_string(),
        include_drafts,
    })
}

/// `document.discard`: delete a draft without touching the published copy
pub fn build_document_discard(draft_id: &str, purge: Option<bool>) -> Result<Action> {
    let draft = require_draft(draft_id)?;
    Ok(Action::DocumentDiscard {
        draft_id: draft.to_string(),
        purge,
    })
}

/// `release.create`
pub fn build_release_create(release_id: &str, metadata: ReleaseMetadata) -> Result<Action> {
    require_release_id(release_id)?;
    metadata.validate()?;
    Ok(Action::ReleaseCreate {
        release_id: release_id.to_string(),
        metadata,
    })
}

/// `release.edit`
pub fn build_release_edit(release_id: &str, patch: Patch) -> Result<Action> {
    require_release_id(release_id)?;
    if patch.is_empty() {
        return Err(Error::Validation("release patch has no operations".to_string()));
    }
    Ok(Action::ReleaseEdit {
        release_id: release_id.to_string(),
        patch,
    })
}

/// Single-action release transitions other than scheduling.
///
/// Scheduling needs a publish time; use [`build_release_schedule`].
pub fn build_release_action(kind: ReleaseActionKind, release_id: &str) -> Result<Action> {
    require_release_id(release_id)?;
    let release_id = release_id.to_string();
    let action = match kind {
        ReleaseActionKind::Archive => Action::ReleaseArchive { release_id },
        ReleaseActionKind::Unarchive => Action::ReleaseUnarchive { release_id },
        ReleaseActionKind::Unschedule => Action::ReleaseUnschedule { release_id },
        ReleaseActionKind::Publish => Action::ReleasePublish { release_id },
        ReleaseActionKind::Delete => Action::ReleaseDelete { release_id },
        ReleaseActionKind::Schedule => {
            return Err(Error::Validation(
                "scheduling a release requires a publish time".to_string(),
            ));
        }
    };
    Ok(action)
}

/// `release.schedule` at an already resolved instant
pub fn build_release_schedule(release_id: &str, publish_at: DateTime<Utc>) -> Result<Action> {
    require_release_id(release_id)?;
    Ok(Action::ReleaseSchedule {
        release_id: release_id.to_string(),
        publish_at,
    })
}

/// `release.schedule` from ISO-8601 or natural-language input
pub fn build_release_schedule_from_input(
    release_id: &str,
    publish_at: &str,
    dates: &dyn DateResolver,
) -> Result<Action> {
    let at = resolve_future_date(dates, publish_at)?;
    build_release_schedule(release_id, at)
}

/// Remove store-managed fields from a document snapshot
pub fn strip_system_fields(fields: &mut Map<String, Value>) {
    for field in SYSTEM_FIELDS {
        fields.remove(*field);
    }
}

fn into_object(document: Value) -> Result<Map<String, Value>> {
    match document {
        Value::Object(fields) => Ok(fields),
        other => Err(Error::Validation(format!(
            "document must be a JSON object, got {}",
            json_type(&other)
        ))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn require_version(id: &str) -> Result<DocumentId> {
    let parsed = DocumentId::parse(id)?;
    if !parsed.is_version() {
        return Err(Error::InvalidOperation(format!("{id} is not a version id")));
    }
    Ok(parsed)
}

fn require_draft(id: &str) -> Result<DocumentId> {
    let parsed = DocumentId::parse(id)?;
    if !parsed.is_draft() {
        return Err(Error::InvalidOperation(format!("{id} is not a draft id")));
    }
    Ok(parsed)
}

/// `published_id` must be the published form of the same document as `derived`
fn require_pair(derived: &DocumentId, published_id: &str) -> Result<DocumentId> {
    let published = DocumentId::parse(published_id)?;
    if !published.is_published() || published.base_id() != derived.base_id() {
        return Err(Error::InvalidOperation(format!(
            "{published_id} is not the published id of {derived}"
        )));
    }
    Ok(published)
}

fn require_release_id(release_id: &str) -> Result<()> {
    if !crate::id::is_valid_release_id(release_id) {
        return Err(Error::InvalidIdentifier {
            id: release_id.to_string(),
            reason: "release ids may only contain letters, digits, '-' and '_'".to_string(),
        });
    }
    Ok(())
}
