//! Wire shapes of the store's transactional actions
//!
//! Each [`Action`] serializes to a JSON object tagged by `actionType`, exactly
//! as the actions endpoint expects it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::release::ReleaseMetadata;

/// Behaviour of `document.create` when the target already exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IfExists {
    #[default]
    Fail,
    Ignore,
}

/// Field-level patch carried by edit actions
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub set_if_missing: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unset: Option<Vec<String>>,
}

impl Patch {
    pub fn is_empty(&self) -> bool {
        self.set.as_ref().is_none_or(Map::is_empty)
            && self.set_if_missing.as_ref().is_none_or(Map::is_empty)
            && self.unset.as_ref().is_none_or(Vec::is_empty)
    }
}

/// A single declarative mutation submitted to the actions endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "actionType")]
pub enum Action {
    #[serde(rename = "sanity.action.document.version.create", rename_all = "camelCase")]
    VersionCreate { published_id: String, document: Value },

    #[serde(rename = "sanity.action.document.version.replace")]
    VersionReplace { document: Value },

    #[serde(rename = "sanity.action.document.version.discard", rename_all = "camelCase")]
    VersionDiscard {
        version_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purge: Option<bool>,
    },

    #[serde(rename = "sanity.action.document.version.unpublish", rename_all = "camelCase")]
    VersionUnpublish {
        version_id: String,
        published_id: String,
    },

    #[serde(rename = "sanity.action.document.publish", rename_all = "camelCase")]
    Publish {
        draft_id: String,
        published_id: String,
    },

    #[serde(rename = "sanity.action.document.unpublish", rename_all = "camelCase")]
    Unpublish {
        draft_id: String,
        published_id: String,
    },

    #[serde(rename = "sanity.action.document.create", rename_all = "camelCase")]
    DocumentCreate {
        published_id: String,
        attributes: Value,
        if_exists: IfExists,
    },

    #[serde(rename = "sanity.action.document.delete", rename_all = "camelCase")]
    DocumentDelete {
        published_id: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        include_drafts: Vec<String>,
    },

    #[serde(rename = "sanity.action.document.discard", rename_all = "camelCase")]
    DocumentDiscard {
        draft_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        purge: Option<bool>,
    },

    #[serde(rename = "sanity.action.document.edit", rename_all = "camelCase")]
    DocumentEdit {
        draft_id: String,
        published_id: String,
        patch: Patch,
    },

    #[serde(rename = "sanity.action.release.create", rename_all = "camelCase")]
    ReleaseCreate {
        release_id: String,
        metadata: ReleaseMetadata,
    },

    #[serde(rename = "sanity.action.release.edit", rename_all = "camelCase")]
    ReleaseEdit { release_id: String, patch: Patch },

    #[serde(rename = "sanity.action.release.archive", rename_all = "camelCase")]
    ReleaseArchive { release_id: String },

    #[serde(rename = "sanity.action.release.unarchive", rename_all = "camelCase")]
    ReleaseUnarchive { release_id: String },

    #[serde(rename = "sanity.action.release.schedule", rename_all = "camelCase")]
    ReleaseSchedule {
        release_id: String,
        publish_at: DateTime<Utc>,
    },

    #[serde(rename = "sanity.action.release.unschedule", rename_all = "camelCase")]
    ReleaseUnschedule { release_id: String },

    #[serde(rename = "sanity.action.release.publish", rename_all = "camelCase")]
    ReleasePublish { release_id: String },

    #[serde(rename = "sanity.action.release.delete", rename_all = "camelCase")]
    ReleaseDelete { release_id: String },
}

impl Action {
    /// The `actionType` tag this action serializes with
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::VersionCreate { .. } => "sanity.action.document.version.create",
            Action::VersionReplace { .. } => "sanity.action.document.version.replace",
            Action::VersionDiscard { .. } => "sanity.action.document.version.discard",
            Action::VersionUnpublish { .. } => "sanity.action.document.version.unpublish",
            Action::Publish { .. } => "sanity.action.document.publish",
            Action::Unpublish { .. } => "sanity.action.document.unpublish",
            Action::DocumentCreate { .. } => "sanity.action.document.create",
            Action::DocumentDelete { .. } => "sanity.action.document.delete",
            Action::DocumentDiscard { .. } => "sanity.action.document.discard",
            Action::DocumentEdit { .. } => "sanity.action.document.edit",
            Action::ReleaseCreate { .. } => "sanity.action.release.create",
            Action::ReleaseEdit { .. } => "sanity.action.release.edit",
            Action::ReleaseArchive { .. } => "sanity.action.release.archive",
            Action::ReleaseUnarchive { .. } => "sanity.action.release.unarchive",
            Action::ReleaseSchedule { .. } => "sanity.action.release.schedule",
            Action::ReleaseUnschedule { .. } => "sanity.action.release.unschedule",
            Action::ReleasePublish { .. } => "sanity.action.release.publish",
            Action::ReleaseDelete { .. } => "sanity.action.release.delete",
        }
    }

    /// Release this action targets, for release-level actions
    pub fn release_id(&self) -> Option<&str> {
        match self {
            Action::ReleaseCreate { release_id, .. }
            | Action::ReleaseEdit { release_id, .. }
            | Action::ReleaseArchive { release_id }
            | Action::ReleaseUnarchive { release_id }
            | Action::ReleaseSchedule { release_id, .. }
            | Action::ReleaseUnschedule { release_id }
            | Action::ReleasePublish { release_id }
            | Action::ReleaseDelete { release_id } => Some(release_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn publish_serializes_with_action_type_tag() {
        let action = Action::Publish {
            draft_id: "drafts.post-1".to_string(),
            published_id: "post-1".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({
                "actionType": "sanity.action.document.publish",
                "draftId": "drafts.post-1",
                "publishedId": "post-1"
            })
        );
    }

    #[test]
    fn action_type_matches_serialized_tag() {
        let actions = vec![
            Action::VersionDiscard {
                version_id: "versions.r1.a".to_string(),
                purge: None,
            },
            Action::ReleaseDelete {
                release_id: "r1".to_string(),
            },
            Action::DocumentDelete {
                published_id: "a".to_string(),
                include_drafts: vec![],
            },
        ];
        for action in actions {
            let value = serde_json::to_value(&action).unwrap();
            assert_eq!(value["actionType"], action.action_type());
        }
    }

    #[test]
    fn discard_omits_absent_purge() {
        let action = Action::VersionDiscard {
            version_id: "versions.r1.a".to_string(),
            purge: None,
        };
        let value = serde_json::to_value(&action).unwrap();
        assert!(value.get("purge").is_none());
    }

    #[test]
    fn schedule_round_trips_through_json() {
        let action = Action::ReleaseSchedule {
            release_id: "r1".to_string(),
            publish_at: "2030-01-01T12:00:00Z".parse().unwrap(),
        };
        let value = serde_json::to_value(&action).unwrap();
        assert_eq!(value["publishAt"], "2030-01-01T12:00:00Z");
        let back: Action = serde_json::from_value(value).unwrap();
        assert_eq!(back, action);
    }

    #[test]
    fn empty_patch_detection() {
        assert!(Patch::default().is_empty());
        let patch = Patch {
            unset: Some(vec!["subtitle".to_string()]),
            ..Patch::default()
        };
        assert!(!patch.is_empty());
    }
}
