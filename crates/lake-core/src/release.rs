//! Release metadata and the store-owned release lifecycle
//!
//! The content store is authoritative for a release's state. The types here
//! describe that state machine so callers that already know a release's state
//! can tell which transitions are legal, and so test stores can enforce it.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How a release is intended to be published
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseType {
    #[default]
    Asap,
    Undecided,
    Scheduled,
}

impl FromStr for ReleaseType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "asap" => Ok(ReleaseType::Asap),
            "undecided" => Ok(ReleaseType::Undecided),
            "scheduled" => Ok(ReleaseType::Scheduled),
            _ => Err(Error::Validation(format!("unknown release type: {s}"))),
        }
    }
}

/// Release metadata as stored on the release document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseMetadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub release_type: ReleaseType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intended_publish_at: Option<DateTime<Utc>>,
}

impl ReleaseMetadata {
    pub fn new(title: impl Into<String>, release_type: ReleaseType) -> Self {
        Self {
            title: title.into(),
            description: None,
            release_type,
            intended_publish_at: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_intended_publish_at(mut self, at: DateTime<Utc>) -> Self {
        self.intended_publish_at = Some(at);
        self
    }

    /// A scheduled release must carry the time it is meant to go out
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("release title is required".to_string()));
        }
        if self.release_type == ReleaseType::Scheduled && self.intended_publish_at.is_none() {
            return Err(Error::Validation(
                "intendedPublishAt is required when releaseType is 'scheduled'".to_string(),
            ));
        }
        Ok(())
    }
}

/// Lifecycle state of a release, as reported by the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseState {
    Active,
    Scheduled,
    Published,
    Archived,
    Deleted,
}

impl ReleaseState {
    /// Next state after `kind` is applied, or `None` when the transition is
    /// not allowed from this state.
    pub fn apply(self, kind: ReleaseActionKind) -> Option<ReleaseState> {
        use ReleaseActionKind as K;
        use ReleaseState as S;

        match (self, kind) {
            (S::Active, K::Schedule) => Some(S::Scheduled),
            (S::Active | S::Scheduled, K::Publish) => Some(S::Published),
            (S::Active | S::Scheduled, K::Archive) => Some(S::Archived),
            (S::Scheduled, K::Unschedule) => Some(S::Active),
            (S::Archived, K::Unarchive) => Some(S::Active),
            (S::Archived | S::Published, K::Delete) => Some(S::Deleted),
            _ => None,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReleaseState::Published | ReleaseState::Deleted)
    }
}

impl fmt::Display for ReleaseState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ReleaseState::Active => "active",
            ReleaseState::Scheduled => "scheduled",
            ReleaseState::Published => "published",
            ReleaseState::Archived => "archived",
            ReleaseState::Deleted => "deleted",
        };
        write!(f, "{s}")
    }
}

/// Single-action release transitions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReleaseActionKind {
    Archive,
    Unarchive,
    Schedule,
    Unschedule,
    Publish,
    Delete,
}

impl ReleaseActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ReleaseActionKind::Archive => "archive",
            ReleaseActionKind::Unarchive => "unarchive",
            ReleaseActionKind::Schedule => "schedule",
            ReleaseActionKind::Unschedule => "unschedule",
            ReleaseActionKind::Publish => "publish",
            ReleaseActionKind::Delete => "delete",
        }
    }
}

impl FromStr for ReleaseActionKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "archive" => Ok(ReleaseActionKind::Archive),
            "unarchive" => Ok(ReleaseActionKind::Unarchive),
            "schedule" => Ok(ReleaseActionKind::Schedule),
            "unschedule" => Ok(ReleaseActionKind::Unschedule),
            "publish" => Ok(ReleaseActionKind::Publish),
            "delete" => Ok(ReleaseActionKind::Delete),
            _ => Err(Error::Validation(format!("unknown release action: {s}"))),
        }
    }
}

impl fmt::Display for ReleaseActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A release as listed from the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseSummary {
    pub release_id: String,
    pub state: ReleaseState,
    pub metadata: ReleaseMetadata,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publish_at: Option<DateTime<Utc>>,
}
