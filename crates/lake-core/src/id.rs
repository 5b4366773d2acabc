//! Document identifier model
//!
//! Every logical document has one published id (its *base id*) and any number
//! of derived copies that share it:
//!
//! | Form      | Identifier                        |
//! |-----------|-----------------------------------|
//! | Published | `<baseId>`                        |
//! | Draft     | `drafts.<baseId>`                 |
//! | Version   | `versions.<releaseId>.<baseId>`   |
//!
//! Parsing is positional: the release id is always the second segment of a
//! version id and everything after it is the base id. Release ids therefore
//! never contain dots, while base ids may.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Prefix segment of draft ids
pub const DRAFTS_PREFIX: &str = "drafts";

/// Prefix segment of version ids
pub const VERSIONS_PREFIX: &str = "versions";

static RELEASE_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").expect("Invalid release id regex"));

static RELEASE_ID_STRIP: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("Invalid release id strip regex"));

/// Which copy of a logical document an identifier points at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdCategory {
    Published,
    Draft,
    Version,
}

impl fmt::Display for IdCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdCategory::Published => write!(f, "published"),
            IdCategory::Draft => write!(f, "draft"),
            IdCategory::Version => write!(f, "version"),
        }
    }
}

/// A parsed document identifier.
///
/// Constructed only through [`DocumentId::parse`] or the validating
/// constructors, so `DocumentId::parse(&id.to_string()) == Ok(id)` holds for
/// every value of this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DocumentId {
    category: IdCategory,
    base_id: String,
    release_id: Option<String>,
}

impl DocumentId {
    /// Identifier of the published copy
    pub fn published(base_id: impl Into<String>) -> Result<Self> {
        let base_id = base_id.into();
        validate_base_id(&base_id)?;
        Ok(Self {
            category: IdCategory::Published,
            base_id,
            release_id: None,
        })
    }

    /// Identifier of the draft copy
    pub fn draft(base_id: impl Into<String>) -> Result<Self> {
        let base_id = base_id.into();
        validate_base_id(&base_id)?;
        Ok(Self {
            category: IdCategory::Draft,
            base_id,
            release_id: None,
        })
    }

    /// Identifier of the copy scoped to `release_id`
    pub fn version(base_id: impl Into<String>, release_id: impl Into<String>) -> Result<Self> {
        let base_id = base_id.into();
        let release_id = release_id.into();
        validate_base_id(&base_id)?;
        validate_release_id(&release_id)?;
        Ok(Self {
            category: IdCategory::Version,
            base_id,
            release_id: Some(release_id),
        })
    }

    /// Parse a raw identifier string
    pub fn parse(id: &str) -> Result<Self> {
        if id.is_empty() {
            return Err(Error::invalid_id(id, "identifier is empty"));
        }

        let Some((head, rest)) = id.split_once('.') else {
            return Self::published(id);
        };

        match head {
            DRAFTS_PREFIX => Self::draft(rest).map_err(|e| rewrap(id, e)),
            VERSIONS_PREFIX => {
                let Some((release_id, base_id)) = rest.split_once('.') else {
                    return Err(Error::invalid_id(id, "version id is missing a release segment"));
                };
                Self::version(base_id, release_id).map_err(|e| rewrap(id, e))
            }
            _ => Self::published(id),
        }
    }

    pub fn category(&self) -> IdCategory {
        self.category
    }

    pub fn base_id(&self) -> &str {
        &self.base_id
    }

    pub fn release_id(&self) -> Option<&str> {
        self.release_id.as_deref()
    }

    pub fn is_published(&self) -> bool {
        self.category == IdCategory::Published
    }

    pub fn is_draft(&self) -> bool {
        self.category == IdCategory::Draft
    }

    pub fn is_version(&self) -> bool {
        self.category == IdCategory::Version
    }

    /// The published form of the same logical document
    pub fn to_published(&self) -> Self {
        Self {
            category: IdCategory::Published,
            base_id: self.base_id.clone(),
            release_id: None,
        }
    }

    /// The draft form of the same logical document
    pub fn to_draft(&self) -> Self {
        Self {
            category: IdCategory::Draft,
            base_id: self.base_id.clone(),
            release_id: None,
        }
    }

    /// The version form of the same logical document in `release_id`
    pub fn in_release(&self, release_id: &str) -> Result<Self> {
        Self::version(self.base_id.clone(), release_id)
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.category, &self.release_id) {
            (IdCategory::Published, _) => write!(f, "{}", self.base_id),
            (IdCategory::Draft, _) => write!(f, "{}.{}", DRAFTS_PREFIX, self.base_id),
            (IdCategory::Version, Some(release)) => {
                write!(f, "{}.{}.{}", VERSIONS_PREFIX, release, self.base_id)
            }
            // unreachable through the validating constructors
            (IdCategory::Version, None) => write!(f, "{}", self.base_id),
        }
    }
}

impl FromStr for DocumentId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for DocumentId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<DocumentId> for String {
    fn from(id: DocumentId) -> Self {
        id.to_string()
    }
}

/// How an explicit release argument should influence identifier resolution.
///
/// Tool callers pass either a release id, an explicit `false` meaning "the
/// published document", or nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReleaseOverride {
    #[default]
    Unspecified,
    Published,
    Release(String),
}

impl ReleaseOverride {
    /// Build from an optional release id, normalizing it
    pub fn from_release(release_id: Option<&str>) -> Result<Self> {
        match release_id {
            Some(id) => Ok(Self::Release(normalize_release_id(id)?)),
            None => Ok(Self::Unspecified),
        }
    }
}

/// `versions.<releaseId>.<baseId>`
pub fn to_version_id(base_id: &str, release_id: &str) -> Result<String> {
    Ok(DocumentId::version(base_id, release_id)?.to_string())
}

/// `drafts.<baseId>`
pub fn to_draft_id(base_id: &str) -> Result<String> {
    Ok(DocumentId::draft(base_id)?.to_string())
}

/// Strip any draft or version prefix, returning the base id.
///
/// Malformed ids are returned unchanged, so applying this twice yields the
/// same result as applying it once.
pub fn resolve_published_id(id: &str) -> String {
    match DocumentId::parse(id) {
        Ok(parsed) => parsed.base_id,
        Err(_) => id.to_string(),
    }
}

/// Decide which concrete identifier an action should target.
///
/// An explicit [`ReleaseOverride::Published`] always wins. Otherwise a version
/// id is self-describing and keeps its own release, a supplied release id
/// produces the version form, and anything else resolves to published.
pub fn resolve_for_action(id: &str, release: &ReleaseOverride) -> Result<DocumentId> {
    let parsed = DocumentId::parse(id)?;

    match release {
        ReleaseOverride::Published => Ok(parsed.to_published()),
        _ if parsed.is_version() => Ok(parsed),
        ReleaseOverride::Release(release_id) => parsed.in_release(release_id),
        ReleaseOverride::Unspecified => Ok(parsed.to_published()),
    }
}

/// Drop every character not allowed in a release id
pub fn normalize_release_id(input: &str) -> Result<String> {
    let normalized = RELEASE_ID_STRIP.replace_all(input.trim(), "").into_owned();
    if normalized.is_empty() {
        return Err(Error::invalid_id(
            input,
            "release id has no alphanumeric characters",
        ));
    }
    Ok(normalized)
}

const RELEASE_ID_ALPHABET: &[u8] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// A fresh release id: `r` followed by 8 random `[A-Za-z0-9]` characters
pub fn generate_release_id() -> String {
    let base = RELEASE_ID_ALPHABET.len() as u128;
    let mut bits = uuid::Uuid::new_v4().as_u128();
    let mut id = String::with_capacity(9);
    id.push('r');
    for _ in 0..8 {
        id.push(char::from(RELEASE_ID_ALPHABET[(bits % base) as usize]));
        bits /= base;
    }
    id
}

pub fn is_valid_release_id(release_id: &str) -> bool {
    RELEASE_ID_PATTERN.is_match(release_id)
}

fn validate_release_id(release_id: &str) -> Result<()> {
    if !is_valid_release_id(release_id) {
        return Err(Error::invalid_id(
            release_id,
            "release ids may only contain letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

fn validate_base_id(base_id: &str) -> Result<()> {
    if base_id.is_empty() {
        return Err(Error::invalid_id(base_id, "base id is empty"));
    }
    if base_id.starts_with('.') || base_id.ends_with('.') {
        return Err(Error::invalid_id(base_id, "base id has an empty segment"));
    }
    if base_id.chars().any(char::is_whitespace) {
        return Err(Error::invalid_id(base_id, "base id contains whitespace"));
    }
    let head = base_id.split('.').next().unwrap_or_default();
    if base_id.contains('.') && (head == DRAFTS_PREFIX || head == VERSIONS_PREFIX) {
        return Err(Error::invalid_id(base_id, "base id carries a nested prefix"));
    }
    Ok(())
}

fn rewrap(id: &str, err: Error) -> Error {
    match err {
        Error::InvalidIdentifier { reason, .. } => Error::invalid_id(id, reason),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn version_id_is_deterministic_concatenation() {
        assert_eq!(
            to_version_id("post-1", "rABC123").unwrap(),
            "versions.rABC123.post-1"
        );
    }

    #[test]
    fn parse_version_id() {
        let id = DocumentId::parse("versions.rABC123.post-1").unwrap();
        assert_eq!(id.category(), IdCategory::Version);
        assert_eq!(id.base_id(), "post-1");
        assert_eq!(id.release_id(), Some("rABC123"));
    }

    #[rstest]
    #[case("post-1", IdCategory::Published, "post-1", None)]
    #[case("drafts.post-1", IdCategory::Draft, "post-1", None)]
    #[case("drafts.a.b", IdCategory::Draft, "a.b", None)]
    #[case("versions.r1.a.b", IdCategory::Version, "a.b", Some("r1"))]
    #[case("image-abc.png", IdCategory::Published, "image-abc.png", None)]
    #[case("drafts", IdCategory::Published, "drafts", None)]
    fn parse_cases(
        #[case] input: &str,
        #[case] category: IdCategory,
        #[case] base: &str,
        #[case] release: Option<&str>,
    ) {
        let id = DocumentId::parse(input).unwrap();
        assert_eq!(id.category(), category);
        assert_eq!(id.base_id(), base);
        assert_eq!(id.release_id(), release);
        assert_eq!(id.to_string(), input);
    }

    #[rstest]
    #[case("")]
    #[case("versions.rABC")]
    #[case("versions..post-1")]
    #[case("drafts.")]
    #[case("drafts.drafts.post-1")]
    #[case("versions.r1.drafts.post-1")]
    #[case("drafts.post 1")]
    fn parse_rejects_malformed(#[case] input: &str) {
        let err = DocumentId::parse(input).unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier { .. }), "{err}");
    }

    #[test]
    fn version_with_dotted_release_is_rejected() {
        let err = DocumentId::version("post-1", "r.1").unwrap_err();
        assert!(matches!(err, Error::InvalidIdentifier { .. }));
    }

    #[rstest]
    #[case("post-1", "post-1")]
    #[case("drafts.post-1", "post-1")]
    #[case("versions.rX.post-1", "post-1")]
    #[case("versions.rX", "versions.rX")]
    fn resolve_published(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(resolve_published_id(input), expected);
    }

    #[test]
    fn explicit_published_override_wins() {
        let id = resolve_for_action("versions.rX.post-1", &ReleaseOverride::Published).unwrap();
        assert_eq!(id.to_string(), "post-1");
    }

    #[test]
    fn version_id_keeps_its_own_release() {
        let id = resolve_for_action(
            "versions.rX.post-1",
            &ReleaseOverride::Release("rY".to_string()),
        )
        .unwrap();
        assert_eq!(id.to_string(), "versions.rX.post-1");
    }

    #[test]
    fn release_argument_produces_version_form() {
        let id = resolve_for_action("drafts.post-1", &ReleaseOverride::Release("rY".to_string()))
            .unwrap();
        assert_eq!(id.to_string(), "versions.rY.post-1");
    }

    #[test]
    fn no_release_resolves_to_published() {
        let id = resolve_for_action("drafts.post-1", &ReleaseOverride::Unspecified).unwrap();
        assert_eq!(id.to_string(), "post-1");
    }

    #[rstest]
    #[case("rABC123", "rABC123")]
    #[case(" r.ABC 123 ", "rABC123")]
    #[case("summer-launch_2", "summer-launch_2")]
    fn normalize_release(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(normalize_release_id(input).unwrap(), expected);
    }

    #[test]
    fn normalize_release_rejects_empty_result() {
        assert!(normalize_release_id("...").is_err());
    }

    #[test]
    fn generated_release_ids_are_valid() {
        let id = generate_release_id();
        assert_eq!(id.len(), 9);
        assert!(id.starts_with('r'));
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(is_valid_release_id(&id));
    }

    #[test]
    fn generated_release_ids_use_the_full_alphanumeric_alphabet() {
        let ids: Vec<String> = (0..200).map(|_| generate_release_id()).collect();
        assert!(ids.iter().all(|id| is_valid_release_id(id) && id.len() == 9));
        // 1600 draws from 62 symbols all but guarantee both letter cases appear
        assert!(ids.iter().any(|id| id[1..].chars().any(|c| c.is_ascii_uppercase())));
        assert!(ids.iter().any(|id| id[1..].chars().any(|c| c.is_ascii_lowercase())));
    }

    #[test]
    fn document_id_serializes_as_string() {
        let id = DocumentId::parse("drafts.post-1").unwrap();
        assert_eq!(serde_json::to_value(&id).unwrap(), "drafts.post-1");
        let back: DocumentId = serde_json::from_str("\"versions.r1.post-1\"").unwrap();
        assert!(back.is_version());
    }
}
