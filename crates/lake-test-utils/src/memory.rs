//! [`MemoryStore`]: an in-memory content store for tests.
//!
//! Action batches are applied to a copy of the current state and committed
//! only when every action succeeds, mirroring the all-or-nothing behaviour of
//! the real actions endpoint. Release state lives in the store and advances
//! through [`ReleaseState::apply`], so illegal transitions are rejected the
//! same way the store would reject them.
//!
//! Queries are not evaluated. The release listing query is answered from the
//! release table, a canned response can be registered for anything else, and
//! the fallback is every stored document.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lake_core::action::Action;
use lake_core::id::resolve_published_id;
use lake_core::{
    ActionResponse, ContentStore, DatasetInfo, Error, IfExists, Patch, ReleaseActionKind,
    ReleaseMetadata, ReleaseState, Result, StoreError,
};
use serde_json::{Map, Value, json};

/// A recorded call against the store
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Fetch { query: String },
    GetDocument { id: String },
    Create { id: String },
    Delete { id: String },
    SubmitActions { actions: Vec<Action> },
    ListDatasets,
}

#[derive(Debug, Clone)]
struct ReleaseRecord {
    state: ReleaseState,
    /// Holds `metadata` so dotted release patches apply like document patches
    fields: Map<String, Value>,
    publish_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default)]
struct Tables {
    documents: BTreeMap<String, Value>,
    releases: BTreeMap<String, ReleaseRecord>,
}

#[derive(Debug, Default)]
struct Inner {
    tables: Tables,
    calls: Vec<Call>,
    reject_next: Option<String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    query_response: Option<Value>,
    datasets: Vec<DatasetInfo>,
    transactions: u64,
}

/// In-memory [`ContentStore`]
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use lake_core::Orchestrator;
/// use lake_test_utils::{MemoryStore, article};
///
/// let store = Arc::new(MemoryStore::new().with_document(article("post-1", "Hello")));
/// let orchestrator = Orchestrator::new(store.clone());
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                datasets: vec![DatasetInfo {
                    name: "production".to_string(),
                    acl_mode: Some("public".to_string()),
                }],
                ..Inner::default()
            }),
        }
    }

    /// Seed a document, keyed by its `_id`
    pub fn with_document(self, document: Value) -> Self {
        self.insert_document(document);
        self
    }

    /// Seed a release in the given state
    pub fn with_release(self, release_id: &str, state: ReleaseState, title: &str) -> Self {
        let metadata = ReleaseMetadata::new(title, Default::default());
        let mut fields = Map::new();
        fields.insert(
            "metadata".to_string(),
            serde_json::to_value(metadata).unwrap_or(Value::Null),
        );
        self.lock().tables.releases.insert(
            release_id.to_string(),
            ReleaseRecord {
                state,
                fields,
                publish_at: None,
            },
        );
        self
    }

    pub fn insert_document(&self, document: Value) {
        let id = document_id(&document).unwrap_or_default();
        self.lock().tables.documents.insert(id, document);
    }

    /// Current content of a document
    pub fn document(&self, id: &str) -> Option<Value> {
        self.lock().tables.documents.get(id).cloned()
    }

    /// Every stored document id, sorted
    pub fn document_ids(&self) -> Vec<String> {
        self.lock().tables.documents.keys().cloned().collect()
    }

    pub fn release_state(&self, release_id: &str) -> Option<ReleaseState> {
        self.lock().tables.releases.get(release_id).map(|r| r.state)
    }

    pub fn release_metadata(&self, release_id: &str) -> Option<Value> {
        self.lock()
            .tables
            .releases
            .get(release_id)
            .and_then(|r| r.fields.get("metadata").cloned())
    }

    pub fn release_publish_at(&self, release_id: &str) -> Option<DateTime<Utc>> {
        self.lock()
            .tables
            .releases
            .get(release_id)
            .and_then(|r| r.publish_at)
    }

    /// Reject the next submitted batch with `description`
    pub fn reject_next_batch(&self, description: &str) {
        self.lock().reject_next = Some(description.to_string());
    }

    /// Fail with a transport error any batch touching this document
    pub fn fail_document(&self, id: &str) {
        self.lock().failing.insert(resolve_published_id(id));
    }

    /// Delay any batch touching this document before it is applied
    pub fn delay_document(&self, id: &str, delay: Duration) {
        self.lock().delays.insert(resolve_published_id(id), delay);
    }

    /// Answer every non-release query with `response`
    pub fn respond_to_queries(&self, response: Value) {
        self.lock().query_response = Some(response);
    }

    pub fn set_datasets(&self, datasets: Vec<DatasetInfo>) {
        self.lock().datasets = datasets;
    }

    /// Every call made so far, in order
    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    /// Action batches submitted so far, in order
    pub fn submitted(&self) -> Vec<Vec<Action>> {
        self.lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                Call::SubmitActions { actions } => Some(actions.clone()),
                _ => None,
            })
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn release_rows(tables: &Tables, state: Option<&str>) -> Value {
        let rows = tables
            .releases
            .iter()
            .filter(|(_, r)| state.is_none_or(|s| r.state.to_string() == s))
            .map(|(id, r)| {
                let mut row = json!({
                    "releaseId": id,
                    "state": r.state,
                    "metadata": r.fields.get("metadata").cloned().unwrap_or(Value::Null),
                });
                if let Some(at) = r.publish_at {
                    row["publishAt"] = json!(at);
                }
                row
            })
            .collect();
        Value::Array(rows)
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn fetch(&self, query: &str, params: &Map<String, Value>) -> Result<Value> {
        let mut inner = self.lock();
        inner.calls.push(Call::Fetch {
            query: query.to_string(),
        });
        if query.contains("system.release") {
            let state = params.get("state").and_then(Value::as_str);
            return Ok(Self::release_rows(&inner.tables, state));
        }
        if let Some(response) = &inner.query_response {
            return Ok(response.clone());
        }
        Ok(Value::Array(inner.tables.documents.values().cloned().collect()))
    }

    async fn get_document(&self, id: &str) -> Result<Option<Value>> {
        let mut inner = self.lock();
        inner.calls.push(Call::GetDocument { id: id.to_string() });
        Ok(inner.tables.documents.get(id).cloned())
    }

    async fn create(&self, document: Value) -> Result<Value> {
        let id = document_id(&document)
            .ok_or_else(|| Error::Validation("document has no _id".to_string()))?;
        let mut inner = self.lock();
        inner.calls.push(Call::Create { id: id.clone() });
        if inner.tables.documents.contains_key(&id) {
            return Err(Error::Transport(format!("document {id} already exists")));
        }
        inner.tables.documents.insert(id, document.clone());
        Ok(document)
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut inner = self.lock();
        inner.calls.push(Call::Delete { id: id.to_string() });
        inner
            .tables
            .documents
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("document {id}")))
    }

    async fn submit_actions(&self, actions: &[Action]) -> Result<ActionResponse> {
        let touched: Vec<String> = actions
            .iter()
            .flat_map(touched_ids)
            .map(|id| resolve_published_id(&id))
            .collect();

        let delay = {
            let mut inner = self.lock();
            inner.calls.push(Call::SubmitActions {
                actions: actions.to_vec(),
            });
            touched.iter().filter_map(|id| inner.delays.get(id)).max().copied()
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut inner = self.lock();
        if let Some(id) = touched.iter().find(|id| inner.failing.contains(*id)) {
            return Err(Error::Transport(format!("connection reset while writing {id}")));
        }
        if let Some(description) = inner.reject_next.take() {
            return Ok(rejected(description));
        }

        let mut staged = inner.tables.clone();
        for action in actions {
            if let Err(description) = apply(&mut staged, action) {
                return Ok(rejected(description));
            }
        }

        inner.tables = staged;
        inner.transactions += 1;
        Ok(ActionResponse::Committed {
            transaction_id: format!("tx-{}", inner.transactions),
        })
    }

    async fn list_datasets(&self) -> Result<Vec<DatasetInfo>> {
        let mut inner = self.lock();
        inner.calls.push(Call::ListDatasets);
        Ok(inner.datasets.clone())
    }
}

fn rejected(description: String) -> ActionResponse {
    ActionResponse::Rejected {
        error: StoreError {
            description,
            kind: Some("actionError".to_string()),
        },
    }
}

fn document_id(document: &Value) -> Option<String> {
    document.get("_id").and_then(Value::as_str).map(str::to_string)
}

fn touched_ids(action: &Action) -> Vec<String> {
    match action {
        Action::VersionCreate { published_id, .. }
        | Action::DocumentCreate { published_id, .. }
        | Action::DocumentDelete { published_id, .. } => vec![published_id.clone()],
        Action::VersionReplace { document } => document_id(document).into_iter().collect(),
        Action::VersionDiscard { version_id, .. } | Action::VersionUnpublish { version_id, .. } => {
            vec![version_id.clone()]
        }
        Action::Publish { draft_id, .. }
        | Action::Unpublish { draft_id, .. }
        | Action::DocumentDiscard { draft_id, .. }
        | Action::DocumentEdit { draft_id, .. } => vec![draft_id.clone()],
        _ => Vec::new(),
    }
}

type Applied = std::result::Result<(), String>;

fn apply(tables: &mut Tables, action: &Action) -> Applied {
    let docs = &mut tables.documents;
    match action {
        Action::VersionCreate { document, .. } => {
            let id = document_id(document).ok_or("version document has no _id")?;
            let release_id = release_of(&id)?;
            require_open_release(&tables.releases, &release_id)?;
            if docs.contains_key(&id) {
                return Err(format!("version {id} already exists"));
            }
            docs.insert(id, document.clone());
        }
        Action::VersionReplace { document } => {
            let id = document_id(document).ok_or("version document has no _id")?;
            require_open_release(&tables.releases, &release_of(&id)?)?;
            if !docs.contains_key(&id) {
                return Err(format!("version {id} does not exist"));
            }
            docs.insert(id, document.clone());
        }
        Action::VersionDiscard { version_id, .. } => {
            docs.remove(version_id)
                .ok_or_else(|| format!("version {version_id} does not exist"))?;
        }
        Action::VersionUnpublish {
            version_id,
            published_id,
        } => {
            require_open_release(&tables.releases, &release_of(version_id)?)?;
            let published = docs
                .get(published_id)
                .cloned()
                .ok_or_else(|| format!("{published_id} is not published"))?;
            let mut marker = docs.get(version_id).cloned().unwrap_or(published);
            marker["_id"] = json!(version_id);
            marker["_system"] = json!({"delete": true});
            docs.insert(version_id.clone(), marker);
        }
        Action::Publish {
            draft_id,
            published_id,
        } => {
            let mut draft = docs
                .remove(draft_id)
                .ok_or_else(|| format!("no draft {draft_id} to publish"))?;
            draft["_id"] = json!(published_id);
            docs.insert(published_id.clone(), draft);
        }
        Action::Unpublish {
            draft_id,
            published_id,
        } => {
            let mut published = docs
                .remove(published_id)
                .ok_or_else(|| format!("{published_id} is not published"))?;
            if !docs.contains_key(draft_id) {
                published["_id"] = json!(draft_id);
                docs.insert(draft_id.clone(), published);
            }
        }
        Action::DocumentCreate {
            published_id,
            attributes,
            if_exists,
        } => {
            let draft_id = document_id(attributes).ok_or("attributes have no _id")?;
            if docs.contains_key(&draft_id) || docs.contains_key(published_id) {
                return match if_exists {
                    IfExists::Ignore => Ok(()),
                    IfExists::Fail => Err(format!("document {published_id} already exists")),
                };
            }
            docs.insert(draft_id, attributes.clone());
        }
        Action::DocumentDelete {
            published_id,
            include_drafts,
        } => {
            let mut removed = docs.remove(published_id).is_some();
            for draft in include_drafts {
                removed |= docs.remove(draft).is_some();
            }
            if !removed {
                return Err(format!("document {published_id} does not exist"));
            }
        }
        Action::DocumentDiscard { draft_id, .. } => {
            docs.remove(draft_id)
                .ok_or_else(|| format!("no draft {draft_id} to discard"))?;
        }
        Action::DocumentEdit {
            draft_id,
            published_id,
            patch,
        } => {
            if draft_id.starts_with("versions.") {
                require_open_release(&tables.releases, &release_of(draft_id)?)?;
            }
            let mut target = match docs.get(draft_id) {
                Some(existing) => existing.clone(),
                None => {
                    let mut base = docs
                        .get(published_id)
                        .cloned()
                        .ok_or_else(|| format!("document {published_id} does not exist"))?;
                    base["_id"] = json!(draft_id);
                    base
                }
            };
            let Value::Object(fields) = &mut target else {
                return Err(format!("document {draft_id} is not an object"));
            };
            apply_patch(fields, patch);
            docs.insert(draft_id.clone(), target);
        }
        Action::ReleaseCreate {
            release_id,
            metadata,
        } => {
            if tables.releases.contains_key(release_id) {
                return Err(format!("release {release_id} already exists"));
            }
            let mut fields = Map::new();
            fields.insert(
                "metadata".to_string(),
                serde_json::to_value(metadata).map_err(|e| e.to_string())?,
            );
            tables.releases.insert(
                release_id.clone(),
                ReleaseRecord {
                    state: ReleaseState::Active,
                    fields,
                    publish_at: None,
                },
            );
        }
        Action::ReleaseEdit { release_id, patch } => {
            let record = tables
                .releases
                .get_mut(release_id)
                .ok_or_else(|| format!("release {release_id} does not exist"))?;
            apply_patch(&mut record.fields, patch);
        }
        Action::ReleaseSchedule {
            release_id,
            publish_at,
        } => {
            transition(tables, release_id, ReleaseActionKind::Schedule)?;
            if let Some(record) = tables.releases.get_mut(release_id) {
                record.publish_at = Some(*publish_at);
            }
        }
        Action::ReleaseUnschedule { release_id } => {
            transition(tables, release_id, ReleaseActionKind::Unschedule)?;
            if let Some(record) = tables.releases.get_mut(release_id) {
                record.publish_at = None;
            }
        }
        Action::ReleaseArchive { release_id } => {
            transition(tables, release_id, ReleaseActionKind::Archive)?;
        }
        Action::ReleaseUnarchive { release_id } => {
            transition(tables, release_id, ReleaseActionKind::Unarchive)?;
        }
        Action::ReleaseDelete { release_id } => {
            transition(tables, release_id, ReleaseActionKind::Delete)?;
        }
        Action::ReleasePublish { release_id } => {
            transition(tables, release_id, ReleaseActionKind::Publish)?;
            publish_versions(&mut tables.documents, release_id);
        }
    }
    Ok(())
}

fn release_of(version_id: &str) -> std::result::Result<String, String> {
    lake_core::DocumentId::parse(version_id)
        .ok()
        .and_then(|id| id.release_id().map(str::to_string))
        .ok_or_else(|| format!("{version_id} is not a version id"))
}

fn require_open_release(releases: &BTreeMap<String, ReleaseRecord>, release_id: &str) -> Applied {
    match releases.get(release_id).map(|r| r.state) {
        Some(ReleaseState::Active) => Ok(()),
        Some(state) => Err(format!("release {release_id} is {state}")),
        None => Err(format!("release {release_id} does not exist")),
    }
}

fn transition(tables: &mut Tables, release_id: &str, kind: ReleaseActionKind) -> Applied {
    let record = tables
        .releases
        .get_mut(release_id)
        .ok_or_else(|| format!("release {release_id} does not exist"))?;
    record.state = record
        .state
        .apply(kind)
        .ok_or_else(|| format!("cannot {kind} release {release_id} while {}", record.state))?;
    Ok(())
}

/// Move every version in the release onto its published id
fn publish_versions(documents: &mut BTreeMap<String, Value>, release_id: &str) {
    let prefix = format!("versions.{release_id}.");
    let versions: Vec<String> = documents
        .keys()
        .filter(|id| id.starts_with(&prefix))
        .cloned()
        .collect();

    for version_id in versions {
        let Some(mut version) = documents.remove(&version_id) else {
            continue;
        };
        let published_id = resolve_published_id(&version_id);
        if version.pointer("/_system/delete") == Some(&Value::Bool(true)) {
            documents.remove(&published_id);
        } else {
            version["_id"] = json!(published_id);
            documents.insert(published_id, version);
        }
    }
}

fn apply_patch(fields: &mut Map<String, Value>, patch: &Patch) {
    for (path, value) in patch.set.iter().flatten() {
        set_path(fields, path, value.clone());
    }
    for (path, value) in patch.set_if_missing.iter().flatten() {
        if get_path(fields, path).is_none() {
            set_path(fields, path, value.clone());
        }
    }
    for path in patch.unset.iter().flatten() {
        unset_path(fields, path);
    }
}

fn get_path<'a>(fields: &'a Map<String, Value>, path: &str) -> Option<&'a Value> {
    let mut segments = path.split('.');
    let mut current = fields.get(segments.next()?)?;
    for segment in segments {
        current = current.get(segment)?;
    }
    Some(current)
}

fn set_path(fields: &mut Map<String, Value>, path: &str, value: Value) {
    match path.split_once('.') {
        None => {
            fields.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let child = fields
                .entry(head.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(child) = child {
                set_path(child, rest, value);
            }
        }
    }
}

fn unset_path(fields: &mut Map<String, Value>, path: &str) {
    match path.split_once('.') {
        None => {
            fields.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Value::Object(child)) = fields.get_mut(head) {
                unset_path(child, rest);
            }
        }
    }
}
