//! MCP Tool Handlers
//!
//! Each tool has a typed argument struct that is deserialized at the boundary
//! (unknown fields rejected) before the call is handed to the
//! [`Orchestrator`].

use lake_core::{
    CreateReleaseRequest, EditReleaseRequest, IfExists, Orchestrator, Patch, ReleaseActionKind,
    ReleaseOverride, ReleaseState, ReleaseType,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::session::Session;
use crate::{Error, Result};

const USAGE_NOTES: &str = "\
Document ids come in three forms: `<id>` (published), `drafts.<id>` (draft) and \
`versions.<releaseId>.<id>` (a version inside a release). Edits go to the draft \
unless a releaseId is given. Bulk tools report per-document results plus a summary; \
check `summary.failed` before assuming success.";

/// Names of every tool the server answers to
pub const TOOL_NAMES: &[&str] = &[
    "get_initial_context",
    "query_documents",
    "get_document",
    "list_datasets",
    "create_documents",
    "patch_document",
    "publish_documents",
    "unpublish_documents",
    "discard_drafts",
    "delete_documents",
    "create_version",
    "version_replace_document",
    "version_discard",
    "version_unpublish_document",
    "list_releases",
    "create_release",
    "edit_release",
    "schedule_release",
    "release_action",
];

/// Identifies the project and dataset the server is bound to
#[derive(Debug, Clone, Default)]
pub struct ProjectInfo {
    pub project_id: String,
    pub dataset: String,
}

/// Everything a tool call can reach
pub struct ToolContext<'a> {
    pub orchestrator: &'a Orchestrator,
    pub session: &'a Session,
    pub project: &'a ProjectInfo,
}

/// Handle a tool call by dispatching to the appropriate handler
pub async fn handle_tool_call(ctx: &ToolContext<'_>, tool_name: &str, arguments: Value) -> Result<Value> {
    if !TOOL_NAMES.contains(&tool_name) {
        return Err(Error::UnknownTool(tool_name.to_string()));
    }
    if tool_name != "get_initial_context" {
        ctx.session.require_context()?;
    }
    debug!(tool = %tool_name, "Dispatching tool call");

    let orchestrator = ctx.orchestrator;
    match tool_name {
        "get_initial_context" => handle_get_initial_context(ctx, arguments).await,

        // Reading
        "query_documents" => handle_query_documents(orchestrator, arguments).await,
        "get_document" => handle_get_document(orchestrator, arguments).await,
        "list_datasets" => handle_list_datasets(orchestrator, arguments).await,

        // Documents
        "create_documents" => handle_create_documents(orchestrator, arguments).await,
        "patch_document" => handle_patch_document(orchestrator, arguments).await,
        "publish_documents" => handle_publish_documents(orchestrator, arguments).await,
        "unpublish_documents" => handle_unpublish_documents(orchestrator, arguments).await,
        "discard_drafts" => handle_discard_drafts(orchestrator, arguments).await,
        "delete_documents" => handle_delete_documents(orchestrator, arguments).await,

        // Versions
        "create_version" => handle_create_version(orchestrator, arguments).await,
        "version_replace_document" => handle_version_replace(orchestrator, arguments).await,
        "version_discard" => handle_version_discard(orchestrator, arguments).await,
        "version_unpublish_document" => handle_version_unpublish(orchestrator, arguments).await,

        // Releases
        "list_releases" => handle_list_releases(orchestrator, arguments).await,
        "create_release" => handle_create_release(orchestrator, arguments).await,
        "edit_release" => handle_edit_release(orchestrator, arguments).await,
        "schedule_release" => handle_schedule_release(orchestrator, arguments).await,
        "release_action" => handle_release_action(orchestrator, arguments).await,

        _ => Err(Error::UnknownTool(tool_name.to_string())),
    }
}

/// Deserialize tool arguments; an omitted arguments object counts as empty
fn parse_args<T: DeserializeOwned>(arguments: Value) -> Result<T> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other,
    };
    serde_json::from_value(arguments).map_err(|e| Error::InvalidArgument(e.to_string()))
}

fn require_ids(ids: &[String], field: &str) -> Result<()> {
    if ids.is_empty() {
        return Err(Error::InvalidArgument(format!("{field} must not be empty")));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct NoArgs {}

// ============================================================================
// Context
// ============================================================================

async fn handle_get_initial_context(ctx: &ToolContext<'_>, arguments: Value) -> Result<Value> {
    let _: NoArgs = parse_args(arguments)?;
    let datasets = ctx.orchestrator.list_datasets().await?;
    let releases = ctx
        .orchestrator
        .list_releases(Some(ReleaseState::Active))
        .await?;

    ctx.session.mark_context_loaded();
    tracing::info!(
        project = %ctx.project.project_id,
        dataset = %ctx.project.dataset,
        "Initial context loaded"
    );

    Ok(json!({
        "projectId": ctx.project.project_id,
        "dataset": ctx.project.dataset,
        "datasets": datasets,
        "activeReleases": releases,
        "instructions": USAGE_NOTES,
    }))
}

// ============================================================================
// Reading
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct QueryDocumentsArgs {
    query: String,
    #[serde(default)]
    params: Map<String, Value>,
}

async fn handle_query_documents(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: QueryDocumentsArgs = parse_args(arguments)?;
    if args.query.trim().is_empty() {
        return Err(Error::InvalidArgument("query must not be empty".to_string()));
    }
    let result = orchestrator.query(&args.query, &args.params).await?;
    let count = result.as_array().map(Vec::len);
    Ok(json!({ "result": result, "count": count }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct GetDocumentArgs {
    document_id: String,
}

async fn handle_get_document(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: GetDocumentArgs = parse_args(arguments)?;
    Ok(orchestrator.get_document(&args.document_id).await?)
}

async fn handle_list_datasets(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let _: NoArgs = parse_args(arguments)?;
    let datasets = orchestrator.list_datasets().await?;
    Ok(json!({ "datasets": datasets }))
}

// ============================================================================
// Documents
// ============================================================================

/// `releaseId` accepts a release id or an explicit `false`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReleaseArg {
    Id(String),
    Flag(bool),
}

fn release_override(arg: Option<ReleaseArg>) -> Result<ReleaseOverride> {
    match arg {
        None => Ok(ReleaseOverride::Unspecified),
        Some(ReleaseArg::Flag(false)) => Ok(ReleaseOverride::Published),
        Some(ReleaseArg::Flag(true)) => Err(Error::InvalidArgument(
            "releaseId must be a release id or false".to_string(),
        )),
        Some(ReleaseArg::Id(id)) => Ok(ReleaseOverride::from_release(Some(&id))?),
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateDocumentsArgs {
    documents: Vec<Value>,
    #[serde(default)]
    release_id: Option<String>,
    #[serde(default)]
    if_exists: IfExists,
}

async fn handle_create_documents(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: CreateDocumentsArgs = parse_args(arguments)?;
    if args.documents.is_empty() {
        return Err(Error::InvalidArgument("documents must not be empty".to_string()));
    }
    let response = orchestrator
        .create_documents(args.documents, args.release_id.as_deref(), args.if_exists)
        .await?;
    Ok(serde_json::to_value(response)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct PatchDocumentArgs {
    document_id: String,
    #[serde(default)]
    release_id: Option<ReleaseArg>,
    #[serde(default)]
    set: Option<Map<String, Value>>,
    #[serde(default)]
    set_if_missing: Option<Map<String, Value>>,
    #[serde(default)]
    unset: Option<Vec<String>>,
}

async fn handle_patch_document(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: PatchDocumentArgs = parse_args(arguments)?;
    let release = release_override(args.release_id)?;
    let patch = Patch {
        set: args.set,
        set_if_missing: args.set_if_missing,
        unset: args.unset,
    };
    let outcome = orchestrator
        .patch_document(&args.document_id, &release, patch)
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DocumentIdsArgs {
    document_ids: Vec<String>,
}

async fn handle_publish_documents(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: DocumentIdsArgs = parse_args(arguments)?;
    require_ids(&args.document_ids, "documentIds")?;
    Ok(serde_json::to_value(orchestrator.publish_documents(args.document_ids).await)?)
}

async fn handle_unpublish_documents(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: DocumentIdsArgs = parse_args(arguments)?;
    require_ids(&args.document_ids, "documentIds")?;
    Ok(serde_json::to_value(orchestrator.unpublish_documents(args.document_ids).await)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DiscardDraftsArgs {
    document_ids: Vec<String>,
    #[serde(default)]
    purge: Option<bool>,
}

async fn handle_discard_drafts(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: DiscardDraftsArgs = parse_args(arguments)?;
    require_ids(&args.document_ids, "documentIds")?;
    let response = orchestrator
        .discard_drafts(args.document_ids, args.purge)
        .await;
    Ok(serde_json::to_value(response)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct DeleteDocumentsArgs {
    document_ids: Vec<String>,
    #[serde(default)]
    include_drafts: bool,
}

async fn handle_delete_documents(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: DeleteDocumentsArgs = parse_args(arguments)?;
    require_ids(&args.document_ids, "documentIds")?;
    let response = orchestrator
        .delete_documents(args.document_ids, args.include_drafts)
        .await;
    Ok(serde_json::to_value(response)?)
}

// ============================================================================
// Versions
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ReleaseDocumentsArgs {
    release_id: String,
    document_ids: Vec<String>,
}

async fn handle_create_version(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: ReleaseDocumentsArgs = parse_args(arguments)?;
    require_ids(&args.document_ids, "documentIds")?;
    let response = orchestrator
        .add_document_versions(&args.release_id, args.document_ids)
        .await?;
    Ok(serde_json::to_value(response)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct VersionReplaceArgs {
    document_id: String,
    #[serde(default)]
    release_id: Option<String>,
    source_document_id: String,
}

async fn handle_version_replace(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: VersionReplaceArgs = parse_args(arguments)?;
    let outcome = orchestrator
        .replace_version(
            &args.document_id,
            args.release_id.as_deref(),
            &args.source_document_id,
        )
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct VersionDiscardArgs {
    document_id: String,
    #[serde(default)]
    release_id: Option<String>,
    #[serde(default)]
    purge: Option<bool>,
}

async fn handle_version_discard(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: VersionDiscardArgs = parse_args(arguments)?;
    let outcome = orchestrator
        .discard_version(&args.document_id, args.release_id.as_deref(), args.purge)
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

async fn handle_version_unpublish(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: ReleaseDocumentsArgs = parse_args(arguments)?;
    require_ids(&args.document_ids, "documentIds")?;
    let response = orchestrator
        .mark_for_unpublish(&args.release_id, args.document_ids)
        .await?;
    Ok(serde_json::to_value(response)?)
}

// ============================================================================
// Releases
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ListReleasesArgs {
    #[serde(default)]
    state: Option<ReleaseState>,
}

async fn handle_list_releases(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: ListReleasesArgs = parse_args(arguments)?;
    let releases = orchestrator.list_releases(args.state).await?;
    Ok(json!({ "releases": releases, "count": releases.len() }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct CreateReleaseArgs {
    #[serde(default)]
    release_id: Option<String>,
    title: String,
    #[serde(default)]
    description: Option<String>,
    release_type: ReleaseType,
    #[serde(default)]
    intended_publish_at: Option<String>,
    #[serde(default)]
    document_ids: Vec<String>,
}

async fn handle_create_release(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: CreateReleaseArgs = parse_args(arguments)?;
    let created = orchestrator
        .create_release(CreateReleaseRequest {
            release_id: args.release_id,
            title: args.title,
            description: args.description,
            release_type: args.release_type,
            intended_publish_at: args.intended_publish_at,
            document_ids: args.document_ids,
        })
        .await?;
    Ok(serde_json::to_value(created)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct EditReleaseArgs {
    release_id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    release_type: Option<ReleaseType>,
    #[serde(default)]
    intended_publish_at: Option<String>,
}

async fn handle_edit_release(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: EditReleaseArgs = parse_args(arguments)?;
    let outcome = orchestrator
        .edit_release(
            &args.release_id,
            EditReleaseRequest {
                title: args.title,
                description: args.description,
                release_type: args.release_type,
                intended_publish_at: args.intended_publish_at,
            },
        )
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ScheduleReleaseArgs {
    release_id: String,
    publish_at: String,
}

async fn handle_schedule_release(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: ScheduleReleaseArgs = parse_args(arguments)?;
    let outcome = orchestrator
        .schedule_release(&args.release_id, &args.publish_at)
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
struct ReleaseActionArgs {
    release_id: String,
    action: ReleaseActionKind,
}

async fn handle_release_action(orchestrator: &Orchestrator, arguments: Value) -> Result<Value> {
    let args: ReleaseActionArgs = parse_args(arguments)?;
    if args.action == ReleaseActionKind::Schedule {
        return Err(Error::InvalidArgument(
            "use schedule_release to schedule a release".to_string(),
        ));
    }
    let outcome = orchestrator
        .release_action(args.action, &args.release_id)
        .await?;
    Ok(serde_json::to_value(outcome)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn every_defined_tool_is_routed() {
        let defined: Vec<String> = crate::tools::get_tool_definitions()
            .into_iter()
            .map(|t| t.name)
            .collect();
        assert_eq!(defined.len(), TOOL_NAMES.len());
        for name in TOOL_NAMES {
            assert!(defined.iter().any(|d| d == name), "{name} has no definition");
        }
    }

    #[test]
    fn null_arguments_parse_as_empty() {
        let args: ListReleasesArgs = parse_args(Value::Null).unwrap();
        assert!(args.state.is_none());
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = parse_args::<GetDocumentArgs>(json!({"documentId": "a", "extra": 1})).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[rstest]
    #[case(json!({"documentId": "a"}), ReleaseOverride::Unspecified)]
    #[case(json!({"documentId": "a", "releaseId": false}), ReleaseOverride::Published)]
    #[case(json!({"documentId": "a", "releaseId": "spring"}), ReleaseOverride::Release("spring".to_string()))]
    fn release_argument_maps_to_override(#[case] arguments: Value, #[case] expected: ReleaseOverride) {
        let args: PatchDocumentArgs = parse_args(arguments).unwrap();
        assert_eq!(release_override(args.release_id).unwrap(), expected);
    }

    #[test]
    fn release_argument_true_is_rejected() {
        let args: PatchDocumentArgs =
            parse_args(json!({"documentId": "a", "releaseId": true})).unwrap();
        assert!(release_override(args.release_id).is_err());
    }
}
