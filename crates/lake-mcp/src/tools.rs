//! MCP tool catalogue
//!
//! # Tool Categories
//!
//! ## Context
//! - `get_initial_context` - Load project context; required before any other tool
//!
//! ## Reading
//! - `query_documents` - Run a query against the dataset
//! - `get_document` - Fetch one document by id
//! - `list_datasets` - List datasets in the project
//!
//! ## Documents
//! - `create_documents`, `patch_document`, `publish_documents`,
//!   `unpublish_documents`, `discard_drafts`, `delete_documents`
//!
//! ## Versions
//! - `create_version`, `version_replace_document`, `version_discard`,
//!   `version_unpublish_document`
//!
//! ## Releases
//! - `list_releases`, `create_release`, `edit_release`, `schedule_release`,
//!   `release_action`

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Tool definition for MCP protocol
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// Result from a tool invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub content: Vec<ToolContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// Content types for tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ToolContent {
    #[serde(rename = "text")]
    Text { text: String },
}

impl ToolResult {
    /// Create a successful text result
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: content.into(),
            }],
            is_error: None,
        }
    }

    /// Create an error result whose text is `{"error": {"kind", "message"}}`
    pub fn failure(kind: &str, message: impl Into<String>) -> Self {
        let payload = json!({
            "error": {
                "kind": kind,
                "message": message.into(),
            }
        });
        Self::error(payload.to_string())
    }

    /// Create an error result
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: Some(true),
        }
    }
}

fn tool(name: &str, description: &str, input_schema: Value) -> ToolDefinition {
    ToolDefinition {
        name: name.to_string(),
        description: description.to_string(),
        input_schema,
    }
}

fn document_ids_schema(description: &str) -> Value {
    json!({
        "type": "array",
        "items": { "type": "string" },
        "minItems": 1,
        "description": description
    })
}

/// Get all available tool definitions
pub fn get_tool_definitions() -> Vec<ToolDefinition> {
    vec![
        // Context
        tool(
            "get_initial_context",
            "Load project context (datasets, active releases, usage notes). Must be called once before any other tool.",
            json!({ "type": "object", "properties": {} }),
        ),
        // Reading
        tool(
            "query_documents",
            "Run a query against the dataset and return its result",
            json!({
                "type": "object",
                "properties": {
                    "query": { "type": "string", "description": "Query text" },
                    "params": { "type": "object", "description": "Query parameters, referenced as $name" }
                },
                "required": ["query"]
            }),
        ),
        tool(
            "get_document",
            "Fetch a single document by exact id (published, drafts.<id> or versions.<release>.<id>)",
            json!({
                "type": "object",
                "properties": {
                    "documentId": { "type": "string" }
                },
                "required": ["documentId"]
            }),
        ),
        tool(
            "list_datasets",
            "List the datasets in the project",
            json!({ "type": "object", "properties": {} }),
        ),
        // Documents
        tool(
            "create_documents",
            "Create documents as drafts, or directly as versions when releaseId is given",
            json!({
                "type": "object",
                "properties": {
                    "documents": {
                        "type": "array",
                        "items": { "type": "object" },
                        "minItems": 1,
                        "description": "Documents; each needs a _type, _id is generated when missing"
                    },
                    "releaseId": { "type": "string", "description": "Create the documents inside this release" },
                    "ifExists": {
                        "type": "string",
                        "enum": ["fail", "ignore"],
                        "description": "What to do when the document already exists"
                    }
                },
                "required": ["documents"]
            }),
        ),
        tool(
            "patch_document",
            "Apply set / setIfMissing / unset operations to a document's draft or version",
            json!({
                "type": "object",
                "properties": {
                    "documentId": { "type": "string" },
                    "releaseId": {
                        "type": ["string", "boolean"],
                        "description": "Release whose version to edit, or false to force the published/draft target"
                    },
                    "set": { "type": "object" },
                    "setIfMissing": { "type": "object" },
                    "unset": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["documentId"]
            }),
        ),
        tool(
            "publish_documents",
            "Publish the drafts of the given documents",
            json!({
                "type": "object",
                "properties": { "documentIds": document_ids_schema("Documents to publish") },
                "required": ["documentIds"]
            }),
        ),
        tool(
            "unpublish_documents",
            "Unpublish documents, keeping their content as drafts",
            json!({
                "type": "object",
                "properties": { "documentIds": document_ids_schema("Documents to unpublish") },
                "required": ["documentIds"]
            }),
        ),
        tool(
            "discard_drafts",
            "Discard the drafts of the given documents",
            json!({
                "type": "object",
                "properties": {
                    "documentIds": document_ids_schema("Documents whose drafts to discard"),
                    "purge": { "type": "boolean" }
                },
                "required": ["documentIds"]
            }),
        ),
        tool(
            "delete_documents",
            "Delete documents, optionally together with their drafts",
            json!({
                "type": "object",
                "properties": {
                    "documentIds": document_ids_schema("Documents to delete"),
                    "includeDrafts": { "type": "boolean" }
                },
                "required": ["documentIds"]
            }),
        ),
        // Versions
        tool(
            "create_version",
            "Add documents to a release by snapshotting their current content as versions",
            json!({
                "type": "object",
                "properties": {
                    "releaseId": { "type": "string" },
                    "documentIds": document_ids_schema("Documents to add to the release")
                },
                "required": ["releaseId", "documentIds"]
            }),
        ),
        tool(
            "version_replace_document",
            "Replace a version's content with the content of another document",
            json!({
                "type": "object",
                "properties": {
                    "documentId": { "type": "string", "description": "Version id, or document id together with releaseId" },
                    "releaseId": { "type": "string" },
                    "sourceDocumentId": { "type": "string" }
                },
                "required": ["documentId", "sourceDocumentId"]
            }),
        ),
        tool(
            "version_discard",
            "Remove a document's version from a release",
            json!({
                "type": "object",
                "properties": {
                    "documentId": { "type": "string", "description": "Version id, or document id together with releaseId" },
                    "releaseId": { "type": "string" },
                    "purge": { "type": "boolean" }
                },
                "required": ["documentId"]
            }),
        ),
        tool(
            "version_unpublish_document",
            "Mark documents to be unpublished when the release is published",
            json!({
                "type": "object",
                "properties": {
                    "releaseId": { "type": "string" },
                    "documentIds": document_ids_schema("Documents to unpublish with the release")
                },
                "required": ["releaseId", "documentIds"]
            }),
        ),
        // Releases
        tool(
            "list_releases",
            "List releases, optionally only those in one state",
            json!({
                "type": "object",
                "properties": {
                    "state": {
                        "type": "string",
                        "enum": ["active", "scheduled", "published", "archived", "deleted"]
                    }
                }
            }),
        ),
        tool(
            "create_release",
            "Create a release, optionally adding documents to it",
            json!({
                "type": "object",
                "properties": {
                    "releaseId": { "type": "string", "description": "Generated when omitted" },
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "releaseType": { "type": "string", "enum": ["asap", "undecided", "scheduled"] },
                    "intendedPublishAt": {
                        "type": "string",
                        "description": "ISO-8601 or natural language, e.g. 'tomorrow at noon'; required for scheduled releases"
                    },
                    "documentIds": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["title", "releaseType"]
            }),
        ),
        tool(
            "edit_release",
            "Change release metadata",
            json!({
                "type": "object",
                "properties": {
                    "releaseId": { "type": "string" },
                    "title": { "type": "string" },
                    "description": { "type": "string" },
                    "releaseType": { "type": "string", "enum": ["asap", "undecided", "scheduled"] },
                    "intendedPublishAt": { "type": "string" }
                },
                "required": ["releaseId"]
            }),
        ),
        tool(
            "schedule_release",
            "Schedule a release to be published at a future time",
            json!({
                "type": "object",
                "properties": {
                    "releaseId": { "type": "string" },
                    "publishAt": {
                        "type": "string",
                        "description": "ISO-8601 or natural language, e.g. 'next friday at 9am'"
                    }
                },
                "required": ["releaseId", "publishAt"]
            }),
        ),
        tool(
            "release_action",
            "Publish, archive, unarchive, unschedule or delete a release",
            json!({
                "type": "object",
                "properties": {
                    "releaseId": { "type": "string" },
                    "action": {
                        "type": "string",
                        "enum": ["publish", "archive", "unarchive", "unschedule", "delete"]
                    }
                },
                "required": ["releaseId", "action"]
            }),
        ),
    ]
}
