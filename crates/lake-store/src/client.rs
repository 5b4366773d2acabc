//! [`ContentStore`] over the vendor HTTP data API

use std::time::Duration;

use async_trait::async_trait;
use lake_core::action::Action;
use lake_core::{ActionResponse, ContentStore, DatasetInfo};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{Map, Value, json};
use tracing::{debug, warn};

use crate::config::StoreConfig;
use crate::{Error, Result};

/// Longest response body kept in error messages
const ERROR_BODY_LIMIT: usize = 500;

/// HTTP client for one project dataset
pub struct HttpStore {
    http: Client,
    config: StoreConfig,
    base_url: String,
}

impl HttpStore {
    /// Build a client after validating `config`
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("lake-mcp/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let base_url = config.base_url();
        Ok(Self {
            http,
            config,
            base_url,
        })
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    fn dataset_url(&self, endpoint: &str) -> String {
        format!("{}/data/{}/{}", self.base_url, endpoint, self.config.dataset)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        match &self.config.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(&self, builder: RequestBuilder) -> Result<(StatusCode, String)> {
        let response = self.authorized(builder).send().await?;
        let status = response.status();
        let body = response.text().await?;
        Ok((status, body))
    }

    async fn send_json(&self, builder: RequestBuilder) -> Result<Value> {
        let (status, body) = self.send(builder).await?;
        if !status.is_success() {
            return Err(status_error(status, &body));
        }
        Ok(serde_json::from_str(&body)?)
    }

    async fn mutate(&self, mutation: Value) -> Result<Value> {
        let url = self.dataset_url("mutate");
        let builder = self
            .http
            .post(&url)
            .query(&[("returnDocuments", "true")])
            .json(&json!({ "mutations": [mutation] }));
        self.send_json(builder).await
    }
}

#[async_trait]
impl ContentStore for HttpStore {
    async fn fetch(&self, query: &str, params: &Map<String, Value>) -> lake_core::Result<Value> {
        let url = self.dataset_url("query");
        debug!(%query, "Running query");
        let builder = self.http.get(&url).query(&query_params(query, params)?);
        let body = self.send_json(builder).await?;
        Ok(body.get("result").cloned().unwrap_or(Value::Null))
    }

    async fn get_document(&self, id: &str) -> lake_core::Result<Option<Value>> {
        let url = format!("{}/{}", self.dataset_url("doc"), id);
        let (status, body) = self.send(self.http.get(&url)).await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(status_error(status, &body).into());
        }
        let body: Value = serde_json::from_str(&body)?;
        Ok(first_document(body)?)
    }

    async fn create(&self, document: Value) -> lake_core::Result<Value> {
        let body = self.mutate(json!({ "create": document })).await?;
        Ok(body
            .pointer("/results/0/document")
            .cloned()
            .unwrap_or(document))
    }

    async fn delete(&self, id: &str) -> lake_core::Result<()> {
        self.mutate(json!({ "delete": { "id": id } })).await?;
        Ok(())
    }

    async fn submit_actions(&self, actions: &[Action]) -> lake_core::Result<ActionResponse> {
        let url = self.dataset_url("actions");
        let builder = self.http.post(&url).json(&json!({ "actions": actions }));
        let (status, body) = self.send(builder).await?;

        if status.is_success() {
            return Ok(serde_json::from_str(&body)?);
        }
        match rejection(status, &body) {
            Some(rejected) => {
                warn!(%status, "Store rejected action batch");
                Ok(rejected)
            }
            None => Err(status_error(status, &body).into()),
        }
    }

    async fn list_datasets(&self) -> lake_core::Result<Vec<DatasetInfo>> {
        let url = format!("{}/datasets", self.base_url);
        let body = self.send_json(self.http.get(&url)).await?;
        Ok(serde_json::from_value(body)?)
    }
}

/// Query string for the query endpoint; each parameter is JSON-encoded
/// under a `$`-prefixed key
fn query_params(query: &str, params: &Map<String, Value>) -> Result<Vec<(String, String)>> {
    let mut pairs = vec![
        ("query".to_string(), query.to_string()),
        ("perspective".to_string(), "raw".to_string()),
    ];
    for (name, value) in params {
        pairs.push((format!("${name}"), serde_json::to_string(value)?));
    }
    Ok(pairs)
}

/// The doc endpoint wraps results in `{"documents": [...]}`
fn first_document(body: Value) -> Result<Option<Value>> {
    match body {
        Value::Object(mut fields) => match fields.remove("documents") {
            Some(Value::Array(documents)) => Ok(documents.into_iter().next()),
            _ => Err(Error::Response(
                "doc endpoint response has no documents array".to_string(),
            )),
        },
        other => Err(Error::Response(format!(
            "doc endpoint returned {} instead of an object",
            value_kind(&other)
        ))),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// A client-error response carrying a structured store error is a rejection
/// of the batch rather than a transport failure
fn rejection(status: StatusCode, body: &str) -> Option<ActionResponse> {
    if !status.is_client_error() {
        return None;
    }
    match serde_json::from_str::<ActionResponse>(body).ok()? {
        rejected @ ActionResponse::Rejected { .. } => Some(rejected),
        ActionResponse::Committed { .. } => None,
    }
}

fn status_error(status: StatusCode, body: &str) -> Error {
    Error::Status {
        status: status.as_u16(),
        body: body.chars().take(ERROR_BODY_LIMIT).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn query_params_encode_values_as_json() {
        let mut params = Map::new();
        params.insert("type".to_string(), json!("article"));
        params.insert("limit".to_string(), json!(10));

        let pairs = query_params("*[_type == $type][0...$limit]", &params).unwrap();

        assert_eq!(pairs[0].0, "query");
        assert!(pairs.contains(&("$type".to_string(), "\"article\"".to_string())));
        assert!(pairs.contains(&("$limit".to_string(), "10".to_string())));
        assert!(pairs.contains(&("perspective".to_string(), "raw".to_string())));
    }

    #[test]
    fn first_document_unwraps_doc_endpoint() {
        let body = json!({"documents": [{"_id": "a"}, {"_id": "b"}]});
        assert_eq!(first_document(body).unwrap(), Some(json!({"_id": "a"})));
        assert_eq!(first_document(json!({"documents": []})).unwrap(), None);
    }

    #[test]
    fn malformed_doc_response_is_a_response_error() {
        let err = first_document(json!({"result": []})).unwrap_err();
        assert!(matches!(err, Error::Response(_)));

        let err = first_document(json!([{"_id": "a"}])).unwrap_err();
        assert!(err.to_string().contains("an array"));

        let core: lake_core::Error = err.into();
        assert_eq!(core.kind(), "TransportError");
    }

    #[test]
    fn structured_client_error_is_a_rejection() {
        let body = r#"{"error": {"description": "Document already exists", "type": "actionError"}}"#;
        let rejected = rejection(StatusCode::CONFLICT, body).unwrap();
        let ActionResponse::Rejected { error } = rejected else {
            panic!("expected rejection");
        };
        assert_eq!(error.description, "Document already exists");
        assert_eq!(error.kind.as_deref(), Some("actionError"));
    }

    #[test]
    fn server_errors_and_unstructured_bodies_are_not_rejections() {
        let body = r#"{"error": {"description": "boom"}}"#;
        assert!(rejection(StatusCode::INTERNAL_SERVER_ERROR, body).is_none());
        assert!(rejection(StatusCode::BAD_REQUEST, "not json").is_none());
    }

    #[test]
    fn new_rejects_invalid_config() {
        assert!(HttpStore::new(StoreConfig::default()).is_err());
    }

    #[test]
    fn urls_are_built_from_config() {
        let store = HttpStore::new(StoreConfig {
            project_id: "abc123".to_string(),
            dataset: "production".to_string(),
            ..StoreConfig::default()
        })
        .unwrap();
        assert_eq!(
            store.dataset_url("query"),
            "https://abc123.api.sanity.io/v2025-02-19/data/query/production"
        );
    }
}
