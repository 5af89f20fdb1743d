//! Stateless client over the HTTP endpoints.
//!
//! Every call carries the namespace, database and credentials; there is no
//! handshake and no correlation.

use crate::connection::Session;
use crate::error::ClientError;
use crate::response::{CrudResponse, QueryResponse};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde_json::Value;
use std::time::Duration;
use surrealkit_protocol::{HttpErrorBody, StatementResult, KEY_PATH, SQL_PATH};

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Server root, e.g. `http://127.0.0.1:8000`.
    pub base_url: String,
    pub session: Session,
    /// Bounds each request. `None` waits until the server answers.
    pub timeout: Option<Duration>,
}

impl HttpConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session: Session::default(),
            timeout: Some(Duration::from_secs(30)),
        }
    }

    pub fn with_namespace(mut self, namespace: impl Into<String>, database: impl Into<String>) -> Self {
        self.session.namespace = namespace.into();
        self.session.database = database.into();
        self
    }

    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.session.username = username.into();
        self.session.password = password.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Stateless HTTP client for SurrealDB.
pub struct HttpClient {
    http: reqwest::Client,
    config: HttpConfig,
}

impl HttpClient {
    pub fn new(config: HttpConfig) -> Result<Self, ClientError> {
        if !(config.base_url.starts_with("http://") || config.base_url.starts_with("https://")) {
            return Err(ClientError::InvalidUrl(config.base_url));
        }
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder.build()?;
        Ok(Self { http, config })
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn send(
        &self,
        method: reqwest::Method,
        path: &str,
        body: Option<String>,
    ) -> Result<Vec<StatementResult>, ClientError> {
        let url = format!("{}{}", self.config.base_url, path);
        let session = &self.config.session;
        tracing::debug!(%method, %url, "sending HTTP request");

        let mut request = self
            .http
            .request(method, &url)
            .header(ACCEPT, "application/json")
            .header("NS", &session.namespace)
            .header("DB", &session.database)
            .basic_auth(&session.username, Some(&session.password));
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request.send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        tracing::debug!(status, bytes = text.len(), "HTTP response received");

        parse_envelope(status, &text)
    }

    async fn crud(
        &self,
        method: reqwest::Method,
        table: &str,
        id: Option<&str>,
        data: Option<&Value>,
    ) -> Result<CrudResponse, ClientError> {
        let body = data.map(serde_json::to_string).transpose()?;
        let statements = self.send(method, &key_path(table, id), body).await?;
        let first = statements
            .into_iter()
            .next()
            .ok_or_else(|| ClientError::InvalidEnvelope("no statement results".to_string()))?;
        CrudResponse::from_raw(first.result)
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Runs raw SurrealQL. The statement envelopes are passed through.
    pub async fn query(&self, sql: &str) -> Result<QueryResponse, ClientError> {
        let statements = self
            .send(reqwest::Method::POST, SQL_PATH, Some(sql.to_string()))
            .await?;
        Ok(QueryResponse::from_raw(Some(serde_json::to_value(statements)?)))
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Creates a record with a generated id.
    pub async fn create_all(&self, table: &str, data: &Value) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::POST, table, None, Some(data)).await
    }

    pub async fn create_one(&self, table: &str, id: &str, data: &Value) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::POST, table, Some(id), Some(data))
            .await
    }

    pub async fn select_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::GET, table, None, None).await
    }

    pub async fn select_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::GET, table, Some(id), None).await
    }

    /// Replaces the content of `table:id`.
    pub async fn replace_one(&self, table: &str, id: &str, data: &Value) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::PUT, table, Some(id), Some(data))
            .await
    }

    /// Merges `data` into `table:id`, creating it if missing.
    pub async fn upsert_one(&self, table: &str, id: &str, data: &Value) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::PATCH, table, Some(id), Some(data))
            .await
    }

    pub async fn delete_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::DELETE, table, None, None).await
    }

    pub async fn delete_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        self.crud(reqwest::Method::DELETE, table, Some(id), None)
            .await
    }
}

/// Path of the record endpoint for `table` or `table/id`.
pub fn key_path(table: &str, id: Option<&str>) -> String {
    match id {
        Some(id) if !id.is_empty() => format!("{}/{}/{}", KEY_PATH, table, id),
        _ => format!("{}/{}", KEY_PATH, table),
    }
}

/// Checks an HTTP response body.
///
/// A valid body is an array of statement envelopes. An error object becomes
/// [`ClientError::Surreal`]; anything else is an invalid envelope.
pub fn parse_envelope(status: u16, body: &str) -> Result<Vec<StatementResult>, ClientError> {
    let invalid = || ClientError::InvalidEnvelope(format!("HTTP {}: {}", status, body));

    let value: Value = serde_json::from_str(body).map_err(|_| invalid())?;
    match value {
        Value::Array(_) => serde_json::from_value(value).map_err(|_| invalid()),
        Value::Object(ref map) if map.contains_key("code") => {
            let error: HttpErrorBody = serde_json::from_value(value).map_err(|_| invalid())?;
            tracing::debug!(code = error.code, details = %error.details, "server reported an error");
            Err(ClientError::Surreal {
                code: error.code,
                details: error.details,
                description: error.description,
            })
        }
        _ => Err(invalid()),
    }
}
