//! High-level client API over the WebSocket transport.

use crate::connection::{Connection, ConnectionConfig, Session};
use crate::error::ClientError;
use crate::response::{shape, CrudResponse, PatchResponse, QueryResponse, TypedResponse};
use crate::state::{ConnectionState, Readiness};
use serde_json::{json, Value};
use std::sync::Arc;
use surrealkit_protocol::{target, Method, Patch, RpcError};

/// High-level client for SurrealDB.
pub struct Client {
    conn: Arc<Connection>,
}

impl Client {
    /// Creates a new client with the given configuration.
    pub fn new(config: ConnectionConfig) -> Self {
        Self {
            conn: Arc::new(Connection::new(config)),
        }
    }

    /// Opens the socket and sends the handshake.
    ///
    /// Optional: the first command connects on its own.
    pub async fn connect(&self) -> Result<(), ClientError> {
        self.conn.connect().await
    }

    pub async fn reconnect(&self) -> Result<(), ClientError> {
        self.conn.reconnect().await
    }

    /// Closes the connection.
    pub async fn close(&self) -> Result<(), ClientError> {
        self.conn.close().await
    }

    pub fn state(&self) -> ConnectionState {
        self.conn.state()
    }

    pub fn readiness(&self) -> Readiness {
        self.conn.readiness()
    }

    /// Returns whether commands are transmitted immediately.
    pub fn is_ready(&self) -> bool {
        self.conn.is_ready()
    }

    pub fn session(&self) -> Session {
        self.conn.session()
    }

    /// Returns the error the server rejected `signin` or `use` with, if any.
    pub fn handshake_error(&self) -> Option<RpcError> {
        self.conn.handshake_error()
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> Arc<Connection> {
        self.conn.clone()
    }

    /// Changes credentials, re-authenticating if connected.
    pub async fn signin(&self, username: &str, password: &str) -> Result<(), ClientError> {
        self.conn.signin(username, password).await
    }

    /// Changes namespace and database, re-selecting if connected.
    pub async fn use_ns(&self, namespace: &str, database: &str) -> Result<(), ClientError> {
        self.conn.use_ns(namespace, database).await
    }

    // =========================================================================
    // Helper methods
    // =========================================================================

    async fn request(&self, method: Method, params: Vec<Value>) -> Result<Value, ClientError> {
        self.conn.request(method, params).await
    }

    async fn crud(&self, method: Method, params: Vec<Value>) -> Result<CrudResponse, ClientError> {
        let raw = self.request(method, params).await?;
        CrudResponse::from_raw(raw)
    }

    /// Sends any method and shapes the result by its response kind.
    pub async fn send(&self, method: Method, params: Vec<Value>) -> Result<TypedResponse, ClientError> {
        let raw = self.request(method, params).await?;
        shape(method.response_kind(), Some(raw))
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Runs raw SurrealQL. The result is passed through unchanged.
    pub async fn query(&self, sql: &str) -> Result<QueryResponse, ClientError> {
        let raw = self.request(Method::Query, vec![json!(sql)]).await?;
        Ok(QueryResponse::from_raw(Some(raw)))
    }

    /// Runs raw SurrealQL with bound variables.
    pub async fn query_with_vars(&self, sql: &str, vars: Value) -> Result<QueryResponse, ClientError> {
        let raw = self.request(Method::Query, vec![json!(sql), vars]).await?;
        Ok(QueryResponse::from_raw(Some(raw)))
    }

    // =========================================================================
    // Record operations
    // =========================================================================

    /// Creates a record with a server-generated id.
    pub async fn create(&self, table: &str, data: Value) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Create, vec![json!(table), data]).await
    }

    /// Creates a record at `table:id`.
    pub async fn create_with_id(
        &self,
        table: &str,
        id: &str,
        data: Value,
    ) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Create, vec![json!(target(table, Some(id))), data])
            .await
    }

    pub async fn select_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Select, vec![json!(table)]).await
    }

    pub async fn select_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Select, vec![json!(target(table, Some(id)))])
            .await
    }

    /// Replaces the content of `table:id`.
    pub async fn update_one(
        &self,
        table: &str,
        id: &str,
        data: Value,
    ) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Update, vec![json!(target(table, Some(id))), data])
            .await
    }

    /// Replaces the content of every record in `table`.
    pub async fn update_all(&self, table: &str, data: Value) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Update, vec![json!(table), data]).await
    }

    /// Applies JSON-Patch operations to `table:id`.
    pub async fn modify_one(
        &self,
        table: &str,
        id: &str,
        patches: &[Patch],
    ) -> Result<PatchResponse, ClientError> {
        let raw = self
            .request(
                Method::Modify,
                vec![json!(target(table, Some(id))), serde_json::to_value(patches)?],
            )
            .await?;
        Ok(PatchResponse::from_raw(raw))
    }

    /// Applies JSON-Patch operations to every record in `table`.
    pub async fn modify_all(&self, table: &str, patches: &[Patch]) -> Result<PatchResponse, ClientError> {
        let raw = self
            .request(Method::Modify, vec![json!(table), serde_json::to_value(patches)?])
            .await?;
        Ok(PatchResponse::from_raw(raw))
    }

    pub async fn delete_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Delete, vec![json!(table)]).await
    }

    pub async fn delete_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        self.crud(Method::Delete, vec![json!(target(table, Some(id)))])
            .await
    }
}
