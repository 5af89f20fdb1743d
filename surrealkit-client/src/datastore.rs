//! Operations shared by both transports.

use crate::client::Client;
use crate::error::ClientError;
use crate::http::HttpClient;
use crate::response::{CrudResponse, QueryResponse};
use serde_json::Value;

/// The record-level contract common to the WebSocket and HTTP clients.
///
/// `update_one` replaces the record's content on both transports.
#[allow(async_fn_in_trait)]
pub trait Datastore {
    async fn query(&self, sql: &str) -> Result<QueryResponse, ClientError>;
    async fn create(&self, table: &str, data: Value) -> Result<CrudResponse, ClientError>;
    async fn create_with_id(&self, table: &str, id: &str, data: Value) -> Result<CrudResponse, ClientError>;
    async fn select_all(&self, table: &str) -> Result<CrudResponse, ClientError>;
    async fn select_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError>;
    async fn update_one(&self, table: &str, id: &str, data: Value) -> Result<CrudResponse, ClientError>;
    async fn delete_all(&self, table: &str) -> Result<CrudResponse, ClientError>;
    async fn delete_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError>;
}

impl Datastore for Client {
    async fn query(&self, sql: &str) -> Result<QueryResponse, ClientError> {
        Client::query(self, sql).await
    }

    async fn create(&self, table: &str, data: Value) -> Result<CrudResponse, ClientError> {
        Client::create(self, table, data).await
    }

    async fn create_with_id(&self, table: &str, id: &str, data: Value) -> Result<CrudResponse, ClientError> {
        Client::create_with_id(self, table, id, data).await
    }

    async fn select_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        Client::select_all(self, table).await
    }

    async fn select_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        Client::select_one(self, table, id).await
    }

    async fn update_one(&self, table: &str, id: &str, data: Value) -> Result<CrudResponse, ClientError> {
        Client::update_one(self, table, id, data).await
    }

    async fn delete_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        Client::delete_all(self, table).await
    }

    async fn delete_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        Client::delete_one(self, table, id).await
    }
}

impl Datastore for HttpClient {
    async fn query(&self, sql: &str) -> Result<QueryResponse, ClientError> {
        HttpClient::query(self, sql).await
    }

    async fn create(&self, table: &str, data: Value) -> Result<CrudResponse, ClientError> {
        self.create_all(table, &data).await
    }

    async fn create_with_id(&self, table: &str, id: &str, data: Value) -> Result<CrudResponse, ClientError> {
        self.create_one(table, id, &data).await
    }

    async fn select_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        HttpClient::select_all(self, table).await
    }

    async fn select_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        HttpClient::select_one(self, table, id).await
    }

    async fn update_one(&self, table: &str, id: &str, data: Value) -> Result<CrudResponse, ClientError> {
        self.replace_one(table, id, &data).await
    }

    async fn delete_all(&self, table: &str) -> Result<CrudResponse, ClientError> {
        HttpClient::delete_all(self, table).await
    }

    async fn delete_one(&self, table: &str, id: &str) -> Result<CrudResponse, ClientError> {
        HttpClient::delete_one(self, table, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionConfig;
    use crate::http::HttpConfig;
    use crate::testing::serve_http_once;
    use serde_json::json;

    async fn count_rows<D: Datastore>(store: &D, table: &str) -> Result<usize, ClientError> {
        Ok(store.select_all(table).await?.len())
    }

    #[tokio::test]
    async fn test_generic_over_http() {
        let (url, _server) = serve_http_once(
            200,
            r#"[{"status":"OK","time":"1ms","result":[{"id":"t:1"},{"id":"t:2"}]}]"#,
        )
        .await;
        let client = HttpClient::new(HttpConfig::new(url)).unwrap();
        assert_eq!(count_rows(&client, "t").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_update_one_replaces_over_http() {
        let (url, server) = serve_http_once(
            200,
            r#"[{"status":"OK","time":"1ms","result":[{"id":"t:1","a":1}]}]"#,
        )
        .await;
        let client = HttpClient::new(HttpConfig::new(url)).unwrap();
        Datastore::update_one(&client, "t", "1", json!({"a": 1}))
            .await
            .unwrap();

        let request = server.await.unwrap();
        assert!(request.starts_with("PUT /key/t/1 HTTP/1.1"));
        assert!(request.ends_with(r#"{"a":1}"#));
    }

    #[test]
    fn test_client_is_a_datastore() {
        fn assert_datastore<D: Datastore>(_: &D) {}
        assert_datastore(&Client::new(ConnectionConfig::new("ws://127.0.0.1:8000/rpc")));
    }
}
