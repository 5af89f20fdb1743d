//! Command execution.

use colored::Colorize;
use serde_json::Value;
use surrealkit_client::{Client, CrudResponse, Datastore, HttpClient, Patch, PatchResponse, QueryResponse};

/// The transport commands run against.
pub enum Backend {
    Rpc(Client),
    Http(HttpClient),
}

impl Backend {
    /// Short description for banners.
    pub fn describe(&self) -> String {
        match self {
            Backend::Rpc(client) => client.connection().config().url.clone(),
            Backend::Http(client) => client.config().base_url.clone(),
        }
    }

    pub async fn close(&self) {
        if let Backend::Rpc(client) = self {
            if let Err(e) = client.close().await {
                tracing::debug!(error = %e, "error while closing");
            }
        }
    }
}

/// A record target: `table` or `table:id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub table: String,
    pub id: Option<String>,
}

impl Target {
    /// Splits on the first `:`. An empty id means the whole table.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let (table, id) = match raw.split_once(':') {
            Some((table, id)) => (table, Some(id)),
            None => (raw, None),
        };
        if table.is_empty() {
            return Err(format!("invalid target '{}': missing table", raw));
        }
        Ok(Self {
            table: table.to_string(),
            id: id.filter(|id| !id.is_empty()).map(str::to_string),
        })
    }
}

/// One operation to run.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Query { sql: String },
    Create { target: Target, data: Value },
    Select { target: Target },
    Update { target: Target, data: Value },
    Modify { target: Target, patches: Vec<Patch> },
    Delete { target: Target },
}

/// Executes an action and returns the formatted output.
pub async fn execute(backend: &Backend, action: Action) -> Result<String, Box<dyn std::error::Error>> {
    match (backend, action) {
        (Backend::Rpc(client), Action::Modify { target, patches }) => {
            let response = match target.id {
                Some(id) => client.modify_one(&target.table, &id, &patches).await?,
                None => client.modify_all(&target.table, &patches).await?,
            };
            format_patch(&response)
        }
        (
            Backend::Rpc(client),
            Action::Update {
                target: Target { table, id: None },
                data,
            },
        ) => format_crud(&client.update_all(&table, data).await?),
        (Backend::Http(_), Action::Modify { .. }) => {
            Err("modify is only available over the RPC transport".into())
        }
        (
            Backend::Http(_),
            Action::Update {
                target: Target { id: None, .. },
                ..
            },
        ) => Err("updating a whole table is only available over the RPC transport".into()),
        (Backend::Rpc(client), action) => execute_on(client, action).await,
        (Backend::Http(client), action) => execute_on(client, action).await,
    }
}

async fn execute_on<D: Datastore>(
    store: &D,
    action: Action,
) -> Result<String, Box<dyn std::error::Error>> {
    match action {
        Action::Query { sql } => Ok(format_query(&store.query(&sql).await?)),
        Action::Create { target, data } => {
            let response = match target.id {
                Some(id) => store.create_with_id(&target.table, &id, data).await?,
                None => store.create(&target.table, data).await?,
            };
            format_crud(&response)
        }
        Action::Select { target } => {
            let response = match target.id {
                Some(id) => store.select_one(&target.table, &id).await?,
                None => store.select_all(&target.table).await?,
            };
            format_crud(&response)
        }
        Action::Update {
            target: Target {
                table,
                id: Some(id),
            },
            data,
        } => format_crud(&store.update_one(&table, &id, data).await?),
        Action::Delete { target } => {
            let response = match target.id {
                Some(id) => store.delete_one(&target.table, &id).await?,
                None => store.delete_all(&target.table).await?,
            };
            let count = response.len();
            Ok(format!(
                "{} {} record(s) from {}",
                "Deleted".green(),
                count,
                target.table.cyan()
            ))
        }
        Action::Update { .. } | Action::Modify { .. } => {
            Err("operation not supported by this transport".into())
        }
    }
}

/// Parses a JSON argument (either inline JSON or @file.json).
pub fn parse_json_arg(arg: &str) -> Result<Value, Box<dyn std::error::Error>> {
    if let Some(path) = arg.strip_prefix('@') {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    } else {
        Ok(serde_json::from_str(arg)?)
    }
}

/// Parses a JSON-Patch argument: one operation or an array of them.
pub fn parse_patches_arg(arg: &str) -> Result<Vec<Patch>, Box<dyn std::error::Error>> {
    match parse_json_arg(arg)? {
        Value::Array(items) => Ok(items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()?),
        single => Ok(vec![serde_json::from_value(single)?]),
    }
}

/// Reads a query argument (inline SurrealQL or @file.surql).
pub fn parse_sql_arg(arg: &str) -> Result<String, Box<dyn std::error::Error>> {
    match arg.strip_prefix('@') {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => Ok(arg.to_string()),
    }
}

fn format_query(response: &QueryResponse) -> String {
    match response.result() {
        Some(result) => format_json(result),
        None => "(no result)".dimmed().to_string(),
    }
}

fn format_crud(response: &CrudResponse) -> Result<String, Box<dyn std::error::Error>> {
    if response.no_data() {
        return Ok("No records".yellow().to_string());
    }
    let table = response.table().unwrap_or("?");
    Ok(format!(
        "{}\n{}",
        format!("{} ({} record(s))", table.cyan(), response.len()).bold(),
        format_json(&serde_json::to_value(response.data())?)
    ))
}

fn format_patch(response: &PatchResponse) -> Result<String, Box<dyn std::error::Error>> {
    if response.is_unchanged() {
        return Ok("No changes".yellow().to_string());
    }
    Ok(format_json(&serde_json::to_value(response.diffs())?))
}

/// Formats JSON for display.
pub fn format_json(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use surrealkit_client::{ConnectionConfig, HttpConfig};

    #[test]
    fn test_target_parse() {
        assert_eq!(
            Target::parse("person").unwrap(),
            Target {
                table: "person".into(),
                id: None
            }
        );
        assert_eq!(
            Target::parse("person:tobie").unwrap(),
            Target {
                table: "person".into(),
                id: Some("tobie".into())
            }
        );
        assert_eq!(Target::parse("person:").unwrap().id, None);
        assert_eq!(Target::parse("a:b:c").unwrap().id.as_deref(), Some("b:c"));
        assert!(Target::parse(":x").is_err());
    }

    #[test]
    fn test_parse_json_arg_inline_and_file() {
        assert_eq!(parse_json_arg(r#"{"a":1}"#).unwrap(), json!({"a": 1}));

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"[1, 2, 3]"#).unwrap();
        let arg = format!("@{}", file.path().display());
        assert_eq!(parse_json_arg(&arg).unwrap(), json!([1, 2, 3]));

        assert!(parse_json_arg("{oops").is_err());
        assert!(parse_json_arg("@/nonexistent/file.json").is_err());
    }

    #[test]
    fn test_parse_patches_arg() {
        let patches =
            parse_patches_arg(r#"[{"op":"replace","path":"/a","value":1},{"op":"remove","path":"/b"}]"#)
                .unwrap();
        assert_eq!(
            patches,
            vec![Patch::replace("/a", json!(1)), Patch::remove("/b")]
        );

        let single = parse_patches_arg(r#"{"op":"add","path":"/c","value":true}"#).unwrap();
        assert_eq!(single, vec![Patch::add("/c", json!(true))]);

        assert!(parse_patches_arg(r#"{"op":"move","path":"/a"}"#).is_err());
    }

    #[test]
    fn test_parse_sql_arg() {
        assert_eq!(parse_sql_arg("SELECT * FROM t").unwrap(), "SELECT * FROM t");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "INFO FOR DB;").unwrap();
        let arg = format!("@{}", file.path().display());
        assert_eq!(parse_sql_arg(&arg).unwrap(), "INFO FOR DB;");
    }

    #[test]
    fn test_format_crud() {
        colored::control::set_override(false);
        let empty = CrudResponse::from_raw(Value::Null).unwrap();
        assert_eq!(format_crud(&empty).unwrap(), "No records");

        let one = CrudResponse::from_raw(json!([{"id": "t:1", "a": 1}])).unwrap();
        let output = format_crud(&one).unwrap();
        assert!(output.starts_with("t (1 record(s))"));
        assert!(output.contains(r#""id": "1""#));
    }

    #[test]
    fn test_format_patch() {
        colored::control::set_override(false);
        let unchanged = PatchResponse::from_raw(json!([[null]]));
        assert_eq!(format_patch(&unchanged).unwrap(), "No changes");
    }

    #[tokio::test]
    async fn test_http_rejects_rpc_only_actions() {
        let backend = Backend::Http(HttpClient::new(HttpConfig::new("http://127.0.0.1:1")).unwrap());
        let target = Target::parse("t").unwrap();

        let modify = Action::Modify {
            target: target.clone(),
            patches: vec![Patch::remove("/a")],
        };
        assert!(execute(&backend, modify).await.is_err());

        let update_all = Action::Update {
            target,
            data: json!({}),
        };
        assert!(execute(&backend, update_all).await.is_err());
    }

    #[test]
    fn test_describe() {
        let backend = Backend::Rpc(Client::new(ConnectionConfig::new("ws://db:8000/rpc")));
        assert_eq!(backend.describe(), "ws://db:8000/rpc");
    }
}
