//! Interactive REPL.

use crate::commands::{self, parse_patches_arg, Action, Backend, Target};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::history::DefaultHistory;
use rustyline::{Config, Editor};
use serde_json::{json, Value};

const HELP_TEXT: &str = r#"
Available commands:
  help                            Show this help
  status                          Show connection state

  query <surrealql>               Run a query (alias: sql)
  create <table[:id]> [json]      Create a record
  select <table[:id]>             Select one record or a whole table
  update <table[:id]> <json>      Replace record content
  modify <table[:id]> <patches>   Apply JSON-Patch operations
  delete <table[:id]>             Delete one record or a whole table

  use <namespace> <database>      Switch namespace and database
  signin <user> <pass>            Sign in with other credentials

  quit, exit                      Exit the REPL
"#;

/// A parsed REPL line.
#[derive(Debug, PartialEq)]
enum ReplCommand {
    Help,
    Quit,
    Status,
    Use { namespace: String, database: String },
    Signin { username: String, password: String },
    Run(Action),
}

pub async fn run(backend: Backend) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", "surrealkit".bold().cyan());
    println!("Connecting to {}...", backend.describe());

    if let Backend::Rpc(client) = &backend {
        client.connect().await?;
        println!("{}", "Connected!".green());
    }

    // Create readline editor
    let config = Config::builder()
        .history_ignore_space(true)
        .auto_add_history(true)
        .build();
    let mut rl: Editor<(), DefaultHistory> = Editor::with_config(config)?;

    // Load history
    let history_path = std::env::var("HOME")
        .map(|h| std::path::PathBuf::from(h).join(".surrealkit_history"))
        .unwrap_or_else(|_| ".surrealkit_history".into());
    let _ = rl.load_history(&history_path);

    println!("Type 'help' for available commands.\n");

    loop {
        let prompt = format!("{} ", "surreal>".cyan());
        match rl.readline(&prompt) {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                match execute_repl_command(&backend, line).await {
                    Ok(Some(output)) => println!("{}\n", output),
                    Ok(None) => break,
                    Err(e) => println!("{}: {}\n", "Error".red(), e),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!("^D");
                break;
            }
            Err(err) => {
                println!("{}: {:?}", "Error".red(), err);
                break;
            }
        }
    }

    let _ = rl.save_history(&history_path);

    backend.close().await;
    println!("{}", "Disconnected.".dimmed());

    Ok(())
}

async fn execute_repl_command(
    backend: &Backend,
    line: &str,
) -> Result<Option<String>, Box<dyn std::error::Error>> {
    let command = match parse_line(line) {
        Ok(command) => command,
        Err(usage) => return Ok(Some(usage)),
    };

    match command {
        ReplCommand::Help => Ok(Some(HELP_TEXT.to_string())),
        ReplCommand::Quit => Ok(None),
        ReplCommand::Status => Ok(Some(status(backend))),
        ReplCommand::Use {
            namespace,
            database,
        } => match backend {
            Backend::Rpc(client) => {
                client.use_ns(&namespace, &database).await?;
                Ok(Some(format!(
                    "{} {}/{}",
                    "Using".green(),
                    namespace.cyan(),
                    database.cyan()
                )))
            }
            Backend::Http(_) => Ok(Some(
                "use is only available over the RPC transport".yellow().to_string(),
            )),
        },
        ReplCommand::Signin { username, password } => match backend {
            Backend::Rpc(client) => {
                client.signin(&username, &password).await?;
                Ok(Some(format!("{} as {}", "Signed in".green(), username.cyan())))
            }
            Backend::Http(_) => Ok(Some(
                "signin is only available over the RPC transport".yellow().to_string(),
            )),
        },
        ReplCommand::Run(action) => Ok(Some(commands::execute(backend, action).await?)),
    }
}

fn status(backend: &Backend) -> String {
    match backend {
        Backend::Rpc(client) => {
            let readiness = client.readiness();
            let session = client.session();
            let mut status = format!(
                "State: {:?}\n  Authenticated: {}\n  Namespace selected: {}\n  Session: {}/{} as {}",
                readiness.state,
                readiness.authenticated,
                readiness.namespace_selected,
                session.namespace,
                session.database,
                session.username
            );
            if let Some(error) = client.handshake_error() {
                status.push_str(&format!("\n  Handshake error: {}", error.to_string().red()));
            }
            status
        }
        Backend::Http(client) => format!("Stateless HTTP client for {}", client.config().base_url),
    }
}

/// Splits off the first word.
fn split_word(input: &str) -> (&str, &str) {
    match input.trim().split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (input.trim(), ""),
    }
}

/// Splits off a `table[:id]` target.
fn target_arg<'a>(input: &'a str, usage: &str) -> Result<(Target, &'a str), String> {
    let (raw, rest) = split_word(input);
    if raw.is_empty() {
        return Err(usage.to_string());
    }
    Ok((Target::parse(raw)?, rest))
}

fn json_arg(raw: &str, default: Option<Value>, usage: &str) -> Result<Value, String> {
    match (raw.is_empty(), default) {
        (true, Some(default)) => Ok(default),
        (true, None) => Err(usage.to_string()),
        (false, _) => commands::parse_json_arg(raw).map_err(|e| format!("invalid JSON: {}", e)),
    }
}

fn parse_line(line: &str) -> Result<ReplCommand, String> {
    let (cmd, rest) = split_word(line);
    let cmd = cmd.to_lowercase();

    match cmd.as_str() {
        "help" | "?" => Ok(ReplCommand::Help),
        "quit" | "exit" | "q" => Ok(ReplCommand::Quit),
        "status" => Ok(ReplCommand::Status),

        "query" | "sql" => {
            if rest.is_empty() {
                return Err("Usage: query <surrealql>".to_string());
            }
            Ok(ReplCommand::Run(Action::Query {
                sql: rest.to_string(),
            }))
        }

        "create" | "c" => {
            const USAGE: &str = "Usage: create <table[:id]> [json]";
            let (target, data) = target_arg(rest, USAGE)?;
            let data = json_arg(data, Some(json!({})), USAGE)?;
            Ok(ReplCommand::Run(Action::Create { target, data }))
        }

        "select" | "get" | "s" => {
            let (target, _) = target_arg(rest, "Usage: select <table[:id]>")?;
            Ok(ReplCommand::Run(Action::Select { target }))
        }

        "update" | "u" => {
            const USAGE: &str = "Usage: update <table[:id]> <json>";
            let (target, data) = target_arg(rest, USAGE)?;
            let data = json_arg(data, None, USAGE)?;
            Ok(ReplCommand::Run(Action::Update { target, data }))
        }

        "modify" | "patch" | "m" => {
            const USAGE: &str = "Usage: modify <table[:id]> <patch_json>";
            let (target, patches) = target_arg(rest, USAGE)?;
            if patches.is_empty() {
                return Err(USAGE.to_string());
            }
            let patches =
                parse_patches_arg(patches).map_err(|e| format!("invalid patch: {}", e))?;
            Ok(ReplCommand::Run(Action::Modify { target, patches }))
        }

        "delete" | "d" => {
            let (target, _) = target_arg(rest, "Usage: delete <table[:id]>")?;
            Ok(ReplCommand::Run(Action::Delete { target }))
        }

        "use" => {
            let (namespace, database) = split_word(rest);
            if namespace.is_empty() || database.is_empty() {
                return Err("Usage: use <namespace> <database>".to_string());
            }
            Ok(ReplCommand::Use {
                namespace: namespace.to_string(),
                database: database.to_string(),
            })
        }

        "signin" => {
            let (username, password) = split_word(rest);
            if username.is_empty() || password.is_empty() {
                return Err("Usage: signin <user> <pass>".to_string());
            }
            Ok(ReplCommand::Signin {
                username: username.to_string(),
                password: password.to_string(),
            })
        }

        _ => Err(format!("Unknown command: {}. Type 'help' for help.", cmd)),
    }
}
