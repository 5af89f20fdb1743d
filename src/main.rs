//! surrealkit - Command-line client for SurrealDB
//!
//! Provides both a REPL and one-shot command execution over the WebSocket RPC
//! transport (default) or the HTTP endpoints (`--http`).

mod commands;
mod config;
mod repl;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{parse_json_arg, parse_patches_arg, parse_sql_arg, Action, Backend, Target};
use config::Config;
use std::path::PathBuf;
use surrealkit_client::{Client, HttpClient};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "surrealkit")]
#[command(about = "Command-line client for SurrealDB")]
#[command(version)]
struct Cli {
    /// Path to a YAML config file
    #[arg(short, long, env = "SURREALKIT_CONFIG")]
    config: Option<PathBuf>,

    /// WebSocket RPC endpoint
    #[arg(short, long)]
    url: Option<String>,

    /// HTTP endpoint root
    #[arg(long)]
    http_url: Option<String>,

    /// Namespace
    #[arg(long)]
    ns: Option<String>,

    /// Database
    #[arg(long)]
    db: Option<String>,

    /// Username
    #[arg(long)]
    user: Option<String>,

    /// Password
    #[arg(long)]
    pass: Option<String>,

    /// Use the stateless HTTP endpoints instead of the RPC socket
    #[arg(long)]
    http: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

impl Cli {
    /// Applies command-line flags on top of file and environment settings.
    fn apply_to(&self, config: &mut Config) {
        if let Some(url) = &self.url {
            config.server.url = url.clone();
        }
        if let Some(url) = &self.http_url {
            config.server.http_url = url.clone();
        }
        if let Some(ns) = &self.ns {
            config.session.namespace = ns.clone();
        }
        if let Some(db) = &self.db {
            config.session.database = db.clone();
        }
        if let Some(user) = &self.user {
            config.session.username = user.clone();
        }
        if let Some(pass) = &self.pass {
            config.session.password = pass.clone();
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Start interactive REPL
    Repl,

    /// Run a SurrealQL query
    Query {
        /// Query text (or @file.surql to read from file)
        sql: String,
    },

    /// Create a record
    Create {
        /// Table, or table:id for a fixed id
        target: String,

        /// Record content JSON (or @file.json to read from file)
        #[arg(default_value = "{}")]
        data: String,
    },

    /// Select one record or a whole table
    Select {
        /// Table, or table:id
        target: String,
    },

    /// Replace the content of one record or a whole table
    Update {
        /// Table, or table:id
        target: String,

        /// New content JSON (or @file.json to read from file)
        data: String,
    },

    /// Apply JSON-Patch operations
    Modify {
        /// Table, or table:id
        target: String,

        /// Patch JSON: one operation or an array (or @file.json)
        patches: String,
    },

    /// Delete one record or a whole table
    Delete {
        /// Table, or table:id
        target: String,
    },
}

impl Commands {
    fn into_action(self) -> Result<Action, Box<dyn std::error::Error>> {
        Ok(match self {
            Commands::Repl => return Err("repl is not a one-shot command".into()),
            Commands::Query { sql } => Action::Query {
                sql: parse_sql_arg(&sql)?,
            },
            Commands::Create { target, data } => Action::Create {
                target: Target::parse(&target)?,
                data: parse_json_arg(&data)?,
            },
            Commands::Select { target } => Action::Select {
                target: Target::parse(&target)?,
            },
            Commands::Update { target, data } => Action::Update {
                target: Target::parse(&target)?,
                data: parse_json_arg(&data)?,
            },
            Commands::Modify { target, patches } => Action::Modify {
                target: Target::parse(&target)?,
                patches: parse_patches_arg(&patches)?,
            },
            Commands::Delete { target } => Action::Delete {
                target: Target::parse(&target)?,
            },
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();

    // Defaults, then file, then environment, then flags
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}: {}", "Error".red(), e);
            std::process::exit(1);
        }
    };
    cli.apply_to(&mut config);
    if let Err(e) = config.validate() {
        eprintln!("{}: {}", "Error".red(), e);
        std::process::exit(1);
    }
    tracing::debug!(url = %config.server.url, http = cli.http, "configuration loaded");

    let backend = if cli.http {
        Backend::Http(HttpClient::new(config.http_config())?)
    } else {
        Backend::Rpc(Client::new(config.connection_config()))
    };

    match cli.command {
        Some(Commands::Repl) | None => {
            repl::run(backend).await?;
        }
        Some(cmd) => {
            let action = match cmd.into_action() {
                Ok(action) => action,
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            };

            if let Backend::Rpc(client) = &backend {
                client.connect().await.map_err(|e| {
                    eprintln!("{}: {}", "Connection failed".red(), e);
                    e
                })?;
            }

            match commands::execute(&backend, action).await {
                Ok(output) => {
                    println!("{}", output);
                }
                Err(e) => {
                    eprintln!("{}: {}", "Error".red(), e);
                    std::process::exit(1);
                }
            }

            backend.close().await;
        }
    }

    Ok(())
}
