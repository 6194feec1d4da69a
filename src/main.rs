//! Reelcount CLI
//!
//! Command-line interface for Reelcount operations:
//! - Ask a question in Russian
//! - Run an explicit query descriptor
//! - Import a JSON export
//! - Create the schema, print the default config

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use reelcount::answer::{Assistant, Reply};
use reelcount::config::{generate_default_config, Config, ConfigLoad};
use reelcount::query::QueryExecutor;
use reelcount::storage::{ConnectionPool, SqliteStore};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "reelcount")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Answers questions about the video catalog with a single number")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Ask a question, e.g. "Сколько всего видео есть в системе?"
    Ask {
        /// Question text
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },

    /// Execute an explicit query descriptor
    Run {
        /// Query kind (total_count, creator_count, min_views_count, ...)
        #[arg(short, long)]
        kind: String,
        /// Arguments in key=value format
        #[arg(short, long = "arg")]
        args: Vec<String>,
    },

    /// Import a JSON export
    Import {
        /// Path to the export file
        path: PathBuf,
    },

    /// Create the database schema
    Init,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let load = match &cli.config {
        Some(path) => ConfigLoad::from_file(path)?,
        None => Config::load_first(&Config::default_paths()),
    };

    reelcount::logging::init_logging(&load.config.logging)?;
    load.report();
    let config = load.config;

    if let Commands::Config { output } = &cli.command {
        let content = generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &content)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", content),
        }
        return Ok(());
    }

    let pool = ConnectionPool::open(config.database.to_pool_config())
        .with_context(|| format!("Failed to open database {}", config.database.path))?;
    let store = SqliteStore::new(pool.clone());

    let result = dispatch(cli.command, &config, store).await;

    pool.close();
    result
}

async fn dispatch(command: Commands, config: &Config, store: SqliteStore) -> anyhow::Result<()> {
    match command {
        Commands::Ask { text } => {
            let question = text.join(" ");
            let reply = assistant(config, store).reply(&question).await;
            print_reply(&reply)
        }

        Commands::Run { kind, args } => {
            let args = args
                .iter()
                .map(|item| parse_arg(item))
                .collect::<anyhow::Result<Vec<_>>>()?;
            let reply = assistant(config, store)
                .reply_to_parts(&kind, args, format!("run {}", kind))
                .await;
            print_reply(&reply)
        }

        Commands::Import { path } => {
            store.init_schema().await?;
            let report = reelcount::import::import_file(&store, &path)
                .await
                .with_context(|| format!("Import of {:?} failed", path))?;
            println!("Imported {}", report);
            println!("Store now holds {}", store.counts().await?);
            Ok(())
        }

        Commands::Init => {
            store.init_schema().await?;
            println!("Schema ready: {}", store.counts().await?);
            Ok(())
        }

        Commands::Config { .. } => Ok(()),
    }
}

fn assistant(config: &Config, store: SqliteStore) -> Assistant {
    let mut executor = QueryExecutor::new(Arc::new(store));
    if let Some(timeout) = config.database.query_timeout() {
        executor = executor.with_timeout(timeout);
    }
    Assistant::new(executor)
}

fn print_reply(reply: &Reply) -> anyhow::Result<()> {
    match reply {
        Reply::Failed { .. } => bail!("{}", reply),
        _ => {
            println!("{}", reply);
            Ok(())
        }
    }
}

fn parse_arg(item: &str) -> anyhow::Result<(String, String)> {
    match item.split_once('=') {
        Some((key, value)) if !key.trim().is_empty() => {
            Ok((key.trim().to_string(), value.trim().to_string()))
        }
        _ => bail!("Invalid argument '{}', expected key=value", item),
    }
}
