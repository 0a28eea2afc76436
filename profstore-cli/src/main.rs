//! profstore-cli — admin frontend for the profiler result store
//!
//! Talks straight to the PostgreSQL backend via `profstore-core`.
//!
//! # Subcommands
//! - `health`                        — check database connectivity
//! - `list [-n <max>] [--start/--finish <rfc3339>] [--ascending]`
//! - `show <id>`                     — load a result (marks it viewed)
//! - `unviewed <user>`               — ids not yet seen by `user`
//! - `mark-viewed <user> <id>` / `mark-unviewed <user> <id>`

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use profstore_core::storage::{ListOrder, PostgresStorage, ResultStorage};
use profstore_core::{db, ProfStoreConfig};
use tracing_subscriber::{fmt, EnvFilter};
use uuid::Uuid;

#[derive(Debug, Parser)]
#[command(
    name = "profstore-cli",
    version,
    about = "Profiler result store — admin CLI"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "profstore.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check database connectivity and schema
    Health,

    /// List result ids, newest first by default
    List {
        /// Maximum number of ids to return
        #[arg(short = 'n', long)]
        max_results: Option<u32>,

        /// Inclusive lower bound on the session start time (RFC 3339)
        #[arg(long)]
        start: Option<DateTime<Utc>>,

        /// Inclusive upper bound on the session start time (RFC 3339)
        #[arg(long)]
        finish: Option<DateTime<Utc>>,

        /// Oldest first instead of newest first
        #[arg(long)]
        ascending: bool,
    },

    /// Load one result as JSON (marks it viewed for its owner)
    Show {
        /// Result id
        id: Uuid,
    },

    /// Show the ids a user has not viewed yet
    Unviewed {
        /// Owning user
        user: String,
    },

    /// Mark a result viewed for a user
    MarkViewed {
        user: String,
        id: Uuid,
    },

    /// Mark a result unviewed for a user
    MarkUnviewed {
        user: String,
        id: Uuid,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (dev convenience — production uses real env vars)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()))
        .init();

    let config = match ProfStoreConfig::load(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {}", cli.config, e);
            std::process::exit(1);
        }
    };

    let storage = match PostgresStorage::connect(&config.database).await {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            std::process::exit(1);
        }
    };

    match cli.command {
        Commands::Health => {
            let version = db::health_check(storage.pool()).await?;
            println!("PostgreSQL connected: {}", version);
        }

        Commands::List {
            max_results,
            start,
            finish,
            ascending,
        } => {
            let max = max_results.unwrap_or(config.storage.default_max_results);
            let order = if ascending {
                ListOrder::Ascending
            } else {
                ListOrder::Descending
            };
            let ids = storage.list(max, start, finish, order).await?;
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }

        Commands::Show { id } => {
            let result = storage.load(id).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }

        Commands::Unviewed { user } => {
            let ids = storage.unviewed_ids(&user).await?;
            println!("{}", serde_json::to_string_pretty(&ids)?);
        }

        Commands::MarkViewed { user, id } => {
            storage.set_viewed(&user, id).await?;
            println!("Marked {} viewed for {}", id, user);
        }

        Commands::MarkUnviewed { user, id } => {
            storage.set_unviewed(&user, id).await?;
            println!("Marked {} unviewed for {}", id, user);
        }
    }

    Ok(())
}
