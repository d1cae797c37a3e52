//! # DocLens CLI (`doclens`)
//!
//! ## Usage
//!
//! ```bash
//! doclens --config ./config/doclens.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `doclens init` | Create the SQLite database and run schema migrations |
//! | `doclens add --title T --content C` | Store a document and enrich it |
//! | `doclens get <id>` | Print a document |
//! | `doclens list` | List documents, most recently updated first |
//! | `doclens search "<query>"` | Text or semantic search |
//! | `doclens ask "<question>"` | Answer a question over all documents |
//! | `doclens delete <id>` | Delete a document |
//! | `doclens serve` | Start the HTTP API |

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use doclens::commands::{self, AddArgs};
use doclens::config;
use doclens::logging;
use doclens::migrate;
use doclens::server;
use doclens::service::ListQuery;
use doclens_core::models::{Actor, Role};

/// DocLens: a document store with AI summaries, tags, and hybrid search.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/doclens.example.toml` for a full example.
#[derive(Parser)]
#[command(name = "doclens", version, about)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/doclens.toml")]
    config: PathBuf,

    /// Enable debug logging (overridden by `RUST_LOG`).
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Idempotent.
    Init,

    /// Add a document. Summary, tags, and embedding are generated before
    /// the command returns.
    Add {
        #[arg(long)]
        title: String,

        /// Document body.
        #[arg(long)]
        content: Option<String>,

        /// Read the document body from a file.
        #[arg(long)]
        content_file: Option<PathBuf>,

        /// Tag to attach (repeatable).
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Owner recorded on the document.
        #[arg(long, default_value = "cli")]
        user: String,

        /// Print the stored document as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print a document by id.
    Get {
        id: String,

        #[arg(long)]
        json: bool,
    },

    /// List documents, most recently updated first.
    List {
        /// Only documents carrying this exact tag.
        #[arg(long)]
        tag: Option<String>,

        /// Case-insensitive substring of title, content, or summary.
        #[arg(long)]
        text: Option<String>,

        /// 1-based page number.
        #[arg(long)]
        page: Option<usize>,

        /// Page size (default 20, max 100).
        #[arg(long)]
        limit: Option<usize>,

        #[arg(long)]
        json: bool,
    },

    /// Search documents.
    Search {
        query: String,

        /// `text` (substring) or `semantic` (embedding similarity).
        #[arg(long, default_value = "text")]
        mode: String,

        /// Number of semantic results.
        #[arg(long)]
        top_k: Option<i64>,

        #[arg(long)]
        json: bool,
    },

    /// Answer a question using every stored document as context.
    Ask { question: String },

    /// Delete a document.
    Delete {
        id: String,

        /// Acting user; must own the document unless `--admin` is set.
        #[arg(long, default_value = "cli")]
        user: String,

        #[arg(long)]
        admin: bool,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Add {
            title,
            content,
            content_file,
            tags,
            user,
            json,
        } => {
            commands::run_add(
                &cfg,
                AddArgs {
                    title: &title,
                    content: content.as_deref(),
                    content_file: content_file.as_deref(),
                    tags,
                    user: &user,
                    json,
                },
            )
            .await?;
        }
        Commands::Get { id, json } => {
            commands::run_get(&cfg, &id, json).await?;
        }
        Commands::List {
            tag,
            text,
            page,
            limit,
            json,
        } => {
            commands::run_list(
                &cfg,
                ListQuery {
                    tag,
                    text,
                    page,
                    limit,
                },
                json,
            )
            .await?;
        }
        Commands::Search {
            query,
            mode,
            top_k,
            json,
        } => {
            commands::run_search(&cfg, &query, &mode, top_k, json).await?;
        }
        Commands::Ask { question } => {
            commands::run_ask(&cfg, &question).await?;
        }
        Commands::Delete { id, user, admin } => {
            let actor = Actor {
                id: user,
                role: if admin { Role::Admin } else { Role::User },
            };
            commands::run_delete(&cfg, &id, &actor).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
