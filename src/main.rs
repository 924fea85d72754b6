//! # File Search CLI (`fsearch`)
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fsearch search <keywords>` | Search configured directories for a keyword |
//! | `fsearch list` | One page of a directory's supported files |
//! | `fsearch types` | Supported file types and extensions |
//! | `fsearch guide` | Print the usage guide |
//! | `fsearch serve stdio` | MCP server on stdin/stdout |
//! | `fsearch serve http` | HTTP JSON API with MCP at `/mcp` |
//!
//! Results are JSON on stdout. Progress and logs go to stderr.
//!
//! ## Examples
//!
//! ```bash
//! FILE_SEARCH_DIRS="/data/reports;/data/slides" fsearch search revenue --type pdf
//! fsearch list --path /data/reports --page 2 --limit 10
//! fsearch --config ./fsearch.toml serve http
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use file_search::config;
use file_search::directory;
use file_search::guide::render_guide;
use file_search::logging;
use file_search::mcp::{self, McpBridge};
use file_search::progress::ProgressMode;
use file_search::registry::ExtractorRegistry;
use file_search::scan::Scanner;
use file_search::search;
use file_search::server;
use file_search::traits::ToolRegistry;

/// Keyword search over pptx, pdf, docx and text files.
#[derive(Parser)]
#[command(
    name = "fsearch",
    about = "Keyword search over slide decks, PDFs, Word documents and text files",
    version
)]
struct Cli {
    /// Optional configuration file (TOML). Environment variables override it.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Progress on stderr: off, human, or json. Default: human on a TTY, else off.
    #[arg(long, global = true, value_parser = parse_progress_mode)]
    progress: Option<ProgressMode>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search for a keyword (whole word, case-insensitive).
    Search {
        keywords: String,

        /// Search only this directory instead of the configured ones.
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Only search this file type (e.g. `pdf`, `word`).
        #[arg(long = "type")]
        file_type: Option<String>,
    },

    /// List one page of a directory's supported files.
    List {
        /// Directory to list (default: first configured directory).
        #[arg(long)]
        path: Option<PathBuf>,

        #[arg(long)]
        page: Option<i64>,

        #[arg(long)]
        limit: Option<i64>,

        #[arg(long = "type")]
        file_type: Option<String>,
    },

    /// Show supported file types.
    Types,

    /// Print the usage guide.
    Guide,

    /// Run a server.
    Serve {
        #[command(subcommand)]
        service: ServeService,
    },
}

#[derive(Subcommand)]
enum ServeService {
    /// MCP over stdin/stdout.
    Stdio,
    /// HTTP JSON API on `[server].bind`, with MCP at `/mcp`.
    Http,
}

fn parse_progress_mode(s: &str) -> Result<ProgressMode, String> {
    ProgressMode::parse(s).ok_or_else(|| format!("unknown progress mode '{}': use off, human, or json", s))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let cfg = config::load_config(cli.config.as_deref())?;
    let _log_guards = logging::init_logging(&cfg.logging)?;
    logging::log_system_info(&cfg.search.dirs, &cfg.logging.dir);

    let registry = Arc::new(ExtractorRegistry::with_builtins());
    for t in registry.supported_file_types() {
        tracing::info!(name = %t.name, extensions = ?t.extensions, "supported file type");
    }
    let scanner = Scanner::new(registry.clone(), cfg.scan_options());
    let progress = cli
        .progress
        .unwrap_or_else(ProgressMode::default_for_tty)
        .reporter();

    match cli.command {
        Commands::Search {
            keywords,
            dir,
            file_type,
        } => {
            search::run_search(
                &cfg,
                &scanner,
                &keywords,
                dir.as_deref(),
                file_type,
                progress.as_ref(),
            )
            .await?;
        }
        Commands::List {
            path,
            page,
            limit,
            file_type,
        } => {
            directory::run_list(
                &cfg,
                &registry,
                path.as_deref(),
                page,
                limit,
                file_type,
                progress.as_ref(),
            )
            .await?;
        }
        Commands::Types => {
            let payload = serde_json::json!({
                "supported_file_types": registry.supported_file_types()
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        Commands::Guide => {
            println!("{}", render_guide(&registry, &cfg.listing));
        }
        Commands::Serve { service } => {
            let cfg = Arc::new(cfg);
            let tools = Arc::new(ToolRegistry::with_builtins());
            match service {
                ServeService::Stdio => {
                    mcp::run_stdio(McpBridge::new(cfg, scanner, tools)).await?;
                }
                ServeService::Http => {
                    server::run_server(cfg, scanner, tools).await?;
                }
            }
        }
    }

    Ok(())
}
