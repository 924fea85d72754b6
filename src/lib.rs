//! # File Search
//!
//! Keyword search over slide decks, PDFs, Word documents and plain-text
//! files in one or more root directories, exposed as a CLI, an HTTP JSON
//! API, and an MCP server.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌─────────────────────┐
//! │ Discovery  │──▶│  Registry   │──▶│ Extractors          │
//! │ (walkdir)  │   │ ext → type  │   │ pptx/pdf/docx/text  │
//! └─────┬──────┘   └─────────────┘   └──────────┬──────────┘
//!       │                                       ▼
//!       │            ┌──────────────────────────────────┐
//!       ├───────────▶│ Scan engine (N permits, ranked)  │
//!       │            └────────────────┬─────────────────┘
//!       ▼                             ▼
//! ┌────────────┐            ┌──────────────────┐
//! │  Listing   │───────────▶│  Tools (traits)  │──▶ CLI · HTTP · MCP
//! └────────────┘            └──────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! FILE_SEARCH_DIRS="$HOME/Documents;$HOME/Work" fsearch search budget
//! fsearch list --page 2 --limit 10
//! fsearch serve stdio          # MCP over stdin/stdout
//! fsearch serve http           # JSON API + MCP at /mcp
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and environment overrides |
//! | [`logging`] | tracing subscriber and log files |
//! | [`models`] | Sections, matches, results, listing entries |
//! | [`extract`] | `Extractor` trait and the built-in formats |
//! | [`registry`] | Extension → extractor resolution |
//! | [`discovery`] | Lazy directory walk |
//! | [`progress`] | Progress sinks |
//! | [`scan`] | Bounded-concurrency scan engine |
//! | [`listing`] | Paginated directory listing |
//! | [`search`] | `SearchFiles` request handling |
//! | [`directory`] | `GetDirectoryListing` request handling |
//! | [`guide`] | Usage guide resource |
//! | [`traits`] | `Tool` trait and registry |
//! | [`server`] | HTTP server |
//! | [`mcp`] | MCP bridge |

pub mod config;
pub mod directory;
pub mod discovery;
pub mod extract;
pub mod guide;
pub mod listing;
pub mod logging;
pub mod mcp;
pub mod models;
pub mod progress;
pub mod registry;
pub mod scan;
pub mod search;
pub mod server;
pub mod traits;
