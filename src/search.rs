//! `SearchFiles`: keyword search across one or more root directories.
//!
//! Wraps the scan engine with request handling: parameter cleanup,
//! directory validation, sequential multi-root composition, the final
//! re-ranking, and the response payload.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;
use tracing::{info, warn};

use crate::config::Config;
use crate::models::{rank_results, round2, SearchResult};
use crate::progress::ScanProgress;
use crate::scan::Scanner;

/// How many results the closing summary names.
const SUMMARY_TOP_N: usize = 10;

/// Request-level failures shared by the search and listing operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RequestError {
    #[error("keywords must not be empty")]
    EmptyKeywords,
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    #[error("no valid search directory")]
    NoValidDirectory,
}

/// Parameters of a `SearchFiles` call.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SearchQuery {
    pub keywords: String,
    #[serde(default)]
    pub directory: Option<String>,
    #[serde(default)]
    pub file_type: Option<String>,
}

impl SearchQuery {
    /// Drop placeholder values ("null", blank) some clients send for absent fields.
    pub fn normalized(self) -> Self {
        Self {
            keywords: self.keywords.trim().to_string(),
            directory: optional_param(self.directory),
            file_type: optional_param(self.file_type),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub directories: Vec<String>,
    pub file_type: Option<String>,
    pub result_count: usize,
    pub elapsed_time_seconds: f64,
    pub results: Vec<SearchResult>,
}

/// Treat `"null"` and blank strings as absent.
pub fn optional_param(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Keep the candidates that are existing directories, canonicalized.
///
/// Each rejected candidate is reported as a warning; the caller decides
/// whether an empty outcome is fatal.
pub fn valid_directories(candidates: &[PathBuf], progress: &dyn ScanProgress) -> Vec<PathBuf> {
    let mut valid = Vec::new();
    for dir in candidates {
        if !dir.is_dir() {
            warn!(dir = %dir.display(), "directory not found");
            progress.warning(format!("Directory does not exist: {}", dir.display()));
            continue;
        }
        match dir.canonicalize() {
            Ok(canonical) => valid.push(canonical),
            Err(e) => {
                warn!(dir = %dir.display(), error = %e, "cannot resolve directory");
                progress.warning(format!("Cannot resolve directory {}: {}", dir.display(), e));
            }
        }
    }
    valid
}

/// Directories a request targets: the explicit one, or every configured root.
pub fn requested_directories(config: &Config, explicit: Option<&str>) -> Vec<PathBuf> {
    match explicit {
        Some(dir) => vec![PathBuf::from(dir)],
        None => config.search.dirs.clone(),
    }
}

/// Run a `SearchFiles` request.
pub async fn search_files(
    config: &Config,
    scanner: &Scanner,
    query: SearchQuery,
    progress: &dyn ScanProgress,
) -> Result<SearchResponse> {
    let started = Instant::now();
    let query = query.normalized();
    info!(
        keywords = %query.keywords,
        directory = ?query.directory,
        file_type = ?query.file_type,
        "search request"
    );
    if query.keywords.is_empty() {
        return Err(RequestError::EmptyKeywords.into());
    }
    progress.info(format!("Search started: '{}'", query.keywords));

    let candidates = requested_directories(config, query.directory.as_deref());
    let dirs = valid_directories(&candidates, progress);
    if dirs.is_empty() {
        tracing::error!("no valid search directory");
        progress.error("No valid search directory".to_string());
        return Err(RequestError::NoValidDirectory.into());
    }

    progress.info(format!("Searching {} directories", dirs.len()));
    if dirs.len() > 1 {
        let listing: Vec<String> = dirs.iter().map(|d| format!("- {}", d.display())).collect();
        progress.info(format!("Directories to search:\n{}", listing.join("\n")));
    }

    let mut results: Vec<SearchResult> = Vec::new();
    for (i, dir) in dirs.iter().enumerate() {
        progress.info(format!("[{}/{}] Searching {}", i + 1, dirs.len(), dir.display()));
        let found = scanner
            .scan(dir, &query.keywords, query.file_type.as_deref(), progress)
            .await
            .with_context(|| format!("search failed in {}", dir.display()))?;
        if found.is_empty() {
            progress.info(format!("No matches in {}", dir.display()));
        } else {
            progress.info(format!("{} matching files in {}", found.len(), dir.display()));
        }
        results.extend(found);
    }
    rank_results(&mut results);

    let elapsed = started.elapsed().as_secs_f64();
    report_summary(&results, &query.keywords, elapsed, progress);
    info!(
        matched = results.len(),
        elapsed_secs = elapsed,
        "search completed"
    );

    Ok(SearchResponse {
        query: query.keywords,
        directories: dirs.iter().map(|d| d.display().to_string()).collect(),
        file_type: query.file_type,
        result_count: results.len(),
        elapsed_time_seconds: round2(elapsed),
        results,
    })
}

fn report_summary(results: &[SearchResult], keywords: &str, elapsed: f64, progress: &dyn ScanProgress) {
    if results.is_empty() {
        progress.info(format!(
            "No results for '{}' ({:.2}s)",
            keywords, elapsed
        ));
        return;
    }
    progress.info(format!(
        "Search complete: {} files found in {:.2}s",
        results.len(),
        elapsed
    ));
    let lines: Vec<String> = results
        .iter()
        .take(SUMMARY_TOP_N)
        .map(|r| format!("- {} ({} matches)", r.filename, r.match_count))
        .collect();
    if results.len() > SUMMARY_TOP_N {
        progress.info(format!(
            "Top {} results:\n{}\n... and {} more files",
            SUMMARY_TOP_N,
            lines.join("\n"),
            results.len() - SUMMARY_TOP_N
        ));
    } else {
        progress.info(format!("Results:\n{}", lines.join("\n")));
    }
}

/// CLI entry point: run a search and print the JSON response to stdout.
pub async fn run_search(
    config: &Config,
    scanner: &Scanner,
    keywords: &str,
    directory: Option<&Path>,
    file_type: Option<String>,
    progress: &dyn ScanProgress,
) -> Result<()> {
    let query = SearchQuery {
        keywords: keywords.to_string(),
        directory: directory.map(|d| d.display().to_string()),
        file_type,
    };
    let payload = match search_files(config, scanner, query, progress).await {
        Ok(response) => serde_json::to_value(&response)?,
        Err(e) => match e.downcast_ref::<RequestError>() {
            Some(RequestError::NoValidDirectory) => {
                serde_json::json!({ "error": RequestError::NoValidDirectory.to_string() })
            }
            _ => return Err(e),
        },
    };
    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use crate::registry::ExtractorRegistry;
    use crate::scan::ScanOptions;
    use std::fs;
    use std::sync::Arc;
    use tempfile::TempDir;

    fn config_for(dirs: Vec<PathBuf>) -> Config {
        let mut config = Config::default();
        config.search.dirs = dirs;
        config
    }

    fn scanner() -> Scanner {
        Scanner::new(
            Arc::new(ExtractorRegistry::with_builtins()),
            ScanOptions::default(),
        )
    }

    #[test]
    fn null_and_blank_are_absent() {
        assert_eq!(optional_param(Some("null".into())), None);
        assert_eq!(optional_param(Some("  ".into())), None);
        assert_eq!(optional_param(Some(" pdf ".into())), Some("pdf".into()));
        assert_eq!(optional_param(None), None);
    }

    #[tokio::test]
    async fn searches_every_root_and_reranks() {
        let a = TempDir::new().unwrap();
        let b = TempDir::new().unwrap();
        fs::write(a.path().join("one.txt"), "alpha").unwrap();
        fs::write(b.path().join("three.txt"), "alpha alpha alpha").unwrap();
        fs::write(b.path().join("none.txt"), "beta").unwrap();

        let config = config_for(vec![a.path().to_path_buf(), b.path().to_path_buf()]);
        let query = SearchQuery {
            keywords: "alpha".into(),
            directory: Some("null".into()),
            file_type: None,
        };
        let resp = search_files(&config, &scanner(), query, &NoProgress)
            .await
            .unwrap();
        assert_eq!(resp.directories.len(), 2);
        assert_eq!(resp.result_count, 2);
        assert_eq!(resp.results[0].filename, "three.txt");
        assert_eq!(resp.results[0].match_count, 3);
        assert_eq!(resp.results[1].filename, "one.txt");
    }

    #[tokio::test]
    async fn missing_roots_are_skipped() {
        let a = TempDir::new().unwrap();
        fs::write(a.path().join("x.md"), "gamma").unwrap();
        let config = config_for(vec![PathBuf::from("/no/such/root"), a.path().to_path_buf()]);
        let query = SearchQuery {
            keywords: "gamma".into(),
            ..Default::default()
        };
        let resp = search_files(&config, &scanner(), query, &NoProgress)
            .await
            .unwrap();
        assert_eq!(resp.directories.len(), 1);
        assert_eq!(resp.result_count, 1);
    }

    #[tokio::test]
    async fn no_valid_directory_is_reported() {
        let config = config_for(vec![PathBuf::from("/no/such/root")]);
        let query = SearchQuery {
            keywords: "x".into(),
            ..Default::default()
        };
        let err = search_files(&config, &scanner(), query, &NoProgress)
            .await
            .unwrap_err();
        assert_eq!(
            err.downcast_ref::<RequestError>(),
            Some(&RequestError::NoValidDirectory)
        );
    }

    #[tokio::test]
    async fn empty_keywords_rejected() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(vec![tmp.path().to_path_buf()]);
        let query = SearchQuery {
            keywords: "   ".into(),
            ..Default::default()
        };
        let err = search_files(&config, &scanner(), query, &NoProgress)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[tokio::test]
    async fn empty_directory_has_zero_results() {
        let tmp = TempDir::new().unwrap();
        let config = config_for(vec![tmp.path().to_path_buf()]);
        let query = SearchQuery {
            keywords: "anything".into(),
            ..Default::default()
        };
        let resp = search_files(&config, &scanner(), query, &NoProgress)
            .await
            .unwrap();
        assert_eq!(resp.result_count, 0);
        assert!(resp.results.is_empty());
    }
}
