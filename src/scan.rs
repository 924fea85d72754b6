//! Scan engine: keyword search across every supported file under a root.
//!
//! # Pipeline
//!
//! ```text
//! discover(root) ──▶ one task per file ──▶ semaphore (N permits)
//!                                              │
//!                                              ▼
//!                          spawn_blocking: extract → match → SearchResult
//!                                              │
//!                         JoinSet::join_next ◀─┘  (collect, count, report)
//!                                              │
//!                                              ▼
//!                                   rank by match_count desc
//! ```
//!
//! All file tasks are spawned up front; the semaphore bounds how many
//! synchronous parses run at once. Results are appended and the processed
//! counter advanced only in the collecting loop, so concurrent completions
//! never race on shared state.
//!
//! A file whose extractor panics (or whose task is otherwise lost) is
//! logged and left out of the results; the rest of the scan continues.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use regex::{Regex, RegexBuilder};
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use crate::discovery::{discover, WalkOptions};
use crate::models::{make_preview, rank_results, ContentMatch, SearchResult, Section};
use crate::progress::{ProgressEvent, ScanProgress};
use crate::registry::ExtractorRegistry;

pub const DEFAULT_MAX_CONCURRENCY: usize = 10;
pub const DEFAULT_MAX_SECTIONS: usize = 10;

/// Emit a "processed n/total" notice every this many files.
const NOTICE_EVERY_FILES: u64 = 5;
/// Emit a partial top-results summary each time the hit count reaches a multiple of this.
const SUMMARY_EVERY_RESULTS: usize = 10;
const SUMMARY_TOP_N: usize = 3;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("keyword must not be empty")]
    EmptyKeyword,
    #[error("invalid keyword pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Tunables for a scan.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Maximum number of files extracted at the same time.
    pub max_concurrency: usize,
    /// Content sections requested from each extractor.
    pub max_sections: usize,
    pub follow_symlinks: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            max_sections: DEFAULT_MAX_SECTIONS,
            follow_symlinks: false,
        }
    }
}

/// Runs keyword scans against a shared extractor registry.
#[derive(Clone)]
pub struct Scanner {
    registry: Arc<ExtractorRegistry>,
    options: ScanOptions,
}

enum FileOutcome {
    Matched(SearchResult),
    NoMatch,
    Failed { path: PathBuf, reason: String },
}

impl Scanner {
    pub fn new(registry: Arc<ExtractorRegistry>, options: ScanOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &ExtractorRegistry {
        &self.registry
    }

    /// Scan `root` recursively for `keyword` and return per-file results,
    /// highest match count first.
    ///
    /// An empty or unreadable directory yields `Ok(vec![])`. Only an
    /// unusable keyword is an error.
    pub async fn scan(
        &self,
        root: &Path,
        keyword: &str,
        type_filter: Option<&str>,
        progress: &dyn ScanProgress,
    ) -> Result<Vec<SearchResult>, ScanError> {
        let pattern = keyword_pattern(keyword)?;
        info!(root = %root.display(), keyword, ?type_filter, "scan started");
        progress.info(match type_filter {
            Some(t) => format!(
                "Searching for '{}' in {} (file type: {})",
                keyword,
                root.display(),
                t
            ),
            None => format!("Searching for '{}' in {}", keyword, root.display()),
        });

        let walk = WalkOptions {
            recursive: true,
            follow_symlinks: self.options.follow_symlinks,
        };
        let files: Vec<PathBuf> = discover(&self.registry, root, type_filter, walk).collect();
        let total = files.len() as u64;
        if total == 0 {
            progress.info(format!("No searchable files found in {}", root.display()));
            return Ok(Vec::new());
        }

        let gate = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();
        for path in files {
            let gate = gate.clone();
            let registry = self.registry.clone();
            let pattern = pattern.clone();
            let max_sections = self.options.max_sections;
            tasks.spawn(async move {
                let _permit = match gate.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return FileOutcome::Failed {
                            path,
                            reason: e.to_string(),
                        }
                    }
                };
                let task_path = path.clone();
                let joined = tokio::task::spawn_blocking(move || {
                    scan_file(&registry, &task_path, &pattern, max_sections)
                })
                .await;
                match joined {
                    Ok(Some(result)) => FileOutcome::Matched(result),
                    Ok(None) => FileOutcome::NoMatch,
                    Err(e) => FileOutcome::Failed {
                        path,
                        reason: describe_join_error(e),
                    },
                }
            });
        }

        let mut results: Vec<SearchResult> = Vec::new();
        let mut processed = 0u64;
        while let Some(joined) = tasks.join_next().await {
            processed += 1;
            match joined {
                Ok(FileOutcome::Matched(result)) => {
                    progress.info(format!(
                        "Match found: {} ({} matches)",
                        result.filename, result.match_count
                    ));
                    results.push(result);
                    if results.len() % SUMMARY_EVERY_RESULTS == 0 {
                        progress.info(top_results_summary(&results, SUMMARY_TOP_N));
                    }
                }
                Ok(FileOutcome::NoMatch) => {}
                Ok(FileOutcome::Failed { path, reason }) => {
                    error!(path = %path.display(), error = %reason, "file scan failed");
                    progress.warning(format!(
                        "Error while processing {}: {}",
                        path.display(),
                        reason
                    ));
                }
                Err(e) => {
                    error!(error = %e, "scan task lost");
                }
            }

            progress.report(ProgressEvent::Files { processed, total });
            if processed % NOTICE_EVERY_FILES == 0 || processed == total {
                let pct = (processed as f64 / total as f64 * 100.0).round() as u64;
                progress.info(format!(
                    "Processed {}/{} files ({}%)",
                    processed, total, pct
                ));
            }
        }

        rank_results(&mut results);
        info!(
            root = %root.display(),
            matched = results.len(),
            total,
            "scan finished"
        );
        progress.info(format!(
            "Search complete: {} of {} files matched",
            results.len(),
            total
        ));
        Ok(results)
    }
}

/// Case-insensitive pattern matching `keyword` as a delimited token.
///
/// A side of the keyword that ends in a word character gets a `\b`
/// boundary. A side that ends in a symbol (`c++`, `.net`) must instead sit
/// next to a non-word character or the edge of the text. Group 1 is the
/// keyword itself.
pub fn keyword_pattern(keyword: &str) -> Result<Regex, ScanError> {
    if keyword.trim().is_empty() {
        return Err(ScanError::EmptyKeyword);
    }
    let is_word = |c: Option<char>| c.is_some_and(|c| c.is_alphanumeric() || c == '_');
    let leading = if is_word(keyword.chars().next()) {
        r"\b"
    } else {
        r"(?:^|\W)"
    };
    let trailing = if is_word(keyword.chars().last()) {
        r"\b"
    } else {
        r"(?:\W|$)"
    };
    let pattern = RegexBuilder::new(&format!(
        "{}({}){}",
        leading,
        regex::escape(keyword),
        trailing
    ))
    .case_insensitive(true)
    .build()?;
    Ok(pattern)
}

/// Number of keyword hits in `text`.
///
/// Each search resumes right after the previous keyword, not after its
/// guard character, so a separator shared by two hits counts for both.
fn count_hits(pattern: &Regex, text: &str) -> usize {
    let mut count = 0;
    let mut at = 0;
    while let Some(hit) = pattern.captures_at(text, at).and_then(|c| c.get(1)) {
        count += 1;
        if hit.end() <= at {
            break;
        }
        at = hit.end();
    }
    count
}

/// Extract one file and match every section against `pattern`.
///
/// Returns `None` when no extractor claims the file or nothing matched.
pub fn scan_file(
    registry: &ExtractorRegistry,
    path: &Path,
    pattern: &Regex,
    max_sections: usize,
) -> Option<SearchResult> {
    let Some(extractor) = registry.resolve(path) else {
        warn!(path = %path.display(), "no extractor for file");
        return None;
    };

    let started = Instant::now();
    let sections = extractor.extract(path, max_sections);
    debug!(
        path = %path.display(),
        sections = sections.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "extracted"
    );

    let matches: Vec<ContentMatch> = sections
        .iter()
        .filter_map(|s| match_section(s, pattern))
        .collect();
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    SearchResult::from_matches(
        filename,
        extractor.type_name().to_string(),
        path.display().to_string(),
        matches,
    )
}

/// Count keyword hits in one section.
pub fn match_section(section: &Section, pattern: &Regex) -> Option<ContentMatch> {
    if section.text.is_empty() {
        return None;
    }
    let count = count_hits(pattern, &section.text);
    (count > 0).then(|| ContentMatch {
        section_index: section.index,
        match_count: count,
        preview: make_preview(&section.text),
    })
}

/// One-line summary of the best `n` results so far.
pub fn top_results_summary(results: &[SearchResult], n: usize) -> String {
    let mut ranked: Vec<&SearchResult> = results.iter().collect();
    ranked.sort_by(|a, b| b.match_count.cmp(&a.match_count));
    let lines: Vec<String> = ranked
        .iter()
        .take(n)
        .map(|r| format!("- {} ({} matches)", r.filename, r.match_count))
        .collect();
    format!("Top results so far:\n{}", lines.join("\n"))
}

fn describe_join_error(e: JoinError) -> String {
    if e.is_panic() {
        let payload = e.into_panic();
        if let Some(s) = payload.downcast_ref::<&str>() {
            format!("extractor panicked: {}", s)
        } else if let Some(s) = payload.downcast_ref::<String>() {
            format!("extractor panicked: {}", s)
        } else {
            "extractor panicked".to_string()
        }
    } else {
        e.to_string()
    }
}
