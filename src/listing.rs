//! Listing engine: one page of a directory's searchable files.
//!
//! Lists the root's direct children only, annotated with detected type,
//! size, and modification time. Nothing is cached, so every call reflects
//! the live filesystem. A file whose metadata cannot be read still gets an
//! entry, carrying the error instead.

use std::path::Path;

use chrono::{DateTime, Local};
use tracing::{debug, error};

use crate::discovery::{discover, WalkOptions};
use crate::models::{round2, DirectoryEntryMeta, EntryDetail, ListingPage};
use crate::registry::ExtractorRegistry;

/// Yield to the scheduler after this many entries.
const YIELD_EVERY: usize = 10;

/// Resolved page window for a listing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub start: usize,
    pub end: usize,
}

/// Compute the slice `[start, end)` of `total_files` for a 1-indexed page.
///
/// `limit` is clamped to `1..=max_limit` and `page` to at least 1. A page
/// past the end is clamped to the last page; an empty set has exactly one
/// (empty) page.
pub fn page_window(total_files: usize, page: usize, limit: usize, max_limit: usize) -> PageWindow {
    let limit = limit.clamp(1, max_limit.max(1));
    let total_pages = if total_files == 0 {
        1
    } else {
        total_files.div_ceil(limit)
    };
    let mut page = page.max(1);
    let mut start = (page - 1).saturating_mul(limit);
    if start >= total_files && page > 1 {
        page = total_pages;
        start = (page - 1) * limit;
    }
    let end = (start + limit).min(total_files);
    PageWindow {
        page,
        limit,
        total_pages,
        start,
        end,
    }
}

/// List one page of `root`.
pub async fn list_directory(
    registry: &ExtractorRegistry,
    root: &Path,
    type_filter: Option<&str>,
    page: usize,
    limit: usize,
    max_limit: usize,
    follow_symlinks: bool,
) -> ListingPage {
    let walk = WalkOptions {
        recursive: false,
        follow_symlinks,
    };
    let files: Vec<_> = discover(registry, root, type_filter, walk).collect();
    let total_files = files.len();
    let window = page_window(total_files, page, limit, max_limit);
    debug!(
        root = %root.display(),
        total_files,
        page = window.page,
        start = window.start,
        end = window.end,
        "listing window"
    );

    let mut entries = Vec::with_capacity(window.end - window.start);
    for (i, path) in files[window.start..window.end].iter().enumerate() {
        entries.push(entry_for(registry, path).await);
        if (i + 1) % YIELD_EVERY == 0 {
            tokio::task::yield_now().await;
        }
    }

    ListingPage {
        entries,
        total_files,
        page: window.page,
        limit: window.limit,
        total_pages: window.total_pages,
    }
}

/// Listing entry for one file, read from the live filesystem.
///
/// A file that vanished or cannot be stat'ed still gets an entry, carrying
/// the error in place of type, size and modification time.
pub async fn entry_for(registry: &ExtractorRegistry, path: &Path) -> DirectoryEntryMeta {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    let detail = match tokio::fs::metadata(path).await {
        Ok(meta) => {
            let modified = meta
                .modified()
                .map(|t| DateTime::<Local>::from(t).format("%Y-%m-%dT%H:%M:%S").to_string())
                .unwrap_or_default();
            EntryDetail::Metadata {
                file_type: registry.type_name_for(path),
                size_kb: round2(meta.len() as f64 / 1024.0),
                modified,
            }
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "failed to read file metadata");
            EntryDetail::Error {
                error: e.to_string(),
            }
        }
    };
    DirectoryEntryMeta {
        name,
        path: path.display().to_string(),
        detail,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn clamps_past_the_end() {
        let w = page_window(25, 5, 10, 50);
        assert_eq!(w.page, 3);
        assert_eq!(w.total_pages, 3);
        assert_eq!((w.start, w.end), (20, 25));
    }

    #[test]
    fn regular_page() {
        let w = page_window(25, 2, 10, 50);
        assert_eq!((w.page, w.start, w.end), (2, 10, 20));
    }

    #[test]
    fn limit_is_bounded() {
        let w = page_window(100, 1, 500, 50);
        assert_eq!(w.limit, 50);
        assert_eq!(w.end, 50);
        let w = page_window(100, 1, 0, 50);
        assert_eq!(w.limit, 1);
    }

    #[test]
    fn empty_set_has_one_page() {
        let w = page_window(0, 4, 10, 50);
        assert_eq!(w.total_pages, 1);
        assert_eq!((w.start, w.end), (0, 0));
        assert_eq!(w.page, 1);
    }

    #[test]
    fn shown_never_exceeds_limit_or_remaining() {
        for total in 0..40 {
            for page in 1..8 {
                for limit in 1..12 {
                    let w = page_window(total, page, limit, 50);
                    let shown = w.end - w.start;
                    assert!(shown <= limit);
                    assert!(shown <= total - w.start);
                }
            }
        }
    }

    #[tokio::test]
    async fn lists_page_with_metadata() {
        let tmp = TempDir::new().unwrap();
        for i in 0..25 {
            fs::write(tmp.path().join(format!("f{:02}.txt", i)), "hello").unwrap();
        }
        fs::write(tmp.path().join("ignored.png"), "x").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();
        fs::write(tmp.path().join("nested/deep.txt"), "x").unwrap();

        let registry = ExtractorRegistry::with_builtins();
        let page = list_directory(&registry, tmp.path(), None, 5, 10, 50, false).await;
        assert_eq!(page.total_files, 25);
        assert_eq!(page.page, 3);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.entries.len(), 5);
        assert_eq!(page.entries[0].name, "f20.txt");
        match &page.entries[0].detail {
            EntryDetail::Metadata {
                file_type, size_kb, ..
            } => {
                assert_eq!(file_type, "Text");
                assert_eq!(*size_kb, 0.0);
            }
            EntryDetail::Error { error } => panic!("unexpected error: {}", error),
        }
    }

    #[tokio::test]
    async fn type_filter_applies_to_listing() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("a.txt"), "a").unwrap();
        fs::write(tmp.path().join("b.pdf"), "b").unwrap();
        let registry = ExtractorRegistry::with_builtins();
        let page = list_directory(&registry, tmp.path(), Some("pdf"), 1, 20, 50, false).await;
        assert_eq!(page.total_files, 1);
        assert_eq!(page.entries[0].name, "b.pdf");
    }

    #[tokio::test]
    async fn vanished_file_gets_error_entry() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("keep.txt"), "a").unwrap();
        fs::write(tmp.path().join("gone.txt"), "b").unwrap();
        let registry = ExtractorRegistry::with_builtins();
        let walk = WalkOptions {
            recursive: false,
            follow_symlinks: false,
        };
        let found: Vec<_> = discover(&registry, tmp.path(), None, walk).collect();
        assert_eq!(found.len(), 2);
        fs::remove_file(tmp.path().join("gone.txt")).unwrap();

        let mut entries = Vec::new();
        for path in &found {
            entries.push(entry_for(&registry, path).await);
        }
        let gone = entries.iter().find(|e| e.name == "gone.txt").unwrap();
        assert!(matches!(&gone.detail, EntryDetail::Error { error } if !error.is_empty()));
        let json = serde_json::to_value(gone).unwrap();
        assert!(json.get("error").is_some());
        assert!(json.get("type").is_none());
        assert!(json.get("size_kb").is_none());
        assert!(json.get("modified").is_none());

        let keep = entries.iter().find(|e| e.name == "keep.txt").unwrap();
        assert!(matches!(keep.detail, EntryDetail::Metadata { .. }));
    }
}
