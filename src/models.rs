//! Core data models used throughout the file search service.
//!
//! These types represent the extracted sections, keyword matches, and
//! per-file results that flow from the extractors through the scan and
//! listing engines to the calling agent.

use serde::Serialize;
use std::fmt;

/// Maximum number of characters kept in a match preview.
pub const PREVIEW_CHARS: usize = 200;

/// Appended to a preview when the section text was cut.
pub const TRUNCATION_MARKER: &str = "...";

/// What kind of document unit a [`Section`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    Paragraph,
    Table,
    Slide,
    Page,
    TextChunk,
    /// Diagnostic text produced when extraction failed.
    Error,
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SectionKind::Paragraph => "paragraph",
            SectionKind::Table => "table",
            SectionKind::Slide => "slide",
            SectionKind::Page => "page",
            SectionKind::TextChunk => "text_chunk",
            SectionKind::Error => "error",
        };
        f.write_str(s)
    }
}

/// One labeled unit of extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Section {
    pub index: u32,
    pub kind: SectionKind,
    pub text: String,
}

impl Section {
    pub fn new(index: u32, kind: SectionKind, text: impl Into<String>) -> Self {
        Self {
            index,
            kind,
            text: text.into(),
        }
    }

    /// A diagnostic section standing in for a document that could not be read.
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(1, SectionKind::Error, message)
    }
}

/// A section that matched the search keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentMatch {
    pub section_index: u32,
    pub match_count: usize,
    pub preview: String,
}

/// Aggregated match summary for one file.
///
/// `match_count` is always the sum of `content_matches[].match_count`, and
/// `content_matches` is never empty; use [`SearchResult::from_matches`] to
/// keep that true.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchResult {
    pub filename: String,
    pub detected_type: String,
    pub absolute_path: String,
    pub content_matches: Vec<ContentMatch>,
    pub match_count: usize,
}

impl SearchResult {
    /// Returns `None` when there are no matches.
    pub fn from_matches(
        filename: String,
        detected_type: String,
        absolute_path: String,
        content_matches: Vec<ContentMatch>,
    ) -> Option<Self> {
        if content_matches.is_empty() {
            return None;
        }
        let match_count = content_matches.iter().map(|m| m.match_count).sum();
        Some(Self {
            filename,
            detected_type,
            absolute_path,
            content_matches,
            match_count,
        })
    }
}

/// Sorts results descending by match count. Equal counts fall back to path
/// order so repeated scans print identically.
pub fn rank_results(results: &mut [SearchResult]) {
    results.sort_by(|a, b| {
        b.match_count
            .cmp(&a.match_count)
            .then_with(|| a.absolute_path.cmp(&b.absolute_path))
    });
}

/// Cuts `text` to [`PREVIEW_CHARS`] characters, appending [`TRUNCATION_MARKER`]
/// when anything was dropped. Counts chars, so multibyte text is never split.
pub fn make_preview(text: &str) -> String {
    match text.char_indices().nth(PREVIEW_CHARS) {
        Some((cut, _)) => {
            let mut preview = String::with_capacity(cut + TRUNCATION_MARKER.len());
            preview.push_str(&text[..cut]);
            preview.push_str(TRUNCATION_MARKER);
            preview
        }
        None => text.to_string(),
    }
}

/// Metadata for one listed file, or the error that prevented reading it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryEntryMeta {
    pub name: String,
    pub path: String,
    #[serde(flatten)]
    pub detail: EntryDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum EntryDetail {
    Metadata {
        #[serde(rename = "type")]
        file_type: String,
        size_kb: f64,
        modified: String,
    },
    Error {
        error: String,
    },
}

/// One page of a directory listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListingPage {
    pub entries: Vec<DirectoryEntryMeta>,
    pub total_files: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

/// Rounds to two decimal places, the precision used for sizes and timings.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
