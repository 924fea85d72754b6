//! Extractor registry: which extractor, if any, handles a path.
//!
//! The registry is an ordered list. Resolution scans it once and the first
//! extractor whose extension set contains the path's lowercased suffix wins,
//! so registration order is the override order when two extractors claim the
//! same extension.
//!
//! The registry is built once at startup and only read afterwards; scan
//! tasks share it through an `Arc` without locking.
//!
//! # Example
//!
//! ```rust
//! use file_search::registry::ExtractorRegistry;
//! use std::path::Path;
//!
//! let registry = ExtractorRegistry::with_builtins();
//! assert_eq!(registry.resolve(Path::new("deck.PPTX")).map(|e| e.type_name()), Some("PowerPoint"));
//! assert!(registry.accepts(Path::new("notes.md"), Some("text")));
//! assert!(!registry.accepts(Path::new("notes.md"), Some("pdf")));
//! ```

use serde::Serialize;
use std::path::Path;

use crate::extract::{DocxExtractor, Extractor, PdfExtractor, PptxExtractor, TextExtractor};

/// Ordered set of registered extractors.
pub struct ExtractorRegistry {
    extractors: Vec<Box<dyn Extractor>>,
}

/// Entry in the `get_supported_file_types` response.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SupportedFileType {
    pub name: String,
    pub extensions: Vec<String>,
    pub is_enabled: bool,
}

impl ExtractorRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            extractors: Vec::new(),
        }
    }

    /// Create a registry with the built-in extractors, in priority order:
    /// PowerPoint, PDF, Word, Text.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PptxExtractor));
        registry.register(Box::new(PdfExtractor));
        registry.register(Box::new(DocxExtractor));
        registry.register(Box::new(TextExtractor));
        registry
    }

    /// Append an extractor. Earlier registrations take priority.
    pub fn register(&mut self, extractor: Box<dyn Extractor>) {
        self.extractors.push(extractor);
    }

    pub fn extractors(&self) -> &[Box<dyn Extractor>] {
        &self.extractors
    }

    /// First extractor that claims the path's extension.
    pub fn resolve(&self, path: &Path) -> Option<&dyn Extractor> {
        let suffix = suffix_of(path)?;
        self.extractors
            .iter()
            .find(|e| e.extensions().iter().any(|ext| *ext == suffix))
            .map(|e| e.as_ref())
    }

    /// True when an extractor resolves for `path` and, if `type_filter` is
    /// given, the filter is a case-insensitive substring of its type name.
    pub fn accepts(&self, path: &Path, type_filter: Option<&str>) -> bool {
        match self.resolve(path) {
            None => false,
            Some(extractor) => match type_filter {
                None => true,
                Some(filter) => type_matches(extractor.type_name(), filter),
            },
        }
    }

    /// Type label for `path`, or `"Unknown"`.
    pub fn type_name_for(&self, path: &Path) -> String {
        self.resolve(path)
            .map(|e| e.type_name().to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    pub fn supported_file_types(&self) -> Vec<SupportedFileType> {
        self.extractors
            .iter()
            .map(|e| SupportedFileType {
                name: e.type_name().to_string(),
                extensions: e.extensions().iter().map(|s| s.to_string()).collect(),
                is_enabled: true,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.extractors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extractors.len()
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn suffix_of(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| format!(".{}", ext.to_string_lossy().to_lowercase()))
}

fn type_matches(type_name: &str, filter: &str) -> bool {
    type_name.to_lowercase().contains(&filter.to_lowercase())
}
