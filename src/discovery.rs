//! Lazy discovery of searchable files under a root directory.
//!
//! [`Discovery`] wraps a `walkdir` iterator: recursive mode is a streaming
//! pre-order walk, non-recursive mode visits only the root's direct
//! children. Every yielded path is a regular file accepted by the
//! [`ExtractorRegistry`] (optionally narrowed by a type filter).
//!
//! Unreadable subtrees are logged and skipped. An unreadable root ends the
//! sequence immediately, which callers see as "no files found".

use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

use crate::registry::ExtractorRegistry;

/// One-shot iterator over accepted file paths.
pub struct Discovery<'a> {
    registry: &'a ExtractorRegistry,
    type_filter: Option<String>,
    walker: walkdir::IntoIter,
    finished: bool,
}

/// Options that shape the walk.
#[derive(Debug, Clone, Copy, Default)]
pub struct WalkOptions {
    pub recursive: bool,
    pub follow_symlinks: bool,
}

/// Start discovering files under `root`.
///
/// Entries within each directory are visited in file-name order, so
/// repeated listings of an unchanged directory paginate identically.
pub fn discover<'a>(
    registry: &'a ExtractorRegistry,
    root: &Path,
    type_filter: Option<&str>,
    options: WalkOptions,
) -> Discovery<'a> {
    let mut walk = WalkDir::new(root)
        .min_depth(1)
        .follow_links(options.follow_symlinks)
        .sort_by_file_name();
    if !options.recursive {
        walk = walk.max_depth(1);
    }
    Discovery {
        registry,
        type_filter: type_filter.map(str::to_string),
        walker: walk.into_iter(),
        finished: false,
    }
}

impl Iterator for Discovery<'_> {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        if self.finished {
            return None;
        }
        loop {
            let entry = match self.walker.next() {
                None => {
                    self.finished = true;
                    return None;
                }
                Some(Ok(entry)) => entry,
                Some(Err(e)) => {
                    if e.depth() == 0 {
                        warn!(error = %e, "cannot read search root");
                        self.finished = true;
                        return None;
                    }
                    warn!(error = %e, "skipping unreadable path during discovery");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if self
                .registry
                .accepts(entry.path(), self.type_filter.as_deref())
            {
                return Some(entry.into_path());
            }
        }
    }
}
