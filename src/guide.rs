//! Usage guide served as the `search-help://guide` resource.

use crate::config::ListingConfig;
use crate::registry::ExtractorRegistry;

pub const GUIDE_URI: &str = "search-help://guide";
pub const GUIDE_NAME: &str = "File search guide";

/// Render the guide for the running configuration.
pub fn render_guide(registry: &ExtractorRegistry, listing: &ListingConfig) -> String {
    let types: Vec<String> = registry
        .supported_file_types()
        .iter()
        .map(|t| format!("- {} ({})", t.name, t.extensions.join(", ")))
        .collect();

    format!(
        "# File search guide

Search slide decks, PDFs, Word documents and plain-text files for a keyword.

## How to use
1. Ask in plain language, e.g. \"find documents about kiosk costs\".
2. The keyword is matched as a whole word, ignoring case, in every supported file.
3. Results are ordered by the number of matches, highest first.

## Tips
- Specific keywords give more precise results.
- Name a directory to narrow the search (\"budget documents in the marketing folder\").
- Name a file type to search only that format (\"contracts in PDFs\").
- Large directory trees take a while; prefer a specific path.

## Supported file types
{types}

## Paging
Directory listings are paged. Pass a page number and a page size:
- Defaults: page = 1, limit = {default_limit}
- Maximum limit: {max_limit}
",
        types = types.join("\n"),
        default_limit = listing.default_limit,
        max_limit = listing.max_limit,
    )
}
