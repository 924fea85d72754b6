//! `GetDirectoryListing`: one page of a directory's supported files.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Instant;
use tracing::info;

use crate::config::Config;
use crate::listing::list_directory;
use crate::models::{round2, DirectoryEntryMeta};
use crate::progress::ScanProgress;
use crate::registry::ExtractorRegistry;
use crate::search::{optional_param, requested_directories, valid_directories, RequestError};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListingQuery {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub file_type: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DirectoryListingResponse {
    pub directory: String,
    pub all_directories: Vec<String>,
    pub total_files: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
    pub showing_files: usize,
    pub file_type_filter: Option<String>,
    pub elapsed_time_seconds: f64,
    pub files: Vec<DirectoryEntryMeta>,
}

/// Check `page` and `limit`, filling in the configured default limit.
pub fn validate_paging(
    page: Option<i64>,
    limit: Option<i64>,
    default_limit: usize,
    max_limit: usize,
) -> Result<(usize, usize), RequestError> {
    let page = page.unwrap_or(1);
    if page < 1 {
        return Err(RequestError::InvalidParameter(format!(
            "page must be >= 1, got {}",
            page
        )));
    }
    let limit = limit.unwrap_or(default_limit as i64);
    if limit < 1 || limit > max_limit as i64 {
        return Err(RequestError::InvalidParameter(format!(
            "limit must be between 1 and {}, got {}",
            max_limit, limit
        )));
    }
    Ok((page as usize, limit as usize))
}

/// Run a `GetDirectoryListing` request.
///
/// Only the first valid directory is listed; the others are named in
/// `all_directories`.
pub async fn get_directory_listing(
    config: &Config,
    registry: &ExtractorRegistry,
    query: ListingQuery,
    progress: &dyn ScanProgress,
) -> Result<DirectoryListingResponse> {
    let started = Instant::now();
    let path = optional_param(query.path);
    let file_type = optional_param(query.file_type);
    info!(
        path = ?path,
        page = ?query.page,
        limit = ?query.limit,
        file_type = ?file_type,
        "directory listing request"
    );
    let (page, limit) = validate_paging(
        query.page,
        query.limit,
        config.listing.default_limit,
        config.listing.max_limit,
    )?;
    progress.info(format!(
        "Listing {}",
        path.as_deref().unwrap_or("all configured directories")
    ));

    let candidates = requested_directories(config, path.as_deref());
    let dirs = valid_directories(&candidates, progress);
    let Some(directory) = dirs.first() else {
        tracing::error!("no valid directory to list");
        progress.error("No valid directory".to_string());
        return Err(RequestError::NoValidDirectory.into());
    };
    if dirs.len() > 1 {
        progress.info(format!(
            "Showing only the first of {} directories: {}",
            dirs.len(),
            directory.display()
        ));
    }

    let listing = list_directory(
        registry,
        directory,
        file_type.as_deref(),
        page,
        limit,
        config.listing.max_limit,
        config.search.follow_symlinks,
    )
    .await;

    let elapsed = started.elapsed().as_secs_f64();
    let showing_files = listing.entries.len();
    info!(
        directory = %directory.display(),
        showing_files,
        total_files = listing.total_files,
        elapsed_secs = elapsed,
        "directory listing completed"
    );
    progress.info(format!(
        "Listing complete: showing {} of {} files",
        showing_files, listing.total_files
    ));

    Ok(DirectoryListingResponse {
        directory: directory.display().to_string(),
        all_directories: dirs.iter().map(|d| d.display().to_string()).collect(),
        total_files: listing.total_files,
        page: listing.page,
        limit: listing.limit,
        total_pages: listing.total_pages,
        showing_files,
        file_type_filter: file_type,
        elapsed_time_seconds: round2(elapsed),
        files: listing.entries,
    })
}

/// CLI entry point: print one listing page as JSON.
pub async fn run_list(
    config: &Config,
    registry: &ExtractorRegistry,
    path: Option<&Path>,
    page: Option<i64>,
    limit: Option<i64>,
    file_type: Option<String>,
    progress: &dyn ScanProgress,
) -> Result<()> {
    let query = ListingQuery {
        path: path.map(|p| p.display().to_string()),
        page,
        limit,
        file_type,
    };
    let payload = match get_directory_listing(config, registry, query, progress).await {
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
