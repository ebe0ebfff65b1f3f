//! Bounded fan-out search across the personal drive and every site drive.

use std::collections::HashSet;

use futures::stream::{self, StreamExt};
use tracing::{info, warn};

use super::query::SearchQuery;
use super::MAX_CONCURRENCY;
use crate::auth::Session;
use crate::graph::{DriveSource, FileItem};

/// Search everywhere the caller can see, deduplicated by item identity.
///
/// The personal drive is searched first; each discovered site's drives are
/// then searched concurrently (at most [`MAX_CONCURRENCY`] calls in
/// flight). Results are merged and deduplicated at the single collection
/// point, so completion order never affects the identity set. When nothing
/// at all is found, the caller's recently accessed files stand in.
pub async fn fan_out_search<G: DriveSource + ?Sized>(
    source: &G,
    session: &Session,
    query: &SearchQuery,
) -> Vec<FileItem> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut results: Vec<FileItem> = Vec::new();

    match source.search_personal(session, &query.normalized).await {
        Ok(items) => {
            for item in items {
                push_unseen(&mut seen, &mut results, item);
            }
        }
        Err(err) => warn!(error = %err, "personal drive search failed"),
    }

    let sites = match source.discover_sites(session).await {
        Ok(sites) => sites,
        Err(err) => {
            warn!(error = %err, "site discovery failed");
            Vec::new()
        }
    };

    // (drive id, owning site id) pairs, one search task each.
    let mut targets: Vec<(String, String)> = Vec::new();
    for site in &sites {
        match source.list_drives(session, &site.id).await {
            Ok(drives) => {
                targets.extend(drives.into_iter().map(|d| (d.id, site.id.clone())));
            }
            Err(err) => warn!(site = %site.id, error = %err, "listing drives failed"),
        }
    }

    let mut searches = stream::iter(targets.into_iter().map(|(drive_id, site_id)| {
        let normalized = query.normalized.clone();
        async move {
            let found = source.search_drive(session, &drive_id, &normalized).await;
            (drive_id, site_id, found)
        }
    }))
    .buffer_unordered(MAX_CONCURRENCY);

    while let Some((drive_id, site_id, found)) = searches.next().await {
        match found {
            Ok(items) => {
                for mut item in items {
                    item.tag_site(&site_id);
                    push_unseen(&mut seen, &mut results, item);
                }
            }
            Err(err) => warn!(drive = %drive_id, error = %err, "drive search failed"),
        }
    }

    if results.is_empty() {
        info!("no search hits; falling back to recently accessed files");
        match source.recent_files(session).await {
            Ok(items) => {
                for item in items {
                    push_unseen(&mut seen, &mut results, item);
                }
            }
            Err(err) => warn!(error = %err, "recent files fallback failed"),
        }
    }

    results
}

fn push_unseen(seen: &mut HashSet<String>, results: &mut Vec<FileItem>, item: FileItem) {
    if seen.insert(item.id.clone()) {
        results.push(item);
    }
}
