//! Metadata enrichment: full item metadata with download URLs.

use futures::stream::{self, StreamExt};
use tracing::{debug, warn};

use super::MAX_CONCURRENCY;
use crate::auth::Session;
use crate::graph::{DriveSource, FileItem};

/// Fetch full metadata for every item, concurrently and loss-tolerantly.
///
/// Items whose fetch fails, that have no parent drive to fetch against, or
/// whose metadata marks a folder are dropped. The pre-enrichment site tag
/// is carried over when the fresh metadata lacks one.
pub async fn enrich<G: DriveSource + ?Sized>(
    source: &G,
    session: &Session,
    items: Vec<FileItem>,
) -> Vec<FileItem> {
    let enriched = stream::iter(items.into_iter().map(|item| async move {
        let Some(drive_id) = item.drive_id().map(str::to_string) else {
            warn!(item = %item.id, "item has no parent drive; dropping");
            return None;
        };
        match source.item_metadata(session, &drive_id, &item.id).await {
            Ok(Some(mut full)) => {
                if full.site_id().is_none() {
                    if let Some(site) = item.site_id() {
                        full.tag_site(site);
                    }
                }
                Some(full)
            }
            Ok(None) => {
                warn!(item = %item.id, "metadata unavailable; dropping");
                None
            }
            Err(err) => {
                warn!(item = %item.id, error = %err, "metadata fetch failed; dropping");
                None
            }
        }
    }))
    .buffer_unordered(MAX_CONCURRENCY)
    .collect::<Vec<Option<FileItem>>>()
    .await;

    enriched
        .into_iter()
        .flatten()
        .filter(|item| {
            if item.is_folder() {
                debug!(item = %item.id, "folder filtered out");
                false
            } else {
                true
            }
        })
        .collect()
}
