//! Storage-API boundary: wire models and the Graph client.

mod client;
mod types;

pub use client::GraphClient;
pub use types::{Drive, FileDetail, FileItem, Page, ParentReference, Site, PERSONAL_SITE_ID};

use async_trait::async_trait;

use crate::auth::Session;
use crate::error::PipelineError;

/// The read surface of the storage API the pipeline runs against.
///
/// [`GraphClient`] is the production implementation; tests substitute
/// in-memory fakes.
#[async_trait]
pub trait DriveSource: Send + Sync {
    /// Enumerate every site visible to the caller. Partial results are
    /// acceptable: a failed page ends pagination, it is not an error.
    async fn discover_sites(&self, session: &Session) -> Result<Vec<Site>, PipelineError>;

    /// List the drives owned by a site.
    async fn list_drives(
        &self,
        session: &Session,
        site_id: &str,
    ) -> Result<Vec<Drive>, PipelineError>;

    /// Search the caller's personal drive.
    async fn search_personal(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<FileItem>, PipelineError>;

    /// Search one drive.
    async fn search_drive(
        &self,
        session: &Session,
        drive_id: &str,
        query: &str,
    ) -> Result<Vec<FileItem>, PipelineError>;

    /// The caller's recently accessed files, tagged with the personal
    /// sentinel site id.
    async fn recent_files(&self, session: &Session) -> Result<Vec<FileItem>, PipelineError>;

    /// Full metadata for one item, including its short-lived download URL.
    /// `None` when the item cannot be resolved.
    async fn item_metadata(
        &self,
        session: &Session,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Option<FileItem>, PipelineError>;
}
