//! Serde models for the storage API's JSON shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Marker site id for items that live on the caller's personal drive.
pub const PERSONAL_SITE_ID: &str = "personal";

/// One page of a paginated listing: a `value` array plus an optional
/// cursor to the next page.
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Page<T> {
    #[serde(default)]
    pub value: Vec<T>,
    #[serde(default, rename = "@odata.nextLink")]
    pub next_link: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Site {
    pub id: String,
    #[serde(default, rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, rename = "webUrl", skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Drive {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParentReference {
    #[serde(default, rename = "driveId", skip_serializing_if = "Option::is_none")]
    pub drive_id: Option<String>,
    #[serde(default, rename = "siteId", skip_serializing_if = "Option::is_none")]
    pub site_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FileDetail {
    #[serde(default, rename = "mimeType", skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// A discovered file.
///
/// The item id is the identity used for deduplication across every
/// discovery path. `download_url` appears only after enrichment and
/// `extracted_text` only after summarization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileItem {
    pub id: String,
    pub name: String,
    #[serde(default, rename = "webUrl", skip_serializing_if = "Option::is_none")]
    pub web_url: Option<String>,
    #[serde(default, rename = "parentReference")]
    pub parent: ParentReference,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileDetail>,
    /// Present (possibly empty) when the item is a folder facet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder: Option<Value>,
    #[serde(
        default,
        rename = "@microsoft.graph.downloadUrl",
        skip_serializing_if = "Option::is_none"
    )]
    pub download_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extracted_text: Option<String>,
}

impl FileItem {
    pub fn is_folder(&self) -> bool {
        self.folder.is_some()
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.file.as_ref().and_then(|f| f.mime_type.as_deref())
    }

    pub fn drive_id(&self) -> Option<&str> {
        self.parent.drive_id.as_deref()
    }

    pub fn site_id(&self) -> Option<&str> {
        self.parent.site_id.as_deref()
    }

    pub fn tag_site(&mut self, site_id: &str) {
        self.parent.site_id = Some(site_id.to_string());
    }

    pub fn surrogate(&self) -> &str {
        self.extracted_text.as_deref().unwrap_or("")
    }

    /// The cheap text stand-in used when no content can be extracted.
    pub fn fallback_surrogate(&self) -> String {
        format!("{} {}", self.name, self.web_url.as_deref().unwrap_or(""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn search_hit_deserializes() {
        let item: FileItem = serde_json::from_value(json!({
            "id": "01ABCDEF",
            "name": "Budget.xlsx",
            "webUrl": "https://contoso.sharepoint.com/Budget.xlsx",
            "parentReference": {"driveId": "b!drive", "siteId": "contoso.sharepoint.com,1,2"},
            "file": {"mimeType": "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"},
            "@microsoft.graph.downloadUrl": "https://download.example/abc"
        }))
        .unwrap();
        assert_eq!(item.id, "01ABCDEF");
        assert_eq!(item.drive_id(), Some("b!drive"));
        assert!(!item.is_folder());
        assert!(item.mime_type().unwrap().contains("spreadsheetml"));
        assert_eq!(item.download_url.as_deref(), Some("https://download.example/abc"));
    }

    #[test]
    fn folder_facet_is_detected() {
        let item: FileItem = serde_json::from_value(json!({
            "id": "02",
            "name": "Reports",
            "folder": {"childCount": 12}
        }))
        .unwrap();
        assert!(item.is_folder());
        assert!(item.mime_type().is_none());
    }

    #[test]
    fn page_carries_next_link() {
        let page: Page<Site> = serde_json::from_value(json!({
            "value": [{"id": "site-1"}],
            "@odata.nextLink": "https://graph.microsoft.com/v1.0/sites?$skiptoken=x"
        }))
        .unwrap();
        assert_eq!(page.value.len(), 1);
        assert!(page.next_link.is_some());

        let last: Page<Site> = serde_json::from_value(json!({"value": []})).unwrap();
        assert!(last.next_link.is_none());
    }

    #[test]
    fn fallback_surrogate_is_name_plus_link() {
        let item: FileItem = serde_json::from_value(json!({
            "id": "03",
            "name": "Notes.txt",
            "webUrl": "https://contoso-my.sharepoint.com/Notes.txt"
        }))
        .unwrap();
        assert_eq!(
            item.fallback_surrogate(),
            "Notes.txt https://contoso-my.sharepoint.com/Notes.txt"
        );
    }
}
