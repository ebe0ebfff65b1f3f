//! Graph API client built on the resilient HTTP caller.

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::{error, info, warn};
use urlencoding::encode;

use super::types::{Drive, FileItem, Page, Site, PERSONAL_SITE_ID};
use super::DriveSource;
use crate::auth::Session;
use crate::config::GraphConfig;
use crate::error::PipelineError;
use crate::http::HttpCaller;

pub struct GraphClient {
    http: HttpCaller,
    config: GraphConfig,
}

impl GraphClient {
    pub fn new(http: HttpCaller, config: GraphConfig) -> Self {
        Self { http, config }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// GET one page of a listing; `None` on any non-success status.
    async fn get_page<T: DeserializeOwned>(
        &self,
        session: &Session,
        url: &str,
    ) -> Result<Option<Page<T>>, PipelineError> {
        let resp = self.http.call(session, Method::GET, url, None).await?;
        if !resp.status().is_success() {
            warn!(url, status = %resp.status(), "page fetch failed");
            return Ok(None);
        }
        Ok(Some(resp.json().await?))
    }

    async fn search_url(
        &self,
        session: &Session,
        url: &str,
    ) -> Result<Vec<FileItem>, PipelineError> {
        match self.get_page::<FileItem>(session, url).await? {
            Some(page) => Ok(page.value),
            None => Ok(Vec::new()),
        }
    }

    /// The signed-in user's address, for notifications and access checks.
    pub async fn user_email(&self, session: &Session) -> Result<Option<String>, PipelineError> {
        let url = self.endpoint("me");
        let resp = self.http.call(session, Method::GET, &url, None).await?;
        if !resp.status().is_success() {
            return Ok(None);
        }
        let profile: Value = resp.json().await?;
        Ok(profile
            .get("mail")
            .and_then(|m| m.as_str())
            .or_else(|| profile.get("userPrincipalName").and_then(|m| m.as_str()))
            .map(str::to_string))
    }

    /// Probe whether the caller can reach a site item's permissions.
    ///
    /// Always passes when the check is disabled by config; personal-drive
    /// items cannot be probed and fail closed.
    pub async fn check_file_access(
        &self,
        session: &Session,
        item_id: &str,
        site_id: Option<&str>,
    ) -> bool {
        if !self.config.perform_access_check {
            return true;
        }
        let Some(site) = site_id.filter(|s| *s != PERSONAL_SITE_ID) else {
            return false;
        };
        let url = self.endpoint(&format!("sites/{site}/drive/items/{item_id}/permissions"));
        match self.http.call(session, Method::GET, &url, None).await {
            Ok(resp) => resp.status().is_success(),
            Err(err) => {
                warn!(item_id, error = %err, "access check failed");
                false
            }
        }
    }

    /// Send an HTML mail as the signed-in user. Fire-and-forget: the
    /// returned flag reports acceptance, failures are logged.
    pub async fn send_mail(
        &self,
        session: &Session,
        to: &str,
        subject: &str,
        html: &str,
    ) -> Result<bool, PipelineError> {
        let payload = json!({
            "message": {
                "subject": subject,
                "body": {"contentType": "HTML", "content": html},
                "toRecipients": [{"emailAddress": {"address": to}}]
            },
            "saveToSentItems": true
        });
        let url = self.endpoint("me/sendMail");
        let resp = self
            .http
            .call(session, Method::POST, &url, Some(&payload))
            .await?;
        if resp.status() == StatusCode::ACCEPTED {
            info!(to, "notification mail sent");
            Ok(true)
        } else {
            error!(to, status = %resp.status(), "mail send failed");
            Ok(false)
        }
    }

    /// Mail a single file link to a recipient.
    pub async fn send_file_notification(
        &self,
        session: &Session,
        to: &str,
        item: &FileItem,
    ) -> Result<bool, PipelineError> {
        let link = item.web_url.as_deref().unwrap_or("");
        self.send_mail(
            session,
            to,
            &format!("Here is the file: {}", item.name),
            &format!("<p><a href='{link}'>{}</a></p>", item.name),
        )
        .await
    }

    /// Mail a list of file links to a recipient.
    pub async fn send_files_notification(
        &self,
        session: &Session,
        to: &str,
        items: &[FileItem],
    ) -> Result<bool, PipelineError> {
        let links: String = items
            .iter()
            .map(|f| {
                format!(
                    "<p><a href='{}'>{}</a></p>",
                    f.web_url.as_deref().unwrap_or(""),
                    f.name
                )
            })
            .collect();
        self.send_mail(
            session,
            to,
            "Your requested files",
            &format!("<p>Here are the files you requested:</p>{links}"),
        )
        .await
    }
}

#[async_trait]
impl DriveSource for GraphClient {
    async fn discover_sites(&self, session: &Session) -> Result<Vec<Site>, PipelineError> {
        let mut sites = Vec::new();
        let mut url = Some(self.endpoint("sites?search=*"));
        while let Some(current) = url {
            match self.get_page::<Site>(session, &current).await {
                Ok(Some(page)) => {
                    sites.extend(page.value);
                    url = page.next_link;
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(url = %current, error = %err, "site discovery stopped early");
                    break;
                }
            }
        }
        Ok(sites)
    }

    async fn list_drives(
        &self,
        session: &Session,
        site_id: &str,
    ) -> Result<Vec<Drive>, PipelineError> {
        let url = self.endpoint(&format!("sites/{site_id}/drives"));
        match self.get_page::<Drive>(session, &url).await? {
            Some(page) => Ok(page.value),
            None => Ok(Vec::new()),
        }
    }

    async fn search_personal(
        &self,
        session: &Session,
        query: &str,
    ) -> Result<Vec<FileItem>, PipelineError> {
        let url = self.endpoint(&format!("me/drive/root/search(q='{}')", encode(query)));
        self.search_url(session, &url).await
    }

    async fn search_drive(
        &self,
        session: &Session,
        drive_id: &str,
        query: &str,
    ) -> Result<Vec<FileItem>, PipelineError> {
        let url = self.endpoint(&format!("drives/{drive_id}/search(q='{}')", encode(query)));
        self.search_url(session, &url).await
    }

    async fn recent_files(&self, session: &Session) -> Result<Vec<FileItem>, PipelineError> {
        let url = self.endpoint("me/drive/recent");
        let mut items = self.search_url(session, &url).await?;
        for item in &mut items {
            item.tag_site(PERSONAL_SITE_ID);
        }
        Ok(items)
    }

    async fn item_metadata(
        &self,
        session: &Session,
        drive_id: &str,
        item_id: &str,
    ) -> Result<Option<FileItem>, PipelineError> {
        let url = self.endpoint(&format!("drives/{drive_id}/items/{item_id}"));
        let resp = self.http.call(session, Method::GET, &url, None).await?;
        if !resp.status().is_success() {
            warn!(item_id, status = %resp.status(), "failed to fetch full metadata");
            return Ok(None);
        }
        Ok(Some(resp.json().await?))
    }
}
