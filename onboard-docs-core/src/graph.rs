//! REST client for the document-library API (Graph-style `sites`/`drives` endpoints).
//!
//! Every drive-relative path goes through [`encode_drive_path`] before it is placed in
//! a URL: library and employee folder names routinely contain spaces and Polish
//! characters.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, error, info};

use crate::contract::{CreateFolderOutcome, DriveApi, DriveDescriptor, DriveItem, SiteDescriptor};
use crate::error::{DocError, Result};

pub const DEFAULT_GRAPH_BASE: &str = "https://graph.microsoft.com/v1.0";

/// Percent-encode each segment of a slash-delimited path, keeping the slashes.
/// Leading, trailing and repeated slashes are dropped.
pub fn encode_drive_path(path: &str) -> String {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

pub fn site_url(base: &str, hostname: &str, site_path: &str) -> String {
    format!(
        "{base}/sites/{hostname}:/sites/{}",
        encode_drive_path(site_path)
    )
}

pub fn drives_url(base: &str, site_id: &str) -> String {
    format!("{base}/sites/{site_id}/drives")
}

pub fn item_url(base: &str, drive_id: &str, path: &str) -> String {
    format!("{base}/drives/{drive_id}/root:/{}", encode_drive_path(path))
}

/// Children collection of `parent_path`, or of the drive root when it is empty.
pub fn children_url(base: &str, drive_id: &str, parent_path: &str) -> String {
    let encoded = encode_drive_path(parent_path);
    if encoded.is_empty() {
        format!("{base}/drives/{drive_id}/root/children")
    } else {
        format!("{base}/drives/{drive_id}/root:/{encoded}:/children")
    }
}

pub fn content_url(base: &str, drive_id: &str, path: &str) -> String {
    format!(
        "{base}/drives/{drive_id}/root:/{}:/content",
        encode_drive_path(path)
    )
}

#[derive(Debug, Deserialize)]
struct Collection<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

pub struct GraphClient {
    http: reqwest::Client,
    base_url: String,
}

impl GraphClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_GRAPH_BASE)
    }

    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Default for GraphClient {
    fn default() -> Self {
        Self::new()
    }
}

async fn remote_error(method: &str, url: &str, response: Response) -> DocError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    error!(method, url, status = %status, "Remote API call failed");
    DocError::Remote {
        method: method.to_string(),
        url: url.to_string(),
        status: status.as_u16(),
        body,
    }
}

async fn read_json<T: DeserializeOwned>(method: &str, url: &str, response: Response) -> Result<T> {
    if response.status().is_success() {
        Ok(response.json::<T>().await?)
    } else {
        Err(remote_error(method, url, response).await)
    }
}

/// Like [`read_json`], but a 404 is a legitimate `None`.
async fn read_optional_json<T: DeserializeOwned>(
    method: &str,
    url: &str,
    response: Response,
) -> Result<Option<T>> {
    if response.status() == StatusCode::NOT_FOUND {
        debug!(method, url, "Remote lookup returned 404");
        return Ok(None);
    }
    read_json(method, url, response).await.map(Some)
}

#[async_trait]
impl DriveApi for GraphClient {
    async fn get_site(
        &self,
        token: &str,
        hostname: &str,
        site_path: &str,
    ) -> Result<Option<SiteDescriptor>> {
        let url = site_url(&self.base_url, hostname, site_path);
        debug!(url = %url, "GET site");
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        read_optional_json("GET", &url, response).await
    }

    async fn list_drives(&self, token: &str, site_id: &str) -> Result<Vec<DriveDescriptor>> {
        let url = drives_url(&self.base_url, site_id);
        debug!(url = %url, "GET drives");
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        let drives: Collection<DriveDescriptor> = read_json("GET", &url, response).await?;
        Ok(drives.value)
    }

    async fn get_item(
        &self,
        token: &str,
        drive_id: &str,
        path: &str,
    ) -> Result<Option<DriveItem>> {
        let url = item_url(&self.base_url, drive_id, path);
        debug!(url = %url, "GET item");
        let response = self.http.get(&url).bearer_auth(token).send().await?;
        read_optional_json("GET", &url, response).await
    }

    async fn create_folder(
        &self,
        token: &str,
        drive_id: &str,
        parent_path: &str,
        name: &str,
    ) -> Result<CreateFolderOutcome> {
        let url = children_url(&self.base_url, drive_id, parent_path);
        let body = json!({
            "name": name,
            "folder": {},
            "@microsoft.graph.conflictBehavior": "fail",
        });
        debug!(url = %url, folder = name, "POST children");
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        if response.status() == StatusCode::CONFLICT {
            info!(url = %url, folder = name, "Folder create answered 409");
            return Ok(CreateFolderOutcome::AlreadyExists);
        }
        let item: DriveItem = read_json("POST", &url, response).await?;
        Ok(CreateFolderOutcome::Created(item))
    }

    async fn put_content(
        &self,
        token: &str,
        drive_id: &str,
        path: &str,
        content: Vec<u8>,
    ) -> Result<DriveItem> {
        let url = content_url(&self.base_url, drive_id, path);
        debug!(url = %url, size = content.len(), "PUT content");
        let response = self
            .http
            .put(&url)
            .bearer_auth(token)
            .header(reqwest::header::CONTENT_TYPE, "application/octet-stream")
            .body(content)
            .send()
            .await?;
        read_json("PUT", &url, response).await
    }
}
