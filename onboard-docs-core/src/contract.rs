//! # contract: trait seams and plain data shared across the pipelines
//!
//! This module defines the three capabilities onboard-docs depends on but does not
//! implement itself, plus the data that crosses them:
//!
//! - [`CredentialProvider`]: obtains a bearer credential for the document-library API.
//! - [`DriveApi`]: the handful of REST calls needed to resolve a site/drive, probe and
//!   create folders, and put file content.
//! - [`Converter`]: turns a rendered document into PDF bytes.
//!
//! ## Mocking & Testing
//! - Every trait is annotated for `mockall`, so tests get `MockCredentialProvider`,
//!   `MockDriveApi` and `MockConverter` without touching the network or spawning a
//!   process.
//!
//! ## Outcomes vs errors
//! - "Not found" answers of [`DriveApi`] lookups are `Ok(None)`: the caller decides
//!   whether that is fatal (site lookup) or expected (folder probe).
//! - A folder-create conflict is [`CreateFolderOutcome::AlreadyExists`], not an error.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use mockall::automock;
use serde::Deserialize;

use crate::credentials::BearerToken;
use crate::error::Result;

/// Site descriptor as returned by `GET /sites/{hostname}:/sites/{path}`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SiteDescriptor {
    pub id: String,
    #[serde(default, rename = "displayName")]
    pub display_name: Option<String>,
    #[serde(default, rename = "webUrl")]
    pub web_url: Option<String>,
}

/// A document library under a site.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveDescriptor {
    pub id: String,
    #[serde(default)]
    pub name: String,
}

/// File or folder inside a drive.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DriveItem {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, rename = "webUrl")]
    pub web_url: Option<String>,
}

impl DriveItem {
    /// What an operator wants to see after an upload: the web URL, else the name.
    pub fn display_location(&self) -> String {
        self.web_url.clone().unwrap_or_else(|| self.name.clone())
    }
}

/// Result of a create-folder request sent with `conflictBehavior = fail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreateFolderOutcome {
    Created(DriveItem),
    /// The server answered 409: someone else created the folder first.
    AlreadyExists,
}

/// Kinds of generated files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    PdfForm,
    Docx,
    DocxPdf,
}

impl ArtifactKind {
    pub fn extension(self) -> &'static str {
        match self {
            ArtifactKind::PdfForm | ArtifactKind::DocxPdf => "pdf",
            ArtifactKind::Docx => "docx",
        }
    }
}

/// A generated file in the output directory. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub kind: ArtifactKind,
    pub path: PathBuf,
}

/// Exchanges configured client credentials for a short-lived bearer token.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn acquire(&self) -> Result<BearerToken>;
}

/// Minimal document-library REST surface.
///
/// `token` is the raw bearer value; callers obtain it from a
/// [`RemoteSession`](crate::session::RemoteSession), which checks expiry first.
/// Paths are drive-relative, slash-delimited and *not* yet percent-encoded.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// `Ok(None)` when the site does not exist (404).
    async fn get_site(
        &self,
        token: &str,
        hostname: &str,
        site_path: &str,
    ) -> Result<Option<SiteDescriptor>>;

    async fn list_drives(&self, token: &str, site_id: &str) -> Result<Vec<DriveDescriptor>>;

    /// Existence probe; `Ok(None)` when nothing lives at `path` (404).
    async fn get_item(&self, token: &str, drive_id: &str, path: &str)
        -> Result<Option<DriveItem>>;

    /// Create folder `name` under `parent_path` (drive root when empty), failing on conflict.
    async fn create_folder(
        &self,
        token: &str,
        drive_id: &str,
        parent_path: &str,
        name: &str,
    ) -> Result<CreateFolderOutcome>;

    /// Create or replace the content at `path` in a single request.
    async fn put_content(
        &self,
        token: &str,
        drive_id: &str,
        path: &str,
        content: Vec<u8>,
    ) -> Result<DriveItem>;
}

/// Converts a document on disk into PDF bytes.
///
/// `out_dir` is a scratch directory the converter may write into; it is owned by
/// the caller and removed afterwards.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Converter: Send + Sync {
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<Vec<u8>>;
}
