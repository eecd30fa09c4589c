//! # uploader: push generated artifacts into a resolved drive folder
//!
//! Files are sent with a single create-or-replace `PUT` each, so re-uploading the same
//! artifact overwrites it rather than producing a duplicate.
//!
//! ## Known limitation
//! - Single-request upload is only meant for small files (about 4 MiB). Larger files
//!   need a resumable upload session, which is not implemented; they are logged with a
//!   warning and still attempted.
//!
//! ## Directory uploads
//! - Only immediate children of the directory are considered (no recursion).
//! - Only files with a `.pdf` extension, compared case-insensitively.
//! - Each file is uploaded independently; one failure is reported in its own
//!   [`UploadOutcome`] and does not stop the others.

use std::fs;
use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::contract::{DriveApi, DriveItem};
use crate::error::{DocError, Result};
use crate::session::RemoteSession;

/// Threshold above which a resumable upload session would be required.
pub const SIMPLE_UPLOAD_LIMIT: u64 = 4 * 1024 * 1024;

/// Per-file result of a directory upload.
#[derive(Debug)]
pub struct UploadOutcome {
    pub local_path: PathBuf,
    pub remote_path: String,
    pub result: Result<DriveItem>,
}

impl UploadOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Upload one local file to `dest_path` (drive-relative, including the file name).
pub async fn upload_file<A>(
    api: &A,
    session: &RemoteSession,
    drive_id: &str,
    dest_path: &str,
    local_file: &Path,
) -> Result<DriveItem>
where
    A: DriveApi + ?Sized,
{
    let content = fs::read(local_file).map_err(|e| {
        error!(error = ?e, path = %local_file.display(), "Failed to read file for upload");
        DocError::Io(e)
    })?;
    if content.len() as u64 > SIMPLE_UPLOAD_LIMIT {
        warn!(
            path = %local_file.display(),
            size = content.len(),
            limit = SIMPLE_UPLOAD_LIMIT,
            "File exceeds the simple-upload limit; resumable upload sessions are not supported"
        );
    }
    info!(local = %local_file.display(), remote = %dest_path, size = content.len(), "Uploading file");
    let item = api
        .put_content(session.bearer()?, drive_id, dest_path, content)
        .await?;
    info!(remote = %dest_path, location = %item.display_location(), "Upload complete");
    Ok(item)
}

/// PDF files directly inside `dir`, sorted by path.
pub fn select_pdf_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut selected = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let is_pdf = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if is_pdf {
            selected.push(path);
        }
    }
    selected.sort();
    Ok(selected)
}

/// Upload every PDF directly inside `local_dir` into `dest_folder`.
pub async fn upload_directory<A>(
    api: &A,
    session: &RemoteSession,
    drive_id: &str,
    dest_folder: &str,
    local_dir: &Path,
) -> Result<Vec<UploadOutcome>>
where
    A: DriveApi + ?Sized,
{
    let files = select_pdf_files(local_dir)?;
    info!(dir = %local_dir.display(), count = files.len(), "Selected PDF files for upload");

    let dest_folder = dest_folder.trim_matches('/');
    let uploads = files.into_iter().map(|local_path| async move {
        let file_name = local_path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote_path = if dest_folder.is_empty() {
            file_name
        } else {
            format!("{dest_folder}/{file_name}")
        };
        let result = upload_file(api, session, drive_id, &remote_path, &local_path).await;
        if let Err(e) = &result {
            error!(file = %local_path.display(), error = %e, "Upload failed");
        }
        UploadOutcome {
            local_path,
            remote_path,
            result,
        }
    });
    Ok(join_all(uploads).await)
}
