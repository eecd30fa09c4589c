//! Idempotent folder provisioning.
//!
//! `ensure_folder` may run any number of times, from any number of concurrent
//! processes, and always converges on exactly one folder. There is no client-side
//! locking: the create request carries `conflictBehavior = fail`, and a conflict
//! answer means another actor got there first.

use tracing::{debug, info};

use crate::contract::{CreateFolderOutcome, DriveApi};
use crate::error::Result;
use crate::session::RemoteSession;

/// `parent/name`, or just `name` when the parent is the drive root.
pub fn compose_path(parent_path: &str, folder_name: &str) -> String {
    let parent = parent_path.trim_matches('/');
    if parent.is_empty() {
        folder_name.to_string()
    } else {
        format!("{parent}/{folder_name}")
    }
}

/// Make sure `parent_path/folder_name` exists and return that path.
///
/// Callers cannot tell (and need not care) whether the folder was created now.
pub async fn ensure_folder<A>(
    api: &A,
    session: &RemoteSession,
    drive_id: &str,
    parent_path: &str,
    folder_name: &str,
) -> Result<String>
where
    A: DriveApi + ?Sized,
{
    let full_path = compose_path(parent_path, folder_name);
    let token = session.bearer()?;

    if api.get_item(token, drive_id, &full_path).await?.is_some() {
        debug!(path = %full_path, "Folder already present");
        return Ok(full_path);
    }

    let parent = parent_path.trim_matches('/');
    match api.create_folder(token, drive_id, parent, folder_name).await? {
        CreateFolderOutcome::Created(item) => {
            info!(path = %full_path, item_id = %item.id, "Created folder");
        }
        CreateFolderOutcome::AlreadyExists => {
            info!(path = %full_path, "Folder created concurrently by another run");
        }
    }
    Ok(full_path)
}
