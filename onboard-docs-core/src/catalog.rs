//! Maps a human-readable site path and library name to stable identifiers.
//!
//! Both lookups are read-only and safe to repeat.

use tracing::{error, info};

use crate::contract::DriveApi;
use crate::error::{DocError, Result};
use crate::session::{CatalogHandle, RemoteSession};

pub async fn resolve_site<A>(
    api: &A,
    session: &RemoteSession,
    hostname: &str,
    site_path: &str,
) -> Result<String>
where
    A: DriveApi + ?Sized,
{
    let key = format!("{hostname}:/sites/{site_path}");
    match api.get_site(session.bearer()?, hostname, site_path).await? {
        Some(site) => {
            info!(site = %key, site_id = %site.id, "Resolved site");
            Ok(site.id)
        }
        None => {
            error!(site = %key, "Site not found");
            Err(DocError::SiteNotFound(key))
        }
    }
}

/// Exact-name match over every library of the site.
pub async fn resolve_drive<A>(
    api: &A,
    session: &RemoteSession,
    site_id: &str,
    drive_name: &str,
) -> Result<String>
where
    A: DriveApi + ?Sized,
{
    let drives = api.list_drives(session.bearer()?, site_id).await?;
    if let Some(drive) = drives.iter().find(|d| d.name == drive_name) {
        info!(drive_name, drive_id = %drive.id, "Resolved document library");
        return Ok(drive.id.clone());
    }
    let available: Vec<String> = drives.into_iter().map(|d| d.name).collect();
    error!(drive_name, ?available, "Document library not found");
    Err(DocError::DriveNotFound {
        name: drive_name.to_string(),
        available,
    })
}

/// Resolve site and drive once per session; later calls reuse the cached handle.
pub async fn resolve_catalog<A>(
    api: &A,
    session: &mut RemoteSession,
    hostname: &str,
    site_path: &str,
    drive_name: &str,
) -> Result<CatalogHandle>
where
    A: DriveApi + ?Sized,
{
    if let Some(handle) = session.cached_catalog(hostname, site_path, drive_name) {
        return Ok(handle.clone());
    }
    let site_id = resolve_site(api, session, hostname, site_path).await?;
    let drive_id = resolve_drive(api, session, &site_id, drive_name).await?;
    let handle = CatalogHandle {
        hostname: hostname.to_string(),
        site_path: site_path.to_string(),
        drive_name: drive_name.to_string(),
        site_id,
        drive_id,
    };
    session.remember_catalog(handle.clone());
    Ok(handle)
}
