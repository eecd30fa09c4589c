//! Per-run remote session: the bearer token plus catalog handles resolved so far.

use tracing::{debug, error};

use crate::contract::CredentialProvider;
use crate::credentials::BearerToken;
use crate::error::{DocError, Result};

/// `(site_id, drive_id)` resolved from `(hostname, site_path, drive_name)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogHandle {
    pub hostname: String,
    pub site_path: String,
    pub drive_name: String,
    pub site_id: String,
    pub drive_id: String,
}

impl CatalogHandle {
    fn matches(&self, hostname: &str, site_path: &str, drive_name: &str) -> bool {
        self.hostname == hostname && self.site_path == site_path && self.drive_name == drive_name
    }
}

#[derive(Debug)]
pub struct RemoteSession {
    token: BearerToken,
    catalogs: Vec<CatalogHandle>,
}

impl RemoteSession {
    pub fn new(token: BearerToken) -> Self {
        Self {
            token,
            catalogs: Vec::new(),
        }
    }

    /// Acquire a token once; no retry on failure.
    pub async fn open<P>(provider: &P) -> Result<Self>
    where
        P: CredentialProvider + ?Sized,
    {
        let token = provider.acquire().await?;
        Ok(Self::new(token))
    }

    /// The raw bearer value, refused once the token has expired.
    pub fn bearer(&self) -> Result<&str> {
        if self.token.is_expired() {
            error!("Bearer token expired mid-run");
            return Err(DocError::TokenExpired);
        }
        Ok(self.token.value())
    }

    pub fn cached_catalog(
        &self,
        hostname: &str,
        site_path: &str,
        drive_name: &str,
    ) -> Option<&CatalogHandle> {
        self.catalogs
            .iter()
            .find(|handle| handle.matches(hostname, site_path, drive_name))
    }

    pub(crate) fn remember_catalog(&mut self, handle: CatalogHandle) {
        debug!(site_id = %handle.site_id, drive_id = %handle.drive_id, "Caching catalog handle");
        self.catalogs.push(handle);
    }
}
