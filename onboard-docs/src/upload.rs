#![doc = "Remote publishing glue for the CLI: turns flags and environment into credentials, a Graph client and a session, and prints per-file results."]
//
//! # Remote wiring (CLI <-> Core)
//!
//! The core publishes through the `DriveApi` and `CredentialProvider` traits;
//! this module picks the real implementations ([`GraphClient`],
//! [`ClientCredentialProvider`]) and feeds them what the user supplied.
//!
//! - Credentials come from `--tenant-id/--client-id/--client-secret` or the
//!   `TENANT_ID`, `CLIENT_ID`, `CLIENT_SECRET` environment variables.
//! - Results are printed as `OK: <url-or-name>` / `FAILED: <file>: <reason>`.

use anyhow::Result;
use onboard_docs_core::config::{Credentials, PublishTarget};
use onboard_docs_core::credentials::ClientCredentialProvider;
use onboard_docs_core::graph::GraphClient;
use onboard_docs_core::orchestrate::PublishReport;
use onboard_docs_core::session::RemoteSession;
use onboard_docs_core::DocError;

use crate::cli::RemoteArgs;

/// Credentials from flags (clap already falls back to the environment).
pub fn credentials_from_args(args: &RemoteArgs) -> Result<Credentials, DocError> {
    let present = |v: &Option<String>| {
        v.as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    match (
        present(&args.tenant_id),
        present(&args.client_id),
        present(&args.client_secret),
    ) {
        (Some(tenant_id), Some(client_id), Some(client_secret)) => {
            tracing::info!(
                tenant_id = %tenant_id,
                client_id = %client_id,
                secret_set = !client_secret.is_empty(),
                "Credentials supplied"
            );
            Ok(Credentials {
                tenant_id,
                client_id,
                client_secret,
            })
        }
        _ => {
            tracing::error!("TENANT_ID/CLIENT_ID/CLIENT_SECRET missing from flags and environment");
            Err(DocError::MissingInput(
                "TENANT_ID/CLIENT_ID/CLIENT_SECRET (flags or environment)".into(),
            ))
        }
    }
}

/// Flags override the YAML/default target; `acronym` is set by the caller.
pub fn apply_target_overrides(mut target: PublishTarget, args: &RemoteArgs) -> PublishTarget {
    if let Some(hostname) = &args.hostname {
        target.hostname = hostname.clone();
    }
    if let Some(site_path) = &args.site_path {
        target.site_path = site_path.clone();
    }
    if let Some(drive_name) = &args.drive_name {
        target.drive_name = drive_name.clone();
    }
    if let Some(base_folder) = &args.base_folder {
        target.base_folder = base_folder.clone();
    }
    target
}

/// Live remote clients plus an open session.
pub struct RemoteClient {
    pub api: GraphClient,
    pub session: RemoteSession,
}

impl RemoteClient {
    pub async fn connect(credentials: Credentials, args: &RemoteArgs) -> Result<Self, DocError> {
        let provider = ClientCredentialProvider::with_authority(credentials, &args.authority_url);
        let session = RemoteSession::open(&provider).await?;
        let api = GraphClient::with_base_url(&args.graph_base_url);
        tracing::info!(graph_base_url = %api.base_url(), "Connected to document library API");
        Ok(Self { api, session })
    }
}

/// Print one line per file. Returns the number of failed uploads.
pub fn print_report(report: &PublishReport) -> usize {
    for outcome in &report.uploads {
        match &outcome.result {
            Ok(item) => println!("OK: {}", item.display_location()),
            Err(e) => println!("FAILED: {}: {e}", outcome.local_path.display()),
        }
    }
    let failed = report.failed();
    tracing::info!(
        folder = %report.folder_path,
        total = report.uploads.len(),
        failed,
        "Upload report printed"
    );
    failed
}
