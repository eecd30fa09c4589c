//! Top-level pipelines: generate the onboarding artifacts for one employee, and
//! publish a directory of PDFs into that employee's folder.
//!
//! # Generation
//! Two independent stages run in order:
//!   - the PDF form is filled into `{output_dir}/{form.prefix}_{initial}{lastName}.pdf`
//!   - the DOCX template is rendered and converted into
//!     `{output_dir}/{document.prefix}_{initial}{lastName}.docx` and `.pdf`
//!
//! A failing stage is recorded in the [`GenerationReport`] and never prevents the
//! other stage from running.
//!
//! # Publishing
//! Resolve site and library, ensure `{base_folder}/{acronym}` exists, then upload
//! every PDF of the local directory into it. Per-file failures end up in the
//! returned [`PublishReport`]; resolution and folder failures abort the run.
//! [`publish_files`] does the same for an explicit list, such as the PDFs of one
//! generation pass.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::{error, info};

use crate::catalog::resolve_catalog;
use crate::config::{GenerationConfig, PublishTarget};
use crate::contract::{Artifact, ArtifactKind, Converter, DriveApi};
use crate::error::{DocError, Result};
use crate::form_filler::{fill_to_file, FillReport};
use crate::payload::Payload;
use crate::provision::ensure_folder;
use crate::session::RemoteSession;
use crate::template_renderer::{render, RenderedDocument};
use crate::uploader::{upload_directory, upload_file, UploadOutcome};

/// Outcome of one generation pass.
#[derive(Debug)]
pub struct GenerationReport {
    pub form: Result<FillReport>,
    pub document: Result<RenderedDocument>,
    /// Files written to the output directory, in creation order.
    pub artifacts: Vec<Artifact>,
}

impl GenerationReport {
    pub fn is_complete(&self) -> bool {
        self.form.is_ok() && self.document.is_ok()
    }

    /// Generated PDFs, the ones eligible for publishing.
    pub fn pdf_paths(&self) -> Vec<PathBuf> {
        self.artifacts
            .iter()
            .filter(|a| a.kind.extension() == "pdf")
            .map(|a| a.path.clone())
            .collect()
    }

    /// `(stage, error)` for every stage that failed.
    pub fn failures(&self) -> Vec<(&'static str, &DocError)> {
        let mut failures = Vec::new();
        if let Err(e) = &self.form {
            failures.push(("form", e));
        }
        if let Err(e) = &self.document {
            failures.push(("document", e));
        }
        failures
    }
}

pub fn generate_documents<C>(
    config: &GenerationConfig,
    payload: &Payload,
    converter: &C,
    filled_on: NaiveDate,
) -> GenerationReport
where
    C: Converter + ?Sized,
{
    info!(output_dir = %config.output_dir.display(), "Starting document generation");
    let mut artifacts = Vec::new();

    let form_path = config
        .output_dir
        .join(format!("{}.pdf", payload.artifact_basename(&config.form.prefix)));
    let form = fill_to_file(
        &config.form_template_path(),
        &config.form.fields,
        &config.form.date_field,
        payload,
        filled_on,
        &form_path,
    );
    match &form {
        Ok(_) => artifacts.push(Artifact {
            kind: ArtifactKind::PdfForm,
            path: form_path,
        }),
        Err(e) => error!(error = %e, "PDF form stage failed"),
    }

    let document_base = config
        .output_dir
        .join(payload.artifact_basename(&config.document.prefix));
    let document = render(
        &config.document_template_path(),
        payload,
        &document_base,
        converter,
    );
    match &document {
        Ok(rendered) => {
            artifacts.push(Artifact {
                kind: ArtifactKind::Docx,
                path: rendered.docx_path.clone(),
            });
            artifacts.push(Artifact {
                kind: ArtifactKind::DocxPdf,
                path: rendered.pdf_path.clone(),
            });
        }
        Err(e) => error!(error = %e, "Document stage failed"),
    }

    info!(
        artifacts = artifacts.len(),
        form_ok = form.is_ok(),
        document_ok = document.is_ok(),
        "Document generation finished"
    );
    GenerationReport {
        form,
        document,
        artifacts,
    }
}

#[derive(Debug)]
pub struct PublishReport {
    /// Drive-relative path of the employee folder.
    pub folder_path: String,
    pub uploads: Vec<UploadOutcome>,
}

impl PublishReport {
    pub fn failed(&self) -> usize {
        self.uploads.iter().filter(|u| !u.is_success()).count()
    }
}

/// Resolve the target library and make sure the employee folder exists.
async fn prepare_folder<A>(
    api: &A,
    session: &mut RemoteSession,
    target: &PublishTarget,
) -> Result<(String, String)>
where
    A: DriveApi + ?Sized,
{
    if target.acronym.trim().is_empty() {
        return Err(DocError::MissingInput("acronym".into()));
    }
    let catalog = resolve_catalog(
        api,
        session,
        &target.hostname,
        &target.site_path,
        &target.drive_name,
    )
    .await?;
    // Each base segment is its own folder; an empty base means the drive root.
    let mut base = String::new();
    for segment in target.base_folder.split('/').filter(|s| !s.trim().is_empty()) {
        base = ensure_folder(api, session, &catalog.drive_id, &base, segment).await?;
    }
    let folder = ensure_folder(api, session, &catalog.drive_id, &base, &target.acronym).await?;
    Ok((catalog.drive_id, folder))
}

pub async fn publish_directory<A>(
    api: &A,
    session: &mut RemoteSession,
    target: &PublishTarget,
    local_dir: &Path,
) -> Result<PublishReport>
where
    A: DriveApi + ?Sized,
{
    if !local_dir.is_dir() {
        return Err(DocError::MissingInput(format!(
            "directory {} does not exist",
            local_dir.display()
        )));
    }
    let (drive_id, folder_path) = prepare_folder(api, session, target).await?;
    let uploads = upload_directory(api, session, &drive_id, &folder_path, local_dir).await?;
    let report = PublishReport {
        folder_path,
        uploads,
    };
    info!(
        folder = %report.folder_path,
        uploaded = report.uploads.len() - report.failed(),
        failed = report.failed(),
        "Publish finished"
    );
    Ok(report)
}

/// Publish the given files into the employee folder, one independent upload each.
pub async fn publish_files<A>(
    api: &A,
    session: &mut RemoteSession,
    target: &PublishTarget,
    local_files: &[PathBuf],
) -> Result<PublishReport>
where
    A: DriveApi + ?Sized,
{
    if let Some(missing) = local_files.iter().find(|f| !f.is_file()) {
        return Err(DocError::MissingInput(format!(
            "file {} does not exist",
            missing.display()
        )));
    }
    let (drive_id, folder_path) = prepare_folder(api, session, target).await?;
    let mut uploads = Vec::with_capacity(local_files.len());
    for local_file in local_files {
        let file_name = local_file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let remote_path = format!("{folder_path}/{file_name}");
        let result = upload_file(api, session, &drive_id, &remote_path, local_file).await;
        if let Err(e) = &result {
            error!(file = %local_file.display(), error = %e, "Upload failed");
        }
        uploads.push(UploadOutcome {
            local_path: local_file.clone(),
            remote_path,
            result,
        });
    }
    Ok(PublishReport {
        folder_path,
        uploads,
    })
}
