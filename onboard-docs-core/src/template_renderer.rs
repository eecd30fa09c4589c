//! Render a DOCX template and convert it to PDF.
//!
//! All intermediate files (the copied-in template, the rendered document, the
//! converter's output) live in a temporary workspace that is removed when this
//! function returns, whatever the outcome. Only after conversion succeeded are the
//! DOCX and PDF copied to the final output location, so a failed conversion leaves
//! nothing behind in the output directory.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info};

use crate::contract::Converter;
use crate::docx::DocxTemplate;
use crate::error::{DocError, Result};
use crate::payload::Payload;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedDocument {
    pub docx_path: PathBuf,
    pub pdf_path: PathBuf,
}

/// `base` with `.ext` appended; dots already in the file name are kept.
pub fn with_suffix(base: &Path, ext: &str) -> PathBuf {
    let mut name: OsString = base.as_os_str().to_owned();
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}

/// Render `template` against `payload`, convert it, and write
/// `{output_base}.docx` and `{output_base}.pdf`.
pub fn render<C>(
    template: &Path,
    payload: &Payload,
    output_base: &Path,
    converter: &C,
) -> Result<RenderedDocument>
where
    C: Converter + ?Sized,
{
    // Validate before creating any workspace.
    DocxTemplate::open(template)?;

    let basename = output_base
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| DocError::InvalidTemplate {
            path: template.to_path_buf(),
            reason: format!("output base {} has no file name", output_base.display()),
        })?;

    let workspace = tempfile::Builder::new().prefix("onboard-docs-").tempdir()?;
    debug!(workspace = %workspace.path().display(), "Created render workspace");

    let staged_template = workspace.path().join("template.docx");
    fs::copy(template, &staged_template)?;
    let rendered = DocxTemplate::open(&staged_template)?.render(payload)?;

    let work_docx = workspace.path().join(format!("{basename}.docx"));
    fs::write(&work_docx, &rendered)?;

    let pdf_bytes = converter.convert(&work_docx, workspace.path()).map_err(|e| {
        error!(error = %e, template = %template.display(), "Conversion step failed");
        e
    })?;
    let work_pdf = workspace.path().join(format!("{basename}.pdf"));
    fs::write(&work_pdf, &pdf_bytes)?;

    if let Some(parent) = output_base.parent() {
        fs::create_dir_all(parent)?;
    }
    let docx_path = with_suffix(output_base, "docx");
    let pdf_path = with_suffix(output_base, "pdf");
    fs::copy(&work_docx, &docx_path)?;
    if let Err(e) = fs::copy(&work_pdf, &pdf_path) {
        let _ = fs::remove_file(&docx_path);
        return Err(e.into());
    }

    info!(
        docx = %docx_path.display(),
        pdf = %pdf_path.display(),
        pdf_size = pdf_bytes.len(),
        "Rendered and converted document"
    );
    Ok(RenderedDocument {
        docx_path,
        pdf_path,
    })
}
