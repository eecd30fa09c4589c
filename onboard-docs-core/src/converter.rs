//! External document-conversion engine (LibreOffice, run headless).

use std::env;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;

use tracing::{error, info, warn};

use crate::contract::Converter;
use crate::error::{DocError, Result};

/// Binary names tried, in order, when discovering the engine on `PATH`.
pub const CONVERTER_CANDIDATES: [&str; 2] = ["soffice", "libreoffice"];

/// Runs the engine as a child process.
///
/// A converter whose binary could not be found still constructs; every
/// conversion then fails with [`DocError::ConverterNotFound`], so the caller
/// can keep producing artifacts that do not need conversion.
pub struct SofficeConverter {
    binary: Option<PathBuf>,
}

impl SofficeConverter {
    /// Locate the engine on the current `PATH`.
    pub fn discover() -> Self {
        let path_var = env::var_os("PATH").unwrap_or_default();
        Self::discover_in(&path_var)
    }

    pub fn discover_in(path_var: &OsStr) -> Self {
        let binary = CONVERTER_CANDIDATES
            .iter()
            .find_map(|name| find_on_path(name, path_var));
        match &binary {
            Some(found) => info!(binary = %found.display(), "Found document converter"),
            None => warn!(candidates = ?CONVERTER_CANDIDATES, "No document converter on PATH"),
        }
        Self { binary }
    }

    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: Some(binary.into()),
        }
    }

    pub fn binary(&self) -> Option<&Path> {
        self.binary.as_deref()
    }

    /// `--headless --nologo --nofirststartwizard --convert-to pdf --outdir <dir> <file>`
    pub fn command_args(source: &Path, out_dir: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = [
            "--headless",
            "--nologo",
            "--nofirststartwizard",
            "--convert-to",
            "pdf",
            "--outdir",
        ]
        .iter()
        .map(OsString::from)
        .collect();
        args.push(out_dir.as_os_str().to_owned());
        args.push(source.as_os_str().to_owned());
        args
    }
}

fn find_on_path(name: &str, path_var: &OsStr) -> Option<PathBuf> {
    let file_name = if cfg!(windows) {
        format!("{name}.exe")
    } else {
        name.to_string()
    };
    env::split_paths(path_var)
        .map(|dir| dir.join(&file_name))
        .find(|candidate| candidate.is_file())
}

/// Where the engine writes the PDF for `source`.
pub fn expected_output(source: &Path, out_dir: &Path) -> PathBuf {
    let stem = source.file_stem().unwrap_or_default().to_string_lossy();
    out_dir.join(format!("{stem}.pdf"))
}

impl Converter for SofficeConverter {
    fn convert(&self, source: &Path, out_dir: &Path) -> Result<Vec<u8>> {
        let Some(binary) = &self.binary else {
            error!(source = %source.display(), "Cannot convert: no converter binary");
            return Err(DocError::ConverterNotFound {
                searched: CONVERTER_CANDIDATES.join(", "),
            });
        };
        let args = Self::command_args(source, out_dir);
        info!(binary = %binary.display(), source = %source.display(), "Converting document to PDF");

        let output = match Command::new(binary).args(&args).output() {
            Ok(output) => output,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                error!(binary = %binary.display(), "Converter binary missing");
                return Err(DocError::ConverterNotFound {
                    searched: binary.display().to_string(),
                });
            }
            Err(e) => {
                error!(error = ?e, binary = %binary.display(), "Failed to launch converter");
                return Err(DocError::Io(e));
            }
        };

        let diagnostics = format!(
            "{}{}",
            String::from_utf8_lossy(&output.stderr),
            String::from_utf8_lossy(&output.stdout)
        )
        .trim()
        .to_string();

        if !output.status.success() {
            error!(status = %output.status, diagnostics = %diagnostics, "Converter exited with non-zero code");
            return Err(DocError::ConversionFailed {
                source_file: source.to_path_buf(),
                status: output.status.to_string(),
                diagnostics,
            });
        }

        let pdf_path = expected_output(source, out_dir);
        if !pdf_path.is_file() {
            error!(expected = %pdf_path.display(), "Converter reported success but produced no PDF");
            return Err(DocError::ConversionFailed {
                source_file: source.to_path_buf(),
                status: output.status.to_string(),
                diagnostics: format!("expected output {} missing. {diagnostics}", pdf_path.display()),
            });
        }
        let bytes = fs::read(&pdf_path)?;
        info!(pdf = %pdf_path.display(), size = bytes.len(), "Conversion finished");
        Ok(bytes)
    }
}
