//! Error type shared by every onboard-docs pipeline.
//!
//! Variants follow the failure taxonomy of the system: input errors (bad payload,
//! missing arguments), missing resources (templates, sites, drives), external tool
//! failures (the document converter), remote API failures and plain IO.
//! Recoverable conditions (a form field absent from the template, a folder that
//! already exists) are not represented here: they are returned as values.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DocError {
    /// Payload was missing or not a JSON object.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// A required argument or credential was not supplied.
    #[error("missing input: {0}")]
    MissingInput(String),

    /// The config file could not be read or parsed.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("template not found: {}", .0.display())]
    TemplateNotFound(PathBuf),

    #[error("invalid template {}: {reason}", path.display())]
    InvalidTemplate { path: PathBuf, reason: String },

    #[error("failed to render template {}: {reason}", template.display())]
    RenderFailed { template: PathBuf, reason: String },

    #[error(
        "document converter not found (looked for {searched}); install LibreOffice and make sure `soffice` is on PATH"
    )]
    ConverterNotFound { searched: String },

    #[error("conversion of {} failed ({status}): {diagnostics}", source_file.display())]
    ConversionFailed {
        source_file: PathBuf,
        status: String,
        diagnostics: String,
    },

    #[error("site not found: {0}")]
    SiteNotFound(String),

    #[error("document library '{name}' not found; available: {available:?}")]
    DriveNotFound { name: String, available: Vec<String> },

    /// Non-2xx response that the caller did not treat as a legitimate outcome.
    #[error("remote API error: {method} {url} returned {status}: {body}")]
    Remote {
        method: String,
        url: String,
        status: u16,
        body: String,
    },

    #[error("token request failed: {0}")]
    Token(String),

    #[error("bearer token expired; acquire a new session")]
    TokenExpired,

    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    #[error("archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl DocError {
    /// Errors caused by what the operator typed rather than by the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            DocError::InvalidPayload(_) | DocError::MissingInput(_) | DocError::InvalidConfig(_)
        )
    }

    /// True for a `Remote` error carrying the given HTTP status.
    pub fn is_status(&self, code: u16) -> bool {
        matches!(self, DocError::Remote { status, .. } if *status == code)
    }
}

pub type Result<T> = std::result::Result<T, DocError>;
