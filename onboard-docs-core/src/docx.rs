//! DOCX template rendering.
//!
//! A DOCX file is a ZIP archive; placeholders live in the WordprocessingML parts
//! (`word/document.xml`, headers, footers). A placeholder is `{{ key }}` where `key`
//! is a payload field name. Word routinely splits a placeholder over several runs
//! (`{{</w:t></w:r><w:r><w:t>lastName}}`), so markup between the braces is dropped
//! together with the placeholder. Keys missing from the payload render as the empty
//! string. Control blocks (`{% ... %}`) are not supported.
//!
//! Every rendered part is checked for well-formedness before the archive is written.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use quick_xml::events::Event;
use quick_xml::Reader;
use regex::{Captures, Regex};
use tracing::{debug, info};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocError, Result};
use crate::payload::Payload;

pub const MAIN_PART: &str = "word/document.xml";

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"\{(?:<[^>]*>)*\{(?P<inner>(?:[^{}<]|<[^>]*>)*?)\}(?:<[^>]*>)*\}")
            .expect("placeholder pattern is valid")
    })
}

fn block_tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\{(?:<[^>]*>)*%").expect("block pattern is valid"))
}

fn tag_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"))
}

fn key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("key pattern is valid"))
}

/// Parts that may carry placeholders.
fn is_templated_part(name: &str) -> bool {
    name == MAIN_PART
        || (name.starts_with("word/header") && name.ends_with(".xml"))
        || (name.starts_with("word/footer") && name.ends_with(".xml"))
}

pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Substitute every placeholder of one XML part. Errors are plain descriptions;
/// the caller attaches the template path.
pub fn render_xml(xml: &str, payload: &Payload) -> std::result::Result<String, String> {
    if block_tag_pattern().is_match(xml) {
        return Err("control blocks ({% ... %}) are not supported".into());
    }

    let mut failure: Option<String> = None;
    let rendered = placeholder_pattern().replace_all(xml, |caps: &Captures| {
        let inner = &caps["inner"];
        if inner.contains("</w:p>") || inner.contains("<w:p ") || inner.contains("<w:p>") {
            failure.get_or_insert_with(|| "placeholder spans more than one paragraph".into());
            return String::new();
        }
        let key = tag_pattern().replace_all(inner, "");
        let key = key.trim();
        if !key_pattern().is_match(key) {
            failure.get_or_insert_with(|| format!("unsupported placeholder expression '{key}'"));
            return String::new();
        }
        let value = payload.get(key);
        if value.is_empty() {
            debug!(key, "Placeholder has no payload value; rendering empty");
        }
        escape_xml(value)
    });
    if let Some(reason) = failure {
        return Err(reason);
    }

    let visible = tag_pattern().replace_all(&rendered, "");
    if visible.contains("{{") || visible.contains("}}") {
        return Err("unbalanced placeholder braces".into());
    }
    check_well_formed(&rendered)?;
    Ok(rendered.into_owned())
}

fn check_well_formed(xml: &str) -> std::result::Result<(), String> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => {}
            Err(e) => {
                return Err(format!(
                    "rendered XML is not well-formed at byte {}: {e}",
                    reader.buffer_position()
                ))
            }
        }
    }
}

/// An unpacked DOCX template.
#[derive(Debug)]
pub struct DocxTemplate {
    path: PathBuf,
    /// Archive entries in their original order.
    parts: Vec<(String, Vec<u8>)>,
}

impl DocxTemplate {
    /// Open `path`, which must exist and carry the `.docx` extension.
    pub fn open(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(DocError::TemplateNotFound(path.to_path_buf()));
        }
        let is_docx = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("docx"));
        if !is_docx {
            return Err(DocError::InvalidTemplate {
                path: path.to_path_buf(),
                reason: "expected a .docx file".into(),
            });
        }
        let bytes = fs::read(path)?;
        Self::from_bytes(path, bytes)
    }

    pub fn from_bytes(path: &Path, bytes: Vec<u8>) -> Result<Self> {
        let invalid = |reason: String| DocError::InvalidTemplate {
            path: path.to_path_buf(),
            reason,
        };
        let mut archive =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| invalid(format!("not a ZIP archive: {e}")))?;

        let mut parts = Vec::with_capacity(archive.len());
        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            let name = entry.name().to_string();
            if name.ends_with('/') {
                continue;
            }
            let mut contents = Vec::new();
            entry.read_to_end(&mut contents)?;
            parts.push((name, contents));
        }
        if !parts.iter().any(|(name, _)| name == MAIN_PART) {
            return Err(invalid(format!("missing {MAIN_PART}")));
        }
        debug!(template = %path.display(), parts = parts.len(), "Opened DOCX template");
        Ok(Self {
            path: path.to_path_buf(),
            parts,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Render against `payload` and return the bytes of the new DOCX.
    pub fn render(&self, payload: &Payload) -> Result<Vec<u8>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

        let mut rendered_parts = 0;
        for (name, contents) in &self.parts {
            zip.start_file(name.as_str(), options)?;
            if is_templated_part(name) {
                let xml = String::from_utf8(contents.clone()).map_err(|e| DocError::RenderFailed {
                    template: self.path.clone(),
                    reason: format!("{name} is not UTF-8: {e}"),
                })?;
                let rendered = render_xml(&xml, payload).map_err(|reason| DocError::RenderFailed {
                    template: self.path.clone(),
                    reason: format!("{name}: {reason}"),
                })?;
                zip.write_all(rendered.as_bytes())?;
                rendered_parts += 1;
            } else {
                zip.write_all(contents)?;
            }
        }
        let bytes = zip.finish()?.into_inner();
        info!(template = %self.path.display(), rendered_parts, size = bytes.len(), "Rendered DOCX template");
        Ok(bytes)
    }
}
