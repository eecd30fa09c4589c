//! Fill an existing PDF's AcroForm fields from the payload.
//!
//! The output is the whole source document with field values changed in place;
//! copying only the form dictionary into a fresh document leaves fields that
//! common viewers can no longer read.
//!
//! Before writing, the filler
//! - sets `NeedAppearances` so viewers regenerate the visual of every field,
//! - drops the stale appearance stream (`AP`) of each field it fills,
//! - removes the legacy `XFA` form layer, which some viewers would otherwise render
//!   instead of the updated AcroForm values.
//!
//! Field values are applied through the AcroForm field tree (`/Fields`). Templates
//! whose form dictionary does not list its fields are filled by walking the widget
//! annotations of each page instead. A mapped field that the template does not have
//! is logged and reported, never fatal.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use tracing::{debug, info, warn};

use crate::config::FieldMapping;
use crate::error::{DocError, Result};
use crate::payload::Payload;

/// Date format used for the "date filled" field.
pub const FILL_DATE_FORMAT: &str = "%d.%m.%Y";

const MAX_FIELD_DEPTH: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillStrategy {
    /// Values applied through the AcroForm `/Fields` tree.
    FieldTree,
    /// `/Fields` unavailable; values applied through page widget annotations.
    PageAnnotations,
    /// The template has no AcroForm; nothing was filled.
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FillReport {
    pub strategy: FillStrategy,
    pub populated: Vec<String>,
    /// Mapped field names absent from the template.
    pub missing_fields: Vec<String>,
    pub xfa_removed: bool,
}

#[derive(Debug)]
pub struct FilledForm {
    pub bytes: Vec<u8>,
    pub report: FillReport,
}

/// A form field as found in a template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldInfo {
    pub name: String,
    pub kind: Option<String>,
    pub value: Option<String>,
}

enum AcroFormLocation {
    Indirect(ObjectId),
    /// Inline in the catalog with this id.
    Inline(ObjectId),
}

/// Values keyed by fully qualified field name: the mapped payload keys plus the
/// fill date.
pub fn field_values(
    fields: &FieldMapping,
    date_field: &str,
    payload: &Payload,
    filled_on: NaiveDate,
) -> BTreeMap<String, String> {
    let mut values: BTreeMap<String, String> = fields
        .iter()
        .map(|(key, field)| (field.to_string(), payload.get(key).to_string()))
        .collect();
    if !date_field.is_empty() {
        values.insert(
            date_field.to_string(),
            filled_on.format(FILL_DATE_FORMAT).to_string(),
        );
    }
    values
}

/// Fill `template` and return the resulting PDF bytes.
pub fn fill(
    template: &Path,
    fields: &FieldMapping,
    date_field: &str,
    payload: &Payload,
    filled_on: NaiveDate,
) -> Result<FilledForm> {
    if !template.is_file() {
        return Err(DocError::TemplateNotFound(template.to_path_buf()));
    }
    let mut doc = Document::load(template)?;
    let values = field_values(fields, date_field, payload, filled_on);

    let Some(location) = locate_acroform(&doc)? else {
        warn!(template = %template.display(), "Template has no AcroForm; skipping field population");
        let bytes = save(&mut doc)?;
        return Ok(FilledForm {
            bytes,
            report: FillReport {
                strategy: FillStrategy::Skipped,
                populated: Vec::new(),
                missing_fields: values.into_keys().collect(),
                xfa_removed: false,
            },
        });
    };

    let xfa_removed = {
        let acroform = acroform_mut(&mut doc, &location)?;
        acroform.set("NeedAppearances", Object::Boolean(true));
        acroform.remove(b"XFA").is_some()
    };
    if xfa_removed {
        info!(template = %template.display(), "Removed XFA form layer");
    }

    let (strategy, catalog) = match field_tree(&doc, &location)? {
        Some(catalog) if !catalog.is_empty() => (FillStrategy::FieldTree, catalog),
        _ => {
            debug!("AcroForm does not list its fields; falling back to page widgets");
            (FillStrategy::PageAnnotations, page_widget_fields(&doc)?)
        }
    };

    let mut populated = Vec::new();
    let mut missing_fields = Vec::new();
    for (name, value) in &values {
        match catalog.get(name) {
            Some(&field_id) => {
                set_field_value(&mut doc, field_id, value)?;
                populated.push(name.clone());
            }
            None => {
                warn!(field = %name, "Mapped field not present in template; leaving unset");
                missing_fields.push(name.clone());
            }
        }
    }

    info!(
        template = %template.display(),
        ?strategy,
        populated = populated.len(),
        missing = missing_fields.len(),
        "Filled form fields"
    );
    let bytes = save(&mut doc)?;
    Ok(FilledForm {
        bytes,
        report: FillReport {
            strategy,
            populated,
            missing_fields,
            xfa_removed,
        },
    })
}

/// [`fill`], then write the bytes to `out_path`, creating its directory if needed.
pub fn fill_to_file(
    template: &Path,
    fields: &FieldMapping,
    date_field: &str,
    payload: &Payload,
    filled_on: NaiveDate,
    out_path: &Path,
) -> Result<FillReport> {
    let filled = fill(template, fields, date_field, payload, filled_on)?;
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(out_path, &filled.bytes)?;
    info!(path = %out_path.display(), size = filled.bytes.len(), "Wrote filled PDF form");
    Ok(filled.report)
}

/// Every field of `template` with its type and current value.
pub fn inspect_fields(template: &Path) -> Result<Vec<FieldInfo>> {
    if !template.is_file() {
        return Err(DocError::TemplateNotFound(template.to_path_buf()));
    }
    let doc = Document::load(template)?;
    let Some(location) = locate_acroform(&doc)? else {
        return Ok(Vec::new());
    };
    let catalog = match field_tree(&doc, &location)? {
        Some(catalog) if !catalog.is_empty() => catalog,
        _ => page_widget_fields(&doc)?,
    };

    let mut infos = Vec::with_capacity(catalog.len());
    for (name, id) in catalog {
        let dict = doc.get_dictionary(id)?;
        let kind = inherited(&doc, dict, b"FT").and_then(|ft| match ft {
            Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
            _ => None,
        });
        let value = dict.get(b"V").ok().and_then(|v| match v {
            Object::String(bytes, _) => Some(decode_text_string(bytes)),
            Object::Name(n) => Some(String::from_utf8_lossy(n).into_owned()),
            _ => None,
        });
        infos.push(FieldInfo { name, kind, value });
    }
    Ok(infos)
}

fn save(doc: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    doc.save_to(&mut bytes)?;
    Ok(bytes)
}

fn locate_acroform(doc: &Document) -> Result<Option<AcroFormLocation>> {
    let catalog_id = doc.trailer.get(b"Root")?.as_reference()?;
    let catalog = doc.get_dictionary(catalog_id)?;
    Ok(match catalog.get(b"AcroForm") {
        Ok(Object::Reference(id)) => Some(AcroFormLocation::Indirect(*id)),
        Ok(Object::Dictionary(_)) => Some(AcroFormLocation::Inline(catalog_id)),
        _ => None,
    })
}

fn acroform<'a>(doc: &'a Document, location: &AcroFormLocation) -> Result<&'a Dictionary> {
    Ok(match location {
        AcroFormLocation::Indirect(id) => doc.get_dictionary(*id)?,
        AcroFormLocation::Inline(catalog_id) => {
            doc.get_dictionary(*catalog_id)?.get(b"AcroForm")?.as_dict()?
        }
    })
}

fn acroform_mut<'a>(
    doc: &'a mut Document,
    location: &AcroFormLocation,
) -> Result<&'a mut Dictionary> {
    Ok(match location {
        AcroFormLocation::Indirect(id) => doc.get_object_mut(*id)?.as_dict_mut()?,
        AcroFormLocation::Inline(catalog_id) => doc
            .get_object_mut(*catalog_id)?
            .as_dict_mut()?
            .get_mut(b"AcroForm")?
            .as_dict_mut()?,
    })
}

fn resolve<'a>(doc: &'a Document, object: &'a Object) -> Result<&'a Object> {
    match object {
        Object::Reference(id) => Ok(doc.get_object(*id)?),
        other => Ok(other),
    }
}

fn reference_list(doc: &Document, object: &Object) -> Result<Vec<ObjectId>> {
    let array = resolve(doc, object)?.as_array()?;
    Ok(array
        .iter()
        .filter_map(|item| item.as_reference().ok())
        .collect())
}

fn partial_name(dict: &Dictionary) -> Option<String> {
    match dict.get(b"T") {
        Ok(Object::String(bytes, _)) => Some(decode_text_string(bytes)),
        _ => None,
    }
}

/// Fully qualified name -> terminal field object, from the AcroForm `/Fields` tree.
/// `None` when the form dictionary has no usable `/Fields` entry.
fn field_tree(
    doc: &Document,
    location: &AcroFormLocation,
) -> Result<Option<BTreeMap<String, ObjectId>>> {
    let Ok(fields) = acroform(doc, location)?.get(b"Fields") else {
        return Ok(None);
    };
    let Ok(roots) = reference_list(doc, fields) else {
        return Ok(None);
    };
    let mut catalog = BTreeMap::new();
    for root in roots {
        walk_field(doc, root, None, 0, &mut catalog)?;
    }
    Ok(Some(catalog))
}

fn walk_field(
    doc: &Document,
    id: ObjectId,
    prefix: Option<&str>,
    depth: usize,
    catalog: &mut BTreeMap<String, ObjectId>,
) -> Result<()> {
    if depth > MAX_FIELD_DEPTH {
        warn!(?id, "Field tree too deep; ignoring subtree");
        return Ok(());
    }
    let Ok(dict) = doc.get_dictionary(id) else {
        return Ok(());
    };
    let name = match (prefix, partial_name(dict)) {
        (Some(p), Some(n)) => Some(format!("{p}.{n}")),
        (None, Some(n)) => Some(n),
        (p, None) => p.map(str::to_string),
    };

    let kids = match dict.get(b"Kids") {
        Ok(kids) => reference_list(doc, kids).unwrap_or_default(),
        Err(_) => Vec::new(),
    };
    // Kids without /T are widget annotations of this field, not child fields.
    let child_fields: Vec<ObjectId> = kids
        .into_iter()
        .filter(|kid| {
            doc.get_dictionary(*kid)
                .map(|d| d.has(b"T"))
                .unwrap_or(false)
        })
        .collect();

    if child_fields.is_empty() {
        if let Some(name) = name {
            catalog.insert(name, id);
        }
        return Ok(());
    }
    for kid in child_fields {
        walk_field(doc, kid, name.as_deref(), depth + 1, catalog)?;
    }
    Ok(())
}

/// Fully qualified name -> field object, discovered from each page's widget annotations.
fn page_widget_fields(doc: &Document) -> Result<BTreeMap<String, ObjectId>> {
    let mut catalog = BTreeMap::new();
    for (page_number, page_id) in doc.get_pages() {
        let page = doc.get_dictionary(page_id)?;
        let Ok(annots) = page.get(b"Annots") else {
            continue;
        };
        for annot_id in reference_list(doc, annots).unwrap_or_default() {
            let Ok(annot) = doc.get_dictionary(annot_id) else {
                continue;
            };
            let is_widget = matches!(annot.get(b"Subtype"), Ok(Object::Name(n)) if n.as_slice() == b"Widget");
            if !is_widget {
                continue;
            }
            let field_id = if annot.has(b"T") {
                Some(annot_id)
            } else {
                annot.get(b"Parent").ok().and_then(|p| p.as_reference().ok())
            };
            let Some(field_id) = field_id else {
                continue;
            };
            if let Some(name) = qualified_name(doc, field_id) {
                debug!(page = page_number, field = %name, "Found widget field");
                catalog.entry(name).or_insert(field_id);
            }
        }
    }
    Ok(catalog)
}

/// Join the `/T` names from the root field down to `id`.
fn qualified_name(doc: &Document, id: ObjectId) -> Option<String> {
    let mut parts = Vec::new();
    let mut current = Some(id);
    let mut depth = 0;
    while let Some(node) = current {
        if depth > MAX_FIELD_DEPTH {
            return None;
        }
        let dict = doc.get_dictionary(node).ok()?;
        if let Some(name) = partial_name(dict) {
            parts.push(name);
        }
        current = dict.get(b"Parent").ok().and_then(|p| p.as_reference().ok());
        depth += 1;
    }
    if parts.is_empty() {
        return None;
    }
    parts.reverse();
    Some(parts.join("."))
}

/// Look `key` up on `dict` or, as PDF field attributes inherit, on its parents.
fn inherited<'a>(doc: &'a Document, dict: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = dict;
    for _ in 0..MAX_FIELD_DEPTH {
        if let Ok(value) = current.get(key) {
            return Some(value);
        }
        let parent = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn set_field_value(doc: &mut Document, field_id: ObjectId, value: &str) -> Result<()> {
    let widget_kids = match doc.get_dictionary(field_id)?.get(b"Kids") {
        Ok(kids) => reference_list(doc, kids).unwrap_or_default(),
        Err(_) => Vec::new(),
    };
    let field = doc.get_object_mut(field_id)?.as_dict_mut()?;
    field.set("V", encode_text_string(value));
    field.remove(b"AP");
    for kid in widget_kids {
        if let Ok(widget) = doc.get_object_mut(kid).and_then(Object::as_dict_mut) {
            widget.remove(b"AP");
        }
    }
    Ok(())
}

/// PDF text string: literal for ASCII, UTF-16BE with byte-order mark otherwise.
pub fn encode_text_string(value: &str) -> Object {
    if value.is_ascii() {
        return Object::String(value.as_bytes().to_vec(), StringFormat::Literal);
    }
    let mut bytes = vec![0xFE, 0xFF];
    for unit in value.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    Object::String(bytes, StringFormat::Hexadecimal)
}

pub fn decode_text_string(bytes: &[u8]) -> String {
    if let Some(utf16) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = utf16
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    bytes.iter().map(|&b| b as char).collect()
}
