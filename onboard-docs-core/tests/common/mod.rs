#![allow(dead_code)]
//! Fixtures shared by the integration tests: in-memory PDF forms, DOCX templates,
//! and a ready remote session.

use std::io::{Cursor, Read, Write};
use std::path::Path;
use std::time::Duration;

use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use onboard_docs_core::credentials::BearerToken;
use onboard_docs_core::payload::Payload;
use onboard_docs_core::session::RemoteSession;
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

/// Terminal fields of the fixture form, under `topmostSubform[0].Page1[0]`.
pub const FIXTURE_FIELDS: [&str; 4] = ["Nazwisko[0]", "Imie[0]", "PESEL[0]", "DataWypelnienia[0]"];

#[derive(Clone, Copy)]
pub struct FormShape {
    /// List the fields in the AcroForm `/Fields` array.
    pub field_tree: bool,
    pub xfa: bool,
    pub acroform: bool,
}

impl Default for FormShape {
    fn default() -> Self {
        Self {
            field_tree: true,
            xfa: true,
            acroform: true,
        }
    }
}

/// A one-page PDF shaped like the PIT-2 form: a `topmostSubform[0]` root with a
/// `Page1[0]` group whose text fields double as their own widgets.
pub fn pit2_form(shape: FormShape) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();
    let page_id = doc.new_object_id();
    let root_field_id = doc.new_object_id();
    let group_id = doc.new_object_id();

    let appearance = doc.add_object(Stream::new(dictionary! {}, b"/Tx BMC EMC".to_vec()));
    let widget_ids: Vec<ObjectId> = FIXTURE_FIELDS
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let y = 700 - (i as i64) * 40;
            doc.add_object(dictionary! {
                "Type" => "Annot",
                "Subtype" => "Widget",
                "FT" => "Tx",
                "T" => Object::string_literal(*name),
                "V" => Object::string_literal("stale"),
                "Parent" => group_id,
                "P" => page_id,
                "Rect" => vec![Object::Integer(50), Object::Integer(y), Object::Integer(300), Object::Integer(y + 20)],
                "AP" => dictionary! { "N" => appearance },
            })
        })
        .collect();
    let widget_refs: Vec<Object> = widget_ids.iter().map(|id| Object::Reference(*id)).collect();

    doc.objects.insert(
        group_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("Page1[0]"),
            "Kids" => widget_refs.clone(),
            "Parent" => root_field_id,
        }),
    );
    doc.objects.insert(
        root_field_id,
        Object::Dictionary(dictionary! {
            "T" => Object::string_literal("topmostSubform[0]"),
            "Kids" => vec![Object::Reference(group_id)],
        }),
    );

    let content_id = doc.add_object(Stream::new(dictionary! {}, Vec::new()));
    doc.objects.insert(
        page_id,
        Object::Dictionary(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(595), Object::Integer(842)],
            "Contents" => content_id,
            "Annots" => widget_refs,
        }),
    );
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        }),
    );

    let mut catalog = dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    };
    if shape.acroform {
        let mut acroform = dictionary! {
            "DA" => Object::String(b"/Helv 0 Tf 0 g".to_vec(), StringFormat::Literal),
        };
        if shape.field_tree {
            acroform.set("Fields", vec![Object::Reference(root_field_id)]);
        }
        if shape.xfa {
            let xfa = doc.add_object(Stream::new(dictionary! {}, b"<xdp:xdp/>".to_vec()));
            acroform.set("XFA", xfa);
        }
        let acroform_id = doc.add_object(acroform);
        catalog.set("AcroForm", acroform_id);
    }
    let catalog_id = doc.add_object(catalog);
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("fixture PDF serializes");
    bytes
}

/// The form dictionary of a saved PDF.
pub fn acroform_of(bytes: &[u8]) -> lopdf::Dictionary {
    let doc = Document::load_mem(bytes).expect("output PDF parses");
    let root = doc
        .trailer
        .get(b"Root")
        .and_then(Object::as_reference)
        .expect("trailer has Root");
    let catalog = doc.get_dictionary(root).expect("catalog");
    let acroform = match catalog.get(b"AcroForm").expect("catalog has AcroForm") {
        Object::Reference(id) => doc.get_dictionary(*id).expect("AcroForm object"),
        Object::Dictionary(dict) => dict,
        other => panic!("unexpected AcroForm entry {other:?}"),
    };
    acroform.clone()
}

pub fn write_file(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).expect("create fixture dir");
    }
    std::fs::write(path, bytes).expect("write fixture");
}

/// Minimal WordprocessingML body with `text` split into the given runs.
pub fn document_xml(runs: &[&str]) -> String {
    let runs: String = runs
        .iter()
        .map(|r| format!("<w:r><w:t xml:space=\"preserve\">{r}</w:t></w:r>"))
        .collect();
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\
         <w:document xmlns:w=\"http://schemas.openxmlformats.org/wordprocessingml/2006/main\">\
         <w:body><w:p>{runs}</w:p></w:body></w:document>"
    )
}

pub fn docx_template(document_xml: &str) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default();
    zip.start_file("[Content_Types].xml", options).unwrap();
    zip.write_all(
        b"<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
          <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
          <Override PartName=\"/word/document.xml\" \
          ContentType=\"application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml\"/>\
          </Types>",
    )
    .unwrap();
    zip.start_file("word/document.xml", options).unwrap();
    zip.write_all(document_xml.as_bytes()).unwrap();
    zip.finish().unwrap().into_inner()
}

/// `word/document.xml` of a DOCX on disk.
pub fn read_document_xml(docx: &Path) -> String {
    let bytes = std::fs::read(docx).expect("read docx");
    let mut archive = ZipArchive::new(Cursor::new(bytes)).expect("docx is a zip");
    let mut part = archive.by_name("word/document.xml").expect("main part");
    let mut xml = String::new();
    part.read_to_string(&mut xml).unwrap();
    xml
}

pub fn employee() -> Payload {
    Payload::from_json(
        r#"{"lastName":"Nowak","firstName":"Anna","birthDate":"1990-04-12","pesel":"90041212345","employerName":"Booq Sp. z o.o."}"#,
    )
    .expect("fixture payload parses")
}

pub fn session() -> RemoteSession {
    RemoteSession::new(BearerToken::new("test-token", Duration::from_secs(3600)))
}
