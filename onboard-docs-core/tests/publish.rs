mod common;

use chrono::NaiveDate;
use common::{docx_template, document_xml, employee, pit2_form, session, write_file, FormShape};
use mockall::predicate::{always, eq, function};
use mockall::Sequence;
use onboard_docs_core::config::{GenerationConfig, PublishTarget};
use onboard_docs_core::contract::{
    ArtifactKind, CreateFolderOutcome, DriveDescriptor, DriveItem, MockConverter,
    MockCredentialProvider, MockDriveApi, SiteDescriptor,
};
use onboard_docs_core::credentials::BearerToken;
use onboard_docs_core::orchestrate::{generate_documents, publish_directory, publish_files};
use onboard_docs_core::session::RemoteSession;
use onboard_docs_core::uploader::{select_pdf_files, upload_directory};
use onboard_docs_core::DocError;
use std::path::Path;
use std::time::Duration;
use tempfile::tempdir;

fn item(name: &str) -> DriveItem {
    DriveItem {
        id: format!("id-{name}"),
        name: name.to_string(),
        web_url: Some(format!("https://contoso.sharepoint.com/{name}")),
    }
}

fn target() -> PublishTarget {
    PublishTarget {
        hostname: "contoso.sharepoint.com".into(),
        site_path: "HR".into(),
        drive_name: "Documents".into(),
        acronym: "ANO".into(),
        ..PublishTarget::default()
    }
}

/// A drive where site, library and both folder levels already exist.
fn provisioned_drive() -> MockDriveApi {
    let mut api = MockDriveApi::new();
    api.expect_get_site().returning(|_, _, _| {
        Ok(Some(SiteDescriptor {
            id: "site-1".into(),
            display_name: None,
            web_url: None,
        }))
    });
    api.expect_list_drives().returning(|_, _| {
        Ok(vec![DriveDescriptor {
            id: "drive-1".into(),
            name: "Documents".into(),
        }])
    });
    api.expect_get_item()
        .returning(|_, _, path| Ok(Some(item(path))));
    api.expect_create_folder().never();
    api
}

fn touch(dir: &Path, name: &str, bytes: &[u8]) {
    write_file(&dir.join(name), bytes);
}

#[test]
fn selects_only_immediate_pdfs_case_insensitively() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.pdf", b"%PDF a");
    touch(dir.path(), "b.PDF", b"%PDF b");
    touch(dir.path(), "c.txt", b"text");
    touch(dir.path(), "nested/d.pdf", b"%PDF d");
    std::fs::create_dir_all(dir.path().join("folder.pdf")).unwrap();

    let names: Vec<String> = select_pdf_files(dir.path())
        .unwrap()
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["a.pdf", "b.PDF"]);
}

#[tokio::test]
async fn one_failed_upload_does_not_stop_the_others() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "a.pdf", b"%PDF a");
    touch(dir.path(), "b.PDF", b"%PDF b");
    touch(dir.path(), "c.txt", b"text");

    let mut api = MockDriveApi::new();
    api.expect_put_content()
        .with(
            eq("test-token"),
            eq("drive-1"),
            eq("Pracownicy/ANO/a.pdf"),
            function(|content: &Vec<u8>| content.as_slice() == b"%PDF a"),
        )
        .times(1)
        .returning(|_, _, _, _| Ok(item("a.pdf")));
    api.expect_put_content()
        .with(always(), always(), eq("Pracownicy/ANO/b.PDF"), always())
        .times(1)
        .returning(|_, _, path, _| {
            Err(DocError::Remote {
                method: "PUT".into(),
                url: path.to_string(),
                status: 507,
                body: "insufficient storage".into(),
            })
        });

    let outcomes = upload_directory(&api, &session(), "drive-1", "Pracownicy/ANO/", dir.path())
        .await
        .unwrap();
    assert_eq!(outcomes.len(), 2);
    assert!(outcomes[0].is_success());
    assert_eq!(outcomes[0].remote_path, "Pracownicy/ANO/a.pdf");
    assert!(!outcomes[1].is_success());
    assert!(outcomes[1].local_path.ends_with("b.PDF"));
}

#[tokio::test]
async fn publish_directory_provisions_then_uploads() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "PIT2_ANowak.pdf", b"%PDF form");

    let mut api = MockDriveApi::new();
    api.expect_get_site().times(1).returning(|_, _, _| {
        Ok(Some(SiteDescriptor {
            id: "site-1".into(),
            display_name: None,
            web_url: None,
        }))
    });
    api.expect_list_drives().times(1).returning(|_, _| {
        Ok(vec![DriveDescriptor {
            id: "drive-1".into(),
            name: "Documents".into(),
        }])
    });
    api.expect_get_item()
        .with(always(), eq("drive-1"), eq("Pracownicy"))
        .returning(|_, _, _| Ok(Some(item("Pracownicy"))));
    api.expect_get_item()
        .with(always(), eq("drive-1"), eq("Pracownicy/ANO"))
        .returning(|_, _, _| Ok(None));
    api.expect_create_folder()
        .with(always(), eq("drive-1"), eq("Pracownicy"), eq("ANO"))
        .times(1)
        .returning(|_, _, _, _| Ok(CreateFolderOutcome::AlreadyExists));
    api.expect_put_content()
        .with(always(), eq("drive-1"), eq("Pracownicy/ANO/PIT2_ANowak.pdf"), always())
        .times(1)
        .returning(|_, _, _, _| Ok(item("PIT2_ANowak.pdf")));

    let mut session = session();
    let report = publish_directory(&api, &mut session, &target(), dir.path())
        .await
        .unwrap();
    assert_eq!(report.folder_path, "Pracownicy/ANO");
    assert_eq!(report.uploads.len(), 1);
    assert_eq!(report.failed(), 0);
}

/// A drive with the site and library but none of the folders yet.
fn empty_drive() -> MockDriveApi {
    let mut api = MockDriveApi::new();
    api.expect_get_site().returning(|_, _, _| {
        Ok(Some(SiteDescriptor {
            id: "site-1".into(),
            display_name: None,
            web_url: None,
        }))
    });
    api.expect_list_drives().returning(|_, _| {
        Ok(vec![DriveDescriptor {
            id: "drive-1".into(),
            name: "Documents".into(),
        }])
    });
    api.expect_get_item().returning(|_, _, _| Ok(None));
    api.expect_put_content()
        .returning(|_, _, path, _| Ok(item(path)));
    api
}

fn expect_create(api: &mut MockDriveApi, seq: &mut Sequence, parent: &'static str, name: &'static str) {
    api.expect_create_folder()
        .with(always(), eq("drive-1"), eq(parent), eq(name))
        .times(1)
        .in_sequence(seq)
        .returning(|_, _, _, name| Ok(CreateFolderOutcome::Created(item(name))));
}

#[tokio::test]
async fn empty_base_folder_puts_the_employee_folder_at_the_root() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "PIT2_ANowak.pdf", b"%PDF form");
    for base_folder in ["", "/"] {
        let mut api = empty_drive();
        let mut seq = Sequence::new();
        expect_create(&mut api, &mut seq, "", "ANO");
        let target = PublishTarget {
            base_folder: base_folder.into(),
            ..target()
        };
        let mut session = session();
        let report = publish_directory(&api, &mut session, &target, dir.path())
            .await
            .unwrap();
        assert_eq!(report.folder_path, "ANO");
        assert_eq!(report.uploads[0].remote_path, "ANO/PIT2_ANowak.pdf");
    }
}

#[tokio::test]
async fn nested_base_folder_is_created_one_segment_at_a_time() {
    let dir = tempdir().unwrap();
    touch(dir.path(), "PIT2_ANowak.pdf", b"%PDF form");
    let mut api = empty_drive();
    let mut seq = Sequence::new();
    expect_create(&mut api, &mut seq, "", "Pracownicy");
    expect_create(&mut api, &mut seq, "Pracownicy", "2026");
    expect_create(&mut api, &mut seq, "Pracownicy/2026", "ANO");

    let target = PublishTarget {
        base_folder: "/Pracownicy/2026/".into(),
        ..target()
    };
    let mut session = session();
    let report = publish_directory(&api, &mut session, &target, dir.path())
        .await
        .unwrap();
    assert_eq!(report.folder_path, "Pracownicy/2026/ANO");
    assert_eq!(
        report.uploads[0].remote_path,
        "Pracownicy/2026/ANO/PIT2_ANowak.pdf"
    );
}

#[tokio::test]
async fn publish_rejects_missing_directory_and_acronym() {
    let dir = tempdir().unwrap();
    let api = MockDriveApi::new();
    let mut session = session();

    let err = publish_directory(&api, &mut session, &target(), &dir.path().join("absent"))
        .await
        .unwrap_err();
    assert!(err.is_input_error());

    let no_acronym = PublishTarget {
        acronym: " ".into(),
        ..target()
    };
    let err = publish_directory(&api, &mut session, &no_acronym, dir.path())
        .await
        .unwrap_err();
    assert!(matches!(err, DocError::MissingInput(_)));
}

#[tokio::test]
async fn session_opens_with_provider_token() {
    let mut provider = MockCredentialProvider::new();
    provider
        .expect_acquire()
        .times(1)
        .returning(|| Ok(BearerToken::new("test-token", Duration::from_secs(3600))));
    let session = RemoteSession::open(&provider).await.unwrap();
    assert_eq!(session.bearer().unwrap(), "test-token");

    let mut failing = MockCredentialProvider::new();
    failing
        .expect_acquire()
        .returning(|| Err(DocError::Token("401 Unauthorized: invalid_client".into())));
    assert!(matches!(
        RemoteSession::open(&failing).await.unwrap_err(),
        DocError::Token(_)
    ));
}

fn generation_config(root: &Path) -> GenerationConfig {
    GenerationConfig {
        input_dir: root.join("inputfiles"),
        output_dir: root.join("outputfiles"),
        ..GenerationConfig::default()
    }
}

fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

#[tokio::test]
async fn generated_pdfs_are_published_together() {
    let root = tempdir().unwrap();
    let config = generation_config(root.path());
    write_file(&config.form_template_path(), &pit2_form(FormShape::default()));
    write_file(
        &config.document_template_path(),
        &docx_template(&document_xml(&["{{lastName}}"])),
    );
    let mut converter = MockConverter::new();
    converter
        .expect_convert()
        .times(1)
        .returning(|_, _| Ok(b"%PDF-1.4".to_vec()));

    let report = generate_documents(&config, &employee(), &converter, today());
    assert!(report.is_complete());
    let kinds: Vec<ArtifactKind> = report.artifacts.iter().map(|a| a.kind).collect();
    assert_eq!(
        kinds,
        vec![ArtifactKind::PdfForm, ArtifactKind::Docx, ArtifactKind::DocxPdf]
    );
    let pdfs = report.pdf_paths();
    assert_eq!(
        pdfs,
        vec![
            config.output_dir.join("PIT2_ANowak.pdf"),
            config.output_dir.join("Onboarding_ANowak.pdf"),
        ]
    );

    let mut api = provisioned_drive();
    api.expect_put_content()
        .times(2)
        .returning(|_, _, path, _| Ok(item(path)));
    let mut session = session();
    let published = publish_files(&api, &mut session, &target(), &pdfs)
        .await
        .unwrap();
    let remote: Vec<&str> = published.uploads.iter().map(|u| u.remote_path.as_str()).collect();
    assert_eq!(
        remote,
        vec![
            "Pracownicy/ANO/PIT2_ANowak.pdf",
            "Pracownicy/ANO/Onboarding_ANowak.pdf"
        ]
    );
    assert_eq!(published.failed(), 0);
}

#[test]
fn document_stage_failure_keeps_the_form() {
    let root = tempdir().unwrap();
    let config = generation_config(root.path());
    write_file(&config.form_template_path(), &pit2_form(FormShape::default()));
    let mut converter = MockConverter::new();
    converter.expect_convert().never();

    let report = generate_documents(&config, &employee(), &converter, today());
    assert!(report.form.is_ok());
    assert!(matches!(report.document, Err(DocError::TemplateNotFound(_))));
    assert!(!report.is_complete());
    assert_eq!(report.failures().len(), 1);
    assert_eq!(report.artifacts.len(), 1);
    assert!(config.output_dir.join("PIT2_ANowak.pdf").is_file());
}

#[test]
fn form_stage_failure_does_not_block_the_document() {
    let root = tempdir().unwrap();
    let config = generation_config(root.path());
    write_file(
        &config.document_template_path(),
        &docx_template(&document_xml(&["{{lastName}}"])),
    );
    let mut converter = MockConverter::new();
    converter
        .expect_convert()
        .returning(|_, _| Ok(b"%PDF-1.4".to_vec()));

    let report = generate_documents(&config, &employee(), &converter, today());
    assert!(matches!(report.form, Err(DocError::TemplateNotFound(_))));
    assert!(report.document.is_ok());
    assert_eq!(report.pdf_paths(), vec![config.output_dir.join("Onboarding_ANowak.pdf")]);
}
