///
/// This module implements the CLI interface for onboard-docs: command parsing,
/// argument validation, and the `run` entrypoint shared by `main` and the tests.
///
/// All document and remote logic lives in the [`onboard-docs-core`] crate;
/// this module is strictly CLI glue.
///
/// ## Commands
/// - `generate`: fill the PDF form and render the DOCX for one payload,
///   optionally publishing the produced PDFs (`--publish <ACRONYM>`).
/// - `upload`: publish one file, or every PDF of `--dir`, into
///   `{base_folder}/{acronym}`.
/// - `fields`: list the form fields of a PDF template.
///
/// ## Exit codes
/// - `0` success
/// - `1` a stage, lookup, conversion or upload failed
/// - `2` usage or input error (see [`exit_code`])
///
/// [`onboard-docs-core`]: ../../onboard-docs-core/
use crate::load_config::load_optional_config;
use crate::upload::{apply_target_overrides, credentials_from_args, print_report, RemoteClient};
use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use onboard_docs_core::config::GenerationConfig;
use onboard_docs_core::converter::SofficeConverter;
use onboard_docs_core::credentials::DEFAULT_AUTHORITY;
use onboard_docs_core::form_filler::inspect_fields;
use onboard_docs_core::graph::DEFAULT_GRAPH_BASE;
use onboard_docs_core::orchestrate::{generate_documents, publish_directory, publish_files};
use onboard_docs_core::payload::Payload;
use onboard_docs_core::uploader::select_pdf_files;
use onboard_docs_core::DocError;
use std::path::PathBuf;

/// CLI for onboard-docs: generate and publish employee onboarding documents.
#[derive(Parser)]
#[clap(
    name = "onboard-docs",
    version,
    about = "Generate per-employee onboarding documents and publish them to a document library"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fill the PDF form and render the DOCX template for one employee
    Generate(GenerateArgs),
    /// Upload one file, or every PDF of a directory, into the employee folder
    Upload(UploadArgs),
    /// List the form fields of a PDF template
    Fields {
        /// PDF to inspect (defaults to the configured form template)
        template: Option<PathBuf>,
        /// Path to the YAML config file
        #[clap(long)]
        config: Option<PathBuf>,
    },
}

/// Remote library location and credentials shared by `generate` and `upload`.
#[derive(Args, Debug, Clone)]
pub struct RemoteArgs {
    #[clap(long, env = "TENANT_ID")]
    pub tenant_id: Option<String>,
    #[clap(long, env = "CLIENT_ID")]
    pub client_id: Option<String>,
    #[clap(long, env = "CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,
    #[clap(long)]
    pub hostname: Option<String>,
    #[clap(long)]
    pub site_path: Option<String>,
    #[clap(long)]
    pub drive_name: Option<String>,
    #[clap(long)]
    pub base_folder: Option<String>,
    #[clap(long, env = "GRAPH_BASE_URL", default_value = DEFAULT_GRAPH_BASE, hide = true)]
    pub graph_base_url: String,
    #[clap(long, env = "AUTHORITY_URL", default_value = DEFAULT_AUTHORITY, hide = true)]
    pub authority_url: String,
}

#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// JSON payload, e.g. '{"lastName":"Kowalski","firstName":"Jan"}'
    #[clap(value_name = "PAYLOAD")]
    pub payload: Option<String>,
    /// JSON payload (alternative to the positional argument)
    #[clap(long = "payload", value_name = "JSON", conflicts_with = "payload")]
    pub payload_flag: Option<String>,
    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    /// Directory holding the templates
    #[clap(long)]
    pub input_dir: Option<PathBuf>,
    /// Directory receiving the generated files
    #[clap(long)]
    pub output_dir: Option<PathBuf>,
    /// After generating, upload the produced PDFs into `{base_folder}/<ACRONYM>`
    #[clap(long, value_name = "ACRONYM")]
    pub publish: Option<String>,
    #[clap(flatten)]
    pub remote: RemoteArgs,
}

#[derive(Args, Debug)]
pub struct UploadArgs {
    /// Folder to create under the base folder
    #[clap(long)]
    pub acronym: String,
    /// Local directory to upload (one level, PDF files only)
    #[clap(long)]
    pub dir: Option<PathBuf>,
    /// Local file to upload (when not using --dir)
    pub file: Option<PathBuf>,
    /// Path to the YAML config file
    #[clap(long)]
    pub config: Option<PathBuf>,
    #[clap(flatten)]
    pub remote: RemoteArgs,
}

/// Process exit code for an error returned by [`run`].
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<DocError>() {
        Some(doc_err) if doc_err.is_input_error() => 2,
        _ => 1,
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    match cli.command {
        Commands::Generate(args) => run_generate(args).await,
        Commands::Upload(args) => run_upload(args).await,
        Commands::Fields { template, config } => run_fields(template, config),
    }
}

fn generation_config(args: &GenerateArgs, mut config: GenerationConfig) -> GenerationConfig {
    if let Some(input_dir) = &args.input_dir {
        config.input_dir = input_dir.clone();
    }
    if let Some(output_dir) = &args.output_dir {
        config.output_dir = output_dir.clone();
    }
    config
}

async fn run_generate(args: GenerateArgs) -> Result<()> {
    let raw = args
        .payload
        .as_deref()
        .or(args.payload_flag.as_deref())
        .ok_or_else(|| DocError::MissingInput("payload (positional or --payload)".into()))?;
    let payload = Payload::from_json(raw)?;
    payload.trace_loaded();

    let file_config = load_optional_config(args.config.as_deref())?;
    let config = generation_config(&args, file_config.generation);
    config.trace_loaded();

    // Validate publishing inputs before producing anything.
    let publish = match &args.publish {
        Some(acronym) => {
            let credentials = credentials_from_args(&args.remote)?;
            let mut target = apply_target_overrides(file_config.publish, &args.remote);
            target.acronym = acronym.clone();
            target.trace_loaded();
            Some((credentials, target))
        }
        None => None,
    };

    tracing::info!(command = "generate", "Starting document generation");
    let converter = SofficeConverter::discover();
    let today = chrono::Local::now().date_naive();
    let report = generate_documents(&config, &payload, &converter, today);

    for artifact in &report.artifacts {
        println!("Created: {}", artifact.path.display());
    }
    let failures = report.failures();
    for (stage, e) in &failures {
        eprintln!("FAILED {stage}: {e}");
    }
    if !failures.is_empty() {
        tracing::error!(command = "generate", failed = failures.len(), "Generation incomplete");
        anyhow::bail!("{} of 2 generation stages failed", failures.len());
    }
    tracing::info!(command = "generate", artifacts = report.artifacts.len(), "Generation complete");

    let Some((credentials, target)) = publish else {
        return Ok(());
    };
    let mut remote = RemoteClient::connect(credentials, &args.remote).await?;
    let published =
        publish_files(&remote.api, &mut remote.session, &target, &report.pdf_paths()).await?;
    let failed = print_report(&published);
    if failed > 0 {
        anyhow::bail!("{failed} upload(s) failed");
    }
    Ok(())
}

/// What `upload` was asked to send.
enum UploadSelection {
    Directory(PathBuf),
    File(PathBuf),
}

fn upload_selection(args: &UploadArgs) -> Result<UploadSelection, DocError> {
    match (&args.dir, &args.file) {
        (Some(dir), _) if !dir.is_dir() => {
            tracing::error!(dir = %dir.display(), "--dir is not an existing directory");
            Err(DocError::MissingInput(format!(
                "--dir must point to an existing directory: {}",
                dir.display()
            )))
        }
        (Some(dir), _) => Ok(UploadSelection::Directory(dir.clone())),
        (None, Some(file)) if !file.is_file() => Err(DocError::MissingInput(format!(
            "no such file: {}",
            file.display()
        ))),
        (None, Some(file)) => Ok(UploadSelection::File(file.clone())),
        (None, None) => Err(DocError::MissingInput(
            "either --dir <folder> or <file>".into(),
        )),
    }
}

async fn run_upload(args: UploadArgs) -> Result<()> {
    let credentials = credentials_from_args(&args.remote)?;
    let selection = upload_selection(&args)?;

    let file_config = load_optional_config(args.config.as_deref())?;
    let mut target = apply_target_overrides(file_config.publish, &args.remote);
    target.acronym = args.acronym.clone();
    target.trace_loaded();

    if let UploadSelection::Directory(dir) = &selection {
        if select_pdf_files(dir)?.is_empty() {
            println!("No PDF files found in directory: {}", dir.display());
            return Ok(());
        }
    }

    tracing::info!(command = "upload", "Starting upload");
    let mut remote = RemoteClient::connect(credentials, &args.remote).await?;
    let report = match &selection {
        UploadSelection::Directory(dir) => {
            publish_directory(&remote.api, &mut remote.session, &target, dir).await?
        }
        UploadSelection::File(file) => {
            publish_files(
                &remote.api,
                &mut remote.session,
                &target,
                std::slice::from_ref(file),
            )
            .await?
        }
    };
    let failed = print_report(&report);
    if failed > 0 {
        tracing::error!(command = "upload", failed, "Some uploads failed");
        anyhow::bail!("{failed} upload(s) failed");
    }
    tracing::info!(command = "upload", "Upload complete");
    Ok(())
}

fn run_fields(template: Option<PathBuf>, config: Option<PathBuf>) -> Result<()> {
    let template = match template {
        Some(path) => path,
        None => load_optional_config(config.as_deref())?
            .generation
            .form_template_path(),
    };
    tracing::info!(command = "fields", template = %template.display(), "Inspecting form fields");
    let fields = inspect_fields(&template)?;
    if fields.is_empty() {
        println!("No form fields in {}", template.display());
    }
    for field in fields {
        println!(
            "{} => {} {}",
            field.name,
            field.kind.as_deref().unwrap_or("-"),
            field.value.as_deref().unwrap_or("")
        );
    }
    Ok(())
}
