/// `load_config` module: loads the optional static YAML config into the core's
/// [`GenerationConfig`] and [`PublishTarget`].
///
/// # Responsibilities
/// - Parse the user-supplied YAML file into type-safe structs
/// - Fill every key the file leaves out with the built-in default
/// - Never read secrets: credentials come from flags or the environment only
///
/// # Accepted schema
/// ```yaml
/// generation:
///   input_dir: inputfiles
///   output_dir: outputfiles
///   form:
///     template: PIT2.pdf
///     prefix: PIT2
///     fields:
///       lastName: "topmostSubform[0].Page1[0].Nazwisko[0]"
///   document:
///     template: onboarding.docx
///     prefix: Onboarding
/// publish:
///   hostname: contoso.sharepoint.com
///   site_path: HR
///   drive_name: Documents
///   base_folder: Pracownicy
/// ```
///
/// # Errors
/// Unreadable or malformed files surface as [`DocError::InvalidConfig`] wrapped in
/// `anyhow::Error`, so the CLI reports them as usage errors.
use anyhow::Result;
use onboard_docs_core::config::{GenerationConfig, PublishTarget};
use onboard_docs_core::DocError;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::{error, info};

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub generation: GenerationConfig,
    pub publish: PublishTarget,
}

/// Loads a static YAML config file (no secrets).
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(DocError::InvalidConfig(format!(
                "Failed to read config file {:?}: {}",
                path_ref, e
            ))
            .into());
        }
    };

    // An empty file is a valid "all defaults" config.
    if config_content.trim().is_empty() {
        info!(config_path = ?path_ref, "Config file is empty; using defaults");
        return Ok(CliConfig::default());
    }

    let config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(
                DocError::InvalidConfig(format!("Failed to parse config YAML: {e}")).into(),
            );
        }
    };
    Ok(config)
}

/// [`load_config`] when a path was given, built-in defaults otherwise.
pub fn load_optional_config(path: Option<&Path>) -> Result<CliConfig> {
    match path {
        Some(path) => load_config(path),
        None => Ok(CliConfig::default()),
    }
}
