use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Fully qualified name of the PIT-2 field that receives the fill date.
pub const PIT2_DATE_FIELD: &str = "topmostSubform[0].Page1[0].DataWypelnienia[0]";

/// Payload key -> fully qualified AcroForm field name of the source PDF.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMapping(BTreeMap<String, String>);

impl FieldMapping {
    pub fn new(entries: BTreeMap<String, String>) -> Self {
        Self(entries)
    }

    /// Built-in mapping for the PIT-2 employee declaration.
    pub fn pit2() -> Self {
        let entries = [
            ("lastName", "topmostSubform[0].Page1[0].Nazwisko[0]"),
            ("firstName", "topmostSubform[0].Page1[0].Imie[0]"),
            ("birthDate", "topmostSubform[0].Page1[0].DataUrodzenia[0]"),
            ("pesel", "topmostSubform[0].Page1[0].PESEL[0]"),
            ("employerName", "topmostSubform[0].Page1[0].NazwaPlatnika[0]"),
        ];
        Self(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for FieldMapping {
    fn default() -> Self {
        Self::pit2()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormConfig {
    pub template: PathBuf,
    pub prefix: String,
    pub fields: FieldMapping,
    pub date_field: String,
}

impl Default for FormConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("PIT2.pdf"),
            prefix: "PIT2".into(),
            fields: FieldMapping::pit2(),
            date_field: PIT2_DATE_FIELD.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DocumentConfig {
    pub template: PathBuf,
    pub prefix: String,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            template: PathBuf::from("onboarding.docx"),
            prefix: "Onboarding".into(),
        }
    }
}

/// Where templates are read from and where artifacts are written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub form: FormConfig,
    pub document: DocumentConfig,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("inputfiles"),
            output_dir: PathBuf::from("outputfiles"),
            form: FormConfig::default(),
            document: DocumentConfig::default(),
        }
    }
}

impl GenerationConfig {
    pub fn form_template_path(&self) -> PathBuf {
        resolve(&self.input_dir, &self.form.template)
    }

    pub fn document_template_path(&self) -> PathBuf {
        resolve(&self.input_dir, &self.document.template)
    }

    pub fn trace_loaded(&self) {
        info!(
            input_dir = %self.input_dir.display(),
            output_dir = %self.output_dir.display(),
            form_template = %self.form.template.display(),
            document_template = %self.document.template.display(),
            mapped_fields = self.form.fields.len(),
            "Loaded generation config"
        );
        debug!(?self, "Generation config (full debug)");
    }
}

fn resolve(dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        file.to_path_buf()
    } else {
        dir.join(file)
    }
}

/// Remote document library location: `{hostname}:/sites/{site_path}`, library
/// `drive_name`, folder `{base_folder}/{acronym}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishTarget {
    pub hostname: String,
    pub site_path: String,
    pub drive_name: String,
    pub base_folder: String,
    pub acronym: String,
}

pub const DEFAULT_HOSTNAME: &str = "booqpoznan.sharepoint.com";
pub const DEFAULT_SITE_PATH: &str = "AplicationDeployment";
pub const DEFAULT_DRIVE_NAME: &str = "Biblioteka dokumentów";
pub const DEFAULT_BASE_FOLDER: &str = "Pracownicy";

/// The acronym has no default and must be supplied per run.
impl Default for PublishTarget {
    fn default() -> Self {
        Self {
            hostname: DEFAULT_HOSTNAME.to_string(),
            site_path: DEFAULT_SITE_PATH.to_string(),
            drive_name: DEFAULT_DRIVE_NAME.to_string(),
            base_folder: DEFAULT_BASE_FOLDER.to_string(),
            acronym: String::new(),
        }
    }
}

impl PublishTarget {
    pub fn trace_loaded(&self) {
        info!(
            hostname = %self.hostname,
            site_path = %self.site_path,
            drive_name = %self.drive_name,
            base_folder = %self.base_folder,
            acronym = %self.acronym,
            "Loaded publish target"
        );
    }
}

/// Client-credential grant inputs. Never serialized, never printed.
#[derive(Clone)]
pub struct Credentials {
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}
