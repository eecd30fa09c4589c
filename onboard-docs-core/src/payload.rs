//! Employee payload: the one JSON object every run is driven by.
//!
//! The payload is parsed once and then passed by reference to each pipeline
//! stage. Unknown keys are kept so DOCX templates can reference them; well-known
//! keys have typed accessors. Any key that is absent reads as the empty string.

use std::collections::BTreeMap;

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{DocError, Result};

pub const LAST_NAME: &str = "lastName";
pub const FIRST_NAME: &str = "firstName";
pub const BIRTH_DATE: &str = "birthDate";
pub const PESEL: &str = "pesel";
pub const EMPLOYER_NAME: &str = "employerName";

/// Initial used in artifact names when the payload has no first name.
pub const MISSING_INITIAL: char = '_';

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload {
    fields: BTreeMap<String, String>,
}

impl Payload {
    /// Parse the command-line JSON value. Scalars are stringified, `null` becomes
    /// the empty string; nested arrays/objects are kept as compact JSON text.
    pub fn from_json(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Err(DocError::InvalidPayload("no payload supplied".into()));
        }
        let value: Value = serde_json::from_str(raw)
            .map_err(|e| DocError::InvalidPayload(format!("malformed JSON: {e}")))?;
        let Value::Object(map) = value else {
            return Err(DocError::InvalidPayload(
                "payload must be a JSON object".into(),
            ));
        };

        let fields = map
            .into_iter()
            .map(|(key, value)| {
                let text = match value {
                    Value::Null => String::new(),
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => n.to_string(),
                    other => other.to_string(),
                };
                (key, text)
            })
            .collect::<BTreeMap<_, _>>();

        debug!(keys = ?fields.keys().collect::<Vec<_>>(), "Parsed payload");
        Ok(Self { fields })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Value for `key`, or `""` when absent.
    pub fn get(&self, key: &str) -> &str {
        self.fields.get(key).map(String::as_str).unwrap_or("")
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    pub fn last_name(&self) -> &str {
        self.get(LAST_NAME)
    }

    pub fn first_name(&self) -> &str {
        self.get(FIRST_NAME)
    }

    pub fn birth_date(&self) -> &str {
        self.get(BIRTH_DATE)
    }

    pub fn pesel(&self) -> &str {
        self.get(PESEL)
    }

    pub fn employer_name(&self) -> &str {
        self.get(EMPLOYER_NAME)
    }

    /// `{prefix}_{firstInitial}{lastName}`, e.g. `PIT2_JKowalski`.
    pub fn artifact_basename(&self, prefix: &str) -> String {
        let initial = self
            .first_name()
            .trim()
            .chars()
            .next()
            .unwrap_or(MISSING_INITIAL);
        format!("{prefix}_{initial}{}", self.last_name().trim())
    }

    /// PESEL with everything but the last four digits hidden, for logs.
    pub fn masked_pesel(&self) -> String {
        let pesel = self.pesel();
        let count = pesel.chars().count();
        if count <= 4 {
            return "*".repeat(count);
        }
        let visible: String = pesel.chars().skip(count - 4).collect();
        format!("{}{visible}", "*".repeat(count - 4))
    }

    pub fn trace_loaded(&self) {
        info!(
            last_name = self.last_name(),
            first_name = self.first_name(),
            birth_date = self.birth_date(),
            pesel = %self.masked_pesel(),
            employer_name = self.employer_name(),
            "Loaded payload"
        );
    }
}
