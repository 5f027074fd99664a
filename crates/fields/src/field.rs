use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use crate::storage::StorageError;

/// A named attribute we ask the model to extract for every website.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractField {
    pub id: String,
    pub name: String,
}

impl ExtractField {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }

    /// Build a user-defined field, deriving a stable id from the name and
    /// the creation time: `custom_<slug>_<millis>`.
    pub fn custom(name: &str) -> Result<Self, StorageError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StorageError::InvalidField("field name is empty".to_string()));
        }

        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        let whitespace = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"));
        let slug = whitespace.replace_all(&name.to_lowercase(), "_").to_string();
        let millis = chrono::Utc::now().timestamp_millis();

        Ok(Self::new(format!("custom_{}_{}", slug, millis), name))
    }

    pub fn is_default(&self) -> bool {
        DEFAULT_EXTRACT_FIELDS.iter().any(|(id, _)| *id == self.id)
    }
}

/// Built-in fields, always listed first and never stored.
pub const DEFAULT_EXTRACT_FIELDS: [(&str, &str); 4] = [
    ("country", "Primary country of residence"),
    ("industry", "Primary industry (MSCI GICS)"),
    ("language", "Primary language spoken"),
    ("size", "Estimated company size (employees)"),
];

pub fn default_fields() -> Vec<ExtractField> {
    DEFAULT_EXTRACT_FIELDS
        .iter()
        .map(|(id, name)| ExtractField::new(*id, *name))
        .collect()
}
