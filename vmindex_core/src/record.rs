//! Records flowing through ingestion, from raw input to persisted form.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Scalar metadata value. Vector stores reject nested structures, so the
/// type has no way to express them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for MetadataValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Str(s) => write!(f, "{s}"),
        }
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Metadata keys derived from extraction.
pub const FROM_NAME_KEY: &str = "from_name";
pub const FROM_COMPANY_KEY: &str = "from_company";
pub const PHONE_KEY: &str = "phone";
pub const INDEXED_AT_KEY: &str = "indexed_at";

/// Caller attributes pulled out of free text. Every field may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractedFields {
    pub name: Option<String>,
    pub company: Option<String>,
    pub phone_numbers: Vec<String>,
}

impl ExtractedFields {
    /// Flatten into scalar metadata. Absent fields produce no key; phone
    /// numbers are joined since list values are not storable.
    #[must_use]
    pub fn to_metadata(&self) -> Metadata {
        let mut metadata = Metadata::new();
        if let Some(name) = &self.name {
            metadata.insert(FROM_NAME_KEY.to_string(), name.as_str().into());
        }
        if let Some(company) = &self.company {
            metadata.insert(FROM_COMPANY_KEY.to_string(), company.as_str().into());
        }
        if !self.phone_numbers.is_empty() {
            metadata.insert(
                PHONE_KEY.to_string(),
                self.phone_numbers.join(", ").into(),
            );
        }
        metadata
    }
}

/// A batch input item as supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawRecordWire")]
pub struct RawRecord {
    pub id: String,
    pub source_text: String,
    pub metadata: Metadata,
}

impl RawRecord {
    #[must_use]
    pub fn new(id: impl Into<String>, source_text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            source_text: source_text.into(),
            metadata: Metadata::new(),
        }
    }

    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<MetadataValue>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Accepted input shape: `transcript` is an alias for `source_text`, and a
/// top-level `from` lands in metadata unless metadata already carries one.
#[derive(Deserialize)]
struct RawRecordWire {
    id: String,
    #[serde(alias = "transcript")]
    source_text: String,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    from: Option<String>,
}

impl From<RawRecordWire> for RawRecord {
    fn from(wire: RawRecordWire) -> Self {
        let mut metadata = wire.metadata;
        if let Some(from) = wire.from {
            metadata
                .entry("from".to_string())
                .or_insert(MetadataValue::Str(from));
        }
        Self {
            id: wire.id,
            source_text: wire.source_text,
            metadata,
        }
    }
}

/// A record being enriched for persistence.
#[derive(Debug, Clone)]
pub struct Record {
    pub id: String,
    pub source_text: String,
    pub extracted: ExtractedFields,
    pub embedding: Option<Vec<f32>>,
    pub indexed_at: DateTime<Utc>,
    caller_metadata: Metadata,
}

impl Record {
    #[must_use]
    pub fn new(raw: RawRecord, extracted: ExtractedFields) -> Self {
        Self {
            id: raw.id,
            source_text: raw.source_text,
            extracted,
            embedding: None,
            indexed_at: Utc::now(),
            caller_metadata: raw.metadata,
        }
    }

    /// The embedding, or an empty slice before one is attached.
    #[must_use]
    pub fn vector(&self) -> &[f32] {
        self.embedding.as_deref().unwrap_or(&[])
    }

    /// Refresh `indexed_at`; called right before the record is written.
    pub fn stamp(&mut self) {
        self.indexed_at = Utc::now();
    }

    /// Metadata to persist: derived fields plus the caller's, with the
    /// caller's value kept on any key collision.
    #[must_use]
    pub fn metadata(&self) -> Metadata {
        let mut merged = self.extracted.to_metadata();
        merged.insert(
            INDEXED_AT_KEY.to_string(),
            self.indexed_at.to_rfc3339().into(),
        );
        merged.extend(
            self.caller_metadata
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        merged
    }
}
