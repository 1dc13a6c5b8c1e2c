//! Extraction engine applying the rule table and phone scan.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use vmindex_core::ExtractedFields;

use crate::patterns::{DEFAULT_PHONE_PATTERN, ExtractError, ExtractionRule, RuleDef};

/// Configuration for the extraction engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Rules in priority order.
    #[serde(default = "crate::patterns::default_rules")]
    pub rules: Vec<RuleDef>,

    /// Regex scanned globally for phone numbers.
    #[serde(default = "ExtractionConfig::default_phone_pattern")]
    pub phone_pattern: String,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            rules: crate::patterns::default_rules(),
            phone_pattern: Self::default_phone_pattern(),
        }
    }
}

impl ExtractionConfig {
    fn default_phone_pattern() -> String {
        DEFAULT_PHONE_PATTERN.to_string()
    }
}

/// Extracts caller name, company and phone numbers from text.
#[derive(Debug, Clone)]
pub struct FieldExtractor {
    rules: Vec<ExtractionRule>,
    phone: Regex,
}

impl FieldExtractor {
    /// Compile the configured rules.
    ///
    /// # Errors
    /// Returns an error if any rule or the phone pattern fails to compile.
    pub fn new(config: &ExtractionConfig) -> Result<Self, ExtractError> {
        let rules = config
            .rules
            .iter()
            .map(RuleDef::build)
            .collect::<Result<Vec<_>, _>>()?;
        let phone =
            Regex::new(&config.phone_pattern).map_err(|source| ExtractError::InvalidPattern {
                id: "phone".to_string(),
                source,
            })?;

        Ok(Self { rules, phone })
    }

    /// Create an extractor with the default rule table.
    ///
    /// # Errors
    /// Returns an error if default pattern compilation fails.
    pub fn with_defaults() -> Result<Self, ExtractError> {
        Self::new(&ExtractionConfig::default())
    }

    /// Number of name/company rules, in priority order.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Extract fields from `text`. Unmatched patterns leave fields absent.
    #[must_use]
    pub fn extract(&self, text: &str) -> ExtractedFields {
        let (name, company) = self
            .rules
            .iter()
            .find_map(|rule| {
                let fields = rule.apply(text)?;
                debug!("Extraction rule '{}' matched", rule.id);
                Some(fields)
            })
            .unwrap_or_default();

        let phone_numbers = self
            .phone
            .find_iter(text)
            .map(|m| m.as_str().to_string())
            .collect();

        ExtractedFields {
            name,
            company,
            phone_numbers,
        }
    }
}

static DEFAULT_EXTRACTOR: Lazy<Result<FieldExtractor, ExtractError>> =
    Lazy::new(FieldExtractor::with_defaults);

/// Extract with the default rule table.
#[must_use]
pub fn extract(text: &str) -> ExtractedFields {
    match DEFAULT_EXTRACTOR.as_ref() {
        Ok(extractor) => extractor.extract(text),
        Err(e) => {
            error!("Default extraction rules failed to compile: {e}");
            ExtractedFields::default()
        }
    }
}
