//! Rule definitions for caller extraction.
//!
//! Rules are plain data so the table can be overridden from configuration.
//! Each rule binds capture groups of its regex to the fields it fills.

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phone-like tokens: ten-digit numbers in the usual separators, optionally
/// with a parenthesised area code, and spoken extensions.
pub const DEFAULT_PHONE_PATTERN: &str =
    r"(?i)\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}|\bextension\s+\d{3,4}|\bext\.?\s+\d{3,4}";

// One or two capitalised words. Under (?i) this is any one or two words,
// which keeps the loose matching of spoken introductions.
const NAME: &str = r"([A-Z][a-z]+ ?(?:[A-Z][a-z]+)?)";
const COMPANY: &str = r"([A-Za-z0-9\s&]+)";
const INTRO: &str = r"(?:this is|it['’]?s|it is)";

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("rule '{id}' has an invalid regex: {source}")]
    InvalidPattern {
        id: String,
        #[source]
        source: regex::Error,
    },

    #[error("rule '{id}' binds group {group} but its regex has only {available} groups")]
    UnboundGroup {
        id: String,
        group: usize,
        available: usize,
    },

    #[error("rule '{0}' binds no fields")]
    NoBindings(String),
}

/// Definition of a single extraction rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleDef {
    /// Identifier used in logs.
    pub id: String,

    /// Regex applied to the whole text.
    pub pattern: String,

    /// Capture group holding the caller's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_group: Option<usize>,

    /// Capture group holding the caller's company.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_group: Option<usize>,
}

impl RuleDef {
    fn new(id: &str, pattern: String, name_group: Option<usize>, company_group: Option<usize>) -> Self {
        Self {
            id: id.to_string(),
            pattern,
            name_group,
            company_group,
        }
    }

    /// Compile into an [`ExtractionRule`].
    ///
    /// # Errors
    /// Returns an error if the regex is invalid or a bound group does not exist.
    pub fn build(&self) -> Result<ExtractionRule, ExtractError> {
        let regex = Regex::new(&self.pattern).map_err(|source| ExtractError::InvalidPattern {
            id: self.id.clone(),
            source,
        })?;

        if self.name_group.is_none() && self.company_group.is_none() {
            return Err(ExtractError::NoBindings(self.id.clone()));
        }

        // captures_len counts the implicit whole-match group 0
        let available = regex.captures_len() - 1;
        for group in [self.name_group, self.company_group].into_iter().flatten() {
            if group == 0 || group > available {
                return Err(ExtractError::UnboundGroup {
                    id: self.id.clone(),
                    group,
                    available,
                });
            }
        }

        Ok(ExtractionRule {
            id: self.id.clone(),
            regex,
            name_group: self.name_group,
            company_group: self.company_group,
        })
    }
}

/// A compiled rule.
#[derive(Debug, Clone)]
pub struct ExtractionRule {
    pub id: String,
    regex: Regex,
    name_group: Option<usize>,
    company_group: Option<usize>,
}

impl ExtractionRule {
    /// `None` when the rule does not match. A match whose bound groups are
    /// empty still counts as a match, with those fields absent.
    #[must_use]
    pub fn apply(&self, text: &str) -> Option<(Option<String>, Option<String>)> {
        let caps = self.regex.captures(text)?;
        let field = |group: Option<usize>| {
            group
                .and_then(|g| caps.get(g))
                .map(|m| m.as_str().trim())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };
        Some((field(self.name_group), field(self.company_group)))
    }
}

/// Default rule table, most specific first.
#[must_use]
pub fn default_rules() -> Vec<RuleDef> {
    vec![
        RuleDef::new(
            "this_is_name_from_company",
            format!(r"(?i)\bthis is {NAME} from {COMPANY}"),
            Some(1),
            Some(2),
        ),
        RuleDef::new(
            "its_name_from_company",
            format!(r"(?i)\b(?:it['’]?s|it is) {NAME} from {COMPANY}"),
            Some(1),
            Some(2),
        ),
        RuleDef::new("intro_name", format!(r"(?i)\b{INTRO} {NAME}"), Some(1), None),
        RuleDef::new(
            "name_from_company",
            format!(r"(?i)\b{NAME} from {COMPANY}"),
            Some(1),
            Some(2),
        ),
    ]
}
