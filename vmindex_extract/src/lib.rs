//! Caller detail extraction from free-text transcripts.
//!
//! Name and company come from an ordered rule table where the first
//! matching rule wins. Phone numbers come from an independent scan that
//! collects every match in order of appearance.

#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

pub mod engine;
pub mod patterns;

pub use engine::{ExtractionConfig, FieldExtractor, extract};
pub use patterns::{DEFAULT_PHONE_PATTERN, ExtractError, ExtractionRule, RuleDef, default_rules};
