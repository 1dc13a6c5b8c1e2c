//! Process-local vector store.
//!
//! Backs tests and single-process runs where no external store is wanted.
//! Contents live only as long as the [`MemoryStore`] value.

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
    clippy::missing_errors_doc,
    clippy::cast_possible_truncation
)]

mod memory;
pub mod scoring;

pub use memory::MemoryStore;
