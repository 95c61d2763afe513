//! Core data types shared between the pipeline and the CLI.

pub mod source;

pub use source::{Source, dedup_by_locator};
