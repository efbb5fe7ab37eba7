//! Shared CLI argument types
//!
//! Reusable argument structs, flattened into commands with
//! `#[command(flatten)]`.

mod common;
mod filters;
mod global;

pub use common::OutputFormat;
pub use filters::RecordFilterArgs;
pub use global::GlobalOptions;
