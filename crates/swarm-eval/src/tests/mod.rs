//! Cross-module tests for the preparation and analysis pipeline.
//!
//! - `integration.rs`: mesh to planner config, and raw run files to aggregate
//! - `determinism.rs`: repeated runs of each stage produce identical output
//! - `helpers.rs`: fixtures and synthetic run files

mod determinism;
mod helpers;

// Re-export for convenience
pub use helpers::*;
