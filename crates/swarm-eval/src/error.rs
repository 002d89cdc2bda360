//! Error types for config synthesis and run analysis.

use swarm_geom::GeometryError;
use thiserror::Error;

/// Errors raised by the evaluation pipeline.
///
/// Every variant is fatal to the stage that raised it; nothing is retried.
#[derive(Debug, Error)]
pub enum EvalError {
    /// Robot shape, workspace, or planner config shape invariant violated.
    #[error("config validation error: {0}")]
    ConfigValidation(String),

    /// Numeric input has the wrong number of rows, columns, or entries.
    #[error("data shape error: {0}")]
    DataShape(String),

    /// A `Collision` line that does not carry the expected fields.
    #[error("log parse error at line {line}: {message}: `{text}`")]
    LogParse {
        /// 1-based line number
        line: usize,
        /// Offending line
        text: String,
        /// What was wrong with it
        message: String,
    },

    /// Derived results disagree with what the simulator reported.
    #[error("consistency error: {0}")]
    Consistency(String),

    /// Obstacle geometry could not be loaded or decomposed.
    #[error(transparent)]
    Geometry(#[from] GeometryError),

    /// JSON could not be read or written.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
