//! Error types for the editor

use thiserror::Error;
use vellum_model::{ModelError, Path};

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Node at {0} is not a text node")]
    NotText(Path),

    #[error("Operation requires a collapsed selection")]
    RangeNotCollapsed,

    #[error("Operation requires a set selection")]
    SelectionUnset,

    #[error("Schema rule failed to converge while repairing: {0}")]
    SchemaBroken(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
