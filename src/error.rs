use std::path::PathBuf;

use thiserror::Error;

use crate::models::{PipelineState, StageId};

/// Errors surfaced by the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Missing or invalid credential/provider settings; fatal before any stage runs
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Uploaded source could not be used as pipeline input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model call for a stage failed
    #[error("{stage} failed: {message}")]
    ExternalService { stage: StageId, message: String },

    /// A persisted artifact could not be written
    #[error("failed to write {path:?}: {source}")]
    OutputWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Another run holds the output root
    #[error("another run is in progress (lock file {0:?} exists)")]
    RunInProgress(PathBuf),

    #[error("invalid pipeline transition from {from:?} to {to:?}")]
    InvalidTransition {
        from: PipelineState,
        to: PipelineState,
    },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
