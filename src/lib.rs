pub mod error;
pub mod io;
pub mod llm;
pub mod models;
pub mod stages;

pub use error::{PipelineError, Result};
pub use io::{export_download, read_source_file, OutputLayout, SourceFile};
pub use llm::{GenerationConfig, LlmClient, MockGenerator, Provider, TextGenerator};
pub use models::{Artifact, ArtifactKind, DownloadArtifact, PipelineState, RunMode, RunReport, StageId};
pub use stages::{
    build_request, execute_stage1, execute_stage2, execute_stage3, strip_code_fences, Pipeline,
    PipelineConfig, RunOutcome,
};
