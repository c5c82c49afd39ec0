use crate::error::Result;
use crate::io::OutputLayout;
use crate::llm::TextGenerator;
use crate::models::{Artifact, StageId, StageTrace};

use super::{invoke_stage, StageOutput};

/// Execute Stage 1: review the legacy source into Markdown documentation
///
/// The reviewer's text is persisted as-is to `docs/code_docs_agent1.md`.
pub async fn execute_stage1(
    generator: &dyn TextGenerator,
    source: &Artifact,
    layout: &OutputLayout,
    trace: &mut StageTrace,
) -> Result<StageOutput> {
    invoke_stage(generator, StageId::Review, source, layout, trace, str::to_string).await
}
