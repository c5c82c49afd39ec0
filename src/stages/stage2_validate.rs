use crate::error::Result;
use crate::io::OutputLayout;
use crate::llm::TextGenerator;
use crate::models::{Artifact, StageId, StageTrace};

use super::{invoke_stage, StageOutput};

/// Execute Stage 2: validate and complete the reviewer's documentation
pub async fn execute_stage2(
    generator: &dyn TextGenerator,
    review_doc: &Artifact,
    layout: &OutputLayout,
    trace: &mut StageTrace,
) -> Result<StageOutput> {
    invoke_stage(generator, StageId::Validate, review_doc, layout, trace, str::to_string).await
}
