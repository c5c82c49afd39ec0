use crate::error::Result;
use crate::io::OutputLayout;
use crate::llm::TextGenerator;
use crate::models::{Artifact, StageId, StageTrace};

use super::{invoke_stage, StageOutput};

/// Execute Stage 3: generate modern Java from the validated documentation
///
/// The model's answer is fence-stripped before it is persisted to
/// `new_code/RefactoredCode.java`.
pub async fn execute_stage3(
    generator: &dyn TextGenerator,
    validated_doc: &Artifact,
    layout: &OutputLayout,
    trace: &mut StageTrace,
) -> Result<StageOutput> {
    invoke_stage(generator, StageId::Refactor, validated_doc, layout, trace, strip_code_fences)
        .await
}

/// Trim, drop every "```java" and "```" substring, trim again.
///
/// Purely textual: a fence sequence inside the code itself (e.g. in a
/// string literal) is removed too.
pub fn strip_code_fences(text: &str) -> String {
    text.trim()
        .replace("```java", "")
        .replace("```", "")
        .trim()
        .to_string()
}
