use std::path::PathBuf;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{PipelineError, Result};
use crate::io::{write_text, OutputLayout};
use crate::llm::{
    build_system_prompt, build_task_prompt, persona, stage_task, GenerationError, GenerationRequest,
    TextGenerator,
};
use crate::models::{Artifact, StageId, StageTrace};

/// Artifact produced by a stage and where it was persisted
#[derive(Debug, Clone)]
pub struct StageOutput {
    pub artifact: Artifact,
    pub path: PathBuf,
}

/// Build the prompt pair a stage sends for `input`
pub fn build_request(stage: StageId, input: &str) -> GenerationRequest {
    GenerationRequest {
        stage,
        system: build_system_prompt(persona(stage)),
        user: build_task_prompt(&stage_task(stage, input)),
    }
}

/// Run one stage: render its template over `input`, call the model once,
/// post-process the text, and overwrite the stage's fixed output path.
///
/// Trace lines are appended to `trace` whether or not the call succeeds.
pub async fn invoke_stage(
    generator: &dyn TextGenerator,
    stage: StageId,
    input: &Artifact,
    layout: &OutputLayout,
    trace: &mut StageTrace,
    postprocess: fn(&str) -> String,
) -> Result<StageOutput> {
    if input.kind != stage.input_kind() {
        warn!(
            "{} expected {:?} input, got {:?}",
            stage,
            stage.input_kind(),
            input.kind
        );
    }
    if input.is_empty() {
        return Err(PipelineError::InvalidInput(format!("{} input is empty", stage)));
    }

    let agent = persona(stage);
    let request = build_request(stage, input.content());

    trace.record(format!("Agent: {}", agent.role));
    trace.record(format!("Model: {}", generator.model()));
    trace.record(format!(
        "Task prompt: {} chars (input {} chars)",
        request.user.len(),
        input.content().len()
    ));
    info!("Starting {}", stage);
    debug!("{} system prompt: {}", stage, request.system);

    let started = Instant::now();
    let raw = match generator.generate(&request).await {
        Ok(text) => text,
        Err(e) => {
            let message = e.to_string();
            trace.record(format!("Error after {} ms: {}", started.elapsed().as_millis(), message));
            warn!("{} failed: {}", stage, message);
            return Err(PipelineError::ExternalService { stage, message });
        }
    };
    trace.record(format!(
        "Response: {} chars in {} ms",
        raw.len(),
        started.elapsed().as_millis()
    ));

    let content = postprocess(&raw);
    if content.len() != raw.len() {
        trace.record(format!("Post-processed to {} chars", content.len()));
    }
    if content.trim().is_empty() {
        let message = GenerationError::EmptyResponse.to_string();
        trace.record(format!("Rejected output: {}", message));
        warn!("{} returned no usable text", stage);
        return Err(PipelineError::ExternalService { stage, message });
    }

    let path = layout.stage_path(stage);
    if let Err(e) = write_text(&path, &content) {
        trace.record(format!("Write failed: {}", e));
        return Err(e);
    }
    trace.record(format!("Saved to {}", path.display()));
    info!("{} complete, output written to {:?}", stage, path);

    Ok(StageOutput {
        artifact: Artifact::produced(stage, content, trace.clone()),
        path,
    })
}
