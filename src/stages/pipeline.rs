use std::path::PathBuf;

use chrono::Utc;
use tracing::{error, info};
use uuid::Uuid;

use crate::error::{PipelineError, Result};
use crate::io::{write_text, OutputLayout, SourceFile};
use crate::llm::TextGenerator;
use crate::models::{
    Artifact, DownloadArtifact, PipelineState, RunMode, RunReport, StageId, StageStatus, StageTrace,
};

use super::{execute_stage1, execute_stage2, execute_stage3, StageOutput};

/// Configuration for a pipeline run
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Docs-only or full refactor; fixed for the run
    pub mode: RunMode,
    /// Directory the fixed output paths live under
    pub workspace: PathBuf,
    /// Root each run under `runs/<run-id>/` instead of sharing the fixed paths
    pub isolate: bool,
    /// Remove an existing run lock instead of failing with `RunInProgress`
    pub force_unlock: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::Full,
            workspace: PathBuf::from("."),
            isolate: false,
            force_unlock: false,
        }
    }
}

/// Tracks the sequencer state and rejects transitions the state machine lacks
#[derive(Debug)]
pub struct Sequencer {
    state: PipelineState,
}

impl Sequencer {
    pub fn new() -> Self {
        Self {
            state: PipelineState::Idle,
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn advance(&mut self, next: PipelineState) -> Result<()> {
        if !self.state.can_transition_to(next) {
            return Err(PipelineError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        info!("Pipeline: {:?} -> {:?}", self.state, next);
        self.state = next;
        Ok(())
    }
}

impl Default for Sequencer {
    fn default() -> Self {
        Self::new()
    }
}

/// Result of a run: the report, every artifact produced, and the error that halted it
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    pub layout: OutputLayout,
    /// Source first, then one artifact per completed stage
    pub artifacts: Vec<Artifact>,
    pub error: Option<PipelineError>,
}

impl RunOutcome {
    pub fn artifact(&self, stage: StageId) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.kind == stage.output_kind())
    }

    pub fn into_result(self) -> Result<RunReport> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.report),
        }
    }
}

/// Runs review, then validate and refactor in full mode, each stage fed the
/// previous stage's output unchanged
pub struct Pipeline<'a> {
    generator: &'a dyn TextGenerator,
    config: PipelineConfig,
}

impl<'a> Pipeline<'a> {
    pub fn new(generator: &'a dyn TextGenerator, config: PipelineConfig) -> Self {
        Self { generator, config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Execute one run over an uploaded source.
    ///
    /// Errors before the first stage (run lock, legacy copy) are returned
    /// directly. A stage failure stops the run and is reported in the
    /// outcome; outputs of earlier stages stay on disk.
    pub async fn run(&self, source: &SourceFile) -> Result<RunOutcome> {
        let run_id = Uuid::new_v4();
        let mode = self.config.mode;
        let layout = if self.config.isolate {
            OutputLayout::isolated(&self.config.workspace, run_id)
        } else {
            OutputLayout::new(&self.config.workspace)
        };

        info!(
            "Run {} ({:?} mode) writing under {:?}",
            run_id,
            mode,
            layout.root()
        );

        let _lock = if self.config.force_unlock {
            layout.force_lock()?
        } else {
            layout.lock()?
        };
        write_text(&layout.legacy_path(&source.name), &source.content)?;

        let mut report = RunReport::new(run_id, mode);
        let mut sequencer = Sequencer::new();
        let mut current = Artifact::source(source.content.clone());
        let mut artifacts = vec![current.clone()];
        let mut failure = None;

        for &stage in mode.stages() {
            sequencer.advance(PipelineState::running(stage))?;
            report.state = sequencer.state();
            report.stage_mut(stage).status = StageStatus::Running;

            let mut trace = StageTrace::new();
            let result = self.execute(stage, &current, &layout, &mut trace).await;
            let entry = report.stage_mut(stage);
            entry.trace = trace;

            match result {
                Ok(StageOutput { artifact, path }) => {
                    sequencer.advance(PipelineState::done(stage))?;
                    entry.status = StageStatus::Complete;
                    entry.output_path = Some(path);
                    artifacts.push(artifact.clone());
                    current = artifact;
                }
                Err(e) => {
                    error!("{} error: {}", stage, e);
                    sequencer.advance(PipelineState::Failed)?;
                    entry.status = StageStatus::Errored(e.to_string());
                    failure = Some(e);
                    break;
                }
            }
            report.state = sequencer.state();
        }

        report.state = sequencer.state();
        report.finished_at = Some(Utc::now());

        if failure.is_none() && mode == RunMode::Full {
            report.download = Some(DownloadArtifact::refactored_code(current.content()));
        }

        Ok(RunOutcome {
            report,
            layout,
            artifacts,
            error: failure,
        })
    }

    async fn execute(
        &self,
        stage: StageId,
        input: &Artifact,
        layout: &OutputLayout,
        trace: &mut StageTrace,
    ) -> Result<StageOutput> {
        match stage {
            StageId::Review => execute_stage1(self.generator, input, layout, trace).await,
            StageId::Validate => execute_stage2(self.generator, input, layout, trace).await,
            StageId::Refactor => execute_stage3(self.generator, input, layout, trace).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;
    use crate::llm::MockGenerator;

    fn source(content: &str) -> SourceFile {
        SourceFile {
            name: "OldCode".to_string(),
            content: content.to_string(),
        }
    }

    fn config(workspace: &Path, mode: RunMode) -> PipelineConfig {
        PipelineConfig {
            mode,
            workspace: workspace.to_path_buf(),
            isolate: false,
            force_unlock: false,
        }
    }

    fn full_mock() -> MockGenerator {
        MockGenerator::new()
            .with_response(StageId::Review, "# Review\n\nLegacy `Vector` usage.")
            .with_response(StageId::Validate, "# Validated\n\nReplace `Vector` with `List`.")
            .with_response(StageId::Refactor, "```java\npublic class A{}\n```")
    }

    fn read(path: PathBuf) -> String {
        std::fs::read_to_string(path).unwrap()
    }

    #[tokio::test]
    async fn test_docs_only_runs_review_only() {
        let dir = tempfile::tempdir().unwrap();
        let mock = full_mock();
        let pipeline = Pipeline::new(&mock, config(dir.path(), RunMode::DocsOnly));

        let outcome = pipeline.run(&source("class A{}")).await.unwrap();
        let layout = &outcome.layout;

        assert_eq!(mock.called_stages(), vec![StageId::Review]);
        assert!(mock.calls()[0].user.contains("class A{}"));
        assert_eq!(read(layout.legacy_path("OldCode")), "class A{}");
        assert!(layout.stage_path(StageId::Review).exists());
        assert!(!layout.stage_path(StageId::Validate).exists());
        assert!(!layout.stage_path(StageId::Refactor).exists());

        assert_eq!(outcome.report.state, PipelineState::Stage1Done);
        assert!(outcome.report.succeeded());
        assert!(outcome.report.download.is_none());
        assert_eq!(outcome.report.stage(StageId::Validate).status, StageStatus::Skipped);
    }

    #[tokio::test]
    async fn test_docs_only_leaves_existing_refactored_code() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        write_text(&layout.stage_path(StageId::Refactor), "class Previous {}").unwrap();

        let mock = full_mock();
        Pipeline::new(&mock, config(dir.path(), RunMode::DocsOnly))
            .run(&source("class A{}"))
            .await
            .unwrap();

        assert_eq!(read(layout.stage_path(StageId::Refactor)), "class Previous {}");
    }

    #[tokio::test]
    async fn test_full_run_hands_off_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let mock = full_mock();
        let pipeline = Pipeline::new(&mock, config(dir.path(), RunMode::Full));

        let outcome = pipeline.run(&source("class A{}")).await.unwrap();

        let calls = mock.calls();
        assert_eq!(
            mock.called_stages(),
            vec![StageId::Review, StageId::Validate, StageId::Refactor]
        );
        assert!(calls[1].user.contains("# Review\n\nLegacy `Vector` usage."));
        assert!(calls[2].user.contains("# Validated\n\nReplace `Vector` with `List`."));

        let layout = &outcome.layout;
        assert_eq!(read(layout.stage_path(StageId::Refactor)), "public class A{}");
        assert_eq!(
            read(layout.stage_path(StageId::Validate)),
            "# Validated\n\nReplace `Vector` with `List`."
        );

        assert_eq!(outcome.report.state, PipelineState::Stage3Done);
        assert_eq!(outcome.artifacts.len(), 4);
        let download = outcome.report.download.as_ref().unwrap();
        assert_eq!(download.file_name, "RefactoredCode.java");
        assert_eq!(download.mime, "text/x-java-source");
        assert_eq!(download.data, "public class A{}");
        assert_eq!(
            outcome.artifact(StageId::Refactor).map(Artifact::content),
            Some("public class A{}")
        );
    }

    #[tokio::test]
    async fn test_failure_stops_downstream_stages() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        write_text(&layout.stage_path(StageId::Validate), "old validated").unwrap();
        write_text(&layout.stage_path(StageId::Refactor), "old code").unwrap();

        let mock = MockGenerator::new()
            .with_response(StageId::Review, "# Review")
            .with_failure(StageId::Validate, "503 Service Unavailable")
            .with_response(StageId::Refactor, "class B {}");
        let outcome = Pipeline::new(&mock, config(dir.path(), RunMode::Full))
            .run(&source("class A{}"))
            .await
            .unwrap();

        assert_eq!(mock.called_stages(), vec![StageId::Review, StageId::Validate]);
        assert_eq!(outcome.report.state, PipelineState::Failed);
        assert!(!outcome.report.succeeded());
        assert_eq!(
            outcome.report.error_message(),
            Some("stage 2 (Agent 2: documentation validation) failed: 503 Service Unavailable")
        );
        assert_eq!(outcome.report.stage(StageId::Refactor).status, StageStatus::Pending);
        assert!(outcome.report.download.is_none());

        // Earlier output persisted, later paths untouched
        assert_eq!(read(layout.stage_path(StageId::Review)), "# Review");
        assert_eq!(read(layout.stage_path(StageId::Validate)), "old validated");
        assert_eq!(read(layout.stage_path(StageId::Refactor)), "old code");

        assert!(matches!(
            outcome.into_result(),
            Err(PipelineError::ExternalService {
                stage: StageId::Validate,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_first_stage_failure_writes_no_docs() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockGenerator::new().with_failure(StageId::Review, "invalid api key");

        let outcome = Pipeline::new(&mock, config(dir.path(), RunMode::Full))
            .run(&source("class A{}"))
            .await
            .unwrap();

        assert_eq!(mock.called_stages(), vec![StageId::Review]);
        assert!(!outcome.layout.stage_path(StageId::Review).exists());
        assert!(outcome.report.stage(StageId::Review).trace_text().contains("invalid api key"));
    }

    #[tokio::test]
    async fn test_repeat_runs_produce_identical_files() {
        let dir = tempfile::tempdir().unwrap();
        let mock = full_mock();
        let pipeline = Pipeline::new(&mock, config(dir.path(), RunMode::Full));
        let layout = OutputLayout::new(dir.path());

        let snapshot = || -> Vec<String> {
            StageId::ALL
                .iter()
                .map(|&s| read(layout.stage_path(s)))
                .chain(std::iter::once(read(layout.legacy_path("OldCode"))))
                .collect()
        };

        pipeline.run(&source("class A{}")).await.unwrap();
        let first = snapshot();
        pipeline.run(&source("class A{}")).await.unwrap();
        assert_eq!(snapshot(), first);
    }

    #[tokio::test]
    async fn test_concurrent_run_in_same_root_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let _held = OutputLayout::new(dir.path()).lock().unwrap();

        let mock = full_mock();
        let result = Pipeline::new(&mock, config(dir.path(), RunMode::Full))
            .run(&source("class A{}"))
            .await;

        assert!(matches!(result, Err(PipelineError::RunInProgress(_))));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_forced_run_recovers_from_abandoned_lock() {
        let dir = tempfile::tempdir().unwrap();
        std::mem::forget(OutputLayout::new(dir.path()).lock().unwrap());

        let mock = full_mock();
        let mut forced = config(dir.path(), RunMode::DocsOnly);
        forced.force_unlock = true;
        let outcome = Pipeline::new(&mock, forced)
            .run(&source("class A{}"))
            .await
            .unwrap();

        assert!(outcome.report.succeeded());
        assert!(!dir.path().join(".javalift.lock").exists());
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_retry_after_killed_run_takes_over_lock() {
        let dir = tempfile::tempdir().unwrap();
        // Lock file of a process that no longer exists
        std::fs::write(dir.path().join(".javalift.lock"), "4294967295\n").unwrap();

        let mock = full_mock();
        let outcome = Pipeline::new(&mock, config(dir.path(), RunMode::DocsOnly))
            .run(&source("class A{}"))
            .await
            .unwrap();

        assert!(outcome.report.succeeded());
        assert_eq!(mock.called_stages(), vec![StageId::Review]);
    }

    #[tokio::test]
    async fn test_write_failure_is_output_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout::new(dir.path());
        // A directory where the review document should go makes the write fail
        std::fs::create_dir_all(layout.stage_path(StageId::Review)).unwrap();

        let mock = full_mock();
        let outcome = Pipeline::new(&mock, config(dir.path(), RunMode::Full))
            .run(&source("class A{}"))
            .await
            .unwrap();

        assert_eq!(mock.called_stages(), vec![StageId::Review]);
        assert_eq!(outcome.report.state, PipelineState::Failed);
        assert!(matches!(
            outcome.report.stage(StageId::Review).status,
            StageStatus::Errored(_)
        ));
        assert_eq!(outcome.report.stage(StageId::Validate).status, StageStatus::Pending);
        assert!(!layout.stage_path(StageId::Validate).exists());
        assert!(matches!(
            outcome.into_result(),
            Err(PipelineError::OutputWrite { .. })
        ));
    }

    #[tokio::test]
    async fn test_blank_review_fails_at_stage_one() {
        let dir = tempfile::tempdir().unwrap();
        let mock = MockGenerator::new()
            .with_response(StageId::Review, "  \n\t")
            .with_response(StageId::Validate, "# Validated")
            .with_response(StageId::Refactor, "class A {}");

        let outcome = Pipeline::new(&mock, config(dir.path(), RunMode::Full))
            .run(&source("class A{}"))
            .await
            .unwrap();

        assert_eq!(mock.called_stages(), vec![StageId::Review]);
        assert!(matches!(
            outcome.report.stage(StageId::Review).status,
            StageStatus::Errored(_)
        ));
        assert_eq!(outcome.report.stage(StageId::Validate).status, StageStatus::Pending);
        assert!(!outcome.layout.stage_path(StageId::Review).exists());
    }

    #[tokio::test]
    async fn test_isolated_runs_use_separate_roots() {
        let dir = tempfile::tempdir().unwrap();
        let mock = full_mock();
        let pipeline = Pipeline::new(
            &mock,
            PipelineConfig {
                mode: RunMode::DocsOnly,
                workspace: dir.path().to_path_buf(),
                isolate: true,
                force_unlock: false,
            },
        );

        let first = pipeline.run(&source("class A{}")).await.unwrap();
        let second = pipeline.run(&source("class A{}")).await.unwrap();

        assert_ne!(first.layout.root(), second.layout.root());
        assert!(first.layout.root().starts_with(dir.path().join("runs")));
        assert!(first.layout.stage_path(StageId::Review).exists());
        assert!(second.layout.stage_path(StageId::Review).exists());
        assert!(!OutputLayout::new(dir.path()).stage_path(StageId::Review).exists());
    }

    #[test]
    fn test_sequencer_rejects_skipping_stages() {
        let mut sequencer = Sequencer::new();
        let err = sequencer.advance(PipelineState::Stage2Running).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidTransition { .. }));
        assert_eq!(sequencer.state(), PipelineState::Idle);

        sequencer.advance(PipelineState::Stage1Running).unwrap();
        sequencer.advance(PipelineState::Failed).unwrap();
        assert!(sequencer.advance(PipelineState::Stage2Running).is_err());
    }
}
