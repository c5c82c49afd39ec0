use std::path::PathBuf;

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{StageId, StageTrace};

/// Which stages a run executes, chosen once before it starts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum RunMode {
    /// Review, validate and refactor
    #[default]
    Full,
    /// Stop after the reviewer's documentation
    DocsOnly,
}

impl RunMode {
    /// Stages executed in this mode, in order
    pub fn stages(self) -> &'static [StageId] {
        match self {
            RunMode::Full => &StageId::ALL,
            RunMode::DocsOnly => &[StageId::Review],
        }
    }
}

/// Pipeline sequencer states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Stage1Running,
    Stage1Done,
    Stage2Running,
    Stage2Done,
    Stage3Running,
    Stage3Done,
    Failed,
}

impl PipelineState {
    pub fn running(stage: StageId) -> Self {
        match stage {
            StageId::Review => PipelineState::Stage1Running,
            StageId::Validate => PipelineState::Stage2Running,
            StageId::Refactor => PipelineState::Stage3Running,
        }
    }

    pub fn done(stage: StageId) -> Self {
        match stage {
            StageId::Review => PipelineState::Stage1Done,
            StageId::Validate => PipelineState::Stage2Done,
            StageId::Refactor => PipelineState::Stage3Done,
        }
    }

    /// Whether `self -> next` is an edge of the state machine
    pub fn can_transition_to(self, next: PipelineState) -> bool {
        use PipelineState::*;

        matches!(
            (self, next),
            (Idle, Stage1Running)
                | (Stage1Running, Stage1Done)
                | (Stage1Done, Stage2Running)
                | (Stage2Running, Stage2Done)
                | (Stage2Done, Stage3Running)
                | (Stage3Running, Stage3Done)
                | (Stage1Running | Stage2Running | Stage3Running, Failed)
                | (Stage1Done | Stage3Done | Failed, Idle)
        )
    }

    /// Whether a run in `mode` stops in this state
    pub fn is_terminal(self, mode: RunMode) -> bool {
        match self {
            PipelineState::Failed | PipelineState::Stage3Done => true,
            PipelineState::Stage1Done => mode == RunMode::DocsOnly,
            _ => false,
        }
    }
}

/// Display status of one stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", content = "message", rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Running,
    Complete,
    Errored(String),
    /// Not part of the selected mode
    Skipped,
}

/// Per-stage entry in the run report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageReport {
    pub stage: StageId,
    pub label: String,
    pub status: StageStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "StageTrace::is_empty")]
    pub trace: StageTrace,
}

impl StageReport {
    pub fn new(stage: StageId, mode: RunMode) -> Self {
        let status = if mode.stages().contains(&stage) {
            StageStatus::Pending
        } else {
            StageStatus::Skipped
        };
        Self {
            stage,
            label: stage.label().to_string(),
            status,
            output_path: None,
            trace: StageTrace::new(),
        }
    }

    /// Trace text, or the waiting placeholder when the stage has not run
    pub fn trace_text(&self) -> String {
        if self.trace.is_empty() {
            format!("Waiting for Agent {}...", self.stage.number())
        } else {
            self.trace.render()
        }
    }
}

/// Final refactored source offered for download
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadArtifact {
    pub file_name: String,
    pub mime: String,
    pub data: String,
}

impl DownloadArtifact {
    pub const FILE_NAME: &'static str = "RefactoredCode.java";
    pub const MIME: &'static str = "text/x-java-source";

    pub fn refactored_code(data: impl Into<String>) -> Self {
        Self {
            file_name: Self::FILE_NAME.to_string(),
            mime: Self::MIME.to_string(),
            data: data.into(),
        }
    }
}

/// Summary of one pipeline run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub mode: RunMode,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub state: PipelineState,
    pub stages: Vec<StageReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download: Option<DownloadArtifact>,
}

impl RunReport {
    pub fn new(run_id: Uuid, mode: RunMode) -> Self {
        Self {
            run_id,
            mode,
            started_at: Utc::now(),
            finished_at: None,
            state: PipelineState::Idle,
            stages: StageId::ALL
                .iter()
                .map(|&stage| StageReport::new(stage, mode))
                .collect(),
            download: None,
        }
    }

    pub fn stage(&self, stage: StageId) -> &StageReport {
        &self.stages[usize::from(stage.number() - 1)]
    }

    pub fn stage_mut(&mut self, stage: StageId) -> &mut StageReport {
        &mut self.stages[usize::from(stage.number() - 1)]
    }

    pub fn succeeded(&self) -> bool {
        self.state != PipelineState::Failed && self.state.is_terminal(self.mode)
    }

    /// Raw error text of the failing stage, if any
    pub fn error_message(&self) -> Option<&str> {
        self.stages.iter().find_map(|s| match &s.status {
            StageStatus::Errored(message) => Some(message.as_str()),
            _ => None,
        })
    }
}
