use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::StageTrace;

/// Kind of text flowing through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    /// The uploaded legacy source
    Source,
    /// Reviewer output: Markdown describing behavior and outdated patterns
    ReviewDoc,
    /// Validator output: revised Markdown documentation
    ValidatedDoc,
    /// Refactorer output: modern Java source, fences stripped
    RefactoredCode,
}

impl ArtifactKind {
    /// Position in the hand-off chain (source is 0, stages are 1-3)
    pub fn sequence(self) -> u8 {
        match self {
            ArtifactKind::Source => 0,
            ArtifactKind::ReviewDoc => 1,
            ArtifactKind::ValidatedDoc => 2,
            ArtifactKind::RefactoredCode => 3,
        }
    }
}

/// One of the three pipeline stages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Review,
    Validate,
    Refactor,
}

impl StageId {
    pub const ALL: [StageId; 3] = [StageId::Review, StageId::Validate, StageId::Refactor];

    /// 1-based stage number
    pub fn number(self) -> u8 {
        match self {
            StageId::Review => 1,
            StageId::Validate => 2,
            StageId::Refactor => 3,
        }
    }

    /// Artifact kind this stage consumes
    pub fn input_kind(self) -> ArtifactKind {
        match self {
            StageId::Review => ArtifactKind::Source,
            StageId::Validate => ArtifactKind::ReviewDoc,
            StageId::Refactor => ArtifactKind::ValidatedDoc,
        }
    }

    /// Artifact kind this stage produces
    pub fn output_kind(self) -> ArtifactKind {
        match self {
            StageId::Review => ArtifactKind::ReviewDoc,
            StageId::Validate => ArtifactKind::ValidatedDoc,
            StageId::Refactor => ArtifactKind::RefactoredCode,
        }
    }

    /// Human label used in status lines
    pub fn label(self) -> &'static str {
        match self {
            StageId::Review => "Agent 1: documentation",
            StageId::Validate => "Agent 2: documentation validation",
            StageId::Refactor => "Agent 3: code refactoring",
        }
    }
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.label())
    }
}

/// Immutable text payload handed from one stage to the next
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artifact {
    pub kind: ArtifactKind,
    content: String,
    /// Trace captured while the producing stage ran
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<StageTrace>,
}

impl Artifact {
    /// Wrap the uploaded source text
    pub fn source(content: impl Into<String>) -> Self {
        Self {
            kind: ArtifactKind::Source,
            content: content.into(),
            trace: None,
        }
    }

    /// Artifact produced by a stage invocation
    pub fn produced(stage: StageId, content: impl Into<String>, trace: StageTrace) -> Self {
        Self {
            kind: stage.output_kind(),
            content: content.into(),
            trace: Some(trace),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn sequence(&self) -> u8 {
        self.kind.sequence()
    }

    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}
