use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single line of a stage trace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceLine {
    pub at: DateTime<Utc>,
    pub message: String,
}

/// Free-text log captured during one stage invocation.
///
/// Display only; nothing downstream parses it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageTrace {
    pub lines: Vec<TraceLine>,
}

impl StageTrace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, message: impl Into<String>) {
        self.lines.push(TraceLine {
            at: Utc::now(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Render as `HH:MM:SS.mmm message` lines
    pub fn render(&self) -> String {
        self.lines
            .iter()
            .map(|line| format!("{} {}", line.at.format("%H:%M:%S%.3f"), line.message))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
