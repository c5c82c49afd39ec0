//! Deterministic generator for tests and dry runs.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::{GenerationError, GenerationRequest, TextGenerator};
use crate::models::StageId;

/// Returns preconfigured text per stage and records every request it sees
pub struct MockGenerator {
    responses: HashMap<StageId, Result<String, String>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self {
            responses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Register the text returned for a stage
    pub fn with_response(mut self, stage: StageId, text: impl Into<String>) -> Self {
        self.responses.insert(stage, Ok(text.into()));
        self
    }

    /// Register a failure for a stage
    pub fn with_failure(mut self, stage: StageId, message: impl Into<String>) -> Self {
        self.responses.insert(stage, Err(message.into()));
        self
    }

    /// Requests received so far, in order
    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn called_stages(&self) -> Vec<StageId> {
        self.calls().iter().map(|c| c.stage).collect()
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextGenerator for MockGenerator {
    fn model(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(request.clone());
        }

        match self.responses.get(&request.stage) {
            Some(Ok(text)) => Ok(text.clone()),
            Some(Err(message)) => Err(GenerationError::Other(message.clone())),
            None => Err(GenerationError::Other(format!(
                "no mock response for {}",
                request.stage
            ))),
        }
    }
}
