use std::path::Path;

use tracing::warn;

use crate::error::{PipelineError, Result};

/// Uploaded source file
#[derive(Debug, Clone, PartialEq)]
pub struct SourceFile {
    /// File stem used for the persisted legacy copy
    pub name: String,
    pub content: String,
}

/// Read an uploaded Java file from disk
pub fn read_source_file(path: &Path) -> Result<SourceFile> {
    let bytes = std::fs::read(path)
        .map_err(|e| PipelineError::InvalidInput(format!("failed to read {:?}: {}", path, e)))?;

    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("OldCode");

    if path.extension().and_then(|e| e.to_str()) != Some("java") {
        warn!("{:?} does not have a .java extension; using it anyway", path);
    }

    decode_source(name, bytes)
}

/// Decode uploaded bytes as UTF-8 source text
pub fn decode_source(name: &str, bytes: Vec<u8>) -> Result<SourceFile> {
    let content = String::from_utf8(bytes)
        .map_err(|e| PipelineError::InvalidInput(format!("{} is not valid UTF-8: {}", name, e)))?;

    if content.trim().is_empty() {
        return Err(PipelineError::InvalidInput(format!("{} is empty", name)));
    }

    Ok(SourceFile {
        name: name.to_string(),
        content,
    })
}
