//! Batch request loading.

use std::fs;
use std::path::Path;

use thiserror::Error;

use lotto_core::GenerateBatchRequest;

#[derive(Debug, Error)]
pub enum RequestLoadError {
    #[error("request parse failed at line {line}, column {column}: {reason}")]
    Parse {
        line: usize,
        column: usize,
        reason: String,
    },

    #[error("request read failed: {reason}")]
    Io { reason: String },
}

/// Parse a camelCase JSON request. Unknown fields are ignored; missing
/// required fields and wrong types fail.
pub fn load_request_json(json: &str) -> Result<GenerateBatchRequest, RequestLoadError> {
    serde_json::from_str(json).map_err(|e| RequestLoadError::Parse {
        line: e.line(),
        column: e.column(),
        reason: e.to_string(),
    })
}

pub fn load_request_file(path: impl AsRef<Path>) -> Result<GenerateBatchRequest, RequestLoadError> {
    let text = fs::read_to_string(path.as_ref()).map_err(|e| RequestLoadError::Io {
        reason: format!("{}: {e}", path.as_ref().display()),
    })?;
    load_request_json(&text)
}
