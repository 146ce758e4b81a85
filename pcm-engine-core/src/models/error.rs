use std::path::Path;

use serde::Serialize;
use thiserror::Error;

/// Errors raised by the PCM engines.
///
/// Construction-time variants (`DeviceInit`, `TargetNotFound`, `Configuration`)
/// are returned to the caller. Loop-time failures (`Io`, `Alignment`) end the
/// current pass and travel inside its completion report.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum EngineError {
    #[error("device initialization failed: {0}")]
    DeviceInit(String),

    #[error("target file not found: {0}")]
    TargetNotFound(String),

    #[error("i/o error: {0}")]
    Io(String),

    #[error("buffer of {len} bytes is not a multiple of {unit} bytes")]
    Alignment { len: usize, unit: usize },

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("configuration failed: {0}")]
    Configuration(String),

    #[error("busy: {0}")]
    Busy(String),
}

impl EngineError {
    pub fn io(context: &str, err: std::io::Error) -> Self {
        Self::Io(format!("{}: {}", context, err))
    }

    pub fn target_not_found(path: &Path) -> Self {
        Self::TargetNotFound(path.display().to_string())
    }
}
