use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::error::EngineError;
use crate::models::format::FormatDescriptor;
use crate::models::state::StopReason;

/// Which engine produced a pass report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PassKind {
    Capture,
    Playback,
}

/// Summary emitted once at the end of every capture or playback pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PassReport {
    pub id: String,
    pub kind: PassKind,
    pub file_path: PathBuf,
    pub bytes: u64,
    pub chunks: u64,
    pub duration_secs: f64,
    pub reason: StopReason,
    /// SHA-256 of the bytes written (capture passes only).
    pub checksum: Option<String>,
    pub started_at: String,
    pub finished_at: String,
}

impl PassReport {
    pub fn is_end_of_stream(&self) -> bool {
        matches!(self.reason, StopReason::EndOfStream)
    }
}

/// Accumulates the counters of a pass in flight.
#[derive(Debug)]
pub(crate) struct PassTally {
    id: uuid::Uuid,
    kind: PassKind,
    file_path: PathBuf,
    started_at: DateTime<Utc>,
    pub bytes: u64,
    pub chunks: u64,
}

impl PassTally {
    pub fn begin(kind: PassKind, file_path: PathBuf) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            kind,
            file_path,
            started_at: Utc::now(),
            bytes: 0,
            chunks: 0,
        }
    }

    pub fn record_chunk(&mut self, bytes: usize) {
        self.bytes += bytes as u64;
        self.chunks += 1;
    }

    pub fn finish(self, format: &FormatDescriptor, reason: StopReason, checksum: Option<String>) -> PassReport {
        PassReport {
            id: self.id.to_string(),
            kind: self.kind,
            file_path: self.file_path,
            bytes: self.bytes,
            chunks: self.chunks,
            duration_secs: format.duration_secs(self.bytes),
            reason,
            checksum,
            started_at: self.started_at.to_rfc3339(),
            finished_at: Utc::now().to_rfc3339(),
        }
    }
}

/// Result of a successful reversal pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReversalSummary {
    pub bytes: u64,
    pub windows: u64,
    pub window_bytes: usize,
    /// SHA-256 of the reversed output.
    pub checksum: String,
}

/// Completion signal for a reversal pass, success or failure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReversalReport {
    pub id: String,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub outcome: Result<ReversalSummary, EngineError>,
    pub started_at: String,
    pub finished_at: String,
}

impl ReversalReport {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }
}
