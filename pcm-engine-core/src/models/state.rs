use serde::{Deserialize, Serialize};

use crate::models::error::EngineError;

/// Recording state reported by a capture engine.
///
/// ```text
/// stopped → recording → stopped
/// ```
///
/// `Recording` lasts until the worker observes the stop request, so it may
/// outlive a call to `stop()` by up to one chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    Stopped,
    Recording,
}

impl RecordingState {
    pub fn is_recording(self) -> bool {
        matches!(self, Self::Recording)
    }
}

/// Playback state reported by a playback engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    Stopped,
    Playing,
}

impl PlaybackState {
    pub fn is_playing(self) -> bool {
        matches!(self, Self::Playing)
    }
}

/// Why a capture or playback pass ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The caller cleared the running flag.
    Requested,
    /// The source file ran out (playback only).
    EndOfStream,
    /// A device or file error terminated the pass.
    Failed(EngineError),
}

impl StopReason {
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }
}
