use thiserror::Error;

use pcm_engine_core::EngineError;

/// Failures talking to the cpal host, before they are folded into
/// [`EngineError`].
#[derive(Debug, Error)]
pub enum CpalError {
    #[error("audio host unavailable: {0}")]
    HostUnavailable(#[from] cpal::HostUnavailable),

    #[error("failed to enumerate devices: {0}")]
    Enumeration(#[from] cpal::DevicesError),

    #[error("no default {0} device")]
    NoDefaultDevice(&'static str),

    #[error("{0} device not found: {1}")]
    DeviceNotFound(&'static str, String),

    #[error("failed to query supported configurations: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("failed to build stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to start stream: {0}")]
    Play(#[from] cpal::PlayStreamError),

    #[error("failed to pause stream: {0}")]
    Pause(#[from] cpal::PauseStreamError),
}

impl From<CpalError> for EngineError {
    fn from(err: CpalError) -> Self {
        match err {
            CpalError::Play(_) | CpalError::Pause(_) => EngineError::Io(err.to_string()),
            _ => EngineError::DeviceInit(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_failures_become_device_init() {
        let err: EngineError = CpalError::UnsupportedFormat("7 channels".into()).into();
        assert_eq!(err, EngineError::DeviceInit("unsupported format: 7 channels".into()));

        let err: EngineError = CpalError::DeviceNotFound("input", "USB Mic".into()).into();
        assert!(matches!(err, EngineError::DeviceInit(msg) if msg.contains("USB Mic")));
    }
}
