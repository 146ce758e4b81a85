use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::error::EngineError;
use crate::models::format::{DeviceSelector, FormatDescriptor};

/// Configuration shared by the capture, playback and reversal engines.
///
/// Defaults mirror a typical handset setup: 44.1 kHz stereo 16-bit on the
/// default devices, a device buffer ten times the hardware minimum for
/// capture, and per-read chunks of a quarter of that minimum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfiguration {
    /// Format used by the capture engine.
    pub capture_format: FormatDescriptor,

    /// Format used by the playback engine. Must describe the same byte layout
    /// as `capture_format` to play back recordings faithfully.
    pub playback_format: FormatDescriptor,

    /// Capture device buffer = `capture_buffer_multiplier × minimum` (default: 10).
    pub capture_buffer_multiplier: u32,

    /// Per-read chunk = `minimum / chunk_divisor`, frame aligned (default: 4).
    pub chunk_divisor: u32,

    /// Forces the reversal window size instead of querying the platform.
    pub reversal_chunk_bytes: Option<u32>,
}

impl EngineConfiguration {
    pub fn validate(&self) -> Result<(), String> {
        self.capture_format
            .validate()
            .map_err(|e| format!("capture format: {}", e))?;
        self.playback_format
            .validate()
            .map_err(|e| format!("playback format: {}", e))?;
        if self.capture_buffer_multiplier == 0 {
            return Err("capture buffer multiplier must be positive".into());
        }
        if self.chunk_divisor == 0 {
            return Err("chunk divisor must be positive".into());
        }
        if let Some(bytes) = self.reversal_chunk_bytes {
            let frame = self.capture_format.frame_size();
            if bytes == 0 || bytes as usize % frame != 0 {
                return Err(format!(
                    "reversal chunk of {} bytes is not a positive multiple of the {}-byte frame",
                    bytes, frame
                ));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, EngineError> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| EngineError::Configuration(format!("failed to parse configuration: {}", e)))?;
        config.validate().map_err(EngineError::Configuration)?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, EngineError> {
        let json = fs::read_to_string(path)
            .map_err(|e| EngineError::Configuration(format!("failed to read {}: {}", path.display(), e)))?;
        Self::from_json_str(&json)
    }

    pub fn with_devices(mut self, input: DeviceSelector, output: DeviceSelector) -> Self {
        self.capture_format.device = input;
        self.playback_format.device = output;
        self
    }
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        Self {
            capture_format: FormatDescriptor::cd_quality(),
            playback_format: FormatDescriptor::cd_quality(),
            capture_buffer_multiplier: 10,
            chunk_divisor: 4,
            reversal_chunk_bytes: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::{ChannelLayout, SampleEncoding};

    #[test]
    fn default_is_valid() {
        let config = EngineConfiguration::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.capture_format.sample_rate_hz, 44100);
        assert_eq!(config.capture_format.channel_layout, ChannelLayout::Stereo);
        assert_eq!(config.capture_format.sample_encoding, SampleEncoding::Pcm16);
    }

    #[test]
    fn rejects_unaligned_reversal_chunk() {
        let config = EngineConfiguration {
            reversal_chunk_bytes: Some(18),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = EngineConfiguration {
            reversal_chunk_bytes: Some(16),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn rejects_zero_divisor() {
        let config = EngineConfiguration {
            chunk_divisor: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config = EngineConfiguration::from_json_str(r#"{"chunk_divisor": 2}"#).unwrap();
        assert_eq!(config.chunk_divisor, 2);
        assert_eq!(config.capture_buffer_multiplier, 10);
        assert_eq!(config.playback_format, FormatDescriptor::cd_quality());
    }

    #[test]
    fn invalid_json_is_a_configuration_error() {
        let err = EngineConfiguration::from_json_str(r#"{"chunk_divisor": 0}"#).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));

        let err = EngineConfiguration::from_json_str("not json").unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("engine.json");
        fs::write(&path, r#"{"capture_buffer_multiplier": 4}"#).unwrap();

        let config = EngineConfiguration::load(&path).unwrap();
        assert_eq!(config.capture_buffer_multiplier, 4);
    }
}
