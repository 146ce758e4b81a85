use serde::{Deserialize, Serialize};

/// Which physical endpoint an engine binds to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceSelector {
    /// The platform's default input (for capture) or output (for playback).
    #[default]
    Default,
    /// A device picked by its exact platform name.
    Named(String),
}

/// Interleaved channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelLayout {
    Mono,
    Stereo,
}

impl ChannelLayout {
    pub fn channel_count(self) -> u16 {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Linear PCM sample encoding.
///
/// `Pcm8` is unsigned 8-bit, `Pcm16` is signed 16-bit in native byte order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleEncoding {
    #[serde(rename = "pcm8")]
    Pcm8,
    #[serde(rename = "pcm16")]
    Pcm16,
}

impl SampleEncoding {
    pub fn bytes_per_sample(self) -> usize {
        match self {
            Self::Pcm8 => 1,
            Self::Pcm16 => 2,
        }
    }

    pub fn bits_per_sample(self) -> u16 {
        self.bytes_per_sample() as u16 * 8
    }
}

/// Describes a headerless PCM stream: where it comes from (or goes to) and how
/// its bytes are laid out.
///
/// Files carry no header, so producer and consumer must agree on this value
/// out of band. A mismatch yields garbage audio rather than an error.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatDescriptor {
    #[serde(default)]
    pub device: DeviceSelector,
    pub sample_rate_hz: u32,
    pub channel_layout: ChannelLayout,
    pub sample_encoding: SampleEncoding,
}

impl FormatDescriptor {
    pub fn new(sample_rate_hz: u32, channel_layout: ChannelLayout, sample_encoding: SampleEncoding) -> Self {
        Self {
            device: DeviceSelector::Default,
            sample_rate_hz,
            channel_layout,
            sample_encoding,
        }
    }

    /// 44.1 kHz stereo 16-bit on the default device.
    pub fn cd_quality() -> Self {
        Self::new(44100, ChannelLayout::Stereo, SampleEncoding::Pcm16)
    }

    pub fn with_device(mut self, device: DeviceSelector) -> Self {
        self.device = device;
        self
    }

    pub fn channel_count(&self) -> u16 {
        self.channel_layout.channel_count()
    }

    /// Bytes per sample-frame across all channels.
    pub fn frame_size(&self) -> usize {
        self.channel_count() as usize * self.sample_encoding.bytes_per_sample()
    }

    /// Bytes per second of audio.
    pub fn byte_rate(&self) -> u64 {
        self.sample_rate_hz as u64 * self.frame_size() as u64
    }

    /// Largest frame multiple that fits in `bytes`.
    pub fn align_down(&self, bytes: usize) -> usize {
        bytes - bytes % self.frame_size()
    }

    pub fn is_frame_aligned(&self, bytes: usize) -> bool {
        bytes % self.frame_size() == 0
    }

    /// Seconds of audio held in `bytes` of this format.
    pub fn duration_secs(&self, bytes: u64) -> f64 {
        let rate = self.byte_rate();
        if rate == 0 {
            return 0.0;
        }
        bytes as f64 / rate as f64
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz == 0 {
            return Err("sample rate must be positive".into());
        }
        Ok(())
    }
}

impl Default for FormatDescriptor {
    fn default() -> Self {
        Self::cd_quality()
    }
}
