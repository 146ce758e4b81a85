use std::time::Duration;

use cpal::traits::DeviceTrait;
use cpal::{SampleFormat, SupportedBufferSize, SupportedStreamConfigRange};

use pcm_engine_core::{AudioBackend, DeviceRole, EngineError, FormatDescriptor, MinBufferSize, SampleEncoding};

use crate::device_enumerator::{role_name, DeviceEnumerator};
use crate::error::CpalError;
use crate::input::CpalInput;
use crate::output::CpalOutput;

/// How long a capture read waits for a full chunk before handing back what it has.
pub(crate) const INPUT_POLL: Duration = Duration::from_millis(200);

/// How long playback waits for room in a stalled output stream.
pub(crate) const OUTPUT_STALL: Duration = Duration::from_secs(2);

/// [`AudioBackend`] on top of cpal.
///
/// Streams run at exactly the requested rate and channel count using `u8`
/// (PCM8) or `i16` (PCM16) samples; formats the device does not support
/// natively are refused rather than converted.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpalBackend {
    enumerator: DeviceEnumerator,
}

impl CpalBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_enumerator(enumerator: DeviceEnumerator) -> Self {
        Self { enumerator }
    }

    pub fn enumerator(&self) -> &DeviceEnumerator {
        &self.enumerator
    }

    /// Find the device for `role` and the supported range matching `format`.
    fn resolve(
        &self,
        role: DeviceRole,
        format: &FormatDescriptor,
    ) -> Result<(cpal::Device, Option<SupportedStreamConfigRange>), CpalError> {
        let device = self.enumerator.find(role, &format.device)?;
        let ranges: Vec<SupportedStreamConfigRange> = match role {
            DeviceRole::Input => device.supported_input_configs()?.collect(),
            DeviceRole::Output => device.supported_output_configs()?.collect(),
        };
        let range = matching_range(ranges, format);
        Ok((device, range))
    }

    fn open_device(&self, role: DeviceRole, format: &FormatDescriptor) -> Result<cpal::Device, CpalError> {
        let (device, range) = self.resolve(role, format)?;
        if range.is_none() {
            return Err(CpalError::UnsupportedFormat(format!(
                "{} device does not support {} Hz, {} channels, {:?}",
                role_name(role),
                format.sample_rate_hz,
                format.channel_count(),
                format.sample_encoding
            )));
        }
        Ok(device)
    }
}

impl AudioBackend for CpalBackend {
    type Input = CpalInput;
    type Output = CpalOutput;

    fn min_buffer_size(&self, role: DeviceRole, format: &FormatDescriptor) -> MinBufferSize {
        match self.resolve(role, format) {
            Ok((_, Some(range))) => min_buffer_bytes(&range, format),
            Ok((_, None)) => MinBufferSize::Unsupported,
            Err(e) => {
                log::debug!("minimum buffer query for {} failed: {}", role_name(role), e);
                MinBufferSize::Unknown
            }
        }
    }

    fn open_input(&self, format: &FormatDescriptor, buffer_bytes: usize) -> Result<CpalInput, EngineError> {
        let device = self.open_device(DeviceRole::Input, format)?;
        Ok(CpalInput::open(&device, format, buffer_bytes)?)
    }

    fn open_output(&self, format: &FormatDescriptor, buffer_bytes: usize) -> Result<CpalOutput, EngineError> {
        let device = self.open_device(DeviceRole::Output, format)?;
        Ok(CpalOutput::open(&device, format, buffer_bytes)?)
    }
}

pub(crate) fn sample_format(encoding: SampleEncoding) -> SampleFormat {
    match encoding {
        SampleEncoding::Pcm8 => SampleFormat::U8,
        SampleEncoding::Pcm16 => SampleFormat::I16,
    }
}

pub(crate) fn stream_config(format: &FormatDescriptor) -> cpal::StreamConfig {
    cpal::StreamConfig {
        channels: format.channel_count(),
        sample_rate: cpal::SampleRate(format.sample_rate_hz),
        buffer_size: cpal::BufferSize::Default,
    }
}

/// The first range that can run `format` without conversion.
fn matching_range(
    ranges: impl IntoIterator<Item = SupportedStreamConfigRange>,
    format: &FormatDescriptor,
) -> Option<SupportedStreamConfigRange> {
    let wanted = sample_format(format.sample_encoding);
    ranges.into_iter().find(|range| {
        range.channels() == format.channel_count()
            && range.sample_format() == wanted
            && range.min_sample_rate().0 <= format.sample_rate_hz
            && format.sample_rate_hz <= range.max_sample_rate().0
    })
}

fn min_buffer_bytes(range: &SupportedStreamConfigRange, format: &FormatDescriptor) -> MinBufferSize {
    match range.buffer_size() {
        SupportedBufferSize::Range { min, .. } if *min > 0 => {
            MinBufferSize::Bytes(min.saturating_mul(format.frame_size() as u32))
        }
        _ => MinBufferSize::Unknown,
    }
}
