//! Chunk and device-buffer sizes derived from a format and the hardware minimum.
//!
//! Every size that is later interpreted as samples is rounded down to a whole
//! number of frames, and never below one frame.

use serde::Serialize;

use crate::models::config::EngineConfiguration;
use crate::models::format::FormatDescriptor;

/// Answer of a platform minimum-buffer query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MinBufferSize {
    /// Minimum buffer size in bytes.
    Bytes(u32),
    /// The parameters are not supported by the hardware.
    Unsupported,
    /// The platform could not query the hardware.
    Unknown,
}

/// Sizes an engine uses for one device role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BufferPlan {
    /// Minimum as reported by the platform, or the fallback.
    pub minimum: u32,
    /// Buffer handed to the device when it is opened.
    pub device_buffer: u32,
    /// Bytes moved per worker-loop iteration.
    pub chunk: u32,
}

/// Resolve the platform answer, falling back to `sample_rate × 2` bytes
/// (one second of 16-bit mono-equivalent audio).
pub fn resolve_minimum(format: &FormatDescriptor, reported: MinBufferSize) -> u32 {
    match reported {
        MinBufferSize::Bytes(bytes) if bytes > 0 => bytes,
        other => {
            let fallback = format.sample_rate_hz.saturating_mul(2);
            log::debug!(
                "minimum buffer query returned {:?} for {} Hz, falling back to {} bytes",
                other,
                format.sample_rate_hz,
                fallback
            );
            fallback
        }
    }
}

/// Round `bytes` down to the frame size, keeping at least one frame.
pub fn frame_aligned(format: &FormatDescriptor, bytes: u32) -> u32 {
    let aligned = format.align_down(bytes as usize) as u32;
    aligned.max(format.frame_size() as u32)
}

/// The per-read chunk size for `minimum`: `minimum / divisor`, frame aligned.
pub fn compute_chunk_size(format: &FormatDescriptor, minimum: u32, divisor: u32) -> u32 {
    frame_aligned(format, minimum / divisor.max(1))
}

/// Capture buffers: device buffer `multiplier × minimum`, chunk `minimum / divisor`.
pub fn capture_plan(format: &FormatDescriptor, reported: MinBufferSize, config: &EngineConfiguration) -> BufferPlan {
    let minimum = resolve_minimum(format, reported);
    BufferPlan {
        minimum,
        device_buffer: frame_aligned(format, minimum.saturating_mul(config.capture_buffer_multiplier)),
        chunk: compute_chunk_size(format, minimum, config.chunk_divisor),
    }
}

/// Playback buffers: device buffer `minimum`, chunk `minimum / divisor`.
pub fn playback_plan(format: &FormatDescriptor, reported: MinBufferSize, config: &EngineConfiguration) -> BufferPlan {
    let minimum = resolve_minimum(format, reported);
    BufferPlan {
        minimum,
        device_buffer: frame_aligned(format, minimum),
        chunk: compute_chunk_size(format, minimum, config.chunk_divisor),
    }
}

/// Reversal window: the whole minimum, frame aligned.
pub fn reversal_window(format: &FormatDescriptor, reported: MinBufferSize) -> u32 {
    frame_aligned(format, resolve_minimum(format, reported))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format::{ChannelLayout, SampleEncoding};

    #[test]
    fn fallback_on_unsupported_and_unknown() {
        let format = FormatDescriptor::cd_quality();
        assert_eq!(resolve_minimum(&format, MinBufferSize::Unsupported), 88200);
        assert_eq!(resolve_minimum(&format, MinBufferSize::Unknown), 88200);
        assert_eq!(resolve_minimum(&format, MinBufferSize::Bytes(0)), 88200);
        assert_eq!(resolve_minimum(&format, MinBufferSize::Bytes(3528)), 3528);
    }

    #[test]
    fn capture_plan_scales_minimum() {
        let format = FormatDescriptor::cd_quality();
        let plan = capture_plan(&format, MinBufferSize::Bytes(3528), &EngineConfiguration::default());
        assert_eq!(plan.minimum, 3528);
        assert_eq!(plan.device_buffer, 35280);
        assert_eq!(plan.chunk, 880); // 3528 / 4 = 882, aligned down to 4-byte frames
    }

    #[test]
    fn playback_plan_uses_minimum_as_device_buffer() {
        let format = FormatDescriptor::cd_quality();
        let plan = playback_plan(&format, MinBufferSize::Bytes(3528), &EngineConfiguration::default());
        assert_eq!(plan.device_buffer, 3528);
        assert_eq!(plan.chunk, 880);
    }

    #[test]
    fn chunks_are_always_frame_aligned() {
        let format = FormatDescriptor::cd_quality();
        for minimum in [1u32, 3, 7, 15, 101, 3530, 88200] {
            let chunk = compute_chunk_size(&format, minimum, 4);
            assert_eq!(chunk % 4, 0, "minimum {}", minimum);
            assert!(chunk >= 4);
        }
    }

    #[test]
    fn eight_bit_mono_keeps_exact_quarter() {
        let format = FormatDescriptor::new(8000, ChannelLayout::Mono, SampleEncoding::Pcm8);
        assert_eq!(compute_chunk_size(&format, 1001, 4), 250);
    }

    #[test]
    fn reversal_window_is_aligned_minimum() {
        let format = FormatDescriptor::cd_quality();
        assert_eq!(reversal_window(&format, MinBufferSize::Bytes(3530)), 3528);
        assert_eq!(reversal_window(&format, MinBufferSize::Unknown), 88200);
    }
}
