use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};

use pcm_engine_core::{EngineError, FormatDescriptor, OutputDevice, PcmChunk, SampleEncoding};

use crate::backend::{stream_config, OUTPUT_STALL};
use crate::error::CpalError;
use crate::shared_ring::SharedRing;

enum OutputRing {
    Pcm8(Arc<SharedRing<u8>>),
    Pcm16(Arc<SharedRing<i16>>),
}

impl OutputRing {
    fn clear(&self) {
        match self {
            Self::Pcm8(ring) => ring.clear(),
            Self::Pcm16(ring) => ring.clear(),
        }
    }

    fn wait_drained(&self) -> bool {
        match self {
            Self::Pcm8(ring) => ring.wait_drained(OUTPUT_STALL),
            Self::Pcm16(ring) => ring.wait_drained(OUTPUT_STALL),
        }
    }
}

/// A cpal output stream pulling from a ring buffer that the playback worker fills.
///
/// When the ring runs dry the callback plays silence.
pub struct CpalOutput {
    stream: cpal::Stream,
    ring: OutputRing,
    channels: usize,
}

impl CpalOutput {
    pub(crate) fn open(device: &cpal::Device, format: &FormatDescriptor, buffer_bytes: usize) -> Result<Self, CpalError> {
        let config = stream_config(format);
        let channels = format.channel_count() as usize;
        let capacity = buffer_bytes / format.sample_encoding.bytes_per_sample();

        let (stream, ring) = match format.sample_encoding {
            SampleEncoding::Pcm8 => {
                let ring = Arc::new(SharedRing::new(capacity, channels));
                (build(device, &config, Arc::clone(&ring))?, OutputRing::Pcm8(ring))
            }
            SampleEncoding::Pcm16 => {
                let ring = Arc::new(SharedRing::new(capacity, channels));
                (build(device, &config, Arc::clone(&ring))?, OutputRing::Pcm16(ring))
            }
        };

        if let Err(e) = stream.pause() {
            log::debug!("could not pause new output stream: {}", e);
        }
        log::debug!(
            "output stream ready: {} Hz, {} channels, {:?}, ring of {} bytes",
            format.sample_rate_hz,
            channels,
            format.sample_encoding,
            buffer_bytes
        );
        Ok(Self { stream, ring, channels })
    }
}

fn build<T>(device: &cpal::Device, config: &cpal::StreamConfig, ring: Arc<SharedRing<T>>) -> Result<cpal::Stream, CpalError>
where
    T: cpal::SizedSample + Default + Send + 'static,
{
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
            let filled = ring.pop_available(data);
            for sample in &mut data[filled..] {
                *sample = T::EQUILIBRIUM;
            }
        },
        |err| log::error!("output stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

impl OutputDevice for CpalOutput {
    fn start(&mut self) -> Result<(), EngineError> {
        self.ring.clear();
        self.stream.play().map_err(CpalError::from)?;
        Ok(())
    }

    fn write(&mut self, chunk: PcmChunk<'_>) -> Result<usize, EngineError> {
        match (&self.ring, chunk) {
            (OutputRing::Pcm8(ring), PcmChunk::Pcm8(samples)) => Ok(ring.write_blocking(samples, self.channels, OUTPUT_STALL)),
            (OutputRing::Pcm16(ring), PcmChunk::Pcm16(samples)) => Ok(ring.write_blocking(samples, self.channels, OUTPUT_STALL)),
            _ => Err(EngineError::InvalidState("chunk encoding does not match the stream".into())),
        }
    }

    /// Let queued audio play out, then pause the stream.
    fn stop(&mut self) -> Result<(), EngineError> {
        if !self.ring.wait_drained() {
            log::warn!("output stream did not drain, discarding queued audio");
        }
        self.ring.clear();
        self.stream.pause().map_err(CpalError::from)?;
        Ok(())
    }
}
