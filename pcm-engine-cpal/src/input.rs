use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};

use pcm_engine_core::{EngineError, FormatDescriptor, InputDevice, PcmBufferMut, SampleEncoding};

use crate::backend::{stream_config, INPUT_POLL};
use crate::error::CpalError;
use crate::shared_ring::SharedRing;

enum InputRing {
    Pcm8(Arc<SharedRing<u8>>),
    Pcm16(Arc<SharedRing<i16>>),
}

/// A cpal input stream feeding a ring buffer that the capture worker drains.
///
/// The stream callback only pushes into the ring; all file I/O happens on the
/// worker that calls [`InputDevice::read`].
pub struct CpalInput {
    stream: cpal::Stream,
    ring: InputRing,
    channels: usize,
}

impl CpalInput {
    /// Build a paused input stream whose ring holds `buffer_bytes` of audio.
    pub(crate) fn open(device: &cpal::Device, format: &FormatDescriptor, buffer_bytes: usize) -> Result<Self, CpalError> {
        let config = stream_config(format);
        let channels = format.channel_count() as usize;
        let capacity = buffer_bytes / format.sample_encoding.bytes_per_sample();

        let (stream, ring) = match format.sample_encoding {
            SampleEncoding::Pcm8 => {
                let ring = Arc::new(SharedRing::new(capacity, channels));
                (build(device, &config, Arc::clone(&ring))?, InputRing::Pcm8(ring))
            }
            SampleEncoding::Pcm16 => {
                let ring = Arc::new(SharedRing::new(capacity, channels));
                (build(device, &config, Arc::clone(&ring))?, InputRing::Pcm16(ring))
            }
        };

        // Some hosts start streams as soon as they are built.
        if let Err(e) = stream.pause() {
            log::debug!("could not pause new input stream: {}", e);
        }
        log::debug!(
            "input stream ready: {} Hz, {} channels, {:?}, ring of {} bytes",
            format.sample_rate_hz,
            channels,
            format.sample_encoding,
            buffer_bytes
        );
        Ok(Self { stream, ring, channels })
    }

    /// Input overruns since the stream was opened.
    pub fn overruns(&self) -> u64 {
        match &self.ring {
            InputRing::Pcm8(ring) => ring.overruns(),
            InputRing::Pcm16(ring) => ring.overruns(),
        }
    }
}

fn build<T>(device: &cpal::Device, config: &cpal::StreamConfig, ring: Arc<SharedRing<T>>) -> Result<cpal::Stream, CpalError>
where
    T: cpal::SizedSample + Default + Send + 'static,
{
    let stream = device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| ring.push_overwrite(data),
        |err| log::error!("input stream error: {}", err),
        None,
    )?;
    Ok(stream)
}

impl InputDevice for CpalInput {
    fn start(&mut self) -> Result<(), EngineError> {
        match &self.ring {
            InputRing::Pcm8(ring) => ring.clear(),
            InputRing::Pcm16(ring) => ring.clear(),
        }
        self.stream.play().map_err(CpalError::from)?;
        Ok(())
    }

    fn read(&mut self, buf: PcmBufferMut<'_>) -> Result<usize, EngineError> {
        match (&self.ring, buf) {
            (InputRing::Pcm8(ring), PcmBufferMut::Pcm8(out)) => Ok(ring.read_blocking(out, self.channels, INPUT_POLL)),
            (InputRing::Pcm16(ring), PcmBufferMut::Pcm16(out)) => Ok(ring.read_blocking(out, self.channels, INPUT_POLL)),
            _ => Err(EngineError::InvalidState("read buffer encoding does not match the stream".into())),
        }
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.stream.pause().map_err(CpalError::from)?;
        let overruns = self.overruns();
        if overruns > 0 {
            log::warn!("input stream overran {} times", overruns);
        }
        Ok(())
    }
}
