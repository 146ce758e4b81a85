use crate::models::error::EngineError;

/// Destination buffer for a device read, typed by sample encoding.
#[derive(Debug)]
pub enum PcmBufferMut<'a> {
    Pcm8(&'a mut [u8]),
    Pcm16(&'a mut [i16]),
}

impl PcmBufferMut<'_> {
    /// Capacity in samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Pcm8(buf) => buf.len(),
            Self::Pcm16(buf) => buf.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Samples handed to an output device, typed by sample encoding.
#[derive(Debug, Clone, Copy)]
pub enum PcmChunk<'a> {
    Pcm8(&'a [u8]),
    Pcm16(&'a [i16]),
}

impl<'a> PcmChunk<'a> {
    /// The samples after the first `n`.
    pub fn skip(self, n: usize) -> PcmChunk<'a> {
        match self {
            Self::Pcm8(samples) => Self::Pcm8(&samples[n.min(samples.len())..]),
            Self::Pcm16(samples) => Self::Pcm16(&samples[n.min(samples.len())..]),
        }
    }

    /// Length in samples.
    pub fn len(&self) -> usize {
        match self {
            Self::Pcm8(samples) => samples.len(),
            Self::Pcm16(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A live audio input endpoint.
///
/// Instances are created and used on the owning engine's worker thread only,
/// so implementations need not be `Send`. Dropping the device releases it.
pub trait InputDevice {
    /// Enter the actively-recording state.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Block until samples are available and fill `buf`.
    ///
    /// Returns the number of samples written into `buf`. Zero means the
    /// device had nothing to deliver this time, not end of stream.
    ///
    /// The count should be a whole number of frames. A read that ends
    /// mid-frame is allowed: the capture engine holds the partial frame back
    /// until the next read completes it, so only whole frames reach the file.
    fn read(&mut self, buf: PcmBufferMut<'_>) -> Result<usize, EngineError>;

    /// Leave the recording state. The device may be started again later.
    fn stop(&mut self) -> Result<(), EngineError>;
}

/// A live audio output endpoint.
pub trait OutputDevice {
    /// Enter the playing state.
    fn start(&mut self) -> Result<(), EngineError>;

    /// Queue samples for playback, blocking while the device buffer is full.
    ///
    /// Returns the number of samples accepted.
    fn write(&mut self, chunk: PcmChunk<'_>) -> Result<usize, EngineError>;

    /// Leave the playing state.
    fn stop(&mut self) -> Result<(), EngineError>;
}
