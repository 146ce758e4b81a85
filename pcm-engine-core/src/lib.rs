//! # pcm-engine-core
//!
//! Platform-agnostic core of a streaming PCM capture/playback/reversal engine.
//!
//! Records raw interleaved PCM from an input device into a headerless file,
//! streams such a file to an output device, and writes a frame-accurate
//! time-reversed copy of a file without loading it into memory. Device
//! backends (e.g. `pcm-engine-cpal`) implement the `AudioBackend` trait and
//! plug into the engines.
//!
//! ## Architecture
//!
//! ```text
//! pcm-engine-core (this crate)
//! ├── traits/       ← AudioBackend, InputDevice, OutputDevice
//! ├── models/       ← FormatDescriptor, EngineError, EngineConfiguration, states, reports
//! ├── processing/   ← buffer sizing, sample codec, frame reversal, RingBuffer
//! ├── engine/       ← CaptureEngine, PlaybackEngine, ReversalJob (one worker thread each)
//! ├── signaling/    ← CompletionRegistry (listeners + channel subscribers)
//! ├── session/      ← Studio (record / play / reverse one take)
//! └── storage/      ← PcmFileWriter, BackwardCursor, chunked reads
//! ```

pub mod engine;
pub mod models;
pub mod processing;
pub mod session;
pub mod signaling;
pub mod storage;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

// Re-export key types at crate root for convenience.
pub use engine::capture::CaptureEngine;
pub use engine::playback::PlaybackEngine;
pub use engine::reversal::{reverse_file, ReversalJob};
pub use models::config::EngineConfiguration;
pub use models::error::EngineError;
pub use models::format::{ChannelLayout, DeviceSelector, FormatDescriptor, SampleEncoding};
pub use models::report::{PassKind, PassReport, ReversalReport, ReversalSummary};
pub use models::state::{PlaybackState, RecordingState, StopReason};
pub use processing::buffer_sizing::{BufferPlan, MinBufferSize};
pub use processing::ring_buffer::RingBuffer;
pub use session::studio::{PlaybackSource, Studio};
pub use signaling::completion::{CompletionListener, CompletionRegistry, ListenerId};
pub use traits::backend::{AudioBackend, DeviceRole};
pub use traits::device::{InputDevice, OutputDevice, PcmBufferMut, PcmChunk};
