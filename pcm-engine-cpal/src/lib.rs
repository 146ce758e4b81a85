//! # pcm-engine-cpal
//!
//! cpal device backend for `pcm-engine-core`.
//!
//! Provides:
//! - `CpalBackend`: `AudioBackend` implementation opening cpal input/output streams
//! - `CpalInput` / `CpalOutput`: callback streams bridged to blocking reads and writes
//! - `DeviceEnumerator`: device listing and lookup by name
//!
//! ## Usage
//! ```ignore
//! use std::sync::Arc;
//! use pcm_engine_core::{EngineConfiguration, Studio};
//! use pcm_engine_cpal::CpalBackend;
//!
//! let studio = Studio::open(Arc::new(CpalBackend::new()), &EngineConfiguration::default(), "take.pcm", "take-rev.pcm")?;
//! studio.record()?;
//! ```

pub mod backend;
pub mod device_enumerator;
pub mod error;
pub mod input;
pub mod output;
pub mod shared_ring;

pub use backend::CpalBackend;
pub use device_enumerator::{DeviceEnumerator, DeviceInfo};
pub use error::CpalError;
pub use input::CpalInput;
pub use output::CpalOutput;
pub use shared_ring::SharedRing;
