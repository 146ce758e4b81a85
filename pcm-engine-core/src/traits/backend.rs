use crate::models::error::EngineError;
use crate::models::format::FormatDescriptor;
use crate::processing::buffer_sizing::MinBufferSize;
use crate::traits::device::{InputDevice, OutputDevice};

/// Direction of a device endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceRole {
    Input,
    Output,
}

/// Interface for platform-specific audio backends.
///
/// Implemented by:
/// - `CpalBackend` (`pcm-engine-cpal`)
/// - the scripted backend used by this crate's tests
///
/// Engines call `open_input`/`open_output` on their own worker thread, which
/// is why the backend must be shareable across threads while the devices it
/// produces need not be.
pub trait AudioBackend: Send + Sync + 'static {
    type Input: InputDevice + 'static;
    type Output: OutputDevice + 'static;

    /// Minimum viable buffer size for `format` in the given role.
    fn min_buffer_size(&self, role: DeviceRole, format: &FormatDescriptor) -> MinBufferSize;

    /// Open the input device selected by `format.device`.
    ///
    /// Fails with `DeviceInit` if the device cannot reach a ready state.
    fn open_input(&self, format: &FormatDescriptor, buffer_bytes: usize) -> Result<Self::Input, EngineError>;

    /// Open the output device selected by `format.device`.
    fn open_output(&self, format: &FormatDescriptor, buffer_bytes: usize) -> Result<Self::Output, EngineError>;
}
