use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Receiver;

use crate::engine::worker::{PassControl, Worker};
use crate::models::config::EngineConfiguration;
use crate::models::error::EngineError;
use crate::models::format::{FormatDescriptor, SampleEncoding};
use crate::models::report::{PassKind, PassReport, PassTally};
use crate::models::state::{RecordingState, StopReason};
use crate::processing::buffer_sizing::{self, BufferPlan};
use crate::processing::sample_codec;
use crate::signaling::completion::{CompletionRegistry, ListenerId};
use crate::storage::pcm_writer::PcmFileWriter;
use crate::traits::backend::{AudioBackend, DeviceRole};
use crate::traits::device::{InputDevice, PcmBufferMut};

/// Everything a capture pass needs, shared by the handle and its worker.
struct CaptureContext {
    format: FormatDescriptor,
    target: PathBuf,
    chunk: usize,
    control: Arc<PassControl>,
    completions: CompletionRegistry<PassReport>,
}

/// Records from an input device into a headerless PCM file.
///
/// The input device is opened on a dedicated worker thread when the engine is
/// constructed and stays owned by that thread until the engine is destroyed.
/// Each `start()` runs one pass on the worker:
///
/// ```text
/// [Input device] → read chunk → [SampleCodec] → append → [target file]
///        ↑                                                    │
///        └──────────── until the running flag clears ─────────┘
/// ```
///
/// The target is truncated at the start of every pass.
pub struct CaptureEngine {
    context: Arc<CaptureContext>,
    plan: BufferPlan,
    worker: Worker<()>,
}

impl CaptureEngine {
    /// Open the input device for `format` with default buffer scaling.
    pub fn open<B: AudioBackend>(backend: Arc<B>, format: FormatDescriptor, target: impl Into<PathBuf>) -> Result<Self, EngineError> {
        Self::open_with_config(backend, format, target, &EngineConfiguration::default())
    }

    /// Open the input device for `format`, sizing buffers from `config`.
    ///
    /// Fails with `TargetNotFound` if `target` does not exist, or with
    /// `DeviceInit` if the device cannot reach a ready state.
    pub fn open_with_config<B: AudioBackend>(
        backend: Arc<B>,
        format: FormatDescriptor,
        target: impl Into<PathBuf>,
        config: &EngineConfiguration,
    ) -> Result<Self, EngineError> {
        let target = target.into();
        format.validate().map_err(EngineError::Configuration)?;
        if !target.exists() {
            return Err(EngineError::target_not_found(&target));
        }

        let reported = backend.min_buffer_size(DeviceRole::Input, &format);
        let plan = buffer_sizing::capture_plan(&format, reported, config);
        log::debug!(
            "capture plan for {} Hz {:?} {:?}: {:?}",
            format.sample_rate_hz,
            format.channel_layout,
            format.sample_encoding,
            plan
        );

        let context = Arc::new(CaptureContext {
            format: format.clone(),
            target,
            chunk: plan.chunk as usize,
            control: Arc::new(PassControl::default()),
            completions: CompletionRegistry::new(),
        });

        let device_buffer = plan.device_buffer as usize;
        let pass_context = Arc::clone(&context);
        let worker = Worker::spawn(
            "pcm-capture",
            move || backend.open_input(&format, device_buffer),
            move |device: &mut B::Input, ()| run_capture_pass(device, &pass_context),
        )?;

        Ok(Self { context, plan, worker })
    }

    /// Start a recording pass. Returns immediately; the worker does the work.
    pub fn start(&self) -> Result<(), EngineError> {
        self.context.control.begin("recording")?;
        if let Err(e) = self.worker.submit(()) {
            self.context.control.end_pass();
            return Err(e);
        }
        log::debug!("capture started into {}", self.context.target.display());
        Ok(())
    }

    /// Request the current pass to end.
    ///
    /// Does not wait: the worker notices at its next chunk boundary, then
    /// stops the device and emits the pass report.
    pub fn stop(&self) {
        self.context.control.request_stop();
    }

    pub fn state(&self) -> RecordingState {
        if self.context.control.is_active() {
            RecordingState::Recording
        } else {
            RecordingState::Stopped
        }
    }

    /// Called with the report of every finished pass.
    pub fn on_complete<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PassReport) + Send + Sync + 'static,
    {
        self.context.completions.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.context.completions.remove_listener(id)
    }

    /// Receive every future pass report on a channel.
    pub fn subscribe(&self) -> Receiver<PassReport> {
        self.context.completions.subscribe()
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.context.format
    }

    pub fn target(&self) -> &Path {
        &self.context.target
    }

    pub fn buffer_plan(&self) -> BufferPlan {
        self.plan
    }

    /// Stop any pass in flight, wait for the worker and release the device.
    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for CaptureEngine {
    fn drop(&mut self) {
        self.context.control.request_stop();
        self.worker.shutdown();
        log::debug!("capture engine for {} released", self.context.target.display());
    }
}

fn run_capture_pass<D: InputDevice>(device: &mut D, ctx: &CaptureContext) {
    let mut tally = PassTally::begin(PassKind::Capture, ctx.target.clone());
    let mut writer = PcmFileWriter::new(ctx.target.clone());

    let mut reason = match capture_loop(device, ctx, &mut writer, &mut tally) {
        Ok(()) => StopReason::Requested,
        Err(e) => {
            log::error!("capture into {} failed: {}", ctx.target.display(), e);
            StopReason::Failed(e)
        }
    };

    let checksum = if writer.bytes_written() > 0 || !reason.is_failure() {
        match writer.finish() {
            Ok(checksum) => Some(checksum),
            Err(e) => {
                if !reason.is_failure() {
                    log::error!("failed to finalize {}: {}", ctx.target.display(), e);
                    reason = StopReason::Failed(e);
                }
                None
            }
        }
    } else {
        None
    };

    ctx.control.end_pass();
    let report = tally.finish(&ctx.format, reason, checksum);
    log::info!(
        "capture pass {} ended ({:?}): {} bytes in {} chunks, {:.2}s",
        report.id,
        report.reason,
        report.bytes,
        report.chunks,
        report.duration_secs
    );
    ctx.completions.notify(&report);
}

/// Open the target, run the device until the running flag clears, stop the device.
fn capture_loop<D: InputDevice>(
    device: &mut D,
    ctx: &CaptureContext,
    writer: &mut PcmFileWriter,
    tally: &mut PassTally,
) -> Result<(), EngineError> {
    writer.open()?;
    device.start()?;

    let result = match ctx.format.sample_encoding {
        SampleEncoding::Pcm8 => read_frames(device, ctx, writer, tally, |b: &mut [u8]| PcmBufferMut::Pcm8(b), |samples: &[u8], out: &mut Vec<u8>| {
            out.clear();
            out.extend_from_slice(samples);
        }),
        SampleEncoding::Pcm16 => read_frames(device, ctx, writer, tally, |b: &mut [i16]| PcmBufferMut::Pcm16(b), sample_codec::encode_pcm16_into),
    };

    if let Err(e) = device.stop() {
        log::warn!("failed to stop input device: {}", e);
    }
    result
}

/// Append whole frames read from the device until the running flag clears.
///
/// A read that ends mid-frame leaves the partial frame at the front of the
/// buffer and the next read completes it. A partial frame still pending when
/// the pass ends is dropped.
fn read_frames<D, T, W, E>(
    device: &mut D,
    ctx: &CaptureContext,
    writer: &mut PcmFileWriter,
    tally: &mut PassTally,
    wrap: W,
    encode: E,
) -> Result<(), EngineError>
where
    D: InputDevice,
    T: Copy + Default,
    W: for<'b> Fn(&'b mut [T]) -> PcmBufferMut<'b>,
    E: Fn(&[T], &mut Vec<u8>),
{
    let channels = ctx.format.channel_count() as usize;
    let mut samples = vec![T::default(); ctx.chunk / ctx.format.sample_encoding.bytes_per_sample()];
    let mut bytes = Vec::with_capacity(ctx.chunk);
    let mut pending = 0;

    while ctx.control.should_continue() {
        let room = samples.len() - pending;
        let n = device.read(wrap(&mut samples[pending..]))?.min(room);
        if n == 0 {
            continue;
        }

        let filled = pending + n;
        let whole = filled - filled % channels;
        if whole > 0 {
            encode(&samples[..whole], &mut bytes);
            writer.write(&bytes)?;
            tally.record_chunk(bytes.len());
        }
        samples.copy_within(whole..filled, 0);
        pending = filled - whole;
    }

    if pending > 0 {
        log::warn!("dropping {} samples of an incomplete trailing frame", pending);
    }
    Ok(())
}
