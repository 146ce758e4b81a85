use std::fs::File;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crossbeam_channel::Receiver;
use parking_lot::Mutex;

use crate::engine::worker::{PassControl, Worker};
use crate::models::config::EngineConfiguration;
use crate::models::error::EngineError;
use crate::models::format::{FormatDescriptor, SampleEncoding};
use crate::models::report::{PassKind, PassReport, PassTally};
use crate::models::state::{PlaybackState, StopReason};
use crate::processing::buffer_sizing::{self, BufferPlan};
use crate::processing::sample_codec;
use crate::signaling::completion::{CompletionRegistry, ListenerId};
use crate::storage::chunk_reader::read_chunk;
use crate::traits::backend::{AudioBackend, DeviceRole};
use crate::traits::device::{OutputDevice, PcmChunk};

struct PlaybackContext {
    format: FormatDescriptor,
    source: Mutex<PathBuf>,
    chunk: usize,
    control: Arc<PassControl>,
    completions: CompletionRegistry<PassReport>,
}

/// Streams a headerless PCM file to an output device.
///
/// Mirrors [`CaptureEngine`](crate::engine::capture::CaptureEngine): the
/// output device lives on a worker thread for the lifetime of the engine, and
/// each `play()` runs one pass that ends on end of file, on `stop()`, or on
/// the first I/O error. Every pass produces exactly one [`PassReport`], which
/// is delivered before the device is stopped.
///
/// The pass is marked finished before listeners run, so inside a completion
/// callback `state()` already reads `Stopped` and `play()` may be called again.
pub struct PlaybackEngine {
    context: Arc<PlaybackContext>,
    plan: BufferPlan,
    worker: Worker<PathBuf>,
}

impl PlaybackEngine {
    pub fn open<B: AudioBackend>(backend: Arc<B>, format: FormatDescriptor, source: impl Into<PathBuf>) -> Result<Self, EngineError> {
        Self::open_with_config(backend, format, source, &EngineConfiguration::default())
    }

    /// Open the output device for `format` and select `source` for playback.
    pub fn open_with_config<B: AudioBackend>(
        backend: Arc<B>,
        format: FormatDescriptor,
        source: impl Into<PathBuf>,
        config: &EngineConfiguration,
    ) -> Result<Self, EngineError> {
        let source = source.into();
        format.validate().map_err(EngineError::Configuration)?;
        if !source.exists() {
            return Err(EngineError::target_not_found(&source));
        }

        let reported = backend.min_buffer_size(DeviceRole::Output, &format);
        let plan = buffer_sizing::playback_plan(&format, reported, config);
        log::debug!("playback plan for {} Hz: {:?}", format.sample_rate_hz, plan);

        let context = Arc::new(PlaybackContext {
            format: format.clone(),
            source: Mutex::new(source),
            chunk: plan.chunk as usize,
            control: Arc::new(PassControl::default()),
            completions: CompletionRegistry::new(),
        });

        let device_buffer = plan.device_buffer as usize;
        let pass_context = Arc::clone(&context);
        let worker = Worker::spawn(
            "pcm-playback",
            move || backend.open_output(&format, device_buffer),
            move |device: &mut B::Output, source: PathBuf| run_playback_pass(device, &pass_context, source),
        )?;

        Ok(Self { context, plan, worker })
    }

    /// Select the file the next `play()` reads. Only allowed while stopped.
    pub fn set_source_file(&self, source: impl Into<PathBuf>) -> Result<(), EngineError> {
        let source = source.into();
        if self.context.control.is_active() {
            return Err(EngineError::InvalidState("cannot change source while playing".into()));
        }
        if !source.exists() {
            return Err(EngineError::target_not_found(&source));
        }
        log::debug!("playback source set to {}", source.display());
        *self.context.source.lock() = source;
        Ok(())
    }

    pub fn source_file(&self) -> PathBuf {
        self.context.source.lock().clone()
    }

    /// Start a playback pass over the current source file.
    pub fn play(&self) -> Result<(), EngineError> {
        let source = self.source_file();
        if !source.exists() {
            return Err(EngineError::target_not_found(&source));
        }
        self.context.control.begin("playing")?;
        if let Err(e) = self.worker.submit(source) {
            self.context.control.end_pass();
            return Err(e);
        }
        Ok(())
    }

    /// Request the current pass to end at the next chunk boundary.
    pub fn stop(&self) {
        self.context.control.request_stop();
    }

    pub fn state(&self) -> PlaybackState {
        if self.context.control.is_active() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    pub fn on_complete<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&PassReport) + Send + Sync + 'static,
    {
        self.context.completions.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.context.completions.remove_listener(id)
    }

    pub fn subscribe(&self) -> Receiver<PassReport> {
        self.context.completions.subscribe()
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.context.format
    }

    pub fn buffer_plan(&self) -> BufferPlan {
        self.plan
    }

    pub fn destroy(self) {
        drop(self);
    }
}

impl Drop for PlaybackEngine {
    fn drop(&mut self) {
        self.context.control.request_stop();
        self.worker.shutdown();
        log::debug!("playback engine released");
    }
}

fn run_playback_pass<D: OutputDevice>(device: &mut D, ctx: &PlaybackContext, source: PathBuf) {
    let mut tally = PassTally::begin(PassKind::Playback, source.clone());
    let mut started = false;

    let reason = match playback_loop(device, ctx, &source, &mut tally, &mut started) {
        Ok(reason) => reason,
        Err(e) => {
            log::error!("playback of {} failed: {}", source.display(), e);
            StopReason::Failed(e)
        }
    };

    ctx.control.end_pass();
    let report = tally.finish(&ctx.format, reason, None);
    log::info!(
        "playback pass {} ended ({:?}): {} bytes in {} chunks",
        report.id,
        report.reason,
        report.bytes,
        report.chunks
    );
    ctx.completions.notify(&report);

    if started {
        if let Err(e) = device.stop() {
            log::warn!("failed to stop output device: {}", e);
        }
    }
}

fn playback_loop<D: OutputDevice>(
    device: &mut D,
    ctx: &PlaybackContext,
    source: &Path,
    tally: &mut PassTally,
    started: &mut bool,
) -> Result<StopReason, EngineError> {
    let mut file = File::open(source).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EngineError::target_not_found(source),
        _ => EngineError::io("failed to open source", e),
    })?;

    device.start()?;
    *started = true;

    let mut buf = vec![0u8; ctx.chunk];
    let mut samples = Vec::with_capacity(ctx.chunk / 2);
    loop {
        if !ctx.control.should_continue() {
            return Ok(StopReason::Requested);
        }

        let n = read_chunk(&mut file, &mut buf).map_err(|e| EngineError::io("read failed", e))?;
        if n == 0 {
            return Ok(StopReason::EndOfStream);
        }

        let aligned = ctx.format.align_down(n);
        if aligned < n {
            log::warn!(
                "{} ends with a partial frame, dropping {} trailing bytes",
                source.display(),
                n - aligned
            );
        }
        if aligned == 0 {
            return Ok(StopReason::EndOfStream);
        }

        match ctx.format.sample_encoding {
            SampleEncoding::Pcm8 => write_all(device, PcmChunk::Pcm8(&buf[..aligned]))?,
            SampleEncoding::Pcm16 => {
                sample_codec::decode_frames_into(&buf[..aligned], &ctx.format, &mut samples)?;
                write_all(device, PcmChunk::Pcm16(&samples))?;
            }
        }
        tally.record_chunk(aligned);
    }
}

/// Hand `chunk` to the device, resuming after partial accepts.
fn write_all<D: OutputDevice>(device: &mut D, chunk: PcmChunk<'_>) -> Result<(), EngineError> {
    let mut offset = 0;
    while offset < chunk.len() {
        let accepted = device.write(chunk.skip(offset))?;
        if accepted == 0 {
            return Err(EngineError::Io("output device accepted no samples".into()));
        }
        offset += accepted;
    }
    Ok(())
}
