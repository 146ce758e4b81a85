use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::Utc;
use crossbeam_channel::Receiver;
use parking_lot::Mutex;
use sha2::{Digest, Sha256};

use crate::engine::worker::Worker;
use crate::models::config::EngineConfiguration;
use crate::models::error::EngineError;
use crate::models::format::FormatDescriptor;
use crate::models::report::{ReversalReport, ReversalSummary};
use crate::processing::buffer_sizing;
use crate::processing::frame_reverse::reverse_frames_in_place;
use crate::signaling::completion::{CompletionRegistry, ListenerId};
use crate::storage::backward_cursor::BackwardCursor;
use crate::storage::pcm_writer::hex_encode;
use crate::traits::backend::{AudioBackend, DeviceRole};

/// Write a time-reversed copy of `source` to `destination`.
///
/// The source is read back to front in windows of `window` bytes. Each
/// window has its frames reversed in place and is appended to the
/// destination in the order it was read, which composes into a whole-file
/// reversal because every window boundary lands on a frame boundary. Memory
/// use is bounded by one window regardless of file size.
///
/// A source whose length is not a whole number of frames is rejected before
/// the destination is created. On a mid-pass I/O error the partial
/// destination is left on disk.
pub fn reverse_file(source: &Path, destination: &Path, frame_size: usize, window: usize) -> Result<ReversalSummary, EngineError> {
    if frame_size == 0 || window == 0 {
        return Err(EngineError::Configuration(format!(
            "window {} and frame size {} must both be non-zero",
            window, frame_size
        )));
    }
    if window % frame_size != 0 {
        return Err(EngineError::Alignment { len: window, unit: frame_size });
    }
    if !source.exists() {
        return Err(EngineError::target_not_found(source));
    }
    if is_same_file(source, destination) {
        return Err(EngineError::Configuration(format!(
            "cannot reverse {} onto itself",
            source.display()
        )));
    }

    let mut cursor = BackwardCursor::open(source, window)?;
    if cursor.len() % frame_size as u64 != 0 {
        return Err(EngineError::Alignment {
            len: cursor.len() as usize,
            unit: frame_size,
        });
    }

    let file = File::create(destination).map_err(|e| EngineError::io("failed to create destination", e))?;
    let mut out = BufWriter::new(file);
    let mut hasher = Sha256::new();
    let mut buf = Vec::with_capacity(window);
    let mut windows = 0u64;

    while let Some(range) = cursor.next_window(&mut buf)? {
        reverse_frames_in_place(&mut buf, frame_size)?;
        out.write_all(&buf).map_err(|e| EngineError::io("write failed", e))?;
        hasher.update(&buf);
        windows += 1;
        log::trace!("reversed source bytes {}..{}", range.start, range.end);
    }
    out.flush().map_err(|e| EngineError::io("flush failed", e))?;

    Ok(ReversalSummary {
        bytes: cursor.len(),
        windows,
        window_bytes: window,
        checksum: hex_encode(&hasher.finalize()),
    })
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

struct ReversalRequest {
    source: PathBuf,
    destination: PathBuf,
}

struct JobShared {
    format: FormatDescriptor,
    window: usize,
    in_flight: AtomicBool,
    completions: CompletionRegistry<ReversalReport>,
}

/// A re-runnable, single-flight reversal of one file into another.
///
/// Passes run on the job's own worker thread. Every pass, successful or not,
/// ends with a [`ReversalReport`] delivered to all listeners. The job is
/// marked idle before listeners run, so inside a completion callback
/// `is_running()` already reads `false` and `reverse()` may start the next pass.
pub struct ReversalJob {
    shared: Arc<JobShared>,
    source: Mutex<PathBuf>,
    destination: Mutex<PathBuf>,
    worker: Worker<ReversalRequest>,
}

impl ReversalJob {
    pub fn new(
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        format: FormatDescriptor,
        window_bytes: usize,
    ) -> Result<Self, EngineError> {
        format.validate().map_err(EngineError::Configuration)?;
        if window_bytes == 0 {
            return Err(EngineError::Configuration("reversal window must be non-zero".into()));
        }
        if !format.is_frame_aligned(window_bytes) {
            return Err(EngineError::Alignment {
                len: window_bytes,
                unit: format.frame_size(),
            });
        }

        let shared = Arc::new(JobShared {
            format,
            window: window_bytes,
            in_flight: AtomicBool::new(false),
            completions: CompletionRegistry::new(),
        });
        let pass_shared = Arc::clone(&shared);
        let worker = Worker::spawn(
            "pcm-reversal",
            || Ok(()),
            move |_: &mut (), request: ReversalRequest| run_reversal(&pass_shared, request),
        )?;

        Ok(Self {
            shared,
            source: Mutex::new(source.into()),
            destination: Mutex::new(destination.into()),
            worker,
        })
    }

    /// Build a job whose window is the backend's minimum buffer size for
    /// `format`, unless `config` overrides it.
    pub fn for_backend<B: AudioBackend>(
        backend: &B,
        source: impl Into<PathBuf>,
        destination: impl Into<PathBuf>,
        format: FormatDescriptor,
        config: &EngineConfiguration,
    ) -> Result<Self, EngineError> {
        let window = match config.reversal_chunk_bytes {
            Some(bytes) => bytes,
            None => buffer_sizing::reversal_window(&format, backend.min_buffer_size(DeviceRole::Input, &format)),
        };
        Self::new(source, destination, format, window as usize)
    }

    /// Start a pass. Fails with `Busy` while a previous pass is in flight.
    pub fn reverse(&self) -> Result<(), EngineError> {
        if self
            .shared
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(EngineError::Busy("a reversal is already running".into()));
        }

        let request = ReversalRequest {
            source: self.source_file(),
            destination: self.destination_file(),
        };
        if let Err(e) = self.worker.submit(request) {
            self.shared.in_flight.store(false, Ordering::SeqCst);
            return Err(e);
        }
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.shared.in_flight.load(Ordering::SeqCst)
    }

    pub fn set_source_file(&self, source: impl Into<PathBuf>) -> Result<(), EngineError> {
        self.ensure_idle()?;
        *self.source.lock() = source.into();
        Ok(())
    }

    pub fn set_destination_file(&self, destination: impl Into<PathBuf>) -> Result<(), EngineError> {
        self.ensure_idle()?;
        *self.destination.lock() = destination.into();
        Ok(())
    }

    pub fn source_file(&self) -> PathBuf {
        self.source.lock().clone()
    }

    pub fn destination_file(&self) -> PathBuf {
        self.destination.lock().clone()
    }

    pub fn window_bytes(&self) -> usize {
        self.shared.window
    }

    pub fn format(&self) -> &FormatDescriptor {
        &self.shared.format
    }

    pub fn on_complete<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&ReversalReport) + Send + Sync + 'static,
    {
        self.shared.completions.add_listener(listener)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.shared.completions.remove_listener(id)
    }

    pub fn subscribe(&self) -> Receiver<ReversalReport> {
        self.shared.completions.subscribe()
    }

    /// Wait for any pass in flight to finish, then stop the worker.
    pub fn destroy(self) {
        drop(self);
    }

    fn ensure_idle(&self) -> Result<(), EngineError> {
        if self.is_running() {
            return Err(EngineError::Busy("cannot change paths while a reversal is running".into()));
        }
        Ok(())
    }
}

fn run_reversal(shared: &JobShared, request: ReversalRequest) {
    let started_at = Utc::now();
    log::debug!(
        "reversing {} into {} with {} byte windows",
        request.source.display(),
        request.destination.display(),
        shared.window
    );

    let outcome = reverse_file(
        &request.source,
        &request.destination,
        shared.format.frame_size(),
        shared.window,
    );
    match &outcome {
        Ok(summary) => log::info!(
            "reversed {} bytes of {} in {} windows",
            summary.bytes,
            request.source.display(),
            summary.windows
        ),
        Err(e) => log::error!("reversal of {} failed: {}", request.source.display(), e),
    }

    let report = ReversalReport {
        id: uuid::Uuid::new_v4().to_string(),
        source: request.source,
        destination: request.destination,
        outcome,
        started_at: started_at.to_rfc3339(),
        finished_at: Utc::now().to_rfc3339(),
    };

    shared.in_flight.store(false, Ordering::SeqCst);
    shared.completions.notify(&report);
}
