use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::engine::capture::CaptureEngine;
use crate::engine::playback::PlaybackEngine;
use crate::engine::reversal::ReversalJob;
use crate::models::config::EngineConfiguration;
use crate::models::error::EngineError;
use crate::models::report::{PassReport, ReversalReport};
use crate::models::state::{PlaybackState, RecordingState};
use crate::signaling::completion::ListenerId;
use crate::traits::backend::AudioBackend;

/// Which file `Studio::play` streams.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackSource {
    /// The file the capture engine records into.
    Recording,
    /// The output of the last reversal.
    Reversed,
    /// Any other headerless PCM file in the playback format.
    File(PathBuf),
}

/// Record, play back and reverse one take.
///
/// Bundles a capture engine, a playback engine and a reversal job around two
/// files, and keeps them from stepping on each other's files:
///
/// ```text
/// [Input device] → [CaptureEngine] → recording ─┬→ [PlaybackEngine] → [Output device]
///                                               │          ↑
///                                               └→ [ReversalJob] → reversed
/// ```
///
/// Playback and reversal are refused while recording, and recording is
/// refused while either of them is running.
pub struct Studio {
    capture: CaptureEngine,
    playback: PlaybackEngine,
    reversal: ReversalJob,
    recording_path: PathBuf,
    reversed_path: PathBuf,
    source: Mutex<PlaybackSource>,
}

impl Studio {
    /// Open both devices. The two files are created empty if missing.
    pub fn open<B: AudioBackend>(
        backend: Arc<B>,
        config: &EngineConfiguration,
        recording_path: impl Into<PathBuf>,
        reversed_path: impl Into<PathBuf>,
    ) -> Result<Self, EngineError> {
        config.validate().map_err(EngineError::Configuration)?;
        let recording_path = recording_path.into();
        let reversed_path = reversed_path.into();
        ensure_file(&recording_path)?;
        ensure_file(&reversed_path)?;

        let reversal = ReversalJob::for_backend(
            backend.as_ref(),
            &recording_path,
            &reversed_path,
            config.capture_format.clone(),
            config,
        )?;
        let capture =
            CaptureEngine::open_with_config(Arc::clone(&backend), config.capture_format.clone(), &recording_path, config)?;
        let playback = PlaybackEngine::open_with_config(backend, config.playback_format.clone(), &recording_path, config)?;

        log::info!(
            "studio ready: recording {}, reversed {}",
            recording_path.display(),
            reversed_path.display()
        );
        Ok(Self {
            capture,
            playback,
            reversal,
            recording_path,
            reversed_path,
            source: Mutex::new(PlaybackSource::Recording),
        })
    }

    pub fn record(&self) -> Result<(), EngineError> {
        if self.playback.state().is_playing() {
            return Err(EngineError::Busy("cannot record while playing".into()));
        }
        if self.reversal.is_running() {
            return Err(EngineError::Busy("cannot record while reversing".into()));
        }
        self.capture.start()
    }

    pub fn stop_recording(&self) {
        self.capture.stop();
    }

    pub fn recording_state(&self) -> RecordingState {
        self.capture.state()
    }

    /// Play the selected source from its start.
    pub fn play(&self) -> Result<(), EngineError> {
        if self.capture.state().is_recording() {
            return Err(EngineError::Busy("cannot play while recording".into()));
        }
        if self.playback.state().is_playing() {
            return Err(EngineError::InvalidState("already playing".into()));
        }
        let source = self.playback_source();
        if source == PlaybackSource::Reversed && self.reversal.is_running() {
            return Err(EngineError::Busy("reversed file is still being written".into()));
        }
        self.playback.set_source_file(self.resolve(&source))?;
        self.playback.play()
    }

    pub fn stop_playback(&self) {
        self.playback.stop();
    }

    pub fn playback_state(&self) -> PlaybackState {
        self.playback.state()
    }

    /// Select what the next `play()` streams. Takes effect on the next play.
    pub fn set_playback_source(&self, source: PlaybackSource) -> Result<(), EngineError> {
        if let PlaybackSource::File(path) = &source {
            if !path.exists() {
                return Err(EngineError::target_not_found(path));
            }
        }
        *self.source.lock() = source;
        Ok(())
    }

    pub fn playback_source(&self) -> PlaybackSource {
        self.source.lock().clone()
    }

    /// Called when playback reaches the end of its source. Stops requested by
    /// the caller and failed passes are not reported here.
    pub fn on_playback_end<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&PassReport) + Send + Sync + 'static,
    {
        self.playback.on_complete(move |report| {
            if report.is_end_of_stream() {
                callback(report);
            }
        })
    }

    /// Reverse the recording into the reversed file.
    pub fn reverse(&self) -> Result<(), EngineError> {
        if self.capture.state().is_recording() {
            return Err(EngineError::Busy("cannot reverse while recording".into()));
        }
        if self.playback.state().is_playing() && self.playback.source_file() == self.reversed_path {
            return Err(EngineError::Busy("reversed file is being played".into()));
        }
        self.reversal.reverse()
    }

    pub fn on_reversal_complete<F>(&self, callback: F) -> ListenerId
    where
        F: Fn(&ReversalReport) + Send + Sync + 'static,
    {
        self.reversal.on_complete(callback)
    }

    pub fn capture(&self) -> &CaptureEngine {
        &self.capture
    }

    pub fn playback(&self) -> &PlaybackEngine {
        &self.playback
    }

    pub fn reversal(&self) -> &ReversalJob {
        &self.reversal
    }

    pub fn recording_path(&self) -> &Path {
        &self.recording_path
    }

    pub fn reversed_path(&self) -> &Path {
        &self.reversed_path
    }

    /// Stop everything and release both devices.
    pub fn destroy(self) {
        self.capture.stop();
        self.playback.stop();
        drop(self);
    }

    fn resolve(&self, source: &PlaybackSource) -> PathBuf {
        match source {
            PlaybackSource::Recording => self.recording_path.clone(),
            PlaybackSource::Reversed => self.reversed_path.clone(),
            PlaybackSource::File(path) => path.clone(),
        }
    }
}

fn ensure_file(path: &Path) -> Result<(), EngineError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| EngineError::io(&format!("failed to create {}", path.display()), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::state::StopReason;
    use crate::processing::buffer_sizing::MinBufferSize;
    use crate::processing::frame_reverse::reverse_frames_in_place;
    use crate::testing::{InputScript, ScriptedBackend};
    use std::fs;
    use std::time::Duration;

    const TIMEOUT: Duration = Duration::from_secs(10);

    struct Fixture {
        dir: tempfile::TempDir,
        studio: Studio,
        output: Arc<Mutex<crate::testing::OutputLog>>,
        exhausted: crossbeam_channel::Receiver<()>,
    }

    fn fixture(budget_samples: usize) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let (tx, exhausted) = crossbeam_channel::bounded(1);
        let mut backend = ScriptedBackend::new(MinBufferSize::Bytes(400));
        backend.script = InputScript {
            budget_samples: Some(budget_samples),
            exhausted: Some(tx),
            ..Default::default()
        };
        backend.write_delay = Duration::from_millis(1);
        let output = Arc::clone(&backend.output);
        let studio = Studio::open(
            Arc::new(backend),
            &EngineConfiguration::default(),
            dir.path().join("take.pcm"),
            dir.path().join("take-reversed.pcm"),
        )
        .unwrap();
        Fixture {
            dir,
            studio,
            output,
            exhausted,
        }
    }

    fn record_take(fx: &Fixture) -> Vec<u8> {
        let reports = fx.studio.capture().subscribe();
        fx.studio.record().unwrap();
        fx.exhausted.recv_timeout(TIMEOUT).unwrap();
        fx.studio.stop_recording();
        assert_eq!(reports.recv_timeout(TIMEOUT).unwrap().reason, StopReason::Requested);
        fs::read(fx.studio.recording_path()).unwrap()
    }

    #[test]
    fn open_creates_missing_files() {
        let fx = fixture(0);
        assert!(fx.studio.recording_path().exists());
        assert!(fx.studio.reversed_path().exists());
        assert_eq!(fx.studio.reversal().window_bytes(), 400);
    }

    #[test]
    fn record_then_play_back() {
        let fx = fixture(2000);
        let take = record_take(&fx);
        assert_eq!(take.len(), 4000);

        let (tx, ended) = crossbeam_channel::unbounded();
        fx.studio.on_playback_end(move |report| tx.send(report.bytes).unwrap());
        fx.studio.play().unwrap();

        assert_eq!(ended.recv_timeout(TIMEOUT).unwrap(), 4000);
        assert_eq!(fx.output.lock().bytes, take);
    }

    #[test]
    fn reverse_then_play_reversed() {
        let fx = fixture(2000);
        let take = record_take(&fx);

        let (tx, reversed) = crossbeam_channel::unbounded();
        fx.studio.on_reversal_complete(move |report| tx.send(report.clone()).unwrap());
        fx.studio.reverse().unwrap();
        assert!(reversed.recv_timeout(TIMEOUT).unwrap().is_success());

        let mut expected = take.clone();
        reverse_frames_in_place(&mut expected, 4).unwrap();
        assert_eq!(fs::read(fx.studio.reversed_path()).unwrap(), expected);

        let (tx, ended) = crossbeam_channel::unbounded();
        fx.studio.on_playback_end(move |_| tx.send(()).unwrap());
        fx.studio.set_playback_source(PlaybackSource::Reversed).unwrap();
        fx.studio.play().unwrap();
        ended.recv_timeout(TIMEOUT).unwrap();
        assert_eq!(fx.output.lock().bytes, expected);
    }

    #[test]
    fn refuses_conflicting_operations() {
        let fx = fixture(usize::MAX);
        let reports = fx.studio.capture().subscribe();

        fx.studio.record().unwrap();
        assert!(matches!(fx.studio.play(), Err(EngineError::Busy(_))));
        assert!(matches!(fx.studio.reverse(), Err(EngineError::Busy(_))));
        fx.studio.stop_recording();
        reports.recv_timeout(TIMEOUT).unwrap();

        let long = fx.dir.path().join("long.pcm");
        fs::write(&long, vec![0u8; 4 * 200_000]).unwrap();
        fx.studio.set_playback_source(PlaybackSource::File(long)).unwrap();
        let playback = fx.studio.playback().subscribe();
        fx.studio.play().unwrap();
        assert!(matches!(fx.studio.record(), Err(EngineError::Busy(_))));
        fx.studio.stop_playback();
        assert_eq!(playback.recv_timeout(TIMEOUT).unwrap().reason, StopReason::Requested);
    }

    #[test]
    fn playback_end_ignores_requested_stops() {
        let fx = fixture(0);
        let long = fx.dir.path().join("long.pcm");
        fs::write(&long, vec![0u8; 4 * 200_000]).unwrap();
        fx.studio.set_playback_source(PlaybackSource::File(long)).unwrap();

        let (tx, ended) = crossbeam_channel::unbounded();
        fx.studio.on_playback_end(move |_| tx.send(()).unwrap());
        let reports = fx.studio.playback().subscribe();

        fx.studio.play().unwrap();
        fx.studio.stop_playback();
        assert_eq!(reports.recv_timeout(TIMEOUT).unwrap().reason, StopReason::Requested);
        assert!(ended.try_recv().is_err());
    }

    #[test]
    fn unknown_file_source_is_rejected() {
        let fx = fixture(0);
        let missing = fx.dir.path().join("missing.pcm");
        assert!(matches!(
            fx.studio.set_playback_source(PlaybackSource::File(missing)),
            Err(EngineError::TargetNotFound(_))
        ));
        assert_eq!(fx.studio.playback_source(), PlaybackSource::Recording);
    }
}
