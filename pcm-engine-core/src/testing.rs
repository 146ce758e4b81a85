//! Scriptable devices for engine tests.

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;
use parking_lot::Mutex;

use crate::models::error::EngineError;
use crate::models::format::FormatDescriptor;
use crate::processing::buffer_sizing::MinBufferSize;
use crate::traits::backend::{AudioBackend, DeviceRole};
use crate::traits::device::{InputDevice, OutputDevice, PcmBufferMut, PcmChunk};

/// What the scripted input device produces.
#[derive(Clone)]
pub struct InputScript {
    /// Repeating pattern for 16-bit reads.
    pub pattern16: Vec<i16>,
    /// Repeating pattern for 8-bit reads.
    pub pattern8: Vec<u8>,
    /// Total samples to deliver before going quiet.
    pub budget_samples: Option<usize>,
    /// Signalled once when the budget is used up.
    pub exhausted: Option<Sender<()>>,
    /// Sleep before each read to emulate device latency.
    pub read_delay: Duration,
    /// Reads that succeed before every further read fails.
    pub fail_after_reads: Option<usize>,
    /// Most samples delivered by a single read.
    pub max_read_samples: Option<usize>,
}

impl Default for InputScript {
    fn default() -> Self {
        Self {
            pattern16: vec![0, 1000, -1000, i16::MAX, i16::MIN],
            pattern8: vec![128, 200, 56],
            budget_samples: None,
            exhausted: None,
            read_delay: Duration::from_millis(1),
            fail_after_reads: None,
            max_read_samples: None,
        }
    }
}

/// Everything an output device was asked to do.
#[derive(Debug, Default)]
pub struct OutputLog {
    pub bytes: Vec<u8>,
    pub writes: usize,
    pub starts: usize,
    pub stops: usize,
}

/// Backend handing out scripted devices.
pub struct ScriptedBackend {
    pub min_buffer: MinBufferSize,
    pub fail_input: bool,
    pub fail_output: bool,
    pub script: InputScript,
    pub output: Arc<Mutex<OutputLog>>,
    pub write_delay: Duration,
    pub opened_buffers: Mutex<Vec<(DeviceRole, usize)>>,
}

impl ScriptedBackend {
    pub fn new(min_buffer: MinBufferSize) -> Self {
        Self {
            min_buffer,
            fail_input: false,
            fail_output: false,
            script: InputScript::default(),
            output: Arc::new(Mutex::new(OutputLog::default())),
            write_delay: Duration::ZERO,
            opened_buffers: Mutex::new(Vec::new()),
        }
    }
}

impl AudioBackend for ScriptedBackend {
    type Input = PatternInput;
    type Output = RecordingOutput;

    fn min_buffer_size(&self, _role: DeviceRole, _format: &FormatDescriptor) -> MinBufferSize {
        self.min_buffer
    }

    fn open_input(&self, _format: &FormatDescriptor, buffer_bytes: usize) -> Result<PatternInput, EngineError> {
        if self.fail_input {
            return Err(EngineError::DeviceInit("scripted input failure".into()));
        }
        self.opened_buffers.lock().push((DeviceRole::Input, buffer_bytes));
        Ok(PatternInput {
            script: self.script.clone(),
            delivered: 0,
            reads: 0,
            recording: false,
        })
    }

    fn open_output(&self, _format: &FormatDescriptor, buffer_bytes: usize) -> Result<RecordingOutput, EngineError> {
        if self.fail_output {
            return Err(EngineError::DeviceInit("scripted output failure".into()));
        }
        self.opened_buffers.lock().push((DeviceRole::Output, buffer_bytes));
        Ok(RecordingOutput {
            log: Arc::clone(&self.output),
            delay: self.write_delay,
        })
    }
}

pub struct PatternInput {
    script: InputScript,
    delivered: usize,
    reads: usize,
    recording: bool,
}

impl InputDevice for PatternInput {
    fn start(&mut self) -> Result<(), EngineError> {
        self.recording = true;
        Ok(())
    }

    fn read(&mut self, buf: PcmBufferMut<'_>) -> Result<usize, EngineError> {
        if !self.recording {
            return Err(EngineError::InvalidState("read while not recording".into()));
        }
        thread::sleep(self.script.read_delay);
        if let Some(limit) = self.script.fail_after_reads {
            if self.reads >= limit {
                return Err(EngineError::Io("scripted read failure".into()));
            }
        }
        self.reads += 1;

        let remaining = match self.script.budget_samples {
            Some(budget) => budget.saturating_sub(self.delivered),
            None => usize::MAX,
        };
        if remaining == 0 {
            if let Some(tx) = self.script.exhausted.take() {
                let _ = tx.send(());
            }
            return Ok(0);
        }

        let count = buf
            .len()
            .min(remaining)
            .min(self.script.max_read_samples.unwrap_or(usize::MAX));
        let start = self.delivered;
        match buf {
            PcmBufferMut::Pcm8(out) => {
                let pattern = &self.script.pattern8;
                for (i, slot) in out.iter_mut().take(count).enumerate() {
                    *slot = pattern[(start + i) % pattern.len()];
                }
            }
            PcmBufferMut::Pcm16(out) => {
                let pattern = &self.script.pattern16;
                for (i, slot) in out.iter_mut().take(count).enumerate() {
                    *slot = pattern[(start + i) % pattern.len()];
                }
            }
        }
        self.delivered += count;
        Ok(count)
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.recording = false;
        Ok(())
    }
}

pub struct RecordingOutput {
    log: Arc<Mutex<OutputLog>>,
    delay: Duration,
}

impl OutputDevice for RecordingOutput {
    fn start(&mut self) -> Result<(), EngineError> {
        self.log.lock().starts += 1;
        Ok(())
    }

    fn write(&mut self, chunk: PcmChunk<'_>) -> Result<usize, EngineError> {
        thread::sleep(self.delay);
        let mut log = self.log.lock();
        log.writes += 1;
        match chunk {
            PcmChunk::Pcm8(samples) => log.bytes.extend_from_slice(samples),
            PcmChunk::Pcm16(samples) => {
                for sample in samples {
                    log.bytes.extend_from_slice(&sample.to_ne_bytes());
                }
            }
        }
        Ok(chunk.len())
    }

    fn stop(&mut self) -> Result<(), EngineError> {
        self.log.lock().stops += 1;
        Ok(())
    }
}

/// Expected bytes of `samples` samples of the 16-bit pattern.
pub fn pattern16_bytes(script: &InputScript, samples: usize) -> Vec<u8> {
    (0..samples)
        .flat_map(|i| script.pattern16[i % script.pattern16.len()].to_ne_bytes())
        .collect()
}
