use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde::Serialize;

use pcm_engine_core::{
    CaptureEngine, DeviceSelector, EngineConfiguration, EngineError, PlaybackEngine, ReversalJob, StopReason,
};
use pcm_engine_cpal::{CpalBackend, DeviceInfo};

#[derive(Parser)]
#[command(name = "pcm-engine", version, about = "Record, play and reverse headerless PCM files")]
struct Cli {
    /// JSON engine configuration (formats, buffer scaling, reversal window).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Input device name (default device if omitted).
    #[arg(long, global = true)]
    input_device: Option<String>,

    /// Output device name (default device if omitted).
    #[arg(long, global = true)]
    output_device: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List input and output devices.
    Devices,
    /// Record from the input device into FILE.
    Record {
        file: PathBuf,
        #[arg(long, default_value_t = 5.0)]
        seconds: f64,
    },
    /// Play FILE on the output device until it ends.
    Play { file: PathBuf },
    /// Write a time-reversed copy of SOURCE to DESTINATION.
    Reverse { source: PathBuf, destination: PathBuf },
}

#[derive(Serialize)]
struct DeviceListing {
    inputs: Vec<DeviceInfo>,
    outputs: Vec<DeviceInfo>,
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), EngineError> {
    let config = load_config(&cli)?;
    let backend = Arc::new(CpalBackend::new());

    match cli.command {
        Command::Devices => {
            let enumerator = backend.enumerator();
            print_json(&DeviceListing {
                inputs: enumerator.list_input_devices()?,
                outputs: enumerator.list_output_devices()?,
            })
        }
        Command::Record { file, seconds } => {
            if !seconds.is_finite() || seconds <= 0.0 {
                return Err(EngineError::Configuration("--seconds must be positive".into()));
            }
            ensure_file(&file)?;
            let engine = CaptureEngine::open_with_config(backend, config.capture_format.clone(), &file, &config)?;
            let reports = engine.subscribe();

            engine.start()?;
            log::info!("recording {:.1}s into {}", seconds, file.display());
            thread::sleep(Duration::from_secs_f64(seconds));
            engine.stop();

            let report = reports
                .recv()
                .map_err(|_| EngineError::InvalidState("capture worker exited without a report".into()))?;
            print_json(&report)?;
            match report.reason {
                StopReason::Failed(e) => Err(e),
                _ => Ok(()),
            }
        }
        Command::Play { file } => {
            let engine = PlaybackEngine::open_with_config(backend, config.playback_format.clone(), &file, &config)?;
            let reports = engine.subscribe();
            engine.play()?;

            let report = reports
                .recv()
                .map_err(|_| EngineError::InvalidState("playback worker exited without a report".into()))?;
            print_json(&report)?;
            match report.reason {
                StopReason::Failed(e) => Err(e),
                _ => Ok(()),
            }
        }
        Command::Reverse { source, destination } => {
            let job = ReversalJob::for_backend(
                backend.as_ref(),
                &source,
                &destination,
                config.capture_format.clone(),
                &config,
            )?;
            let reports = job.subscribe();
            job.reverse()?;

            let report = reports
                .recv()
                .map_err(|_| EngineError::InvalidState("reversal worker exited without a report".into()))?;
            print_json(&report)?;
            report.outcome.map(|_| ())
        }
    }
}

fn load_config(cli: &Cli) -> Result<EngineConfiguration, EngineError> {
    let config = match &cli.config {
        Some(path) => EngineConfiguration::load(path)?,
        None => EngineConfiguration::default(),
    };
    let input = selector(&cli.input_device).unwrap_or_else(|| config.capture_format.device.clone());
    let output = selector(&cli.output_device).unwrap_or_else(|| config.playback_format.device.clone());
    Ok(config.with_devices(input, output))
}

fn selector(name: &Option<String>) -> Option<DeviceSelector> {
    name.as_ref().map(|n| DeviceSelector::Named(n.clone()))
}

fn ensure_file(path: &Path) -> Result<(), EngineError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map(|_| ())
        .map_err(|e| EngineError::io("failed to create target", e))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), EngineError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| EngineError::Configuration(format!("failed to serialize output: {}", e)))?;
    println!("{}", json);
    Ok(())
}
