//! panmeter - Main entry point
//!
//! Plays a stereo 16-bit PCM stream while drawing five level bars from
//! hard left to hard right, or prints whole-file levels with `--summary`.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde::Serialize;
use tokio::signal;
use tracing::{info, warn};

use panmeter::analysis::{LevelVector, VirtualChannel};
use panmeter::audio::{AudioFormat, CpalSink, PacedSink, PcmSource, RawPcmSource, WavFileSource};
use panmeter::config::{MeterConfig, CONFIG_ENV_VAR};
use panmeter::display;
use panmeter::engine::{self, AccumulationScope, Engine, EngineConfig, EngineHandle, LatestLevels};
use panmeter::{RunOutcome, RunSummary};

/// Command-line arguments for panmeter
#[derive(Parser, Debug)]
#[command(name = "panmeter")]
#[command(about = "Stereo level meter with five virtual pan positions")]
#[command(version)]
struct Args {
    /// Input file (WAV, or headerless PCM with --raw)
    #[arg(required_unless_present = "list_devices")]
    input: Option<PathBuf>,

    /// Configuration file
    #[arg(short, long, env = CONFIG_ENV_VAR)]
    config: Option<PathBuf>,

    /// Analyse the whole input without playback and print one level per channel
    #[arg(short, long)]
    summary: bool,

    /// Print the summary as JSON
    #[arg(long, requires = "summary")]
    json: bool,

    /// Meter at real-time pace without opening an audio device
    #[arg(long)]
    no_playback: bool,

    /// Output device name
    #[arg(short, long)]
    device: Option<String>,

    /// Analysis window in seconds
    #[arg(short, long)]
    window: Option<f64>,

    /// Level reported for silence (dB)
    #[arg(long, allow_negative_numbers = true)]
    floor_db: Option<f64>,

    /// Input is headerless interleaved 16-bit stereo PCM
    #[arg(long, requires = "rate")]
    raw: bool,

    /// Frame rate of raw input in Hz
    #[arg(long, requires = "raw")]
    rate: Option<f64>,

    /// Raw input samples are big-endian
    #[arg(long, requires = "raw")]
    big_endian: bool,

    /// List output devices and exit
    #[arg(long)]
    list_devices: bool,
}

/// Whole-file result printed by `--summary --json`
#[derive(Serialize)]
struct SummaryReport<'a> {
    input: &'a Path,
    format: AudioFormat,
    #[serde(flatten)]
    run: &'a RunSummary,
    channels: Vec<ChannelLevel>,
}

#[derive(Serialize)]
struct ChannelLevel {
    channel: VirtualChannel,
    db: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (mut config, config_source) =
        MeterConfig::load(args.config.as_deref()).context("Failed to load configuration")?;

    panmeter_common::logging::init("panmeter", &config.logging)
        .context("Failed to initialize logging")?;

    info!(
        "Starting panmeter (version {}, git {}, built {}, {})",
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE")
    );
    config_source.log();

    if args.list_devices {
        let devices = CpalSink::list_devices().context("Failed to list output devices")?;
        for name in devices {
            println!("{}", name);
        }
        return Ok(());
    }

    apply_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    let Some(input) = args.input.as_deref() else {
        bail!("No input file given");
    };
    let source = open_source(input, &args)?;
    let format = source.format();

    let engine = Engine::open_boxed(source, config.engine_config())
        .with_context(|| format!("Cannot meter {}", input.display()))?;

    if args.summary {
        run_summary(engine, input, format, args.json).await
    } else {
        run_live(engine, format, &config).await
    }
}

/// Command-line flags take precedence over the config file
fn apply_overrides(config: &mut MeterConfig, args: &Args) {
    if args.summary {
        let offline = EngineConfig::whole_file();
        config.analysis.scope = AccumulationScope::WholeStream;
        config.analysis.window_seconds = offline.window_seconds;
        config.analysis.floor_db = offline.floor_db;
        config.playback.enabled = false;
    }
    if let Some(window) = args.window {
        config.analysis.window_seconds = window;
    }
    if let Some(floor_db) = args.floor_db {
        config.analysis.floor_db = floor_db;
    }
    if let Some(device) = &args.device {
        config.playback.device = Some(device.clone());
    }
    if args.no_playback {
        config.playback.enabled = false;
    }
}

fn open_source(input: &Path, args: &Args) -> Result<Box<dyn PcmSource>> {
    if args.raw {
        let Some(rate) = args.rate else {
            bail!("--raw requires --rate");
        };
        if !rate.is_finite() || rate <= 0.0 {
            bail!("Invalid frame rate: {}", rate);
        }
        let source = RawPcmSource::open(input, AudioFormat::stereo_16(rate, args.big_endian))
            .with_context(|| format!("Failed to open {}", input.display()))?;
        Ok(Box::new(source))
    } else {
        let source = WavFileSource::open(input)
            .with_context(|| format!("Failed to open {}", input.display()))?;
        Ok(Box::new(source))
    }
}

/// Offline analysis: no playback, one aggregate vector
async fn run_summary(engine: Engine, input: &Path, format: AudioFormat, json: bool) -> Result<()> {
    let handle = engine::spawn(engine).context("Failed to start analysis")?;
    let stop = handle.stop_handle();
    let finished = wait_for_engine(handle);
    tokio::pin!(finished);

    let completed = tokio::select! {
        result = &mut finished => Some(result),
        signal = signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Received Ctrl+C, stopping analysis"),
                Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
            }
            None
        }
    };
    let summary = match completed {
        Some(result) => result?,
        None => {
            stop.stop();
            finished.await?
        }
    };

    let Some(levels) = summary.final_levels else {
        bail!("Analysis produced no levels");
    };

    if json {
        let report = SummaryReport {
            input,
            format,
            run: &summary,
            channels: levels
                .channels()
                .map(|(channel, db)| ChannelLevel { channel, db })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        if summary.outcome == RunOutcome::Stopped {
            println!("(interrupted, partial result)");
        }
        print!("{}", display::render_summary(&levels));
    }
    Ok(())
}

/// Live metering with playback (or real-time pacing) and a redraw loop
async fn run_live(engine: Engine, format: AudioFormat, config: &MeterConfig) -> Result<()> {
    let latest = Arc::new(LatestLevels::new(LevelVector::floor(config.analysis.floor_db)));
    let engine = engine.with_listener(Arc::clone(&latest));

    let engine = if config.playback.enabled {
        engine.with_sink(CpalSink::new(
            &format,
            config.playback_device().map(str::to_string),
            config.playback.buffer_frames,
            Some(config.playback.ring_frames),
        ))
    } else {
        info!("Playback disabled, metering at real-time pace");
        engine.with_sink(PacedSink::new(&format))
    };

    let handle = engine::spawn(engine).context("Failed to start analysis")?;
    let stop = handle.stop_handle();

    let mut ticker = tokio::time::interval(Duration::from_millis(config.display.refresh_ms));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut ctrl_c = std::pin::pin!(signal::ctrl_c());
    let mut drawn_sequence = None;
    let mut drawn_lines = 0;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let sequence = latest.sequence();
                if drawn_sequence != Some(sequence) {
                    drawn_lines = redraw(&latest.latest(), config, drawn_lines)?;
                    drawn_sequence = Some(sequence);
                }
                if handle.is_finished() {
                    break;
                }
            }
            result = &mut ctrl_c => {
                match result {
                    Ok(()) => info!("Received Ctrl+C, stopping"),
                    Err(e) => warn!("Failed to listen for Ctrl+C: {}", e),
                }
                stop.stop();
                break;
            }
        }
    }

    let summary = wait_for_engine(handle).await?;
    redraw(&latest.latest(), config, drawn_lines)?;
    info!(
        "Metered {} frames in {} chunks ({} playback errors)",
        summary.frames, summary.chunks, summary.sink_errors
    );
    Ok(())
}

/// Join the engine thread without blocking the runtime
async fn wait_for_engine(handle: EngineHandle) -> Result<RunSummary> {
    let summary = tokio::task::spawn_blocking(move || handle.join())
        .await
        .context("Engine task failed")?
        .context("Analysis failed")?;
    Ok(summary)
}

/// Overwrite the previous meter frame; returns the number of lines drawn.
fn redraw(levels: &LevelVector, config: &MeterConfig, previous_lines: usize) -> Result<usize> {
    let frame = display::render_meter(levels, &config.display);
    let mut stdout = std::io::stdout().lock();
    if previous_lines > 0 {
        write!(stdout, "\x1b[{}A", previous_lines)?;
    }
    for line in frame.lines() {
        writeln!(stdout, "\r{}\x1b[K", line)?;
    }
    stdout.flush()?;
    Ok(frame.lines().count())
}
