// src/main.rs
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::thread;
use std::time::UNIX_EPOCH;

use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use serde_json::json;

use phaseskew::drivers::{Measurement, SimulatedSource};
use phaseskew::engine;
use phaseskew::recorder::ChunkRecorder;
use phaseskew::types::SessionEvent;
use phaseskew::{Session, SessionConfig};

/// Measure dominant frequency and phase skew between two synchronized channels.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Args {
    /// JSON session configuration; defaults are used for missing fields
    #[arg(long)]
    config: Option<PathBuf>,
    /// Stop after this many chunks (otherwise press Enter to stop)
    #[arg(long)]
    chunks: Option<u64>,
    /// Per-chunk voltage log
    #[arg(long)]
    voltage_csv: Option<PathBuf>,
    /// Per-chunk spectrum log
    #[arg(long)]
    dft_csv: Option<PathBuf>,
    /// Deliver simulated samples scan-interleaved
    #[arg(long)]
    interleaved: bool,
    /// Simulated tone frequency in Hz
    #[arg(long)]
    tone_hz: Option<f64>,
    /// Simulated phase of channel A relative to channel B, in degrees
    #[arg(long)]
    offset_deg: Option<f64>,
    /// Peak uniform noise added to each simulated channel
    #[arg(long)]
    noise: Option<f64>,
    /// Seed for the simulated noise
    #[arg(long)]
    seed: Option<u64>,
    /// Pace simulated chunks at the sample rate
    #[arg(long)]
    realtime: bool,
    /// Print one JSON object per chunk instead of the status line
    #[arg(long)]
    json: bool,
}

fn load_config(args: &Args) -> Result<SessionConfig> {
    let mut config = match &args.config {
        Some(path) => SessionConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => SessionConfig::default(),
    };
    if args.voltage_csv.is_some() {
        config.voltage_csv = args.voltage_csv.clone();
    }
    if args.dft_csv.is_some() {
        config.dft_csv = args.dft_csv.clone();
    }
    let sim = &mut config.simulation;
    sim.interleaved |= args.interleaved;
    sim.realtime |= args.realtime;
    if let Some(hz) = args.tone_hz {
        sim.frequency_hz = hz;
    }
    if let Some(deg) = args.offset_deg {
        sim.offset_deg = deg;
    }
    if let Some(noise) = args.noise {
        sim.noise = noise;
    }
    if args.seed.is_some() {
        sim.seed = args.seed;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();
    let config = load_config(&args)?;
    let source = SimulatedSource::new(
        config.simulation.tone(),
        config.sample_rate_hz,
        config.chunk_len,
    )
    .interleaved(config.simulation.interleaved)
    .realtime(config.simulation.realtime)
    .with_seed(config.simulation.seed)
    .limit(args.chunks);
    let mut recorder = ChunkRecorder::create(
        config.voltage_csv.as_deref(),
        config.dft_csv.as_deref(),
        config.log_precision(),
    )
    .context("failed to create CSV logs")?;
    let session = Session::new(source, config.pipeline_settings())?;
    let handle = engine::spawn(session, config.queue_capacity);

    if args.chunks.is_none() {
        let stop = handle.stop_handle();
        thread::spawn(move || {
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line).ok();
            stop.stop();
        });
        println!("Acquiring samples continuously. Press Enter to interrupt.");
    }
    info!(
        "sample rate {} Hz, {} samples per channel",
        config.sample_rate_hz, config.chunk_len
    );
    if !args.json {
        println!("A Samples\tB Samples\tFrequency (Hz)\tPhase Skew (deg)\tPhase Skew (sec)");
    }

    let stdout = io::stdout();
    for event in handle.events.iter() {
        match event {
            SessionEvent::Chunk { analysis, counters } => {
                recorder.record(&analysis).context("failed to write CSV logs")?;
                let mut out = stdout.lock();
                if args.json {
                    let started_at = analysis
                        .started_at
                        .duration_since(UNIX_EPOCH)
                        .map(|d| d.as_secs_f64())
                        .unwrap_or_default();
                    let line = json!({
                        "sequence": analysis.sequence,
                        "started_at": started_at,
                        "counters": counters,
                        "dominant": analysis.dominant,
                        "measurement": analysis.measurement,
                    });
                    writeln!(out, "{line}")?;
                    continue;
                }
                match analysis.measurement {
                    Measurement::Skew(r) => write!(
                        out,
                        "{}\t\t{}\t\t{:.2}\t\t{:.2}\t\t\t{:.2e}\r",
                        counters.samples_read_a,
                        counters.samples_read_b,
                        r.frequency_hz,
                        r.phase_skew_deg,
                        r.phase_skew_sec
                    )?,
                    Measurement::NoSignal | Measurement::BelowFloor { .. } => write!(
                        out,
                        "{}\t\t{}\t\tno signal\t\t\t\t\t\r",
                        counters.samples_read_a, counters.samples_read_b
                    )?,
                }
                out.flush()?;
            }
            SessionEvent::ChunkFailed(msg) => eprintln!("\nchunk skipped: {msg}"),
            SessionEvent::Finished(counters) => {
                println!();
                info!(
                    "finished: {} measured, {} without signal, {} failed",
                    counters.chunks_measured, counters.chunks_without_signal, counters.chunks_failed
                );
            }
        }
    }
    recorder.flush().context("failed to flush CSV logs")?;
    handle.join();
    Ok(())
}
