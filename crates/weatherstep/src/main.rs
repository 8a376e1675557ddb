use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use clap::Parser;
use tracing::info;
use weather_core::io::frame::{make_frame, ForecastRecord};
use weather_core::{Signal, WeatherConfig, WeatherSystem};

#[derive(Parser, Debug)]
#[command(
    name = "weatherstep",
    about = "Batch runner emitting deterministic weather frames as NDJSON"
)]
struct Args {
    /// Path to a weather config JSON document. Built-in defaults when omitted.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Numeric seed for every engine stream.
    #[arg(long, value_name = "NUMBER", conflicts_with = "seed_phrase")]
    seed: Option<u64>,

    /// Textual seed, hashed into the engine streams.
    #[arg(long = "seed-phrase", value_name = "TEXT", conflicts_with = "seed")]
    seed_phrase: Option<String>,

    /// Number of ticks to execute.
    #[arg(long)]
    ticks: u64,

    /// Simulated seconds per tick.
    #[arg(long, default_value_t = 1.0)]
    dt: f32,

    /// Output NDJSON file path.
    #[arg(long)]
    out: PathBuf,

    /// Optional path receiving a forecast line whenever predictions refresh.
    #[arg(long = "emit-forecast", value_name = "PATH")]
    emit_forecast: Option<PathBuf>,
}

const DEFAULT_SEED: u64 = 0;

fn build_system(args: &Args, config: &WeatherConfig) -> WeatherSystem {
    match &args.seed_phrase {
        Some(phrase) => WeatherSystem::from_phrase(config, phrase),
        None => WeatherSystem::new(config, args.seed.unwrap_or(DEFAULT_SEED)),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    ensure!(
        args.dt.is_finite() && args.dt > 0.0,
        "--dt must be a positive number of seconds, got {}",
        args.dt
    );

    let config = match &args.config {
        Some(path) => WeatherConfig::load_from_path(path)
            .with_context(|| format!("failed to read config {:?}", path))?,
        None => WeatherConfig::default(),
    };
    let mut system = build_system(&args, &config);

    let frame_file =
        File::create(&args.out).with_context(|| format!("failed to create {:?}", args.out))?;
    let mut frame_writer = BufWriter::new(frame_file);

    let mut forecast_writer = if let Some(path) = &args.emit_forecast {
        let file = File::create(path)
            .with_context(|| format!("failed to create forecast file at {:?}", path))?;
        Some(BufWriter::new(file))
    } else {
        None
    };

    info!(ticks = args.ticks, dt = args.dt, "starting weatherstep");
    for t in 1..=args.ticks {
        system.tick(args.dt);
        let signals = system.drain_signals();

        if let Some(writer) = forecast_writer.as_mut() {
            let refreshed = signals
                .iter()
                .any(|signal| matches!(signal, Signal::PredictionsUpdated { .. }));
            if refreshed {
                let record = ForecastRecord {
                    t,
                    predictions: system.predictions().predictions(),
                };
                writer.write_all(record.to_ndjson()?.as_bytes())?;
            }
        }

        let frame = make_frame(t, &system, signals);
        let line = frame.to_ndjson()?;
        frame_writer.write_all(line.as_bytes())?;
    }

    frame_writer.flush()?;
    if let Some(writer) = forecast_writer.as_mut() {
        writer.flush()?;
    }
    info!(out = ?args.out, "weatherstep finished");

    Ok(())
}
