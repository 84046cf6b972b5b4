use std::{
    f32::consts::TAU,
    fs::File,
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use clap::{Args, Parser, Subcommand};
use prism_visualiser_core::{
    FixedStepScheduler, FrameScheduler, FrequencyBands, PacedScheduler, PrismGeometry,
    RecordingSurface, Renderer, Size, SpectrumAnalyser, VisualiserConfig, VisualiserError,
};
use tracing_subscriber::EnvFilter;

fn main() -> prism_visualiser_core::Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Render(args) => run_render(config, &args),
        Commands::Geometry {
            width,
            height,
            bass,
            mid,
            treble,
        } => {
            let bands = FrequencyBands::new(bass, mid, treble);
            let geometry = PrismGeometry::compute(
                &bands,
                Size::new(width, height),
                &config.prism,
                &config.inner,
            );
            println!("{}", serde_json::to_string_pretty(&geometry)?);
            Ok(())
        }
        Commands::Config => {
            println!("{}", config.to_json_pretty()?);
            Ok(())
        }
    }
}

fn load_config(path: Option<&Path>) -> prism_visualiser_core::Result<VisualiserConfig> {
    match path {
        Some(path) => {
            tracing::info!(?path, "loading configuration");
            VisualiserConfig::from_path(path)
        }
        None => Ok(VisualiserConfig::default()),
    }
}

fn run_render(config: VisualiserConfig, args: &RenderArgs) -> prism_visualiser_core::Result<()> {
    tracing::info!(
        width = args.width,
        height = args.height,
        opportunities = args.opportunities,
        refresh_hz = args.refresh_hz,
        realtime = args.realtime,
        "starting headless render"
    );

    let mut analyser = SpectrumAnalyser::new(config.spectrum.clone())?;
    let surface = RecordingSurface::new(Size::new(args.width, args.height));
    let mut renderer = Renderer::new(surface.clone(), config)?;
    let mut output = match &args.output {
        Some(path) => Some(BufWriter::new(File::create(path)?)),
        None => None,
    };

    let mut scheduler: Box<dyn FrameScheduler> = if args.realtime {
        Box::new(PacedScheduler::new(args.refresh_hz, Some(args.opportunities))?)
    } else {
        Box::new(FixedStepScheduler::new(
            args.refresh_hz,
            Some(args.opportunities),
        )?)
    };

    let signal = TestSignal::new(args.sample_rate);
    let block_len = analyser.config().fft_size;
    let mut write_error: Option<VisualiserError> = None;
    let mut previous_timestamp = 0.0;

    renderer.start();
    let drawn = renderer.run(scheduler.as_mut(), |renderer, timestamp| {
        if let Err(error) = flush_commands(output.as_mut(), &surface, previous_timestamp) {
            tracing::error!(%error, "could not write draw commands, stopping");
            write_error = Some(error);
            renderer.stop();
            return;
        }
        previous_timestamp = timestamp;

        let block = signal.block_at(timestamp / 1000.0, block_len);
        match analyser.analyse(&block) {
            Ok(snapshot) => renderer.update_frequency_data(snapshot),
            Err(error) => tracing::warn!(%error, "skipping frequency update"),
        }
    });

    if let Some(error) = write_error {
        return Err(error);
    }
    flush_commands(output.as_mut(), &surface, previous_timestamp)?;
    if let Some(writer) = output.as_mut() {
        writer.flush()?;
    }

    tracing::info!(
        frames = drawn,
        errors = renderer.frame_errors(),
        rotation = renderer.rotation(),
        bands = ?renderer.last_bands(),
        "render finished"
    );
    Ok(())
}

/// Writes the commands recorded since the last call as one JSON line.
fn flush_commands(
    output: Option<&mut BufWriter<File>>,
    surface: &RecordingSurface,
    timestamp: f64,
) -> prism_visualiser_core::Result<()> {
    let commands = surface.take_commands();
    let Some(writer) = output else {
        return Ok(());
    };
    if commands.is_empty() {
        return Ok(());
    }

    let line = serde_json::json!({ "timestamp": timestamp, "commands": commands });
    serde_json::to_writer(&mut *writer, &line)?;
    writer.write_all(b"\n")?;
    Ok(())
}

/// Synthetic programme material: a kick-like 55 Hz tone pulsing at
/// 120 BPM under a slow logarithmic sweep from 200 Hz to 8 kHz.
struct TestSignal {
    sample_rate: f32,
}

impl TestSignal {
    const SWEEP_SECONDS: f32 = 8.0;
    const SWEEP_LOW_HZ: f32 = 200.0;
    const SWEEP_HIGH_HZ: f32 = 8_000.0;
    const BASS_HZ: f32 = 55.0;
    const BEATS_PER_SECOND: f32 = 2.0;

    fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate: sample_rate as f32,
        }
    }

    /// `len` samples ending at `end_seconds`.
    fn block_at(&self, end_seconds: f64, len: usize) -> Vec<f32> {
        let end = end_seconds as f32;
        (0..len)
            .map(|index| {
                let t = end - (len - index) as f32 / self.sample_rate;
                self.sample(t.max(0.0))
            })
            .collect()
    }

    fn sample(&self, t: f32) -> f32 {
        let beat_phase = (t * Self::BEATS_PER_SECOND).fract();
        let envelope = (-beat_phase * 6.0).exp();
        let bass = (TAU * Self::BASS_HZ * t).sin() * envelope * 0.6;

        let progress = (t / Self::SWEEP_SECONDS).fract();
        let ratio = Self::SWEEP_HIGH_HZ / Self::SWEEP_LOW_HZ;
        let sweep_hz = Self::SWEEP_LOW_HZ * ratio.powf(progress);
        let sweep = (TAU * sweep_hz * t).sin() * 0.3;

        bass + sweep
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .try_init();
}

#[derive(Parser, Debug)]
#[command(author, version, about = "Audio-reactive prism visualiser", long_about = None)]
struct Cli {
    /// JSON configuration file; omitted values keep their defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a synthetic signal offscreen and optionally dump draw commands.
    Render(RenderArgs),
    /// Print the prism layout for a surface size and band levels.
    Geometry {
        #[arg(long, default_value_t = 800)]
        width: u32,
        #[arg(long, default_value_t = 600)]
        height: u32,
        #[arg(long, default_value_t = 0.0)]
        bass: f64,
        #[arg(long, default_value_t = 0.0)]
        mid: f64,
        #[arg(long, default_value_t = 0.0)]
        treble: f64,
    },
    /// Print the effective configuration.
    Config,
}

#[derive(Args, Debug)]
struct RenderArgs {
    #[arg(long, default_value_t = 800)]
    width: u32,
    #[arg(long, default_value_t = 600)]
    height: u32,
    /// Number of paint opportunities the host offers.
    #[arg(short = 'n', long, default_value_t = 600)]
    opportunities: u64,
    /// Cadence of the simulated display.
    #[arg(long, default_value_t = 144.0)]
    refresh_hz: f64,
    /// Sample rate of the synthetic signal.
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u32,
    /// Wait for real time between frames instead of running flat out.
    #[arg(long)]
    realtime: bool,
    /// Write recorded draw commands as JSON lines.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_is_bounded_and_audible() {
        let signal = TestSignal::new(48_000);
        let block = signal.block_at(1.0, 2048);

        assert_eq!(block.len(), 2048);
        assert!(block.iter().all(|s| s.abs() <= 0.91));
        assert!(block.iter().any(|s| s.abs() > 0.05));
    }

    #[test]
    fn test_signal_drives_bass_energy() {
        let signal = TestSignal::new(48_000);
        let mut analyser = SpectrumAnalyser::new(Default::default()).unwrap();
        let snapshot = analyser.analyse(&signal.block_at(0.05, 2048)).unwrap();
        let bands = prism_visualiser_core::analyze_frequency_bands(Some(&snapshot));

        assert!(bands.bass > 0.0);
    }

    #[test]
    fn cli_parses_render_options() {
        let cli = Cli::try_parse_from([
            "prism",
            "render",
            "--width",
            "320",
            "-n",
            "10",
            "--config",
            "prism.json",
        ])
        .unwrap();

        assert_eq!(cli.config, Some(PathBuf::from("prism.json")));
        match cli.command {
            Commands::Render(args) => {
                assert_eq!(args.width, 320);
                assert_eq!(args.opportunities, 10);
                assert!(!args.realtime);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }
}
