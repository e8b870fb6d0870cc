mod synth;
mod transport;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use spike_lib::{
    config::read_config,
    filters::{BandLimit, Parabola},
    io::{csv as csv_io, eeg as eeg_io, text as text_io, Recording},
    request::{handle_request, handle_str, DetectionRequest},
    ResidualMode, SpikeDetectorConfig, ThresholdStat,
};
use std::{
    fs,
    io::{self, Read},
    path::{Path, PathBuf},
};

use crate::synth::{synth_request, SynthSpec};

const DEFAULT_FS: f64 = 256.0;

#[derive(Parser)]
#[command(
    name = "spike",
    version,
    about = "Morphological spike detection for EEG recordings"
)]
struct Cli {
    /// Logging verbosity (e.g., debug, info, warn)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum StatArg {
    Median,
    Mean,
}

impl From<StatArg> for ThresholdStat {
    fn from(arg: StatArg) -> Self {
        match arg {
            StatArg::Median => ThresholdStat::Median,
            StatArg::Mean => ThresholdStat::Mean,
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum ModeArg {
    Amplitude,
    Magnitude,
}

impl From<ModeArg> for ResidualMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Amplitude => ResidualMode::Amplitude,
            ModeArg::Magnitude => ResidualMode::Magnitude,
        }
    }
}

/// Detector parameters; each one overrides the `--config` file when given.
#[derive(Args, Debug)]
struct DetectorArgs {
    /// TOML detector configuration
    #[arg(long)]
    config: Option<PathBuf>,
    /// Structuring element width in samples
    #[arg(long)]
    width: Option<usize>,
    /// Parabolic structuring function a*k^2 + b (both required)
    #[arg(long, requires = "parabola_b")]
    parabola_a: Option<f64>,
    #[arg(long, requires = "parabola_a")]
    parabola_b: Option<f64>,
    #[arg(long)]
    multiplier: Option<f64>,
    #[arg(long)]
    stat: Option<StatArg>,
    #[arg(long)]
    mode: Option<ModeArg>,
    #[arg(long)]
    min_width: Option<usize>,
    #[arg(long)]
    min_prominence: Option<f64>,
    /// Butterworth band-pass edges in Hz
    #[arg(long, num_args = 2, value_names = ["LOW_HZ", "HIGH_HZ"], conflicts_with = "low_pass")]
    band_pass: Option<Vec<f64>>,
    #[arg(long, default_value_t = 4)]
    band_order: usize,
    /// Windowed-sinc low-pass cutoff in Hz
    #[arg(long)]
    low_pass: Option<f64>,
    #[arg(long, default_value_t = 101)]
    taps: usize,
}

impl DetectorArgs {
    fn band_limit(&self) -> Option<BandLimit> {
        if let Some(edges) = &self.band_pass {
            return Some(BandLimit::BandPass {
                low_hz: edges[0],
                high_hz: edges[1],
                order: self.band_order,
            });
        }
        self.low_pass.map(|cutoff_hz| BandLimit::LowPass {
            cutoff_hz,
            taps: self.taps,
        })
    }

    fn apply(&self, request: &mut DetectionRequest) {
        request.neighborhood_width = self.width;
        request.parabola = self
            .parabola_a
            .zip(self.parabola_b)
            .map(|(a, b)| Parabola { a, b });
        request.threshold_multiplier = self.multiplier;
        request.threshold_stat = self.stat.map(Into::into);
        request.residual_mode = self.mode.map(Into::into);
        request.min_width = self.min_width;
        request.min_prominence = self.min_prominence;
        request.band_limit = self.band_limit();
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Detect spikes in one channel read from stdin, --input, --csv or --edf
    Detect {
        /// Sampling frequency in Hz; defaults to the rate the input declares, else 256
        #[arg(long)]
        fs: Option<f64>,
        /// Newline-delimited samples
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long, requires = "column")]
        csv: Option<PathBuf>,
        #[arg(long)]
        column: Option<String>,
        #[arg(long, conflicts_with_all = ["csv", "input"])]
        edf: Option<PathBuf>,
        #[arg(long, default_value_t = 0)]
        channel: usize,
        #[arg(long, default_value_t = 0.0)]
        start_minute: f64,
        #[arg(long)]
        duration_minutes: Option<f64>,
        /// Sweep consecutive windows of --duration-minutes
        #[arg(long, requires = "duration_minutes")]
        sweep: bool,
        /// Include peak indices in the report
        #[arg(long)]
        indices: bool,
        #[command(flatten)]
        detector: DetectorArgs,
    },
    /// Answer one JSON request (single or batch) from stdin or --input
    Request {
        #[arg(long)]
        input: Option<PathBuf>,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Answer newline-delimited JSON requests on stdin until EOF
    Serve {
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print a JSON request with seeded noise and injected spikes
    Synth {
        #[arg(long, default_value_t = 2560)]
        samples: usize,
        #[arg(long, default_value_t = DEFAULT_FS)]
        fs: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        #[arg(long, default_value_t = 1.0)]
        noise: f64,
        #[arg(long, default_value_t = 0)]
        spikes: usize,
        #[arg(long, default_value_t = 50.0)]
        amplitude: f64,
        #[arg(long)]
        indices: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    match cli.command {
        Commands::Detect {
            fs,
            input,
            csv,
            column,
            edf,
            channel,
            start_minute,
            duration_minutes,
            sweep,
            indices,
            detector,
        } => {
            let recording = load_recording(
                input.as_deref(),
                csv.as_deref(),
                column.as_deref(),
                edf.as_deref(),
                channel,
            )?;
            let fs = fs.or(recording.fs).unwrap_or(DEFAULT_FS);
            let mut request = DetectionRequest::new(recording.samples, fs);
            request.start_minute = Some(start_minute);
            request.duration_minutes = duration_minutes;
            request.sweep = sweep;
            request.include_indices = indices;
            detector.apply(&mut request);
            cmd_detect(&request, &load_config(detector.config.as_deref())?)?
        }
        Commands::Request { input, config } => {
            cmd_request(input.as_deref(), &load_config(config.as_deref())?)?
        }
        Commands::Serve { config } => {
            let base = load_config(config.as_deref())?;
            let stdin = io::stdin();
            let stdout = io::stdout();
            transport::serve(stdin.lock(), &mut stdout.lock(), &base)?;
        }
        Commands::Synth {
            samples,
            fs,
            seed,
            noise,
            spikes,
            amplitude,
            indices,
        } => {
            let spec = SynthSpec {
                samples,
                fs,
                seed,
                noise,
                spikes,
                amplitude,
            };
            println!("{}", serde_json::to_string(&synth_request(&spec, indices)?)?);
        }
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SpikeDetectorConfig> {
    match path {
        Some(path) => read_config(path),
        None => Ok(SpikeDetectorConfig::default()),
    }
}

fn read_stdin() -> Result<String> {
    let mut buf = String::new();
    io::stdin()
        .read_to_string(&mut buf)
        .context("reading stdin")?;
    Ok(buf)
}

fn load_recording(
    input: Option<&Path>,
    csv: Option<&Path>,
    column: Option<&str>,
    edf: Option<&Path>,
    channel: usize,
) -> Result<Recording> {
    if let Some(path) = edf {
        return eeg_io::read_edf_channel(path, channel);
    }
    if let (Some(path), Some(column)) = (csv, column) {
        return csv_io::read_csv_recording(path, column);
    }
    match input {
        Some(path) => text_io::read_recording(path),
        None => text_io::parse_recording(&read_stdin()?),
    }
}

fn cmd_detect(request: &DetectionRequest, base: &SpikeDetectorConfig) -> Result<()> {
    let response = handle_request(request, base)?;
    info!("{} peak(s) detected", response.total_peaks());
    println!("{}", serde_json::to_string(&response)?);
    Ok(())
}

fn cmd_request(input: Option<&Path>, base: &SpikeDetectorConfig) -> Result<()> {
    let body = match input {
        Some(path) => fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?,
        None => read_stdin()?,
    };
    let response = handle_str(&body, base);
    println!("{}", response);
    let value: serde_json::Value = serde_json::from_str(&response)?;
    if let Some(kind) = value.get("error").and_then(|k| k.as_str()) {
        bail!("request failed: {}", kind);
    }
    Ok(())
}
