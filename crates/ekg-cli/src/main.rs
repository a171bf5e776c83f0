use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ekg_lib::{
    conditioning::condition,
    config::AnalysisConfig,
    detectors::detect_r_peaks_with_config,
    episodes::{
        scan_episodes, EpisodeSummary, PrecomputedProbabilities, TimedEpisode, WindowScore,
    },
    io::{csv as csv_io, text as text_io, wfdb as wfdb_io, RawRecording},
    metrics::rhythm_statistics,
    pipeline::analyze,
    signal::{Beats, Signal},
};
use log::info;
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

#[derive(Parser)]
#[command(
    name = "ekg",
    version,
    about = "Single-lead ECG beat detection, rhythm statistics and episode aggregation"
)]
struct Cli {
    /// TOML analysis config; omitted keys keep their defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct RecordingArgs {
    /// Sample rate of --input / stdin samples (Hz)
    #[arg(long, default_value_t = 250.0)]
    fs: f64,
    /// Samples as newline/comma separated text or a JSON array; stdin when omitted
    #[arg(long)]
    input: Option<PathBuf>,
    /// Read --input as CSV and take this column
    #[arg(long)]
    csv_column: Option<String>,
    #[arg(long, default_value_t = ',')]
    delimiter: char,
    #[arg(long)]
    wfdb_header: Option<PathBuf>,
    #[arg(long, default_value_t = 0)]
    wfdb_lead: usize,
}

#[derive(Args)]
struct EpisodeArgs {
    /// One classifier probability per window, in window order
    #[arg(long)]
    probabilities: PathBuf,
    /// Override episodes.threshold
    #[arg(long)]
    threshold: Option<f64>,
    /// Override episodes.min_episode_s
    #[arg(long)]
    min_episode_s: Option<f64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Sanitize, resample and normalize a recording
    Condition {
        #[command(flatten)]
        recording: RecordingArgs,
    },
    /// Detect R-peaks (Pan-Tompkins) on the conditioned recording
    DetectBeats {
        #[command(flatten)]
        recording: RecordingArgs,
    },
    /// Heart-rate and HRV statistics from beat indices or a recording
    RhythmStats {
        /// Newline-delimited beat indices sampled at --fs; skips detection
        #[arg(long)]
        beats: Option<PathBuf>,
        #[command(flatten)]
        recording: RecordingArgs,
    },
    /// Merge per-window probabilities into episodes
    Episodes {
        #[command(flatten)]
        recording: RecordingArgs,
        #[command(flatten)]
        episodes: EpisodeArgs,
    },
    /// Run every stage and print the combined report
    Analyze {
        #[command(flatten)]
        recording: RecordingArgs,
        #[command(flatten)]
        episodes: EpisodeArgs,
    },
}

#[derive(Serialize)]
struct BeatsOutput {
    fs: f64,
    count: usize,
    beats: Beats,
}

#[derive(Serialize)]
struct EpisodesOutput {
    fs: f64,
    episodes: Vec<TimedEpisode>,
    summary: EpisodeSummary,
    windows: Vec<WindowScore>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Commands::Condition { recording } => cmd_condition(&recording, &config)?,
        Commands::DetectBeats { recording } => cmd_detect_beats(&recording, &config)?,
        Commands::RhythmStats { beats, recording } => {
            cmd_rhythm_stats(beats.as_deref(), &recording, &config)?
        }
        Commands::Episodes {
            recording,
            episodes,
        } => cmd_episodes(&recording, &episodes, config)?,
        Commands::Analyze {
            recording,
            episodes,
        } => cmd_analyze(&recording, &episodes, config)?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<AnalysisConfig> {
    match path {
        Some(path) => AnalysisConfig::load(path),
        None => Ok(AnalysisConfig::default()),
    }
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_samples(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_samples(&buf)
        }
    }
}

fn load_recording(args: &RecordingArgs) -> Result<RawRecording> {
    if let Some(header) = &args.wfdb_header {
        return wfdb_io::load_wfdb_lead(header, args.wfdb_lead);
    }
    let samples = match (&args.csv_column, &args.input) {
        (Some(column), Some(path)) => {
            let delimiter = u8::try_from(args.delimiter)
                .with_context(|| format!("delimiter {:?} is not a single byte", args.delimiter))?;
            csv_io::read_csv_column(path, column, delimiter)?
        }
        (Some(_), None) => anyhow::bail!("--csv-column needs --input"),
        (None, input) => read_samples(input.as_deref())?,
    };
    Ok(RawRecording {
        fs: args.fs,
        samples,
    })
}

fn conditioned(args: &RecordingArgs, config: &AnalysisConfig) -> Result<Signal> {
    let raw = load_recording(args)?;
    info!("loaded {} samples at {} Hz", raw.samples.len(), raw.fs);
    Ok(condition(&raw.samples, raw.fs, &config.conditioning)?)
}

fn apply_overrides(mut config: AnalysisConfig, args: &EpisodeArgs) -> Result<AnalysisConfig> {
    if let Some(threshold) = args.threshold {
        config.episodes.threshold = threshold;
    }
    if let Some(min_episode_s) = args.min_episode_s {
        config.episodes.min_episode_s = min_episode_s;
    }
    config.validate()?;
    Ok(config)
}

fn cmd_condition(args: &RecordingArgs, config: &AnalysisConfig) -> Result<()> {
    let signal = conditioned(args, config)?;
    println!("{}", serde_json::to_string(&signal)?);
    Ok(())
}

fn cmd_detect_beats(args: &RecordingArgs, config: &AnalysisConfig) -> Result<()> {
    let signal = conditioned(args, config)?;
    let beats = detect_r_peaks_with_config(&signal, &config.detector)?;
    let out = BeatsOutput {
        fs: signal.fs(),
        count: beats.len(),
        beats,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_rhythm_stats(
    beats: Option<&Path>,
    args: &RecordingArgs,
    config: &AnalysisConfig,
) -> Result<()> {
    let (beats, fs) = match beats {
        Some(path) => (Beats::from_indices(text_io::read_beat_indices(path)?), args.fs),
        None => {
            let signal = conditioned(args, config)?;
            let beats = detect_r_peaks_with_config(&signal, &config.detector)?;
            (beats, signal.fs())
        }
    };
    let stats = rhythm_statistics(&beats, fs)?;
    println!("{}", serde_json::to_string(&stats)?);
    Ok(())
}

fn cmd_episodes(
    args: &RecordingArgs,
    episodes: &EpisodeArgs,
    config: AnalysisConfig,
) -> Result<()> {
    let config = apply_overrides(config, episodes)?;
    let signal = conditioned(args, &config)?;
    let probabilities = text_io::read_probabilities(&episodes.probabilities)?;
    let classifier = PrecomputedProbabilities::new(probabilities);
    let scan = scan_episodes(&signal, &classifier, &config.episodes)?;
    let out = EpisodesOutput {
        fs: scan.fs,
        episodes: scan.timed_episodes(),
        summary: scan.summary(),
        windows: scan.windows,
    };
    println!("{}", serde_json::to_string(&out)?);
    Ok(())
}

fn cmd_analyze(
    args: &RecordingArgs,
    episodes: &EpisodeArgs,
    config: AnalysisConfig,
) -> Result<()> {
    let config = apply_overrides(config, episodes)?;
    let raw = load_recording(args)?;
    let probabilities = text_io::read_probabilities(&episodes.probabilities)?;
    let classifier = PrecomputedProbabilities::new(probabilities);
    let report = analyze(&raw.samples, raw.fs, &config, &classifier)?;
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}
