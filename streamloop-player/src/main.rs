//! streamloop player - render entry point
//!
//! Loads a compressed audio file, ingests it into a stream descriptor, and
//! pulls fixed-size blocks through a playback cursor the way a host audio
//! callback would, writing the result to a 32-bit float stereo WAV file.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use streamloop_common::time::{frames_to_seconds, seconds_to_frames};
use streamloop_player::config::PlayerConfig;
use streamloop_player::{AudioFrame, HeapAllocator, StreamDescriptor};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command-line arguments for streamloop-player
#[derive(Parser, Debug)]
#[command(name = "streamloop-player")]
#[command(about = "Render a compressed audio stream through a playback cursor to WAV")]
#[command(version)]
struct Args {
    /// Compressed input file (Ogg Vorbis, FLAC, MP3, ...)
    input: PathBuf,

    /// WAV file to write
    #[arg(short, long, default_value = "out.wav")]
    output: PathBuf,

    /// Configuration file (overrides STREAMLOOP_CONFIG and the default location)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds of audio to render
    #[arg(short, long)]
    seconds: Option<f64>,

    /// Frames per mix call
    #[arg(long)]
    block_frames: Option<usize>,

    /// Start position in seconds
    #[arg(long, default_value_t = 0.0)]
    start: f64,

    /// Force looping on
    #[arg(long = "loop", conflicts_with = "no_loop")]
    looping: bool,

    /// Force looping off
    #[arg(long)]
    no_loop: bool,

    /// Loop start in seconds
    #[arg(long)]
    loop_begin: Option<f64>,

    /// Loop end in seconds
    #[arg(long)]
    loop_end: Option<f64>,
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let mut config =
        PlayerConfig::load(args.config.as_deref()).context("Failed to load configuration")?;
    apply_overrides(&args, &mut config);
    config.validate().context("Invalid configuration")?;

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.as_str().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    render(&args, &config)
}

/// Layer command-line values over the loaded configuration
fn apply_overrides(args: &Args, config: &mut PlayerConfig) {
    if let Some(seconds) = args.seconds {
        config.render.seconds = seconds;
    }
    if let Some(block_frames) = args.block_frames {
        config.render.block_frames = block_frames;
    }
    if args.looping {
        config.loop_overrides.enabled = Some(true);
    }
    if args.no_loop {
        config.loop_overrides.enabled = Some(false);
    }
    if args.loop_begin.is_some() {
        config.loop_overrides.begin = args.loop_begin;
    }
    if args.loop_end.is_some() {
        config.loop_overrides.end = args.loop_end;
    }
}

fn render(args: &Args, config: &PlayerConfig) -> Result<()> {
    let data = std::fs::read(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;

    let mut stream: StreamDescriptor =
        StreamDescriptor::new(Arc::new(HeapAllocator)).with_probe_limits(config.probe);
    stream
        .set_payload(&data)
        .with_context(|| format!("Failed to ingest {}", args.input.display()))?;

    let settings = config.loop_overrides.apply_to(stream.loop_settings());
    stream.apply_loop_settings(&settings);

    info!(
        "Loop {} [{:.3}s - {:.3}s] of {:.3}s",
        if stream.has_loop() { "on" } else { "off" },
        stream.get_loop_begin(),
        stream.get_loop_end(),
        stream.get_length_seconds()
    );

    let stream = Arc::new(stream);
    let mut cursor = stream
        .create_playback()
        .context("Failed to create playback cursor")?;
    cursor.start(args.start);

    let spec = hound::WavSpec {
        channels: 2,
        sample_rate: stream.sample_rate(),
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut writer = hound::WavWriter::create(&args.output, spec)
        .with_context(|| format!("Failed to create {}", args.output.display()))?;

    let total_frames = seconds_to_frames(config.render.seconds, stream.sample_rate());
    let mut block = vec![AudioFrame::zero(); config.render.block_frames];
    let mut rendered: u64 = 0;

    while rendered < total_frames && cursor.is_active() {
        let count = (total_frames - rendered).min(block.len() as u64) as usize;
        cursor.mix(&mut block[..count]);

        for frame in &block[..count] {
            writer.write_sample(frame.left)?;
            writer.write_sample(frame.right)?;
        }
        rendered += count as u64;
    }

    writer.finalize().context("Failed to finalize WAV output")?;

    if rendered < total_frames {
        warn!(
            "Stream ended after {:.3}s of the requested {:.3}s",
            frames_to_seconds(rendered, stream.sample_rate()),
            config.render.seconds
        );
    }

    info!(
        "Rendered {} frames to {} ({} loops, final position {:.3}s)",
        rendered,
        args.output.display(),
        cursor.get_loop_count(),
        cursor.get_playback_position()
    );
    Ok(())
}
