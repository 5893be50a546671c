//! mix-render - render the nether-mixer demo song to a WAV file
//!
//! # Usage
//!
//! ```bash
//! # Eight seconds at 44.1 kHz
//! mix-render --out demo.wav
//!
//! # Linear interpolation at native precision, faster tempo
//! mix-render --bpm 140 --options "interpolation=2 real16bit=enabled"
//!
//! # Engine settings from a TOML file
//! mix-render --config mixer.toml --seconds 30
//! ```

mod bank;
mod song;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use nether_mixer::{Mixer, MixerConfig};
use tracing::info;

use crate::bank::Bank;
use crate::song::DemoSong;

#[derive(Parser, Debug)]
#[command(name = "mix-render")]
#[command(about = "Render the nether-mixer demo song to a WAV file")]
#[command(version)]
struct Args {
    /// Output sample rate in Hz (overrides the config file)
    #[arg(short, long)]
    rate: Option<u32>,

    /// Length of the render in seconds
    #[arg(short, long, default_value_t = 8.0)]
    seconds: f32,

    /// Song tempo
    #[arg(short, long, default_value_t = nether_mixer::DEFAULT_BPM)]
    bpm: u16,

    /// Mixer options string, e.g. "buffer=2048 interpolation=1"
    #[arg(long)]
    options: Option<String>,

    /// TOML file with mixer settings
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Output WAV file
    #[arg(short, long, default_value = "mix-render.wav")]
    out: PathBuf,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = build_config(&args)?;
    let frames = render(config, args.bpm, args.seconds, &args.out)?;

    info!(frames, path = %args.out.display(), "render complete");
    Ok(())
}

fn build_config(args: &Args) -> Result<MixerConfig> {
    let mut config = match &args.config {
        Some(path) => MixerConfig::load(path)
            .with_context(|| format!("Failed to load mixer config: {}", path.display()))?,
        None => MixerConfig::default(),
    };
    if let Some(options) = &args.options {
        config.apply_options(options);
    }
    if let Some(rate) = args.rate {
        config.mix_rate = rate;
    }
    config.channels_in = config.channels_in.max(song::CHANNELS);
    Ok(config)
}

/// Render `seconds` of the demo song into a 16-bit WAV at `path`.
///
/// Returns the number of frames written.
fn render(config: MixerConfig, bpm: u16, seconds: f32, path: &Path) -> Result<u64> {
    ensure!(seconds.is_finite() && seconds > 0.0, "--seconds must be positive");

    let mut mixer = Mixer::new(config).context("Failed to create mixer")?;
    mixer.set_tempo(bpm);
    let mut song = DemoSong::new(Bank::new()?);

    let channels = mixer.channels_out();
    let spec = hound::WavSpec {
        channels: u16::try_from(channels).context("Too many output channels for WAV")?,
        sample_rate: mixer.mix_rate(),
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    let total = (mixer.mix_rate() as f64 * seconds as f64) as u64;
    info!(
        rate = spec.sample_rate,
        channels,
        bpm,
        interpolation = ?mixer.interpolation(),
        real_16bit = mixer.real_16bit(),
        "rendering {total} frames"
    );

    let mut written = 0u64;
    while written < total {
        let frames = (total - written).min(mixer.capacity() as u64) as usize;
        let block = mixer.mix(frames, &mut song)?;
        for &value in block {
            writer.write_sample(to_pcm16(value))?;
        }
        written += frames as u64;
    }
    writer.finalize()?;
    Ok(written)
}

/// Scale a 24-bit accumulator to 16-bit PCM with clipping
fn to_pcm16(value: i32) -> i16 {
    (value >> 8).clamp(i16::MIN as i32, i16::MAX as i32) as i16
}
