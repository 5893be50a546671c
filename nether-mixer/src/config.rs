//! Mixer configuration
//!
//! Settings can come from a TOML table (for example a `[mixer]` section of a
//! host config file) and be overlaid with a free-text options string of
//! `key=value` pairs:
//!
//! ```text
//! buffer=2048 real16bit=enabled interpolation=2
//! ```
//!
//! Unrecognised keys and unparsable values keep their current value.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::MixerError;

/// Unity amplify: one full-volume channel reaches 24-bit full scale
pub const AMPLIFY_UNITY: u32 = 256;

/// Resampling quality policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// Read `source[floor(cursor)]`
    #[default]
    Off,
    /// Floor sampling when upsampling, box-average of every consumed sample
    /// when the advance is one sample per frame or more
    Nearest,
    /// Linear interpolation between neighbours when upsampling, box-average
    /// when decimating
    Linear,
}

impl Interpolation {
    /// Numeric level used by the options string (0, 1, 2)
    pub fn from_level(level: u8) -> Option<Self> {
        match level {
            0 => Some(Self::Off),
            1 => Some(Self::Nearest),
            2 => Some(Self::Linear),
            _ => None,
        }
    }

    pub fn level(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::Nearest => 1,
            Self::Linear => 2,
        }
    }

    fn parse_option(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "enabled" | "on" => Some(Self::Nearest),
            "false" | "disabled" | "off" => Some(Self::Off),
            other => other.parse::<u8>().ok().and_then(Self::from_level),
        }
    }
}

/// Engine configuration consumed at construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerConfig {
    /// Output rate in Hz (default: 44100)
    #[serde(default = "default_mix_rate")]
    pub mix_rate: u32,
    /// Interleaved output channels (default: 2, 1 = mono)
    #[serde(default = "default_channels_out")]
    pub channels_out: usize,
    /// Number of input (sample) channels (default: 8)
    #[serde(default = "default_channels_in")]
    pub channels_in: usize,
    /// Output buffer capacity in frames (default: 1024)
    #[serde(default = "default_buffer_frames")]
    pub buffer_frames: usize,
    /// Master boost, 256 = unity (default: 256)
    #[serde(default = "default_amplify")]
    pub amplify: u32,
    /// Master left volume 0-255 (default: 255)
    #[serde(default = "default_master")]
    pub master_left: u8,
    /// Master right volume 0-255 (default: 255)
    #[serde(default = "default_master")]
    pub master_right: u8,
    /// Mix sources wider than 8 bits at native precision (default: false)
    #[serde(default)]
    pub real_16bit: bool,
    /// Resampling policy (default: off)
    #[serde(default)]
    pub interpolation: Interpolation,
}

fn default_mix_rate() -> u32 {
    44100
}
fn default_channels_out() -> usize {
    2
}
fn default_channels_in() -> usize {
    8
}
fn default_buffer_frames() -> usize {
    1024
}
fn default_amplify() -> u32 {
    AMPLIFY_UNITY
}
fn default_master() -> u8 {
    255
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            mix_rate: default_mix_rate(),
            channels_out: default_channels_out(),
            channels_in: default_channels_in(),
            buffer_frames: default_buffer_frames(),
            amplify: default_amplify(),
            master_left: default_master(),
            master_right: default_master(),
            real_16bit: false,
            interpolation: Interpolation::default(),
        }
    }
}

impl MixerConfig {
    /// Parse a TOML document; missing keys take their defaults
    pub fn from_toml_str(text: &str) -> Result<Self, MixerError> {
        Ok(toml::from_str(text)?)
    }

    /// Load a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, MixerError> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Builder-style overlay of an options string
    pub fn with_options(mut self, options: &str) -> Self {
        self.apply_options(options);
        self
    }

    /// Overlay `buffer=`, `real16bit=` and `interpolation=` from a free-text
    /// options string. Pairs are separated by whitespace, commas or semicolons.
    pub fn apply_options(&mut self, options: &str) {
        let pairs = options
            .split(|c: char| c.is_whitespace() || c == ',' || c == ';')
            .filter(|s| !s.is_empty());

        for pair in pairs {
            let Some((key, value)) = pair.split_once('=') else {
                warn!(option = pair, "mixer option without value ignored");
                continue;
            };
            let key = key.trim().to_ascii_lowercase();
            let value = value.trim();
            match key.as_str() {
                "buffer" => match value.parse::<usize>() {
                    Ok(frames) if frames > 0 => self.buffer_frames = frames,
                    _ => warn!(value, "invalid buffer size option ignored"),
                },
                "real16bit" => match parse_switch(value) {
                    Some(on) => self.real_16bit = on,
                    None => warn!(value, "invalid real16bit option ignored"),
                },
                "interpolation" => match Interpolation::parse_option(value) {
                    Some(mode) => self.interpolation = mode,
                    None => warn!(value, "invalid interpolation option ignored"),
                },
                _ => warn!(key = key.as_str(), "unknown mixer option ignored"),
            }
        }
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> Result<(), MixerError> {
        if self.mix_rate == 0 {
            return Err(MixerError::InvalidConfig("mix rate must be non-zero"));
        }
        if self.channels_out == 0 {
            return Err(MixerError::InvalidConfig("at least one output channel required"));
        }
        if self.channels_in == 0 {
            return Err(MixerError::InvalidConfig("at least one input channel required"));
        }
        if self.buffer_frames == 0 {
            return Err(MixerError::InvalidConfig("buffer capacity must be non-zero"));
        }
        Ok(())
    }
}

fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "enabled" | "on" => Some(true),
        "0" | "false" | "disabled" | "off" => Some(false),
        _ => None,
    }
}
