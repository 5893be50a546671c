//! Nethercore fixed-point sample mixer
//!
//! Mixes any number of independently playing sample channels into one
//! interleaved `i32` accumulator buffer. Each channel has its own rate,
//! volume, panning, loop mode and source format (8, 16, 32-bit or bit-packed
//! PCM); sources are resampled on the fly with 32.32 fixed-point cursors.
//!
//! # Architecture
//!
//! - [`lut`] - volume lookup table for 8-bit sources
//! - [`select`] - picks a kernel pair and prepare routine per channel
//! - [`prepare`] - per-channel LUT rows or multiply/divide constants
//! - [`kernel`] - generic inner loops (reader x gain x route x direction)
//! - [`playback`] - per-channel loop/ping-pong/swap state machine
//! - [`mixer`] - engine state, channel API and the tick-driven driver
//!
//! # Example
//!
//! ```
//! use nether_mixer::{ChannelParams, Mixer, MixerConfig, NoSequencer};
//!
//! let mut mixer = Mixer::new(MixerConfig::default()).unwrap();
//! let saw: Vec<i8> = (0..100).map(|i| (i * 2 - 100) as i8).collect();
//! mixer.set_channel(0, &ChannelParams::playing(saw, 22050)).unwrap();
//!
//! let out = mixer.mix(256, &mut NoSequencer).unwrap();
//! assert_eq!(out.len(), 512);
//! ```

pub mod channel;
pub mod config;
pub mod error;
pub mod fixed;
pub mod kernel;
pub mod lut;
pub mod mixer;
pub mod playback;
pub mod prepare;
pub mod sample;
pub mod select;

pub use channel::{ChannelFlags, ChannelParams, ChannelSegment, ChannelState};
pub use config::{AMPLIFY_UNITY, Interpolation, MixerConfig};
pub use error::MixerError;
pub use fixed::{Advance, Cursor};
pub use mixer::{DEFAULT_BPM, Mixer, NoSequencer, TickHandler};
pub use sample::SampleData;
