//! Mixer error types

/// Errors reported by the mixer's configuration and channel APIs.
///
/// The mixing path itself never fails; everything here is raised at the
/// boundary where the host hands parameters or buffers to the engine.
#[derive(Debug, thiserror::Error)]
pub enum MixerError {
    /// Channel index outside the configured input channel count
    #[error("channel {index} out of range (engine has {count} channels)")]
    InvalidChannel { index: usize, count: usize },

    /// Channel parameters that would stall or overrun the playback cursor
    #[error("invalid channel parameters: {0}")]
    InvalidParams(&'static str),

    /// Requested more frames than the output buffer can hold
    #[error("requested {requested} frames but the output buffer holds {capacity}")]
    BufferTooSmall { requested: usize, capacity: usize },

    /// A tick handler replaced the output buffer before the request finished
    #[error("output reconfigured during mix; {frames} mixed frames discarded")]
    OutputReconfigured { frames: usize },

    /// Configuration value out of range
    #[error("invalid configuration: {0}")]
    InvalidConfig(&'static str),

    /// Reallocation of the LUT, channel array or output buffer failed
    #[error("failed to allocate {what} ({bytes} bytes)")]
    Allocation { what: &'static str, bytes: usize },

    /// TOML configuration could not be parsed
    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Configuration file could not be read
    #[error("config read error: {0}")]
    Io(#[from] std::io::Error),
}
