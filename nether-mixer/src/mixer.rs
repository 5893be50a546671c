//! Mixer engine
//!
//! Owns the output accumulator, the channel array, the volume LUT and the
//! tick clock. All mutation happens on the mixing thread: the sequencer runs
//! inside [`Mixer::mix`] through a [`TickHandler`] and changes channels
//! between sub-spans.

mod driver;


pub use driver::{NoSequencer, TickHandler};

use tracing::{debug, warn};

use crate::channel::{ChannelFlags, ChannelParams, ChannelSegment, ChannelState};
use crate::config::{Interpolation, MixerConfig};
use crate::error::MixerError;
use crate::fixed::{Advance, TickClock, frames_per_tick};
use crate::lut::VolumeLut;
use crate::select::Globals;

/// Tempo used until the sequencer sets one
pub const DEFAULT_BPM: u16 = 125;

/// Fixed-point software mixer
#[derive(Debug)]
pub struct Mixer {
    mix_rate: u32,
    channels_out: usize,
    /// Output capacity in frames
    capacity: usize,
    buffer: Vec<i32>,
    channels: Vec<ChannelState>,
    amplify: u32,
    master_left: u8,
    master_right: u8,
    interpolation: Interpolation,
    real_16bit: bool,
    frozen: bool,
    lut: VolumeLut,
    clock: TickClock,
    /// Tempo the tick length was derived from, if any
    bpm: Option<u16>,
}

impl Mixer {
    pub fn new(config: MixerConfig) -> Result<Self, MixerError> {
        config.validate()?;

        let buffer = alloc_buffer(config.buffer_frames, config.channels_out)?;
        let channels = alloc_channels(config.channels_in)?;
        let mut lut = VolumeLut::new()?;
        lut.rebuild(config.channels_in, config.amplify);

        debug!(
            mix_rate = config.mix_rate,
            channels_out = config.channels_out,
            channels_in = config.channels_in,
            buffer_frames = config.buffer_frames,
            real_16bit = config.real_16bit,
            interpolation = ?config.interpolation,
            "mixer created"
        );

        Ok(Self {
            mix_rate: config.mix_rate,
            channels_out: config.channels_out,
            capacity: config.buffer_frames,
            buffer,
            channels,
            amplify: config.amplify,
            master_left: config.master_left,
            master_right: config.master_right,
            interpolation: config.interpolation,
            real_16bit: config.real_16bit,
            frozen: false,
            lut,
            clock: TickClock::new(frames_per_tick(DEFAULT_BPM, config.mix_rate)),
            bpm: Some(DEFAULT_BPM),
        })
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn mix_rate(&self) -> u32 {
        self.mix_rate
    }

    pub fn channels_out(&self) -> usize {
        self.channels_out
    }

    pub fn channels_in(&self) -> usize {
        self.channels.len()
    }

    /// Output buffer capacity in frames
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn amplify(&self) -> u32 {
        self.amplify
    }

    pub fn master_volume(&self) -> (u8, u8) {
        (self.master_left, self.master_right)
    }

    pub fn interpolation(&self) -> Interpolation {
        self.interpolation
    }

    pub fn real_16bit(&self) -> bool {
        self.real_16bit
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Frames per tick as a 32.32 value
    pub fn tick_length(&self) -> Advance {
        self.clock.pass_len
    }

    pub fn bpm(&self) -> Option<u16> {
        self.bpm
    }

    pub fn lut(&self) -> &VolumeLut {
        &self.lut
    }

    /// Live state of one channel
    pub fn channel_state(&self, index: usize) -> Option<&ChannelState> {
        self.channels.get(index)
    }

    fn globals(&self) -> Globals {
        Globals {
            channels_out: self.channels_out,
            channels_in: self.channels.len(),
            master_left: self.master_left,
            master_right: self.master_right,
            amplify: self.amplify,
            real_16bit: self.real_16bit,
        }
    }

    fn reselect_all(&mut self) {
        let globals = self.globals();
        for state in &mut self.channels {
            for segment in state.segments_mut() {
                segment.reselect(&globals);
            }
        }
    }

    // =========================================================================
    // Reconfiguration
    // =========================================================================

    /// Change the output rate; playback rates and tempo keep their meaning
    pub fn set_mix_rate(&mut self, mix_rate: u32) -> Result<(), MixerError> {
        if mix_rate == 0 {
            return Err(MixerError::InvalidConfig("mix rate must be non-zero"));
        }
        self.mix_rate = mix_rate;
        for state in &mut self.channels {
            for segment in state.segments_mut() {
                segment.set_rate(segment.rate, mix_rate);
            }
        }
        if let Some(bpm) = self.bpm {
            self.clock.pass_len = frames_per_tick(bpm, mix_rate);
        }
        debug!(mix_rate, "mix rate changed");
        Ok(())
    }

    /// Resize the channel array, keeping the state of surviving channels
    pub fn set_channel_count(&mut self, count: usize) -> Result<(), MixerError> {
        if count == 0 {
            return Err(MixerError::InvalidConfig("at least one input channel required"));
        }
        if count > self.channels.len() {
            let extra = count - self.channels.len();
            self.channels.try_reserve_exact(extra).map_err(|_| {
                allocation_failed(
                    "channel array",
                    count.saturating_mul(size_of::<ChannelState>()),
                )
            })?;
        }
        self.channels.resize_with(count, ChannelState::default);
        self.lut.rebuild(count, self.amplify);
        self.reselect_all();
        debug!(channels_in = count, "channel count changed");
        Ok(())
    }

    /// Change the output channel count and frame capacity.
    ///
    /// On allocation failure the previous buffer stays in place.
    pub fn set_output(&mut self, channels_out: usize, frames: usize) -> Result<(), MixerError> {
        if channels_out == 0 {
            return Err(MixerError::InvalidConfig("at least one output channel required"));
        }
        if frames == 0 {
            return Err(MixerError::InvalidConfig("buffer capacity must be non-zero"));
        }
        self.buffer = alloc_buffer(frames, channels_out)?;
        self.capacity = frames;
        if channels_out != self.channels_out {
            self.channels_out = channels_out;
            self.reselect_all();
        }
        debug!(channels_out, frames, "output reconfigured");
        Ok(())
    }

    pub fn set_amplify(&mut self, amplify: u32) {
        self.amplify = amplify;
        self.lut.rebuild(self.channels.len(), amplify);
        self.reselect_all();
    }

    pub fn set_master_volume(&mut self, left: u8, right: u8) {
        self.master_left = left;
        self.master_right = right;
        self.reselect_all();
    }

    pub fn set_interpolation(&mut self, interpolation: Interpolation) {
        self.interpolation = interpolation;
    }

    pub fn set_real_16bit(&mut self, enabled: bool) {
        self.real_16bit = enabled;
        self.reselect_all();
    }

    /// Stop producing sound; channel state is left untouched
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    /// Derive the tick length from a tracker tempo
    pub fn set_tempo(&mut self, bpm: u16) {
        self.bpm = Some(bpm);
        self.clock.pass_len = frames_per_tick(bpm, self.mix_rate);
    }

    /// Set the tick length directly, in whole and fractional frames
    pub fn set_tick_length(&mut self, frames: u32, fraction: u32) {
        self.bpm = None;
        self.clock.pass_len = Advance::new(frames, fraction);
    }

    // =========================================================================
    // Channels
    // =========================================================================

    fn state_mut(&mut self, index: usize) -> Result<&mut ChannelState, MixerError> {
        let count = self.channels.len();
        self.channels
            .get_mut(index)
            .ok_or(MixerError::InvalidChannel { index, count })
    }

    fn build_segment(&self, params: &ChannelParams) -> Result<ChannelSegment, MixerError> {
        let mut segment = ChannelSegment::new(params, self.mix_rate)?;
        segment.reselect(&self.globals());
        Ok(segment)
    }

    /// Start a new segment immediately, dropping any queued swap
    pub fn set_channel(&mut self, index: usize, params: &ChannelParams) -> Result<(), MixerError> {
        let segment = self.build_segment(params)?;
        let state = self.state_mut(index)?;
        state.current = Some(segment);
        state.next = None;
        Ok(())
    }

    /// Queue a segment to replace the current one at its next boundary.
    ///
    /// A channel that is not playing starts the segment right away.
    pub fn queue_channel(&mut self, index: usize, params: &ChannelParams) -> Result<(), MixerError> {
        let mut segment = self.build_segment(params)?;
        segment.flags.insert(ChannelFlags::SYNTH);
        let state = self.state_mut(index)?;
        if state.is_playing() {
            state.next = Some(segment);
        } else {
            state.current = Some(segment);
            state.next = None;
        }
        Ok(())
    }

    /// Parameters of the current segment, with the live cursor position
    pub fn channel(&self, index: usize) -> Result<ChannelParams, MixerError> {
        let state = self.channels.get(index).ok_or(MixerError::InvalidChannel {
            index,
            count: self.channels.len(),
        })?;
        Ok(state
            .current
            .as_ref()
            .map(ChannelSegment::params)
            .unwrap_or_default())
    }

    pub fn is_playing(&self, index: usize) -> bool {
        self.channels.get(index).is_some_and(ChannelState::is_playing)
    }

    /// Apply `f` to the current segment and reselect its kernels
    fn update_current(
        &mut self,
        index: usize,
        f: impl FnOnce(&mut ChannelSegment) -> Result<(), MixerError>,
    ) -> Result<(), MixerError> {
        let globals = self.globals();
        let state = self.state_mut(index)?;
        if let Some(segment) = state.current.as_mut() {
            f(segment)?;
            segment.reselect(&globals);
        }
        Ok(())
    }

    pub fn set_volume(&mut self, index: usize, volume: u8) -> Result<(), MixerError> {
        self.update_current(index, |segment| {
            segment.volume = volume;
            Ok(())
        })
    }

    pub fn set_panning(&mut self, index: usize, panning: u8) -> Result<(), MixerError> {
        self.update_current(index, |segment| {
            segment.panning = panning;
            Ok(())
        })
    }

    pub fn set_rate(&mut self, index: usize, rate: u32) -> Result<(), MixerError> {
        let mix_rate = self.mix_rate;
        self.update_current(index, |segment| {
            if rate == 0 && segment.is_playing() {
                return Err(MixerError::InvalidParams("playing channel needs a non-zero rate"));
            }
            segment.set_rate(rate, mix_rate);
            Ok(())
        })
    }

    pub fn set_mute(&mut self, index: usize, muted: bool) -> Result<(), MixerError> {
        self.update_current(index, |segment| {
            segment.flags.set(ChannelFlags::MUTED, muted);
            Ok(())
        })
    }

    pub fn set_surround(&mut self, index: usize, surround: bool) -> Result<(), MixerError> {
        self.update_current(index, |segment| {
            segment.flags.set(ChannelFlags::SURROUND, surround);
            Ok(())
        })
    }

    /// Stop a channel and drop its queued swap
    pub fn stop_channel(&mut self, index: usize) -> Result<(), MixerError> {
        let state = self.state_mut(index)?;
        if let Some(segment) = state.current.as_mut() {
            segment.flags.remove(ChannelFlags::PLAYING);
        }
        state.next = None;
        Ok(())
    }

    /// Stop every channel
    pub fn stop_all(&mut self) {
        for state in &mut self.channels {
            *state = ChannelState::default();
        }
    }
}

fn allocation_failed(what: &'static str, bytes: usize) -> MixerError {
    let error = MixerError::Allocation { what, bytes };
    warn!(%error, "mixer allocation failed");
    error
}

fn alloc_buffer(frames: usize, channels_out: usize) -> Result<Vec<i32>, MixerError> {
    let len = frames
        .checked_mul(channels_out)
        .ok_or_else(|| allocation_failed("output buffer", usize::MAX))?;
    let mut buffer = Vec::new();
    buffer
        .try_reserve_exact(len)
        .map_err(|_| allocation_failed("output buffer", len.saturating_mul(size_of::<i32>())))?;
    buffer.resize(len, 0);
    Ok(buffer)
}

fn alloc_channels(count: usize) -> Result<Vec<ChannelState>, MixerError> {
    let mut channels = Vec::new();
    channels.try_reserve_exact(count).map_err(|_| {
        allocation_failed(
            "channel array",
            count.saturating_mul(size_of::<ChannelState>()),
        )
    })?;
    channels.resize_with(count, ChannelState::default);
    Ok(channels)
}
