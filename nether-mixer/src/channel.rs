//! Channel parameters and playable segments
//!
//! A channel holds a `current` segment that is being mixed and an optional
//! `next` segment queued for a synth-style swap at the next loop boundary or
//! at the end of `current`.

use crate::config::Interpolation;
use crate::error::MixerError;
use crate::fixed::{Advance, Cursor, frames_until};
use crate::kernel::{Direction, KernelCtx, KernelPair, Seam};
use crate::lut::VolumeLut;
use crate::prepare::{GainInput, Scaling};
use crate::sample::SampleData;
use crate::select::{Family, Globals, Routing, select};

bitflags::bitflags! {
    /// Channel playback flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ChannelFlags: u16 {
        /// Channel is producing output
        const PLAYING = 0b0000_0001;
        /// Cursor advances but nothing is written
        const MUTED = 0b0000_0010;
        /// Loop region `[loop_start, loop_start + loop_len)` repeats
        const LOOP = 0b0000_0100;
        /// Loop reverses direction at each boundary
        const PINGPONG = 0b0000_1000;
        /// Currently playing towards the start of the sample
        const BACKWARDS = 0b0001_0000;
        /// Segment was queued as a synth swap
        const SYNTH = 0b0010_0000;
        /// Phase-inverted right side
        const SURROUND = 0b0100_0000;
    }
}

/// Channel parameter block exchanged with the sequencer
#[derive(Debug, Clone)]
pub struct ChannelParams {
    /// Sample source; `None` leaves the channel silent
    pub data: Option<SampleData>,
    /// Playable length in samples (`None` = whole source)
    pub length: Option<u32>,
    /// Start position (on read-back: the current cursor offset)
    pub position: i64,
    pub flags: ChannelFlags,
    /// 0-255
    pub volume: u8,
    /// 0 = left, 128 = center, 255 = right
    pub panning: u8,
    pub loop_start: u32,
    pub loop_len: u32,
    /// Loop repeats before playing out (0 = unlimited)
    pub repeat_limit: u32,
    /// Loop repeats already performed
    pub repeat_count: u32,
    /// Source samples per second
    pub rate: u32,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            data: None,
            length: None,
            position: 0,
            flags: ChannelFlags::empty(),
            volume: 255,
            panning: 128,
            loop_start: 0,
            loop_len: 0,
            repeat_limit: 0,
            repeat_count: 0,
            rate: 0,
        }
    }
}

impl ChannelParams {
    /// Playing, full volume, centered, one sample per frame at `rate`
    pub fn playing(data: impl Into<SampleData>, rate: u32) -> Self {
        Self {
            data: Some(data.into()),
            flags: ChannelFlags::PLAYING,
            rate,
            ..Self::default()
        }
    }

    /// Effective playable length
    pub fn effective_length(&self) -> u64 {
        let available = self.data.as_ref().map_or(0, |d| d.len() as u64);
        self.length.map_or(available, u64::from)
    }

    /// Reject parameter combinations the mixing loop cannot play safely
    pub fn validate(&self) -> Result<(), MixerError> {
        let available = self.data.as_ref().map_or(0, |d| d.len() as u64);
        if self.length.is_some_and(|length| length as u64 > available) {
            return Err(MixerError::InvalidParams("length exceeds sample data"));
        }
        if self.flags.contains(ChannelFlags::LOOP) {
            if self.loop_len == 0 {
                return Err(MixerError::InvalidParams("loop length must be non-zero"));
            }
            if self.loop_start as u64 + self.loop_len as u64 > self.effective_length() {
                return Err(MixerError::InvalidParams("loop extends past sample end"));
            }
        }
        if self.flags.contains(ChannelFlags::PLAYING) && self.rate == 0 {
            return Err(MixerError::InvalidParams("playing channel needs a non-zero rate"));
        }
        Ok(())
    }
}

/// One playable stream segment with its derived mixing state
#[derive(Debug, Clone)]
pub struct ChannelSegment {
    pub data: Option<SampleData>,
    pub length: i64,
    pub cursor: Cursor,
    pub advance: Advance,
    pub rate: u32,
    pub loop_start: i64,
    pub loop_len: i64,
    /// Boundary for the current direction: `offset` must stay below it going
    /// forward and above it going backward
    pub end: i64,
    pub repeat_limit: u32,
    pub repeat_count: u32,
    pub flags: ChannelFlags,
    pub volume: u8,
    pub panning: u8,
    pub family: Family,
    pub routing: Routing,
    pub scaling: Scaling,
    pub kernels: KernelPair,
}

impl ChannelSegment {
    /// Build a segment from validated parameters.
    ///
    /// Kernels stay on the skip pair until [`ChannelSegment::reselect`] runs.
    pub fn new(params: &ChannelParams, mix_rate: u32) -> Result<Self, MixerError> {
        params.validate()?;
        let mut segment = Self {
            data: params.data.clone(),
            length: params.effective_length() as i64,
            cursor: Cursor::new(params.position),
            advance: Advance::from_rates(params.rate, mix_rate),
            rate: params.rate,
            loop_start: params.loop_start as i64,
            loop_len: params.loop_len as i64,
            end: 0,
            repeat_limit: params.repeat_limit,
            repeat_count: params.repeat_count,
            flags: params.flags,
            volume: params.volume,
            panning: params.panning,
            family: Family::Silent,
            routing: Routing::Skip,
            scaling: Scaling::default(),
            kernels: KernelPair::SKIP,
        };
        segment.update_end();
        Ok(segment)
    }

    /// Parameter block describing this segment, with the live cursor
    pub fn params(&self) -> ChannelParams {
        ChannelParams {
            data: self.data.clone(),
            length: u32::try_from(self.length).ok(),
            position: self.cursor.offset,
            flags: self.flags,
            volume: self.volume,
            panning: self.panning,
            loop_start: self.loop_start as u32,
            loop_len: self.loop_len as u32,
            repeat_limit: self.repeat_limit,
            repeat_count: self.repeat_count,
            rate: self.rate,
        }
    }

    #[inline]
    pub fn direction(&self) -> Direction {
        if self.flags.contains(ChannelFlags::BACKWARDS) {
            Direction::Backward
        } else {
            Direction::Forward
        }
    }

    #[inline]
    pub fn loop_end(&self) -> i64 {
        self.loop_start + self.loop_len
    }

    pub fn is_playing(&self) -> bool {
        self.flags.contains(ChannelFlags::PLAYING)
    }

    /// Recompute the boundary for the current direction and loop state
    pub fn update_end(&mut self) {
        let looping = self.flags.contains(ChannelFlags::LOOP);
        self.end = match (self.direction(), looping) {
            (Direction::Forward, true) => self.loop_end(),
            (Direction::Forward, false) => self.length,
            (Direction::Backward, true) => self.loop_start - 1,
            (Direction::Backward, false) => -1,
        };
    }

    /// Frames before the cursor reaches `end`; `None` if it never will
    #[inline]
    pub fn frames_to_boundary(&self) -> Option<u64> {
        frames_until(
            self.cursor,
            self.end,
            self.direction().is_backward(),
            self.advance,
        )
    }

    /// Re-enter the loop after overrunning its boundary
    pub fn wrap(&mut self) {
        let len = self.loop_len.max(1);
        let offset = self.cursor.offset;
        self.cursor.offset = match self.direction() {
            Direction::Forward => self.loop_start + (offset - self.loop_start).rem_euclid(len),
            Direction::Backward => {
                let last = self.loop_end() - 1;
                last - (last - offset).rem_euclid(len)
            }
        };
    }

    /// Seam the cursor mirrors about when it bounces in the current direction
    pub fn pivot(&self) -> i64 {
        match self.direction() {
            Direction::Forward => self.end,
            Direction::Backward => self.end + 1,
        }
    }

    /// Mirror the cursor about the boundary it crossed and reverse direction
    pub fn reflect(&mut self) {
        self.reflect_about(self.pivot());
    }

    /// Mirror the cursor about `pivot` and reverse direction.
    ///
    /// Applying this twice with the same pivot restores the cursor, the
    /// direction and therefore the active kernel.
    pub fn reflect_about(&mut self, pivot: i64) {
        self.cursor.offset = 2 * pivot - 1 - self.cursor.offset;
        self.flags.toggle(ChannelFlags::BACKWARDS);
        self.update_end();
    }

    pub fn set_rate(&mut self, rate: u32, mix_rate: u32) {
        self.rate = rate;
        self.advance = Advance::from_rates(rate, mix_rate);
    }

    /// Re-run kernel selection and scaling preparation
    pub fn reselect(&mut self, globals: &Globals) {
        let selection = select(self, globals);
        self.family = selection.family;
        self.routing = selection.routing;
        self.kernels = selection.kernels;
        let input = GainInput {
            volume: self.volume,
            panning: self.panning,
            master_left: globals.master_left,
            master_right: globals.master_right,
            amplify: globals.amplify,
            channels_in: globals.channels_in,
            routing: selection.routing,
        };
        (selection.prepare)(&mut self.scaling, &input);
    }

    /// Readable window for interpolation in the current direction
    pub fn seam(&self) -> Seam {
        let repeating = self.flags.contains(ChannelFlags::LOOP)
            && !self.flags.contains(ChannelFlags::PINGPONG);
        match self.direction() {
            Direction::Forward => Seam {
                low: 0,
                high: self.end,
                wrap_to: repeating.then_some(self.loop_start),
            },
            Direction::Backward => Seam {
                low: self.end + 1,
                high: self.length,
                wrap_to: repeating.then(|| self.loop_end() - 1),
            },
        }
    }

    /// Run the current direction's kernel over `out`
    pub fn render(
        &mut self,
        out: &mut [i32],
        stride: usize,
        lut: &VolumeLut,
        interpolation: Interpolation,
    ) {
        let seam = self.seam();
        let kernel = self.kernels.get(self.direction());
        let ctx = KernelCtx {
            data: self.data.as_ref(),
            scaling: &self.scaling,
            lut,
            interpolation,
            seam,
        };
        kernel(&ctx, &mut self.cursor, self.advance, out, stride);
    }
}

/// Current segment plus the queued synth swap
#[derive(Debug, Clone, Default)]
pub struct ChannelState {
    pub current: Option<ChannelSegment>,
    pub next: Option<ChannelSegment>,
}

impl ChannelState {
    pub fn is_playing(&self) -> bool {
        self.current.as_ref().is_some_and(ChannelSegment::is_playing)
    }

    /// Both segments, for reselection after a global change
    pub fn segments_mut(&mut self) -> impl Iterator<Item = &mut ChannelSegment> {
        self.current.iter_mut().chain(self.next.iter_mut())
    }
}
