//! Inner mixing kernels
//!
//! A kernel renders a run of output frames for one channel: read the source
//! at the cursor, scale it, accumulate it into one or two interleaved output
//! slots, advance the cursor. Kernels never check loop or end boundaries; the
//! playback state machine sizes every run so it stays inside the current
//! segment.
//!
//! Instead of one hand-written loop per combination, a single generic body
//! ([`mix_run`]) is instantiated over four strategies:
//!
//! - **reader** ([`ReadKind`]) - 8/16/32-bit or bit-packed, optionally narrowed to 8 bits
//! - **gain** ([`Gain`]) - volume LUT row lookup or 64-bit multiply/divide
//! - **route** ([`Route`]) - mono, stereo, left, right, center, surround
//! - **direction** ([`Step`]) - forward or backward cursor movement
//!
//! The selector picks one instantiation per direction and stores the pair as
//! plain function pointers in the channel segment.

mod gain;
mod route;

#[cfg(test)]
mod tests;

pub use gain::{Gain, LutGain, MulCoef, MulGain};
pub use route::{
    Center, CenterEqual, LeftOnly, Mono, RightOnly, Route, Stereo, Surround, SurroundEqual,
};

use std::fmt;

use crate::config::Interpolation;
use crate::fixed::{Advance, Cursor};
use crate::lut::VolumeLut;
use crate::prepare::Scaling;
use crate::sample::{ReadKind, SampleData, SampleRead};

/// Playback direction of a segment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Backward,
}

impl Direction {
    #[inline]
    pub fn is_backward(self) -> bool {
        self == Self::Backward
    }

    pub fn reversed(self) -> Self {
        match self {
            Self::Forward => Self::Backward,
            Self::Backward => Self::Forward,
        }
    }
}

/// Window of source samples a kernel may read beyond the cursor sample.
///
/// Interpolation neighbours and box-filter taps are confined to
/// `[low, high)`. In a repeating loop the neighbour that falls off the far
/// edge is read from `wrap_to` (the sample the loop restarts on) instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seam {
    pub low: i64,
    pub high: i64,
    pub wrap_to: Option<i64>,
}

/// Everything a kernel needs besides the cursor and the output slice
pub struct KernelCtx<'a> {
    pub data: Option<&'a SampleData>,
    pub scaling: &'a Scaling,
    pub lut: &'a VolumeLut,
    pub interpolation: Interpolation,
    pub seam: Seam,
}

/// Renders `out.len() / stride` frames and advances the cursor past them
pub type KernelFn = fn(&KernelCtx<'_>, &mut Cursor, Advance, &mut [i32], usize);

/// Forward and backward instantiations of the same kernel
#[derive(Clone, Copy)]
pub struct KernelPair {
    pub forward: KernelFn,
    pub backward: KernelFn,
}

impl KernelPair {
    /// Silent pair: advances the cursor, touches no output
    pub const SKIP: Self = Self {
        forward: skip_run::<StepForward>,
        backward: skip_run::<StepBackward>,
    };

    /// Both directions of one reader/gain/route combination
    pub fn of<K: ReadKind, G: Gain, O: Route>() -> Self {
        Self {
            forward: mix_run::<K, G, O, StepForward>,
            backward: mix_run::<K, G, O, StepBackward>,
        }
    }

    #[inline]
    pub fn get(&self, direction: Direction) -> KernelFn {
        match direction {
            Direction::Forward => self.forward,
            Direction::Backward => self.backward,
        }
    }
}

impl Default for KernelPair {
    fn default() -> Self {
        Self::SKIP
    }
}

impl fmt::Debug for KernelPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelPair").finish_non_exhaustive()
    }
}

// =============================================================================
// Direction strategies
// =============================================================================

/// Cursor movement for one direction
pub trait Step: 'static {
    const DIRECTION: Direction;
    /// +1 going forward, -1 going backward
    const SIGN: i64;

    /// Advance one frame, returning the whole samples crossed
    fn step(cursor: &mut Cursor, advance: Advance) -> u64;
}

pub struct StepForward;
pub struct StepBackward;

impl Step for StepForward {
    const DIRECTION: Direction = Direction::Forward;
    const SIGN: i64 = 1;

    #[inline]
    fn step(cursor: &mut Cursor, advance: Advance) -> u64 {
        cursor.step_forward(advance)
    }
}

impl Step for StepBackward {
    const DIRECTION: Direction = Direction::Backward;
    const SIGN: i64 = -1;

    #[inline]
    fn step(cursor: &mut Cursor, advance: Advance) -> u64 {
        cursor.step_backward(advance)
    }
}

// =============================================================================
// Kernels
// =============================================================================

/// How a frame's source value is derived from the cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Policy {
    Floor,
    Box,
    Linear,
}

impl Policy {
    fn choose(interpolation: Interpolation, advance: Advance) -> Self {
        match interpolation {
            Interpolation::Off => Self::Floor,
            _ if advance.int >= 1 => Self::Box,
            Interpolation::Nearest => Self::Floor,
            Interpolation::Linear => Self::Linear,
        }
    }
}

/// No-op kernel: moves the cursor exactly as far as a mixing kernel would
pub fn skip_run<D: Step>(
    _ctx: &KernelCtx<'_>,
    cursor: &mut Cursor,
    advance: Advance,
    out: &mut [i32],
    stride: usize,
) {
    cursor.skip(advance, out.len() / stride, D::DIRECTION.is_backward());
}

/// Generic mixing kernel
pub fn mix_run<K: ReadKind, G: Gain, O: Route, D: Step>(
    ctx: &KernelCtx<'_>,
    cursor: &mut Cursor,
    advance: Advance,
    out: &mut [i32],
    stride: usize,
) {
    let Some(reader) = ctx.data.and_then(K::bind) else {
        skip_run::<D>(ctx, cursor, advance, out, stride);
        return;
    };
    let (left, right) = G::coefs(ctx.scaling, ctx.lut);
    let frames = out.chunks_exact_mut(stride);

    match Policy::choose(ctx.interpolation, advance) {
        Policy::Floor => {
            for frame in frames {
                let sample = reader.get(cursor.offset);
                O::write::<G>(frame, sample, left, right);
                D::step(cursor, advance);
            }
        }
        Policy::Box => {
            for frame in frames {
                let start = cursor.offset;
                let consumed = D::step(cursor, advance);
                let sample = box_average(&reader, start, consumed, D::SIGN, ctx.seam);
                O::write::<G>(frame, sample, left, right);
            }
        }
        Policy::Linear => {
            for frame in frames {
                let sample = linear(&reader, *cursor, D::SIGN, ctx.seam);
                O::write::<G>(frame, sample, left, right);
                D::step(cursor, advance);
            }
        }
    }
}

/// Mean of every source sample the cursor consumed during one frame
#[inline]
fn box_average<R: SampleRead>(reader: &R, start: i64, consumed: u64, sign: i64, seam: Seam) -> i32 {
    let mut sum = 0i64;
    let mut count = 0i64;
    let mut index = start;
    for _ in 0..consumed.max(1) {
        if index >= seam.low && index < seam.high {
            sum += reader.get(index) as i64;
            count += 1;
        }
        index += sign;
    }
    if count == 0 {
        return reader.get(start);
    }
    (sum / count) as i32
}

/// Linear interpolation towards the next sample in the direction of travel
#[inline]
fn linear<R: SampleRead>(reader: &R, cursor: Cursor, sign: i64, seam: Seam) -> i32 {
    let here = reader.get(cursor.offset);
    if cursor.fraction == 0 {
        return here;
    }
    let mut next = cursor.offset + sign;
    if next < seam.low || next >= seam.high {
        match seam.wrap_to {
            Some(restart) => next = restart,
            None => return here,
        }
    }
    let there = reader.get(next);
    let delta = there as i128 - here as i128;
    let step = (delta * cursor.fraction as i128) >> 32;
    (here as i64 + step as i64) as i32
}
