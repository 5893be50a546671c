//! 32.32 fixed-point helpers for playback cursors and tick timing
//!
//! Everything that moves through a sample or counts frames towards a tick
//! boundary is kept in integer/fraction pairs. Floating point would drift
//! across long loops, and the loop seam must land on the same source sample
//! every time.

/// Number of fractional bits in every fixed-point value
pub const FRAC_BITS: u32 = 32;

/// Per-frame cursor movement: whole samples plus a 32-bit fraction
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Advance {
    /// Whole source samples per output frame
    pub int: u32,
    /// Fractional part, in units of 1/2^32 sample
    pub frac: u32,
}

impl Advance {
    /// No movement at all
    pub const ZERO: Self = Self { int: 0, frac: 0 };

    /// Exactly one source sample per output frame
    pub const ONE: Self = Self { int: 1, frac: 0 };

    pub const fn new(int: u32, frac: u32) -> Self {
        Self { int, frac }
    }

    /// Advance for a source played at `source_rate` Hz into a `mix_rate` Hz output
    pub fn from_rates(source_rate: u32, mix_rate: u32) -> Self {
        if mix_rate == 0 {
            return Self::ZERO;
        }
        let int = source_rate / mix_rate;
        let rem = (source_rate % mix_rate) as u64;
        let frac = ((rem << FRAC_BITS) / mix_rate as u64) as u32;
        Self { int, frac }
    }

    /// Rebuild from a packed 32.32 value
    #[inline]
    pub const fn from_raw(raw: u64) -> Self {
        Self {
            int: (raw >> FRAC_BITS) as u32,
            frac: raw as u32,
        }
    }

    /// Packed 32.32 value
    #[inline]
    pub const fn raw(self) -> u64 {
        ((self.int as u64) << FRAC_BITS) | self.frac as u64
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.int == 0 && self.frac == 0
    }
}

/// Playback cursor: signed whole-sample offset plus an accumulating fraction
///
/// The fraction always counts up. Going forward the real position is
/// `offset + fraction / 2^32`; going backward it is `offset - fraction / 2^32`.
/// In both directions the sample read for a frame is `source[offset]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub offset: i64,
    pub fraction: u32,
}

impl Cursor {
    pub const fn new(offset: i64) -> Self {
        Self {
            offset,
            fraction: 0,
        }
    }

    /// Move one frame forward, returning the number of whole samples crossed
    #[inline]
    pub fn step_forward(&mut self, advance: Advance) -> u64 {
        let crossed = self.accumulate(advance);
        self.offset += crossed as i64;
        crossed
    }

    /// Move one frame backward, returning the number of whole samples crossed
    #[inline]
    pub fn step_backward(&mut self, advance: Advance) -> u64 {
        let crossed = self.accumulate(advance);
        self.offset -= crossed as i64;
        crossed
    }

    #[inline]
    fn accumulate(&mut self, advance: Advance) -> u64 {
        let (fraction, carry) = self.fraction.overflowing_add(advance.frac);
        self.fraction = fraction;
        advance.int as u64 + carry as u64
    }

    /// Move `frames` frames in one step.
    ///
    /// Produces exactly the cursor that `frames` calls to `step_forward` or
    /// `step_backward` would, without the loop.
    pub fn skip(&mut self, advance: Advance, frames: usize, backward: bool) {
        let total = self.fraction as u128 + advance.raw() as u128 * frames as u128;
        self.fraction = total as u32;
        let whole = (total >> FRAC_BITS) as i64;
        if backward {
            self.offset -= whole;
        } else {
            self.offset += whole;
        }
    }
}

/// Number of frames that can be produced before the cursor reaches `end`.
///
/// Going forward a frame is valid while `offset < end`; going backward while
/// `offset > end`. Returns `Some(0)` when the cursor already sits on or past
/// the boundary and `None` when the advance is zero (the boundary is never
/// reached).
pub fn frames_until(cursor: Cursor, end: i64, backward: bool, advance: Advance) -> Option<u64> {
    let distance = if backward {
        cursor.offset - end
    } else {
        end - cursor.offset
    };
    if distance <= 0 {
        return Some(0);
    }
    if advance.is_zero() {
        return None;
    }
    let span = ((distance as u128) << FRAC_BITS) - cursor.fraction as u128;
    let frames = span.div_ceil(advance.raw() as u128);
    Some(u64::try_from(frames).unwrap_or(u64::MAX))
}

/// Frames per sequencer tick for a tempo, as a 32.32 value
///
/// Tracker timing: `frames_per_tick = mix_rate * 2.5 / bpm`. A tempo of zero
/// falls back to one tick per second.
pub fn frames_per_tick(bpm: u16, mix_rate: u32) -> Advance {
    if bpm == 0 {
        return Advance::new(mix_rate, 0);
    }
    let raw = ((mix_rate as u128 * 5) << FRAC_BITS) / (bpm as u128 * 2);
    Advance::from_raw(raw.min(u64::MAX as u128) as u64)
}

/// Countdown to the next sequencer tick with exact fractional carry
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickClock {
    /// Length of one tick in frames (`pass_len` / `pass_len_frac`)
    pub pass_len: Advance,
    /// Whole frames left before the next tick fires
    pub remaining: u64,
    /// Fractional frames carried between ticks
    pub carry: u32,
}

impl TickClock {
    pub fn new(pass_len: Advance) -> Self {
        Self {
            pass_len,
            remaining: 0,
            carry: 0,
        }
    }

    /// Start the next tick period, folding the fractional carry in
    pub fn recharge(&mut self) {
        let (carry, overflow) = self.carry.overflowing_add(self.pass_len.frac);
        self.carry = carry;
        // A sub-frame tick length would never let the countdown move
        self.remaining = (self.pass_len.int as u64 + overflow as u64).max(1);
    }

    /// Consume `frames` from the current period
    #[inline]
    pub fn consume(&mut self, frames: u64) {
        self.remaining = self.remaining.saturating_sub(frames);
    }

    #[inline]
    pub fn due(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_from_rates() {
        assert_eq!(Advance::from_rates(44100, 44100), Advance::ONE);
        assert_eq!(Advance::from_rates(88200, 44100), Advance::new(2, 0));
        assert_eq!(Advance::from_rates(22050, 44100), Advance::new(0, 1 << 31));
        assert_eq!(Advance::from_rates(1000, 0), Advance::ZERO);
    }

    #[test]
    fn test_integer_advance_has_no_residue() {
        let advance = Advance::new(3, 0);
        let mut forward = Cursor::new(10);
        let mut backward = Cursor::new(1000);
        for _ in 0..100 {
            forward.step_forward(advance);
            backward.step_backward(advance);
        }
        assert_eq!(forward, Cursor::new(310));
        assert_eq!(backward, Cursor::new(700));
    }

    #[test]
    fn test_fractional_carry_does_not_drift() {
        // 1.3 samples per frame
        let advance = Advance::from_raw((13u64 << FRAC_BITS) / 10);
        let mut cursor = Cursor::new(0);
        let frames = 10_000u64;
        for _ in 0..frames {
            cursor.step_forward(advance);
        }
        let exact = advance.raw() as u128 * frames as u128;
        let got = ((cursor.offset as u128) << FRAC_BITS) + cursor.fraction as u128;
        assert_eq!(got, exact);
        // And within one truncation step of the real-valued 13000
        assert!((cursor.offset - 13_000).abs() <= 1);
    }

    #[test]
    fn test_skip_matches_stepping() {
        let advance = Advance::new(1, 0x9E37_79B9);
        for backward in [false, true] {
            let mut stepped = Cursor {
                offset: 5000,
                fraction: 0x1234_5678,
            };
            let mut skipped = stepped;
            for _ in 0..777 {
                if backward {
                    stepped.step_backward(advance);
                } else {
                    stepped.step_forward(advance);
                }
            }
            skipped.skip(advance, 777, backward);
            assert_eq!(stepped, skipped);
        }
    }

    #[test]
    fn test_frames_until_exact_boundary() {
        // 10 samples away at exactly 1 sample/frame: frames 0..9 are valid
        assert_eq!(frames_until(Cursor::new(0), 10, false, Advance::ONE), Some(10));
        // Half-speed needs twice as many frames
        let half = Advance::new(0, 1 << 31);
        assert_eq!(frames_until(Cursor::new(0), 10, false, half), Some(20));
        // Already at the boundary
        assert_eq!(frames_until(Cursor::new(10), 10, false, Advance::ONE), Some(0));
        // Backward towards -1 from offset 4 covers 4,3,2,1,0
        assert_eq!(frames_until(Cursor::new(4), -1, true, Advance::ONE), Some(5));
        assert_eq!(frames_until(Cursor::new(0), 10, false, Advance::ZERO), None);
    }

    #[test]
    fn test_frames_until_respects_fraction() {
        // At 9.75 with 0.5/frame only the first frame is below 10
        let cursor = Cursor {
            offset: 9,
            fraction: 3 << 30,
        };
        let half = Advance::new(0, 1 << 31);
        assert_eq!(frames_until(cursor, 10, false, half), Some(1));

        // Verify against stepping for an awkward rate
        let advance = Advance::new(0, 0x6666_6666);
        let start = Cursor {
            offset: 3,
            fraction: 0x8000_0001,
        };
        let predicted = frames_until(start, 50, false, advance).unwrap();
        let mut cursor = start;
        let mut counted = 0;
        while cursor.offset < 50 {
            cursor.step_forward(advance);
            counted += 1;
        }
        assert_eq!(predicted, counted);
    }

    #[test]
    fn test_frames_per_tick() {
        // 44100 * 2.5 / 125 = 882 exactly
        assert_eq!(frames_per_tick(125, 44100), Advance::new(882, 0));
        // 44100 * 2.5 / 120 = 918.75
        assert_eq!(frames_per_tick(120, 44100), Advance::new(918, 3 << 30));
        assert_eq!(frames_per_tick(0, 22050), Advance::new(22050, 0));
    }

    #[test]
    fn test_tick_clock_carry() {
        let mut clock = TickClock::new(Advance::new(918, 3 << 30));
        let mut total = 0;
        for _ in 0..4 {
            clock.recharge();
            total += clock.remaining;
        }
        // Four ticks of 918.75 frames
        assert_eq!(total, 3675);
        assert_eq!(clock.carry, 0);
    }
}
