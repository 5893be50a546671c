//! Synthesised sample bank for the demo song

use std::f32::consts::PI;

use anyhow::Result;
use nether_mixer::SampleData;

/// Samples per waveform period for the pitched instruments
pub const SQUARE_PERIOD: u32 = 32;
pub const SINE_PERIOD: u32 = 64;
pub const SAW_PERIOD: u32 = 128;

/// Packed noise depth
pub const NOISE_BITS: u8 = 12;

/// One instance of every source format the mixer supports
pub struct Bank {
    /// 8-bit square, one period
    pub square: SampleData,
    /// 16-bit sine, one period
    pub sine: SampleData,
    /// 32-bit saw, one period
    pub saw: SampleData,
    /// 12-bit packed noise burst with a decaying envelope
    pub noise: SampleData,
}

impl Bank {
    pub fn new() -> Result<Self> {
        let square: Vec<i8> = (0..SQUARE_PERIOD)
            .map(|i| if i < SQUARE_PERIOD / 2 { 96 } else { -96 })
            .collect();

        let sine: Vec<i16> = (0..SINE_PERIOD)
            .map(|i| {
                let phase = 2.0 * PI * i as f32 / SINE_PERIOD as f32;
                (phase.sin() * 24000.0) as i16
            })
            .collect();

        // Full-scale 32-bit values; the LUT path keeps only the top 8 bits
        // unless real 16-bit mixing is enabled
        let saw: Vec<i32> = (0..SAW_PERIOD)
            .map(|i| {
                let ramp = i as i64 * 2 * i32::MAX as i64 / SAW_PERIOD as i64 - i32::MAX as i64;
                (ramp * 3 / 4) as i32
            })
            .collect();

        Ok(Self {
            square: square.into(),
            sine: sine.into(),
            saw: saw.into(),
            noise: noise_burst(4000)?,
        })
    }
}

/// Linear-congruential white noise with a linear fade, packed to 12 bits
fn noise_burst(len: usize) -> Result<SampleData> {
    let max = (1i32 << (NOISE_BITS - 1)) - 1;
    let mut state: u32 = 0x1234_5678;
    let values: Vec<i32> = (0..len)
        .map(|i| {
            state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
            let white = (state >> 16) as i32 % (max + 1);
            let white = if state & 1 == 0 { white } else { -white };
            white * (len - i) as i32 / len as i32
        })
        .collect();
    Ok(SampleData::pack(NOISE_BITS, &values)?)
}

/// Playback rate that sounds MIDI note `note` from a single-period sample
pub fn note_rate(note: u8, period: u32) -> u32 {
    let freq = 440.0 * 2f64.powf((note as f64 - 69.0) / 12.0);
    (freq * period as f64).round().max(1.0) as u32
}
