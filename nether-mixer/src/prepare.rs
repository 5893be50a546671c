//! Per-channel scaling constants
//!
//! A prepare routine turns channel volume, panning and the engine globals into
//! the constants one kernel family reads: two LUT row indices for the 8-bit
//! family, or a multiplier per side plus a shared divisor for the native
//! families. Both land on the same 24-bit output scale.

use crate::select::Routing;

/// Scaling constants consumed by the gain strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scaling {
    /// LUT row (volume step) for the left / mono slot
    pub lut_left: u8,
    /// LUT row for the right slot
    pub lut_right: u8,
    pub mul_left: i64,
    pub mul_right: i64,
    pub divisor: i64,
}

impl Default for Scaling {
    fn default() -> Self {
        Self {
            lut_left: 0,
            lut_right: 0,
            mul_left: 0,
            mul_right: 0,
            divisor: 1,
        }
    }
}

/// Everything a prepare routine reads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GainInput {
    pub volume: u8,
    pub panning: u8,
    pub master_left: u8,
    pub master_right: u8,
    pub amplify: u32,
    pub channels_in: usize,
    pub routing: Routing,
}

impl GainInput {
    /// `(master, pan factor)` for the left and right sides of this routing
    pub fn sides(&self) -> [(u8, u8); 2] {
        let (ml, mr) = (self.master_left, self.master_right);
        match self.routing {
            Routing::Skip => [(0, 0), (0, 0)],
            Routing::Mono => {
                let master = ((ml as u16 + mr as u16) / 2) as u8;
                [(master, 255), (master, 255)]
            }
            Routing::Stereo => [(ml, 255 - self.panning), (mr, self.panning)],
            Routing::Left => [(ml, 255), (mr, 0)],
            Routing::Right => [(ml, 0), (mr, 255)],
            Routing::Center
            | Routing::CenterEqual
            | Routing::Surround
            | Routing::SurroundEqual => [(ml, 128), (mr, 128)],
        }
    }

    /// `volume * master * pan` for one side, at most 255^3
    fn product(&self, (master, pan): (u8, u8)) -> i64 {
        self.volume as i64 * master as i64 * pan as i64
    }
}

/// Fills a [`Scaling`] for one kernel family
pub type PrepareFn = fn(&mut Scaling, &GainInput);

/// Silent family: everything zero
pub fn prepare_silent(scaling: &mut Scaling, _input: &GainInput) {
    *scaling = Scaling::default();
}

/// 8-bit family: volume step per side, `volume * master * pan / 255^2`
pub fn prepare_lut(scaling: &mut Scaling, input: &GainInput) {
    let [left, right] = input.sides();
    *scaling = Scaling {
        lut_left: (input.product(left) / 65025) as u8,
        lut_right: (input.product(right) / 65025) as u8,
        ..Scaling::default()
    };
}

/// Native 16-bit family
pub fn prepare_mul16(scaling: &mut Scaling, input: &GainInput) {
    prepare_mul(scaling, input, 16, 8);
}

/// Native 32-bit family, also used for packed depths above 8 bits
pub fn prepare_mul32(scaling: &mut Scaling, input: &GainInput) {
    prepare_mul(scaling, input, 24, 16);
}

fn prepare_mul(scaling: &mut Scaling, input: &GainInput, shift: u32, div_shift: u32) {
    let [left, right] = input.sides();
    let amplify = input.amplify as i64;
    *scaling = Scaling {
        mul_left: (input.product(left) * amplify) >> shift,
        mul_right: (input.product(right) * amplify) >> shift,
        divisor: ((input.channels_in.max(1) as i64) << div_shift).max(1),
        ..Scaling::default()
    };
}
