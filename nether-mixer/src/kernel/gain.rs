//! Gain strategies: how a raw source value becomes an output contribution

use crate::lut::{LutRow, VolumeLut};
use crate::prepare::Scaling;

/// Scales one source value for one output side
pub trait Gain: 'static {
    /// Per-side coefficient, resolved once per run
    type Coef<'a>: Copy;

    /// Left and right coefficients for a prepared channel
    fn coefs<'a>(scaling: &Scaling, lut: &'a VolumeLut) -> (Self::Coef<'a>, Self::Coef<'a>);

    fn apply(coef: Self::Coef<'_>, sample: i32) -> i32;
}

/// Table lookup for sources narrowed to 8 bits
pub struct LutGain;

impl Gain for LutGain {
    type Coef<'a> = &'a LutRow;

    #[inline]
    fn coefs<'a>(scaling: &Scaling, lut: &'a VolumeLut) -> (&'a LutRow, &'a LutRow) {
        (lut.row(scaling.lut_left), lut.row(scaling.lut_right))
    }

    #[inline]
    fn apply(row: &LutRow, sample: i32) -> i32 {
        row[sample as u8 as usize]
    }
}

/// Multiplier/divisor pair for native-precision sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MulCoef {
    pub mult: i64,
    pub div: i64,
}

/// 64-bit multiply then divide
pub struct MulGain;

impl Gain for MulGain {
    type Coef<'a> = MulCoef;

    #[inline]
    fn coefs<'a>(scaling: &Scaling, _lut: &'a VolumeLut) -> (MulCoef, MulCoef) {
        let div = scaling.divisor.max(1);
        (
            MulCoef {
                mult: scaling.mul_left,
                div,
            },
            MulCoef {
                mult: scaling.mul_right,
                div,
            },
        )
    }

    #[inline]
    fn apply(coef: MulCoef, sample: i32) -> i32 {
        (sample as i64 * coef.mult / coef.div) as i32
    }
}
