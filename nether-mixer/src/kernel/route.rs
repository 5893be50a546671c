//! Output routing: which interleaved slots a channel contributes to
//!
//! Every strategy accumulates with wrapping arithmetic. `frame` is one output
//! frame: a single slot in mono, `[left, right]` in stereo.

use super::Gain;

pub trait Route: 'static {
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, right: G::Coef<'_>);
}

/// Single output channel; only the left coefficient is used
pub struct Mono;
/// Independent left and right gains
pub struct Stereo;
/// Hard left
pub struct LeftOnly;
/// Hard right
pub struct RightOnly;
/// Centered with unequal master volumes
pub struct Center;
/// Centered with equal master volumes: scaled once, written twice
pub struct CenterEqual;
/// Right side phase-inverted
pub struct Surround;
/// Surround with equal master volumes: right slot gets the bitwise
/// complement of the left contribution
pub struct SurroundEqual;

#[inline]
fn add(slot: &mut i32, value: i32) {
    *slot = slot.wrapping_add(value);
}

impl Route for Mono {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, _right: G::Coef<'_>) {
        add(&mut frame[0], G::apply(left, sample));
    }
}

impl Route for Stereo {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, right: G::Coef<'_>) {
        add(&mut frame[0], G::apply(left, sample));
        add(&mut frame[1], G::apply(right, sample));
    }
}

impl Route for LeftOnly {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, _right: G::Coef<'_>) {
        add(&mut frame[0], G::apply(left, sample));
    }
}

impl Route for RightOnly {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, _left: G::Coef<'_>, right: G::Coef<'_>) {
        add(&mut frame[1], G::apply(right, sample));
    }
}

impl Route for Center {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, right: G::Coef<'_>) {
        add(&mut frame[0], G::apply(left, sample));
        add(&mut frame[1], G::apply(right, sample));
    }
}

impl Route for CenterEqual {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, _right: G::Coef<'_>) {
        let value = G::apply(left, sample);
        add(&mut frame[0], value);
        add(&mut frame[1], value);
    }
}

impl Route for Surround {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, right: G::Coef<'_>) {
        add(&mut frame[0], G::apply(left, sample));
        add(&mut frame[1], !G::apply(right, sample));
    }
}

impl Route for SurroundEqual {
    #[inline]
    fn write<G: Gain>(frame: &mut [i32], sample: i32, left: G::Coef<'_>, _right: G::Coef<'_>) {
        let value = G::apply(left, sample);
        add(&mut frame[0], value);
        add(&mut frame[1], !value);
    }
}
