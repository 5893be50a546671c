//! Per-channel playback state machine
//!
//! Each call renders as many frames as fit before the next boundary, then
//! resolves the boundary (wrap, reflect, swap in the queued segment, play out
//! past a spent repeat limit, or stop) and repeats until the request is
//! filled or the channel stops.

use tracing::trace;

use crate::channel::{ChannelFlags, ChannelState};
use crate::config::Interpolation;
use crate::lut::VolumeLut;

/// Shared read-only inputs for one mixing pass
#[derive(Clone, Copy)]
pub struct MixEnv<'a> {
    pub lut: &'a VolumeLut,
    pub interpolation: Interpolation,
}

/// What happened at a boundary
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Crossing {
    Wrapped,
    Reflected,
    Swapped,
    /// Repeat limit spent; the loop flag was cleared
    PlayOut,
    Stopped,
}

impl ChannelState {
    /// Accumulate this channel into `out` (`out.len() / stride` frames)
    pub fn mix(&mut self, out: &mut [i32], stride: usize, env: MixEnv<'_>) {
        let total = out.len() / stride;
        let mut done = 0;

        while let Some(segment) = self.current.as_mut() {
            if !segment.is_playing() {
                break;
            }
            // At a boundary resolve it before rendering anything more
            let Some(ahead) = segment.frames_to_boundary() else {
                // Zero advance: the cursor never moves, fill what is left
                if done < total {
                    segment.render(&mut out[done * stride..], stride, env.lut, env.interpolation);
                }
                break;
            };
            if ahead == 0 {
                self.cross_boundary();
                continue;
            }
            if done == total {
                break;
            }
            let run = ahead.min((total - done) as u64) as usize;
            let span = &mut out[done * stride..(done + run) * stride];
            segment.render(span, stride, env.lut, env.interpolation);
            done += run;
        }
    }

    /// Resolve the boundary the current segment just reached
    pub fn cross_boundary(&mut self) -> Option<Crossing> {
        let segment = self.current.as_mut()?;

        if segment.flags.contains(ChannelFlags::LOOP) {
            if segment.repeat_limit != 0 && segment.repeat_count >= segment.repeat_limit {
                segment.flags.remove(ChannelFlags::LOOP);
                segment.update_end();
                trace!(repeats = segment.repeat_count, "loop repeat limit reached");
                return Some(Crossing::PlayOut);
            }
            segment.repeat_count = segment.repeat_count.saturating_add(1);

            if let Some(mut next) = self.next.take() {
                // A ping-pong bounce still turns around; the swapped-in
                // segment continues in the opposite direction
                let bounce = segment.flags.contains(ChannelFlags::PINGPONG);
                if bounce {
                    next.flags.toggle(ChannelFlags::BACKWARDS);
                    next.update_end();
                }
                self.current = Some(next);
                trace!(bounce, "queued segment swapped in at loop boundary");
                return Some(Crossing::Swapped);
            }
            if segment.flags.contains(ChannelFlags::PINGPONG) {
                segment.reflect();
                return Some(Crossing::Reflected);
            }
            segment.wrap();
            return Some(Crossing::Wrapped);
        }

        if let Some(next) = self.next.take() {
            self.current = Some(next);
            trace!("queued segment swapped in at sample end");
            return Some(Crossing::Swapped);
        }
        segment.flags.remove(ChannelFlags::PLAYING);
        trace!(offset = segment.cursor.offset, "channel stopped");
        Some(Crossing::Stopped)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::{ChannelParams, ChannelSegment};
    use crate::fixed::{Advance, Cursor};
    use crate::kernel::Direction;
    use crate::select::Globals;

    const RATE: u32 = 8000;

    fn globals() -> Globals {
        Globals {
            channels_out: 1,
            channels_in: 1,
            master_left: 255,
            master_right: 255,
            amplify: 256,
            real_16bit: false,
        }
    }

    fn state(params: ChannelParams) -> ChannelState {
        let mut segment = ChannelSegment::new(&params, RATE).unwrap();
        segment.reselect(&globals());
        ChannelState {
            current: Some(segment),
            next: None,
        }
    }

    fn run(state: &mut ChannelState, frames: usize) -> Vec<i32> {
        let mut lut = VolumeLut::new().unwrap();
        lut.rebuild(1, 256);
        let mut out = vec![0; frames];
        let env = MixEnv {
            lut: &lut,
            interpolation: Interpolation::Off,
        };
        state.mix(&mut out, 1, env);
        out
    }

    /// Source sample values back out of the 8-bit mono scale
    fn unscale(out: &[i32]) -> Vec<i32> {
        out.iter().map(|v| v / (255 * 256)).collect()
    }

    fn ramp(len: i8) -> Vec<i8> {
        (0..len).collect()
    }

    #[test]
    fn test_one_shot_stops_at_end() {
        let mut state = state(ChannelParams::playing(ramp(4), RATE));
        let out = unscale(&run(&mut state, 6));
        assert_eq!(out, [0, 1, 2, 3, 0, 0]);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_forward_loop_seam() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP,
            loop_start: 2,
            loop_len: 3,
            ..ChannelParams::playing(ramp(6), RATE)
        };
        let mut state = state(params);
        let out = unscale(&run(&mut state, 11));
        assert_eq!(out, [0, 1, 2, 3, 4, 2, 3, 4, 2, 3, 4]);
        assert!(state.is_playing());
    }

    #[test]
    fn test_pingpong_bounces() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP | ChannelFlags::PINGPONG,
            loop_start: 1,
            loop_len: 3,
            ..ChannelParams::playing(ramp(5), RATE)
        };
        let mut state = state(params);
        let out = unscale(&run(&mut state, 10));
        assert_eq!(out, [0, 1, 2, 3, 3, 2, 1, 1, 2, 3]);
    }

    #[test]
    fn test_backward_one_shot() {
        let params = ChannelParams {
            position: 3,
            flags: ChannelFlags::PLAYING | ChannelFlags::BACKWARDS,
            ..ChannelParams::playing(ramp(4), RATE)
        };
        let mut state = state(params);
        let out = unscale(&run(&mut state, 5));
        assert_eq!(out, [3, 2, 1, 0, 0]);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_repeat_limit_then_play_out() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP,
            loop_start: 1,
            loop_len: 2,
            repeat_limit: 2,
            ..ChannelParams::playing(ramp(4), RATE)
        };
        let mut state = state(params);
        let out = unscale(&run(&mut state, 10));
        // Loop body [1, 2] plays once, repeats twice, then the tail plays out
        assert_eq!(out, [0, 1, 2, 1, 2, 1, 2, 3, 0, 0]);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_queued_segment_replaces_at_end() {
        let mut state = state(ChannelParams::playing(ramp(3), RATE));
        let queued = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::SYNTH,
            ..ChannelParams::playing(vec![50i8, 60], RATE)
        };
        let mut next = ChannelSegment::new(&queued, RATE).unwrap();
        next.reselect(&globals());
        state.next = Some(next);

        let out = unscale(&run(&mut state, 6));
        assert_eq!(out, [0, 1, 2, 50, 60, 0]);
        assert!(state.next.is_none());
    }

    #[test]
    fn test_queued_segment_replaces_at_loop_boundary() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP,
            loop_start: 0,
            loop_len: 2,
            ..ChannelParams::playing(ramp(4), RATE)
        };
        let mut state = state(params);
        let queued = ChannelParams::playing(vec![9i8; 3], RATE);
        let mut next = ChannelSegment::new(&queued, RATE).unwrap();
        next.reselect(&globals());
        state.next = Some(next);

        let out = unscale(&run(&mut state, 6));
        assert_eq!(out, [0, 1, 9, 9, 9, 0]);
    }

    #[test]
    fn test_zero_advance_holds_position() {
        let mut segment =
            ChannelSegment::new(&ChannelParams::playing(ramp(4), RATE), RATE).unwrap();
        segment.reselect(&globals());
        segment.advance = Advance::ZERO;
        segment.cursor = Cursor::new(2);
        let mut state = ChannelState {
            current: Some(segment),
            next: None,
        };
        let out = unscale(&run(&mut state, 4));
        assert_eq!(out, [2, 2, 2, 2]);
        assert!(state.is_playing());
    }

    #[test]
    fn test_overshoot_bounces_back_into_loop() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP | ChannelFlags::PINGPONG,
            loop_start: 4,
            loop_len: 2,
            ..ChannelParams::playing(ramp(8), RATE)
        };
        let mut state = state(params);
        let forward = {
            let segment = state.current.as_mut().unwrap();
            // Three past the loop end, as a large advance would leave it
            segment.cursor = Cursor::new(9);
            segment.kernels.get(Direction::Forward)
        };

        // First bounce lands below the loop start with no progress possible
        assert_eq!(state.cross_boundary(), Some(Crossing::Reflected));
        let segment = state.current.as_ref().unwrap();
        assert_eq!(segment.direction(), Direction::Backward);
        assert_eq!(segment.cursor.offset, 2);
        assert_eq!(segment.frames_to_boundary(), Some(0));

        // Second bounce brings it back inside, heading forward again
        assert_eq!(state.cross_boundary(), Some(Crossing::Reflected));
        let segment = state.current.as_ref().unwrap();
        assert_eq!(segment.direction(), Direction::Forward);
        assert_eq!(segment.cursor.offset, 5);
        assert_eq!(segment.end, 6);
        assert_eq!(segment.repeat_count, 2);
        assert_eq!(segment.frames_to_boundary(), Some(1));
        assert!(std::ptr::fn_addr_eq(
            segment.kernels.get(segment.direction()),
            forward
        ));
    }

    #[test]
    fn test_bounce_back_about_same_seam_restores_cursor() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP | ChannelFlags::PINGPONG,
            loop_start: 1,
            loop_len: 3,
            ..ChannelParams::playing(ramp(6), RATE)
        };
        let mut state = state(params);
        let segment = state.current.as_mut().unwrap();
        let start = Cursor {
            offset: 4,
            fraction: 1 << 31,
        };
        segment.cursor = start;
        let kernel = segment.kernels.get(segment.direction());
        let pivot = segment.pivot();

        assert_eq!(state.cross_boundary(), Some(Crossing::Reflected));
        let segment = state.current.as_mut().unwrap();
        assert_eq!(segment.cursor.offset, 3);
        segment.reflect_about(pivot);
        assert_eq!(segment.cursor, start);
        assert_eq!(segment.direction(), Direction::Forward);
        assert!(std::ptr::fn_addr_eq(
            segment.kernels.get(segment.direction()),
            kernel
        ));
    }

    #[test]
    fn test_pingpong_swap_reverses_queued_segment() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP | ChannelFlags::PINGPONG,
            loop_start: 0,
            loop_len: 4,
            ..ChannelParams::playing(ramp(4), RATE)
        };
        let queued = ChannelParams {
            position: 3,
            flags: ChannelFlags::PLAYING | ChannelFlags::SYNTH,
            ..ChannelParams::playing(vec![10i8, 20, 30, 40], RATE)
        };
        let with_queue = || {
            let mut state = state(params.clone());
            let mut next = ChannelSegment::new(&queued, RATE).unwrap();
            next.reselect(&globals());
            state.next = Some(next);
            state
        };

        let mut state = with_queue();
        state.current.as_mut().unwrap().cursor = Cursor::new(4);
        assert_eq!(state.cross_boundary(), Some(Crossing::Swapped));
        let segment = state.current.as_ref().unwrap();
        assert_eq!(segment.direction(), Direction::Backward);
        assert_eq!(segment.end, -1);
        assert_eq!(segment.cursor.offset, 3);
        assert!(state.next.is_none());

        let mut state = with_queue();
        let out = unscale(&run(&mut state, 10));
        assert_eq!(out, [0, 1, 2, 3, 40, 30, 20, 10, 0, 0]);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_plain_loop_swap_keeps_queued_direction() {
        let params = ChannelParams {
            flags: ChannelFlags::PLAYING | ChannelFlags::LOOP,
            loop_start: 0,
            loop_len: 2,
            ..ChannelParams::playing(ramp(4), RATE)
        };
        let mut state = state(params);
        let mut next = ChannelSegment::new(&ChannelParams::playing(ramp(3), RATE), RATE).unwrap();
        next.reselect(&globals());
        state.next = Some(next);
        state.current.as_mut().unwrap().cursor = Cursor::new(2);

        assert_eq!(state.cross_boundary(), Some(Crossing::Swapped));
        let segment = state.current.as_ref().unwrap();
        assert_eq!(segment.direction(), Direction::Forward);
        assert_eq!(segment.end, 3);
    }
}
