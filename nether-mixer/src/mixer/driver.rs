//! Top-level mix driver
//!
//! Splits every request at tick boundaries so the sequencer sees a consistent
//! engine between sub-spans.

use tracing::warn;

use super::Mixer;
use crate::error::MixerError;
use crate::playback::MixEnv;

/// Sequencer hook called at every tick boundary
pub trait TickHandler {
    fn on_tick(&mut self, mixer: &mut Mixer);
}

impl<F: FnMut(&mut Mixer)> TickHandler for F {
    fn on_tick(&mut self, mixer: &mut Mixer) {
        self(mixer)
    }
}

/// Tick handler for running the engine without a sequencer
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSequencer;

impl TickHandler for NoSequencer {
    fn on_tick(&mut self, _mixer: &mut Mixer) {}
}

impl Mixer {
    /// Mix `frames` frames into the engine-owned buffer.
    ///
    /// Returns the interleaved accumulators (`frames * channels_out` values).
    /// If the tick handler reconfigures the output mid-request the partial
    /// result is dropped and [`MixerError::OutputReconfigured`] is returned.
    pub fn mix<H: TickHandler + ?Sized>(
        &mut self,
        frames: usize,
        handler: &mut H,
    ) -> Result<&[i32], MixerError> {
        if frames > self.capacity {
            return Err(MixerError::BufferTooSmall {
                requested: frames,
                capacity: self.capacity,
            });
        }
        let len = frames * self.channels_out;
        let mut buffer = std::mem::take(&mut self.buffer);
        let Some(target) = buffer.get_mut(..len) else {
            // Only reachable when called re-entrantly from a tick handler
            self.buffer = buffer;
            return Err(MixerError::BufferTooSmall {
                requested: frames,
                capacity: 0,
            });
        };
        let mixed = self.mix_into(target, handler);

        if !self.buffer.is_empty() {
            // set_output ran inside a tick and installed a new buffer
            warn!(
                frames = mixed,
                capacity = self.capacity,
                "output buffer replaced mid-mix; request discarded"
            );
            return Err(MixerError::OutputReconfigured { frames: mixed });
        }
        self.buffer = buffer;
        Ok(&self.buffer[..len])
    }

    /// Mix into a caller-supplied interleaved buffer.
    ///
    /// The buffer is zeroed first; `out.len() / channels_out` frames are
    /// produced. Returns the number of frames mixed, which is short only when
    /// the tick handler changed the output channel count.
    pub fn mix_into<H: TickHandler + ?Sized>(&mut self, out: &mut [i32], handler: &mut H) -> usize {
        out.fill(0);
        let stride = self.channels_out;
        let total = out.len() / stride;
        if self.frozen {
            return total;
        }

        let mut done = 0;
        while done < total {
            if self.clock.due() {
                handler.on_tick(self);
                self.clock.recharge();
                if self.channels_out != stride {
                    warn!(
                        from = stride,
                        to = self.channels_out,
                        "output channel count changed mid-mix; request cut short"
                    );
                    return done;
                }
                if self.frozen {
                    break;
                }
            }

            let run = self.clock.remaining.min((total - done) as u64) as usize;
            let span = &mut out[done * stride..(done + run) * stride];
            let env = MixEnv {
                lut: &self.lut,
                interpolation: self.interpolation,
            };
            for channel in &mut self.channels {
                channel.mix(span, stride, env);
            }
            self.clock.consume(run as u64);
            done += run;
        }
        total
    }
}
