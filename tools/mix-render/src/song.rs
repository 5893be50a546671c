//! Demo sequencer
//!
//! A fixed 32-row pattern driven from the mixer's tick hook, six ticks per
//! row. Each channel shows off one playback feature:
//!
//! | ch | source          | feature                                  |
//! |----|-----------------|------------------------------------------|
//! | 0  | 8-bit square    | forward loop, bass line                  |
//! | 1  | 16-bit sine     | ping-pong loop, per-tick panning sweep   |
//! | 2  | 32-bit saw      | repeat-limited loop that plays out       |
//! | 3  | 12-bit noise    | one-shot hats, alternating surround      |
//! | 4  | square then saw | queued synth swap at a loop boundary     |

use nether_mixer::{ChannelFlags, ChannelParams, Mixer, MixerError, SampleData, TickHandler};
use tracing::{debug, warn};

use crate::bank::{Bank, SAW_PERIOD, SINE_PERIOD, SQUARE_PERIOD, note_rate};

/// Ticks per pattern row
pub const SPEED: u32 = 6;
/// Rows per pattern
pub const ROWS: u32 = 32;
/// Input channels the song needs
pub const CHANNELS: usize = 5;

const BASS: [u8; 4] = [36, 36, 43, 41];
const CHORD: [u8; 4] = [60, 64, 67, 65];
const LEAD: [u8; 8] = [72, 74, 76, 79, 76, 74, 72, 67];

pub struct DemoSong {
    bank: Bank,
    tick: u64,
}

impl DemoSong {
    pub fn new(bank: Bank) -> Self {
        Self { bank, tick: 0 }
    }

    /// Ticks handled so far
    pub fn ticks(&self) -> u64 {
        self.tick
    }

    fn row(&self, mixer: &mut Mixer, row: u32) {
        let bar = (row / 8) as usize % BASS.len();

        if row % 8 == 0 {
            let bass = ChannelParams {
                volume: 150,
                flags: ChannelFlags::PLAYING | ChannelFlags::LOOP,
                loop_len: SQUARE_PERIOD,
                ..ChannelParams::playing(self.bank.square.clone(), note_rate(BASS[bar], SQUARE_PERIOD))
            };
            report(mixer.set_channel(0, &bass), 0);

            // Ping-pong over the rising half of the sine
            let pad = ChannelParams {
                volume: 110,
                flags: ChannelFlags::PLAYING | ChannelFlags::LOOP | ChannelFlags::PINGPONG,
                loop_start: SINE_PERIOD / 4,
                loop_len: SINE_PERIOD / 2,
                position: (SINE_PERIOD / 4) as i64,
                ..ChannelParams::playing(self.bank.sine.clone(), note_rate(CHORD[bar], SINE_PERIOD))
            };
            report(mixer.set_channel(1, &pad), 1);
        }

        if row % 4 == 0 {
            let note = LEAD[(row / 4) as usize % LEAD.len()];
            let rate = note_rate(note, SAW_PERIOD);
            // Roughly a row's worth of periods, then silence until the next note
            let lead = ChannelParams {
                volume: 90,
                panning: 64,
                flags: ChannelFlags::PLAYING | ChannelFlags::LOOP,
                loop_len: SAW_PERIOD,
                repeat_limit: (rate / SAW_PERIOD / 8).max(1),
                ..ChannelParams::playing(self.bank.saw.clone(), rate)
            };
            report(mixer.set_channel(2, &lead), 2);
        }

        if row % 2 == 0 {
            let mut flags = ChannelFlags::PLAYING;
            if row % 4 == 2 {
                flags |= ChannelFlags::SURROUND;
            }
            let hat = ChannelParams {
                volume: if row % 8 == 0 { 120 } else { 70 },
                flags,
                ..ChannelParams::playing(self.bank.noise.clone(), 44100)
            };
            report(mixer.set_channel(3, &hat), 3);
        }

        match row % 8 {
            4 => self.blip(mixer, CHORD[bar] + 12),
            6 => self.queue_tail(mixer, CHORD[bar] + 12),
            _ => {}
        }
    }

    /// Looping square blip, left running until a tail is queued behind it
    fn blip(&self, mixer: &mut Mixer, note: u8) {
        let blip = ChannelParams {
            volume: 80,
            panning: 200,
            ..looped(&self.bank.square, note_rate(note, SQUARE_PERIOD), SQUARE_PERIOD)
        };
        report(mixer.set_channel(4, &blip), 4);
    }

    /// Saw that takes over from the blip at its next loop boundary
    fn queue_tail(&self, mixer: &mut Mixer, note: u8) {
        let tail = ChannelParams {
            volume: 60,
            panning: 200,
            ..looped(&self.bank.saw, note_rate(note, SAW_PERIOD), SAW_PERIOD)
        };
        report(mixer.queue_channel(4, &tail), 4);
    }
}

fn looped(data: &SampleData, rate: u32, period: u32) -> ChannelParams {
    ChannelParams {
        flags: ChannelFlags::PLAYING | ChannelFlags::LOOP,
        loop_len: period,
        ..ChannelParams::playing(data.clone(), rate)
    }
}

fn report(result: Result<(), MixerError>, channel: usize) {
    if let Err(e) = result {
        warn!(channel, error = %e, "sequencer command rejected");
    }
}

impl TickHandler for DemoSong {
    fn on_tick(&mut self, mixer: &mut Mixer) {
        let tick_in_row = (self.tick % SPEED as u64) as u32;
        let row = ((self.tick / SPEED as u64) % ROWS as u64) as u32;

        if tick_in_row == 0 {
            if row == 0 {
                debug!(tick = self.tick, "pattern start");
            }
            self.row(mixer, row);
        }

        // Pad pans across the field once per bar
        let phase = (self.tick % (8 * SPEED as u64)) as u32 * 510 / (8 * SPEED);
        let pan = if phase > 255 { 510 - phase } else { phase };
        report(mixer.set_panning(1, pan as u8), 1);

        self.tick += 1;
    }
}
