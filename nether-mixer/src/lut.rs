//! Volume lookup table for 8-bit sources
//!
//! Precomputes `sample * volume_step * amplify / channels_in` for every signed
//! 8-bit sample value and every volume step, so the 8-bit kernels replace a
//! multiply and a divide with a single indexed read.

use crate::error::MixerError;

/// Number of volume steps (rows) in the table
pub const LUT_STEPS: usize = 256;

/// One table row: contribution of each `(sample as u8)` at a fixed volume step
pub type LutRow = [i32; 256];

/// Volume lookup table, rebuilt only when `(channels_in, amplify)` changes
#[derive(Clone)]
pub struct VolumeLut {
    rows: Box<[LutRow]>,
    key: Option<(usize, u32)>,
}

impl VolumeLut {
    /// Allocate an empty (all-zero) table
    pub fn new() -> Result<Self, MixerError> {
        let mut rows = Vec::new();
        rows.try_reserve_exact(LUT_STEPS)
            .map_err(|_| MixerError::Allocation {
                what: "volume lookup table",
                bytes: LUT_STEPS * std::mem::size_of::<LutRow>(),
            })?;
        rows.resize(LUT_STEPS, [0; 256]);
        Ok(Self {
            rows: rows.into_boxed_slice(),
            key: None,
        })
    }

    /// Rebuild the table if `(channels_in, amplify)` differs from the last build.
    ///
    /// Returns `true` when the table was recomputed.
    pub fn rebuild(&mut self, channels_in: usize, amplify: u32) -> bool {
        let key = (channels_in.max(1), amplify);
        if self.key == Some(key) {
            return false;
        }
        let divisor = key.0 as i64;
        for (step, row) in self.rows.iter_mut().enumerate() {
            let scale = step as i64 * amplify as i64;
            for (index, slot) in row.iter_mut().enumerate() {
                let sample = index as u8 as i8 as i64;
                *slot = (sample * scale / divisor) as i32;
            }
        }
        self.key = Some(key);
        tracing::debug!(channels_in, amplify, "rebuilt volume lookup table");
        true
    }

    /// Row for a volume step
    #[inline]
    pub fn row(&self, step: u8) -> &LutRow {
        &self.rows[step as usize]
    }

    /// Scaled contribution of an 8-bit sample at a volume step
    #[inline]
    pub fn lookup(&self, step: u8, sample: i8) -> i32 {
        self.rows[step as usize][sample as u8 as usize]
    }

    /// The `(channels_in, amplify)` pair the table was last built for
    pub fn key(&self) -> Option<(usize, u32)> {
        self.key
    }
}

impl std::fmt::Debug for VolumeLut {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VolumeLut").field("key", &self.key).finish()
    }
}
