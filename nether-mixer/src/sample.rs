//! Raw PCM sample sources and the readers the kernels use to fetch from them
//!
//! Sources are shared (`Arc`) so a segment queued for a synth swap and the
//! segment currently playing can point at the same data without copying.
//! Nothing is converted at rest: readers resample straight from the stored
//! width.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::error::MixerError;

/// Raw PCM data for one playable sample
#[derive(Clone)]
pub enum SampleData {
    /// Signed 8-bit
    Pcm8(Arc<[i8]>),
    /// Signed 16-bit
    Pcm16(Arc<[i16]>),
    /// Signed 32-bit
    Pcm32(Arc<[i32]>),
    /// Two's complement samples of `bits` width packed LSB-first into a byte stream
    Packed { bits: u8, bytes: Arc<[u8]> },
}

/// Storage width class used for kernel selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceWidth {
    Bits8,
    Bits16,
    Bits32,
    Packed,
}

impl SampleData {
    /// Wrap a bit-packed stream. `bits` must be in `1..=32`.
    pub fn packed(bits: u8, bytes: impl Into<Arc<[u8]>>) -> Result<Self, MixerError> {
        if !(1..=32).contains(&bits) {
            return Err(MixerError::InvalidParams("packed bit depth must be 1..=32"));
        }
        Ok(Self::Packed {
            bits,
            bytes: bytes.into(),
        })
    }

    /// Pack the low `bits` of each value into a new LSB-first stream
    pub fn pack(bits: u8, values: &[i32]) -> Result<Self, MixerError> {
        if !(1..=32).contains(&bits) {
            return Err(MixerError::InvalidParams("packed bit depth must be 1..=32"));
        }
        let total_bits = values.len() * bits as usize;
        let mut bytes = vec![0u8; total_bits.div_ceil(8)];
        let mask = low_mask(bits as u32);
        for (i, &value) in values.iter().enumerate() {
            let raw = value as u32 & mask;
            let mut bit = i * bits as usize;
            for b in 0..bits as usize {
                if raw & (1 << b) != 0 {
                    bytes[bit >> 3] |= 1 << (bit & 7);
                }
                bit += 1;
            }
        }
        Self::packed(bits, bytes)
    }

    /// Source bit depth
    pub fn bits(&self) -> u8 {
        match self {
            Self::Pcm8(_) => 8,
            Self::Pcm16(_) => 16,
            Self::Pcm32(_) => 32,
            Self::Packed { bits, .. } => *bits,
        }
    }

    pub fn width(&self) -> SourceWidth {
        match self {
            Self::Pcm8(_) => SourceWidth::Bits8,
            Self::Pcm16(_) => SourceWidth::Bits16,
            Self::Pcm32(_) => SourceWidth::Bits32,
            Self::Packed { .. } => SourceWidth::Packed,
        }
    }

    /// Number of whole samples available
    pub fn len(&self) -> usize {
        match self {
            Self::Pcm8(s) => s.len(),
            Self::Pcm16(s) => s.len(),
            Self::Pcm32(s) => s.len(),
            Self::Packed { bits, bytes } => bytes.len() * 8 / *bits as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for SampleData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SampleData")
            .field("bits", &self.bits())
            .field("len", &self.len())
            .finish()
    }
}

impl From<Vec<i8>> for SampleData {
    fn from(v: Vec<i8>) -> Self {
        Self::Pcm8(v.into())
    }
}

impl From<Vec<i16>> for SampleData {
    fn from(v: Vec<i16>) -> Self {
        Self::Pcm16(v.into())
    }
}

impl From<Vec<i32>> for SampleData {
    fn from(v: Vec<i32>) -> Self {
        Self::Pcm32(v.into())
    }
}

#[inline]
fn low_mask(bits: u32) -> u32 {
    if bits >= 32 {
        u32::MAX
    } else {
        (1u32 << bits) - 1
    }
}

// =============================================================================
// Readers
// =============================================================================

/// Indexed sample access for the kernels
pub trait SampleRead {
    /// Significant bits of the values returned by `at`
    const BITS: u32;

    fn len(&self) -> usize;

    /// Sample at `index`; the caller keeps `index < len()`
    fn at(&self, index: usize) -> i32;

    /// Bounds-checked read; samples outside the data are silent
    #[inline]
    fn get(&self, index: i64) -> i32 {
        if index >= 0 && (index as u64) < self.len() as u64 {
            self.at(index as usize)
        } else {
            0
        }
    }
}

pub struct Pcm8Reader<'a>(&'a [i8]);
pub struct Pcm16Reader<'a>(&'a [i16]);
pub struct Pcm32Reader<'a>(&'a [i32]);

/// Reads packed samples sign-extended and left-justified to 32 bits
pub struct PackedReader<'a> {
    bytes: &'a [u8],
    bits: u32,
    mask: u32,
    len: usize,
}

/// Keeps only the top 8 bits of another reader, for the LUT kernels
pub struct NarrowReader<R>(R);

impl SampleRead for Pcm8Reader<'_> {
    const BITS: u32 = 8;

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn at(&self, index: usize) -> i32 {
        self.0[index] as i32
    }
}

impl SampleRead for Pcm16Reader<'_> {
    const BITS: u32 = 16;

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn at(&self, index: usize) -> i32 {
        self.0[index] as i32
    }
}

impl SampleRead for Pcm32Reader<'_> {
    const BITS: u32 = 32;

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn at(&self, index: usize) -> i32 {
        self.0[index]
    }
}

impl SampleRead for PackedReader<'_> {
    const BITS: u32 = 32;

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    #[inline]
    fn at(&self, index: usize) -> i32 {
        let bit = index as u64 * self.bits as u64;
        let byte = (bit >> 3) as usize;
        let shift = (bit & 7) as u32;
        // Up to 32 bits starting at any bit offset spans at most 5 bytes
        let mut word = 0u64;
        for (k, &b) in self.bytes[byte..].iter().take(5).enumerate() {
            word |= (b as u64) << (8 * k);
        }
        let raw = (word >> shift) as u32 & self.mask;
        (raw << (32 - self.bits)) as i32
    }
}

impl<R: SampleRead> SampleRead for NarrowReader<R> {
    const BITS: u32 = 8;

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    fn at(&self, index: usize) -> i32 {
        self.0.at(index) >> (R::BITS - 8)
    }
}

// =============================================================================
// Reader kinds (type-level selection for kernel instantiation)
// =============================================================================

/// Binds a `SampleData` to a concrete reader type
pub trait ReadKind: 'static {
    type Reader<'a>: SampleRead;

    /// `None` when the data is not stored in this kind's width
    fn bind(data: &SampleData) -> Option<Self::Reader<'_>>;
}

pub struct Read8;
pub struct Read16;
pub struct Read32;
pub struct ReadPacked;
pub struct Narrow<K>(PhantomData<K>);

impl ReadKind for Read8 {
    type Reader<'a> = Pcm8Reader<'a>;

    fn bind(data: &SampleData) -> Option<Self::Reader<'_>> {
        match data {
            SampleData::Pcm8(s) => Some(Pcm8Reader(s)),
            _ => None,
        }
    }
}

impl ReadKind for Read16 {
    type Reader<'a> = Pcm16Reader<'a>;

    fn bind(data: &SampleData) -> Option<Self::Reader<'_>> {
        match data {
            SampleData::Pcm16(s) => Some(Pcm16Reader(s)),
            _ => None,
        }
    }
}

impl ReadKind for Read32 {
    type Reader<'a> = Pcm32Reader<'a>;

    fn bind(data: &SampleData) -> Option<Self::Reader<'_>> {
        match data {
            SampleData::Pcm32(s) => Some(Pcm32Reader(s)),
            _ => None,
        }
    }
}

impl ReadKind for ReadPacked {
    type Reader<'a> = PackedReader<'a>;

    fn bind(data: &SampleData) -> Option<Self::Reader<'_>> {
        match data {
            SampleData::Packed { bits, bytes } => {
                let bits = *bits as u32;
                Some(PackedReader {
                    bytes,
                    bits,
                    mask: low_mask(bits),
                    len: bytes.len() * 8 / bits as usize,
                })
            }
            _ => None,
        }
    }
}

impl<K: ReadKind> ReadKind for Narrow<K> {
    type Reader<'a> = NarrowReader<K::Reader<'a>>;

    fn bind(data: &SampleData) -> Option<Self::Reader<'_>> {
        K::bind(data).map(NarrowReader)
    }
}
