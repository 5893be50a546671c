use super::*;
use crate::prepare::{GainInput, prepare_lut, prepare_mul16, prepare_mul32};
use crate::sample::{Narrow, Read8, Read16, Read32, ReadPacked};
use crate::select::Routing;

/// 8-bit mono contribution of a sample value of 1 at full volume
const UNIT: i32 = 255 * 256;

fn lut() -> VolumeLut {
    let mut lut = VolumeLut::new().unwrap();
    lut.rebuild(1, 256);
    lut
}

fn gain(routing: Routing, panning: u8, master_left: u8, master_right: u8) -> GainInput {
    GainInput {
        volume: 255,
        panning,
        master_left,
        master_right,
        amplify: 256,
        channels_in: 1,
        routing,
    }
}

fn prepared(prepare: crate::prepare::PrepareFn, input: GainInput) -> Scaling {
    let mut scaling = Scaling::default();
    prepare(&mut scaling, &input);
    scaling
}

fn open_seam(len: usize) -> Seam {
    Seam {
        low: 0,
        high: len as i64,
        wrap_to: None,
    }
}

/// One kernel invocation over a fresh output buffer
#[derive(Clone, Copy)]
struct Run<'a> {
    data: &'a SampleData,
    scaling: &'a Scaling,
    interpolation: Interpolation,
    advance: Advance,
    start: Cursor,
    stride: usize,
}

impl<'a> Run<'a> {
    fn new(data: &'a SampleData, scaling: &'a Scaling) -> Self {
        Self {
            data,
            scaling,
            interpolation: Interpolation::Off,
            advance: Advance::ONE,
            start: Cursor::new(0),
            stride: 1,
        }
    }

    fn stereo(self) -> Self {
        Self { stride: 2, ..self }
    }

    fn at(self, start: Cursor) -> Self {
        Self { start, ..self }
    }

    fn with(self, interpolation: Interpolation, advance: Advance) -> Self {
        Self {
            interpolation,
            advance,
            ..self
        }
    }

    fn frames(self, kernel: KernelFn, frames: usize) -> (Vec<i32>, Cursor) {
        let lut = lut();
        let ctx = KernelCtx {
            data: Some(self.data),
            scaling: self.scaling,
            lut: &lut,
            interpolation: self.interpolation,
            seam: open_seam(self.data.len()),
        };
        let mut cursor = self.start;
        let mut out = vec![0; frames * self.stride];
        kernel(&ctx, &mut cursor, self.advance, &mut out, self.stride);
        (out, cursor)
    }
}

#[test]
fn test_stereo_pan_splits_contribution() {
    let data = SampleData::from(vec![100i8; 4]);
    let scaling = prepared(prepare_lut, gain(Routing::Stereo, 64, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, Stereo>().forward;
    let (out, _) = Run::new(&data, &scaling).stereo().frames(kernel, 2);
    assert_eq!(out[0], 100 * 191 * 256);
    assert_eq!(out[1], 100 * 64 * 256);
    assert_eq!(out[0..2], out[2..4]);
}

#[test]
fn test_center_equal_is_bit_identical() {
    let data = SampleData::from(vec![-7i16, 12000, -32768, 32767, 5]);
    let input = gain(Routing::CenterEqual, 128, 200, 200);
    let native = prepared(prepare_mul16, input);
    let narrowed = prepared(prepare_lut, input);

    let runs = [
        Run::new(&data, &native)
            .stereo()
            .frames(KernelPair::of::<Read16, MulGain, CenterEqual>().forward, 5),
        Run::new(&data, &narrowed)
            .stereo()
            .frames(KernelPair::of::<Narrow<Read16>, LutGain, CenterEqual>().forward, 5),
    ];
    for (out, _) in runs {
        for frame in out.chunks_exact(2) {
            assert_eq!(frame[0], frame[1]);
        }
        assert_ne!(out[2], 0);
    }
}

#[test]
fn test_center_kernel_symmetric_with_equal_masters() {
    // The two-coefficient center path agrees with itself when masters match
    let data = SampleData::from(vec![-128i8, -1, 0, 1, 127]);
    let scaling = prepared(prepare_lut, gain(Routing::Center, 128, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, Center>().forward;
    let (out, _) = Run::new(&data, &scaling).stereo().frames(kernel, 5);
    for frame in out.chunks_exact(2) {
        assert_eq!(frame[0], frame[1]);
    }
}

#[test]
fn test_surround_right_is_complement_of_left() {
    let data = SampleData::from(vec![0i8, 1, -1, 127, -128, 42]);
    let scaling = prepared(prepare_lut, gain(Routing::SurroundEqual, 128, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, SurroundEqual>().forward;
    let (out, _) = Run::new(&data, &scaling).stereo().frames(kernel, 6);
    for frame in out.chunks_exact(2) {
        assert_eq!(frame[1], !frame[0]);
    }
    // Bitwise complement, not negation: silence maps to -1
    assert_eq!(out[1], -1);
}

#[test]
fn test_surround_unequal_masters() {
    let data = SampleData::from(vec![1000i32 << 16; 3]);
    let scaling = prepared(prepare_mul32, gain(Routing::Surround, 128, 255, 100));
    let kernel = KernelPair::of::<Read32, MulGain, Surround>().forward;
    let (out, _) = Run::new(&data, &scaling).stereo().frames(kernel, 3);

    let right = MulGain::apply(
        MulCoef {
            mult: scaling.mul_right,
            div: scaling.divisor,
        },
        1000 << 16,
    );
    assert_eq!(out[1], !right);
    assert!(out[0] > right);
}

#[test]
fn test_left_and_right_only() {
    let data = SampleData::from(vec![10i8; 2]);

    let scaling = prepared(prepare_lut, gain(Routing::Left, 0, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, LeftOnly>().forward;
    let (out, _) = Run::new(&data, &scaling).stereo().frames(kernel, 2);
    assert_eq!(out, [10 * UNIT, 0, 10 * UNIT, 0]);

    let scaling = prepared(prepare_lut, gain(Routing::Right, 255, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, RightOnly>().forward;
    let (out, _) = Run::new(&data, &scaling).stereo().frames(kernel, 2);
    assert_eq!(out, [0, 10 * UNIT, 0, 10 * UNIT]);
}

#[test]
fn test_skip_advances_like_mixing() {
    let data = SampleData::from(vec![3i8; 4096]);
    let scaling = prepared(prepare_lut, gain(Routing::Mono, 128, 255, 255));
    let advance = Advance::new(1, 0x3333_3333);
    let pair = KernelPair::of::<Read8, LutGain, Mono>();

    for (direction, offset) in [(Direction::Forward, 17), (Direction::Backward, 4000)] {
        let run = Run::new(&data, &scaling)
            .at(Cursor {
                offset,
                fraction: 0xDEAD_BEEF,
            })
            .with(Interpolation::Off, advance);
        let (mixed, mixed_cursor) = run.frames(pair.get(direction), 1000);
        let (silent, skipped_cursor) = run.frames(KernelPair::SKIP.get(direction), 1000);
        assert_eq!(mixed_cursor, skipped_cursor);
        assert!(silent.iter().all(|&v| v == 0));
        assert!(mixed.iter().all(|&v| v == 3 * UNIT));
    }
}

#[test]
fn test_backward_reads_descending() {
    let data = SampleData::from(vec![0i8, 1, 2, 3, 4]);
    let scaling = prepared(prepare_lut, gain(Routing::Mono, 128, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, Mono>().backward;
    let (out, cursor) = Run::new(&data, &scaling).at(Cursor::new(4)).frames(kernel, 5);
    assert_eq!(out, [4 * UNIT, 3 * UNIT, 2 * UNIT, UNIT, 0]);
    assert_eq!(cursor, Cursor::new(-1));
}

#[test]
fn test_box_average_when_decimating() {
    let data = SampleData::from(vec![0i8, 10, 20, 30, 40, 50, 60, 70]);
    let scaling = prepared(prepare_lut, gain(Routing::Mono, 128, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, Mono>().forward;
    let double = Advance::new(2, 0);

    let (out, _) = Run::new(&data, &scaling)
        .with(Interpolation::Nearest, double)
        .frames(kernel, 4);
    assert_eq!(out, [5 * UNIT, 25 * UNIT, 45 * UNIT, 65 * UNIT]);

    // Linear mode decimates the same way
    let (linear, _) = Run::new(&data, &scaling)
        .with(Interpolation::Linear, double)
        .frames(kernel, 4);
    assert_eq!(linear, out);

    // Without interpolation the same advance just drops samples
    let (out, _) = Run::new(&data, &scaling)
        .with(Interpolation::Off, double)
        .frames(kernel, 4);
    assert_eq!(out, [0, 20 * UNIT, 40 * UNIT, 60 * UNIT]);
}

#[test]
fn test_nearest_is_floor_when_upsampling() {
    let data = SampleData::from(vec![0i8, 100]);
    let scaling = prepared(prepare_lut, gain(Routing::Mono, 128, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, Mono>().forward;
    let half = Advance::new(0, 1 << 31);
    let (out, _) = Run::new(&data, &scaling)
        .with(Interpolation::Nearest, half)
        .frames(kernel, 4);
    assert_eq!(out, [0, 0, 100 * UNIT, 100 * UNIT]);
}

#[test]
fn test_linear_interpolation_when_upsampling() {
    let data = SampleData::from(vec![0i16, 1000, 2000]);
    let scaling = prepared(prepare_mul16, gain(Routing::Mono, 128, 255, 255));
    let kernel = KernelPair::of::<Read16, MulGain, Mono>().forward;
    let quarter = Advance::new(0, 1 << 30);
    let (out, _) = Run::new(&data, &scaling)
        .with(Interpolation::Linear, quarter)
        .frames(kernel, 9);

    let coef = MulCoef {
        mult: scaling.mul_left,
        div: scaling.divisor,
    };
    let expected: Vec<i32> = [0, 250, 500, 750, 1000, 1250, 1500, 1750, 2000]
        .iter()
        .map(|&s| MulGain::apply(coef, s))
        .collect();
    assert_eq!(out, expected);
}

#[test]
fn test_linear_wraps_at_loop_seam() {
    let data = SampleData::from(vec![0i8, 40, 80, 120]);
    let scaling = prepared(prepare_lut, gain(Routing::Mono, 128, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, Mono>().forward;
    let lut = lut();
    let halfway = Cursor {
        offset: 3,
        fraction: 1 << 31,
    };

    let looped = KernelCtx {
        data: Some(&data),
        scaling: &scaling,
        lut: &lut,
        interpolation: Interpolation::Linear,
        seam: Seam {
            low: 0,
            high: 4,
            wrap_to: Some(1),
        },
    };
    let mut cursor = halfway;
    let mut out = [0];
    kernel(&looped, &mut cursor, Advance::new(0, 1), &mut out, 1);
    // Halfway between the last sample (120) and the restart sample (40)
    assert_eq!(out[0], 80 * UNIT);

    let held = KernelCtx {
        seam: open_seam(4),
        ..looped
    };
    let mut cursor = halfway;
    let mut out = [0];
    kernel(&held, &mut cursor, Advance::new(0, 1), &mut out, 1);
    assert_eq!(out[0], 120 * UNIT);
}

#[test]
fn test_packed_native_matches_32_bit() {
    let values = [0, 1000, -1000, 2047, -2048];
    let packed = SampleData::pack(12, &values).unwrap();
    let wide = SampleData::from(values.iter().map(|v| v << 20).collect::<Vec<i32>>());
    let scaling = prepared(prepare_mul32, gain(Routing::Stereo, 90, 255, 255));

    let (from_packed, _) = Run::new(&packed, &scaling)
        .stereo()
        .frames(KernelPair::of::<ReadPacked, MulGain, Stereo>().forward, 5);
    let (from_wide, _) = Run::new(&wide, &scaling)
        .stereo()
        .frames(KernelPair::of::<Read32, MulGain, Stereo>().forward, 5);
    assert_eq!(from_packed, from_wide);
    assert_ne!(from_packed[2], 0);
}

#[test]
fn test_accumulation_wraps() {
    let data = SampleData::from(vec![i32::MAX; 1]);
    let scaling = Scaling {
        mul_left: 1,
        divisor: 1,
        ..Scaling::default()
    };
    let lut = lut();
    let ctx = KernelCtx {
        data: Some(&data),
        scaling: &scaling,
        lut: &lut,
        interpolation: Interpolation::Off,
        seam: open_seam(1),
    };
    let kernel = KernelPair::of::<Read32, MulGain, Mono>().forward;
    let mut out = [1];
    let mut cursor = Cursor::new(0);
    kernel(&ctx, &mut cursor, Advance::ONE, &mut out, 1);
    assert_eq!(out[0], i32::MIN);
}

#[test]
fn test_mismatched_reader_only_advances() {
    let data = SampleData::from(vec![5i16; 8]);
    let scaling = prepared(prepare_lut, gain(Routing::Mono, 128, 255, 255));
    let kernel = KernelPair::of::<Read8, LutGain, Mono>().forward;
    let (out, cursor) = Run::new(&data, &scaling).frames(kernel, 4);
    assert_eq!(out, [0; 4]);
    assert_eq!(cursor, Cursor::new(4));
}
