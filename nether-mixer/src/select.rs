//! Mix-function selection
//!
//! Picks the kernel pair and prepare routine for a channel from its source
//! width, mute state, volume, panning, surround flag and the engine globals.

use crate::channel::{ChannelFlags, ChannelSegment};
use crate::kernel::{
    Center, CenterEqual, Gain, KernelPair, LeftOnly, LutGain, Mono, MulGain, RightOnly, Stereo,
    Surround, SurroundEqual,
};
use crate::prepare::{PrepareFn, prepare_lut, prepare_mul16, prepare_mul32, prepare_silent};
use crate::sample::{Narrow, Read8, Read16, Read32, ReadKind, ReadPacked, SourceWidth};

/// Output routing strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Routing {
    /// Advance only, no output
    Skip,
    Mono,
    Stereo,
    Left,
    Right,
    Center,
    CenterEqual,
    Surround,
    SurroundEqual,
}

/// Scaling family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    Silent,
    /// 8-bit lookup table, wider sources narrowed to their top byte
    Lut,
    /// Native 16-bit multiply/divide
    Mul16,
    /// Native 32-bit multiply/divide, also packed depths above 8 bits
    Mul32,
}

/// Engine-wide inputs to selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Globals {
    pub channels_out: usize,
    pub channels_in: usize,
    pub master_left: u8,
    pub master_right: u8,
    pub amplify: u32,
    pub real_16bit: bool,
}

/// Result of selection for one segment
#[derive(Debug, Clone, Copy)]
pub struct Selection {
    pub family: Family,
    pub routing: Routing,
    pub kernels: KernelPair,
    pub prepare: PrepareFn,
}

/// Select routing, family, kernels and prepare routine for a segment
pub fn select(segment: &ChannelSegment, globals: &Globals) -> Selection {
    let routing = routing_for(segment, globals);
    let width = segment.data.as_ref().map(|d| (d.width(), d.bits()));

    let family = match (routing, width) {
        (Routing::Skip, _) | (_, None) => Family::Silent,
        (_, Some((_, bits))) if bits <= 8 || !globals.real_16bit => Family::Lut,
        (_, Some((SourceWidth::Bits16, _))) => Family::Mul16,
        (_, Some(_)) => Family::Mul32,
    };

    let kernels = match width {
        Some((width, _)) => kernels_for(family, width, routing),
        None => KernelPair::SKIP,
    };

    let prepare: PrepareFn = match family {
        Family::Silent => prepare_silent,
        Family::Lut => prepare_lut,
        Family::Mul16 => prepare_mul16,
        Family::Mul32 => prepare_mul32,
    };

    Selection {
        family,
        routing,
        kernels,
        prepare,
    }
}

fn routing_for(segment: &ChannelSegment, globals: &Globals) -> Routing {
    let silent = segment.flags.contains(ChannelFlags::MUTED)
        || segment.volume == 0
        || globals.amplify == 0
        || segment.data.as_ref().is_none_or(|d| d.is_empty());
    if silent {
        return Routing::Skip;
    }

    let (ml, mr) = (globals.master_left, globals.master_right);
    if globals.channels_out == 1 {
        return if ml as u16 + mr as u16 == 0 {
            Routing::Skip
        } else {
            Routing::Mono
        };
    }

    if segment.flags.contains(ChannelFlags::SURROUND) {
        return if ml == mr {
            Routing::SurroundEqual
        } else {
            Routing::Surround
        };
    }

    match segment.panning {
        0 if ml == 0 => Routing::Skip,
        0 => Routing::Left,
        255 if mr == 0 => Routing::Skip,
        255 => Routing::Right,
        128 if ml == mr => Routing::CenterEqual,
        128 => Routing::Center,
        _ => Routing::Stereo,
    }
}

/// Kernel pair for a family, source width and routing
pub fn kernels_for(family: Family, width: SourceWidth, routing: Routing) -> KernelPair {
    match (family, width) {
        (Family::Silent, _) => KernelPair::SKIP,
        (Family::Lut, SourceWidth::Bits8) => routed::<Read8, LutGain>(routing),
        (Family::Lut, SourceWidth::Bits16) => routed::<Narrow<Read16>, LutGain>(routing),
        (Family::Lut, SourceWidth::Bits32) => routed::<Narrow<Read32>, LutGain>(routing),
        (Family::Lut, SourceWidth::Packed) => routed::<Narrow<ReadPacked>, LutGain>(routing),
        (Family::Mul16, SourceWidth::Bits16) => routed::<Read16, MulGain>(routing),
        (Family::Mul32, SourceWidth::Bits32) => routed::<Read32, MulGain>(routing),
        (Family::Mul32, SourceWidth::Packed) => routed::<ReadPacked, MulGain>(routing),
        // The native families never see a source they were not chosen for
        (Family::Mul16 | Family::Mul32, _) => KernelPair::SKIP,
    }
}

fn routed<K: ReadKind, G: Gain>(routing: Routing) -> KernelPair {
    match routing {
        Routing::Skip => KernelPair::SKIP,
        Routing::Mono => KernelPair::of::<K, G, Mono>(),
        Routing::Stereo => KernelPair::of::<K, G, Stereo>(),
        Routing::Left => KernelPair::of::<K, G, LeftOnly>(),
        Routing::Right => KernelPair::of::<K, G, RightOnly>(),
        Routing::Center => KernelPair::of::<K, G, Center>(),
        Routing::CenterEqual => KernelPair::of::<K, G, CenterEqual>(),
        Routing::Surround => KernelPair::of::<K, G, Surround>(),
        Routing::SurroundEqual => KernelPair::of::<K, G, SurroundEqual>(),
    }
}
