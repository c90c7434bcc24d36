//! Packed vertex formats and their attribute layouts
//!
//! Each interleaved format has a `#[repr(C)]` struct and a static
//! [`VertexLayout`] computed from the struct with `size_of` / `offset_of!`,
//! so binding never hard-codes byte offsets.

use std::mem::{offset_of, size_of};

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};

use crate::render::api::{AttributeFormat, ComponentType};

bitflags! {
    /// Attributes present in a vertex format
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct VertexComponents: u8 {
        /// 3 x f32 position
        const POSITION = 1 << 0;
        /// 4 x u8 color
        const COLOR = 1 << 1;
        /// 3 x f32 normal
        const NORMAL = 1 << 2;
        /// 2 x f32 texture coordinate
        const TEXEL = 1 << 3;
    }
}

/// What a render buffer's bytes contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ContentType {
    /// Raw data: texels, float colors, indices, anything without a layout
    #[default]
    Custom,
    /// Positions only
    P,
    /// Position, color
    PC,
    /// Position, texel
    PT,
    /// Position, normal
    PN,
    /// Position, color, texel
    PCT,
    /// Position, normal, texel
    PNT,
    /// Position, color, normal
    PCN,
    /// Position, color, normal, texel
    PCNT,
}

impl ContentType {
    /// Attributes present in this content
    pub fn components(self) -> VertexComponents {
        self.layout().map_or(VertexComponents::empty(), |layout| layout.components)
    }

    /// Whether positions can be read from this content
    pub fn has_positions(self) -> bool {
        self.components().contains(VertexComponents::POSITION)
    }

    /// Attribute layout, `None` for [`ContentType::Custom`]
    pub fn layout(self) -> Option<&'static VertexLayout> {
        match self {
            ContentType::Custom => None,
            ContentType::P => Some(&P_LAYOUT),
            ContentType::PC => Some(&PC_LAYOUT),
            ContentType::PT => Some(&PT_LAYOUT),
            ContentType::PN => Some(&PN_LAYOUT),
            ContentType::PCT => Some(&PCT_LAYOUT),
            ContentType::PNT => Some(&PNT_LAYOUT),
            ContentType::PCN => Some(&PCN_LAYOUT),
            ContentType::PCNT => Some(&PCNT_LAYOUT),
        }
    }
}

/// Byte layout of one interleaved vertex format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexLayout {
    /// Attributes present
    pub components: VertexComponents,
    /// Size of one vertex in bytes
    pub stride: usize,
    /// Position attribute
    pub position: Option<AttributeFormat>,
    /// Color attribute
    pub color: Option<AttributeFormat>,
    /// Normal attribute
    pub normal: Option<AttributeFormat>,
    /// Texture coordinate attribute
    pub texel: Option<AttributeFormat>,
}

const fn float_attribute(components: u8, stride: usize, offset: usize) -> Option<AttributeFormat> {
    Some(AttributeFormat {
        components,
        component_type: ComponentType::F32,
        stride,
        offset,
    })
}

const fn color_attribute(stride: usize, offset: usize) -> Option<AttributeFormat> {
    Some(AttributeFormat {
        components: 4,
        component_type: ComponentType::U8Normalized,
        stride,
        offset,
    })
}

/// Position + color
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPc {
    /// Position
    pub position: [f32; 3],
    /// RGBA color
    pub color: [u8; 4],
}

/// Position + texel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPt {
    /// Position
    pub position: [f32; 3],
    /// Texture coordinate
    pub texel: [f32; 2],
}

/// Position + normal
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPn {
    /// Position
    pub position: [f32; 3],
    /// Normal
    pub normal: [f32; 3],
}

/// Position + color + texel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPct {
    /// Position
    pub position: [f32; 3],
    /// RGBA color
    pub color: [u8; 4],
    /// Texture coordinate
    pub texel: [f32; 2],
}

/// Position + normal + texel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPnt {
    /// Position
    pub position: [f32; 3],
    /// Normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub texel: [f32; 2],
}

/// Position + color + normal
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPcn {
    /// Position
    pub position: [f32; 3],
    /// RGBA color
    pub color: [u8; 4],
    /// Normal
    pub normal: [f32; 3],
}

/// Position + color + normal + texel
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct VertexPcnt {
    /// Position
    pub position: [f32; 3],
    /// RGBA color
    pub color: [u8; 4],
    /// Normal
    pub normal: [f32; 3],
    /// Texture coordinate
    pub texel: [f32; 2],
}

static P_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::POSITION,
    stride: size_of::<[f32; 3]>(),
    position: float_attribute(3, size_of::<[f32; 3]>(), 0),
    color: None,
    normal: None,
    texel: None,
};

static PC_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::POSITION.union(VertexComponents::COLOR),
    stride: size_of::<VertexPc>(),
    position: float_attribute(3, size_of::<VertexPc>(), offset_of!(VertexPc, position)),
    color: color_attribute(size_of::<VertexPc>(), offset_of!(VertexPc, color)),
    normal: None,
    texel: None,
};

static PT_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::POSITION.union(VertexComponents::TEXEL),
    stride: size_of::<VertexPt>(),
    position: float_attribute(3, size_of::<VertexPt>(), offset_of!(VertexPt, position)),
    color: None,
    normal: None,
    texel: float_attribute(2, size_of::<VertexPt>(), offset_of!(VertexPt, texel)),
};

static PN_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::POSITION.union(VertexComponents::NORMAL),
    stride: size_of::<VertexPn>(),
    position: float_attribute(3, size_of::<VertexPn>(), offset_of!(VertexPn, position)),
    color: None,
    normal: float_attribute(3, size_of::<VertexPn>(), offset_of!(VertexPn, normal)),
    texel: None,
};

static PCT_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::POSITION
        .union(VertexComponents::COLOR)
        .union(VertexComponents::TEXEL),
    stride: size_of::<VertexPct>(),
    position: float_attribute(3, size_of::<VertexPct>(), offset_of!(VertexPct, position)),
    color: color_attribute(size_of::<VertexPct>(), offset_of!(VertexPct, color)),
    normal: None,
    texel: float_attribute(2, size_of::<VertexPct>(), offset_of!(VertexPct, texel)),
};

static PNT_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::POSITION
        .union(VertexComponents::NORMAL)
        .union(VertexComponents::TEXEL),
    stride: size_of::<VertexPnt>(),
    position: float_attribute(3, size_of::<VertexPnt>(), offset_of!(VertexPnt, position)),
    color: None,
    normal: float_attribute(3, size_of::<VertexPnt>(), offset_of!(VertexPnt, normal)),
    texel: float_attribute(2, size_of::<VertexPnt>(), offset_of!(VertexPnt, texel)),
};

static PCN_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::POSITION
        .union(VertexComponents::COLOR)
        .union(VertexComponents::NORMAL),
    stride: size_of::<VertexPcn>(),
    position: float_attribute(3, size_of::<VertexPcn>(), offset_of!(VertexPcn, position)),
    color: color_attribute(size_of::<VertexPcn>(), offset_of!(VertexPcn, color)),
    normal: float_attribute(3, size_of::<VertexPcn>(), offset_of!(VertexPcn, normal)),
    texel: None,
};

static PCNT_LAYOUT: VertexLayout = VertexLayout {
    components: VertexComponents::all(),
    stride: size_of::<VertexPcnt>(),
    position: float_attribute(3, size_of::<VertexPcnt>(), offset_of!(VertexPcnt, position)),
    color: color_attribute(size_of::<VertexPcnt>(), offset_of!(VertexPcnt, color)),
    normal: float_attribute(3, size_of::<VertexPcnt>(), offset_of!(VertexPcnt, normal)),
    texel: float_attribute(2, size_of::<VertexPcnt>(), offset_of!(VertexPcnt, texel)),
};

/// A vertex type that can be uploaded into a render buffer
pub trait VertexFormat: Pod {
    /// Content tag recorded when an array of this type is loaded
    const CONTENT: ContentType;
}

impl VertexFormat for [f32; 3] {
    const CONTENT: ContentType = ContentType::P;
}

impl VertexFormat for VertexPc {
    const CONTENT: ContentType = ContentType::PC;
}

impl VertexFormat for VertexPt {
    const CONTENT: ContentType = ContentType::PT;
}

impl VertexFormat for VertexPn {
    const CONTENT: ContentType = ContentType::PN;
}

impl VertexFormat for VertexPct {
    const CONTENT: ContentType = ContentType::PCT;
}

impl VertexFormat for VertexPnt {
    const CONTENT: ContentType = ContentType::PNT;
}

impl VertexFormat for VertexPcn {
    const CONTENT: ContentType = ContentType::PCN;
}

impl VertexFormat for VertexPcnt {
    const CONTENT: ContentType = ContentType::PCNT;
}
