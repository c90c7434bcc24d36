//! Device abstraction for the rendering system
//!
//! Every GPU call made by the renderer goes through [`GraphicsDevice`]. The
//! trait is deliberately narrow: buffer objects, fixed-function toggles,
//! attribute pointers, indexed draws and vertex-array objects.

use serde::{Deserialize, Serialize};

use crate::render::RenderResult;

/// Handle to a GPU buffer object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuBufferId(pub u32);

/// Handle to a vertex-array object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexArrayId(pub u32);

/// Which binding point a buffer object is used with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferTarget {
    /// Vertex attribute data
    Vertex,
    /// 16-bit element indices
    Index,
}

/// Storage policy for a render buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BufferUsage {
    /// Keep data in CPU memory only; draws read client arrays
    CpuOnly,
    /// Uploaded once, drawn many times
    #[default]
    Static,
    /// Updated occasionally
    Dynamic,
    /// Updated every frame
    Stream,
}

impl BufferUsage {
    /// Whether this usage asks for a GPU buffer object
    pub fn wants_gpu_buffer(self) -> bool {
        !matches!(self, BufferUsage::CpuOnly)
    }
}

/// Boolean server-side capabilities toggled through the device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Alpha blending
    Blend,
    /// Vertex colors drive material color
    ColorMaterial,
    /// Face culling
    CullFace,
    /// Depth testing
    DepthTest,
    /// Stencil testing
    StencilTest,
    /// Scissor testing
    ScissorTest,
    /// Multisample anti-aliasing
    Multisample,
    /// Polygon offset for filled primitives
    PolygonOffsetFill,
}

/// Which faces are culled when culling is enabled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullFace {
    /// Cull back faces
    #[default]
    Back,
    /// Cull front faces
    Front,
    /// Cull everything
    FrontAndBack,
}

impl CullFace {
    /// Raw integer value stored in the renderer's integer state table
    pub fn to_raw(self) -> i32 {
        match self {
            CullFace::Back => 0,
            CullFace::Front => 1,
            CullFace::FrontAndBack => 2,
        }
    }

    /// Convert from a raw integer state value
    pub fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(CullFace::Back),
            1 => Some(CullFace::Front),
            2 => Some(CullFace::FrontAndBack),
            _ => None,
        }
    }
}

/// Primitive topology for indexed draws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Triangle strip
    TriangleStrip,
    /// Independent triangles
    Triangles,
    /// Triangle fan
    TriangleFan,
    /// Connected line segments
    LineStrip,
    /// Independent line segments
    Lines,
}

/// Scalar type of one attribute component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentType {
    /// 32-bit float
    F32,
    /// Unsigned byte, normalized to `[0, 1]` by the device
    U8Normalized,
}

/// Layout of one vertex attribute inside a buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AttributeFormat {
    /// Component count, 1 through 4
    pub components: u8,
    /// Component scalar type
    pub component_type: ComponentType,
    /// Distance in bytes between consecutive vertices; 0 means tightly packed
    pub stride: usize,
    /// Byte offset of the first component
    pub offset: usize,
}

/// Where attribute data is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VertexSource<'a> {
    /// A GPU buffer object
    Buffer(GpuBufferId),
    /// CPU memory owned by the caller, valid for the duration of the call
    Client(&'a [u8]),
}

/// Where index data is read from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexSource<'a> {
    /// A GPU buffer object holding `u16` indices
    Buffer(GpuBufferId),
    /// CPU memory holding native-endian `u16` indices
    Client(&'a [u8]),
}

/// Graphics device trait
///
/// Implemented by platform back-ends and by [`super::HeadlessDevice`]. Calls
/// that can fail because a resource is unavailable return a `RenderResult`;
/// the renderer degrades rather than aborting on those.
pub trait GraphicsDevice {
    /// Whether buffer objects can be created at all
    fn supports_buffer_objects(&self) -> bool;

    /// Create an empty buffer object
    fn create_buffer(&mut self) -> RenderResult<GpuBufferId>;

    /// Delete a buffer object
    fn delete_buffer(&mut self, id: GpuBufferId);

    /// (Re)allocate a buffer object's storage and fill it with `data`
    fn allocate_buffer(&mut self, id: GpuBufferId, target: BufferTarget, data: &[u8], usage: BufferUsage);

    /// Map the buffer, copy `data` to its start and unmap it.
    ///
    /// Returns false if the mapping failed; the caller should reallocate.
    fn write_buffer(&mut self, id: GpuBufferId, target: BufferTarget, data: &[u8]) -> bool;

    /// Enable or disable a capability
    fn set_capability(&mut self, capability: Capability, enabled: bool);

    /// Enable or disable depth writes
    fn set_depth_mask(&mut self, enabled: bool);

    /// Enable or disable a vertex attribute array
    fn set_vertex_attribute_array(&mut self, slot: u32, enabled: bool);

    /// Select which faces are culled
    fn set_cull_face(&mut self, mode: CullFace);

    /// Set the polygon offset (`factor` scales slope, `units` is constant)
    fn set_polygon_offset(&mut self, factor: f32, units: f32);

    /// Point an attribute slot at vertex data
    fn vertex_attribute_pointer(&mut self, slot: u32, format: AttributeFormat, source: VertexSource<'_>);

    /// Draw `count` indices
    fn draw_indexed(&mut self, primitive: Primitive, count: usize, indices: IndexSource<'_>);

    /// Create a vertex-array object
    fn create_vertex_array(&mut self) -> RenderResult<VertexArrayId>;

    /// Bind a vertex-array object, or unbind with `None`
    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>);

    /// Delete a vertex-array object
    fn delete_vertex_array(&mut self, id: VertexArrayId);

    /// Downcast to the concrete device type
    fn as_any(&self) -> &dyn std::any::Any;
}
