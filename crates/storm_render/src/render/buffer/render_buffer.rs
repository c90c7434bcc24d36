//! # Render Buffer
//!
//! CPU-side vertex or index storage, mirrored into a GPU buffer object when
//! the device supports one. The CPU copy is always kept so a lost device can
//! be repopulated (see [`RenderBuffer::map`]).
//!
//! The GPU allocation only grows. Uploads that fit in the current
//! allocation are written in place; larger uploads reallocate.

use std::mem::size_of;

use bytemuck::Pod;

use super::vertex::{ContentType, VertexFormat, VertexLayout};
use crate::foundation::logging::precondition;
use crate::foundation::math::Vec3;
use crate::render::api::{
    AttributeFormat, BufferTarget, BufferUsage, ComponentType, GpuBufferId, GraphicsDevice,
    IndexSource, Primitive, VertexSource,
};
use crate::render::state::{BoolState, RendererState};

/// A single attribute a whole buffer can be bound as
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VertexAttribute {
    /// 3 x f32 positions, slot 0
    Position,
    /// 2 x f32 texture coordinates, slot 1
    Texel,
    /// 3 x f32 normals, slot 2
    Normal,
    /// 4 x f32 colors, slot 3
    Color,
}

impl VertexAttribute {
    /// Every attribute, in slot order
    pub const ALL: [VertexAttribute; 4] = [
        VertexAttribute::Position,
        VertexAttribute::Texel,
        VertexAttribute::Normal,
        VertexAttribute::Color,
    ];

    /// Attribute slot the attribute is bound to
    pub fn slot(self) -> u32 {
        match self {
            VertexAttribute::Position => 0,
            VertexAttribute::Texel => 1,
            VertexAttribute::Normal => 2,
            VertexAttribute::Color => 3,
        }
    }

    /// State slot that enables the attribute array
    pub fn array_state(self) -> BoolState {
        match self {
            VertexAttribute::Position => BoolState::VertexArray,
            VertexAttribute::Texel => BoolState::TextureCoordinateArray,
            VertexAttribute::Normal => BoolState::NormalArray,
            VertexAttribute::Color => BoolState::ColorArray,
        }
    }

    fn packed_components(self) -> u8 {
        match self {
            VertexAttribute::Position | VertexAttribute::Normal => 3,
            VertexAttribute::Texel => 2,
            VertexAttribute::Color => 4,
        }
    }
}

/// Vertex or index data with an optional GPU mirror
#[derive(Debug)]
pub struct RenderBuffer {
    usage: BufferUsage,
    data: Vec<u8>,
    content: ContentType,
    index_data: bool,
    gpu: Option<GpuBufferId>,
    gpu_capacity: usize,
}

impl RenderBuffer {
    /// Create a buffer, acquiring a GPU buffer object if `usage` asks for one.
    ///
    /// If the device cannot create one the buffer silently works from CPU
    /// memory instead.
    pub fn new(device: &mut dyn GraphicsDevice, usage: BufferUsage) -> Self {
        let mut buffer = Self::cpu_only();
        buffer.usage = usage;
        buffer.acquire_gpu_buffer(device);
        buffer
    }

    /// Create a buffer that never uses a GPU buffer object
    pub fn cpu_only() -> Self {
        Self {
            usage: BufferUsage::CpuOnly,
            data: Vec::new(),
            content: ContentType::Custom,
            index_data: false,
            gpu: None,
            gpu_capacity: 0,
        }
    }

    fn acquire_gpu_buffer(&mut self, device: &mut dyn GraphicsDevice) {
        if !self.usage.wants_gpu_buffer() || self.gpu.is_some() {
            return;
        }
        if !device.supports_buffer_objects() {
            log::warn!("RenderBuffer: device has no buffer objects, using CPU arrays");
            return;
        }
        match device.create_buffer() {
            Ok(id) => {
                self.gpu = Some(id);
                self.gpu_capacity = 0;
            }
            Err(err) => log::warn!("RenderBuffer: {}, using CPU arrays", err),
        }
    }

    /// Load an interleaved vertex array and record its content type
    pub fn set_array<V: VertexFormat>(&mut self, device: &mut dyn GraphicsDevice, vertices: &[V]) {
        self.load(device, bytemuck::cast_slice(vertices), V::CONTENT, false);
    }

    /// Load bare positions
    pub fn set_positions(&mut self, device: &mut dyn GraphicsDevice, positions: &[[f32; 3]]) {
        self.set_array(device, positions);
    }

    /// Load texture coordinates
    pub fn set_texels(&mut self, device: &mut dyn GraphicsDevice, texels: &[[f32; 2]]) {
        self.load(device, bytemuck::cast_slice(texels), ContentType::Custom, false);
    }

    /// Load float RGBA colors
    pub fn set_colors(&mut self, device: &mut dyn GraphicsDevice, colors: &[[f32; 4]]) {
        self.load(device, bytemuck::cast_slice(colors), ContentType::Custom, false);
    }

    /// Load 16-bit indices
    pub fn set_indices(&mut self, device: &mut dyn GraphicsDevice, indices: &[u16]) {
        self.load(device, bytemuck::cast_slice(indices), ContentType::Custom, true);
    }

    fn load(&mut self, device: &mut dyn GraphicsDevice, bytes: &[u8], content: ContentType, index_data: bool) {
        if !precondition!(!bytes.is_empty(), "RenderBuffer: loading an empty array") {
            return;
        }
        self.data.clear();
        self.data.extend_from_slice(bytes);
        self.content = content;
        self.index_data = index_data;
        self.upload(device);
    }

    /// Resize the active CPU array to `bytes`, zero-filling any growth.
    ///
    /// Nothing is uploaded until [`bake`](Self::bake) is called.
    pub fn resize_array(&mut self, bytes: usize) {
        self.data.resize(bytes, 0);
    }

    /// Size the CPU array for `count` vertices of type `V`
    pub fn set_vertex_array_size<V: VertexFormat>(&mut self, count: usize) {
        self.content = V::CONTENT;
        self.index_data = false;
        self.resize_array(count * size_of::<V>());
    }

    /// Size the CPU array for `count` indices
    pub fn set_index_array_size(&mut self, count: usize) {
        self.content = ContentType::Custom;
        self.index_data = true;
        self.resize_array(count * size_of::<u16>());
    }

    /// Active CPU bytes for in-place filling
    pub fn array_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Write `items` into the CPU array starting at element `first`.
    ///
    /// The array must already be large enough.
    pub fn write_at<T: Pod>(&mut self, first: usize, items: &[T]) {
        let bytes: &[u8] = bytemuck::cast_slice(items);
        let start = first * size_of::<T>();
        let end = start + bytes.len();
        if !precondition!(
            end <= self.data.len(),
            "RenderBuffer: write of {} bytes at {} overruns a {} byte array",
            bytes.len(),
            start,
            self.data.len()
        ) {
            return;
        }
        self.data[start..end].copy_from_slice(bytes);
    }

    /// Upload the CPU array as vertex data
    pub fn bake(&mut self, device: &mut dyn GraphicsDevice) {
        if !precondition!(!self.data.is_empty(), "RenderBuffer: baking an empty array") {
            return;
        }
        self.index_data = false;
        self.upload(device);
    }

    /// Upload the CPU array as index data
    pub fn bake_index(&mut self, device: &mut dyn GraphicsDevice) {
        if !precondition!(!self.data.is_empty(), "RenderBuffer: baking an empty index array") {
            return;
        }
        self.index_data = true;
        self.upload(device);
    }

    fn target(&self) -> BufferTarget {
        if self.index_data {
            BufferTarget::Index
        } else {
            BufferTarget::Vertex
        }
    }

    fn upload(&mut self, device: &mut dyn GraphicsDevice) {
        let Some(id) = self.gpu else {
            return;
        };
        let target = self.target();
        let size = self.data.len();

        if size > self.gpu_capacity {
            device.allocate_buffer(id, target, &self.data, self.usage);
            log::debug!("RenderBuffer: reallocated {:?} to {} bytes", id, size);
            self.gpu_capacity = size;
        } else if !device.write_buffer(id, target, &self.data) {
            log::warn!("RenderBuffer: mapping {:?} failed, reallocating", id);
            device.allocate_buffer(id, target, &self.data, self.usage);
            self.gpu_capacity = size;
        }
    }

    fn vertex_source(&self) -> VertexSource<'_> {
        match self.gpu {
            Some(id) => VertexSource::Buffer(id),
            None => VertexSource::Client(&self.data),
        }
    }

    fn index_source(&self) -> IndexSource<'_> {
        match self.gpu {
            Some(id) => IndexSource::Buffer(id),
            None => IndexSource::Client(&self.data),
        }
    }

    fn layout(&self) -> Option<&'static VertexLayout> {
        self.content.layout()
    }

    fn attribute_formats(layout: &VertexLayout) -> [(VertexAttribute, Option<AttributeFormat>); 4] {
        [
            (VertexAttribute::Position, layout.position),
            (VertexAttribute::Texel, layout.texel),
            (VertexAttribute::Normal, layout.normal),
            (VertexAttribute::Color, layout.color),
        ]
    }

    /// Bind every attribute the content carries and enable its array.
    ///
    /// Arrays for attributes the content lacks are disabled. The enables
    /// are lazy and land on the next [`RendererState::flush`].
    pub fn bind(&self, state: &mut RendererState, device: &mut dyn GraphicsDevice) {
        let Some(layout) = self.layout() else {
            precondition!(false, "RenderBuffer: binding a buffer with custom content");
            return;
        };

        for (attribute, format) in Self::attribute_formats(layout) {
            match format {
                Some(format) => {
                    device.vertex_attribute_pointer(attribute.slot(), format, self.vertex_source());
                    state.set_bool(attribute.array_state(), true);
                }
                None => state.set_bool(attribute.array_state(), false),
            }
        }
    }

    /// Bind every attribute the content carries into the current
    /// vertex-array object, enabling or disabling slots 0-3 directly.
    ///
    /// Returns which of slots 0-3 ended up enabled, indexed by slot.
    pub fn bind_arrays(&self, device: &mut dyn GraphicsDevice) -> [bool; 4] {
        let mut enabled = [false; 4];
        let Some(layout) = self.layout() else {
            precondition!(false, "RenderBuffer: binding a buffer with custom content");
            for attribute in VertexAttribute::ALL {
                device.set_vertex_attribute_array(attribute.slot(), false);
            }
            return enabled;
        };

        for ((attribute, format), slot_enabled) in Self::attribute_formats(layout).into_iter().zip(&mut enabled) {
            if let Some(format) = format {
                device.vertex_attribute_pointer(attribute.slot(), format, self.vertex_source());
                *slot_enabled = true;
            }
            device.set_vertex_attribute_array(attribute.slot(), *slot_enabled);
        }
        enabled
    }

    /// Disable the arrays enabled by [`bind`](Self::bind)
    pub fn unbind(&self, state: &mut RendererState) {
        let Some(layout) = self.layout() else {
            precondition!(false, "RenderBuffer: unbinding a buffer with custom content");
            return;
        };

        state.set_bool(VertexAttribute::Position.array_state(), false);
        if layout.texel.is_some() {
            state.set_bool(VertexAttribute::Texel.array_state(), false);
        }
        if layout.normal.is_some() {
            state.set_bool(VertexAttribute::Normal.array_state(), false);
        }
        if layout.color.is_some() {
            state.set_bool(VertexAttribute::Color.array_state(), false);
        }
    }

    /// Bind the whole buffer as one tightly packed attribute
    pub fn bind_attribute(&self, attribute: VertexAttribute, state: &mut RendererState, device: &mut dyn GraphicsDevice) {
        let format = AttributeFormat {
            components: attribute.packed_components(),
            component_type: ComponentType::F32,
            stride: 0,
            offset: 0,
        };
        device.vertex_attribute_pointer(attribute.slot(), format, self.vertex_source());
        state.set_bool(attribute.array_state(), true);
    }

    /// Disable an attribute bound with [`bind_attribute`](Self::bind_attribute)
    pub fn unbind_attribute(&self, attribute: VertexAttribute, state: &mut RendererState) {
        state.set_bool(attribute.array_state(), false);
    }

    /// Point an arbitrary attribute slot at this buffer as packed floats
    pub fn bind_to_slot(&self, slot: u32, components: u8, device: &mut dyn GraphicsDevice) {
        let format = AttributeFormat {
            components,
            component_type: ComponentType::F32,
            stride: 0,
            offset: 0,
        };
        device.vertex_attribute_pointer(slot, format, self.vertex_source());
    }

    fn draw(&self, primitive: Primitive, device: &mut dyn GraphicsDevice) {
        if !precondition!(self.index_data, "RenderBuffer: drawing {:?} from a non-index buffer", primitive) {
            return;
        }
        device.draw_indexed(primitive, self.index_count(), self.index_source());
    }

    /// Draw the active indices as a triangle strip
    pub fn tri_strip(&self, device: &mut dyn GraphicsDevice) {
        self.draw(Primitive::TriangleStrip, device);
    }

    /// Draw the active indices as independent triangles
    pub fn tri_list(&self, device: &mut dyn GraphicsDevice) {
        self.draw(Primitive::Triangles, device);
    }

    /// Draw the active indices as a triangle fan
    pub fn tri_fan(&self, device: &mut dyn GraphicsDevice) {
        self.draw(Primitive::TriangleFan, device);
    }

    /// Draw the active indices as a line strip
    pub fn line_strip(&self, device: &mut dyn GraphicsDevice) {
        self.draw(Primitive::LineStrip, device);
    }

    /// Draw the active indices as independent lines
    pub fn line_list(&self, device: &mut dyn GraphicsDevice) {
        self.draw(Primitive::Lines, device);
    }

    /// Number of indices in the active array
    pub fn index_count(&self) -> usize {
        self.data.len() / size_of::<u16>()
    }

    /// Number of vertices in the active array
    pub fn position_count(&self) -> usize {
        match self.layout() {
            Some(layout) if self.content.has_positions() => self.data.len() / layout.stride,
            _ => {
                precondition!(false, "RenderBuffer: {:?} content has no positions", self.content);
                0
            }
        }
    }

    /// Read back vertex `index`'s position
    pub fn position(&self, index: usize) -> Vec3 {
        let count = self.position_count();
        if !precondition!(index < count, "RenderBuffer: position {} out of range ({} vertices)", index, count) {
            return Vec3::zeros();
        }
        let (stride, offset) = match self.layout().and_then(|layout| layout.position.map(|p| (layout.stride, p.offset))) {
            Some(found) => found,
            None => return Vec3::zeros(),
        };
        let start = index * stride + offset;
        let xyz: [f32; 3] = bytemuck::pod_read_unaligned(&self.data[start..start + size_of::<[f32; 3]>()]);
        Vec3::new(xyz[0], xyz[1], xyz[2])
    }

    /// Release the GPU buffer object, keeping the CPU copy
    pub fn unmap(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(id) = self.gpu.take() {
            device.delete_buffer(id);
            self.gpu_capacity = 0;
        }
    }

    /// Recreate the GPU buffer object and re-upload the CPU copy
    pub fn map(&mut self, device: &mut dyn GraphicsDevice) {
        self.acquire_gpu_buffer(device);
        if !self.data.is_empty() {
            self.upload(device);
        }
    }

    /// Content of the active array
    pub fn content_type(&self) -> ContentType {
        self.content
    }

    /// Whether the buffer holds index data
    pub fn is_index_data(&self) -> bool {
        self.index_data
    }

    /// Requested storage policy
    pub fn usage(&self) -> BufferUsage {
        self.usage
    }

    /// GPU buffer object, if one is live
    pub fn gpu_buffer(&self) -> Option<GpuBufferId> {
        self.gpu
    }

    /// Bytes allocated in the GPU buffer object
    pub fn gpu_capacity(&self) -> usize {
        self.gpu_capacity
    }

    /// Active bytes
    pub fn len_bytes(&self) -> usize {
        self.data.len()
    }

    /// Allocated CPU bytes
    pub fn capacity_bytes(&self) -> usize {
        self.data.capacity()
    }

    /// Active CPU bytes
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}

impl Drop for RenderBuffer {
    fn drop(&mut self) {
        if let Some(id) = self.gpu {
            log::warn!("RenderBuffer: dropped while {:?} is still live on the device", id);
        }
    }
}
