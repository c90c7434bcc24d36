//! Headless graphics device
//!
//! Keeps buffer contents in memory and records every call in order. Used by
//! the test-suite and by tools that need to run the renderer without a
//! window. Failure toggles simulate drivers without buffer objects or
//! vertex-array objects.

use std::collections::HashMap;

use super::graphics_device::{
    AttributeFormat, BufferTarget, BufferUsage, Capability, CullFace, GpuBufferId, GraphicsDevice,
    IndexSource, Primitive, VertexArrayId, VertexSource,
};
use crate::render::{RenderError, RenderResult};

/// One recorded device call
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    /// `create_buffer` succeeded
    CreateBuffer(GpuBufferId),
    /// `delete_buffer`
    DeleteBuffer(GpuBufferId),
    /// `allocate_buffer` with the uploaded size in bytes
    AllocateBuffer {
        /// Buffer
        id: GpuBufferId,
        /// Binding point
        target: BufferTarget,
        /// Bytes uploaded
        size: usize,
        /// Usage hint
        usage: BufferUsage,
    },
    /// A successful `write_buffer`
    WriteBuffer {
        /// Buffer
        id: GpuBufferId,
        /// Bytes written
        size: usize,
    },
    /// `set_capability`
    SetCapability(Capability, bool),
    /// `set_depth_mask`
    SetDepthMask(bool),
    /// `set_vertex_attribute_array`
    SetVertexAttributeArray(u32, bool),
    /// `set_cull_face`
    SetCullFace(CullFace),
    /// `set_polygon_offset`
    SetPolygonOffset {
        /// Slope factor
        factor: f32,
        /// Constant units
        units: f32,
    },
    /// `vertex_attribute_pointer`
    VertexAttributePointer {
        /// Attribute slot
        slot: u32,
        /// Layout
        format: AttributeFormat,
        /// Source buffer, `None` for client memory
        buffer: Option<GpuBufferId>,
    },
    /// `draw_indexed`
    DrawIndexed {
        /// Topology
        primitive: Primitive,
        /// Index count
        count: usize,
        /// Index buffer, `None` for client memory
        buffer: Option<GpuBufferId>,
    },
    /// `create_vertex_array` succeeded
    CreateVertexArray(VertexArrayId),
    /// `bind_vertex_array`
    BindVertexArray(Option<VertexArrayId>),
    /// `delete_vertex_array`
    DeleteVertexArray(VertexArrayId),
}

#[derive(Debug, Default)]
struct HeadlessVertexArray {
    enabled: HashMap<u32, bool>,
    sources: HashMap<u32, Option<GpuBufferId>>,
}

#[derive(Debug)]
struct HeadlessBuffer {
    target: Option<BufferTarget>,
    data: Vec<u8>,
}

/// In-memory recording device
#[derive(Debug)]
pub struct HeadlessDevice {
    buffers: HashMap<GpuBufferId, HeadlessBuffer>,
    vertex_arrays: HashMap<VertexArrayId, HeadlessVertexArray>,
    default_arrays: HeadlessVertexArray,
    bound_vertex_array: Option<VertexArrayId>,
    next_id: u32,
    calls: Vec<DeviceCall>,
    buffer_objects: bool,
    vertex_array_objects: bool,
    fail_writes: bool,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessDevice {
    /// Create a device that supports buffer objects and vertex-array objects
    pub fn new() -> Self {
        Self {
            buffers: HashMap::new(),
            vertex_arrays: HashMap::new(),
            default_arrays: HeadlessVertexArray::default(),
            bound_vertex_array: None,
            next_id: 1,
            calls: Vec::new(),
            buffer_objects: true,
            vertex_array_objects: true,
            fail_writes: false,
        }
    }

    /// Simulate a driver without buffer objects
    pub fn without_buffer_objects(mut self) -> Self {
        self.buffer_objects = false;
        self
    }

    /// Simulate a driver without vertex-array objects
    pub fn without_vertex_arrays(mut self) -> Self {
        self.vertex_array_objects = false;
        self
    }

    /// Make every subsequent `write_buffer` fail as if mapping failed
    pub fn set_fail_writes(&mut self, fail: bool) {
        self.fail_writes = fail;
    }

    /// Every call recorded so far, oldest first
    pub fn calls(&self) -> &[DeviceCall] {
        &self.calls
    }

    /// Drop the recorded calls
    pub fn clear_calls(&mut self) {
        self.calls.clear();
    }

    /// Drain the recorded calls
    pub fn take_calls(&mut self) -> Vec<DeviceCall> {
        std::mem::take(&mut self.calls)
    }

    /// Number of recorded calls matching a predicate
    pub fn count_calls(&self, predicate: impl Fn(&DeviceCall) -> bool) -> usize {
        self.calls.iter().filter(|call| predicate(call)).count()
    }

    /// Current contents of a buffer object
    pub fn buffer_contents(&self, id: GpuBufferId) -> Option<&[u8]> {
        self.buffers.get(&id).map(|buffer| buffer.data.as_slice())
    }

    /// Binding point a buffer object was last allocated for
    pub fn buffer_target(&self, id: GpuBufferId) -> Option<BufferTarget> {
        self.buffers.get(&id).and_then(|buffer| buffer.target)
    }

    /// Number of live buffer objects
    pub fn live_buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Number of live vertex-array objects
    pub fn live_vertex_array_count(&self) -> usize {
        self.vertex_arrays.len()
    }

    /// Vertex-array object currently bound
    pub fn bound_vertex_array(&self) -> Option<VertexArrayId> {
        self.bound_vertex_array
    }

    /// Whether `slot`'s attribute array is enabled in a vertex-array
    /// object, or in the default attribute state for `None`
    pub fn attribute_array_enabled(&self, vertex_array: Option<VertexArrayId>, slot: u32) -> bool {
        self.arrays(vertex_array)
            .and_then(|arrays| arrays.enabled.get(&slot).copied())
            .unwrap_or(false)
    }

    /// Buffer object `slot` was last pointed at, `None` for client memory
    /// or an unset slot
    pub fn attribute_buffer(&self, vertex_array: Option<VertexArrayId>, slot: u32) -> Option<GpuBufferId> {
        self.arrays(vertex_array)
            .and_then(|arrays| arrays.sources.get(&slot).copied())
            .flatten()
    }

    fn arrays(&self, vertex_array: Option<VertexArrayId>) -> Option<&HeadlessVertexArray> {
        match vertex_array {
            Some(id) => self.vertex_arrays.get(&id),
            None => Some(&self.default_arrays),
        }
    }

    fn current_arrays(&mut self) -> &mut HeadlessVertexArray {
        match self.bound_vertex_array.and_then(|id| self.vertex_arrays.get_mut(&id)) {
            Some(arrays) => arrays,
            None => &mut self.default_arrays,
        }
    }

    fn next_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

impl GraphicsDevice for HeadlessDevice {
    fn supports_buffer_objects(&self) -> bool {
        self.buffer_objects
    }

    fn create_buffer(&mut self) -> RenderResult<GpuBufferId> {
        if !self.buffer_objects {
            return Err(RenderError::ResourceCreationFailed(
                "buffer objects are not supported by this device".to_string(),
            ));
        }
        let id = GpuBufferId(self.next_id());
        self.buffers.insert(id, HeadlessBuffer { target: None, data: Vec::new() });
        self.calls.push(DeviceCall::CreateBuffer(id));
        Ok(id)
    }

    fn delete_buffer(&mut self, id: GpuBufferId) {
        if self.buffers.remove(&id).is_none() {
            log::warn!("HeadlessDevice: deleting unknown buffer {:?}", id);
        }
        self.calls.push(DeviceCall::DeleteBuffer(id));
    }

    fn allocate_buffer(&mut self, id: GpuBufferId, target: BufferTarget, data: &[u8], usage: BufferUsage) {
        match self.buffers.get_mut(&id) {
            Some(buffer) => {
                buffer.target = Some(target);
                buffer.data = data.to_vec();
            }
            None => log::warn!("HeadlessDevice: allocating unknown buffer {:?}", id),
        }
        self.calls.push(DeviceCall::AllocateBuffer { id, target, size: data.len(), usage });
    }

    fn write_buffer(&mut self, id: GpuBufferId, _target: BufferTarget, data: &[u8]) -> bool {
        if self.fail_writes {
            return false;
        }
        let Some(buffer) = self.buffers.get_mut(&id) else {
            return false;
        };
        if data.len() > buffer.data.len() {
            return false;
        }
        buffer.data[..data.len()].copy_from_slice(data);
        self.calls.push(DeviceCall::WriteBuffer { id, size: data.len() });
        true
    }

    fn set_capability(&mut self, capability: Capability, enabled: bool) {
        self.calls.push(DeviceCall::SetCapability(capability, enabled));
    }

    fn set_depth_mask(&mut self, enabled: bool) {
        self.calls.push(DeviceCall::SetDepthMask(enabled));
    }

    fn set_vertex_attribute_array(&mut self, slot: u32, enabled: bool) {
        self.current_arrays().enabled.insert(slot, enabled);
        self.calls.push(DeviceCall::SetVertexAttributeArray(slot, enabled));
    }

    fn set_cull_face(&mut self, mode: CullFace) {
        self.calls.push(DeviceCall::SetCullFace(mode));
    }

    fn set_polygon_offset(&mut self, factor: f32, units: f32) {
        self.calls.push(DeviceCall::SetPolygonOffset { factor, units });
    }

    fn vertex_attribute_pointer(&mut self, slot: u32, format: AttributeFormat, source: VertexSource<'_>) {
        let buffer = match source {
            VertexSource::Buffer(id) => Some(id),
            VertexSource::Client(_) => None,
        };
        self.current_arrays().sources.insert(slot, buffer);
        self.calls.push(DeviceCall::VertexAttributePointer { slot, format, buffer });
    }

    fn draw_indexed(&mut self, primitive: Primitive, count: usize, indices: IndexSource<'_>) {
        let buffer = match indices {
            IndexSource::Buffer(id) => Some(id),
            IndexSource::Client(client) => {
                let supplied = client.len() / std::mem::size_of::<u16>();
                if supplied < count {
                    log::warn!("HeadlessDevice: drawing {} indices from {} supplied", count, supplied);
                }
                None
            }
        };
        self.calls.push(DeviceCall::DrawIndexed { primitive, count, buffer });
    }

    fn create_vertex_array(&mut self) -> RenderResult<VertexArrayId> {
        if !self.vertex_array_objects {
            return Err(RenderError::ResourceCreationFailed(
                "vertex-array objects are not supported by this device".to_string(),
            ));
        }
        let id = VertexArrayId(self.next_id());
        self.vertex_arrays.insert(id, HeadlessVertexArray::default());
        self.calls.push(DeviceCall::CreateVertexArray(id));
        Ok(id)
    }

    fn bind_vertex_array(&mut self, id: Option<VertexArrayId>) {
        if let Some(id) = id.filter(|id| !self.vertex_arrays.contains_key(id)) {
            log::warn!("HeadlessDevice: binding unknown vertex array {:?}", id);
        }
        self.bound_vertex_array = id;
        self.calls.push(DeviceCall::BindVertexArray(id));
    }

    fn delete_vertex_array(&mut self, id: VertexArrayId) {
        if self.vertex_arrays.remove(&id).is_none() {
            log::warn!("HeadlessDevice: deleting unknown vertex array {:?}", id);
        }
        if self.bound_vertex_array == Some(id) {
            self.bound_vertex_array = None;
        }
        self.calls.push(DeviceCall::DeleteVertexArray(id));
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::ComponentType;

    #[test]
    fn test_write_within_capacity_updates_prefix() {
        let mut device = HeadlessDevice::new();
        let id = device.create_buffer().unwrap();
        device.allocate_buffer(id, BufferTarget::Vertex, &[0, 0, 0, 0], BufferUsage::Static);

        assert!(device.write_buffer(id, BufferTarget::Vertex, &[7, 8]));
        assert_eq!(device.buffer_contents(id), Some(&[7, 8, 0, 0][..]));
        assert_eq!(device.buffer_target(id), Some(BufferTarget::Vertex));
    }

    #[test]
    fn test_write_beyond_capacity_fails() {
        let mut device = HeadlessDevice::new();
        let id = device.create_buffer().unwrap();
        device.allocate_buffer(id, BufferTarget::Index, &[1, 2], BufferUsage::Dynamic);

        assert!(!device.write_buffer(id, BufferTarget::Index, &[1, 2, 3]));
        device.set_fail_writes(true);
        assert!(!device.write_buffer(id, BufferTarget::Index, &[9]));
        assert_eq!(device.count_calls(|call| matches!(call, DeviceCall::WriteBuffer { .. })), 0);
    }

    #[test]
    fn test_failure_toggles() {
        let mut device = HeadlessDevice::new().without_buffer_objects().without_vertex_arrays();
        assert!(!device.supports_buffer_objects());
        assert!(matches!(device.create_buffer(), Err(RenderError::ResourceCreationFailed(_))));
        assert!(device.create_vertex_array().is_err());
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_attribute_state_is_per_vertex_array() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer().unwrap();
        let first = device.create_vertex_array().unwrap();
        let second = device.create_vertex_array().unwrap();
        let format = AttributeFormat { components: 3, component_type: ComponentType::F32, stride: 0, offset: 0 };

        device.bind_vertex_array(Some(first));
        device.set_vertex_attribute_array(0, true);
        device.vertex_attribute_pointer(0, format, VertexSource::Buffer(buffer));
        device.bind_vertex_array(Some(second));

        assert_eq!(device.bound_vertex_array(), Some(second));
        assert!(device.attribute_array_enabled(Some(first), 0));
        assert!(!device.attribute_array_enabled(Some(second), 0));
        assert!(!device.attribute_array_enabled(None, 0));
        assert_eq!(device.attribute_buffer(Some(first), 0), Some(buffer));
        assert_eq!(device.attribute_buffer(Some(second), 0), None);

        device.delete_vertex_array(second);
        assert_eq!(device.bound_vertex_array(), None);
    }

    #[test]
    fn test_delete_releases_resources() {
        let mut device = HeadlessDevice::new();
        let buffer = device.create_buffer().unwrap();
        let vao = device.create_vertex_array().unwrap();
        assert_ne!(buffer.0, vao.0);

        device.delete_buffer(buffer);
        device.delete_vertex_array(vao);
        assert_eq!(device.live_buffer_count(), 0);
        assert_eq!(device.live_vertex_array_count(), 0);
        assert_eq!(device.take_calls().len(), 4);
        assert!(device.calls().is_empty());
    }
}
