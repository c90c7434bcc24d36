//! # Attribute Binding
//!
//! Wires shader attribute slots to vertex data and caches the result in a
//! vertex-array object. Slots 0-3 (position, texel, normal, color) come from
//! a single interleaved render buffer; slots from [`FIRST_EXTENSION_SLOT`]
//! up are bound individually, either from a render buffer or from a client
//! array the binding owns.
//!
//! Attribute-array enables live in the vertex-array object, so slots 0-3
//! are enabled or disabled directly while the object is filled rather than
//! through [`RendererState`]'s diff. After every bind the state tables are
//! told what the device now holds for those slots.
//!
//! When nothing has changed since the last bind, binding is a single
//! vertex-array bind. A change of source, or a source whose GPU buffer was
//! recreated (device reset), refills the object. Devices without
//! vertex-array objects get every attribute rebound on each call.

use crate::foundation::logging::precondition;
use crate::render::api::{
    AttributeFormat, ComponentType, GpuBufferId, GraphicsDevice, VertexArrayId, VertexSource,
};
use crate::render::buffer::{BufferKey, BufferRegistry, VertexAttribute};
use crate::render::state::RendererState;

/// First slot available for extension attributes
pub const FIRST_EXTENSION_SLOT: u32 = 4;

/// One past the highest attribute slot
pub const MAX_ATTRIBUTE_SLOTS: u32 = 16;

#[derive(Debug, Clone, PartialEq)]
enum AttributeSource {
    Buffer { key: BufferKey, components: u8 },
    Client { data: Vec<f32>, components: u8 },
}

/// Attribute slot wiring for one drawable
#[derive(Debug, Default)]
pub struct AttributeBinding {
    vertex_buffer: Option<BufferKey>,
    extensions: Vec<Option<AttributeSource>>,
    vertex_array: Option<VertexArrayId>,
    vertex_arrays_unsupported: bool,
    dirty: bool,
    /// Slots 0-3 enabled by the last fill, indexed by slot
    core_arrays: [bool; 4],
    /// GPU buffers the last fill pointed at, in source order
    wired_buffers: Vec<Option<GpuBufferId>>,
}

impl AttributeBinding {
    /// Create a binding with nothing attached
    pub fn new() -> Self {
        Self {
            dirty: true,
            ..Default::default()
        }
    }

    /// Source slots 0-3 from an interleaved render buffer
    pub fn set_vertex_attributes(&mut self, key: BufferKey) {
        if self.vertex_buffer != Some(key) {
            self.vertex_buffer = Some(key);
            self.dirty = true;
        }
    }

    /// Stop sourcing slots 0-3 from a render buffer
    pub fn clear_vertex_attributes(&mut self) {
        if self.vertex_buffer.take().is_some() {
            self.dirty = true;
        }
    }

    /// Bind an extension slot to a render buffer of packed floats
    pub fn set_attribute_buffer(&mut self, slot: u32, key: BufferKey, components: u8) {
        if !precondition!(
            (1..=4).contains(&components),
            "AttributeBinding: {} components is not a valid attribute width",
            components
        ) {
            return;
        }
        self.set_source(slot, AttributeSource::Buffer { key, components });
    }

    /// Bind an extension slot to a copy of a client array
    pub fn set_attribute_array<const N: usize>(&mut self, slot: u32, values: &[[f32; N]]) {
        if !precondition!(
            (2..=4).contains(&N),
            "AttributeBinding: {} components is not a valid client attribute width",
            N
        ) {
            return;
        }
        let data: Vec<f32> = values.iter().flatten().copied().collect();
        let components = u8::try_from(N).unwrap_or(4);
        self.set_source(slot, AttributeSource::Client { data, components });
    }

    /// Detach an extension slot
    pub fn clear_attribute(&mut self, slot: u32) {
        if let Some(entry) = Self::extension_index(slot).and_then(|index| self.extensions.get_mut(index)) {
            if entry.take().is_some() {
                self.dirty = true;
            }
        }
    }

    fn extension_index(slot: u32) -> Option<usize> {
        let valid = (FIRST_EXTENSION_SLOT..MAX_ATTRIBUTE_SLOTS).contains(&slot);
        if !precondition!(
            valid,
            "AttributeBinding: slot {} is outside the extension range {}..{}",
            slot,
            FIRST_EXTENSION_SLOT,
            MAX_ATTRIBUTE_SLOTS
        ) {
            return None;
        }
        usize::try_from(slot - FIRST_EXTENSION_SLOT).ok()
    }

    fn set_source(&mut self, slot: u32, source: AttributeSource) {
        let Some(index) = Self::extension_index(slot) else {
            return;
        };
        if self.extensions.len() <= index {
            self.extensions.resize(index + 1, None);
        }
        self.extensions[index] = Some(source);
        self.dirty = true;
    }

    /// Make the attributes current on the device
    pub fn bind(&mut self, buffers: &BufferRegistry, state: &mut RendererState, device: &mut dyn GraphicsDevice) {
        if self.vertex_array.is_none() && !self.vertex_arrays_unsupported {
            match device.create_vertex_array() {
                Ok(id) => {
                    self.vertex_array = Some(id);
                    self.dirty = true;
                }
                Err(err) => {
                    log::warn!("AttributeBinding: {}, binding attributes directly", err);
                    self.vertex_arrays_unsupported = true;
                }
            }
        }

        match self.vertex_array {
            Some(id) => {
                device.bind_vertex_array(Some(id));
                if self.dirty || self.buffers_moved(buffers) {
                    self.bind_all(buffers, device);
                    self.dirty = false;
                }
            }
            None => self.bind_all(buffers, device),
        }

        for (attribute, enabled) in VertexAttribute::ALL.into_iter().zip(self.core_arrays) {
            state.sync_bool(attribute.array_state(), enabled);
        }
    }

    /// GPU buffers the sources currently resolve to, in source order
    fn source_buffers<'a>(&'a self, buffers: &'a BufferRegistry) -> impl Iterator<Item = Option<GpuBufferId>> + 'a {
        let extension_keys = self.extensions.iter().filter_map(|source| match source {
            Some(AttributeSource::Buffer { key, .. }) => Some(*key),
            _ => None,
        });
        self.vertex_buffer
            .into_iter()
            .chain(extension_keys)
            .map(|key| buffers.get(key).and_then(|buffer| buffer.gpu_buffer()))
    }

    fn buffers_moved(&self, buffers: &BufferRegistry) -> bool {
        let moved = !self.wired_buffers.iter().copied().eq(self.source_buffers(buffers));
        if moved {
            log::debug!("AttributeBinding: source buffers were recreated, refilling {:?}", self.vertex_array);
        }
        moved
    }

    fn bind_all(&mut self, buffers: &BufferRegistry, device: &mut dyn GraphicsDevice) {
        self.core_arrays = match self.vertex_buffer.map(|key| (key, buffers.get(key))) {
            Some((_, Some(buffer))) => buffer.bind_arrays(device),
            missing => {
                if let Some((key, _)) = missing {
                    log::warn!("AttributeBinding: vertex buffer {:?} no longer exists", key);
                }
                for attribute in VertexAttribute::ALL {
                    device.set_vertex_attribute_array(attribute.slot(), false);
                }
                [false; 4]
            }
        };

        for (slot, source) in (FIRST_EXTENSION_SLOT..).zip(&self.extensions) {
            match source {
                Some(AttributeSource::Buffer { key, components }) => match buffers.get(*key) {
                    Some(buffer) => {
                        device.set_vertex_attribute_array(slot, true);
                        buffer.bind_to_slot(slot, *components, device);
                    }
                    None => {
                        log::warn!("AttributeBinding: attribute buffer {:?} no longer exists", key);
                        device.set_vertex_attribute_array(slot, false);
                    }
                },
                Some(AttributeSource::Client { data, components }) => {
                    let format = AttributeFormat {
                        components: *components,
                        component_type: ComponentType::F32,
                        stride: 0,
                        offset: 0,
                    };
                    device.set_vertex_attribute_array(slot, true);
                    device.vertex_attribute_pointer(slot, format, VertexSource::Client(bytemuck::cast_slice(data)));
                }
                None => device.set_vertex_attribute_array(slot, false),
            }
        }

        let wired: Vec<Option<GpuBufferId>> = self.source_buffers(buffers).collect();
        self.wired_buffers = wired;
    }

    /// Forget the vertex-array object without deleting it.
    ///
    /// For a lost device context, where the object died with the context;
    /// the next bind creates and fills a new one.
    pub fn invalidate(&mut self) {
        self.vertex_array = None;
        self.vertex_arrays_unsupported = false;
        self.dirty = true;
    }

    /// Unbind the vertex-array object, if one is in use
    pub fn unbind(&self, device: &mut dyn GraphicsDevice) {
        if self.vertex_array.is_some() {
            device.bind_vertex_array(None);
        }
    }

    /// Delete the vertex-array object; the next bind rebuilds it
    pub fn release(&mut self, device: &mut dyn GraphicsDevice) {
        if let Some(id) = self.vertex_array.take() {
            device.delete_vertex_array(id);
        }
        self.dirty = true;
    }

    /// Whether the next bind will rewire the attributes
    pub fn is_dirty(&self) -> bool {
        self.dirty || self.vertex_array.is_none()
    }

    /// Vertex-array object in use
    pub fn vertex_array(&self) -> Option<VertexArrayId> {
        self.vertex_array
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{BufferUsage, DeviceCall, HeadlessDevice};
    use crate::render::buffer::VertexPn;
    use crate::render::state::BoolState;

    fn setup() -> (HeadlessDevice, BufferRegistry, BufferKey) {
        let mut device = HeadlessDevice::new();
        let mut buffers = BufferRegistry::new();
        let key = buffers.create(&mut device, BufferUsage::Static);
        buffers.get_mut(key).unwrap().set_array(
            &mut device,
            &[VertexPn { position: [0.0; 3], normal: [0.0, 1.0, 0.0] }],
        );
        device.clear_calls();
        (device, buffers, key)
    }

    fn pointer_count(device: &HeadlessDevice) -> usize {
        device.count_calls(|call| matches!(call, DeviceCall::VertexAttributePointer { .. }))
    }

    #[test]
    fn test_unchanged_binding_only_binds_vertex_array() {
        let (mut device, mut buffers, key) = setup();
        let mut state = RendererState::new();
        let mut binding = AttributeBinding::new();
        binding.set_vertex_attributes(key);

        binding.bind(&buffers, &mut state, &mut device);
        let vao = binding.vertex_array().unwrap();
        assert_eq!(pointer_count(&device), 2);
        assert!(!binding.is_dirty());

        device.clear_calls();
        binding.bind(&buffers, &mut state, &mut device);
        assert_eq!(device.calls(), &[DeviceCall::BindVertexArray(Some(vao))]);

        binding.release(&mut device);
        buffers.clear(&mut device);
    }

    #[test]
    fn test_change_triggers_rebind() {
        let (mut device, mut buffers, key) = setup();
        let mut state = RendererState::new();
        let mut binding = AttributeBinding::new();
        binding.set_vertex_attributes(key);
        binding.bind(&buffers, &mut state, &mut device);

        binding.set_attribute_array(5, &[[1.0, 2.0], [3.0, 4.0]]);
        assert!(binding.is_dirty());
        device.clear_calls();
        binding.bind(&buffers, &mut state, &mut device);

        assert!(device.calls().contains(&DeviceCall::SetVertexAttributeArray(4, false)));
        assert!(device.calls().contains(&DeviceCall::SetVertexAttributeArray(5, true)));
        assert!(device.calls().iter().any(|call| matches!(
            call,
            DeviceCall::VertexAttributePointer { slot: 5, format: AttributeFormat { components: 2, .. }, buffer: None }
        )));

        binding.release(&mut device);
        buffers.clear(&mut device);
    }

    #[test]
    fn test_each_vertex_array_gets_its_own_enables() {
        let (mut device, mut buffers, key) = setup();
        let mut state = RendererState::new();
        let mut first = AttributeBinding::new();
        let mut second = AttributeBinding::new();
        first.set_vertex_attributes(key);
        second.set_vertex_attributes(key);

        first.bind(&buffers, &mut state, &mut device);
        second.bind(&buffers, &mut state, &mut device);

        for vao in [first.vertex_array(), second.vertex_array()] {
            assert!(vao.is_some());
            assert!(device.attribute_array_enabled(vao, 0));
            assert!(!device.attribute_array_enabled(vao, 1));
            assert!(device.attribute_array_enabled(vao, 2));
            assert!(!device.attribute_array_enabled(vao, 3));
        }
        assert!(state.get_bool(BoolState::VertexArray));
        assert!(state.get_bool(BoolState::NormalArray));
        device.clear_calls();
        assert_eq!(state.flush(&mut device), 0);

        first.release(&mut device);
        second.release(&mut device);
        buffers.clear(&mut device);
    }

    #[test]
    fn test_bind_leaves_unrelated_state_pending() {
        let (mut device, mut buffers, key) = setup();
        let mut state = RendererState::new();
        state.set_bool(BoolState::Blend, true);
        let mut binding = AttributeBinding::new();
        binding.set_vertex_attributes(key);

        binding.bind(&buffers, &mut state, &mut device);
        assert_eq!(device.count_calls(|call| matches!(call, DeviceCall::SetCapability(..))), 0);
        assert_eq!(state.flush(&mut device), 1);

        binding.release(&mut device);
        buffers.clear(&mut device);
    }

    #[test]
    fn test_recreated_buffers_refill_the_vertex_array() {
        let (mut device, mut buffers, key) = setup();
        let mut state = RendererState::new();
        let mut binding = AttributeBinding::new();
        binding.set_vertex_attributes(key);
        binding.bind(&buffers, &mut state, &mut device);
        let vao = binding.vertex_array();
        let old_id = buffers.get(key).unwrap().gpu_buffer();

        buffers.unmap_all(&mut device);
        buffers.map_all(&mut device);
        state.force(&mut device);
        let new_id = buffers.get(key).unwrap().gpu_buffer();
        assert_ne!(old_id, new_id);

        device.clear_calls();
        binding.bind(&buffers, &mut state, &mut device);
        assert_eq!(pointer_count(&device), 2);
        assert_eq!(device.attribute_buffer(vao, 0), new_id);
        assert_eq!(device.attribute_buffer(vao, 2), new_id);

        device.clear_calls();
        binding.bind(&buffers, &mut state, &mut device);
        assert_eq!(device.calls(), &[DeviceCall::BindVertexArray(vao)]);

        binding.release(&mut device);
        buffers.clear(&mut device);
    }

    #[test]
    fn test_invalidate_builds_a_fresh_vertex_array() {
        let (mut device, mut buffers, key) = setup();
        let mut state = RendererState::new();
        let mut binding = AttributeBinding::new();
        binding.set_vertex_attributes(key);
        binding.bind(&buffers, &mut state, &mut device);
        let lost = binding.vertex_array();

        binding.invalidate();
        assert!(binding.is_dirty());
        binding.bind(&buffers, &mut state, &mut device);
        let rebuilt = binding.vertex_array();

        assert_ne!(lost, rebuilt);
        assert!(device.attribute_array_enabled(rebuilt, 0));
        assert_eq!(device.attribute_buffer(rebuilt, 0), buffers.get(key).unwrap().gpu_buffer());

        binding.release(&mut device);
        buffers.clear(&mut device);
    }

    #[test]
    fn test_without_vertex_arrays_rebinds_every_call() {
        let mut device = HeadlessDevice::new().without_vertex_arrays();
        let mut buffers = BufferRegistry::new();
        let key = buffers.create(&mut device, BufferUsage::Static);
        buffers.get_mut(key).unwrap().set_positions(&mut device, &[[1.0; 3]]);
        let mut state = RendererState::new();
        let mut binding = AttributeBinding::new();
        binding.set_vertex_attributes(key);

        binding.bind(&buffers, &mut state, &mut device);
        binding.bind(&buffers, &mut state, &mut device);
        assert!(binding.vertex_array().is_none());
        assert_eq!(pointer_count(&device), 2);
        assert_eq!(device.count_calls(|call| matches!(call, DeviceCall::BindVertexArray(_))), 0);

        buffers.clear(&mut device);
    }

    #[test]
    fn test_extension_buffer_and_clear() {
        let (mut device, mut buffers, key) = setup();
        let extra = buffers.create(&mut device, BufferUsage::Static);
        buffers.get_mut(extra).unwrap().set_colors(&mut device, &[[1.0; 4]]);
        let mut state = RendererState::new();
        let mut binding = AttributeBinding::new();
        binding.set_vertex_attributes(key);
        binding.set_attribute_buffer(4, extra, 4);
        binding.bind(&buffers, &mut state, &mut device);

        let extra_id = buffers.get(extra).unwrap().gpu_buffer();
        assert!(device.calls().iter().any(|call| matches!(
            call,
            DeviceCall::VertexAttributePointer { slot: 4, buffer, .. } if *buffer == extra_id
        )));

        binding.clear_attribute(4);
        device.clear_calls();
        binding.bind(&buffers, &mut state, &mut device);
        assert!(device.calls().contains(&DeviceCall::SetVertexAttributeArray(4, false)));

        binding.release(&mut device);
        assert_eq!(device.live_vertex_array_count(), 0);
        buffers.clear(&mut device);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "outside the extension range")]
    fn test_core_slot_rejected_for_extensions() {
        let mut binding = AttributeBinding::new();
        binding.set_attribute_array(2, &[[0.0, 0.0, 0.0]]);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_core_slot_ignored_for_extensions() {
        let mut binding = AttributeBinding::new();
        binding.set_attribute_array(2, &[[0.0, 0.0, 0.0]]);
        binding.clear_attribute(99);
        assert!(binding.extensions.is_empty());
    }
}
