//! Registry of every live render buffer
//!
//! Buffers are addressed by [`BufferKey`]. The registry is the only thing
//! that can reach every buffer at once, which the device reset points need.

use slotmap::{new_key_type, SlotMap};

use super::render_buffer::RenderBuffer;
use crate::render::api::{BufferUsage, GraphicsDevice};

new_key_type! {
    /// Handle to a render buffer in a [`BufferRegistry`]
    pub struct BufferKey;
}

/// Owner of all render buffers
#[derive(Debug, Default)]
pub struct BufferRegistry {
    buffers: SlotMap<BufferKey, RenderBuffer>,
}

impl BufferRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer and register it
    pub fn create(&mut self, device: &mut dyn GraphicsDevice, usage: BufferUsage) -> BufferKey {
        self.insert(RenderBuffer::new(device, usage))
    }

    /// Register an existing buffer
    pub fn insert(&mut self, buffer: RenderBuffer) -> BufferKey {
        self.buffers.insert(buffer)
    }

    /// Look up a buffer
    pub fn get(&self, key: BufferKey) -> Option<&RenderBuffer> {
        self.buffers.get(key)
    }

    /// Look up a buffer mutably
    pub fn get_mut(&mut self, key: BufferKey) -> Option<&mut RenderBuffer> {
        self.buffers.get_mut(key)
    }

    /// Release a buffer's GPU object and remove it
    pub fn destroy(&mut self, key: BufferKey, device: &mut dyn GraphicsDevice) -> bool {
        match self.buffers.remove(key) {
            Some(mut buffer) => {
                buffer.unmap(device);
                true
            }
            None => false,
        }
    }

    /// Destroy every buffer
    pub fn clear(&mut self, device: &mut dyn GraphicsDevice) {
        for (_, mut buffer) in self.buffers.drain() {
            buffer.unmap(device);
        }
    }

    /// Release every GPU buffer object, keeping the CPU copies
    pub fn unmap_all(&mut self, device: &mut dyn GraphicsDevice) {
        for buffer in self.buffers.values_mut() {
            buffer.unmap(device);
        }
        log::info!("BufferRegistry: unmapped {} buffers", self.buffers.len());
    }

    /// Recreate every GPU buffer object and re-upload the CPU copies
    pub fn map_all(&mut self, device: &mut dyn GraphicsDevice) {
        for buffer in self.buffers.values_mut() {
            buffer.map(device);
        }
        log::info!("BufferRegistry: mapped {} buffers", self.buffers.len());
    }

    /// Number of registered buffers
    pub fn len(&self) -> usize {
        self.buffers.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.buffers.is_empty()
    }

    /// Iterate over every buffer
    pub fn iter(&self) -> impl Iterator<Item = (BufferKey, &RenderBuffer)> {
        self.buffers.iter()
    }
}
