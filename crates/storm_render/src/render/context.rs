//! # Render Context
//!
//! Owns everything a frame needs: the device, the lazily flushed state, the
//! buffer registry and the render queue. Splitting borrows across those
//! fields is the main reason this type exists; most methods just forward.

use crate::config::RendererConfig;
use crate::foundation::logging;
use crate::render::api::{BufferUsage, GraphicsDevice};
use crate::render::attribute_binding::AttributeBinding;
use crate::render::buffer::{BufferKey, BufferRegistry, RenderBuffer};
use crate::render::display_list::DisplayList;
use crate::render::queue::{Orientation, RenderQueue, SceneCamera};
use crate::render::state::RendererState;
use crate::render::RenderResult;

/// Frame driver
pub struct RenderContext {
    device: Box<dyn GraphicsDevice>,
    state: RendererState,
    buffers: BufferRegistry,
    queue: RenderQueue,
    buffer_usage: BufferUsage,
    frame_count: u64,
}

impl std::fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderContext")
            .field("buffers", &self.buffers.len())
            .field("stages", &self.queue.stage_count())
            .field("frame_count", &self.frame_count)
            .finish_non_exhaustive()
    }
}

impl RenderContext {
    /// Create a context around `device`
    pub fn new(device: Box<dyn GraphicsDevice>, config: &RendererConfig) -> RenderResult<Self> {
        config.validate()?;
        if logging::init_with_filter(&config.log_level).is_err() {
            log::debug!("RenderContext: logger already installed, ignoring log_level {}", config.log_level);
        }
        let queue = RenderQueue::with_config(&config.queue)?;
        let buffer_usage = config.buffers.effective_usage();

        log::info!(
            "RenderContext: {} stages, buffers {:?}, buffer objects {}",
            queue.stage_count(),
            buffer_usage,
            if device.supports_buffer_objects() { "available" } else { "unavailable" }
        );

        Ok(Self {
            device,
            state: RendererState::new(),
            buffers: BufferRegistry::new(),
            queue,
            buffer_usage,
            frame_count: 0,
        })
    }

    /// Begin building a frame
    pub fn begin_frame(&mut self, camera: &SceneCamera, orientation: Orientation) {
        self.queue.start_render(camera, orientation);
    }

    /// Append the frame to `output` and recycle the queue
    pub fn end_frame(&mut self, output: &mut DisplayList) {
        self.queue.draw(output);
        self.queue.end_render();
        self.frame_count += 1;
        log::trace!("RenderContext: frame {} emitted {} commands", self.frame_count, output.len());
    }

    /// Flush pending state changes to the device
    pub fn flush_state(&mut self) -> usize {
        self.state.flush(self.device.as_mut())
    }

    /// The device was lost: release every GPU buffer, keeping CPU copies.
    ///
    /// Attribute bindings held elsewhere refill themselves once their
    /// buffers are recreated; if the vertex-array objects died with the
    /// context, call [`AttributeBinding::invalidate`] on them as well.
    pub fn device_lost(&mut self) {
        log::warn!("RenderContext: device lost, releasing GPU buffers");
        self.buffers.unmap_all(self.device.as_mut());
    }

    /// The device is back: recreate GPU buffers and resend all state
    pub fn device_restored(&mut self) -> usize {
        log::info!("RenderContext: device restored");
        self.buffers.map_all(self.device.as_mut());
        self.state.force(self.device.as_mut())
    }

    /// Create a render buffer with the configured usage
    pub fn create_buffer(&mut self) -> BufferKey {
        self.buffers.create(self.device.as_mut(), self.buffer_usage)
    }

    /// Destroy a render buffer
    pub fn destroy_buffer(&mut self, key: BufferKey) -> bool {
        self.buffers.destroy(key, self.device.as_mut())
    }

    /// Run `f` with a buffer and the device
    pub fn with_buffer<R>(
        &mut self,
        key: BufferKey,
        f: impl FnOnce(&mut RenderBuffer, &mut dyn GraphicsDevice) -> R,
    ) -> Option<R> {
        let buffer = self.buffers.get_mut(key)?;
        Some(f(buffer, self.device.as_mut()))
    }

    /// Bind a buffer's vertex attributes
    pub fn bind_buffer(&mut self, key: BufferKey) {
        match self.buffers.get(key) {
            Some(buffer) => buffer.bind(&mut self.state, self.device.as_mut()),
            None => log::warn!("RenderContext: binding missing buffer {:?}", key),
        }
    }

    /// Make an attribute binding current
    pub fn bind_attributes(&mut self, binding: &mut AttributeBinding) {
        binding.bind(&self.buffers, &mut self.state, self.device.as_mut());
    }

    /// The device
    pub fn device(&self) -> &dyn GraphicsDevice {
        self.device.as_ref()
    }

    /// The device, mutably
    pub fn device_mut(&mut self) -> &mut dyn GraphicsDevice {
        self.device.as_mut()
    }

    /// Renderer state
    pub fn state(&self) -> &RendererState {
        &self.state
    }

    /// Renderer state, mutably
    pub fn state_mut(&mut self) -> &mut RendererState {
        &mut self.state
    }

    /// Buffer registry
    pub fn buffers(&self) -> &BufferRegistry {
        &self.buffers
    }

    /// Render queue
    pub fn queue(&self) -> &RenderQueue {
        &self.queue
    }

    /// Render queue, mutably
    pub fn queue_mut(&mut self) -> &mut RenderQueue {
        &mut self.queue
    }

    /// Frames completed
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }
}

impl Drop for RenderContext {
    fn drop(&mut self) {
        self.buffers.clear(self.device.as_mut());
    }
}
