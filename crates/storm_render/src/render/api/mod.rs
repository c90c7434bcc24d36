//! GPU device API
//!
//! The device trait every back-end implements, plus a headless in-memory
//! device used by tests and tools.

pub mod graphics_device;
pub mod headless;

// Re-export commonly used types
pub use graphics_device::{
    AttributeFormat, BufferTarget, BufferUsage, Capability, ComponentType, CullFace, GpuBufferId,
    GraphicsDevice, IndexSource, Primitive, VertexArrayId, VertexSource,
};
pub use headless::{DeviceCall, HeadlessDevice};
