//! Render buffers: vertex and index storage
//!
//! - `vertex`: packed vertex structs and their layout tables
//! - `render_buffer`: a single CPU/GPU buffer
//! - `registry`: ownership of every buffer for device reset

pub mod registry;
pub mod render_buffer;
pub mod vertex;

pub use crate::render::api::BufferUsage;
pub use registry::{BufferKey, BufferRegistry};
pub use render_buffer::{RenderBuffer, VertexAttribute};
pub use vertex::{
    ContentType, VertexComponents, VertexFormat, VertexLayout, VertexPc, VertexPcn, VertexPcnt,
    VertexPct, VertexPn, VertexPnt, VertexPt,
};
