//! # Storm Render
//!
//! The batching core of a 2D/3D game renderer: scene traversal submits
//! (material, transform, geometry) triples, the render queue groups them by
//! material into layer-sorted batches across ordered stages, and replays the
//! frame as a single display list with a minimal number of state changes.
//!
//! ## Features
//!
//! - **Render Queue**: pooled, allocation-free batching with a transform stack
//! - **Render Buffers**: CPU vertex/index arrays mirrored into GPU buffers
//! - **Renderer State**: lazily flushed GPU state with change detection
//! - **Attribute Binding**: vertex-array object caching
//! - **Headless Device**: run and test the whole pipeline without a GPU
//!
//! ## Quick Start
//!
//! ```rust
//! use std::rc::Rc;
//! use storm_render::prelude::*;
//!
//! let config = RendererConfig::default();
//! let mut context = RenderContext::new(Box::new(HeadlessDevice::new()), &config)?;
//! let camera = SceneCamera::Flat(Camera2D::new(Vec2::zeros(), 100.0));
//!
//! context.begin_frame(&camera, Orientation::Normal);
//! let ship = Fragment::new(Material::new("ship", 1), Rc::new(DisplayList::new()));
//! context.queue_mut().push_translation(&Vec3::new(10.0, 0.0, 0.0));
//! context.queue_mut().add_fragment_batch(&ship);
//! context.queue_mut().pop_matrix();
//!
//! let mut frame = DisplayList::new();
//! context.end_frame(&mut frame);
//! assert_eq!(frame.len(), 3);
//! # Ok::<(), RenderError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod foundation;
pub mod render;

/// Common imports for renderer users
pub mod prelude {
    pub use crate::{
        config::{Config, RendererConfig},
        foundation::math::{Mat4, Quat, Transform, Transform2D, Vec2, Vec3},
        render::{
            AttributeBinding, BufferKey, Camera2D, Camera3D, ContentType, DisplayCommand, DisplayList,
            Fragment, GraphicsDevice, HeadlessDevice, Material, MaterialFlags, Orientation, RenderContext,
            RenderError, RenderQueue, RenderResult, RendererState, SceneCamera,
        },
    };
}
