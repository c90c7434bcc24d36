//! # Rendering System
//!
//! Turns per-frame (material, transform, geometry) submissions into an
//! ordered stream of display commands, batched by material so that state
//! changes are minimized.
//!
//! ## Architecture
//!
//! - **RenderQueue**: ordered stages of material batches plus a transform stack
//! - **RenderBuffer**: CPU-side vertex/index storage mirrored into GPU buffers
//! - **RendererState**: lazily flushed GPU state with change detection
//! - **AttributeBinding**: vertex-array object wiring for shader attributes
//! - **GraphicsDevice**: the only place GPU calls leave the crate
//!
//! Dependency order is buffer, attribute binding, state, queue, context.

pub mod api;
pub mod attribute_binding;
pub mod buffer;
pub mod context;
pub mod display_list;
pub mod fragment;
pub mod material;
pub mod queue;
pub mod state;

pub use api::{GraphicsDevice, HeadlessDevice};
pub use attribute_binding::AttributeBinding;
pub use buffer::{BufferKey, BufferRegistry, ContentType, RenderBuffer};
pub use context::RenderContext;
pub use display_list::{DisplayCommand, DisplayList};
pub use fragment::Fragment;
pub use material::{Material, MaterialFlags};
pub use queue::{BatchStats, Camera2D, Camera3D, Orientation, RenderQueue, SceneCamera};
pub use state::RendererState;

use thiserror::Error;

/// Errors that can occur during rendering operations
///
/// Programmer errors (stack imbalance, bad slot indices) are not represented
/// here; those go through `precondition!`. These are conditions a caller can
/// react to, usually by degrading to a slower path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// Renderer initialization failed during setup
    #[error("Renderer initialization failed: {0}")]
    InitializationFailed(String),

    /// A GPU resource (buffer object, vertex array) could not be created
    #[error("Resource creation failed: {0}")]
    ResourceCreationFailed(String),

    /// Backend-specific error occurred
    #[error("Backend error: {0}")]
    BackendError(String),

    /// Configuration values the renderer cannot work with
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for rendering operations
pub type RenderResult<T> = Result<T, RenderError>;

impl From<crate::config::ConfigError> for RenderError {
    fn from(err: crate::config::ConfigError) -> Self {
        RenderError::InvalidConfiguration(err.to_string())
    }
}
