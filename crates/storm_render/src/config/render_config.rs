//! # Renderer Configuration
//!
//! Tuning knobs for the render queue and render buffers. Everything has a
//! sensible default so an empty config file is valid.

use serde::{Deserialize, Serialize};

use super::{Config, ConfigError};
use crate::render::buffer::BufferUsage;
use crate::render::queue::MIN_STAGE_COUNT;

/// Render queue sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderQueueConfig {
    /// Number of ordered stages; the first three are normal, glow, post-glow
    pub stage_count: usize,
    /// Initial command capacity of the unbatched generic list
    pub generic_list_capacity: usize,
    /// Default command capacity for per-frame temporary batch lists
    pub temporary_list_capacity: usize,
}

impl Default for RenderQueueConfig {
    fn default() -> Self {
        Self {
            stage_count: MIN_STAGE_COUNT,
            generic_list_capacity: 1024,
            temporary_list_capacity: 256,
        }
    }
}

impl RenderQueueConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stage_count < MIN_STAGE_COUNT {
            return Err(ConfigError::Invalid(format!(
                "stage_count must be at least {MIN_STAGE_COUNT}, got {}",
                self.stage_count
            )));
        }
        Ok(())
    }
}

/// Render buffer policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Usage hint for buffers created through the render context
    pub default_usage: BufferUsage,
    /// Set to false to force every buffer onto the CPU-array path
    pub use_buffer_objects: bool,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            default_usage: BufferUsage::Static,
            use_buffer_objects: true,
        }
    }
}

impl BufferConfig {
    /// Usage to create new buffers with, after applying `use_buffer_objects`
    pub fn effective_usage(&self) -> BufferUsage {
        if self.use_buffer_objects {
            self.default_usage
        } else {
            BufferUsage::CpuOnly
        }
    }
}

/// Top-level renderer configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RendererConfig {
    /// Log filter `RenderContext::new` installs through
    /// `foundation::logging::init_with_filter`, unless a logger is already set
    pub log_level: String,
    /// Render queue sizing
    pub queue: RenderQueueConfig,
    /// Render buffer policy
    pub buffers: BufferConfig,
}

impl Default for RendererConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            queue: RenderQueueConfig::default(),
            buffers: BufferConfig::default(),
        }
    }
}

impl RendererConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.log_level.is_empty() {
            return Err(ConfigError::Invalid("log_level cannot be empty".to_string()));
        }
        self.queue.validate()
    }
}

impl Config for RendererConfig {}
