//! Material handles as seen by the render queue
//!
//! The queue never looks inside a material beyond its layer and flags; it
//! only needs to compare materials for batching and emit a "set material"
//! command when a batch starts.

use std::sync::Arc;

use bitflags::bitflags;

bitflags! {
    /// Flags that route a material to a render stage
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct MaterialFlags: u32 {
        /// Drawn in the glow stage
        const GLOW = 1 << 0;
        /// Drawn after glow compositing
        const POST_GLOW = 1 << 1;
    }
}

/// Material value captured by batches
///
/// Cloning is cheap: the name is shared.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Material {
    name: Arc<str>,
    layer: i32,
    flags: MaterialFlags,
}

impl Material {
    /// Create a material on a layer with no stage flags
    pub fn new(name: impl Into<Arc<str>>, layer: i32) -> Self {
        Self {
            name: name.into(),
            layer,
            flags: MaterialFlags::empty(),
        }
    }

    /// Replace the stage flags
    pub fn with_flags(mut self, flags: MaterialFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Material name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Draw layer; lower layers draw first within a stage
    pub fn layer(&self) -> i32 {
        self.layer
    }

    /// Stage flags
    pub fn flags(&self) -> MaterialFlags {
        self.flags
    }

    /// Whether the material renders in the glow stage
    pub fn is_glow(&self) -> bool {
        self.flags.contains(MaterialFlags::GLOW)
    }

    /// Whether the material renders after glow compositing
    pub fn is_post_glow(&self) -> bool {
        self.flags.contains(MaterialFlags::POST_GLOW)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality_is_by_value() {
        let a = Material::new("rock", 2);
        let b = Material::new(String::from("rock"), 2);
        assert_eq!(a, b);
        assert_ne!(a, b.clone().with_flags(MaterialFlags::GLOW));
        assert_ne!(a, Material::new("rock", 3));
    }

    #[test]
    fn test_flag_queries() {
        let material = Material::new("halo", 0).with_flags(MaterialFlags::GLOW | MaterialFlags::POST_GLOW);
        assert!(material.is_glow());
        assert!(material.is_post_glow());
        assert!(!Material::new("plain", 0).is_glow());
    }
}
