//! Fixed-depth transform stack
//!
//! Slot 0 holds the camera (view) matrix for the frame; every push composes
//! onto the current top. Pushes beyond [`MAX_STACK_DEPTH`] are a programmer
//! error. In release builds they are counted instead of written, and the
//! matching pops consume the count, so a too-deep scene graph degrades to
//! drawing with a stale matrix rather than corrupting the stack.

use crate::foundation::logging::precondition;
use crate::foundation::math::{Mat4, Transform2D, Vec3};

/// Maximum number of matrices on the stack, including the camera slot
pub const MAX_STACK_DEPTH: usize = 20;

/// Matrix stack used while building a frame
#[derive(Debug, Clone)]
pub struct TransformStack {
    matrices: [Mat4; MAX_STACK_DEPTH],
    depth: usize,
    overflow: usize,
}

impl Default for TransformStack {
    fn default() -> Self {
        Self::new()
    }
}

impl TransformStack {
    /// Create an uninitialised stack (depth 0)
    pub fn new() -> Self {
        Self {
            matrices: [Mat4::identity(); MAX_STACK_DEPTH],
            depth: 0,
            overflow: 0,
        }
    }

    /// Start a frame with `base` in slot 0
    pub fn reset(&mut self, base: Mat4) {
        self.matrices[0] = base;
        self.depth = 1;
        self.overflow = 0;
    }

    /// Compose `matrix` onto the top and push the result
    pub fn push_matrix(&mut self, matrix: &Mat4) -> Mat4 {
        if !precondition!(self.depth > 0, "TransformStack: push on an uninitialised stack") {
            return Mat4::identity();
        }
        if self.overflow > 0
            || !precondition!(self.depth < MAX_STACK_DEPTH, "TransformStack: overflow past {} matrices", MAX_STACK_DEPTH)
        {
            self.overflow += 1;
            return self.matrices[self.depth - 1];
        }

        let composed = self.matrices[self.depth - 1] * matrix;
        self.matrices[self.depth] = composed;
        self.depth += 1;
        composed
    }

    /// Push a planar transform
    pub fn push_transform_2d(&mut self, transform: &Transform2D) -> Mat4 {
        self.push_matrix(&transform.to_matrix())
    }

    /// Push a translation
    pub fn push_translation(&mut self, translation: &Vec3) -> Mat4 {
        self.push_matrix(&Mat4::new_translation(translation))
    }

    /// Pop the most recent push
    pub fn pop_matrix(&mut self) {
        if self.overflow > 0 {
            self.overflow -= 1;
            return;
        }
        if !precondition!(self.depth > 1, "TransformStack: underflow, pop at depth {}", self.depth) {
            return;
        }
        self.depth -= 1;
    }

    /// Current top matrix
    pub fn top(&self) -> &Mat4 {
        precondition!(self.depth > 0, "TransformStack: nothing on the stack");
        &self.matrices[self.depth.saturating_sub(1)]
    }

    /// Camera matrix in slot 0
    pub fn base(&self) -> &Mat4 {
        precondition!(self.depth > 0, "TransformStack: nothing on the stack");
        &self.matrices[0]
    }

    /// Number of matrices actually on the stack
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Number of pushes dropped because the stack was full
    pub fn overflow(&self) -> usize {
        self.overflow
    }
}
