//! # Render Queue
//!
//! Collects the frame's submissions and replays them in draw order.
//!
//! ## Frame lifecycle
//!
//! 1. `start_render` builds the camera matrix into transform stack slot 0
//!    and resets every stage.
//! 2. Scene traversal pushes transforms and submits (material, matrix,
//!    geometry) through `add_batch`, `add_fragment_batch` or
//!    `make_temporary_batch_list`.
//! 3. `draw` appends stage 0, 1, 2 ... then the generic list to the output.
//! 4. `end_render` recycles every batch into the stage pools.
//!
//! Materials flagged post-glow go to stage 2, glow to stage 1, everything
//! else to stage 0.

pub mod camera;
pub mod stage;
pub mod stats;
pub mod transform_stack;

pub use camera::{Camera2D, Camera3D, Orientation, SceneCamera};
pub use stage::RenderQueueStage;
pub use stats::{BatchStats, PoolStats};
pub use transform_stack::{TransformStack, MAX_STACK_DEPTH};

use std::rc::Rc;

use crate::config::RenderQueueConfig;
use crate::foundation::logging::precondition;
use crate::foundation::math::{Mat4, Transform2D, Vec3};
use crate::render::display_list::DisplayList;
use crate::render::fragment::Fragment;
use crate::render::material::Material;
use crate::render::{RenderError, RenderResult};

/// Fewest stages a queue can have: normal, glow, post-glow
pub const MIN_STAGE_COUNT: usize = 3;

const NORMAL_STAGE: usize = 0;
const GLOW_STAGE: usize = 1;
const POST_GLOW_STAGE: usize = 2;

/// Per-frame batching queue
#[derive(Debug)]
pub struct RenderQueue {
    stages: Vec<RenderQueueStage>,
    generic_list: DisplayList,
    stack: TransformStack,
    temporary_list_capacity: usize,
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderQueue {
    /// Create a queue with the default configuration
    pub fn new() -> Self {
        Self::build(&RenderQueueConfig::default())
    }

    /// Create a queue from configuration
    pub fn with_config(config: &RenderQueueConfig) -> RenderResult<Self> {
        config
            .validate()
            .map_err(|err| RenderError::InvalidConfiguration(err.to_string()))?;
        Ok(Self::build(config))
    }

    fn build(config: &RenderQueueConfig) -> Self {
        log::debug!(
            "RenderQueue: {} stages, generic list capacity {}",
            config.stage_count,
            config.generic_list_capacity
        );
        Self {
            stages: (0..config.stage_count).map(|_| RenderQueueStage::new()).collect(),
            generic_list: DisplayList::with_capacity(config.generic_list_capacity),
            stack: TransformStack::new(),
            temporary_list_capacity: config.temporary_list_capacity,
        }
    }

    /// Begin a frame seen through `camera`
    pub fn start_render(&mut self, camera: &SceneCamera, orientation: Orientation) {
        self.stack.reset(camera.base_matrix(orientation));
        for stage in &mut self.stages {
            stage.start_render();
        }
        self.generic_list.clear();
        log::trace!("RenderQueue: {} frame started, {:?}", if camera.is_3d() { "3D" } else { "2D" }, orientation);
    }

    /// Append the whole frame to `output`
    pub fn draw(&self, output: &mut DisplayList) {
        for stage in &self.stages {
            stage.draw(output);
        }
        output.append(&self.generic_list);

        precondition!(
            self.stack.depth() == 1 && self.stack.overflow() == 0,
            "RenderQueue: unbalanced push/pop of transforms (depth {}, overflow {})",
            self.stack.depth(),
            self.stack.overflow()
        );
    }

    /// Recycle every batch and clear the generic list
    pub fn end_render(&mut self) {
        for stage in &mut self.stages {
            stage.end_render();
        }
        self.generic_list.clear();
    }

    /// Stage a material renders in
    pub fn pick_stage_for_material(material: &Material) -> usize {
        if material.is_post_glow() {
            POST_GLOW_STAGE
        } else if material.is_glow() {
            GLOW_STAGE
        } else {
            NORMAL_STAGE
        }
    }

    /// Queue `list` with `material` under an explicit matrix
    pub fn add_batch(&mut self, material: &Material, matrix: &Mat4, list: Rc<DisplayList>) {
        let stage = Self::pick_stage_for_material(material);
        self.stages[stage].add_batch(material, matrix, list);
    }

    /// Queue a fragment under the current top matrix
    pub fn add_fragment_batch(&mut self, fragment: &Fragment) {
        let matrix = *self.stack.top();
        self.add_batch(&fragment.material, &matrix, Rc::clone(&fragment.display_list));
    }

    /// Queue a per-frame list drawn in camera space (the slot 0 matrix)
    pub fn make_temporary_batch_list(&mut self, material: &Material, capacity: usize) -> &mut DisplayList {
        let matrix = *self.stack.base();
        self.make_temporary_batch_list_with_matrix(material, &matrix, capacity)
    }

    /// Queue a per-frame list drawn under `matrix`.
    ///
    /// New lists hold at least `capacity` commands, and never less than the
    /// configured temporary list capacity.
    pub fn make_temporary_batch_list_with_matrix(
        &mut self,
        material: &Material,
        matrix: &Mat4,
        capacity: usize,
    ) -> &mut DisplayList {
        let stage = Self::pick_stage_for_material(material);
        let capacity = capacity.max(self.temporary_list_capacity);
        self.stages[stage].make_temporary_batch_list(material, matrix, capacity)
    }

    /// Compose `matrix` onto the current transform
    pub fn push_matrix(&mut self, matrix: &Mat4) -> Mat4 {
        self.stack.push_matrix(matrix)
    }

    /// Compose a planar transform onto the current transform
    pub fn push_transform_2d(&mut self, transform: &Transform2D) -> Mat4 {
        self.stack.push_transform_2d(transform)
    }

    /// Compose a translation onto the current transform
    pub fn push_translation(&mut self, translation: &Vec3) -> Mat4 {
        self.stack.push_translation(translation)
    }

    /// Undo the most recent push
    pub fn pop_matrix(&mut self) {
        self.stack.pop_matrix();
    }

    /// Current transform
    pub fn get_matrix(&self) -> &Mat4 {
        self.stack.top()
    }

    /// Camera transform in slot 0
    pub fn get_top_matrix(&self) -> &Mat4 {
        self.stack.base()
    }

    /// Transform stack depth
    pub fn stack_depth(&self) -> usize {
        self.stack.depth()
    }

    /// Number of stages
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Borrow a stage
    pub fn stage(&self, index: usize) -> Option<&RenderQueueStage> {
        if !precondition!(index < self.stages.len(), "RenderQueue: requested nonexistent stage {}", index) {
            return None;
        }
        self.stages.get(index)
    }

    /// Borrow a stage mutably
    pub fn stage_mut(&mut self, index: usize) -> Option<&mut RenderQueueStage> {
        if !precondition!(index < self.stages.len(), "RenderQueue: requested nonexistent stage {}", index) {
            return None;
        }
        self.stages.get_mut(index)
    }

    /// Unbatched commands drawn after every stage
    pub fn generic_list_mut(&mut self) -> &mut DisplayList {
        &mut self.generic_list
    }

    /// Snapshot of this frame's batching
    pub fn stats(&self) -> BatchStats {
        let mut stats = BatchStats {
            generic_commands: self.generic_list.len(),
            ..Default::default()
        };
        for stage in &self.stages {
            stats.batch_count += stage.batch_count();
            stats.element_count += stage.element_count();
            stats.pools += stage.pool_stats();
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::{Quat, Vec2, Vec4};
    use crate::render::display_list::DisplayCommand;
    use crate::render::material::MaterialFlags;
    use approx::assert_relative_eq;

    fn camera_2d() -> SceneCamera {
        SceneCamera::Flat(Camera2D::new(Vec2::zeros(), 10.0))
    }

    fn geometry(tag: f32) -> Rc<DisplayList> {
        let mut list = DisplayList::new();
        list.set_color([tag; 4]);
        Rc::new(list)
    }

    fn drawn_materials(queue: &RenderQueue) -> Vec<String> {
        let mut output = DisplayList::new();
        queue.draw(&mut output);
        output.materials().map(|material| material.name().to_string()).collect()
    }

    #[test]
    fn test_layers_draw_in_ascending_order() {
        let mut queue = RenderQueue::new();
        queue.start_render(&camera_2d(), Orientation::Normal);
        for layer in [5, 1, 3] {
            queue.add_batch(&Material::new(format!("layer{layer}"), layer), &Mat4::identity(), geometry(0.0));
        }

        assert_eq!(drawn_materials(&queue), ["layer1", "layer3", "layer5"]);
        queue.end_render();
    }

    #[test]
    fn test_equal_layers_draw_in_submission_order() {
        let mut queue = RenderQueue::new();
        queue.start_render(&camera_2d(), Orientation::Normal);
        queue.add_batch(&Material::new("A", 0), &Mat4::identity(), geometry(0.0));
        queue.add_batch(&Material::new("B", 0), &Mat4::identity(), geometry(0.0));

        assert_eq!(drawn_materials(&queue), ["A", "B"]);
        queue.end_render();
    }

    #[test]
    fn test_stage_routing() {
        let glow = Material::new("glow", 0).with_flags(MaterialFlags::GLOW);
        let post = Material::new("post", 0).with_flags(MaterialFlags::POST_GLOW | MaterialFlags::GLOW);
        let plain = Material::new("plain", 9);

        assert_eq!(RenderQueue::pick_stage_for_material(&plain), 0);
        assert_eq!(RenderQueue::pick_stage_for_material(&glow), 1);
        assert_eq!(RenderQueue::pick_stage_for_material(&post), 2);

        let mut queue = RenderQueue::new();
        queue.start_render(&camera_2d(), Orientation::Normal);
        queue.add_batch(&post, &Mat4::identity(), geometry(0.0));
        queue.add_batch(&glow, &Mat4::identity(), geometry(0.0));
        queue.add_batch(&plain, &Mat4::identity(), geometry(0.0));

        // Stage order beats layer order.
        assert_eq!(drawn_materials(&queue), ["plain", "glow", "post"]);
        assert_eq!(queue.stage(1).map(RenderQueueStage::batch_count), Some(1));
        queue.end_render();
    }

    #[test]
    fn test_generic_list_drawn_last() {
        let mut queue = RenderQueue::new();
        queue.start_render(&camera_2d(), Orientation::Normal);
        queue.generic_list_mut().set_color([9.0; 4]);
        queue.add_batch(&Material::new("a", 0), &Mat4::identity(), geometry(1.0));

        let mut output = DisplayList::new();
        queue.draw(&mut output);
        assert_eq!(output.commands().last(), Some(&DisplayCommand::SetColor([9.0; 4])));
        assert_eq!(queue.stats().generic_commands, 1);

        queue.end_render();
        assert_eq!(queue.stats().generic_commands, 0);
    }

    #[test]
    fn test_fragment_uses_current_matrix() {
        let mut queue = RenderQueue::new();
        queue.start_render(&camera_2d(), Orientation::Normal);
        let fragment = Fragment::new(Material::new("ship", 0), geometry(0.0));

        let pushed = queue.push_translation(&Vec3::new(3.0, 0.0, 0.0));
        queue.add_fragment_batch(&fragment);
        queue.pop_matrix();

        let mut output = DisplayList::new();
        queue.draw(&mut output);
        assert!(output.commands().contains(&DisplayCommand::PushMatrix(pushed)));
        queue.end_render();
    }

    #[test]
    fn test_temporary_list_uses_camera_matrix() {
        let mut queue = RenderQueue::new();
        let camera = SceneCamera::Flat(Camera2D::new(Vec2::new(2.0, 0.0), 10.0));
        queue.start_render(&camera, Orientation::Normal);
        let base = *queue.get_top_matrix();

        queue.push_translation(&Vec3::new(100.0, 0.0, 0.0));
        queue
            .make_temporary_batch_list(&Material::new("hud", 0), 4)
            .set_color([0.25; 4]);
        queue.pop_matrix();

        let mut output = DisplayList::new();
        queue.draw(&mut output);
        assert_eq!(output.commands()[1], DisplayCommand::PushMatrix(base));
        assert_eq!(output.commands()[2], DisplayCommand::SetColor([0.25; 4]));
        queue.end_render();
    }

    #[test]
    fn test_stack_returns_to_depth_one_after_draw() {
        let mut queue = RenderQueue::new();
        let camera = SceneCamera::Perspective(Camera3D::new(Vec3::new(0.0, 0.0, -10.0), Quat::identity()));
        queue.start_render(&camera, Orientation::Normal);

        let top = queue.push_matrix(&Mat4::new_scaling(2.0));
        assert_relative_eq!(*queue.get_matrix(), top);
        assert_relative_eq!(
            queue.get_top_matrix() * Vec4::new(0.0, 0.0, 0.0, 1.0),
            Vec4::new(0.0, 0.0, -10.0, 1.0),
            epsilon = 1e-5
        );
        queue.pop_matrix();

        let mut output = DisplayList::new();
        queue.draw(&mut output);
        assert_eq!(queue.stack_depth(), 1);
        queue.end_render();
    }

    #[test]
    fn test_pools_conserved_through_queue() {
        let mut queue = RenderQueue::new();
        let glow = Material::new("glow", 0).with_flags(MaterialFlags::GLOW);

        for _ in 0..4 {
            queue.start_render(&camera_2d(), Orientation::Six);
            queue.add_batch(&Material::new("a", 0), &Mat4::identity(), geometry(0.0));
            queue.add_batch(&glow, &Mat4::identity(), geometry(0.0));
            queue.add_batch(&glow, &Mat4::identity(), geometry(0.0));

            let stats = queue.stats();
            assert_eq!(stats.batch_count, 2);
            assert_eq!(stats.element_count, 3);
            assert_relative_eq!(stats.avg_elements_per_batch(), 1.5);

            let mut output = DisplayList::new();
            queue.draw(&mut output);
            queue.end_render();

            let pools = queue.stats().pools;
            assert!(pools.is_fully_recycled());
            assert_eq!(pools.batch_slots, 2);
            assert_eq!(pools.element_slots, 3);
        }
    }

    #[test]
    fn test_with_config() {
        let config = RenderQueueConfig { stage_count: 5, ..Default::default() };
        let queue = RenderQueue::with_config(&config).unwrap();
        assert_eq!(queue.stage_count(), 5);

        let too_few = RenderQueueConfig { stage_count: 2, ..Default::default() };
        assert!(matches!(
            RenderQueue::with_config(&too_few),
            Err(RenderError::InvalidConfiguration(_))
        ));
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "unbalanced push/pop")]
    fn test_unbalanced_draw_asserts() {
        let mut queue = RenderQueue::new();
        queue.start_render(&camera_2d(), Orientation::Normal);
        queue.push_translation(&Vec3::new(1.0, 0.0, 0.0));
        queue.draw(&mut DisplayList::new());
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "nonexistent stage")]
    fn test_missing_stage_asserts() {
        let queue = RenderQueue::new();
        let _ = queue.stage(3);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_missing_stage_is_none() {
        let mut queue = RenderQueue::new();
        assert!(queue.stage(3).is_none());
        assert!(queue.stage_mut(7).is_none());
    }
}
