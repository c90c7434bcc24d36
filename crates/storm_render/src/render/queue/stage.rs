//! # Render Queue Stage
//!
//! One ordered pass of the frame. Submissions are grouped into batches by
//! material; batches are kept in a singly linked list sorted by material
//! layer, with ties drawn in the order their first submission arrived.
//!
//! Batches and elements live in [`FreeList`] pools addressed by index. They
//! are returned to the pools at `end_render` and the pools are only freed
//! when the stage is dropped, so a warmed-up stage builds frames without
//! allocating.

use std::rc::Rc;

use super::stats::PoolStats;
use crate::foundation::collections::FreeList;
use crate::foundation::logging::precondition;
use crate::foundation::math::Mat4;
use crate::render::display_list::DisplayList;
use crate::render::material::Material;

#[derive(Debug, Clone)]
enum Geometry {
    Shared(Rc<DisplayList>),
    /// Index into the stage's temporary lists
    Temporary(usize),
}

#[derive(Debug)]
struct Batch {
    material: Material,
    elements: Option<usize>,
    next: Option<usize>,
}

#[derive(Debug)]
struct BatchElement {
    matrix: Mat4,
    geometry: Geometry,
    next: Option<usize>,
}

/// Sorted material batches for one pass
#[derive(Debug, Default)]
pub struct RenderQueueStage {
    batches: FreeList<Batch>,
    elements: FreeList<BatchElement>,
    head: Option<usize>,
    batch_count: usize,
    element_count: usize,
    temporaries: Vec<DisplayList>,
    temporaries_in_use: usize,
}

impl RenderQueueStage {
    /// Create an empty stage
    pub fn new() -> Self {
        Self::default()
    }

    /// Find the batch for `material`, creating it in layer order if needed
    fn find_batch(&mut self, material: &Material) -> usize {
        let mut cursor = self.head;
        while let Some(index) = cursor {
            let batch = &self.batches[index];
            if batch.material == *material {
                return index;
            }
            cursor = batch.next;
        }

        let layer = material.layer();
        let index = self.batches.insert(Batch {
            material: material.clone(),
            elements: None,
            next: None,
        });

        match self.head {
            None => self.head = Some(index),
            Some(first) if self.batches[first].material.layer() > layer => {
                self.batches[index].next = Some(first);
                self.head = Some(index);
            }
            Some(first) => {
                // Walk to the last batch whose successor does not sort after us.
                let mut previous = first;
                while let Some(next) = self.batches[previous].next {
                    if self.batches[next].material.layer() > layer {
                        break;
                    }
                    previous = next;
                }
                self.batches[index].next = self.batches[previous].next;
                self.batches[previous].next = Some(index);
            }
        }

        self.batch_count += 1;
        index
    }

    fn prepend_element(&mut self, batch: usize, matrix: Mat4, geometry: Geometry) {
        let element = self.elements.insert(BatchElement {
            matrix,
            geometry,
            next: self.batches[batch].elements,
        });
        self.batches[batch].elements = Some(element);
        self.element_count += 1;
    }

    /// Queue `list` to be drawn with `material` under `matrix`
    pub fn add_batch(&mut self, material: &Material, matrix: &Mat4, list: Rc<DisplayList>) {
        let batch = self.find_batch(material);
        self.prepend_element(batch, *matrix, Geometry::Shared(list));
    }

    /// Queue a stage-owned list and return it for filling.
    ///
    /// The list is only valid for the current frame; it is cleared at
    /// `end_render` and reused by a later frame.
    pub fn make_temporary_batch_list(&mut self, material: &Material, matrix: &Mat4, capacity: usize) -> &mut DisplayList {
        let batch = self.find_batch(material);

        let slot = self.temporaries_in_use;
        if slot == self.temporaries.len() {
            self.temporaries.push(DisplayList::with_capacity(capacity));
        } else {
            let list = &mut self.temporaries[slot];
            list.clear();
            if list.capacity() < capacity {
                *list = DisplayList::with_capacity(capacity);
            }
        }
        self.temporaries_in_use += 1;

        self.prepend_element(batch, *matrix, Geometry::Temporary(slot));
        &mut self.temporaries[slot]
    }

    /// Begin a frame; the stage must have been ended since the last frame
    pub fn start_render(&mut self) {
        precondition!(self.head.is_none(), "RenderQueueStage: batches not cleared before start_render");
        self.batch_count = 0;
        self.element_count = 0;
    }

    fn geometry<'a>(&'a self, geometry: &'a Geometry) -> Option<&'a DisplayList> {
        match geometry {
            Geometry::Shared(list) => Some(list),
            Geometry::Temporary(slot) => self.temporaries.get(*slot),
        }
    }

    /// Append every batch to `output`, each element wrapped in a matrix push
    pub fn draw(&self, output: &mut DisplayList) {
        let mut batch_cursor = self.head;
        while let Some(batch_index) = batch_cursor {
            let batch = &self.batches[batch_index];
            output.set_material(&batch.material);

            let mut element_cursor = batch.elements;
            while let Some(element_index) = element_cursor {
                let element = &self.elements[element_index];
                output.push_matrix(element.matrix);
                if let Some(list) = self.geometry(&element.geometry) {
                    output.append(list);
                }
                output.pop_transform();
                element_cursor = element.next;
            }

            batch_cursor = batch.next;
        }
    }

    /// Return every element and batch to the pools and clear temporaries
    pub fn end_render(&mut self) {
        let mut batch_cursor = self.head.take();
        while let Some(batch_index) = batch_cursor {
            let Some(batch) = self.batches.remove(batch_index) else {
                break;
            };

            let mut element_cursor = batch.elements;
            while let Some(element_index) = element_cursor {
                element_cursor = self.elements.remove(element_index).and_then(|element| element.next);
            }

            batch_cursor = batch.next;
        }

        for list in &mut self.temporaries[..self.temporaries_in_use] {
            list.clear();
        }
        self.temporaries_in_use = 0;
        self.batch_count = 0;
        self.element_count = 0;
    }

    /// Batches queued this frame
    pub fn batch_count(&self) -> usize {
        self.batch_count
    }

    /// Elements queued this frame
    pub fn element_count(&self) -> usize {
        self.element_count
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Materials of the queued batches, in draw order
    pub fn materials(&self) -> impl Iterator<Item = &Material> + '_ {
        std::iter::successors(self.head, move |&index| self.batches[index].next)
            .map(move |index| &self.batches[index].material)
    }

    /// Pool occupancy
    pub fn pool_stats(&self) -> PoolStats {
        PoolStats {
            batch_slots: self.batches.capacity(),
            free_batches: self.batches.free_count(),
            element_slots: self.elements.capacity(),
            free_elements: self.elements.free_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::display_list::DisplayCommand;

    fn names(stage: &RenderQueueStage) -> Vec<String> {
        stage.materials().map(|material| material.name().to_string()).collect()
    }

    fn list() -> Rc<DisplayList> {
        let mut list = DisplayList::new();
        list.set_color([1.0; 4]);
        Rc::new(list)
    }

    #[test]
    fn test_batches_sorted_by_layer() {
        let mut stage = RenderQueueStage::new();
        stage.start_render();
        for (name, layer) in [("five", 5), ("one", 1), ("three", 3)] {
            stage.add_batch(&Material::new(name, layer), &Mat4::identity(), list());
        }

        assert_eq!(names(&stage), ["one", "three", "five"]);
        stage.end_render();
    }

    #[test]
    fn test_equal_layers_keep_submission_order() {
        let mut stage = RenderQueueStage::new();
        stage.start_render();
        stage.add_batch(&Material::new("A", 0), &Mat4::identity(), list());
        stage.add_batch(&Material::new("B", 0), &Mat4::identity(), list());
        stage.add_batch(&Material::new("low", -1), &Mat4::identity(), list());
        stage.add_batch(&Material::new("C", 0), &Mat4::identity(), list());

        assert_eq!(names(&stage), ["low", "A", "B", "C"]);
        stage.end_render();
    }

    #[test]
    fn test_same_material_shares_a_batch() {
        let mut stage = RenderQueueStage::new();
        stage.start_render();
        let rock = Material::new("rock", 0);
        stage.add_batch(&rock, &Mat4::identity(), list());
        stage.add_batch(&rock.clone(), &Mat4::new_scaling(2.0), list());

        assert_eq!(stage.batch_count(), 1);
        assert_eq!(stage.element_count(), 2);
        stage.end_render();
    }

    #[test]
    fn test_draw_wraps_elements_and_prepends() {
        let mut stage = RenderQueueStage::new();
        stage.start_render();
        let rock = Material::new("rock", 0);
        stage.add_batch(&rock, &Mat4::new_scaling(1.0), list());
        stage.add_batch(&rock, &Mat4::new_scaling(2.0), list());

        let mut output = DisplayList::new();
        stage.draw(&mut output);

        let color = DisplayCommand::SetColor([1.0; 4]);
        assert_eq!(
            output.commands(),
            &[
                DisplayCommand::SetMaterial(rock.clone()),
                DisplayCommand::PushMatrix(Mat4::new_scaling(2.0)),
                color.clone(),
                DisplayCommand::PopTransform,
                DisplayCommand::PushMatrix(Mat4::new_scaling(1.0)),
                color,
                DisplayCommand::PopTransform,
            ]
        );
        stage.end_render();
    }

    #[test]
    fn test_pools_are_conserved_across_frames() {
        let mut stage = RenderQueueStage::new();
        for _ in 0..3 {
            stage.start_render();
            for layer in 0..4 {
                let material = Material::new(format!("m{layer}"), layer);
                stage.add_batch(&material, &Mat4::identity(), list());
                stage.add_batch(&material, &Mat4::identity(), list());
            }
            stage.end_render();

            let pools = stage.pool_stats();
            assert!(pools.is_fully_recycled());
            assert_eq!(pools.batch_slots, 4);
            assert_eq!(pools.element_slots, 8);
            assert!(stage.is_empty());
        }
    }

    #[test]
    fn test_temporary_lists_are_reused() {
        let mut stage = RenderQueueStage::new();
        let material = Material::new("particles", 0);

        stage.start_render();
        stage.make_temporary_batch_list(&material, &Mat4::identity(), 32).set_color([0.5; 4]);
        let mut output = DisplayList::new();
        stage.draw(&mut output);
        assert!(output.commands().contains(&DisplayCommand::SetColor([0.5; 4])));
        stage.end_render();

        stage.start_render();
        let reused = stage.make_temporary_batch_list(&material, &Mat4::identity(), 8);
        assert!(reused.is_empty());
        assert!(reused.capacity() >= 32);
        stage.end_render();
        assert_eq!(stage.temporaries.len(), 1);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "batches not cleared")]
    fn test_start_without_end_asserts() {
        let mut stage = RenderQueueStage::new();
        stage.start_render();
        stage.add_batch(&Material::new("a", 0), &Mat4::identity(), list());
        stage.start_render();
    }
}
