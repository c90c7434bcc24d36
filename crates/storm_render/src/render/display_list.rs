//! Display lists
//!
//! A display list is an ordered, replayable sequence of draw commands. The
//! render queue treats them as opaque: it appends whole lists and wraps them
//! in matrix pushes and pops.

use crate::foundation::math::Mat4;
use crate::render::api::Primitive;
use crate::render::buffer::BufferKey;
use crate::render::material::Material;

/// One recorded command
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    /// Switch to a material
    SetMaterial(Material),
    /// Push the current transform and multiply by a matrix
    PushMatrix(Mat4),
    /// Pop the transform pushed by the matching `PushMatrix`
    PopTransform,
    /// Set the current color
    SetColor([f32; 4]),
    /// Bind a render buffer's vertex attributes
    BindBuffer(BufferKey),
    /// Unbind a render buffer's vertex attributes
    UnbindBuffer(BufferKey),
    /// Indexed draw over a whole index buffer
    Draw {
        /// Index buffer
        indices: BufferKey,
        /// Topology
        primitive: Primitive,
    },
}

/// Ordered command list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplayList {
    commands: Vec<DisplayCommand>,
}

impl DisplayList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty list with room for `capacity` commands
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            commands: Vec::with_capacity(capacity),
        }
    }

    /// Append one command
    pub fn push(&mut self, command: DisplayCommand) {
        self.commands.push(command);
    }

    /// Append every command of another list
    pub fn append(&mut self, other: &DisplayList) {
        self.commands.extend_from_slice(&other.commands);
    }

    /// Append a material switch
    pub fn set_material(&mut self, material: &Material) {
        self.push(DisplayCommand::SetMaterial(material.clone()));
    }

    /// Append a matrix push
    pub fn push_matrix(&mut self, matrix: Mat4) {
        self.push(DisplayCommand::PushMatrix(matrix));
    }

    /// Append a transform pop
    pub fn pop_transform(&mut self) {
        self.push(DisplayCommand::PopTransform);
    }

    /// Append a color change
    pub fn set_color(&mut self, color: [f32; 4]) {
        self.push(DisplayCommand::SetColor(color));
    }

    /// Remove every command, keeping the allocation
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    /// Recorded commands
    pub fn commands(&self) -> &[DisplayCommand] {
        &self.commands
    }

    /// Iterate over the commands
    pub fn iter(&self) -> std::slice::Iter<'_, DisplayCommand> {
        self.commands.iter()
    }

    /// Number of commands
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the list has no commands
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Allocated command capacity
    pub fn capacity(&self) -> usize {
        self.commands.capacity()
    }

    /// Materials in the order they are set
    pub fn materials(&self) -> impl Iterator<Item = &Material> {
        self.commands.iter().filter_map(|command| match command {
            DisplayCommand::SetMaterial(material) => Some(material),
            _ => None,
        })
    }
}

impl<'a> IntoIterator for &'a DisplayList {
    type Item = &'a DisplayCommand;
    type IntoIter = std::slice::Iter<'a, DisplayCommand>;

    fn into_iter(self) -> Self::IntoIter {
        self.commands.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_preserves_order() {
        let mut inner = DisplayList::new();
        inner.set_color([1.0, 0.0, 0.0, 1.0]);
        inner.pop_transform();

        let mut outer = DisplayList::with_capacity(8);
        outer.push_matrix(Mat4::identity());
        outer.append(&inner);

        assert_eq!(outer.len(), 3);
        assert_eq!(outer.commands()[0], DisplayCommand::PushMatrix(Mat4::identity()));
        assert_eq!(outer.commands()[2], DisplayCommand::PopTransform);
    }

    #[test]
    fn test_clear_keeps_capacity() {
        let mut list = DisplayList::with_capacity(16);
        list.set_material(&Material::new("a", 0));
        list.clear();
        assert!(list.is_empty());
        assert!(list.capacity() >= 16);
    }

    #[test]
    fn test_materials_filter() {
        let mut list = DisplayList::new();
        list.set_material(&Material::new("a", 0));
        list.pop_transform();
        list.set_material(&Material::new("b", 1));
        let names: Vec<&str> = list.materials().map(Material::name).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
