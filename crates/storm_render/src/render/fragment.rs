//! Model fragments: one material plus the display list drawn with it

use std::rc::Rc;

use crate::render::display_list::DisplayList;
use crate::render::material::Material;

/// A drawable piece of a model
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Material the fragment is drawn with
    pub material: Material,
    /// Shared geometry
    pub display_list: Rc<DisplayList>,
}

impl Fragment {
    /// Create a fragment
    pub fn new(material: Material, display_list: Rc<DisplayList>) -> Self {
        Self { material, display_list }
    }
}
