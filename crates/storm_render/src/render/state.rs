//! # Renderer State
//!
//! Lazily flushed GPU state. Setters only record a target value; [`flush`]
//! issues one device call per slot whose target differs from the value last
//! sent, so redundant toggles between draws cost nothing.
//!
//! Every slot starts at `false` / `0` / `(0, 0)`, matching a freshly created
//! device context. After a device reset the real context no longer matches
//! the flushed values, which is what [`force`] is for.
//!
//! [`flush`]: RendererState::flush
//! [`force`]: RendererState::force

use crate::render::api::{Capability, CullFace, GraphicsDevice};
use crate::foundation::logging::precondition;

/// Boolean state slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoolState {
    /// Alpha blending
    Blend,
    /// Vertex color drives material color
    ColorMaterial,
    /// Face culling enabled
    CullFace,
    /// Depth testing
    DepthTest,
    /// Stencil testing
    StencilTest,
    /// Scissor testing
    ScissorTest,
    /// Multisampling
    Multisample,
    /// Polygon offset for fills
    PolygonOffsetFill,
    /// Depth writes
    DepthMask,
    /// Position attribute array (slot 0)
    VertexArray,
    /// Texture coordinate attribute array (slot 1)
    TextureCoordinateArray,
    /// Normal attribute array (slot 2)
    NormalArray,
    /// Color attribute array (slot 3)
    ColorArray,
}

impl BoolState {
    /// Number of boolean slots
    pub const COUNT: usize = 13;

    /// Every boolean slot, in table order
    pub const ALL: [BoolState; Self::COUNT] = [
        BoolState::Blend,
        BoolState::ColorMaterial,
        BoolState::CullFace,
        BoolState::DepthTest,
        BoolState::StencilTest,
        BoolState::ScissorTest,
        BoolState::Multisample,
        BoolState::PolygonOffsetFill,
        BoolState::DepthMask,
        BoolState::VertexArray,
        BoolState::TextureCoordinateArray,
        BoolState::NormalArray,
        BoolState::ColorArray,
    ];

    fn index(self) -> usize {
        self as usize
    }

    fn setter(self) -> BoolSetter {
        match self {
            BoolState::Blend => BoolSetter::Capability(Capability::Blend),
            BoolState::ColorMaterial => BoolSetter::Capability(Capability::ColorMaterial),
            BoolState::CullFace => BoolSetter::Capability(Capability::CullFace),
            BoolState::DepthTest => BoolSetter::Capability(Capability::DepthTest),
            BoolState::StencilTest => BoolSetter::Capability(Capability::StencilTest),
            BoolState::ScissorTest => BoolSetter::Capability(Capability::ScissorTest),
            BoolState::Multisample => BoolSetter::Capability(Capability::Multisample),
            BoolState::PolygonOffsetFill => BoolSetter::Capability(Capability::PolygonOffsetFill),
            BoolState::DepthMask => BoolSetter::DepthMask,
            BoolState::VertexArray => BoolSetter::ClientArray(0),
            BoolState::TextureCoordinateArray => BoolSetter::ClientArray(1),
            BoolState::NormalArray => BoolSetter::ClientArray(2),
            BoolState::ColorArray => BoolSetter::ClientArray(3),
        }
    }
}

/// Integer state slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntState {
    /// Which faces get culled, as a raw [`CullFace`] value
    CullFace,
}

impl IntState {
    /// Number of integer slots
    pub const COUNT: usize = 1;

    /// Every integer slot, in table order
    pub const ALL: [IntState; Self::COUNT] = [IntState::CullFace];

    fn index(self) -> usize {
        self as usize
    }
}

/// Float-pair state slots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Float2State {
    /// Polygon offset as (constant units, slope factor)
    PolygonOffset,
}

impl Float2State {
    /// Number of float-pair slots
    pub const COUNT: usize = 1;

    /// Every float-pair slot, in table order
    pub const ALL: [Float2State; Self::COUNT] = [Float2State::PolygonOffset];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy)]
enum BoolSetter {
    Capability(Capability),
    DepthMask,
    ClientArray(u32),
}

impl BoolSetter {
    fn apply(self, device: &mut dyn GraphicsDevice, value: bool) {
        match self {
            BoolSetter::Capability(capability) => device.set_capability(capability, value),
            BoolSetter::DepthMask => device.set_depth_mask(value),
            BoolSetter::ClientArray(slot) => device.set_vertex_attribute_array(slot, value),
        }
    }
}

fn apply_int(state: IntState, device: &mut dyn GraphicsDevice, value: i32) {
    match state {
        IntState::CullFace => {
            if let Some(mode) = CullFace::from_raw(value) {
                device.set_cull_face(mode);
            }
        }
    }
}

fn apply_float2(state: Float2State, device: &mut dyn GraphicsDevice, (a, b): (f32, f32)) {
    match state {
        // Stored as (units, factor); the device takes (factor, units).
        Float2State::PolygonOffset => device.set_polygon_offset(b, a),
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot<T> {
    target: T,
    flushed: T,
}

impl<T: Copy + PartialEq> Slot<T> {
    fn new(value: T) -> Self {
        Self { target: value, flushed: value }
    }

    /// Take the target if it differs from the flushed value
    fn take_change(&mut self) -> Option<T> {
        if self.target == self.flushed {
            None
        } else {
            self.flushed = self.target;
            Some(self.target)
        }
    }

    fn take_forced(&mut self) -> T {
        self.flushed = self.target;
        self.target
    }
}

/// Lazily flushed GPU state tables
#[derive(Debug, Clone)]
pub struct RendererState {
    bools: [Slot<bool>; BoolState::COUNT],
    ints: [Slot<i32>; IntState::COUNT],
    float2s: [Slot<(f32, f32)>; Float2State::COUNT],
}

impl Default for RendererState {
    fn default() -> Self {
        Self::new()
    }
}

impl RendererState {
    /// Create state tables with every slot at its initial value
    pub fn new() -> Self {
        Self {
            bools: [Slot::new(false); BoolState::COUNT],
            ints: [Slot::new(0); IntState::COUNT],
            float2s: [Slot::new((0.0, 0.0)); Float2State::COUNT],
        }
    }

    /// Record a boolean target
    pub fn set_bool(&mut self, state: BoolState, value: bool) {
        self.bools[state.index()].target = value;
    }

    /// Record a boolean the device already holds, without issuing a call.
    ///
    /// Used when a vertex-array bind swaps in attribute-array enables behind
    /// the state tables' back.
    pub fn sync_bool(&mut self, state: BoolState, value: bool) {
        self.bools[state.index()] = Slot::new(value);
    }

    /// Record an integer target
    pub fn set_int(&mut self, state: IntState, value: i32) {
        let valid = match state {
            IntState::CullFace => CullFace::from_raw(value).is_some(),
        };
        if !precondition!(valid, "RendererState: {} is not a valid value for {:?}", value, state) {
            return;
        }
        self.ints[state.index()].target = value;
    }

    /// Record a float-pair target
    pub fn set_float2(&mut self, state: Float2State, a: f32, b: f32) {
        self.float2s[state.index()].target = (a, b);
    }

    /// Convenience for the cull-face mode slot
    pub fn set_cull_face(&mut self, mode: CullFace) {
        self.set_int(IntState::CullFace, mode.to_raw());
    }

    /// Current boolean target
    pub fn get_bool(&self, state: BoolState) -> bool {
        self.bools[state.index()].target
    }

    /// Current integer target
    pub fn get_int(&self, state: IntState) -> i32 {
        self.ints[state.index()].target
    }

    /// Current float-pair target
    pub fn get_float2(&self, state: Float2State) -> (f32, f32) {
        self.float2s[state.index()].target
    }

    /// Issue calls for every slot whose target changed since the last flush.
    ///
    /// Returns the number of device calls issued.
    pub fn flush(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        let mut issued = 0;

        for state in BoolState::ALL {
            if let Some(value) = self.bools[state.index()].take_change() {
                state.setter().apply(device, value);
                issued += 1;
            }
        }
        for state in IntState::ALL {
            if let Some(value) = self.ints[state.index()].take_change() {
                apply_int(state, device, value);
                issued += 1;
            }
        }
        for state in Float2State::ALL {
            if let Some(value) = self.float2s[state.index()].take_change() {
                apply_float2(state, device, value);
                issued += 1;
            }
        }

        if issued > 0 {
            log::trace!("RendererState: flushed {} state changes", issued);
        }
        issued
    }

    /// Issue every slot's call unconditionally, resynchronizing the device.
    ///
    /// Returns the number of device calls issued.
    pub fn force(&mut self, device: &mut dyn GraphicsDevice) -> usize {
        for state in BoolState::ALL {
            let value = self.bools[state.index()].take_forced();
            state.setter().apply(device, value);
        }
        for state in IntState::ALL {
            let value = self.ints[state.index()].take_forced();
            apply_int(state, device, value);
        }
        for state in Float2State::ALL {
            let value = self.float2s[state.index()].take_forced();
            apply_float2(state, device, value);
        }

        let issued = BoolState::COUNT + IntState::COUNT + Float2State::COUNT;
        log::debug!("RendererState: forced {} state slots", issued);
        issued
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::api::{DeviceCall, HeadlessDevice};

    #[test]
    fn test_flush_issues_only_changes() {
        let mut device = HeadlessDevice::new();
        let mut state = RendererState::new();

        state.set_bool(BoolState::Blend, true);
        state.set_bool(BoolState::DepthTest, false);
        assert_eq!(state.flush(&mut device), 1);
        assert_eq!(device.calls(), &[DeviceCall::SetCapability(Capability::Blend, true)]);

        device.clear_calls();
        assert_eq!(state.flush(&mut device), 0);
        assert!(device.calls().is_empty());
    }

    #[test]
    fn test_toggle_back_before_flush_issues_nothing() {
        let mut device = HeadlessDevice::new();
        let mut state = RendererState::new();

        state.set_bool(BoolState::StencilTest, true);
        state.set_bool(BoolState::StencilTest, false);
        assert_eq!(state.flush(&mut device), 0);
    }

    #[test]
    fn test_client_arrays_and_depth_mask_route_to_their_setters() {
        let mut device = HeadlessDevice::new();
        let mut state = RendererState::new();

        state.set_bool(BoolState::NormalArray, true);
        state.set_bool(BoolState::DepthMask, true);
        state.flush(&mut device);

        assert_eq!(
            device.calls(),
            &[DeviceCall::SetDepthMask(true), DeviceCall::SetVertexAttributeArray(2, true)]
        );
    }

    #[test]
    fn test_polygon_offset_argument_order() {
        let mut device = HeadlessDevice::new();
        let mut state = RendererState::new();

        state.set_float2(Float2State::PolygonOffset, 1.0, 2.0);
        assert_eq!(state.get_float2(Float2State::PolygonOffset), (1.0, 2.0));
        state.flush(&mut device);

        assert_eq!(device.calls(), &[DeviceCall::SetPolygonOffset { factor: 2.0, units: 1.0 }]);
    }

    #[test]
    fn test_cull_face_mode() {
        let mut device = HeadlessDevice::new();
        let mut state = RendererState::new();

        state.set_cull_face(CullFace::Front);
        assert_eq!(state.get_int(IntState::CullFace), CullFace::Front.to_raw());
        state.flush(&mut device);
        assert_eq!(device.calls(), &[DeviceCall::SetCullFace(CullFace::Front)]);
    }

    #[test]
    fn test_force_issues_every_slot() {
        let mut device = HeadlessDevice::new();
        let mut state = RendererState::new();
        state.set_bool(BoolState::Blend, true);

        assert_eq!(state.force(&mut device), 15);
        assert_eq!(device.calls().len(), 15);
        assert!(device.calls().contains(&DeviceCall::SetCapability(Capability::Blend, true)));
        assert!(device.calls().contains(&DeviceCall::SetCullFace(CullFace::Back)));

        // Forcing also counts as flushing.
        assert_eq!(state.flush(&mut device), 0);
    }

    #[test]
    fn test_sync_bool_records_without_a_call() {
        let mut device = HeadlessDevice::new();
        let mut state = RendererState::new();
        state.set_bool(BoolState::VertexArray, true);

        state.sync_bool(BoolState::VertexArray, false);
        assert!(!state.get_bool(BoolState::VertexArray));
        assert_eq!(state.flush(&mut device), 0);

        state.sync_bool(BoolState::NormalArray, true);
        state.set_bool(BoolState::NormalArray, false);
        state.flush(&mut device);
        assert_eq!(device.calls(), &[DeviceCall::SetVertexAttributeArray(2, false)]);
    }

    #[cfg(debug_assertions)]
    #[test]
    #[should_panic(expected = "not a valid value")]
    fn test_invalid_cull_face_asserts() {
        RendererState::new().set_int(IntState::CullFace, 42);
    }

    #[cfg(not(debug_assertions))]
    #[test]
    fn test_invalid_cull_face_is_ignored() {
        let mut state = RendererState::new();
        state.set_int(IntState::CullFace, 42);
        assert_eq!(state.get_int(IntState::CullFace), 0);
    }
}
