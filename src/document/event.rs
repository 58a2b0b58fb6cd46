use std::cell::RefCell;
use std::rc::Rc;

use bitflags::bitflags;
use glam::Vec2;

bitflags! {
    /// Currently held mouse buttons, tracked by the document between
    /// simulated down/up calls.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
    pub struct MouseButtons: u8 {
        const PRIMARY = 1 << 0;
        const SECONDARY = 1 << 1;
        const MIDDLE = 1 << 2;
        const BACK = 1 << 3;
        const FORWARD = 1 << 4;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MouseButton {
    Primary,
    Secondary,
    Middle,
    Back,
    Forward,
}

impl MouseButton {
    pub fn flag(self) -> MouseButtons {
        match self {
            Self::Primary => MouseButtons::PRIMARY,
            Self::Secondary => MouseButtons::SECONDARY,
            Self::Middle => MouseButtons::MIDDLE,
            Self::Back => MouseButtons::BACK,
            Self::Forward => MouseButtons::FORWARD,
        }
    }
}

struct MetaState {
    target: u64,
    stopped: bool,
    cancelled: bool,
}

/// Shared per-dispatch state. Every handler along the bubble path sees the
/// same cell, so stopping propagation or cancelling in one handler is
/// visible to the dispatcher and to later handlers.
#[derive(Clone)]
pub struct EventMeta {
    state: Rc<RefCell<MetaState>>,
}

impl EventMeta {
    pub fn new(target: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(MetaState {
                target,
                stopped: false,
                cancelled: false,
            })),
        }
    }

    /// Node id of the element the event was originally dispatched at.
    pub fn target(&self) -> u64 {
        self.state.borrow().target
    }

    pub fn stop_propagation(&self) {
        self.state.borrow_mut().stopped = true;
    }

    pub fn propagation_stopped(&self) -> bool {
        self.state.borrow().stopped
    }

    /// Marks the interaction as cancelled. A cancelled press never
    /// synthesizes a click.
    pub fn cancel(&self) {
        self.state.borrow_mut().cancelled = true;
    }

    pub fn cancelled(&self) -> bool {
        self.state.borrow().cancelled
    }
}

impl std::fmt::Debug for EventMeta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("EventMeta")
            .field("target", &state.target)
            .field("stopped", &state.stopped)
            .field("cancelled", &state.cancelled)
            .finish()
    }
}

/// Pointer position event. `position` is local to the element receiving the
/// handler call; `window_position` is the raw window coordinate.
#[derive(Clone, Debug)]
pub struct PointerEvent {
    pub meta: EventMeta,
    pub position: Vec2,
    pub window_position: Vec2,
}

#[derive(Clone, Debug)]
pub struct MouseButtonEvent {
    pub meta: EventMeta,
    pub position: Vec2,
    pub window_position: Vec2,
    pub button: MouseButton,
    pub pressed: bool,
}

/// Scroll event. `precise` marks per-pixel deltas from touchpads as opposed
/// to notched wheel steps.
#[derive(Clone, Debug)]
pub struct MouseWheelEvent {
    pub meta: EventMeta,
    pub position: Vec2,
    pub window_position: Vec2,
    pub delta: Vec2,
    pub precise: bool,
}

/// Synthesized from a cancel-free press and release on the same hit target.
#[derive(Clone, Debug)]
pub struct ClickEvent {
    pub meta: EventMeta,
    pub position: Vec2,
    pub window_position: Vec2,
    pub button: MouseButton,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn meta_is_shared_between_clones() {
        let meta = EventMeta::new(7);
        let other = meta.clone();
        other.stop_propagation();
        assert!(meta.propagation_stopped());
        assert_eq!(meta.target(), 7);
        assert!(!meta.cancelled());
    }

    #[test]
    fn buttons_map_to_distinct_flags() {
        let mut held = MouseButtons::empty();
        held.insert(MouseButton::Primary.flag());
        held.insert(MouseButton::Middle.flag());
        assert!(held.contains(MouseButtons::PRIMARY));
        assert!(!held.contains(MouseButtons::SECONDARY));
    }
}
