pub(crate) mod control_flow;
mod layout;
mod linear;
mod sizing;

pub use control_flow::{for_each, if_else, switch};
pub use layout::{AxisConstraints, LayoutFlags, LayoutStats};
pub use sizing::{ContainerSizing, CrossAlign, Justify, LinearArrangement, Orientation};

use std::cell::RefCell;
use std::fmt;
use std::rc::{Rc, Weak};
use std::sync::atomic::{AtomicU64, Ordering};

use glam::Vec2;
use smol_str::SmolStr;
use thiserror::Error;

use crate::data::{
    Brush, ClipApplicability, ClipShape, ColorBrush, Dimension, Dimension2, LayoutContext, Rect,
};
use crate::document::DocumentSignals;
use crate::document::event::{ClickEvent, MouseButtonEvent, MouseWheelEvent, PointerEvent};
use crate::element::control_flow::ReactiveChildren;
use crate::element::linear::{LinearSlot, place_cross, solve_main_axis};
use crate::theme::{Theme, ThemeData, ThemeError, ThemeFieldMask};

fn next_node_id() -> u64 {
    static NEXT_ID: AtomicU64 = AtomicU64::new(1);
    NEXT_ID.fetch_add(1, Ordering::Relaxed)
}

pub(crate) type NodeRef = Rc<RefCell<ElementNode>>;
pub(crate) type WeakNode = Weak<RefCell<ElementNode>>;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ElementError {
    #[error("element {node_id} already has a parent")]
    DuplicateElement { node_id: u64 },
    #[error("an element with id {id:?} is already registered")]
    DuplicateId { id: SmolStr },
    #[error("no element with id {id:?}")]
    UnknownId { id: SmolStr },
    #[error("child index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Interaction state an element is currently in. Drives theme lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum VisualState {
    #[default]
    Normal,
    Hover,
    Pressed,
    Focused,
    Disabled,
}

/// What kind of node this is. Linear containers run the main-axis solver
/// over their children; everything else stacks children at resolved
/// positions.
pub(crate) enum ElementKind {
    Plain,
    Linear {
        orientation: Orientation,
        arrangement: LinearArrangement,
        default_align: CrossAlign,
        legacy_box: bool,
    },
    Reactive(ReactiveChildren),
}

type Handler<E> = Rc<RefCell<dyn FnMut(&E)>>;

#[derive(Default)]
pub(crate) struct Handlers {
    pub pointer_move: Vec<Handler<PointerEvent>>,
    pub pointer_enter: Vec<Handler<PointerEvent>>,
    pub pointer_exit: Vec<Handler<PointerEvent>>,
    pub mouse_down: Vec<Handler<MouseButtonEvent>>,
    pub mouse_up: Vec<Handler<MouseButtonEvent>>,
    pub wheel: Vec<Handler<MouseWheelEvent>>,
    pub click: Vec<Handler<ClickEvent>>,
}

pub(crate) struct ElementNode {
    pub node_id: u64,
    pub user_id: Option<SmolStr>,
    pub name: Option<SmolStr>,
    pub parent: WeakNode,
    pub children: Vec<Element>,
    pub kind: ElementKind,

    pub position: crate::data::ObservableProperty<Dimension2>,
    pub preferred_size: crate::data::ObservableProperty<Dimension2>,
    pub min_size: crate::data::ObservableProperty<Dimension2>,
    pub max_size: crate::data::ObservableProperty<Dimension2>,
    pub sizing: Option<ContainerSizing>,

    pub background: Option<Box<dyn Brush>>,
    pub clip: Option<ClipShape>,
    pub clip_applicability: ClipApplicability,
    pub visible: bool,
    pub enabled: bool,

    pub hovered: bool,
    pub pressed: bool,
    pub focused: bool,

    pub theme_override: Option<ThemeData>,
    pub themed: ThemeFieldMask,

    pub bounds: Rect,
    pub layout_done: bool,

    pub signals: Option<DocumentSignals>,
    pub unsubscribers: Vec<Box<dyn FnOnce()>>,
    pub handlers: Handlers,
}

impl ElementNode {
    fn new(kind: ElementKind) -> Self {
        Self {
            node_id: next_node_id(),
            user_id: None,
            name: None,
            parent: Weak::new(),
            children: Vec::new(),
            kind,
            position: crate::data::ObservableProperty::new(Dimension2::UNSET),
            preferred_size: crate::data::ObservableProperty::new(Dimension2::UNSET),
            min_size: crate::data::ObservableProperty::new(Dimension2::UNSET),
            max_size: crate::data::ObservableProperty::new(Dimension2::UNSET),
            sizing: None,
            background: None,
            clip: None,
            clip_applicability: ClipApplicability::default(),
            visible: true,
            enabled: true,
            hovered: false,
            pressed: false,
            focused: false,
            theme_override: None,
            themed: ThemeFieldMask::empty(),
            bounds: Rect::ZERO,
            layout_done: false,
            signals: None,
            unsubscribers: Vec::new(),
            handlers: Handlers::default(),
        }
    }

    pub fn effective_state(&self) -> VisualState {
        if !self.enabled {
            VisualState::Disabled
        } else if self.pressed {
            VisualState::Pressed
        } else if self.hovered {
            VisualState::Hover
        } else if self.focused {
            VisualState::Focused
        } else {
            VisualState::Normal
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            ElementKind::Plain => "element",
            ElementKind::Linear {
                orientation,
                legacy_box,
                ..
            } => match (orientation, legacy_box) {
                (Orientation::Horizontal, false) => "row",
                (Orientation::Vertical, false) => "column",
                (Orientation::Horizontal, true) => "hbox",
                (Orientation::Vertical, true) => "vbox",
            },
            ElementKind::Reactive(reactive) => reactive.label,
        }
    }
}

/// Handle to a node in the UI tree. Cloning the handle clones a reference,
/// not the node; equality is identity.
pub struct Element {
    node: NodeRef,
}

impl Clone for Element {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.node, &other.node)
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.node.borrow();
        f.debug_struct("Element")
            .field("node_id", &node.node_id)
            .field("kind", &node.kind_name())
            .field("user_id", &node.user_id)
            .field("children", &node.children.len())
            .finish()
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::new()
    }
}

impl Element {
    pub fn new() -> Self {
        Self::from_kind(ElementKind::Plain)
    }

    pub fn row(arrangement: LinearArrangement) -> Self {
        Self::from_kind(ElementKind::Linear {
            orientation: Orientation::Horizontal,
            arrangement,
            default_align: CrossAlign::Start,
            legacy_box: false,
        })
    }

    pub fn column(arrangement: LinearArrangement) -> Self {
        Self::from_kind(ElementKind::Linear {
            orientation: Orientation::Vertical,
            arrangement,
            default_align: CrossAlign::Start,
            legacy_box: false,
        })
    }

    /// Horizontal container with the legacy default of stretching children
    /// across the cross axis.
    pub fn hbox() -> Self {
        Self::from_kind(ElementKind::Linear {
            orientation: Orientation::Horizontal,
            arrangement: LinearArrangement::default(),
            default_align: CrossAlign::Stretch,
            legacy_box: true,
        })
    }

    pub fn vbox() -> Self {
        Self::from_kind(ElementKind::Linear {
            orientation: Orientation::Vertical,
            arrangement: LinearArrangement::default(),
            default_align: CrossAlign::Stretch,
            legacy_box: true,
        })
    }

    /// An empty growing element, used to push siblings apart.
    pub fn spacer(sizing: ContainerSizing) -> Self {
        let spacer = Self::new();
        spacer.set_sizing(Some(sizing));
        spacer
    }

    pub(crate) fn from_kind(kind: ElementKind) -> Self {
        Self {
            node: Rc::new(RefCell::new(ElementNode::new(kind))),
        }
    }

    pub(crate) fn from_node(node: NodeRef) -> Self {
        Self { node }
    }

    pub(crate) fn node(&self) -> &NodeRef {
        &self.node
    }

    pub(crate) fn downgrade(&self) -> WeakNode {
        Rc::downgrade(&self.node)
    }

    pub fn node_id(&self) -> u64 {
        self.node.borrow().node_id
    }

    pub fn user_id(&self) -> Option<SmolStr> {
        self.node.borrow().user_id.clone()
    }

    /// Assigns the user-visible id. Registration against the document id
    /// cache happens here when the element is already in a tree.
    pub fn set_user_id(&self, id: impl Into<SmolStr>) -> Result<(), ElementError> {
        let id = id.into();
        let (signals, old, node_id) = {
            let node = self.node.borrow();
            (node.signals.clone(), node.user_id.clone(), node.node_id)
        };
        if let Some(signals) = &signals {
            signals.register_id(&id, &self.node)?;
            if let Some(old) = &old {
                signals.unregister_id(old, node_id);
            }
        }
        self.node.borrow_mut().user_id = Some(id);
        Ok(())
    }

    pub fn name(&self) -> Option<SmolStr> {
        self.node.borrow().name.clone()
    }

    pub fn set_name(&self, name: impl Into<SmolStr>) {
        self.node.borrow_mut().name = Some(name.into());
    }

    pub fn position(&self) -> Dimension2 {
        self.node.borrow().position.get()
    }

    pub fn set_position(&self, position: Dimension2) {
        let prop = self.node.borrow().position.clone();
        prop.set(position);
    }

    pub fn preferred_size(&self) -> Dimension2 {
        self.node.borrow().preferred_size.get()
    }

    pub fn set_preferred_size(&self, size: Dimension2) {
        let prop = self.node.borrow().preferred_size.clone();
        prop.set(size);
    }

    pub fn set_preferred_width(&self, width: impl Into<Dimension>) {
        let prop = self.node.borrow().preferred_size.clone();
        let mut size = prop.get();
        size.x = width.into();
        prop.set(size);
    }

    pub fn set_preferred_height(&self, height: impl Into<Dimension>) {
        let prop = self.node.borrow().preferred_size.clone();
        let mut size = prop.get();
        size.y = height.into();
        prop.set(size);
    }

    pub fn min_size(&self) -> Dimension2 {
        self.node.borrow().min_size.get()
    }

    pub fn set_min_size(&self, size: Dimension2) {
        let prop = self.node.borrow().min_size.clone();
        prop.set(size);
    }

    pub fn max_size(&self) -> Dimension2 {
        self.node.borrow().max_size.get()
    }

    pub fn set_max_size(&self, size: Dimension2) {
        let prop = self.node.borrow().max_size.clone();
        prop.set(size);
    }

    pub fn sizing(&self) -> Option<ContainerSizing> {
        self.node.borrow().sizing
    }

    pub fn set_sizing(&self, sizing: Option<ContainerSizing>) {
        {
            let mut node = self.node.borrow_mut();
            if node.sizing == sizing {
                return;
            }
            node.sizing = sizing;
        }
        self.mark_layout_dirty();
    }

    pub fn set_background(&self, brush: Option<Box<dyn Brush>>) {
        {
            let mut node = self.node.borrow_mut();
            node.background = brush;
            node.themed.remove(ThemeFieldMask::BACKGROUND);
        }
        self.mark_redraw();
    }

    pub fn set_clip(&self, clip: Option<ClipShape>) {
        {
            let mut node = self.node.borrow_mut();
            node.clip = clip;
            node.themed.remove(ThemeFieldMask::CLIP);
        }
        self.mark_redraw();
    }

    pub fn set_clip_applicability(&self, applicability: ClipApplicability) {
        self.node.borrow_mut().clip_applicability = applicability;
        self.mark_redraw();
    }

    pub fn visible(&self) -> bool {
        self.node.borrow().visible
    }

    pub fn set_visible(&self, visible: bool) {
        {
            let mut node = self.node.borrow_mut();
            if node.visible == visible {
                return;
            }
            node.visible = visible;
            node.themed.remove(ThemeFieldMask::VISIBLE);
        }
        self.mark_layout_dirty();
    }

    pub fn enabled(&self) -> bool {
        self.node.borrow().enabled
    }

    pub fn set_enabled(&self, enabled: bool) {
        {
            let mut node = self.node.borrow_mut();
            if node.enabled == enabled {
                return;
            }
            node.enabled = enabled;
            if !enabled {
                node.hovered = false;
                node.pressed = false;
            }
        }
        self.mark_redraw();
    }

    pub fn set_theme_override(&self, data: Option<ThemeData>) {
        self.node.borrow_mut().theme_override = data;
        self.mark_redraw();
    }

    pub fn visual_state(&self) -> VisualState {
        self.node.borrow().effective_state()
    }

    pub fn kind_name(&self) -> &'static str {
        self.node.borrow().kind_name()
    }

    /// Bounds resolved by the last layout pass, or `None` if layout never
    /// completed for this element.
    pub fn measured_frame(&self) -> Option<Rect> {
        let node = self.node.borrow();
        node.layout_done.then_some(node.bounds)
    }

    pub fn parent(&self) -> Option<Element> {
        self.node.borrow().parent.upgrade().map(Element::from_node)
    }

    pub fn children(&self) -> Vec<Element> {
        self.node.borrow().children.clone()
    }

    pub fn child_count(&self) -> usize {
        self.node.borrow().children.len()
    }

    pub fn add_child(&self, child: &Element) -> Result<(), ElementError> {
        let len = self.child_count();
        self.insert_child(len, child)
    }

    pub fn insert_child(&self, index: usize, child: &Element) -> Result<(), ElementError> {
        if child.node.borrow().parent.upgrade().is_some() || self.is_self_or_ancestor(child) {
            return Err(ElementError::DuplicateElement {
                node_id: child.node_id(),
            });
        }
        let len = self.child_count();
        if index > len {
            return Err(ElementError::IndexOutOfRange { index, len });
        }
        let signals = self.node.borrow().signals.clone();
        if let Some(signals) = &signals {
            child.enter_document(signals)?;
        }
        child.node.borrow_mut().parent = self.downgrade();
        self.node.borrow_mut().children.insert(index, child.clone());
        self.mark_layout_dirty();
        Ok(())
    }

    pub fn remove_child(&self, child: &Element) -> bool {
        let index = {
            let node = self.node.borrow();
            node.children.iter().position(|c| c == child)
        };
        match index {
            Some(index) => {
                self.remove_child_at(index);
                true
            }
            None => false,
        }
    }

    pub fn remove_child_at(&self, index: usize) -> Option<Element> {
        let child = {
            let mut node = self.node.borrow_mut();
            if index >= node.children.len() {
                return None;
            }
            node.children.remove(index)
        };
        child.node.borrow_mut().parent = Weak::new();
        child.exit_document();
        self.mark_layout_dirty();
        Some(child)
    }

    pub fn remove_all_children(&self) {
        let children = std::mem::take(&mut self.node.borrow_mut().children);
        for child in children {
            child.node.borrow_mut().parent = Weak::new();
            child.exit_document();
        }
        self.mark_layout_dirty();
    }

    /// Swaps the child at `index` for `new_child`, returning the old one
    /// detached from the tree.
    pub fn replace_child(&self, index: usize, new_child: &Element) -> Result<Element, ElementError> {
        let len = self.child_count();
        if index >= len {
            return Err(ElementError::IndexOutOfRange { index, len });
        }
        let old = self.remove_child_at(index).expect("index checked above");
        match self.insert_child(index, new_child) {
            Ok(()) => Ok(old),
            Err(err) => {
                // Put the old child back so a failed insert leaves the tree
                // as it was. The slot is empty and the old child is
                // detached, so this cannot fail.
                let restored = self.insert_child(index, &old);
                debug_assert!(restored.is_ok());
                Err(err)
            }
        }
    }

    pub fn move_child(&self, from: usize, to: usize) -> Result<(), ElementError> {
        let mut node = self.node.borrow_mut();
        let len = node.children.len();
        if from >= len {
            return Err(ElementError::IndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(ElementError::IndexOutOfRange { index: to, len });
        }
        let child = node.children.remove(from);
        node.children.insert(to, child);
        drop(node);
        self.mark_layout_dirty();
        Ok(())
    }

    fn is_self_or_ancestor(&self, other: &Element) -> bool {
        if self == other {
            return true;
        }
        let mut current = self.parent();
        while let Some(ancestor) = current {
            if &ancestor == other {
                return true;
            }
            current = ancestor.parent();
        }
        false
    }

    pub fn on_click(&self, handler: impl FnMut(&ClickEvent) + 'static) {
        self.node
            .borrow_mut()
            .handlers
            .click
            .push(Rc::new(RefCell::new(handler)));
    }

    pub fn on_pointer_move(&self, handler: impl FnMut(&PointerEvent) + 'static) {
        self.node
            .borrow_mut()
            .handlers
            .pointer_move
            .push(Rc::new(RefCell::new(handler)));
    }

    pub fn on_pointer_enter(&self, handler: impl FnMut(&PointerEvent) + 'static) {
        self.node
            .borrow_mut()
            .handlers
            .pointer_enter
            .push(Rc::new(RefCell::new(handler)));
    }

    pub fn on_pointer_exit(&self, handler: impl FnMut(&PointerEvent) + 'static) {
        self.node
            .borrow_mut()
            .handlers
            .pointer_exit
            .push(Rc::new(RefCell::new(handler)));
    }

    pub fn on_mouse_down(&self, handler: impl FnMut(&MouseButtonEvent) + 'static) {
        self.node
            .borrow_mut()
            .handlers
            .mouse_down
            .push(Rc::new(RefCell::new(handler)));
    }

    pub fn on_mouse_up(&self, handler: impl FnMut(&MouseButtonEvent) + 'static) {
        self.node
            .borrow_mut()
            .handlers
            .mouse_up
            .push(Rc::new(RefCell::new(handler)));
    }

    pub fn on_mouse_wheel(&self, handler: impl FnMut(&MouseWheelEvent) + 'static) {
        self.node
            .borrow_mut()
            .handlers
            .wheel
            .push(Rc::new(RefCell::new(handler)));
    }

    /// Structurally independent deep copy. Property values, brushes, clip
    /// shapes and sizing hints are copied; children are duplicated
    /// recursively. Event handlers and document wiring are not copied.
    /// Reactive build closures are shared with the original.
    pub fn duplicate(&self) -> Element {
        let node = self.node.borrow();
        let kind = match &node.kind {
            ElementKind::Plain => ElementKind::Plain,
            ElementKind::Linear {
                orientation,
                arrangement,
                default_align,
                legacy_box,
            } => ElementKind::Linear {
                orientation: *orientation,
                arrangement: *arrangement,
                default_align: *default_align,
                legacy_box: *legacy_box,
            },
            ElementKind::Reactive(reactive) => ElementKind::Reactive(reactive.duplicate()),
        };
        let copy = Element::from_kind(kind);
        {
            let mut copy_node = copy.node.borrow_mut();
            copy_node.user_id = node.user_id.clone();
            copy_node.name = node.name.clone();
            copy_node.position.set(node.position.get());
            copy_node.preferred_size.set(node.preferred_size.get());
            copy_node.min_size.set(node.min_size.get());
            copy_node.max_size.set(node.max_size.get());
            copy_node.sizing = node.sizing;
            copy_node.background = node.background.clone();
            copy_node.clip = node.clip.clone();
            copy_node.clip_applicability = node.clip_applicability;
            copy_node.visible = node.visible;
            copy_node.enabled = node.enabled;
            copy_node.theme_override = node.theme_override.clone();
        }
        for child in &node.children {
            let dup = child.duplicate();
            dup.node.borrow_mut().parent = copy.downgrade();
            copy.node.borrow_mut().children.push(dup);
        }
        copy
    }

    pub(crate) fn mark_layout_dirty(&self) {
        if let Some(signals) = &self.node.borrow().signals {
            signals.mark_layout_dirty();
            signals.mark_redraw();
        }
    }

    pub(crate) fn mark_redraw(&self) {
        if let Some(signals) = &self.node.borrow().signals {
            signals.mark_redraw();
        }
    }

    /// Wires the subtree into a document: registers user ids and subscribes
    /// the layout properties to the document's dirty signals. Id conflicts
    /// are detected before any wiring so a failure leaves the tree unwired.
    pub(crate) fn enter_document(&self, signals: &DocumentSignals) -> Result<(), ElementError> {
        let mut pending: Vec<(SmolStr, Element)> = Vec::new();
        collect_user_ids(self, &mut pending);
        let mut seen: Vec<&SmolStr> = Vec::new();
        for (id, _) in &pending {
            if signals.is_id_taken(id) || seen.contains(&id) {
                return Err(ElementError::DuplicateId { id: id.clone() });
            }
            seen.push(id);
        }
        for (id, element) in &pending {
            signals
                .register_id(id, element.node())
                .expect("conflicts checked above");
        }
        self.wire_signals(signals);
        Ok(())
    }

    fn wire_signals(&self, signals: &DocumentSignals) {
        {
            let mut node = self.node.borrow_mut();
            node.signals = Some(signals.clone());
        }

        let node = self.node.borrow();

        // Position changes only move the subtree; sizes force a full pass.
        let position = node.position.clone();
        let weak = self.downgrade();
        let position_signals = signals.clone();
        let key = position.subscribe(move |_| {
            if let Some(node) = weak.upgrade() {
                Element::from_node(node).position_changed(&position_signals);
            }
        });
        let unsub = {
            let position = position.clone();
            move || {
                position.unsubscribe(key);
            }
        };
        drop(node);
        self.node.borrow_mut().unsubscribers.push(Box::new(unsub));

        let size_props = {
            let node = self.node.borrow();
            [
                node.preferred_size.clone(),
                node.min_size.clone(),
                node.max_size.clone(),
            ]
        };
        for prop in size_props {
            let sig = signals.clone();
            let key = prop.subscribe(move |_| {
                sig.mark_layout_dirty();
                sig.mark_redraw();
            });
            let unsub = move || {
                prop.unsubscribe(key);
            };
            self.node.borrow_mut().unsubscribers.push(Box::new(unsub));
        }

        signals.mark_layout_dirty();
        signals.mark_redraw();

        for child in self.children() {
            child.wire_signals(signals);
        }
    }

    /// Unsubscribes from the document and drops id registrations, children
    /// included.
    pub(crate) fn exit_document(&self) {
        let (signals, user_id, node_id, unsubscribers) = {
            let mut node = self.node.borrow_mut();
            (
                node.signals.take(),
                node.user_id.clone(),
                node.node_id,
                std::mem::take(&mut node.unsubscribers),
            )
        };
        let Some(signals) = signals else {
            return;
        };
        for unsub in unsubscribers {
            unsub();
        }
        if let Some(id) = user_id {
            signals.unregister_id(&id, node_id);
        }
        signals.mark_layout_dirty();
        signals.mark_redraw();
        for child in self.children() {
            child.exit_document();
        }
    }

    fn position_changed(&self, signals: &DocumentSignals) {
        let parent = self.parent();
        let translate_ok = {
            let node = self.node.borrow();
            node.layout_done
                && match &parent {
                    Some(parent) => {
                        let p = parent.node.borrow();
                        p.layout_done && matches!(p.kind, ElementKind::Plain)
                    }
                    None => true,
                }
        };
        if !translate_ok {
            signals.mark_layout_dirty();
            signals.mark_redraw();
            return;
        }
        let ctx = signals.layout_context();
        // A root element resolves against the window origin.
        let parent_frame = parent
            .and_then(|p| p.measured_frame())
            .unwrap_or(Rect::ZERO);
        let position = self.position();
        let new_origin = Vec2::new(
            parent_frame.x + position.x.resolve(&ctx, parent_frame.width),
            parent_frame.y + position.y.resolve(&ctx, parent_frame.height),
        );
        let delta = new_origin - self.node.borrow().bounds.origin();
        if delta != Vec2::ZERO {
            offset_subtree(self, delta);
        }
        signals.mark_redraw();
    }

    /// Recomputes layout for this element in place. `POSITION`-only flag
    /// sets translate the subtree without measuring anything; width/height
    /// flags re-measure the subtree inside the current frame.
    pub fn recompute_layout(&self, flags: LayoutFlags, ctx: &LayoutContext, stats: &LayoutStats) {
        if !self.node.borrow().layout_done {
            return;
        }
        if !flags.needs_measure() {
            if flags.contains(LayoutFlags::POSITION) {
                let parent_frame = self
                    .parent()
                    .and_then(|p| p.measured_frame())
                    .unwrap_or(Rect::ZERO);
                let position = self.position();
                let new_origin = Vec2::new(
                    parent_frame.x + position.x.resolve(ctx, parent_frame.width),
                    parent_frame.y + position.y.resolve(ctx, parent_frame.height),
                );
                let delta = new_origin - self.node.borrow().bounds.origin();
                if delta != Vec2::ZERO {
                    offset_subtree(self, delta);
                }
                self.mark_redraw();
            }
            return;
        }
        let frame = self.node.borrow().bounds;
        self.layout(ctx, frame, stats);
        self.mark_redraw();
    }

    /// Measures this element into `frame` and lays out its children. The
    /// parent owns the frame decision; this element only subdivides it.
    pub(crate) fn layout(&self, ctx: &LayoutContext, frame: Rect, stats: &LayoutStats) {
        stats.record_measure();
        let kind_is_linear = {
            let mut node = self.node.borrow_mut();
            node.bounds = frame;
            node.layout_done = true;
            matches!(node.kind, ElementKind::Linear { .. })
        };
        if kind_is_linear {
            self.layout_linear_children(ctx, frame, stats);
        } else {
            self.layout_stacked_children(ctx, frame, stats);
        }
    }

    fn layout_stacked_children(&self, ctx: &LayoutContext, frame: Rect, stats: &LayoutStats) {
        for child in self.children() {
            if !child.visible() {
                child.node.borrow_mut().layout_done = false;
                continue;
            }
            let preferred = child.preferred_size();
            let min = child.min_size();
            let max = child.max_size();
            let width = AxisConstraints::resolve(min.x, max.x, ctx, frame.width)
                .clamp(preferred.x.resolve(ctx, frame.width));
            let height = AxisConstraints::resolve(min.y, max.y, ctx, frame.height)
                .clamp(preferred.y.resolve(ctx, frame.height));
            let position = child.position();
            let origin = Vec2::new(
                frame.x + position.x.resolve(ctx, frame.width),
                frame.y + position.y.resolve(ctx, frame.height),
            );
            child.layout(ctx, Rect::new(origin.x, origin.y, width, height), stats);
        }
    }

    fn layout_linear_children(&self, ctx: &LayoutContext, frame: Rect, stats: &LayoutStats) {
        let (orientation, arrangement, default_align) = {
            let node = self.node.borrow();
            match &node.kind {
                ElementKind::Linear {
                    orientation,
                    arrangement,
                    default_align,
                    ..
                } => (*orientation, *arrangement, *default_align),
                _ => unreachable!("caller checked the kind"),
            }
        };
        let horizontal = orientation == Orientation::Horizontal;
        let (main_extent, cross_extent) = if horizontal {
            (frame.width, frame.height)
        } else {
            (frame.height, frame.width)
        };

        let children: Vec<Element> = self
            .children()
            .into_iter()
            .filter(|child| {
                let in_layout = child.visible();
                if !in_layout {
                    child.node.borrow_mut().layout_done = false;
                }
                in_layout
            })
            .collect();

        let slots: Vec<LinearSlot> = children
            .iter()
            .map(|child| {
                let preferred = child.preferred_size();
                let min = child.min_size();
                let max = child.max_size();
                let (pref_main, min_main, max_main) = if horizontal {
                    (preferred.x, min.x, max.x)
                } else {
                    (preferred.y, min.y, max.y)
                };
                LinearSlot {
                    preferred: pref_main.resolve(ctx, main_extent),
                    constraints: AxisConstraints::resolve(min_main, max_main, ctx, main_extent),
                    growth: child
                        .sizing()
                        .map_or(0.0, |sizing| sizing.growth_for(orientation)),
                }
            })
            .collect();

        let spacing = if arrangement.is_spacing_relevant() {
            arrangement.spacing.resolve(ctx, main_extent)
        } else {
            0.0
        };
        let placements = solve_main_axis(main_extent, arrangement.justify, spacing, &slots);

        for (child, placement) in children.iter().zip(placements) {
            let preferred = child.preferred_size();
            let min = child.min_size();
            let max = child.max_size();
            let (pref_cross, min_cross, max_cross) = if horizontal {
                (preferred.y, min.y, max.y)
            } else {
                (preferred.x, min.x, max.x)
            };
            let align = child
                .sizing()
                .and_then(|sizing| sizing.align_for(orientation))
                .unwrap_or(default_align);
            let cross = place_cross(
                align,
                cross_extent,
                pref_cross.resolve(ctx, cross_extent),
                AxisConstraints::resolve(min_cross, max_cross, ctx, cross_extent),
            );
            let child_frame = if horizontal {
                Rect::new(
                    frame.x + placement.offset,
                    frame.y + cross.offset,
                    placement.size,
                    cross.size,
                )
            } else {
                Rect::new(
                    frame.x + cross.offset,
                    frame.y + placement.offset,
                    cross.size,
                    placement.size,
                )
            };
            child.layout(ctx, child_frame, stats);
        }
    }
}

fn collect_user_ids(element: &Element, out: &mut Vec<(SmolStr, Element)>) {
    if let Some(id) = element.user_id() {
        out.push((id, element.clone()));
    }
    for child in element.children() {
        collect_user_ids(&child, out);
    }
}

/// Moves an already-measured subtree without touching any measurement.
pub(crate) fn offset_subtree(element: &Element, delta: Vec2) {
    {
        let mut node = element.node().borrow_mut();
        node.bounds = node.bounds.translated(delta);
    }
    for child in element.children() {
        offset_subtree(&child, delta);
    }
}

/// Topmost-first hit test. Later siblings draw on top, so children are
/// probed in reverse order. Elements whose layout never completed, or whose
/// clip excludes the point from hit testing, are transparent to the probe.
pub(crate) fn hit_test(element: &Element, point: Vec2) -> Option<Element> {
    let (layout_done, visible, bounds, clip, applicability) = {
        let node = element.node().borrow();
        (
            node.layout_done,
            node.visible,
            node.bounds,
            node.clip.clone(),
            node.clip_applicability,
        )
    };
    if !layout_done || !visible {
        return None;
    }
    if let Some(clip) = &clip {
        if applicability.contains(ClipApplicability::HIT_TESTING)
            && !clip.contains_point(point, bounds)
        {
            return None;
        }
    }
    for child in element.children().into_iter().rev() {
        if let Some(hit) = hit_test(&child, point) {
            return Some(hit);
        }
    }
    bounds.contains(point).then(|| element.clone())
}

/// Applies the resolved theme record for the element's current state, then
/// recurses. A record whose kind tag does not match is skipped; the rest of
/// the subtree is still styled and the first mismatch is reported.
pub(crate) fn apply_theme(element: &Element, theme: &Theme) -> Result<(), ThemeError> {
    let mut first_err = None;
    apply_theme_walk(element, theme, &mut first_err);
    match first_err {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

fn apply_theme_walk(element: &Element, theme: &Theme, first_err: &mut Option<ThemeError>) {
    let (kind_name, state, override_data) = {
        let node = element.node().borrow();
        (
            node.kind_name(),
            node.effective_state(),
            node.theme_override.clone(),
        )
    };
    let mut resolved = theme.resolve(kind_name, state);
    if let Some(override_data) = override_data {
        resolved = Some(match resolved {
            Some(base) => override_data.merged_over(&base),
            None => override_data,
        });
    }
    if let Some(data) = resolved {
        if let Err(err) = apply_theme_data(element, &data) {
            first_err.get_or_insert(err);
        }
    }
    for child in element.children() {
        apply_theme_walk(&child, theme, first_err);
    }
}

pub(crate) fn apply_theme_data(element: &Element, data: &ThemeData) -> Result<(), ThemeError> {
    if let Some(kind) = &data.kind {
        let actual = element.kind_name();
        if kind != actual {
            return Err(ThemeError::TypeMismatch {
                expected: kind.clone(),
                found: SmolStr::new_static(actual),
            });
        }
    }
    let mut node = element.node().borrow_mut();
    if let Some(background) = data.background {
        node.background = Some(Box::new(ColorBrush::new(background)));
        node.themed.insert(ThemeFieldMask::BACKGROUND);
    }
    if let Some(clip) = &data.clip {
        node.clip = Some(clip.clone());
        node.themed.insert(ThemeFieldMask::CLIP);
    }
    if let Some(visible) = data.visible {
        node.visible = visible;
        node.themed.insert(ThemeFieldMask::VISIBLE);
    }
    drop(node);
    element.mark_redraw();
    Ok(())
}

/// Clears the theme-applied fields named by `mask`, recursively. Fields the
/// theme never touched are left alone.
pub(crate) fn reset_theme(element: &Element, mask: ThemeFieldMask) {
    {
        let mut node = element.node().borrow_mut();
        let to_clear = node.themed & mask;
        if to_clear.contains(ThemeFieldMask::BACKGROUND) {
            node.background = None;
        }
        if to_clear.contains(ThemeFieldMask::CLIP) {
            node.clip = None;
        }
        if to_clear.contains(ThemeFieldMask::VISIBLE) {
            node.visible = true;
        }
        node.themed.remove(to_clear);
    }
    element.mark_redraw();
    for child in element.children() {
        reset_theme(&child, mask);
    }
}
