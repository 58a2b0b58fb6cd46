mod dispatcher;
pub mod event;
mod surface;

pub use dispatcher::{Dispatcher, DispatcherHandle};
pub use surface::{DrawOp, DrawSurface, RecordingSurface};

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use glam::Vec2;
use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use tracing::{debug, trace, warn};

use crate::data::{Color, LayoutContext, ObservableProperty, Rect, Size};
use crate::element::control_flow::reconcile_tree;
use crate::element::{
    self, Element, ElementError, Handlers, LayoutStats, NodeRef, WeakNode, hit_test,
};
use crate::theme::{Theme, ThemeFieldMask};
use event::{
    ClickEvent, EventMeta, MouseButton, MouseButtonEvent, MouseWheelEvent, PointerEvent,
};

/// Shared dirty flags and id cache. Every element in a document holds a
/// clone; property subscriptions raise the flags, the frame tick consumes
/// them.
#[derive(Clone, Default)]
pub(crate) struct DocumentSignals {
    inner: Rc<SignalsInner>,
}

#[derive(Default)]
struct SignalsInner {
    layout_dirty: Cell<bool>,
    needs_redraw: Cell<bool>,
    ctx: RefCell<LayoutContext>,
    ids: RefCell<FxHashMap<SmolStr, (u64, WeakNode)>>,
}

impl DocumentSignals {
    pub fn mark_layout_dirty(&self) {
        self.inner.layout_dirty.set(true);
    }

    pub fn mark_redraw(&self) {
        self.inner.needs_redraw.set(true);
    }

    pub fn take_layout_dirty(&self) -> bool {
        self.inner.layout_dirty.replace(false)
    }

    pub fn take_redraw(&self) -> bool {
        self.inner.needs_redraw.replace(false)
    }

    pub fn layout_context(&self) -> LayoutContext {
        *self.inner.ctx.borrow()
    }

    pub fn set_layout_context(&self, ctx: LayoutContext) {
        *self.inner.ctx.borrow_mut() = ctx;
    }

    pub fn is_id_taken(&self, id: &SmolStr) -> bool {
        self.inner.ids.borrow().contains_key(id)
    }

    pub fn register_id(&self, id: &SmolStr, node: &NodeRef) -> Result<(), ElementError> {
        let mut ids = self.inner.ids.borrow_mut();
        if ids.contains_key(id) {
            return Err(ElementError::DuplicateId { id: id.clone() });
        }
        let node_id = node.borrow().node_id;
        ids.insert(id.clone(), (node_id, Rc::downgrade(node)));
        Ok(())
    }

    /// Drops the registration only when it still points at `node_id`, so a
    /// re-registered id is not clobbered by a late unregister.
    pub fn unregister_id(&self, id: &SmolStr, node_id: u64) {
        let mut ids = self.inner.ids.borrow_mut();
        if ids.get(id).is_some_and(|(owner, _)| *owner == node_id) {
            ids.remove(id);
        }
    }

    pub fn lookup(&self, id: &str) -> Option<Element> {
        self.inner
            .ids
            .borrow()
            .get(id)
            .and_then(|(_, weak)| weak.upgrade())
            .map(Element::from_node)
    }
}

/// Host-visible application lifecycle state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum AppState {
    #[default]
    Active,
    Inactive,
    Hidden,
}

/// The root of a UI tree plus everything per-window: viewport, theme,
/// dispatcher, dirty tracking and input state.
pub struct UiDocument {
    root: Option<Element>,
    viewport: Size,
    content_scale: f32,
    base_font_size: f32,
    background_color: Color,
    theme: Theme,
    signals: DocumentSignals,
    stats: LayoutStats,
    dispatcher: Dispatcher,

    app_state: ObservableProperty<AppState>,
    focused: bool,
    minimized: bool,

    pressed_buttons: event::MouseButtons,
    hover_target: WeakNode,
    press_target: WeakNode,
    press_button: Option<MouseButton>,
    press_cancelled: bool,
}

impl Default for UiDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl UiDocument {
    pub fn new() -> Self {
        let document = Self {
            root: None,
            viewport: Size::ZERO,
            content_scale: 1.0,
            base_font_size: 16.0,
            background_color: Color::TRANSPARENT,
            theme: Theme::standard(),
            signals: DocumentSignals::default(),
            stats: LayoutStats::new(),
            dispatcher: Dispatcher::new(),
            app_state: ObservableProperty::new(AppState::default()),
            focused: true,
            minimized: false,
            pressed_buttons: event::MouseButtons::empty(),
            hover_target: WeakNode::new(),
            press_target: WeakNode::new(),
            press_button: None,
            press_cancelled: false,
        };
        document.push_layout_context();
        document
    }

    fn push_layout_context(&self) {
        self.signals.set_layout_context(LayoutContext {
            content_scale: self.content_scale,
            viewport: self.viewport,
            font_size: self.base_font_size,
        });
    }

    pub fn layout_context(&self) -> LayoutContext {
        self.signals.layout_context()
    }

    pub fn root(&self) -> Option<Element> {
        self.root.clone()
    }

    /// Installs a new root, detaching any previous one. The element must
    /// not already live in a tree.
    pub fn set_root(&mut self, root: Element) -> Result<(), ElementError> {
        if root.parent().is_some() {
            return Err(ElementError::DuplicateElement {
                node_id: root.node_id(),
            });
        }
        root.enter_document(&self.signals)?;
        if let Some(old) = self.root.take() {
            old.exit_document();
        }
        debug!(root = root.node_id(), "document root replaced");
        self.root = Some(root);
        self.signals.mark_layout_dirty();
        self.signals.mark_redraw();
        Ok(())
    }

    pub fn element_by_id(&self, id: &str) -> Result<Element, ElementError> {
        self.signals
            .lookup(id)
            .ok_or_else(|| ElementError::UnknownId { id: SmolStr::new(id) })
    }

    pub fn viewport_size(&self) -> Size {
        self.viewport
    }

    pub fn set_viewport_size(&mut self, size: Size) {
        if self.viewport == size {
            return;
        }
        self.viewport = size;
        self.push_layout_context();
        self.signals.mark_layout_dirty();
        self.signals.mark_redraw();
    }

    pub fn content_scale(&self) -> f32 {
        self.content_scale
    }

    pub fn set_content_scale(&mut self, scale: f32) {
        if self.content_scale == scale {
            return;
        }
        self.content_scale = scale;
        self.push_layout_context();
        self.signals.mark_layout_dirty();
        self.signals.mark_redraw();
    }

    pub fn set_base_font_size(&mut self, size: f32) {
        self.base_font_size = size;
        self.push_layout_context();
        self.signals.mark_layout_dirty();
    }

    pub fn background_color(&self) -> Color {
        self.background_color
    }

    pub fn set_background_color(&mut self, color: Color) {
        self.background_color = color;
        self.signals.mark_redraw();
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Replaces the theme context and re-applies it over the whole tree.
    pub fn set_theme(&mut self, theme: Theme) {
        self.theme = theme;
        self.reapply_theme_from_root();
    }

    pub fn reset_theme(&mut self, mask: ThemeFieldMask) {
        if let Some(root) = &self.root {
            element::reset_theme(root, mask);
        }
        self.signals.mark_redraw();
    }

    fn reapply_theme_from_root(&self) {
        if let Some(root) = &self.root {
            if let Err(err) = element::apply_theme(root, &self.theme) {
                warn!(%err, "theme application skipped a record");
            }
        }
        self.signals.mark_redraw();
    }

    fn reapply_theme_at(&self, target: &Element) {
        if let Err(err) = element::apply_theme(target, &self.theme) {
            warn!(%err, "theme application skipped a record");
        }
        self.signals.mark_redraw();
    }

    pub fn dispatcher_handle(&self) -> DispatcherHandle {
        self.dispatcher.handle()
    }

    pub fn layout_stats(&self) -> &LayoutStats {
        &self.stats
    }

    pub fn app_state(&self) -> ObservableProperty<AppState> {
        self.app_state.clone()
    }

    pub fn set_focused(&mut self, focused: bool) {
        self.focused = focused;
        self.update_app_state();
    }

    pub fn set_minimized(&mut self, minimized: bool) {
        self.minimized = minimized;
        self.update_app_state();
    }

    fn update_app_state(&self) {
        let state = if self.minimized {
            AppState::Hidden
        } else if self.focused {
            AppState::Active
        } else {
            AppState::Inactive
        };
        self.app_state.set(state);
    }

    pub fn pressed_buttons(&self) -> event::MouseButtons {
        self.pressed_buttons
    }

    /// Moves keyboard focus to `target`, clearing it from the previous
    /// holder. `None` clears focus entirely.
    pub fn set_focused_element(&mut self, target: Option<&Element>) {
        let previous: Vec<Element> = self
            .root
            .iter()
            .flat_map(|root| focused_elements(root))
            .collect();
        for element in previous {
            element.node().borrow_mut().focused = false;
            self.reapply_theme_at(&element);
        }
        if let Some(target) = target {
            target.node().borrow_mut().focused = true;
            self.reapply_theme_at(target);
        }
    }

    fn hit(&self, window_position: Vec2) -> Option<Element> {
        let root = self.root.as_ref()?;
        hit_test(root, window_position)
    }

    pub fn simulate_pointer_enter(&mut self, window_position: Vec2) {
        self.simulate_pointer_move(window_position);
    }

    pub fn simulate_pointer_move(&mut self, window_position: Vec2) {
        let target = self.hit(window_position);
        self.update_hover(target.as_ref(), window_position);
        if let Some(target) = target {
            let meta = EventMeta::new(target.node_id());
            bubble_pointer(&target, &meta, window_position, |handlers| {
                handlers.pointer_move.clone()
            });
        }
    }

    /// The pointer left the window: the hover chain is torn down and any
    /// in-flight press can no longer become a click.
    pub fn simulate_pointer_exit(&mut self) {
        if let Some(old) = self.hover_target.upgrade().map(Element::from_node) {
            let meta = EventMeta::new(old.node_id());
            bubble_pointer(&old, &meta, Vec2::NEG_ONE, |handlers| {
                handlers.pointer_exit.clone()
            });
            self.set_interaction(&old, false, false);
        }
        self.hover_target = WeakNode::new();
        self.press_cancelled = true;
    }

    pub fn simulate_pointer_down(&mut self, window_position: Vec2) {
        self.simulate_mouse_button(window_position, MouseButton::Primary, true);
    }

    pub fn simulate_pointer_up(&mut self, window_position: Vec2) {
        self.simulate_mouse_button(window_position, MouseButton::Primary, false);
    }

    pub fn simulate_mouse_button(
        &mut self,
        window_position: Vec2,
        button: MouseButton,
        pressed: bool,
    ) {
        if pressed {
            self.pressed_buttons.insert(button.flag());
        } else {
            self.pressed_buttons.remove(button.flag());
        }

        let target = self.hit(window_position);
        let meta = target
            .as_ref()
            .map(|t| EventMeta::new(t.node_id()))
            .unwrap_or_else(|| EventMeta::new(0));

        if let Some(target) = &target {
            let event_meta = meta.clone();
            bubble(
                target,
                &meta,
                window_position,
                |handlers| {
                    if pressed {
                        handlers.mouse_down.clone()
                    } else {
                        handlers.mouse_up.clone()
                    }
                },
                move |local| MouseButtonEvent {
                    meta: event_meta.clone(),
                    position: local,
                    window_position,
                    button,
                    pressed,
                },
            );
        }

        if pressed {
            self.begin_press(target.as_ref(), button, meta.cancelled());
        } else {
            self.finish_press(target.as_ref(), button, window_position, meta.cancelled());
        }
    }

    pub fn simulate_mouse_wheel(&mut self, window_position: Vec2, delta: Vec2, precise: bool) {
        let Some(target) = self.hit(window_position) else {
            return;
        };
        let meta = EventMeta::new(target.node_id());
        let event_meta = meta.clone();
        bubble(
            &target,
            &meta,
            window_position,
            |handlers| handlers.wheel.clone(),
            move |local| MouseWheelEvent {
                meta: event_meta.clone(),
                position: local,
                window_position,
                delta,
                precise,
            },
        );
    }

    fn update_hover(&mut self, target: Option<&Element>, window_position: Vec2) {
        let old = self.hover_target.upgrade().map(Element::from_node);
        let changed = match (&old, target) {
            (Some(a), Some(b)) => a != b,
            (None, None) => false,
            _ => true,
        };
        if !changed {
            return;
        }
        if let Some(old) = old {
            let meta = EventMeta::new(old.node_id());
            bubble_pointer(&old, &meta, window_position, |handlers| {
                handlers.pointer_exit.clone()
            });
            self.set_interaction(&old, false, false);
        }
        if let Some(new) = target {
            let meta = EventMeta::new(new.node_id());
            bubble_pointer(new, &meta, window_position, |handlers| {
                handlers.pointer_enter.clone()
            });
            let keep_pressed = self
                .press_target
                .upgrade()
                .is_some_and(|node| Element::from_node(node) == *new);
            self.set_interaction(new, true, keep_pressed);
            self.hover_target = new.downgrade();
        } else {
            self.hover_target = WeakNode::new();
        }
    }

    fn begin_press(&mut self, target: Option<&Element>, button: MouseButton, cancelled: bool) {
        let Some(target) = target else {
            self.press_target = WeakNode::new();
            self.press_button = None;
            return;
        };
        self.set_interaction(target, true, true);
        self.press_target = target.downgrade();
        self.press_button = Some(button);
        self.press_cancelled = cancelled;
    }

    fn finish_press(
        &mut self,
        target: Option<&Element>,
        button: MouseButton,
        window_position: Vec2,
        up_cancelled: bool,
    ) {
        let pressed = self.press_target.upgrade().map(Element::from_node);
        self.press_target = WeakNode::new();
        let press_button = self.press_button.take();
        let down_cancelled = self.press_cancelled;
        self.press_cancelled = false;

        if let Some(pressed) = &pressed {
            let still_hovered = target == Some(pressed);
            self.set_interaction(pressed, still_hovered, false);
        }

        let click_target = match (pressed, target) {
            (Some(a), Some(b)) if a == *b => a,
            _ => return,
        };
        if down_cancelled || up_cancelled || press_button != Some(button) {
            trace!(node = click_target.node_id(), "press cancelled, no click");
            return;
        }
        let meta = EventMeta::new(click_target.node_id());
        let event_meta = meta.clone();
        bubble(
            &click_target,
            &meta,
            window_position,
            |handlers| handlers.click.clone(),
            move |local| ClickEvent {
                meta: event_meta.clone(),
                position: local,
                window_position,
                button,
            },
        );
    }

    /// Applies hover/pressed transitions and re-applies the theme when the
    /// visual state actually changed. Disabled elements never transition.
    fn set_interaction(&self, element: &Element, hovered: bool, pressed: bool) {
        let changed = {
            let mut node = element.node().borrow_mut();
            if !node.enabled {
                false
            } else {
                let before = node.effective_state();
                node.hovered = hovered;
                node.pressed = pressed;
                node.effective_state() != before
            }
        };
        if changed {
            self.reapply_theme_at(element);
        }
    }

    /// One cooperative frame: drain the dispatcher, reconcile reactive
    /// children, lay out if dirty, redraw if dirty.
    pub fn run_frame(&mut self, surface: &mut dyn DrawSurface) -> Result<(), ElementError> {
        for job in self.dispatcher.take_jobs() {
            job(self);
        }
        if let Some(root) = self.root.clone() {
            reconcile_tree(&root)?;
        }
        if self.signals.take_layout_dirty() {
            if let Some(root) = self.root.clone() {
                let ctx = self.layout_context();
                let frame = Rect::from_origin_size(Vec2::ZERO, self.viewport);
                root.layout(&ctx, frame, &self.stats);
                self.stats.record_pass();
                trace!(measures = self.stats.measures(), "layout pass");
            }
            self.signals.mark_redraw();
        }
        if self.signals.take_redraw() {
            surface.set_canvas_dirty(true);
        }
        if surface.is_canvas_dirty() {
            self.draw_all_elements(surface);
            surface.set_canvas_dirty(false);
        }
        Ok(())
    }

    /// Unconditional full redraw of the tree into `surface`.
    pub fn draw_all_elements(&mut self, surface: &mut dyn DrawSurface) {
        surface.begin_draw();
        surface.reset_and_clear(self.background_color);
        if let Some(root) = &self.root {
            draw_element(root, surface);
        }
        surface.end_draw();
        surface.flush();
    }
}

fn focused_elements(element: &Element) -> Vec<Element> {
    let mut out = Vec::new();
    collect_focused(element, &mut out);
    out
}

fn collect_focused(element: &Element, out: &mut Vec<Element>) {
    if element.node().borrow().focused {
        out.push(element.clone());
    }
    for child in element.children() {
        collect_focused(&child, out);
    }
}

fn draw_element(element: &Element, surface: &mut dyn DrawSurface) {
    use crate::data::ClipApplicability;

    let (visible, layout_done, bounds, paint, clip) = {
        let node = element.node().borrow();
        let paint = node
            .background
            .as_ref()
            .filter(|brush| !brush.is_skippable())
            .map(|brush| brush.to_paint());
        let clip = node
            .clip
            .clone()
            .filter(|_| node.clip_applicability.contains(ClipApplicability::DRAWING));
        (node.visible, node.layout_done, node.bounds, paint, clip)
    };
    if !visible || !layout_done {
        return;
    }
    // The clip covers the element's own fill as well as its children.
    if let Some(clip) = &clip {
        surface.push_clip(clip, bounds);
    }
    if let Some(paint) = paint {
        surface.draw_rect(bounds, &paint);
    }
    for child in element.children() {
        draw_element(&child, surface);
    }
    if clip.is_some() {
        surface.pop_clip();
    }
}

type HandlerList<E> = Vec<Rc<RefCell<dyn FnMut(&E)>>>;

/// Walks from the hit target to the root, calling each element's handlers
/// with element-local coordinates. Disabled elements are skipped; a stopped
/// event goes no further.
fn bubble<E>(
    target: &Element,
    meta: &EventMeta,
    window_position: Vec2,
    select: impl Fn(&Handlers) -> HandlerList<E>,
    make_event: impl Fn(Vec2) -> E,
) {
    let mut current = Some(target.clone());
    while let Some(element) = current {
        let (handlers, enabled, bounds) = {
            let node = element.node().borrow();
            (select(&node.handlers), node.enabled, node.bounds)
        };
        if enabled && !handlers.is_empty() {
            let event = make_event(window_position - bounds.origin());
            for handler in handlers {
                if meta.propagation_stopped() {
                    return;
                }
                if let Ok(mut handler) = handler.try_borrow_mut() {
                    handler(&event);
                }
            }
        }
        if meta.propagation_stopped() {
            return;
        }
        current = element.parent();
    }
}

fn bubble_pointer(
    target: &Element,
    meta: &EventMeta,
    window_position: Vec2,
    select: impl Fn(&Handlers) -> HandlerList<PointerEvent>,
) {
    let event_meta = meta.clone();
    bubble(target, meta, window_position, select, move |local| {
        PointerEvent {
            meta: event_meta.clone(),
            position: local,
            window_position,
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ClipShape, ColorBrush, Dimension, Dimension2};
    use crate::element::{if_else, ContainerSizing, LinearArrangement, VisualState};
    use crate::theme::ThemeData;

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    fn sized(width: f32, height: f32) -> Element {
        let element = Element::new();
        element.set_preferred_size(Dimension2::new(Dimension::px(width), Dimension::px(height)));
        element
    }

    fn document_with_root(root: &Element) -> UiDocument {
        let mut document = UiDocument::new();
        document.set_viewport_size(Size::new(800.0, 600.0));
        document.set_root(root.clone()).unwrap();
        document
    }

    #[test]
    fn run_frame_lays_out_and_draws_once() {
        init_logging();
        let root = Element::new();
        root.set_background(Some(Box::new(ColorBrush::new(Color::WHITE))));
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();

        document.run_frame(&mut surface).unwrap();
        assert_eq!(surface.rect_count(), 1);
        assert_eq!(root.measured_frame().unwrap(), Rect::new(0.0, 0.0, 800.0, 600.0));

        // A clean second frame issues no draw commands.
        surface.clear_ops();
        document.run_frame(&mut surface).unwrap();
        assert!(surface.ops.is_empty());
    }

    #[test]
    fn background_color_is_cleared_first() {
        let root = Element::new();
        let mut document = document_with_root(&root);
        document.set_background_color(Color::BLACK);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();
        assert_eq!(surface.ops[0], DrawOp::Begin);
        assert_eq!(surface.ops[1], DrawOp::Clear(Color::BLACK));
    }

    #[test]
    fn invisible_subtrees_are_not_drawn() {
        let root = Element::new();
        let child = sized(100.0, 100.0);
        child.set_background(Some(Box::new(ColorBrush::new(Color::WHITE))));
        child.set_visible(false);
        root.add_child(&child).unwrap();
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();
        assert_eq!(surface.rect_count(), 0);
    }

    #[test]
    fn element_by_id_round_trips() {
        let root = Element::new();
        let child = Element::new();
        child.set_user_id("status").unwrap();
        root.add_child(&child).unwrap();
        let document = document_with_root(&root);

        assert_eq!(document.element_by_id("status").unwrap(), child);
        assert_eq!(
            document.element_by_id("missing").unwrap_err(),
            ElementError::UnknownId {
                id: SmolStr::new_static("missing")
            }
        );
    }

    #[test]
    fn duplicate_user_ids_are_rejected_on_insertion() {
        let root = Element::new();
        let first = Element::new();
        first.set_user_id("status").unwrap();
        root.add_child(&first).unwrap();
        let document = document_with_root(&root);

        let second = Element::new();
        second.set_user_id("status").unwrap();
        let err = root.add_child(&second).unwrap_err();
        assert_eq!(
            err,
            ElementError::DuplicateId {
                id: SmolStr::new_static("status")
            }
        );
        assert!(second.parent().is_none());
        drop(document);
    }

    #[test]
    fn dispatcher_jobs_run_before_layout() {
        let root = Element::new();
        let mut document = document_with_root(&root);
        let handle = document.dispatcher_handle();
        handle.invoke_on_ui_thread(|document| {
            document.set_background_color(Color::WHITE);
        });

        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();
        assert_eq!(document.background_color(), Color::WHITE);
        assert!(surface.ops.contains(&DrawOp::Clear(Color::WHITE)));
    }

    #[test]
    fn click_fires_for_a_clean_press_release_pair() {
        let root = Element::new();
        let button = sized(100.0, 100.0);
        root.add_child(&button).unwrap();
        let clicks = Rc::new(Cell::new(0));
        {
            let clicks = clicks.clone();
            button.on_click(move |_| clicks.set(clicks.get() + 1));
        }
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_pointer_down(Vec2::new(50.0, 50.0));
        assert_eq!(button.visual_state(), VisualState::Pressed);
        document.simulate_pointer_up(Vec2::new(60.0, 40.0));
        assert_eq!(clicks.get(), 1);
    }

    #[test]
    fn release_off_target_never_clicks() {
        let root = Element::new();
        let button = sized(100.0, 100.0);
        root.add_child(&button).unwrap();
        let clicks = Rc::new(Cell::new(0));
        {
            let clicks = clicks.clone();
            button.on_click(move |_| clicks.set(clicks.get() + 1));
        }
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_pointer_down(Vec2::new(50.0, 50.0));
        document.simulate_pointer_up(Vec2::new(400.0, 400.0));
        assert_eq!(clicks.get(), 0);
        assert_eq!(button.visual_state(), VisualState::Normal);
    }

    #[test]
    fn cancelled_press_suppresses_the_click() {
        let root = Element::new();
        let button = sized(100.0, 100.0);
        root.add_child(&button).unwrap();
        button.on_mouse_down(|event| event.meta.cancel());
        let clicks = Rc::new(Cell::new(0));
        {
            let clicks = clicks.clone();
            button.on_click(move |_| clicks.set(clicks.get() + 1));
        }
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_pointer_down(Vec2::new(50.0, 50.0));
        document.simulate_pointer_up(Vec2::new(50.0, 50.0));
        assert_eq!(clicks.get(), 0);
    }

    #[test]
    fn hover_follows_the_pointer() {
        let root = Element::row(LinearArrangement::default());
        let left = sized(100.0, 100.0);
        let right = sized(100.0, 100.0);
        root.add_child(&left).unwrap();
        root.add_child(&right).unwrap();
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_pointer_move(Vec2::new(50.0, 50.0));
        assert_eq!(left.visual_state(), VisualState::Hover);

        document.simulate_pointer_move(Vec2::new(150.0, 50.0));
        assert_eq!(left.visual_state(), VisualState::Normal);
        assert_eq!(right.visual_state(), VisualState::Hover);

        document.simulate_pointer_exit();
        assert_eq!(right.visual_state(), VisualState::Normal);
    }

    #[test]
    fn disabled_elements_ignore_input() {
        let root = Element::new();
        let button = sized(100.0, 100.0);
        button.set_enabled(false);
        root.add_child(&button).unwrap();
        let clicks = Rc::new(Cell::new(0));
        {
            let clicks = clicks.clone();
            button.on_click(move |_| clicks.set(clicks.get() + 1));
        }
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_pointer_move(Vec2::new(50.0, 50.0));
        assert_eq!(button.visual_state(), VisualState::Disabled);
        document.simulate_pointer_down(Vec2::new(50.0, 50.0));
        document.simulate_pointer_up(Vec2::new(50.0, 50.0));
        assert_eq!(clicks.get(), 0);
    }

    #[test]
    fn stop_propagation_keeps_ancestors_out() {
        let root = Element::new();
        let child = sized(100.0, 100.0);
        root.add_child(&child).unwrap();
        let root_saw = Rc::new(Cell::new(false));
        {
            let root_saw = root_saw.clone();
            root.on_pointer_move(move |_| root_saw.set(true));
        }
        child.on_pointer_move(|event| event.meta.stop_propagation());
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_pointer_move(Vec2::new(50.0, 50.0));
        assert!(!root_saw.get());
    }

    #[test]
    fn wheel_events_carry_delta_and_precision() {
        let root = sized_root();
        let seen = Rc::new(RefCell::new(None));
        {
            let seen = seen.clone();
            root.on_mouse_wheel(move |event| {
                *seen.borrow_mut() = Some((event.delta, event.precise));
            });
        }
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_mouse_wheel(Vec2::new(10.0, 10.0), Vec2::new(0.0, -3.0), true);
        assert_eq!(*seen.borrow(), Some((Vec2::new(0.0, -3.0), true)));
    }

    fn sized_root() -> Element {
        let root = Element::new();
        root.set_preferred_size(Dimension2::new(Dimension::px(800.0), Dimension::px(600.0)));
        root
    }

    #[test]
    fn position_change_skips_the_measure_pass() {
        let root = Element::new();
        let child = sized(100.0, 100.0);
        root.add_child(&child).unwrap();
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();
        document.layout_stats().reset();

        child.set_position(Dimension2::new(Dimension::px(30.0), Dimension::px(70.0)));
        document.run_frame(&mut surface).unwrap();

        assert_eq!(document.layout_stats().measures(), 0);
        let frame = child.measured_frame().unwrap();
        assert_eq!((frame.x, frame.y), (30.0, 70.0));
    }

    #[test]
    fn repeated_root_position_sets_do_not_accumulate() {
        let root = sized_root();
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        root.set_position(Dimension2::new(Dimension::px(10.0), Dimension::px(10.0)));
        root.set_position(Dimension2::new(Dimension::px(20.0), Dimension::px(20.0)));

        let frame = root.measured_frame().unwrap();
        assert_eq!((frame.x, frame.y), (20.0, 20.0));
    }

    #[test]
    fn own_background_is_drawn_inside_the_clip() {
        let root = Element::new();
        let child = sized(100.0, 100.0);
        child.set_background(Some(Box::new(ColorBrush::new(Color::WHITE))));
        child.set_clip(Some(ClipShape::Circle));
        root.add_child(&child).unwrap();
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        let push_at = surface
            .ops
            .iter()
            .position(|op| matches!(op, DrawOp::PushClip(..)))
            .unwrap();
        let rect_at = surface
            .ops
            .iter()
            .position(|op| matches!(op, DrawOp::Rect(..)))
            .unwrap();
        assert!(push_at < rect_at);
    }

    #[test]
    fn size_change_forces_a_measure_pass() {
        let root = Element::new();
        let child = sized(100.0, 100.0);
        root.add_child(&child).unwrap();
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();
        document.layout_stats().reset();

        child.set_preferred_width(Dimension::px(250.0));
        document.run_frame(&mut surface).unwrap();

        assert!(document.layout_stats().measures() > 0);
        assert_eq!(child.measured_frame().unwrap().width, 250.0);
    }

    #[test]
    fn reactive_children_materialize_during_the_frame() {
        let condition = ObservableProperty::new(true);
        let shown = if_else(&condition, || {
            let e = Element::new();
            e.set_user_id("branch-a").unwrap();
            e
        }, Element::new);
        let root = Element::new();
        root.add_child(&shown).unwrap();
        let mut document = document_with_root(&root);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        assert!(document.element_by_id("branch-a").is_ok());

        condition.set(false);
        document.run_frame(&mut surface).unwrap();
        assert!(document.element_by_id("branch-a").is_err());
    }

    #[test]
    fn app_state_tracks_focus_and_minimize() {
        let mut document = UiDocument::new();
        assert_eq!(document.app_state().get(), AppState::Active);

        document.set_focused(false);
        assert_eq!(document.app_state().get(), AppState::Inactive);

        document.set_minimized(true);
        assert_eq!(document.app_state().get(), AppState::Hidden);

        document.set_minimized(false);
        document.set_focused(true);
        assert_eq!(document.app_state().get(), AppState::Active);
    }

    #[test]
    fn theme_reacts_to_state_transitions() {
        let mut theme = Theme::new();
        theme.insert(
            "element",
            VisualState::Hover,
            ThemeData::new().with_background(Color::WHITE),
        );
        let root = Element::new();
        let target = sized(100.0, 100.0);
        root.add_child(&target).unwrap();
        let mut document = document_with_root(&root);
        document.set_theme(theme);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        document.simulate_pointer_move(Vec2::new(50.0, 50.0));
        let painted = {
            let node = target.node().borrow();
            node.background.as_ref().map(|b| b.to_paint().color)
        };
        assert_eq!(painted, Some(Color::WHITE));
    }

    #[test]
    fn spacer_pushes_siblings_apart() {
        let row = Element::row(LinearArrangement::default());
        let left = sized(100.0, 50.0);
        let right = sized(100.0, 50.0);
        row.add_child(&left).unwrap();
        row.add_child(&Element::spacer(ContainerSizing::row(1.0))).unwrap();
        row.add_child(&right).unwrap();
        let mut document = document_with_root(&row);
        let mut surface = RecordingSurface::new();
        document.run_frame(&mut surface).unwrap();

        assert_eq!(right.measured_frame().unwrap().x, 700.0);
    }
}
