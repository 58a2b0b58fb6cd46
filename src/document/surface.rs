use crate::data::{ClipShape, Color, Paint, Rect};

/// Rendering collaborator the document draws into. Implementations wrap a
/// real canvas; the document only issues ordered commands and tracks
/// dirtiness through this interface.
pub trait DrawSurface {
    fn begin_draw(&mut self);
    fn end_draw(&mut self);

    fn set_canvas_dirty(&mut self, dirty: bool);
    fn is_canvas_dirty(&self) -> bool;

    /// Pushes any buffered commands to the backing canvas.
    fn flush(&mut self);

    /// Drops all buffered state and clears to `background`.
    fn reset_and_clear(&mut self, background: Color);

    fn draw_rect(&mut self, rect: Rect, paint: &Paint);

    fn push_clip(&mut self, clip: &ClipShape, bounds: Rect);
    fn pop_clip(&mut self);
}

/// Everything a [`RecordingSurface`] remembers about one draw pass.
#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Begin,
    End,
    Flush,
    Clear(Color),
    Rect(Rect, Paint),
    PushClip(ClipShape, Rect),
    PopClip,
}

/// In-memory surface that records the command stream instead of painting.
/// Used by the crate's own tests and handy for host-side ones.
#[derive(Default)]
pub struct RecordingSurface {
    pub ops: Vec<DrawOp>,
    dirty: bool,
}

impl RecordingSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rect_count(&self) -> usize {
        self.ops
            .iter()
            .filter(|op| matches!(op, DrawOp::Rect(..)))
            .count()
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl DrawSurface for RecordingSurface {
    fn begin_draw(&mut self) {
        self.ops.push(DrawOp::Begin);
    }

    fn end_draw(&mut self) {
        self.ops.push(DrawOp::End);
    }

    fn set_canvas_dirty(&mut self, dirty: bool) {
        self.dirty = dirty;
    }

    fn is_canvas_dirty(&self) -> bool {
        self.dirty
    }

    fn flush(&mut self) {
        self.ops.push(DrawOp::Flush);
    }

    fn reset_and_clear(&mut self, background: Color) {
        self.ops.push(DrawOp::Clear(background));
    }

    fn draw_rect(&mut self, rect: Rect, paint: &Paint) {
        self.ops.push(DrawOp::Rect(rect, *paint));
    }

    fn push_clip(&mut self, clip: &ClipShape, bounds: Rect) {
        self.ops.push(DrawOp::PushClip(clip.clone(), bounds));
    }

    fn pop_clip(&mut self) {
        self.ops.push(DrawOp::PopClip);
    }
}
