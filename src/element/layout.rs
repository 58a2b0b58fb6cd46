use std::cell::Cell;
use std::rc::Rc;

use bitflags::bitflags;

use crate::data::{Dimension, LayoutContext};

bitflags! {
    /// What changed since the last layout pass. `POSITION`-only changes take
    /// a translate-only fast path that never re-measures.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct LayoutFlags: u8 {
        const POSITION = 1 << 0;
        const WIDTH = 1 << 1;
        const HEIGHT = 1 << 2;
    }
}

impl LayoutFlags {
    pub const ALL: Self = Self::all();

    pub fn needs_measure(&self) -> bool {
        self.intersects(Self::WIDTH | Self::HEIGHT)
    }
}

/// Counters shared across a document's layout passes. `measures` increments
/// once per element measurement, so the position-only fast path is
/// observable from tests and instrumentation.
#[derive(Clone, Default)]
pub struct LayoutStats {
    inner: Rc<StatsInner>,
}

#[derive(Default)]
struct StatsInner {
    measures: Cell<u64>,
    passes: Cell<u64>,
}

impl LayoutStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_measure(&self) {
        self.inner.measures.set(self.inner.measures.get() + 1);
    }

    pub(crate) fn record_pass(&self) {
        self.inner.passes.set(self.inner.passes.get() + 1);
    }

    pub fn measures(&self) -> u64 {
        self.inner.measures.get()
    }

    pub fn passes(&self) -> u64 {
        self.inner.passes.get()
    }

    pub fn reset(&self) {
        self.inner.measures.set(0);
        self.inner.passes.set(0);
    }
}

/// Min/max bounds of one axis, resolved to pixels. Unset limits resolve to
/// `0` and `+inf` so clamping is always well defined.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AxisConstraints {
    pub min: f32,
    pub max: f32,
}

impl AxisConstraints {
    pub const FREE: Self = Self {
        min: 0.0,
        max: f32::INFINITY,
    };

    pub fn resolve(
        min: Dimension,
        max: Dimension,
        ctx: &LayoutContext,
        parent_extent: f32,
    ) -> Self {
        let min = if min.is_unset() {
            0.0
        } else {
            min.resolve(ctx, parent_extent).max(0.0)
        };
        let max = if max.is_unset() {
            f32::INFINITY
        } else {
            max.resolve(ctx, parent_extent).max(0.0)
        };
        Self {
            min,
            max: max.max(min),
        }
    }

    /// Clamp, flooring at `min` so degenerate inputs can never produce a
    /// negative extent.
    pub fn clamp(&self, value: f32) -> f32 {
        value.clamp(self.min, self.max)
    }
}
