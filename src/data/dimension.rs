use super::Size;

/// The measuring unit of a [`Dimension`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Unit {
    /// Device independent pixels, multiplied by the document's content scale.
    #[default]
    Dp,
    /// Raw pixels, no scaling applied.
    Px,
    /// Percent of the parent extent, 0 to 100.
    Percent,
    /// Percent of the viewport width, 0 to 100.
    ViewportWidth,
    /// Percent of the viewport height, 0 to 100.
    ViewportHeight,
    /// Multiple of the document's base font size.
    Em,
}

/// Everything a [`Dimension`] may resolve against.
#[derive(Clone, Copy, Debug)]
pub struct LayoutContext {
    pub content_scale: f32,
    pub viewport: Size,
    pub font_size: f32,
}

impl Default for LayoutContext {
    fn default() -> Self {
        Self {
            content_scale: 1.0,
            viewport: Size::ZERO,
            font_size: 16.0,
        }
    }
}

/// A length with a measuring unit. `NaN` marks the unset dimension.
#[derive(Clone, Copy, Debug)]
pub struct Dimension {
    pub value: f32,
    pub unit: Unit,
}

impl Dimension {
    pub const UNSET: Self = Self {
        value: f32::NAN,
        unit: Unit::Dp,
    };

    pub const fn new(value: f32, unit: Unit) -> Self {
        Self { value, unit }
    }

    pub const fn dp(value: f32) -> Self {
        Self::new(value, Unit::Dp)
    }

    pub const fn px(value: f32) -> Self {
        Self::new(value, Unit::Px)
    }

    pub const fn percent(value: f32) -> Self {
        Self::new(value, Unit::Percent)
    }

    pub const fn vw(value: f32) -> Self {
        Self::new(value, Unit::ViewportWidth)
    }

    pub const fn vh(value: f32) -> Self {
        Self::new(value, Unit::ViewportHeight)
    }

    pub const fn em(value: f32) -> Self {
        Self::new(value, Unit::Em)
    }

    pub fn is_unset(&self) -> bool {
        self.value.is_nan()
    }

    /// Resolves to pixels. `parent_extent` is the 100% base for percent
    /// values; negative bases are treated as zero. Unset resolves to 0.
    pub fn resolve(&self, ctx: &LayoutContext, parent_extent: f32) -> f32 {
        if self.is_unset() {
            return 0.0;
        }
        let parent_extent = parent_extent.max(0.0);
        match self.unit {
            Unit::Dp => self.value * ctx.content_scale,
            Unit::Px => self.value,
            Unit::Percent => self.value * parent_extent / 100.0,
            Unit::ViewportWidth => self.value * ctx.viewport.width.max(0.0) / 100.0,
            Unit::ViewportHeight => self.value * ctx.viewport.height.max(0.0) / 100.0,
            Unit::Em => self.value * ctx.font_size,
        }
    }
}

impl Default for Dimension {
    fn default() -> Self {
        Self::UNSET
    }
}

impl PartialEq for Dimension {
    fn eq(&self, other: &Self) -> bool {
        if self.is_unset() || other.is_unset() {
            return self.is_unset() && other.is_unset();
        }
        self.value == other.value && self.unit == other.unit
    }
}

impl From<f32> for Dimension {
    fn from(value: f32) -> Self {
        Self::dp(value)
    }
}

impl From<i32> for Dimension {
    fn from(value: i32) -> Self {
        Self::dp(value as f32)
    }
}

/// A pair of dimensions, generally an element position.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Dimension2 {
    pub x: Dimension,
    pub y: Dimension,
}

impl Dimension2 {
    pub const UNSET: Self = Self {
        x: Dimension::UNSET,
        y: Dimension::UNSET,
    };

    pub fn new(x: impl Into<Dimension>, y: impl Into<Dimension>) -> Self {
        Self {
            x: x.into(),
            y: y.into(),
        }
    }

    pub fn is_unset(&self) -> bool {
        self.x.is_unset() && self.y.is_unset()
    }
}
