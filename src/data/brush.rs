use std::fmt;

/// 8-bit RGBA color.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgb(0xff, 0xff, 0xff);
    pub const BLACK: Self = Self::rgb(0, 0, 0);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 0xff }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// `0xrrggbb`, fully opaque.
    pub const fn from_hex(hex: u32) -> Self {
        Self::rgb(
            ((hex >> 16) & 0xff) as u8,
            ((hex >> 8) & 0xff) as u8,
            (hex & 0xff) as u8,
        )
    }

    pub fn is_fully_transparent(&self) -> bool {
        self.a == 0
    }
}

/// Resolved paint parameters handed to the drawing surface.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Paint {
    pub color: Color,
}

impl Paint {
    pub fn solid(color: Color) -> Self {
        Self { color }
    }
}

/// A fill description for element backgrounds. Brushes are opaque value
/// objects: the core only converts them to [`Paint`] and asks whether drawing
/// with them would be a visible no-op.
pub trait Brush {
    fn to_paint(&self) -> Paint;

    /// True when drawing with this brush would not change any pixel, so the
    /// element may skip the draw call entirely.
    fn is_skippable(&self) -> bool;

    fn clone_box(&self) -> Box<dyn Brush>;
}

impl Clone for Box<dyn Brush> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl fmt::Debug for dyn Brush {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Brush")
            .field("paint", &self.to_paint())
            .finish()
    }
}

/// Uniform solid-color brush.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColorBrush {
    pub color: Color,
}

impl ColorBrush {
    pub fn new(color: Color) -> Self {
        Self { color }
    }
}

impl Brush for ColorBrush {
    fn to_paint(&self) -> Paint {
        Paint::solid(self.color)
    }

    fn is_skippable(&self) -> bool {
        self.color.is_fully_transparent()
    }

    fn clone_box(&self) -> Box<dyn Brush> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transparent_brush_is_skippable() {
        assert!(ColorBrush::new(Color::TRANSPARENT).is_skippable());
        assert!(!ColorBrush::new(Color::WHITE).is_skippable());
    }

    #[test]
    fn cloned_boxed_brush_paints_the_same() {
        let brush: Box<dyn Brush> = Box::new(ColorBrush::new(Color::from_hex(0x336699)));
        let copy = brush.clone();
        assert_eq!(brush.to_paint(), copy.to_paint());
    }

    #[test]
    fn hex_unpacks_channels() {
        let color = Color::from_hex(0x12_34_56);
        assert_eq!((color.r, color.g, color.b, color.a), (0x12, 0x34, 0x56, 0xff));
    }
}
