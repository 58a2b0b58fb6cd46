use bitflags::bitflags;
use glam::Vec2;

use super::Rect;

bitflags! {
    /// Where an element's clip shape participates.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct ClipApplicability: u8 {
        const DRAWING = 1 << 0;
        const HIT_TESTING = 1 << 1;
    }
}

impl Default for ClipApplicability {
    fn default() -> Self {
        Self::DRAWING | Self::HIT_TESTING
    }
}

/// Clip region of an element, expressed relative to its layout bounds.
#[derive(Clone, Debug, PartialEq)]
pub enum ClipShape {
    /// The full layout rectangle.
    Rectangle,
    /// The layout rectangle with circular corners of the given radius (px).
    RoundedRectangle { radius: f32 },
    /// The largest circle inscribed in the layout rectangle.
    Circle,
    /// The ellipse inscribed in the layout rectangle.
    Ellipse,
}

impl ClipShape {
    pub fn contains_point(&self, point: Vec2, bounds: Rect) -> bool {
        if !bounds.contains(point) {
            return false;
        }
        match self {
            Self::Rectangle => true,
            Self::RoundedRectangle { radius } => rounded_rect_contains(bounds, *radius, point),
            Self::Circle => {
                let center = bounds.center();
                let radius = bounds.width.min(bounds.height) * 0.5;
                point.distance_squared(center) <= radius * radius
            }
            Self::Ellipse => {
                let center = bounds.center();
                let rx = bounds.width * 0.5;
                let ry = bounds.height * 0.5;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let dx = (point.x - center.x) / rx;
                let dy = (point.y - center.y) / ry;
                dx * dx + dy * dy <= 1.0
            }
        }
    }
}

fn rounded_rect_contains(bounds: Rect, radius: f32, point: Vec2) -> bool {
    let r = radius
        .max(0.0)
        .min(bounds.width * 0.5)
        .min(bounds.height * 0.5);
    if r <= 0.0 {
        return true;
    }

    let left = bounds.x;
    let top = bounds.y;
    let right = bounds.right();
    let bottom = bounds.bottom();

    let corners = [
        Vec2::new(left + r, top + r),
        Vec2::new(right - r, top + r),
        Vec2::new(left + r, bottom - r),
        Vec2::new(right - r, bottom - r),
    ];

    let in_corner_zone = [
        point.x < corners[0].x && point.y < corners[0].y,
        point.x > corners[1].x && point.y < corners[1].y,
        point.x < corners[2].x && point.y > corners[2].y,
        point.x > corners[3].x && point.y > corners[3].y,
    ];

    for (zone, corner) in in_corner_zone.into_iter().zip(corners) {
        if zone {
            return point.distance_squared(corner) <= r * r;
        }
    }
    true
}
