mod brush;
mod dimension;
mod geometry;
mod observable;
mod shape;

pub use brush::*;
pub use dimension::*;
pub use geometry::*;
pub use observable::*;
pub use shape::*;
