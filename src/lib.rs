//! Declarative UI tree core: observable properties, linear-container
//! layout with growth factors, and a document-level input and render
//! pipeline driven once per frame.
//!
//! The crate deliberately stops at the [`document::DrawSurface`] boundary;
//! rasterization and windowing belong to the host.

pub mod data;
pub mod document;
pub mod element;
pub mod theme;

pub use data::*;
pub use document::*;
pub use element::*;
pub use theme::*;
