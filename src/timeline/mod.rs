//! Timeline renderer: time scale, labels, colors and draw commands.
//!
//! Rendering is a pure function from laid-out spans, a zoomed scale, the
//! current selection and a viewport to a [`Scene`]. Hosts (the terminal UI,
//! the SVG exporter) only paint scenes.

pub mod format;
pub mod palette;
pub mod render;
pub mod scale;
pub mod svg;

pub use palette::{ColorTable, Palette, Rgb, Theme};
pub use render::{
    Anchor, DrawCommand, RenderInput, Scene, TimelineGeometry, TimelineRenderer, Viewport,
};
pub use scale::{base_scale, TimeScale, ZoomTransform};
