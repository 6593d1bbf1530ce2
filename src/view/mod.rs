//! Interaction state for a trace view: controller, redraw scheduling and
//! the load lifecycle.

pub mod controller;
pub mod scheduler;
pub mod state;

pub use controller::{Modifiers, TimelineController, WheelEffect, WheelInput};
pub use scheduler::RedrawScheduler;
pub use state::{RenderedTrace, ViewPhase, ViewState};
