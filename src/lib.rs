//! hookscope - waterfall timelines for policy evaluation traces.
//!
//! A coding-agent hook evaluation records one nested trace document: an
//! optional enrichment step, then policy phases that collect signals and
//! reach a decision. hookscope turns that document into a flat span list,
//! lays it out as a waterfall, and renders it interactively in the terminal
//! or statically as SVG.
//!
//! # Architecture
//!
//! - `trace`: flattening and layout (pure, infallible)
//! - `timeline`: time scale, zoom transform and scene rendering
//! - `view`: interaction controller, redraw scheduling and view lifecycle
//! - `source`: where trace documents come from, async loading, file watching
//! - `prefs`: persisted split ratios
//! - `tui`: terminal host
//! - `cli`: command-line interface
//!
//! # Example
//!
//! ```no_run
//! use hookscope_lib::core::TraceDocument;
//! use hookscope_lib::trace::TracePipeline;
//!
//! let json = std::fs::read_to_string("evaluation.json").unwrap();
//! let document: TraceDocument = serde_json::from_str(&json).unwrap();
//! let pipeline = TracePipeline::new(&document);
//! for row in pipeline.rows() {
//!     println!("{}{}", "  ".repeat(row.depth), row.span.name);
//! }
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod core;
pub mod prefs;
pub mod source;
pub mod timeline;
pub mod trace;
pub mod tui;
pub mod view;

// Re-export core types for convenience
pub use crate::core::{Config, HookscopeError, Result};
