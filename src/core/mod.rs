//! Core domain models, configuration and errors for hookscope.
//!
//! This module contains the trace document model, the span types the
//! flattening and layout engines produce, and the ambient configuration.

#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types
pub use config::{Config, ConfigBuilder};
pub use error::{HookscopeError, Result};
pub use types::{
    EnrichPhase, EvaluationResult, LayoutSpan, PolicyPhase, ServiceClass, SignalExecution,
    SignalsPhase, SpanStatus, TraceDocument, TraceSpan,
};
