//! Lifecycle of a single trace view.
//!
//! ```text
//! Empty → Loading → Rendered ⇄ Zoomed
//!            ↘ Failed
//! ```
//!
//! Selecting another evaluation tears everything down and starts over at
//! `Loading`; outcomes for anything but the latest request are dropped.

use crate::core::LayoutSpan;
use crate::source::{EvaluationHandle, LoadOutcome, LoadTicket};
use crate::timeline::render::Scene;
use crate::trace::TracePipeline;
use crate::view::controller::TimelineController;

/// Prefix of every failed-load message.
pub const FAILED_TO_LOAD: &str = "Failed to load trace";

/// Coarse view phase, for footers and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Empty,
    Loading,
    Failed,
    Rendered,
    Zoomed,
}

impl ViewPhase {
    pub fn as_str(self) -> &'static str {
        match self {
            ViewPhase::Empty => "empty",
            ViewPhase::Loading => "loading",
            ViewPhase::Failed => "failed",
            ViewPhase::Rendered => "rendered",
            ViewPhase::Zoomed => "zoomed",
        }
    }
}

/// A loaded trace with its derived rows and the host-owned selection.
#[derive(Debug, Clone)]
pub struct RenderedTrace {
    pub handle: EvaluationHandle,
    pub pipeline: TracePipeline,
    pub selected: Option<String>,
}

impl RenderedTrace {
    pub fn rows(&self) -> &[LayoutSpan] {
        self.pipeline.rows()
    }

    pub fn selected_span(&self) -> Option<&LayoutSpan> {
        self.selected
            .as_deref()
            .and_then(|id| self.pipeline.row_of(id))
    }

    pub fn select(&mut self, span_id: impl Into<String>) {
        self.selected = Some(span_id.into());
    }

    /// Move the selection `offset` rows, starting from the first row when
    /// nothing is selected. Returns the newly selected row.
    pub fn select_relative(&mut self, offset: isize) -> Option<usize> {
        let rows = self.pipeline.rows();
        if rows.is_empty() {
            return None;
        }
        let row = match self.selected_span() {
            Some(current) => current
                .row
                .saturating_add_signed(offset)
                .min(rows.len() - 1),
            None => 0,
        };
        self.selected = Some(rows[row].span.span_id.clone());
        Some(row)
    }
}

#[derive(Debug, Clone, Default)]
pub enum ViewState {
    #[default]
    Empty,
    Loading {
        handle: EvaluationHandle,
        ticket: LoadTicket,
    },
    Failed {
        handle: EvaluationHandle,
        message: String,
        /// Fetching again may succeed
        retryable: bool,
    },
    Rendered(Box<RenderedTrace>),
}

impl ViewState {
    /// Forget the current trace; a load still in flight is dropped when it
    /// lands.
    pub fn clear(&mut self) {
        *self = ViewState::Empty;
    }

    /// A new fetch for `handle` was issued under `ticket`.
    pub fn begin_load(&mut self, handle: EvaluationHandle, ticket: LoadTicket) {
        *self = ViewState::Loading { handle, ticket };
    }

    /// The request currently awaited, if any
    pub fn pending_ticket(&self) -> Option<LoadTicket> {
        match self {
            ViewState::Loading { ticket, .. } => Some(*ticket),
            _ => None,
        }
    }

    pub fn handle(&self) -> Option<&EvaluationHandle> {
        match self {
            ViewState::Empty => None,
            ViewState::Loading { handle, .. } | ViewState::Failed { handle, .. } => Some(handle),
            ViewState::Rendered(trace) => Some(&trace.handle),
        }
    }

    /// True when the last load failed in a way another fetch may fix.
    pub fn can_retry(&self) -> bool {
        matches!(self, ViewState::Failed { retryable: true, .. })
    }

    /// Apply a finished fetch. Returns false when the outcome answers a
    /// superseded request and was dropped.
    pub fn apply(&mut self, outcome: LoadOutcome, controller: &mut TimelineController) -> bool {
        if self.pending_ticket() != Some(outcome.ticket) {
            tracing::warn!(
                handle = %outcome.handle,
                "Discarding stale trace response"
            );
            return false;
        }

        let handle = outcome.handle;
        *self = match outcome.result {
            Ok(Some(document)) => {
                let pipeline = TracePipeline::new(&document);
                tracing::info!(handle = %handle, spans = pipeline.len(), "Trace loaded");
                controller.load(pipeline.len(), pipeline.extent());
                ViewState::Rendered(Box::new(RenderedTrace {
                    handle,
                    pipeline,
                    selected: None,
                }))
            },
            Ok(None) => {
                tracing::error!(handle = %handle, "No trace recorded for evaluation");
                ViewState::Failed {
                    handle,
                    message: format!("{FAILED_TO_LOAD}: no trace recorded"),
                    retryable: false,
                }
            },
            Err(e) => {
                let retryable = e.is_recoverable();
                if retryable {
                    tracing::warn!(handle = %handle, category = e.category(), "{}", e);
                } else {
                    tracing::error!(handle = %handle, category = e.category(), "{}", e);
                }
                ViewState::Failed {
                    handle,
                    message: format!("{FAILED_TO_LOAD}: {e}"),
                    retryable,
                }
            },
        };
        controller.request_redraw();
        true
    }

    pub fn phase(&self, controller: &TimelineController) -> ViewPhase {
        match self {
            ViewState::Empty => ViewPhase::Empty,
            ViewState::Loading { .. } => ViewPhase::Loading,
            ViewState::Failed { .. } => ViewPhase::Failed,
            ViewState::Rendered(_) if controller.is_zoomed() => ViewPhase::Zoomed,
            ViewState::Rendered(_) => ViewPhase::Rendered,
        }
    }

    pub fn rendered(&self) -> Option<&RenderedTrace> {
        match self {
            ViewState::Rendered(trace) => Some(trace),
            _ => None,
        }
    }

    pub fn rendered_mut(&mut self) -> Option<&mut RenderedTrace> {
        match self {
            ViewState::Rendered(trace) => Some(trace),
            _ => None,
        }
    }

    /// The frame for the current state; a textual placeholder unless a
    /// trace is rendered.
    pub fn scene(&self, controller: &TimelineController) -> Scene {
        match self {
            ViewState::Empty => controller.placeholder("No evaluation selected"),
            ViewState::Loading { handle, .. } => {
                controller.placeholder(format!("Loading trace {}…", handle.label()))
            },
            ViewState::Failed { message, .. } => controller.placeholder(message.clone()),
            ViewState::Rendered(trace) => controller.render(trace.rows(), trace.selected.as_deref()),
        }
    }
}
