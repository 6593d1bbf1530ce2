//! Interaction controller for one timeline view.
//!
//! Owns the viewport, the zoom transform, vertical scroll and hover. It never
//! touches the span list: every gesture only changes how the same rows are
//! projected, so zooming costs one scene render and no relayout.

use crate::core::config::ZoomConfig;
use crate::core::LayoutSpan;
use crate::timeline::render::{RenderInput, Scene, TimelineGeometry, TimelineRenderer, Viewport};
use crate::timeline::scale::{base_scale, TimeScale, ZoomTransform};
use crate::view::scheduler::RedrawScheduler;
use std::time::{Duration, Instant};

/// Rows scrolled per wheel notch
const ROWS_PER_NOTCH: f64 = 3.0;

/// Modifier keys held during a pointer event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub ctrl: bool,
    pub meta: bool,
    pub shift: bool,
}

/// A wheel event in viewport coordinates. Deltas are in notches; positive
/// `delta_y` scrolls down (or zooms out).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelInput {
    pub x: f64,
    pub y: f64,
    pub delta_x: f64,
    pub delta_y: f64,
    pub modifiers: Modifiers,
}

/// What a wheel event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WheelEffect {
    Zoomed,
    Panned,
    Scrolled,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct TimelineController {
    renderer: TimelineRenderer,
    zoom: ZoomConfig,
    viewport: Viewport,
    extent: u64,
    row_count: usize,
    base: TimeScale,
    transform: ZoomTransform,
    scroll_top: f64,
    hovered: Option<usize>,
    drag_origin: Option<f64>,
    scheduler: RedrawScheduler,
}

impl TimelineController {
    pub fn new(renderer: TimelineRenderer, zoom: ZoomConfig, frame_interval: Duration) -> Self {
        let viewport = Viewport::default();
        let (left, right) = renderer.geometry().timeline_range(viewport.width);
        Self {
            renderer,
            zoom,
            viewport,
            extent: 0,
            row_count: 0,
            base: base_scale(0, left, right),
            transform: ZoomTransform::IDENTITY,
            scroll_top: 0.0,
            hovered: None,
            drag_origin: None,
            scheduler: RedrawScheduler::new(frame_interval),
        }
    }

    fn geometry(&self) -> &TimelineGeometry {
        self.renderer.geometry()
    }

    fn range(&self) -> (f64, f64) {
        self.base.range()
    }

    fn rebuild_base(&mut self) {
        let (left, right) = self.geometry().timeline_range(self.viewport.width);
        self.base = base_scale(self.extent, left, right);
        self.transform = self.transform.constrain(self.base.range());
    }

    /// Start showing a new trace. Zoom, scroll and hover are per trace and
    /// start over.
    pub fn load(&mut self, row_count: usize, extent: u64) {
        self.row_count = row_count;
        self.extent = extent;
        self.transform = ZoomTransform::IDENTITY;
        self.scroll_top = 0.0;
        self.hovered = None;
        self.drag_origin = None;
        self.rebuild_base();
        self.scheduler.request();
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    /// New viewport size. The time scale range depends on the width; row
    /// geometry does not.
    pub fn resize(&mut self, viewport: Viewport) {
        if viewport == self.viewport {
            return;
        }
        self.viewport = viewport;
        self.rebuild_base();
        self.scroll_top = self.scroll_top.clamp(0.0, self.max_scroll());
        self.scheduler.request();
    }

    pub fn transform(&self) -> ZoomTransform {
        self.transform
    }

    pub fn is_zoomed(&self) -> bool {
        !self.transform.is_identity()
    }

    /// Scale bars and ticks are drawn with.
    pub fn scale(&self) -> TimeScale {
        self.transform.rescale(&self.base)
    }

    fn set_transform(&mut self, transform: ZoomTransform) -> bool {
        if transform == self.transform {
            return false;
        }
        self.transform = transform;
        self.scheduler.request();
        true
    }

    /// Zoom by `factor` keeping the time under `x` fixed.
    pub fn zoom_at(&mut self, x: f64, factor: f64) -> bool {
        if !factor.is_finite() || factor <= 0.0 {
            return false;
        }
        let next = self.transform.zoom_at(x, factor, &self.zoom, self.range());
        self.set_transform(next)
    }

    fn center(&self) -> f64 {
        let (r0, r1) = self.range();
        (r0 + r1) / 2.0
    }

    pub fn zoom_in(&mut self) -> bool {
        self.zoom_at(self.center(), self.zoom.step)
    }

    pub fn zoom_out(&mut self) -> bool {
        self.zoom_at(self.center(), 1.0 / self.zoom.step)
    }

    /// Shift the time axis by `dx` host units.
    pub fn pan_by(&mut self, dx: f64) -> bool {
        let next = self.transform.pan(dx, self.range());
        self.set_transform(next)
    }

    /// Show earlier times
    pub fn pan_left(&mut self) -> bool {
        self.pan_by(self.geometry().pan_step)
    }

    /// Show later times
    pub fn pan_right(&mut self) -> bool {
        self.pan_by(-self.geometry().pan_step)
    }

    pub fn reset_zoom(&mut self) -> bool {
        self.set_transform(ZoomTransform::IDENTITY)
    }

    /// Begin a horizontal drag-to-pan at `x`.
    pub fn drag_start(&mut self, x: f64) {
        self.drag_origin = Some(x);
    }

    pub fn drag_to(&mut self, x: f64) -> bool {
        let Some(origin) = self.drag_origin.replace(x) else {
            return false;
        };
        self.pan_by(x - origin)
    }

    pub fn drag_end(&mut self) {
        self.drag_origin = None;
    }

    pub fn is_dragging(&self) -> bool {
        self.drag_origin.is_some()
    }

    /// Ctrl or Cmd turns the wheel into zoom at the pointer; shift or a
    /// horizontal delta pans; anything else scrolls the rows.
    pub fn wheel(&mut self, input: WheelInput) -> WheelEffect {
        let changed;
        let effect;
        if input.modifiers.ctrl || input.modifiers.meta {
            let factor = self.zoom.step.powf(-input.delta_y);
            changed = self.zoom_at(input.x, factor);
            effect = WheelEffect::Zoomed;
        } else if input.modifiers.shift || input.delta_x != 0.0 {
            let notches = if input.delta_x != 0.0 { input.delta_x } else { input.delta_y };
            changed = self.pan_by(-notches * self.geometry().pan_step);
            effect = WheelEffect::Panned;
        } else {
            changed = self.scroll_by(input.delta_y * ROWS_PER_NOTCH * self.geometry().row_height);
            effect = WheelEffect::Scrolled;
        }
        if changed {
            effect
        } else {
            WheelEffect::Ignored
        }
    }

    pub fn scroll_top(&self) -> f64 {
        self.scroll_top
    }

    pub fn max_scroll(&self) -> f64 {
        let g = self.geometry();
        (g.content_height(self.row_count, self.viewport.height) - self.viewport.height).max(0.0)
    }

    pub fn scroll_to(&mut self, top: f64) -> bool {
        let top = top.clamp(0.0, self.max_scroll());
        if (top - self.scroll_top).abs() < f64::EPSILON {
            return false;
        }
        self.scroll_top = top;
        self.scheduler.request();
        true
    }

    pub fn scroll_by(&mut self, dy: f64) -> bool {
        self.scroll_to(self.scroll_top + dy)
    }

    /// Scroll one body height up or down.
    pub fn page(&mut self, pages: f64) -> bool {
        let g = self.geometry();
        let body = (self.viewport.height - g.header_height).max(g.row_height);
        self.scroll_by(pages * body)
    }

    /// Scroll the minimum amount that makes `row` fully visible.
    pub fn scroll_into_view(&mut self, row: usize) -> bool {
        let g = *self.geometry();
        let top = row as f64 * g.row_height;
        let body = (self.viewport.height - g.header_height).max(g.row_height);
        if top < self.scroll_top {
            self.scroll_to(top)
        } else if top + g.row_height > self.scroll_top + body {
            self.scroll_to(top + g.row_height - body)
        } else {
            false
        }
    }

    /// Row under viewport position `(x, y)`. The whole row width is a target,
    /// bars and labels alike.
    pub fn hit_test(&self, x: f64, y: f64) -> Option<usize> {
        if x < 0.0 || x > self.viewport.width || y > self.viewport.height {
            return None;
        }
        self.geometry()
            .row_at(y, self.scroll_top)
            .filter(|&row| row < self.row_count)
    }

    /// Select the span under the pointer. Selection lives with the caller;
    /// `on_select` receives the clicked span.
    pub fn click<'a>(
        &mut self,
        x: f64,
        y: f64,
        rows: &'a [LayoutSpan],
        on_select: impl FnOnce(&'a LayoutSpan),
    ) -> bool {
        let Some(layout) = self.hit_test(x, y).and_then(|row| rows.get(row)) else {
            return false;
        };
        on_select(layout);
        self.scheduler.request();
        true
    }

    /// Double-click never resets zoom; a stray one while inspecting spans
    /// would throw away the current window.
    pub fn double_click(&mut self, _x: f64, _y: f64) -> bool {
        false
    }

    pub fn hover(&mut self, x: f64, y: f64) -> bool {
        let row = self.hit_test(x, y);
        if row == self.hovered {
            return false;
        }
        self.hovered = row;
        self.scheduler.request();
        true
    }

    pub fn leave(&mut self) -> bool {
        if self.hovered.take().is_some() {
            self.scheduler.request();
            return true;
        }
        false
    }

    pub fn hovered(&self) -> Option<usize> {
        self.hovered
    }

    /// Mark the view dirty without changing any state.
    pub fn request_redraw(&mut self) {
        self.scheduler.request();
    }

    /// Whether a frame should be painted at `now`; claims it if so.
    pub fn begin_frame(&mut self, now: Instant) -> bool {
        self.scheduler.begin_frame(now)
    }

    pub fn time_until_due(&self, now: Instant) -> Option<Duration> {
        self.scheduler.time_until_due(now)
    }

    pub fn render(&self, rows: &[LayoutSpan], selected: Option<&str>) -> Scene {
        let scale = self.scale();
        self.renderer.render(&RenderInput {
            rows,
            scale: &scale,
            selected,
            hovered: self.hovered,
            viewport: self.viewport,
            scroll_top: self.scroll_top,
        })
    }

    /// A message frame in this view's palette.
    pub fn placeholder(&self, message: impl Into<String>) -> Scene {
        Scene::placeholder(self.viewport, self.renderer.palette(), message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ServiceClass, SpanStatus, TraceSpan};
    use crate::timeline::palette::{ColorTable, Theme};
    use serde_json::Value;

    fn controller() -> TimelineController {
        let renderer = TimelineRenderer::new(
            TimelineGeometry::default(),
            Theme::Dark.palette(),
            ColorTable::default(),
        );
        let mut controller =
            TimelineController::new(renderer, ZoomConfig::default(), Duration::from_millis(16));
        controller.resize(Viewport::new(1_216.0, 270.0));
        controller.load(100, 10_000);
        controller
    }

    fn rows(count: usize) -> Vec<LayoutSpan> {
        (0..count)
            .map(|row| LayoutSpan {
                span: TraceSpan {
                    span_id: format!("s{row}"),
                    parent_id: None,
                    name: format!("s{row}"),
                    service_name: ServiceClass::Phase,
                    start_time: row as u64 * 100,
                    duration: 100,
                    status: SpanStatus::Ok,
                    timing_is_approximate: false,
                    data: Value::Null,
                },
                row,
                depth: 0,
            })
            .collect()
    }

    fn ctrl_wheel(x: f64, delta_y: f64) -> WheelInput {
        WheelInput {
            x,
            y: 100.0,
            delta_x: 0.0,
            delta_y,
            modifiers: Modifiers {
                ctrl: true,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_plain_wheel_scrolls_rows() {
        let mut c = controller();
        let effect = c.wheel(WheelInput {
            x: 500.0,
            y: 100.0,
            delta_x: 0.0,
            delta_y: 1.0,
            modifiers: Modifiers::default(),
        });
        assert_eq!(effect, WheelEffect::Scrolled);
        assert_eq!(c.scroll_top(), 72.0);
        assert!(!c.is_zoomed());
    }

    #[test]
    fn test_modified_wheel_zooms_at_pointer() {
        let mut c = controller();
        let before = c.scale().invert(700.0);
        assert_eq!(c.wheel(ctrl_wheel(700.0, -4.0)), WheelEffect::Zoomed);
        assert!(c.is_zoomed());
        assert_eq!(c.scroll_top(), 0.0);
        assert!((c.scale().invert(700.0) - before).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_bounded() {
        let mut c = controller();
        for _ in 0..100 {
            c.zoom_in();
        }
        assert!((c.transform().k - 100.0).abs() < 1e-9);
        assert!(!c.zoom_in());
        for _ in 0..100 {
            c.zoom_out();
        }
        assert!(!c.is_zoomed());
    }

    #[test]
    fn test_drag_pans_only_when_zoomed() {
        let mut c = controller();
        c.drag_start(500.0);
        assert!(!c.drag_to(600.0));
        c.drag_end();

        c.zoom_in();
        let before = c.scale().domain().0;
        c.drag_start(600.0);
        assert!(c.drag_to(500.0));
        c.drag_end();
        assert!(c.scale().domain().0 > before);
        assert!(!c.drag_to(400.0));
    }

    #[test]
    fn test_reset_and_double_click() {
        let mut c = controller();
        c.zoom_in();
        assert!(!c.double_click(500.0, 100.0));
        assert!(c.is_zoomed());
        assert!(c.reset_zoom());
        assert!(!c.is_zoomed());
    }

    #[test]
    fn test_click_reports_span() {
        let mut c = controller();
        let rows = rows(100);
        let mut picked = None;
        assert!(c.click(50.0, 30.0 + 24.0 * 2.5, &rows, |l| picked = Some(l.span.span_id.clone())));
        assert_eq!(picked.as_deref(), Some("s2"));

        // Header is not a row
        let mut header_hit = false;
        assert!(!c.click(50.0, 10.0, &rows, |_| header_hit = true));
        assert!(!header_hit);
    }

    #[test]
    fn test_hit_test_accounts_for_scroll() {
        let mut c = controller();
        c.scroll_to(240.0);
        assert_eq!(c.hit_test(300.0, 31.0), Some(10));
        c.scroll_to(1e9);
        assert_eq!(c.scroll_top(), c.max_scroll());
        assert_eq!(c.hit_test(300.0, 269.0), Some(99));
    }

    #[test]
    fn test_hover_changes_trigger_redraw() {
        let mut c = controller();
        let now = Instant::now();
        c.begin_frame(now);
        assert!(c.hover(300.0, 40.0));
        assert_eq!(c.hovered(), Some(0));
        assert!(!c.hover(300.0, 41.0));
        assert!(c.leave());
        assert!(c.begin_frame(now + Duration::from_secs(1)));
    }

    #[test]
    fn test_scroll_into_view() {
        let mut c = controller();
        assert!(c.scroll_into_view(20));
        // Body is 240 tall: row 20 bottom (504) must be visible
        assert_eq!(c.scroll_top(), 21.0 * 24.0 - 240.0);
        assert!(!c.scroll_into_view(15));
        assert!(c.scroll_into_view(0));
        assert_eq!(c.scroll_top(), 0.0);
    }

    #[test]
    fn test_resize_keeps_rows_and_rescales() {
        let mut c = controller();
        let rows = rows(100);
        c.resize(Viewport::new(616.0, 270.0));
        let scene = c.render(&rows, None);
        assert_eq!(c.scale().range(), (200.0, 600.0));
        assert_eq!(scene.visible_rows, 0..10);
    }

    #[test]
    fn test_load_resets_view_state() {
        let mut c = controller();
        c.zoom_in();
        c.scroll_to(100.0);
        c.hover(300.0, 40.0);
        c.load(3, 500);
        assert!(!c.is_zoomed());
        assert_eq!(c.scroll_top(), 0.0);
        assert_eq!(c.hovered(), None);
        assert_eq!(c.scale().domain(), (0.0, 1_000.0));
    }
}
