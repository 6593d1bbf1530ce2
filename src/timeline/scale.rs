//! Time scale and zoom transform.
//!
//! The base scale maps the full trace extent onto the timeline area once per
//! resize. Zoom and pan never touch it: a [`ZoomTransform`] rescales it into
//! the scale that is actually drawn, so bars and ticks move without a relayout.

use crate::core::config::ZoomConfig;

/// Smallest time window a scale spans, in microseconds.
pub const MIN_WINDOW_US: f64 = 1_000.0;

/// Linear map from microseconds to host units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    domain: (f64, f64),
    range: (f64, f64),
}

/// Tick positions for one axis.
#[derive(Debug, Clone, PartialEq)]
pub struct Ticks {
    /// Tick values in microseconds
    pub values: Vec<f64>,
    /// Distance between consecutive ticks
    pub step: f64,
}

impl TimeScale {
    pub fn new(domain: (f64, f64), range: (f64, f64)) -> Self {
        Self { domain, range }
    }

    pub fn domain(&self) -> (f64, f64) {
        self.domain
    }

    pub fn range(&self) -> (f64, f64) {
        self.range
    }

    /// Microseconds to host units.
    pub fn apply(&self, micros: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if d1 == d0 {
            return r0;
        }
        r0 + (micros - d0) / (d1 - d0) * (r1 - r0)
    }

    /// Host units back to microseconds.
    pub fn invert(&self, position: f64) -> f64 {
        let (d0, d1) = self.domain;
        let (r0, r1) = self.range;
        if r1 == r0 {
            return d0;
        }
        d0 + (position - r0) / (r1 - r0) * (d1 - d0)
    }

    /// Roughly `count` ticks at a 1/2/5 × 10ⁿ step covering the domain.
    pub fn ticks(&self, count: usize) -> Ticks {
        let (d0, d1) = self.domain;
        let (lo, hi) = if d0 <= d1 { (d0, d1) } else { (d1, d0) };
        let step = nice_step(hi - lo, count.max(1));
        if step <= 0.0 || !step.is_finite() {
            return Ticks {
                values: vec![lo],
                step: 0.0,
            };
        }

        let first = (lo / step).ceil() as i64;
        let last = (hi / step).floor() as i64;
        let values = (first..=last).map(|i| i as f64 * step).collect();
        Ticks { values, step }
    }
}

/// Step for `count` intervals over `span`, rounded up to 1, 2, 5 or 10 times a
/// power of ten and never finer than one microsecond.
fn nice_step(span: f64, count: usize) -> f64 {
    if span <= 0.0 || !span.is_finite() {
        return 0.0;
    }
    let rough = span / count as f64;
    let exponent = 10f64.powf(rough.log10().floor());
    let fraction = rough / exponent;
    let nice = [1.0, 2.0, 5.0, 10.0]
        .into_iter()
        .find(|&f| f >= fraction - 1e-9)
        .unwrap_or(10.0);
    (nice * exponent).max(1.0)
}

/// Scale for a trace whose latest end is `extent` µs, drawn between `left`
/// and `right`. Degenerate traces still get a [`MIN_WINDOW_US`] window.
pub fn base_scale(extent: u64, left: f64, right: f64) -> TimeScale {
    let end = (extent as f64).max(MIN_WINDOW_US);
    TimeScale::new((0.0, end), (left, right.max(left + 1.0)))
}

/// Horizontal zoom `k` and translation `x` applied to a base scale.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomTransform {
    pub k: f64,
    pub x: f64,
}

impl Default for ZoomTransform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl ZoomTransform {
    pub const IDENTITY: ZoomTransform = ZoomTransform { k: 1.0, x: 0.0 };

    pub fn is_identity(&self) -> bool {
        (self.k - 1.0).abs() < f64::EPSILON && self.x.abs() < f64::EPSILON
    }

    fn invert_x(&self, position: f64) -> f64 {
        (position - self.x) / self.k
    }

    /// The scale drawn after applying this transform to `base`.
    pub fn rescale(&self, base: &TimeScale) -> TimeScale {
        let (r0, r1) = base.range();
        let domain = (
            base.invert(self.invert_x(r0)),
            base.invert(self.invert_x(r1)),
        );
        TimeScale::new(domain, base.range())
    }

    /// Zoom by `factor` keeping the time under `anchor` in place.
    pub fn zoom_at(self, anchor: f64, factor: f64, limits: &ZoomConfig, range: (f64, f64)) -> Self {
        let k = (self.k * factor).clamp(limits.min, limits.max);
        let x = anchor - (anchor - self.x) * (k / self.k);
        ZoomTransform { k, x }.constrain(range)
    }

    /// Shift by `dx` host units; positive moves content right.
    pub fn pan(self, dx: f64, range: (f64, f64)) -> Self {
        ZoomTransform {
            k: self.k,
            x: self.x + dx,
        }
        .constrain(range)
    }

    /// Keep the zoomed content covering the whole range so the trace can
    /// never be dragged out of view.
    pub fn constrain(self, range: (f64, f64)) -> Self {
        let (r0, r1) = range;
        let lo = r1 * (1.0 - self.k);
        let hi = r0 * (1.0 - self.k);
        ZoomTransform {
            k: self.k,
            x: self.x.clamp(lo.min(hi), hi.max(lo)),
        }
    }
}
