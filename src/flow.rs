//! Vote flows: curved, directed arcs from a giver to each receiver.

use std::f64::consts::TAU;

/// Arc radius as a multiple of the straight distance between endpoints.
pub const ARC_RADIUS_RATIO: f64 = 0.8;

/// One vote drawn as an arc, endpoints in projected coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct FlowLink {
    pub giver: String,
    pub receiver: String,
    pub year: i32,
    pub magnitude: f64,
    pub origin: (f64, f64),
    pub destination: (f64, f64),
}

/// Linear map from vote magnitude to stroke width.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeScale {
    lo: f64,
    hi: f64,
    min_width: f64,
    max_width: f64,
}

impl StrokeScale {
    /// Domain is the magnitude extent of `links`.
    pub fn over(links: &[FlowLink], min_width: f64, max_width: f64) -> Self {
        let (lo, hi) = links.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), l| {
            (lo.min(l.magnitude), hi.max(l.magnitude))
        });
        Self { lo, hi, min_width, max_width }
    }

    /// Collapsed or empty domains give the maximum width.
    pub fn width(&self, magnitude: f64) -> f64 {
        let span = self.hi - self.lo;
        if !(span.is_finite() && span > 0.0) {
            return self.max_width;
        }
        let t = ((magnitude - self.lo) / span).clamp(0.0, 1.0);
        self.min_width + t * (self.max_width - self.min_width)
    }
}

/// Circular arc from `start` to `end`, always turning the same way.
///
/// With y pointing down this matches an SVG `A r,r 0 0,1` segment: the
/// short arc swept with increasing angle, bulging to the left of travel.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ArcPath {
    pub start: (f64, f64),
    pub end: (f64, f64),
    pub center: (f64, f64),
    pub radius: f64,
    start_angle: f64,
    end_angle: f64,
}

impl ArcPath {
    /// `None` when both endpoints coincide.
    pub fn between(start: (f64, f64), end: (f64, f64)) -> Option<Self> {
        let (dx, dy) = (end.0 - start.0, end.1 - start.1);
        let chord = dx.hypot(dy);
        if !(chord.is_finite() && chord > 0.0) {
            return None;
        }
        let radius = ARC_RADIUS_RATIO * chord;
        let half = chord / 2.0;
        let offset = (radius * radius - half * half).max(0.0).sqrt();
        let (ux, uy) = (dx / chord, dy / chord);
        let mid = (start.0 + dx / 2.0, start.1 + dy / 2.0);
        let center = (mid.0 - uy * offset, mid.1 + ux * offset);
        let start_angle = (start.1 - center.1).atan2(start.0 - center.0);
        let mut end_angle = (end.1 - center.1).atan2(end.0 - center.0);
        if end_angle < start_angle {
            end_angle += TAU;
        }
        Some(Self { start, end, center, radius, start_angle, end_angle })
    }

    pub fn sweep(&self) -> f64 {
        self.end_angle - self.start_angle
    }

    /// Points along the arc, `radius + offset` from the centre; both ends included.
    pub fn sample(&self, offset: f64, step: f64) -> Vec<(f64, f64)> {
        let r = self.radius + offset;
        let length = r.abs() * self.sweep();
        let segments = ((length / step.max(1e-3)).ceil() as usize).clamp(8, 512);
        (0..=segments)
            .map(|i| {
                let a = self.start_angle + self.sweep() * i as f64 / segments as f64;
                (self.center.0 + r * a.cos(), self.center.1 + r * a.sin())
            })
            .collect()
    }

    /// Unit direction of travel at the end point.
    pub fn end_tangent(&self) -> (f64, f64) {
        (-self.end_angle.sin(), self.end_angle.cos())
    }

    /// Tip and the two back corners of an arrowhead at the end point.
    pub fn arrowhead(&self, length: f64) -> [(f64, f64); 3] {
        let (tx, ty) = self.end_tangent();
        let back = (self.end.0 - tx * length, self.end.1 - ty * length);
        let half = length / 2.0;
        [
            self.end,
            (back.0 - ty * half, back.1 + tx * half),
            (back.0 + ty * half, back.1 - tx * half),
        ]
    }
}

/// Offsets for drawing a stroke of `width` as parallel one-dot strands.
pub fn strand_offsets(width: f64) -> Vec<f64> {
    let n = width.round().max(1.0) as usize;
    let mid = (n as f64 - 1.0) / 2.0;
    (0..n).map(|i| (i as f64 - mid) * 0.75).collect()
}
