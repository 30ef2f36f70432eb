//! Field geometry helpers (normalized coordinates)

use serde::{Deserialize, Serialize};

/// Below this length a segment is treated as a point
const EPSILON: f32 = 1e-6;

/// A point on the normalized field, y increasing upfield
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pt {
    pub x: f32,
    pub y: f32,
}

impl Pt {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Clamp both coordinates into [0, 1]
    pub fn clamped(self) -> Self {
        Self::new(clamp01(self.x), clamp01(self.y))
    }

    pub fn offset(self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    /// Linear interpolation from `self` toward `other`
    pub fn lerp(self, other: Pt, u: f32) -> Self {
        Self::new(
            self.x + (other.x - self.x) * u,
            self.y + (other.y - self.y) * u,
        )
    }

    /// Weighted blend: `self * weight + other * (1 - weight)`
    pub fn blend(self, other: Pt, weight: f32) -> Self {
        Self::new(
            self.x * weight + other.x * (1.0 - weight),
            self.y * weight + other.y * (1.0 - weight),
        )
    }
}

pub fn clamp01(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

pub fn dist(a: Pt, b: Pt) -> f32 {
    (a.x - b.x).hypot(a.y - b.y)
}

/// Step from `a` toward `b` by at most `max_step`, never overshooting
pub fn move_toward(a: Pt, b: Pt, max_step: f32) -> Pt {
    let d = dist(a, b);
    if d <= EPSILON {
        return a;
    }
    let u = (max_step / d).min(1.0);
    a.lerp(b, u)
}

/// Total arc length of a polyline
pub fn polyline_length(pts: &[Pt]) -> f32 {
    pts.windows(2).map(|w| dist(w[0], w[1])).sum()
}

/// Point reached after travelling `distance` along the polyline.
/// Stops at the last point once the path is exhausted.
pub fn position_along_polyline(pts: &[Pt], distance: f32) -> Pt {
    let (first, last) = match (pts.first(), pts.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Pt::default(),
    };
    if pts.len() == 1 {
        return first;
    }

    let mut remaining = distance;
    for w in pts.windows(2) {
        let (a, b) = (w[0], w[1]);
        let seg_len = dist(a, b);
        if seg_len <= EPSILON {
            continue;
        }
        if remaining <= seg_len {
            return a.lerp(b, remaining / seg_len);
        }
        remaining -= seg_len;
    }
    last
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-5
    }

    #[test]
    fn move_toward_caps_step_and_never_overshoots() {
        let a = Pt::new(0.0, 0.0);
        let b = Pt::new(0.3, 0.4);

        let partial = move_toward(a, b, 0.1);
        assert!(close(dist(a, partial), 0.1));

        let full = move_toward(a, b, 5.0);
        assert_eq!(full, b);

        assert_eq!(move_toward(b, b, 0.1), b);
    }

    #[test]
    fn polyline_walks_segments_in_order() {
        let pts = [Pt::new(0.2, 0.2), Pt::new(0.2, 0.4), Pt::new(0.4, 0.4)];
        assert!(close(polyline_length(&pts), 0.4));

        let mid_first = position_along_polyline(&pts, 0.1);
        assert!(close(mid_first.x, 0.2) && close(mid_first.y, 0.3));

        let mid_second = position_along_polyline(&pts, 0.3);
        assert!(close(mid_second.x, 0.3) && close(mid_second.y, 0.4));

        assert_eq!(position_along_polyline(&pts, 9.0), pts[2]);
    }

    #[test]
    fn polyline_degenerate_inputs() {
        assert_eq!(position_along_polyline(&[], 1.0), Pt::default());
        let single = [Pt::new(0.7, 0.1)];
        assert_eq!(position_along_polyline(&single, 1.0), single[0]);
        let repeated = [Pt::new(0.5, 0.5), Pt::new(0.5, 0.5), Pt::new(0.5, 0.7)];
        let p = position_along_polyline(&repeated, 0.1);
        assert!(close(p.y, 0.6));
    }

    #[test]
    fn clamped_stays_in_unit_square() {
        let p = Pt::new(-0.2, 1.3).clamped();
        assert_eq!(p, Pt::new(0.0, 1.0));
    }
}
