use crate::Vec3;

/// A ray with a live parametric interval `[tmin, tclosest]`.
///
/// `tclosest` starts at infinity for closest-hit queries and at the
/// segment length for visibility queries; intersection code tightens it
/// as hits are found. The inverse direction and per-axis sign bits are
/// precomputed once so the four-lane box test can select near/far slab
/// planes without branching per axis.
#[derive(Debug, Copy, Clone)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
    pub tmin: f32,
    pub tclosest: f32,
    pub d_inv: Vec3,
    /// 0 if the direction component is non-negative, 1 otherwise.
    pub sign: [usize; 3],
}

impl Ray {
    /// Create a closest-hit ray with an unbounded interval.
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        let mut ray = Self {
            origin,
            dir,
            tmin: 0.0,
            tclosest: f32::INFINITY,
            d_inv: Vec3::ZERO,
            sign: [0; 3],
        };
        ray.precompute();
        ray
    }

    /// Create a visibility ray covering the segment from `origin` to
    /// `target`; the direction is normalized and `tclosest` is the
    /// segment length.
    pub fn segment(origin: Vec3, target: Vec3) -> Self {
        let v = target - origin;
        let len = v.length();
        let dir = if len > 0.0 { v / len } else { Vec3::Z };
        let mut ray = Self {
            origin,
            dir,
            tmin: 0.0,
            tclosest: len,
            d_inv: Vec3::ZERO,
            sign: [0; 3],
        };
        ray.precompute();
        ray
    }

    /// Point along the ray at parameter `t`.
    #[inline]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.dir * t
    }

    /// Recompute `d_inv` and the sign bits after changing `dir`.
    pub fn precompute(&mut self) {
        self.d_inv = Vec3::new(1.0 / self.dir.x, 1.0 / self.dir.y, 1.0 / self.dir.z);
        self.sign = [
            (self.dir.x < 0.0) as usize,
            (self.dir.y < 0.0) as usize,
            (self.dir.z < 0.0) as usize,
        ];
    }
}
