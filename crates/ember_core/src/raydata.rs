//! Per-ray state: the live ray, its result, and traversal scratch.

use ember_math::{Ray, Vec3};

use crate::qbvh::STACK_DEPTH;

/// Closest-hit probe ray.
pub const RAY_CAMERA: u32 = 1 << 0;
/// Any-hit visibility ray; traversal early-outs on the first occluder.
pub const RAY_SHADOW: u32 = 1 << 1;

/// One traversal stack slot: a signed node reference and the subtree's
/// entry parameter.
#[derive(Debug, Clone, Copy, Default)]
pub struct StackEntry {
    pub node: i32,
    pub t: f32,
}

/// Traversal scratch. The stack is shared between the top-level walk
/// and a nested mesh walk: each traversal treats the current top as its
/// base and unwinds back to it before returning. The four-lane
/// `hits`/`t` buffers are written by [`node_intersect4`] and consumed
/// immediately by the push loop.
///
/// [`node_intersect4`]: crate::qbvh::node_intersect4
#[derive(Debug, Clone)]
pub struct TraversalSupport {
    pub stack: [StackEntry; STACK_DEPTH],
    pub stack_top: usize,
    pub hits: [i32; 4],
    pub t: [f32; 4],
}

impl Default for TraversalSupport {
    fn default() -> Self {
        Self {
            stack: [StackEntry::default(); STACK_DEPTH],
            stack_top: 0,
            hits: [0; 4],
            t: [0.0; 4],
        }
    }
}

/// Result record of the most recent closest-hit query.
#[derive(Debug, Clone, Copy, Default)]
pub struct HitResult {
    /// Index of the winning primitive in the scene's store.
    pub prim: Option<usize>,
    /// Element (face) id within that primitive.
    pub elem_id: u32,
}

/// Everything one in-flight ray owns.
///
/// A `RayData` is created once per worker and reused for every probe and
/// shadow ray that worker traces; it is never shared between workers.
#[derive(Debug, Clone)]
pub struct RayData {
    pub ray: Ray,
    pub ty: u32,
    pub lambda: f32,
    pub time: f32,
    pub level: u8,
    pub occluded: bool,
    pub result: HitResult,
    pub supp: TraversalSupport,
}

impl Default for RayData {
    fn default() -> Self {
        Self {
            ray: Ray::new(Vec3::ZERO, Vec3::Z),
            ty: RAY_CAMERA,
            lambda: 0.0,
            time: 0.0,
            level: 0,
            occluded: false,
            result: HitResult::default(),
            supp: TraversalSupport::default(),
        }
    }
}

impl RayData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm this structure for a closest-hit probe from `p` along `d`;
    /// `tclosest` starts at infinity.
    pub fn init_ray(&mut self, p: Vec3, d: Vec3) {
        self.ray = Ray::new(p, d);
        self.ty = RAY_CAMERA;
        self.occluded = false;
        self.result = HitResult::default();
        self.supp.stack_top = 0;
    }

    /// Arm this structure for an any-hit visibility query over the
    /// segment from `p0` to `p1`.
    pub fn init_vis_ray(&mut self, p0: Vec3, p1: Vec3) {
        self.ray = Ray::segment(p0, p1);
        self.ty = RAY_SHADOW;
        self.occluded = false;
        self.result = HitResult::default();
        self.supp.stack_top = 0;
    }

    /// True while no occluder has been found on the segment.
    #[inline]
    pub fn is_vis(&self) -> bool {
        !self.occluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_ray_resets_state() {
        let mut ray = RayData::new();
        ray.occluded = true;
        ray.result.prim = Some(3);
        ray.supp.stack_top = 7;

        ray.init_ray(Vec3::ZERO, Vec3::Z);
        assert!(ray.is_vis());
        assert_eq!(ray.result.prim, None);
        assert_eq!(ray.supp.stack_top, 0);
        assert_eq!(ray.ray.tclosest, f32::INFINITY);
    }

    #[test]
    fn test_init_vis_ray_sets_segment() {
        let mut ray = RayData::new();
        ray.init_vis_ray(Vec3::ZERO, Vec3::new(0.0, 0.0, 5.0));
        assert_eq!(ray.ty, RAY_SHADOW);
        assert_eq!(ray.ray.tclosest, 5.0);
        assert!(ray.is_vis());
    }
}
