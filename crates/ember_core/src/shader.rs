//! Per-bounce shading context.

use ember_math::Vec3;

use crate::raydata::RayData;
use crate::surface::SurfacePoint;

/// Everything the shading step of one bounce needs: the probe ray's
/// origin/direction, the path's wavelength, time and depth, and the
/// surface record the intersectors fill in. The material itself is
/// resolved from `mtl_id` by the caller, which owns the material table.
#[derive(Debug, Clone, Copy)]
pub struct ShaderGlobals {
    pub ro: Vec3,
    pub rd: Vec3,
    pub lambda: f32,
    pub time: f32,
    pub depth: u8,
    pub mtl_id: i32,
    pub elem_id: u32,
    pub prim: Option<usize>,
    pub surf: SurfacePoint,
}

impl ShaderGlobals {
    /// Fresh globals for the probe `ray`; the surface record starts
    /// empty and is filled by the primitive that wins the closest hit.
    pub fn from_ray(ray: &RayData) -> Self {
        Self {
            ro: ray.ray.origin,
            rd: ray.ray.dir,
            lambda: ray.lambda,
            time: ray.time,
            depth: ray.level,
            mtl_id: -1,
            elem_id: 0,
            prim: None,
            surf: SurfacePoint::default(),
        }
    }
}
