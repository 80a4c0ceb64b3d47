//! The light contract and the built-in quad area light.

use anyhow::bail;
use ember_math::Vec3;
use rand::RngCore;

use crate::material::{gen_f32, MaterialSet};
use crate::node::SceneNode;
use crate::surface::SurfacePoint;

/// Light sampling contract for next-event estimation.
pub trait Light: Send + Sync {
    fn name(&self) -> &str {
        ""
    }

    fn pre_render(&mut self, _mtls: &MaterialSet) -> anyhow::Result<Vec<SceneNode>> {
        Ok(Vec::new())
    }

    /// Sample a position on the light with respect to area measure.
    /// Fills `out` with the light-side surface point (position, normal,
    /// material id, tangent frame) and `pdf` with the area density.
    /// Returns false if the light cannot be sampled from `from`.
    fn sample_area(
        &self,
        from: &SurfacePoint,
        rng: &mut dyn RngCore,
        out: &mut SurfacePoint,
        pdf: &mut f64,
    ) -> bool;
}

/// A parallelogram area light sampled uniformly over its surface.
pub struct QuadLight {
    name: String,
    corner: Vec3,
    edge_u: Vec3,
    edge_v: Vec3,
    normal: Vec3,
    area: f32,
    /// Name of the emitter material; resolved to an id at pre-render.
    material: String,
    mtl_id: i32,
}

impl QuadLight {
    pub fn new(
        name: impl Into<String>,
        corner: Vec3,
        edge_u: Vec3,
        edge_v: Vec3,
        material: impl Into<String>,
    ) -> Self {
        let cross = edge_u.cross(edge_v);
        Self {
            name: name.into(),
            corner,
            edge_u,
            edge_v,
            normal: cross.normalize_or_zero(),
            area: cross.length(),
            material: material.into(),
            mtl_id: -1,
        }
    }

    pub fn mtl_id(&self) -> i32 {
        self.mtl_id
    }
}

impl Light for QuadLight {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_render(&mut self, mtls: &MaterialSet) -> anyhow::Result<Vec<SceneNode>> {
        self.mtl_id = mtls.id_for(&self.material);
        if self.mtl_id == -1 {
            bail!("unknown material `{}`", self.material);
        }
        Ok(Vec::new())
    }

    fn sample_area(
        &self,
        _from: &SurfacePoint,
        rng: &mut dyn RngCore,
        out: &mut SurfacePoint,
        pdf: &mut f64,
    ) -> bool {
        if self.area <= 0.0 {
            return false;
        }

        let r0 = gen_f32(rng);
        let r1 = gen_f32(rng);

        out.p = self.corner + self.edge_u * r0 + self.edge_v * r1;
        out.n = self.normal;
        out.ns = self.normal;
        out.mtl_id = self.mtl_id;
        out.prim = None;
        out.setup_tangent();

        *pdf = (1.0 / self.area) as f64;
        true
    }
}
