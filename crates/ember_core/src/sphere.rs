//! Analytic sphere primitive.

use std::f32::consts::PI;

use anyhow::bail;
use ember_math::{Aabb, Vec2, Vec3};

use crate::material::MaterialSet;
use crate::node::SceneNode;
use crate::primitive::Primitive;
use crate::raydata::RayData;
use crate::shader::ShaderGlobals;

pub struct SpherePrim {
    pub name: String,
    pub center: Vec3,
    pub radius: f32,
    pub material: String,
    pub is_visible: bool,
    mtl_id: i32,
}

impl SpherePrim {
    pub fn new(name: impl Into<String>, center: Vec3, radius: f32, material: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            center,
            radius: radius.max(0.0),
            material: material.into(),
            is_visible: true,
            mtl_id: -1,
        }
    }

    /// Nearest quadratic root within `(tmin, tclosest)`, if any.
    fn hit_t(&self, ray: &ember_math::Ray, tmin: f32) -> Option<f32> {
        let oc = self.center - ray.origin;
        let a = ray.dir.length_squared();
        let h = ray.dir.dot(oc);
        let c = oc.length_squared() - self.radius * self.radius;

        let discriminant = h * h - a * c;
        if discriminant < 0.0 {
            return None;
        }
        let sqrtd = discriminant.sqrt();

        // Try the nearest root first.
        let mut root = (h - sqrtd) / a;
        if root <= tmin || root >= ray.tclosest {
            root = (h + sqrtd) / a;
            if root <= tmin || root >= ray.tclosest {
                return None;
            }
        }
        Some(root)
    }

    fn sphere_uv(n: Vec3) -> Vec2 {
        let theta = (-n.y).acos();
        let phi = (-n.z).atan2(n.x) + PI;
        Vec2::new(phi / (2.0 * PI), theta / PI)
    }
}

impl Primitive for SpherePrim {
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

    fn trace_ray(&self, ray: &mut RayData, sg: &mut ShaderGlobals) -> i32 {
        let Some(t) = self.hit_t(&ray.ray, ray.ray.tmin) else {
            return -1;
        };

        ray.ray.tclosest = t;
        ray.result.elem_id = 0;

        let p = ray.ray.at(t);
        let n = (p - self.center) / self.radius;
        let surf = &mut sg.surf;
        surf.p = p;
        surf.n = n;
        surf.ns = n;
        surf.uv = Self::sphere_uv(n);
        surf.mtl_id = self.mtl_id;
        surf.elem_id = 0;
        sg.elem_id = 0;

        self.mtl_id
    }

    fn vis_ray(&self, ray: &mut RayData) {
        if self.hit_t(&ray.ray, ray.ray.tmin).is_some() {
            ray.occluded = true;
        }
    }

    fn world_bounds(&self) -> Aabb {
        let r = Vec3::splat(self.radius);
        Aabb::from_points(self.center - r, self.center + r)
    }

    fn visible(&self) -> bool {
        self.is_visible
    }
}
