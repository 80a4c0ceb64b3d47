//! The scene: primitive store, lights, and the top-level QBVH.

use ember_math::Aabb;

use crate::light::Light;
use crate::primitive::Primitive;
use crate::qbvh;
use crate::raydata::{RayData, RAY_SHADOW};
use crate::shader::ShaderGlobals;
use crate::stats;

/// Scene-level leaf target: one primitive per leaf, since each leaf
/// test dispatches into a primitive's own traversal.
const LEAF_TARGET: usize = 1;

/// Primitives, lights and the acceleration structure over them.
///
/// After [`init_accel`] the primitive store is permuted so every QBVH
/// leaf spans a contiguous range, and the scene is immutable: all ray
/// entry points take `&self` and are safe to share across workers.
///
/// [`init_accel`]: Scene::init_accel
pub struct Scene {
    prims: Vec<Box<dyn Primitive>>,
    pub lights: Vec<Box<dyn Light>>,
    nodes: Vec<qbvh::Node>,
    bounds: Aabb,
}

impl Scene {
    pub fn new() -> Self {
        Self {
            prims: Vec::new(),
            lights: Vec::new(),
            nodes: Vec::new(),
            bounds: Aabb::EMPTY,
        }
    }

    pub fn add_primitive(&mut self, prim: Box<dyn Primitive>) {
        self.prims.push(prim);
    }

    pub fn add_light(&mut self, light: Box<dyn Light>) {
        self.lights.push(light);
    }

    pub fn prims(&self) -> &[Box<dyn Primitive>] {
        &self.prims
    }

    /// World bounds of all visible primitives.
    pub fn bounds(&self) -> Aabb {
        self.bounds
    }

    /// Build the top-level QBVH and permute the primitive store to the
    /// leaf layout. Invisible primitives are dropped from the store.
    pub fn init_accel(&mut self) {
        let mut boxes = Vec::with_capacity(self.prims.len());
        let mut indices = Vec::with_capacity(self.prims.len());
        let mut centroids = Vec::with_capacity(self.prims.len());

        for (i, prim) in self.prims.iter().enumerate() {
            if !prim.visible() {
                continue;
            }
            let b = prim.world_bounds();
            boxes.push(b);
            indices.push(i as i32);
            centroids.push(b.centroid());
        }

        let (nodes, bounds) = qbvh::build_accel(&boxes, &centroids, &mut indices, LEAF_TARGET);
        self.nodes = nodes;
        self.bounds = bounds;

        // Rearrange the (visible) primitives to match the leaf layout.
        let mut slots: Vec<Option<Box<dyn Primitive>>> =
            std::mem::take(&mut self.prims).into_iter().map(Some).collect();
        self.prims = indices
            .iter()
            .map(|&i| {
                slots[i as usize]
                    .take()
                    .expect("qbvh index permutation must be unique")
            })
            .collect();
    }

    /// Intersect `ray` with the scene and fill `sg` with the first hit.
    ///
    /// Shadow-typed rays run the any-hit walk and report whether the
    /// segment is blocked; they do not necessarily find the first
    /// intersection. For closest hits the shading and geometric normals
    /// are normalized, the tangent frame is set up, and the material id
    /// recorded for the caller to resolve.
    pub fn trace_probe(&self, ray: &mut RayData, sg: &mut ShaderGlobals) -> bool {
        stats::record_ray();

        if ray.ty & RAY_SHADOW != 0 {
            self.vis_ray_accel(ray);
            stats::record_shadow_ray();
            return !ray.is_vis();
        }

        let mtlid = self.trace_ray_accel(ray, sg);
        if mtlid == -1 {
            return false;
        }

        sg.mtl_id = mtlid;
        sg.prim = ray.result.prim;
        sg.surf.prim = ray.result.prim;
        sg.surf.mtl_id = mtlid;
        sg.surf.n = sg.surf.n.normalize_or_zero();
        sg.surf.ns = sg.surf.ns.normalize_or_zero();
        sg.surf.setup_tangent();
        true
    }

    /// Any-hit query over the ray's segment.
    pub fn vis_ray(&self, ray: &mut RayData) {
        stats::record_ray();
        self.vis_ray_accel(ray);
        stats::record_shadow_ray();
    }

    fn trace_ray_accel(&self, ray: &mut RayData, sg: &mut ShaderGlobals) -> i32 {
        let mut mtlid = -1i32;
        qbvh::traverse_closest(&self.nodes, ray, |ray, base, count| {
            for i in base..base + count {
                let id = self.prims[i as usize].trace_ray(ray, sg);
                if id > -1 {
                    ray.result.prim = Some(i as usize);
                    mtlid = id;
                }
            }
        });
        mtlid
    }

    fn vis_ray_accel(&self, ray: &mut RayData) {
        qbvh::traverse_any(&self.nodes, ray, |ray, base, count| {
            for i in base..base + count {
                self.prims[i as usize].vis_ray(ray);
                if !ray.is_vis() {
                    return true;
                }
            }
            false
        });
    }
}
