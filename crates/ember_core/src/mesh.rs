//! Triangular mesh primitive.
//!
//! A mesh owns its faces and a QBVH over them. Two leaf layouts are
//! supported: *permuted*, where the face array itself is reordered (and
//! possibly duplicated by pre-splitting) to match the leaves, and
//! *indexed*, where the faces stay put and leaves go through an index
//! table. Oversized faces are pre-split during the accel build so long
//! thin triangles do not blow up leaf bounds.

use ember_math::{Aabb, Mat4, Ray, Vec2, Vec3};

use crate::material::MaterialSet;
use crate::node::SceneNode;
use crate::primitive::Primitive;
use crate::qbvh::{self, clip_left, clip_right};
use crate::raydata::RayData;
use crate::shader::ShaderGlobals;

/// Target leaf size for mesh-level QBVHs.
const LEAF_TARGET: usize = 16;

/// A face whose box area exceeds the mesh median by this factor is
/// pre-split along its longest axis.
const PRESPLIT_FACTOR: f32 = 8.0;

/// Bound on recursive pre-splits of a single face.
const PRESPLIT_MAX_DEPTH: u32 = 6;

/// Implemented by mesh-file loaders. The core never parses files
/// itself; a loader node builds a `TriMesh` and registers it.
pub trait MeshLoader {
    fn set_option(&mut self, opt: &str, value: &str) -> anyhow::Result<()>;
    fn load(&mut self) -> anyhow::Result<TriMesh>;
}

/// One triangular face: three vertices, the precomputed geometric
/// normal, vertex-attribute indices, and the material id.
#[derive(Debug, Clone)]
pub struct FaceGeom {
    pub v: [Vec3; 3],
    pub n: Vec3,
    /// Indices into the mesh's vertex-attribute arrays (`vn`, `vuv`);
    /// -1 when the mesh carries no per-vertex attributes.
    pub vi: [i32; 3],
    pub mtl_id: i32,
}

impl FaceGeom {
    pub fn new(v0: Vec3, v1: Vec3, v2: Vec3, mtl_id: i32) -> Self {
        Self {
            v: [v0, v1, v2],
            n: Vec3::ZERO,
            vi: [-1; 3],
            mtl_id,
        }
    }

    fn setup(&mut self) {
        self.n = (self.v[1] - self.v[0])
            .cross(self.v[2] - self.v[0])
            .normalize_or_zero();
    }

    fn bounds(&self) -> Aabb {
        let mut b = Aabb::EMPTY;
        for v in self.v {
            b.grow(v);
        }
        b
    }
}

/// A triangle mesh with its embedded acceleration structure.
pub struct TriMesh {
    pub name: String,
    pub faces: Vec<FaceGeom>,
    /// Optional per-vertex shading normals, indexed by `FaceGeom::vi`.
    pub vn: Vec<Vec3>,
    /// Optional UV sets; set 0 is sampled for shading.
    pub vuv: Vec<Vec<Vec2>>,
    /// Shifts the effective ray `tmin` for surfaces that re-trace from
    /// their own hit points.
    pub ray_bias: f32,
    /// Keep faces in place and go through an index table instead of
    /// permuting the face array to the leaf layout.
    pub use_indexed_faces: bool,
    pub calc_normals: bool,
    pub is_visible: bool,
    nodes: Vec<qbvh::Node>,
    face_index: Vec<i32>,
    bounds: Aabb,
}

impl TriMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            faces: Vec::new(),
            vn: Vec::new(),
            vuv: Vec::new(),
            ray_bias: 0.0,
            use_indexed_faces: false,
            calc_normals: false,
            is_visible: true,
            nodes: Vec::new(),
            face_index: Vec::new(),
            bounds: Aabb::EMPTY,
        }
    }

    /// Set up face normals. Must run before the accel build.
    pub fn init_faces(&mut self) {
        for face in &mut self.faces {
            face.setup();
        }
    }

    /// Average face normals into per-vertex shading normals.
    pub fn calc_vertex_normals(&mut self) {
        let mut max_vi = -1i32;
        for f in &self.faces {
            for k in 0..3 {
                max_vi = max_vi.max(f.vi[k]);
            }
        }
        if max_vi < 0 {
            // No shared attribute indices: give each corner its own.
            for (i, f) in self.faces.iter_mut().enumerate() {
                let base = (i * 3) as i32;
                f.vi = [base, base + 1, base + 2];
            }
            max_vi = (self.faces.len() * 3) as i32 - 1;
        }

        self.vn = vec![Vec3::ZERO; (max_vi + 1) as usize];
        for f in &self.faces {
            for k in 0..3 {
                self.vn[f.vi[k] as usize] += f.n;
            }
        }
        for n in &mut self.vn {
            *n = n.normalize_or_zero();
        }
    }

    /// Transform vertices and shading normals; face normals are rebuilt
    /// by the next `init_faces`.
    pub fn apply_transform(&mut self, trn: Mat4) {
        for face in &mut self.faces {
            for v in &mut face.v {
                *v = trn.transform_point3(*v);
            }
        }
        for n in &mut self.vn {
            *n = trn.transform_vector3(*n).normalize_or_zero();
        }
    }

    /// Build the mesh QBVH, pre-splitting oversized faces.
    pub fn init_accel(&mut self) {
        let mut boxes = Vec::with_capacity(self.faces.len());
        let mut centroids = Vec::with_capacity(self.faces.len());
        let mut indices: Vec<i32> = Vec::with_capacity(self.faces.len());

        let max_area = self.presplit_threshold();
        for (i, face) in self.faces.iter().enumerate() {
            trisplit(&face.v, i as i32, max_area, &mut indices, &mut boxes, &mut centroids);
        }

        let (nodes, bounds) = qbvh::build_accel(&boxes, &centroids, &mut indices, LEAF_TARGET);
        self.nodes = nodes;
        self.bounds = bounds;

        if !self.use_indexed_faces {
            // Duplicate-and-permute the faces to the leaf layout so
            // leaves read them directly.
            let newfaces: Vec<FaceGeom> = indices
                .iter()
                .map(|&i| self.faces[i as usize].clone())
                .collect();
            self.faces = newfaces;
            self.face_index.clear();
        } else {
            self.face_index = indices;
        }
    }

    /// Faces whose box area exceeds this get split. Scaled from the
    /// median face-box area; a mesh of uniformly sized faces never
    /// splits anything.
    fn presplit_threshold(&self) -> f32 {
        if self.faces.len() < 2 {
            return f32::INFINITY;
        }
        let mut areas: Vec<f32> = self
            .faces
            .iter()
            .map(|f| f.bounds().surface_area())
            .collect();
        areas.sort_unstable_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let median = areas[areas.len() / 2];
        if median > 0.0 {
            median * PRESPLIT_FACTOR
        } else {
            f32::INFINITY
        }
    }

    fn trace_ray_accel<const INDEXED: bool, const BIAS: bool>(
        &self,
        ray: &mut RayData,
        sg: &mut ShaderGlobals,
    ) -> i32 {
        let tmin = if BIAS { self.ray_bias } else { ray.ray.tmin };
        let mut mtl = -1i32;

        qbvh::traverse_closest(&self.nodes, ray, |ray, base, count| {
            for i in base..base + count {
                let face_id = if INDEXED {
                    self.face_index[i as usize] as u32
                } else {
                    i
                };
                let face = &self.faces[face_id as usize];

                // Strict `t < tclosest` acceptance also dedupes the
                // duplicate face entries produced by pre-splitting.
                if let Some((t, b1, b2)) = intersect_tri(&ray.ray, face, tmin) {
                    ray.ray.tclosest = t;
                    ray.result.elem_id = face_id;
                    mtl = face.mtl_id;
                    self.fill_hit(sg, face, face_id, b1, b2);
                }
            }
        });

        mtl
    }

    fn vis_ray_accel<const INDEXED: bool, const BIAS: bool>(&self, ray: &mut RayData) {
        let tmin = if BIAS { self.ray_bias } else { ray.ray.tmin };

        qbvh::traverse_any(&self.nodes, ray, |ray, base, count| {
            for i in base..base + count {
                let face_id = if INDEXED {
                    self.face_index[i as usize] as u32
                } else {
                    i
                };
                let face = &self.faces[face_id as usize];
                if intersect_tri(&ray.ray, face, tmin).is_some() {
                    ray.occluded = true;
                    return true;
                }
            }
            false
        });
    }

    /// Record the winning hit's shading data.
    fn fill_hit(&self, sg: &mut ShaderGlobals, face: &FaceGeom, elem: u32, b1: f32, b2: f32) {
        let b0 = 1.0 - b1 - b2;
        let surf = &mut sg.surf;

        surf.p = face.v[0] * b0 + face.v[1] * b1 + face.v[2] * b2;
        surf.n = face.n;

        let has_attrs = face.vi[0] >= 0;
        surf.ns = if has_attrs && !self.vn.is_empty() {
            self.vn[face.vi[0] as usize] * b0
                + self.vn[face.vi[1] as usize] * b1
                + self.vn[face.vi[2] as usize] * b2
        } else {
            face.n
        };

        surf.uv = match self.vuv.first() {
            Some(set) if has_attrs && !set.is_empty() => {
                set[face.vi[0] as usize] * b0
                    + set[face.vi[1] as usize] * b1
                    + set[face.vi[2] as usize] * b2
            }
            _ => Vec2::new(b1, b2),
        };

        surf.mtl_id = face.mtl_id;
        surf.elem_id = elem;
        sg.elem_id = elem;
    }
}

impl Primitive for TriMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_render(&mut self, _mtls: &MaterialSet) -> anyhow::Result<Vec<SceneNode>> {
        self.init_faces();
        if self.calc_normals && self.vn.is_empty() {
            self.calc_vertex_normals();
        }
        self.init_accel();
        Ok(Vec::new())
    }

    fn trace_ray(&self, ray: &mut RayData, sg: &mut ShaderGlobals) -> i32 {
        match (self.face_index.is_empty(), self.ray_bias == 0.0) {
            (true, true) => self.trace_ray_accel::<false, false>(ray, sg),
            (true, false) => self.trace_ray_accel::<false, true>(ray, sg),
            (false, true) => self.trace_ray_accel::<true, false>(ray, sg),
            (false, false) => self.trace_ray_accel::<true, true>(ray, sg),
        }
    }

    fn vis_ray(&self, ray: &mut RayData) {
        // Exactly one variant per query, picked by layout and bias.
        match (self.face_index.is_empty(), self.ray_bias == 0.0) {
            (true, true) => self.vis_ray_accel::<false, false>(ray),
            (true, false) => self.vis_ray_accel::<false, true>(ray),
            (false, true) => self.vis_ray_accel::<true, false>(ray),
            (false, false) => self.vis_ray_accel::<true, true>(ray),
        }
    }

    fn world_bounds(&self) -> Aabb {
        if !self.nodes.is_empty() {
            return self.bounds;
        }
        let mut out = Aabb::EMPTY;
        for face in &self.faces {
            for v in face.v {
                out.grow(v);
            }
        }
        out
    }

    fn visible(&self) -> bool {
        self.is_visible
    }
}

/// Push a face into the build arrays, splitting it while its box area
/// stays above `max_area`. Split pieces share the face index, so leaves
/// may reference the same face more than once.
fn trisplit(
    verts: &[Vec3; 3],
    idx: i32,
    max_area: f32,
    indices: &mut Vec<i32>,
    boxes: &mut Vec<Aabb>,
    centroids: &mut Vec<Vec3>,
) {
    let mut stack: Vec<(Vec<Vec3>, u32)> = vec![(verts.to_vec(), 0)];

    while let Some((poly, depth)) = stack.pop() {
        if poly.is_empty() {
            continue;
        }

        let mut bbox = Aabb::EMPTY;
        for v in &poly {
            bbox.grow(*v);
        }

        if bbox.surface_area() > max_area && depth < PRESPLIT_MAX_DEPTH {
            let axis = bbox.max_dim();
            let d = bbox.centroid()[axis];
            stack.push((clip_left(d, axis, &poly), depth + 1));
            stack.push((clip_right(d, axis, &poly), depth + 1));
        } else {
            indices.push(idx);
            boxes.push(bbox);
            let mut centroid = Vec3::ZERO;
            for v in &poly {
                centroid += *v;
            }
            centroids.push(centroid / poly.len() as f32);
        }
    }
}

/// Watertight ray-triangle intersection.
///
/// Vertices are translated to the ray origin and sheared into a frame
/// where the ray is the +z axis; the 2D edge functions (recomputed in
/// f64 when any lands exactly on an edge) then classify the hit without
/// cracks between adjacent faces. Returns `(t, b1, b2)` with `b1`/`b2`
/// the barycentric weights of `v[1]`/`v[2]`, accepting only
/// `tmin < t < tclosest`.
fn intersect_tri(ray: &Ray, face: &FaceGeom, tmin: f32) -> Option<(f32, f32, f32)> {
    let d = ray.dir;

    // Permute so the largest direction component becomes z.
    let kz = {
        let ad = d.abs();
        if ad.x > ad.y && ad.x > ad.z {
            0
        } else if ad.y > ad.z {
            1
        } else {
            2
        }
    };
    let mut kx = (kz + 1) % 3;
    let mut ky = (kx + 1) % 3;
    if d[kz] < 0.0 {
        std::mem::swap(&mut kx, &mut ky);
    }

    let sx = d[kx] / d[kz];
    let sy = d[ky] / d[kz];
    let sz = 1.0 / d[kz];

    let a = face.v[0] - ray.origin;
    let b = face.v[1] - ray.origin;
    let c = face.v[2] - ray.origin;

    let ax = a[kx] - sx * a[kz];
    let ay = a[ky] - sy * a[kz];
    let bx = b[kx] - sx * b[kz];
    let by = b[ky] - sy * b[kz];
    let cx = c[kx] - sx * c[kz];
    let cy = c[ky] - sy * c[kz];

    // Edge functions; e0/e1/e2 weight v0/v1/v2.
    let mut e0 = cx * by - cy * bx;
    let mut e1 = ax * cy - ay * cx;
    let mut e2 = bx * ay - by * ax;

    if e0 == 0.0 || e1 == 0.0 || e2 == 0.0 {
        e0 = (cx as f64 * by as f64 - cy as f64 * bx as f64) as f32;
        e1 = (ax as f64 * cy as f64 - ay as f64 * cx as f64) as f32;
        e2 = (bx as f64 * ay as f64 - by as f64 * ax as f64) as f32;
    }

    if (e0 < 0.0 || e1 < 0.0 || e2 < 0.0) && (e0 > 0.0 || e1 > 0.0 || e2 > 0.0) {
        return None;
    }

    let det = e0 + e1 + e2;
    if det == 0.0 {
        return None;
    }

    let az = sz * a[kz];
    let bz = sz * b[kz];
    let cz = sz * c[kz];
    let t_scaled = e0 * az + e1 * bz + e2 * cz;

    let inv_det = 1.0 / det;
    let t = t_scaled * inv_det;
    if t > tmin && t < ray.tclosest {
        Some((t, e1 * inv_det, e2 * inv_det))
    } else {
        None
    }
}
