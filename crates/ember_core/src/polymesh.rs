//! Polygon-mesh node.
//!
//! Loaders hand over polygon soup (vertex positions with motion keys,
//! per-polygon vertex counts, and index tables for positions, UVs and
//! normals). At pre-render the polygons are fan-triangulated into a
//! [`TriMesh`], attributes are flattened per corner, and the material
//! name is resolved against the registry; ray queries then delegate to
//! the embedded mesh.

use anyhow::bail;
use ember_math::{Aabb, Vec2, Vec3};

use crate::array::{MatrixArray, PointArray, Vec2Array, Vec3Array};
use crate::material::MaterialSet;
use crate::mesh::{FaceGeom, TriMesh};
use crate::node::SceneNode;
use crate::primitive::Primitive;
use crate::raydata::RayData;
use crate::shader::ShaderGlobals;

pub struct PolyMesh {
    pub name: String,
    pub ray_bias: f32,

    pub verts: PointArray,
    /// Vertex count of each polygon.
    pub poly_count: Vec<i32>,
    /// Position indices, `poly_count[i]` entries per polygon.
    pub face_idx: Vec<i32>,

    pub material: String,
    pub model_to_world: MatrixArray,
    pub calc_normals: bool,
    pub is_visible: bool,

    pub uv: Vec2Array,
    pub uv_idx: Vec<i32>,

    pub normals: Vec3Array,
    pub normal_idx: Vec<i32>,

    mesh: Option<TriMesh>,
}

impl PolyMesh {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ray_bias: 0.0,
            verts: PointArray::default(),
            poly_count: Vec::new(),
            face_idx: Vec::new(),
            material: String::new(),
            model_to_world: MatrixArray::default(),
            calc_normals: false,
            is_visible: true,
            uv: Vec2Array::default(),
            uv_idx: Vec::new(),
            normals: Vec3Array::default(),
            normal_idx: Vec::new(),
            mesh: None,
        }
    }

    /// Fan-triangulate into a `TriMesh` evaluated at motion key 0.
    fn triangulate(&self, mtl_id: i32) -> anyhow::Result<TriMesh> {
        let mut mesh = TriMesh::new(self.name.clone());
        mesh.ray_bias = self.ray_bias;
        mesh.calc_normals = self.calc_normals;
        mesh.is_visible = self.is_visible;

        let positions = self.verts.key(0);
        let trn = self.model_to_world.key(0);

        let mut vn: Vec<Vec3> = Vec::new();
        let mut uvs: Vec<Vec2> = Vec::new();
        let has_normals = !self.normals.is_empty() && !self.normal_idx.is_empty();
        let has_uvs = !self.uv.is_empty() && !self.uv_idx.is_empty();

        let mut cursor = 0usize;
        for (poly, &count) in self.poly_count.iter().enumerate() {
            let count = count as usize;
            if cursor + count > self.face_idx.len() {
                bail!("polygon {poly} overruns the face index table");
            }
            if count < 3 {
                cursor += count;
                continue;
            }

            for k in 1..count - 1 {
                let corners = [cursor, cursor + k, cursor + k + 1];
                let mut face = FaceGeom::new(Vec3::ZERO, Vec3::ZERO, Vec3::ZERO, mtl_id);

                for (c, &corner) in corners.iter().enumerate() {
                    let pi = self.face_idx[corner] as usize;
                    if pi >= positions.len() {
                        bail!("polygon {poly} references vertex {pi} out of range");
                    }
                    face.v[c] = trn.transform_point3(positions[pi]);

                    // Flatten attributes per corner so one index set
                    // serves both normals and UVs.
                    if has_normals || has_uvs {
                        face.vi[c] = vn.len().max(uvs.len()) as i32;
                        if has_normals {
                            let ni = self.normal_idx[corner] as usize;
                            vn.push(trn.transform_vector3(self.normals.elems[ni]).normalize_or_zero());
                        }
                        if has_uvs {
                            let ti = self.uv_idx[corner] as usize;
                            uvs.push(self.uv.elems[ti]);
                        }
                    }
                }

                mesh.faces.push(face);
            }
            cursor += count;
        }

        if has_normals {
            mesh.vn = vn;
        }
        if has_uvs {
            mesh.vuv = vec![uvs];
        }
        Ok(mesh)
    }
}

impl Primitive for PolyMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn pre_render(&mut self, mtls: &MaterialSet) -> anyhow::Result<Vec<SceneNode>> {
        let mtl_id = mtls.id_for(&self.material);
        if mtl_id == -1 && !self.material.is_empty() {
            bail!("unknown material `{}`", self.material);
        }

        let mut mesh = self.triangulate(mtl_id)?;
        mesh.init_faces();
        if mesh.calc_normals && mesh.vn.is_empty() {
            mesh.calc_vertex_normals();
        }
        mesh.init_accel();
        self.mesh = Some(mesh);
        Ok(Vec::new())
    }

    fn trace_ray(&self, ray: &mut RayData, sg: &mut ShaderGlobals) -> i32 {
        match &self.mesh {
            Some(mesh) => mesh.trace_ray(ray, sg),
            None => -1,
        }
    }

    fn vis_ray(&self, ray: &mut RayData) {
        if let Some(mesh) = &self.mesh {
            mesh.vis_ray(ray);
        }
    }

    fn world_bounds(&self) -> Aabb {
        match &self.mesh {
            Some(mesh) => mesh.world_bounds(),
            None => {
                let trn = self.model_to_world.key(0);
                let mut b = Aabb::EMPTY;
                for v in self.verts.key(0) {
                    b.grow(trn.transform_point3(*v));
                }
                b
            }
        }
    }

    fn visible(&self) -> bool {
        self.is_visible
    }
}
