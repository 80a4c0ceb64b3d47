//! Surface-point records and tangent-frame operations.

use ember_math::{Vec2, Vec3};

/// Scale factor for the self-intersection offset; multiplied by the
/// magnitude of the hit point so the displacement stays above float
/// precision far from the origin.
const OFFSET_SCALE: f32 = 1e-4;

/// A point on a surface with its shading frame.
///
/// `n` is the geometric normal, `ns` the shading normal; `tan`/`bitan`
/// complete an orthonormal frame around `ns` once [`setup_tangent`] has
/// run. Light samplers also produce these (position + normal + material
/// id) for the light side of a shadow segment.
///
/// [`setup_tangent`]: SurfacePoint::setup_tangent
#[derive(Debug, Clone, Copy)]
pub struct SurfacePoint {
    pub p: Vec3,
    pub n: Vec3,
    pub ns: Vec3,
    pub tan: Vec3,
    pub bitan: Vec3,
    pub uv: Vec2,
    pub mtl_id: i32,
    pub elem_id: u32,
    /// Index of the primitive this point lies on, into the scene's
    /// primitive store. `None` for synthesized points (light samples).
    pub prim: Option<usize>,
}

impl Default for SurfacePoint {
    fn default() -> Self {
        Self {
            p: Vec3::ZERO,
            n: Vec3::Z,
            ns: Vec3::Z,
            tan: Vec3::X,
            bitan: Vec3::Y,
            uv: Vec2::ZERO,
            mtl_id: -1,
            elem_id: 0,
            prim: None,
        }
    }
}

impl SurfacePoint {
    /// Build the orthonormal tangent frame around the shading normal.
    pub fn setup_tangent(&mut self) {
        let (tan, bitan) = tangent_basis(self.ns);
        self.tan = tan;
        self.bitan = bitan;
    }

    /// Rotate a world-space vector into the tangent frame (z = `ns`).
    #[inline]
    pub fn world_to_tangent(&self, v: Vec3) -> Vec3 {
        Vec3::new(v.dot(self.tan), v.dot(self.bitan), v.dot(self.ns))
    }

    /// Rotate a tangent-space vector back into world space.
    #[inline]
    pub fn tangent_to_world(&self, v: Vec3) -> Vec3 {
        self.tan * v.x + self.bitan * v.y + self.ns * v.z
    }

    /// Displace the point along the geometric normal to avoid
    /// self-intersection when re-tracing from a hit. `sign` is +1 to
    /// offset out of the surface, -1 into it.
    pub fn offset_p(&mut self, sign: f32) {
        let eps = OFFSET_SCALE * self.p.length().max(1.0);
        self.p += self.n * (eps * sign);
    }
}

/// Orthonormal tangent/bitangent around a unit normal, branchless.
fn tangent_basis(n: Vec3) -> (Vec3, Vec3) {
    let sign = if n.z >= 0.0 { 1.0 } else { -1.0 };
    let a = -1.0 / (sign + n.z);
    let b = n.x * n.y * a;

    let tangent = Vec3::new(1.0 + sign * n.x * n.x * a, sign * b, -sign * n.x);
    let bitangent = Vec3::new(b, sign + n.y * n.y * a, -n.y);

    (tangent, bitangent)
}
