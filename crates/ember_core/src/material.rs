//! The material contract and the built-in surface shaders.

use std::f32::consts::PI;
use std::sync::Arc;

use ember_math::Vec3;
use rand::RngCore;

use crate::spectrum::Spectrum;
use crate::surface::SurfacePoint;
use crate::texture::TextureCache;

/// Surface shader contract consumed by the integrator.
///
/// Directions passed to the EDF/BSDF methods are in the tangent frame
/// of the surface point (z along the shading normal). Uses
/// `&mut dyn RngCore` for object safety.
pub trait Material: Send + Sync {
    fn name(&self) -> &str;

    /// Integer identity assigned by the material set at registration.
    fn id(&self) -> i32;
    fn set_id(&mut self, id: i32);

    /// Whether the material emits light.
    fn has_edf(&self) -> bool {
        false
    }

    fn has_bump_map(&self) -> bool {
        false
    }

    /// Whether the BSDF is a Dirac distribution at this point (mirror,
    /// dielectric); next-event estimation is skipped for such bounces.
    fn is_delta(&self, _surf: &SurfacePoint) -> bool {
        false
    }

    /// Perturb the shading normal from the bump map.
    fn apply_bump_map(&self, _surf: &mut SurfacePoint) {}

    /// Emitted radiance toward `omega_out` (tangent space).
    fn eval_edf(&self, _surf: &SurfacePoint, _omega_out: Vec3, out: &mut Spectrum) {
        out.set_rgb(0.0, 0.0, 0.0);
    }

    /// Reflectance for the given in/out direction pair (tangent space).
    fn eval_bsdf(&self, surf: &SurfacePoint, omega_in: Vec3, omega_out: Vec3, out: &mut Spectrum);

    /// Sample an outgoing direction with its reflectance and density.
    fn sample_bsdf(
        &self,
        surf: &SurfacePoint,
        omega_in: Vec3,
        rng: &mut dyn RngCore,
        omega_out: &mut Vec3,
        rho: &mut Spectrum,
        pdf: &mut f64,
    );
}

/// The render's material registry. Ids are assigned at registration
/// order and resolve hits back to shaders.
#[derive(Default)]
pub struct MaterialSet {
    materials: Vec<Box<dyn Material>>,
}

impl MaterialSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a material, assigning its id. Returns the id.
    pub fn add(&mut self, mut mtl: Box<dyn Material>) -> i32 {
        let id = self.materials.len() as i32;
        mtl.set_id(id);
        self.materials.push(mtl);
        id
    }

    /// Resolve a material by id; -1 and out-of-range ids yield `None`.
    pub fn get(&self, id: i32) -> Option<&dyn Material> {
        if id < 0 {
            return None;
        }
        self.materials.get(id as usize).map(|m| m.as_ref())
    }

    /// Id of the material with the given name, or -1.
    pub fn id_for(&self, name: &str) -> i32 {
        self.materials
            .iter()
            .position(|m| m.name() == name)
            .map(|i| i as i32)
            .unwrap_or(-1)
    }

    pub fn len(&self) -> usize {
        self.materials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }
}

/// Generate a random f32 in [0, 1) from an RngCore.
///
/// Needed because `dyn RngCore` can't use `Rng::gen()` directly.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    let bits = rng.next_u32();
    (bits >> 8) as f32 * (1.0 / (1u32 << 24) as f32)
}

/// Bump-map binding for materials that perturb their shading normal.
pub struct BumpMap {
    pub filename: String,
    pub scale: f32,
    pub cache: Arc<TextureCache>,
}

/// Lambertian diffuse material with cosine-weighted sampling.
pub struct Matte {
    name: String,
    id: i32,
    albedo: Vec3,
    bump: Option<BumpMap>,
}

impl Matte {
    pub fn new(name: impl Into<String>, albedo: Vec3) -> Self {
        Self {
            name: name.into(),
            id: -1,
            albedo,
            bump: None,
        }
    }

    pub fn with_bump(mut self, bump: BumpMap) -> Self {
        self.bump = Some(bump);
        self
    }
}

impl Material for Matte {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn has_bump_map(&self) -> bool {
        self.bump.is_some()
    }

    fn apply_bump_map(&self, surf: &mut SurfacePoint) {
        let Some(bump) = &self.bump else { return };

        // Central-difference height gradient in UV space.
        let d = 1.0 / 256.0;
        let h = |u: f32, v: f32| bump.cache.sample_rgb(&bump.filename, u, v, d, d)[0];
        let h0 = h(surf.uv.x, surf.uv.y);
        let dhdu = (h(surf.uv.x + d, surf.uv.y) - h0) / d;
        let dhdv = (h(surf.uv.x, surf.uv.y + d) - h0) / d;

        surf.ns = (surf.ns - (surf.tan * dhdu + surf.bitan * dhdv) * bump.scale).normalize();
        surf.setup_tangent();
    }

    fn eval_bsdf(&self, _surf: &SurfacePoint, omega_in: Vec3, omega_out: Vec3, out: &mut Spectrum) {
        if omega_in.z <= 0.0 || omega_out.z <= 0.0 {
            out.set_rgb(0.0, 0.0, 0.0);
            return;
        }
        let rho = self.albedo / PI;
        out.set_rgb(rho.x, rho.y, rho.z);
    }

    fn sample_bsdf(
        &self,
        _surf: &SurfacePoint,
        _omega_in: Vec3,
        rng: &mut dyn RngCore,
        omega_out: &mut Vec3,
        rho: &mut Spectrum,
        pdf: &mut f64,
    ) {
        // Cosine-weighted hemisphere: sample the unit disk, project up.
        let r1 = gen_f32(rng);
        let r2 = gen_f32(rng);
        let r = r1.sqrt();
        let phi = 2.0 * PI * r2;
        *omega_out = Vec3::new(r * phi.cos(), r * phi.sin(), (1.0 - r1).sqrt().max(1e-6));

        let f = self.albedo / PI;
        rho.set_rgb(f.x, f.y, f.z);
        *pdf = (omega_out.z / PI) as f64;
    }
}

/// Constant-radiance area emitter. Scatters nothing.
pub struct Emitter {
    name: String,
    id: i32,
    radiance: Vec3,
}

impl Emitter {
    pub fn new(name: impl Into<String>, radiance: Vec3) -> Self {
        Self {
            name: name.into(),
            id: -1,
            radiance,
        }
    }
}

impl Material for Emitter {
    fn name(&self) -> &str {
        &self.name
    }

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn has_edf(&self) -> bool {
        true
    }

    fn eval_edf(&self, _surf: &SurfacePoint, omega_out: Vec3, out: &mut Spectrum) {
        if omega_out.z > 0.0 {
            out.set_rgb(self.radiance.x, self.radiance.y, self.radiance.z);
        } else {
            out.set_rgb(0.0, 0.0, 0.0);
        }
    }

    fn eval_bsdf(&self, _surf: &SurfacePoint, _omega_in: Vec3, _omega_out: Vec3, out: &mut Spectrum) {
        out.set_rgb(0.0, 0.0, 0.0);
    }

    fn sample_bsdf(
        &self,
        _surf: &SurfacePoint,
        _omega_in: Vec3,
        _rng: &mut dyn RngCore,
        omega_out: &mut Vec3,
        rho: &mut Spectrum,
        pdf: &mut f64,
    ) {
        // Emitters absorb; return a zero-throughput continuation so the
        // path contributes nothing past this point.
        *omega_out = Vec3::Z;
        rho.set_rgb(0.0, 0.0, 0.0);
        *pdf = 1.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_material_set_ids() {
        let mut mtls = MaterialSet::new();
        let white = mtls.add(Box::new(Matte::new("white", Vec3::ONE)));
        let lamp = mtls.add(Box::new(Emitter::new("lamp", Vec3::splat(5.0))));

        assert_eq!(white, 0);
        assert_eq!(lamp, 1);
        assert_eq!(mtls.id_for("lamp"), 1);
        assert_eq!(mtls.id_for("missing"), -1);
        assert!(mtls.get(-1).is_none());
        assert_eq!(mtls.get(lamp).map(|m| m.name()), Some("lamp"));
    }

    #[test]
    fn test_matte_sampling_stays_above_surface() {
        let matte = Matte::new("m", Vec3::splat(0.8));
        let surf = SurfacePoint::default();
        let mut rng = StdRng::seed_from_u64(1);

        for _ in 0..256 {
            let mut wo = Vec3::ZERO;
            let mut rho = Spectrum::new(550.0);
            let mut pdf = 0.0;
            matte.sample_bsdf(&surf, Vec3::Z, &mut rng, &mut wo, &mut rho, &mut pdf);

            assert!(wo.z > 0.0);
            assert!((wo.length() - 1.0).abs() < 1e-4);
            assert!(pdf > 0.0);
            // Cosine-weighted: pdf must equal cos(theta)/pi.
            assert!((pdf - (wo.z / PI) as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn test_matte_bsdf_is_albedo_over_pi() {
        let matte = Matte::new("m", Vec3::new(0.5, 0.25, 1.0));
        let surf = SurfacePoint::default();
        let mut out = Spectrum::new(550.0);
        matte.eval_bsdf(&surf, Vec3::Z, Vec3::Z, &mut out);
        let (r, g, b) = out.to_rgb();
        assert!((r - 0.5 / PI).abs() < 1e-6);
        assert!((g - 0.25 / PI).abs() < 1e-6);
        assert!((b - 1.0 / PI).abs() < 1e-6);
    }

    #[test]
    fn test_emitter_radiates_forward_only() {
        let lamp = Emitter::new("lamp", Vec3::splat(3.0));
        let surf = SurfacePoint::default();

        let mut out = Spectrum::new(550.0);
        lamp.eval_edf(&surf, Vec3::Z, &mut out);
        assert_eq!(out.to_rgb(), (3.0, 3.0, 3.0));

        lamp.eval_edf(&surf, -Vec3::Z, &mut out);
        assert_eq!(out.to_rgb(), (0.0, 0.0, 0.0));
    }
}
