//! Pinhole camera node.

use ember_core::{Camera, Globals, SceneNode};
use ember_math::Vec3;
use rand::RngCore;

/// Simple pinhole projection. The basis vectors and film scale are
/// computed at pre-render from the output resolution.
pub struct PinholeCamera {
    node_name: String,
    look_from: Vec3,
    look_at: Vec3,
    vup: Vec3,
    /// Vertical field of view in degrees.
    vfov: f32,

    // Cached by pre_render
    u: Vec3,
    v: Vec3,
    w: Vec3,
    tan_half: f32,
    aspect: f32,
}

impl PinholeCamera {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            node_name: name.into(),
            look_from: Vec3::ZERO,
            look_at: Vec3::new(0.0, 0.0, -1.0),
            vup: Vec3::Y,
            vfov: 90.0,
            u: Vec3::X,
            v: Vec3::Y,
            w: Vec3::Z,
            tan_half: 1.0,
            aspect: 1.0,
        }
    }

    pub fn with_position(mut self, look_from: Vec3, look_at: Vec3, vup: Vec3) -> Self {
        self.look_from = look_from;
        self.look_at = look_at;
        self.vup = vup;
        self
    }

    pub fn with_fov(mut self, vfov: f32) -> Self {
        self.vfov = vfov;
        self
    }
}

impl Camera for PinholeCamera {
    fn name(&self) -> &str {
        &self.node_name
    }

    fn pre_render(&mut self, globals: &Globals) -> anyhow::Result<Vec<SceneNode>> {
        self.aspect = globals.xres as f32 / globals.yres.max(1) as f32;
        self.tan_half = (self.vfov.to_radians() / 2.0).tan();

        self.w = (self.look_from - self.look_at).normalize();
        self.u = self.vup.cross(self.w).normalize();
        self.v = self.w.cross(self.u);

        Ok(Vec::new())
    }

    fn compute_ray(&self, sx: f32, sy: f32, _rng: &mut dyn RngCore) -> (Vec3, Vec3) {
        let d = self.u * (sx * self.tan_half * self.aspect) + self.v * (sy * self.tan_half)
            - self.w;
        (self.look_from, d.normalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_center_ray_points_forward() {
        let mut cam = PinholeCamera::new("camera");
        cam.pre_render(&Globals::default()).unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let (p, d) = cam.compute_ray(0.0, 0.0, &mut rng);
        assert_eq!(p, Vec3::ZERO);
        assert!((d - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }

    #[test]
    fn test_film_corners_diverge() {
        let mut cam = PinholeCamera::new("camera");
        cam.pre_render(&Globals::default()).unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let (_, tl) = cam.compute_ray(-1.0, 1.0, &mut rng);
        let (_, br) = cam.compute_ray(1.0, -1.0, &mut rng);

        assert!(tl.x < 0.0 && tl.y > 0.0);
        assert!(br.x > 0.0 && br.y < 0.0);
        // 90 degree vertical fov: the corner elevation matches tan(45).
        assert!((tl.y.abs() - tl.z.abs()).abs() < 1e-6);
    }

    #[test]
    fn test_look_at_orientation() {
        let mut cam = PinholeCamera::new("camera")
            .with_position(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y);
        cam.pre_render(&Globals::default()).unwrap();

        let mut rng = StdRng::seed_from_u64(0);
        let (p, d) = cam.compute_ray(0.0, 0.0, &mut rng);
        assert_eq!(p, Vec3::new(0.0, 0.0, 3.0));
        assert!((d - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-6);
    }
}
