//! The camera contract.

use ember_math::Vec3;
use rand::RngCore;

use crate::globals::Globals;
use crate::node::SceneNode;

/// Ray-generation contract. `sx`/`sy` are film coordinates in [-1, 1]
/// with +y up; the rng lets stochastic cameras (thin lens, shutter)
/// jitter per sample.
pub trait Camera: Send + Sync {
    fn name(&self) -> &str {
        "camera"
    }

    /// One-time setup (basis vectors, aspect from the output
    /// resolution). May register further nodes.
    fn pre_render(&mut self, _globals: &Globals) -> anyhow::Result<Vec<SceneNode>> {
        Ok(Vec::new())
    }

    /// Generate a primary ray: returns (origin, direction).
    fn compute_ray(&self, sx: f32, sy: f32, rng: &mut dyn RngCore) -> (Vec3, Vec3);
}
