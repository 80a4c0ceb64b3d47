//! The primitive contract.

use ember_math::Aabb;

use crate::material::MaterialSet;
use crate::node::SceneNode;
use crate::raydata::RayData;
use crate::shader::ShaderGlobals;

/// A renderable object. The scene traversal treats all variants
/// uniformly through this trait; a mesh brings its own embedded QBVH,
/// an analytic shape just answers the two ray queries directly.
pub trait Primitive: Send + Sync {
    /// Node name for lookups and error reports.
    fn name(&self) -> &str {
        ""
    }

    /// One-time setup before rendering: build acceleration structures,
    /// resolve material names. May register further nodes; the returned
    /// ones are pre-rendered in a later round. After this returns the
    /// primitive is immutable for the rest of the render.
    fn pre_render(&mut self, _mtls: &MaterialSet) -> anyhow::Result<Vec<SceneNode>> {
        Ok(Vec::new())
    }

    /// Closest-hit query. Tightens `ray.ray.tclosest` and fills the
    /// shader globals for every improving hit. Returns the material id
    /// of the closest accepted hit, or -1 for a miss.
    fn trace_ray(&self, ray: &mut RayData, sg: &mut ShaderGlobals) -> i32;

    /// Any-hit query over the ray's segment; marks the ray occluded on
    /// the first hit found.
    fn vis_ray(&self, ray: &mut RayData);

    /// World-space bounds.
    fn world_bounds(&self) -> Aabb;

    /// Whether the primitive participates in the scene accel at all.
    fn visible(&self) -> bool {
        true
    }
}
