//! The per-pixel path estimator.
//!
//! A fixed-depth single-wavelength path tracer with next-event
//! estimation: at each non-delta surface one position on the light is
//! sampled explicitly and connected with an any-hit shadow ray, while
//! the BSDF sample continues the path. Emission is only collected on
//! primary hits and after delta bounces so the two strategies are not
//! double counted.

use ember_core::{
    gen_f32, RayData, ShaderGlobals, Spectrum, SurfacePoint, LAMBDA_MAX, LAMBDA_MIN,
};
use ember_math::Vec3;
use rand::RngCore;

use crate::worker::{Frame, RenderStats};

/// Fixed path depth; no Russian roulette.
pub const MAX_DEPTH: u8 = 4;

/// Compute one radiance sample for pixel `(x, y)`.
///
/// Misses terminate the path keeping what was gathered; a surface with
/// no resolvable material, or a BSDF sample pointing below the
/// geometric surface, discards the path and contributes zero.
pub(crate) fn sample_pixel(
    x: u32,
    y: u32,
    frame: &Frame<'_>,
    rng: &mut dyn RngCore,
    ray: &mut RayData,
    stats: &mut RenderStats,
) -> (f32, f32, f32) {
    let r0 = gen_f32(&mut *rng);
    let r1 = gen_f32(&mut *rng);

    let u = (x as f32 + r0) * frame.du;
    let v = (y as f32 + r1) * frame.dv;

    // The whole path is evaluated at a single wavelength.
    let lambda = LAMBDA_MIN + (LAMBDA_MAX - LAMBDA_MIN) * gen_f32(&mut *rng);

    let (mut p, mut d) = frame.camera.compute_ray(-1.0 + u, 1.0 - v, &mut *rng);

    let mut fullsample = Spectrum::new(lambda);
    let mut contrib = Spectrum::from_rgb(lambda, 1.0, 1.0, 1.0);
    let mut direct = true;

    for depth in 0..MAX_DEPTH {
        ray.lambda = lambda;
        ray.level = depth;
        ray.init_ray(p, d);

        let mut sg = ShaderGlobals::from_ray(ray);
        let hit = frame.scene.trace_probe(ray, &mut sg);
        stats.rays += 1;

        if !hit {
            // Escaped the scene.
            break;
        }

        let Some(mtl) = frame.materials.get(sg.mtl_id) else {
            // Can't do much with no material.
            return (0.0, 0.0, 0.0);
        };

        let mut surf = sg.surf;
        if mtl.has_bump_map() {
            mtl.apply_bump_map(&mut surf);
        }

        let vout = -d;
        let omega_i = surf.world_to_tangent(vout);

        if direct && mtl.has_edf() {
            let mut le = Spectrum::new(lambda);
            mtl.eval_edf(&surf, omega_i, &mut le);
            le.mul(&contrib);
            fullsample.add(&le);
        }

        // Assume no transmission: offset the point out of the surface.
        surf.offset_p(1.0);

        if !mtl.is_delta(&surf) {
            if !frame.scene.lights.is_empty() {
                let nls = 1;
                for _ in 0..nls {
                    let mut lp = SurfacePoint::default();
                    let mut pdf = 0.0f64;

                    if frame.scene.lights[0].sample_area(&surf, &mut *rng, &mut lp, &mut pdf) {
                        let lv = lp.p - surf.p;

                        // Light must lie above both surface normals and
                        // face the shading point.
                        if lv.dot(surf.ns) > 0.0 && lv.dot(surf.n) > 0.0 && lv.dot(lp.n) < 0.0 {
                            ray.init_vis_ray(surf.p, lp.p);
                            frame.scene.vis_ray(ray);
                            stats.shadow_rays += 1;

                            if ray.is_vis() {
                                if let Some(light_mtl) = frame.materials.get(lp.mtl_id) {
                                    let lnorm = lv.normalize();

                                    let mut le = Spectrum::new(lambda);
                                    light_mtl.eval_edf(&lp, lp.world_to_tangent(-lnorm), &mut le);

                                    let mut rho = Spectrum::new(lambda);
                                    mtl.eval_bsdf(&surf, omega_i, surf.world_to_tangent(lnorm), &mut rho);

                                    let geom = lnorm.dot(surf.ns).abs() * lnorm.dot(lp.n).abs()
                                        / lv.length_squared();

                                    le.mul(&rho);
                                    le.mul(&contrib);
                                    le.scale(geom / (pdf as f32 * nls as f32));
                                    fullsample.add(&le);
                                }
                            }
                        }
                    }
                }
                direct = false;
            }
        } else {
            direct = true;
        }

        let mut omega_o = Vec3::ZERO;
        let mut pdf = 0.0f64;
        let mut rho = Spectrum::new(lambda);
        mtl.sample_bsdf(&surf, omega_i, &mut *rng, &mut omega_o, &mut rho, &mut pdf);

        d = surf.tangent_to_world(omega_o);
        if d.dot(surf.n) < 0.0 {
            // Sampled direction went below the geometric surface.
            return (0.0, 0.0, 0.0);
        }

        contrib.mul(&rho);
        contrib.scale(omega_o.z / pdf as f32);
        p = surf.p;
    }

    fullsample.to_rgb()
}
