//! End-to-end render tests over small scenes.

use ember_core::{
    Emitter, FaceGeom, Globals, Material, Matte, QuadLight, RayData, SceneNode, Spectrum,
    SpherePrim, SurfacePoint, TriMesh,
};
use ember_math::{Vec2, Vec3};
use ember_render::{PinholeCamera, RenderContext};
use rand::RngCore;

/// A material that reflects (1, 1, 1) with a delta-free unit-pdf
/// sample, for geometry-only tests.
struct FlatWhite {
    id: i32,
}

impl Material for FlatWhite {
    fn name(&self) -> &str {
        "flat-white"
    }

    fn id(&self) -> i32 {
        self.id
    }

    fn set_id(&mut self, id: i32) {
        self.id = id;
    }

    fn eval_bsdf(&self, _surf: &SurfacePoint, _wi: Vec3, _wo: Vec3, out: &mut Spectrum) {
        out.set_rgb(1.0, 1.0, 1.0);
    }

    fn sample_bsdf(
        &self,
        _surf: &SurfacePoint,
        _wi: Vec3,
        _rng: &mut dyn RngCore,
        wo: &mut Vec3,
        rho: &mut Spectrum,
        pdf: &mut f64,
    ) {
        *wo = Vec3::Z;
        rho.set_rgb(1.0, 1.0, 1.0);
        *pdf = 1.0;
    }
}

fn globals(res: u32, seed: u64) -> Globals {
    Globals {
        xres: res,
        yres: res,
        max_workers: 2,
        use_progress: false,
        seed: Some(seed),
    }
}

fn quad_mesh(name: &str, z: f32, half: f32, mtl: i32) -> TriMesh {
    // Two CCW triangles facing +z.
    let mut mesh = TriMesh::new(name);
    mesh.faces.push(FaceGeom::new(
        Vec3::new(-half, -half, z),
        Vec3::new(half, -half, z),
        Vec3::new(half, half, z),
        mtl,
    ));
    mesh.faces.push(FaceGeom::new(
        Vec3::new(-half, -half, z),
        Vec3::new(half, half, z),
        Vec3::new(-half, half, z),
        mtl,
    ));
    mesh
}

fn pixel(img: &[f32], res: u32, x: u32, y: u32) -> [f32; 3] {
    let o = ((y * res + x) * 3) as usize;
    [img[o], img[o + 1], img[o + 2]]
}

#[test]
fn test_empty_scene_renders_black() {
    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(8, 1)));
    ctx.add_node(SceneNode::Camera(Box::new(PinholeCamera::new("camera"))));
    ctx.pre_render().unwrap();
    ctx.render(1).unwrap();

    let img = ctx.image();
    assert_eq!(img.len(), 8 * 8 * 3);
    assert!(img.iter().all(|&v| v == 0.0));
}

#[test]
fn test_no_camera_is_an_error() {
    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(8, 1)));
    ctx.pre_render().unwrap();
    assert!(matches!(
        ctx.render(1),
        Err(ember_core::RenderError::NoCamera)
    ));
}

#[test]
fn test_single_triangle_projection() {
    // One white triangle at z = -1, no lights: pixels inside the
    // projection must all agree and be finite, pixels outside stay 0.
    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(16, 7)));
    ctx.add_node(SceneNode::Camera(Box::new(PinholeCamera::new("camera"))));
    ctx.add_node(SceneNode::Material(Box::new(FlatWhite { id: -1 })));

    let mut mesh = TriMesh::new("tri");
    mesh.faces.push(FaceGeom::new(
        Vec3::new(-0.5, -0.5, -1.0),
        Vec3::new(0.5, -0.5, -1.0),
        Vec3::new(0.0, 0.5, -1.0),
        0,
    ));
    ctx.add_node(SceneNode::Primitive(Box::new(mesh)));

    ctx.pre_render().unwrap();
    ctx.render(1).unwrap();

    let img = ctx.image();
    // Pixels safely inside the projection for any jitter.
    let inside = [(7u32, 8u32), (8, 8), (7, 9), (8, 9)];
    let reference = pixel(img, 16, 7, 8);
    for (x, y) in inside {
        let px = pixel(img, 16, x, y);
        assert!(px.iter().all(|v| v.is_finite()));
        assert_eq!(px, reference, "pixel ({x},{y}) diverged");
    }
    // Far corners never touch the triangle.
    assert_eq!(pixel(img, 16, 0, 0), [0.0; 3]);
    assert_eq!(pixel(img, 16, 15, 15), [0.0; 3]);
}

#[test]
fn test_emitter_sphere_matches_disc_projection() {
    // Unit sphere at the origin seen from z = 3 with a 90 degree fov:
    // the fraction of film hitting the sphere is a disc of radius
    // tan(asin(1/3)) in the [-1,1]^2 film square. Every hit pixel reads
    // radiance 0.1 -> accumulator 100 after the exposure clamp.
    let res = 32u32;
    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(res, 99)));
    ctx.add_node(SceneNode::Camera(Box::new(
        PinholeCamera::new("camera").with_position(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y),
    )));
    ctx.add_node(SceneNode::Material(Box::new(Emitter::new(
        "glow",
        Vec3::splat(0.1),
    ))));
    ctx.add_node(SceneNode::Primitive(Box::new(SpherePrim::new(
        "ball",
        Vec3::ZERO,
        1.0,
        "glow",
    ))));

    ctx.pre_render().unwrap();
    ctx.render(64).unwrap();

    let img = ctx.image();
    let mean: f32 = img.iter().copied().sum::<f32>() / img.len() as f32;

    let tan_alpha = (1.0f64 / 3.0).asin().tan();
    let frac = std::f64::consts::PI * tan_alpha * tan_alpha / 4.0;
    let expected = (100.0 * frac) as f32;

    let err = (mean - expected).abs() / expected;
    assert!(
        err < 0.05,
        "mean luminance {mean} vs analytic {expected} ({:.1}% off)",
        err * 100.0
    );
}

#[test]
fn test_direct_lighting_with_occluder() {
    // Matte floor at z = -2, a small quad light at z = -1 facing the
    // floor (edges ordered so the normal points -z). The camera sits
    // off-axis so its view of the floor center clears the blocker while
    // the vertical shadow segment does not. The floor center sees
    // rho/pi * Le * G * area with G ~ 1; the occluder kills it.
    let res = 64u32;
    let analytic = (1000.0 / std::f32::consts::PI) * 10.0 * 0.04;

    for occluded in [false, true] {
        let mut ctx = RenderContext::new();
        ctx.add_node(SceneNode::Globals(globals(res, 1234)));
        ctx.add_node(SceneNode::Camera(Box::new(
            PinholeCamera::new("camera").with_position(
                Vec3::new(2.0, 0.0, 0.0),
                Vec3::new(0.0, 0.0, -2.0),
                Vec3::Y,
            ),
        )));
        ctx.add_node(SceneNode::Material(Box::new(Matte::new("white", Vec3::ONE))));
        ctx.add_node(SceneNode::Material(Box::new(Emitter::new(
            "lamp",
            Vec3::splat(10.0),
        ))));
        ctx.add_node(SceneNode::Primitive(Box::new(quad_mesh("floor", -2.0, 4.0, 0))));
        // Sample-only light: its quad is not scene geometry, so camera
        // rays pass straight through to the floor.
        ctx.add_node(SceneNode::Light(Box::new(QuadLight::new(
            "key",
            Vec3::new(-0.1, -0.1, -1.0),
            Vec3::new(0.0, 0.2, 0.0),
            Vec3::new(0.2, 0.0, 0.0),
            "lamp",
        ))));
        if occluded {
            // Small enough that the oblique camera ray passes beside it
            // (it crosses z = -1.5 at x = 0.5), wide enough to cut every
            // floor-center-to-light segment.
            ctx.add_node(SceneNode::Primitive(Box::new(quad_mesh(
                "blocker", -1.5, 0.3, 0,
            ))));
        }

        ctx.pre_render().unwrap();
        ctx.render(32).unwrap();

        let img = ctx.image();
        let center = pixel(img, res, res / 2, res / 2);

        if occluded {
            // The blocker is unlit from behind, and the floor's shadow
            // ray is cut: the center goes essentially black.
            assert!(
                center[0] < 1.0,
                "occluded center should be dark, got {center:?}"
            );
        } else {
            let err = (center[0] - analytic).abs() / analytic;
            assert!(
                err < 0.1,
                "center {center:?} vs analytic {analytic} ({:.1}% off)",
                err * 100.0
            );
        }
    }
}

#[test]
fn test_front_triangle_occludes_back() {
    // Scenario: shadow segment from a point on the back plane toward a
    // light in front must be cut by the front plane.
    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(8, 5)));
    ctx.add_node(SceneNode::Camera(Box::new(PinholeCamera::new("camera"))));
    ctx.add_node(SceneNode::Material(Box::new(FlatWhite { id: -1 })));
    ctx.add_node(SceneNode::Primitive(Box::new(quad_mesh("front", -1.0, 2.0, 0))));
    ctx.add_node(SceneNode::Primitive(Box::new(quad_mesh("back", -3.0, 2.0, 0))));
    ctx.pre_render().unwrap();

    let mut ray = RayData::new();
    ray.init_vis_ray(Vec3::new(0.0, 0.0, -2.999), Vec3::new(0.0, 0.0, 1.0));
    ctx.scene().vis_ray(&mut ray);
    assert!(!ray.is_vis(), "front plane must occlude the shadow segment");

    // A segment that stays behind the front plane is clear.
    ray.init_vis_ray(Vec3::new(0.0, 0.0, -2.999), Vec3::new(0.0, 0.0, -1.5));
    ctx.scene().vis_ray(&mut ray);
    assert!(ray.is_vis());
}

#[test]
fn test_running_mean_is_exact_for_constant_scenes() {
    // A full-view emitter yields the same sample every iteration, so
    // the running mean must hold that value exactly at any count.
    let res = 8u32;
    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(res, 3)));
    ctx.add_node(SceneNode::Camera(Box::new(PinholeCamera::new("camera"))));
    ctx.add_node(SceneNode::Material(Box::new(Emitter::new(
        "wall",
        Vec3::splat(0.05),
    ))));
    ctx.add_node(SceneNode::Primitive(Box::new(quad_mesh("panel", -2.0, 10.0, 0))));

    ctx.pre_render().unwrap();
    ctx.render(5).unwrap();

    for &v in ctx.image() {
        assert_eq!(v, 50.0);
    }
}

#[test]
fn test_fixed_seed_renders_are_bitwise_identical() {
    let render_once = || {
        let mut ctx = RenderContext::new();
        ctx.add_node(SceneNode::Globals(globals(16, 42)));
        ctx.add_node(SceneNode::Camera(Box::new(
            PinholeCamera::new("camera")
                .with_position(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y),
        )));
        ctx.add_node(SceneNode::Material(Box::new(Emitter::new(
            "glow",
            Vec3::splat(0.2),
        ))));
        ctx.add_node(SceneNode::Primitive(Box::new(SpherePrim::new(
            "ball",
            Vec3::ZERO,
            1.0,
            "glow",
        ))));
        ctx.pre_render().unwrap();
        ctx.render(4).unwrap();
        ctx.image().to_vec()
    };

    assert_eq!(render_once(), render_once());
}

#[test]
fn test_accumulator_is_independent_of_worker_count() {
    let render_with_workers = |workers: usize| {
        let mut ctx = RenderContext::new();
        let mut g = globals(16, 77);
        g.max_workers = workers;
        ctx.add_node(SceneNode::Globals(g));
        ctx.add_node(SceneNode::Camera(Box::new(
            PinholeCamera::new("camera")
                .with_position(Vec3::new(0.0, 0.0, 3.0), Vec3::ZERO, Vec3::Y),
        )));
        ctx.add_node(SceneNode::Material(Box::new(Emitter::new(
            "glow",
            Vec3::splat(0.2),
        ))));
        ctx.add_node(SceneNode::Primitive(Box::new(SpherePrim::new(
            "ball",
            Vec3::ZERO,
            1.0,
            "glow",
        ))));
        ctx.pre_render().unwrap();
        ctx.render(3).unwrap();
        ctx.image().to_vec()
    };

    assert_eq!(render_with_workers(1), render_with_workers(4));
}

#[test]
fn test_negative_max_iter_stops_on_finish() {
    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(8, 9)));
    ctx.add_node(SceneNode::Camera(Box::new(PinholeCamera::new("camera"))));
    ctx.pre_render().unwrap();

    // Pre-signalled finish: the loop observes it after one iteration.
    ctx.finish();
    ctx.render(-1).unwrap();
    assert_eq!(ctx.image().len(), 8 * 8 * 3);
}

#[test]
fn test_uv_interpolation_reaches_shading() {
    // A textured-style quad: UVs interpolate across the surface and
    // arrive in the surface point handed to materials.
    let mut mesh = quad_mesh("uvquad", -1.0, 1.0, 0);
    for (f, face) in mesh.faces.iter_mut().enumerate() {
        let base = (f * 3) as i32;
        face.vi = [base, base + 1, base + 2];
    }
    mesh.vuv = vec![vec![
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ]];

    let mut ctx = RenderContext::new();
    ctx.add_node(SceneNode::Globals(globals(8, 11)));
    ctx.add_node(SceneNode::Camera(Box::new(PinholeCamera::new("camera"))));
    ctx.add_node(SceneNode::Material(Box::new(FlatWhite { id: -1 })));
    ctx.add_node(SceneNode::Primitive(Box::new(mesh)));
    ctx.pre_render().unwrap();

    let mut ray = RayData::new();
    ray.init_ray(Vec3::new(0.5, 0.5, 0.0), Vec3::new(0.0, 0.0, -1.0));
    let mut sg = ember_core::ShaderGlobals::from_ray(&ray);
    assert!(ctx.scene().trace_probe(&mut ray, &mut sg));
    // World (0.5, 0.5) on a [-1,1] quad maps to UV (0.75, 0.75).
    assert!((sg.surf.uv.x - 0.75).abs() < 1e-4);
    assert!((sg.surf.uv.y - 0.75).abs() < 1e-4);
}
