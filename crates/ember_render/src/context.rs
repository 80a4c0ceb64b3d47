//! The render context: node lifecycle and the progressive render loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use ember_core::{
    Camera, Globals, Material, MaterialSet, RenderError, RenderResult, Scene, SceneNode,
};
use indicatif::ProgressBar;

use crate::preview::{tonemap, PreviewWindow};
use crate::worker::{render_iteration, Frame, RenderStats};

/// Owns everything a render needs: the node registry, the scene, the
/// material table, the accumulator, and the finish flag.
///
/// Lifecycle: loaders `add_node` everything, `pre_render` runs the node
/// hooks to a fixpoint and builds the scene accel, then `render` runs
/// iterations until the cap or the finish signal.
pub struct RenderContext {
    pub globals: Globals,
    pending: Vec<SceneNode>,
    scene: Scene,
    cameras: Vec<Box<dyn Camera>>,
    materials: MaterialSet,
    imgbuf: Vec<f32>,
    finish: Arc<AtomicBool>,
    preview: Option<Box<dyn PreviewWindow>>,
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext {
    pub fn new() -> Self {
        Self {
            globals: Globals::default(),
            pending: Vec::new(),
            scene: Scene::new(),
            cameras: Vec::new(),
            materials: MaterialSet::new(),
            imgbuf: Vec::new(),
            finish: Arc::new(AtomicBool::new(false)),
            preview: None,
        }
    }

    /// Register a node. Takes effect at the next `pre_render`.
    pub fn add_node(&mut self, node: SceneNode) {
        self.pending.push(node);
    }

    pub fn scene(&self) -> &Scene {
        &self.scene
    }

    pub fn materials(&self) -> &MaterialSet {
        &self.materials
    }

    pub fn get_material(&self, id: i32) -> Option<&dyn Material> {
        self.materials.get(id)
    }

    pub fn get_material_id(&self, name: &str) -> i32 {
        self.materials.id_for(name)
    }

    pub fn start_preview(&mut self, preview: Box<dyn PreviewWindow>) {
        self.preview = Some(preview);
    }

    /// Signal the render loop to stop after the current iteration.
    pub fn finish(&self) {
        self.finish.store(true, Ordering::Relaxed);
    }

    /// Handle for signalling finish from another thread.
    pub fn finish_handle(&self) -> Arc<AtomicBool> {
        self.finish.clone()
    }

    pub fn output_res(&self) -> (u32, u32) {
        (self.globals.xres, self.globals.yres)
    }

    /// The linear float RGB accumulator, `xres * yres * 3` long.
    pub fn image(&self) -> &[f32] {
        &self.imgbuf
    }

    pub fn frame_aspect(&self) -> f32 {
        self.globals.xres as f32 / self.globals.yres as f32
    }

    /// Run every node's pre-render hook until no node registers
    /// anything new, then build the scene acceleration structure.
    /// After this returns the scene is immutable for the render.
    pub fn pre_render(&mut self) -> RenderResult<()> {
        let mut rounds = 0;
        while !self.pending.is_empty() {
            rounds += 1;
            if rounds > 64 {
                return Err(RenderError::PreRenderCycle);
            }

            let nodes = std::mem::take(&mut self.pending);

            // File materials and globals first: primitives and lights
            // resolve material names in their own hooks.
            let mut rest = Vec::new();
            for node in nodes {
                match node {
                    SceneNode::Material(m) => {
                        self.materials.add(m);
                    }
                    SceneNode::Globals(g) => self.globals = g,
                    other => rest.push(other),
                }
            }

            for node in rest {
                match node {
                    SceneNode::Camera(mut c) => {
                        let added = c
                            .pre_render(&self.globals)
                            .map_err(|e| RenderError::node(c.name(), e))?;
                        self.pending.extend(added);
                        self.cameras.push(c);
                    }
                    SceneNode::Primitive(mut p) => {
                        let added = p
                            .pre_render(&self.materials)
                            .map_err(|e| RenderError::node(p.name(), e))?;
                        self.pending.extend(added);
                        self.scene.add_primitive(p);
                    }
                    SceneNode::Light(mut l) => {
                        let added = l
                            .pre_render(&self.materials)
                            .map_err(|e| RenderError::node(l.name(), e))?;
                        self.pending.extend(added);
                        self.scene.add_light(l);
                    }
                    SceneNode::Material(_) | SceneNode::Globals(_) => unreachable!(),
                }
            }
        }

        self.scene.init_accel();
        Ok(())
    }

    /// Render progressively. `max_iter >= 0` caps the iteration count;
    /// negative runs until `finish` is signalled. Each iteration adds
    /// one sample per pixel to the running-mean accumulator.
    pub fn render(&mut self, max_iter: i32) -> RenderResult<()> {
        let camera: &dyn Camera = self
            .cameras
            .iter()
            .find(|c| c.name() == "camera")
            .or_else(|| self.cameras.first())
            .ok_or(RenderError::NoCamera)?
            .as_ref();

        let (w, h) = (self.globals.xres, self.globals.yres);
        let frame = Frame {
            w,
            h,
            du: 2.0 / w as f32,
            dv: 2.0 / h as f32,
            camera,
            scene: &self.scene,
            materials: &self.materials,
        };

        self.imgbuf = vec![0.0; (w * h * 3) as usize];

        let workers = self.globals.max_workers.max(1);
        let base_seed = self.globals.seed.unwrap_or_else(seed_from_clock);
        let progress = self
            .globals
            .use_progress
            .then(|| ProgressBar::new(w as u64 * h as u64));

        let start = Instant::now();
        let mut totals = RenderStats::default();
        let mut k: u32 = 0;

        loop {
            if max_iter >= 0 && k as i64 >= max_iter as i64 - 1 {
                self.finish.store(true, Ordering::Relaxed);
            }

            if let Some(bar) = &progress {
                bar.reset();
            }

            let stats = render_iteration(
                k,
                &frame,
                &mut self.imgbuf,
                workers,
                base_seed,
                progress.as_ref(),
            );
            totals.rays += stats.rays;
            totals.shadow_rays += stats.shadow_rays;

            if let Some(preview) = &mut self.preview {
                let mut buf = vec![0u8; (w * h * 3) as usize];
                tonemap(&self.imgbuf, &mut buf);
                preview.update_frame(w, h, &buf);
            }

            // Consume the signal like a one-slot channel so the next
            // render call starts clean.
            if self.finish.swap(false, Ordering::Relaxed) {
                if let Some(preview) = &mut self.preview {
                    preview.close();
                }
                let dur = start.elapsed();
                let mrays = (totals.rays + totals.shadow_rays) as f64
                    / (1e6 * dur.as_secs_f64().max(1e-9));
                log::info!(
                    "{} iterations, {:.3?} ({} rays, {} shadow) {:.2} Mray/sec",
                    k + 1,
                    dur,
                    totals.rays,
                    totals.shadow_rays,
                    mrays
                );
                break;
            }
            k += 1;
        }

        if let Some(bar) = progress {
            bar.finish();
        }

        Ok(())
    }
}

fn seed_from_clock() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5EED)
}
