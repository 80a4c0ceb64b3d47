//! Per-iteration worker pool.
//!
//! Workers pull tiles from a rendezvous channel, render every pixel
//! once, and hand the finished tile to a single collector that folds it
//! into the accumulator with the running-mean update. Pixel writes only
//! ever happen on the collector, so an iteration needs no locks; the
//! scope join is the barrier before preview and cancellation checks.

use std::thread;

use crossbeam_channel::{bounded, Receiver, Sender};
use ember_core::{Camera, MaterialSet, RayData, Scene};
use rand::rngs::SmallRng;
use rand::SeedableRng;

use crate::integrator::sample_pixel;
use crate::tiles::{generate_tiles, Tile, TileResult, TILE_SIZE};

/// Fixed exposure applied before the accumulator clamp. Kept from the
/// original debug tone mapping so accumulated values are directly
/// displayable.
pub(crate) const EXPOSURE: f32 = 1000.0;
pub(crate) const CLAMP_MAX: f32 = 255.0;

/// Read-only per-iteration state shared by all workers.
#[derive(Clone, Copy)]
pub(crate) struct Frame<'a> {
    pub w: u32,
    pub h: u32,
    pub du: f32,
    pub dv: f32,
    pub camera: &'a dyn Camera,
    pub scene: &'a Scene,
    pub materials: &'a MaterialSet,
}

/// Ray counts gathered per worker and summed at the iteration barrier.
#[derive(Debug, Default, Clone, Copy)]
pub struct RenderStats {
    pub rays: u64,
    pub shadow_rays: u64,
}

/// Render iteration `k` into `buf`.
///
/// The running mean `acc' = (acc * k + sample) / (k + 1)` leaves the
/// buffer holding the arithmetic mean of the `k + 1` samples taken so
/// far for every pixel.
pub(crate) fn render_iteration(
    k: u32,
    frame: &Frame<'_>,
    buf: &mut [f32],
    workers: usize,
    base_seed: u64,
    progress: Option<&indicatif::ProgressBar>,
) -> RenderStats {
    let tiles = generate_tiles(frame.w, frame.h, TILE_SIZE);
    let (work_tx, work_rx) = bounded::<Tile>(0);
    let (done_tx, done_rx) = bounded::<TileResult>(0);

    let mut totals = RenderStats::default();

    thread::scope(|s| {
        let mut handles = Vec::with_capacity(workers);
        for _ in 0..workers.max(1) {
            let work_rx = work_rx.clone();
            let done_tx = done_tx.clone();
            handles.push(s.spawn(move || worker_loop(k, frame, work_rx, done_tx, base_seed)));
        }
        drop(work_rx);
        drop(done_tx);

        let collector = s.spawn(move || {
            for result in done_rx.iter() {
                blend_tile(buf, frame.w, k, &result);
                if let Some(bar) = progress {
                    bar.inc((result.tile.w * result.tile.h) as u64);
                }
            }
        });

        for tile in tiles {
            if work_tx.send(tile).is_err() {
                break;
            }
        }
        drop(work_tx);

        for handle in handles {
            if let Ok(stats) = handle.join() {
                totals.rays += stats.rays;
                totals.shadow_rays += stats.shadow_rays;
            }
        }
        let _ = collector.join();
    });

    totals
}

/// One worker: a preallocated `RayData` reused across all its tiles,
/// and a fresh random stream per tile keyed by (seed, iteration, tile)
/// so the result does not depend on which worker drew which tile.
fn worker_loop(
    k: u32,
    frame: &Frame<'_>,
    work_rx: Receiver<Tile>,
    done_tx: Sender<TileResult>,
    base_seed: u64,
) -> RenderStats {
    let mut ray = RayData::new();
    let mut stats = RenderStats::default();

    for tile in work_rx.iter() {
        let mut rng = SmallRng::seed_from_u64(tile_seed(base_seed, k as u64, tile.index as u64));
        let mut samples = vec![0.0f32; (tile.w * tile.h * 3) as usize];

        for j in 0..tile.h {
            for i in 0..tile.w {
                let (r, g, b) =
                    sample_pixel(tile.x + i, tile.y + j, frame, &mut rng, &mut ray, &mut stats);
                let o = ((j * tile.w + i) * 3) as usize;
                samples[o] = (r * EXPOSURE).clamp(0.0, CLAMP_MAX);
                samples[o + 1] = (g * EXPOSURE).clamp(0.0, CLAMP_MAX);
                samples[o + 2] = (b * EXPOSURE).clamp(0.0, CLAMP_MAX);
            }
        }

        if done_tx.send(TileResult { tile, samples }).is_err() {
            break;
        }
    }

    stats
}

/// Fold one tile into the accumulator with the running-mean update.
fn blend_tile(buf: &mut [f32], width: u32, k: u32, result: &TileResult) {
    let t = &result.tile;
    let kf = k as f32;

    for j in 0..t.h {
        for i in 0..t.w {
            let src = ((j * t.w + i) * 3) as usize;
            let dst = (((t.y + j) * width + (t.x + i)) * 3) as usize;
            for c in 0..3 {
                buf[dst + c] = (buf[dst + c] * kf + result.samples[src + c]) / (kf + 1.0);
            }
        }
    }
}

/// SplitMix64-style mix of (seed, iteration, tile).
fn tile_seed(base: u64, iter: u64, tile: u64) -> u64 {
    let mut z = base
        ^ iter.wrapping_mul(0x9E37_79B9_7F4A_7C15)
        ^ tile.wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
