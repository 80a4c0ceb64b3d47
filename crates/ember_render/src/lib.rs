//! Ember render - the progressive tiled path tracer.
//!
//! This crate provides:
//!
//! - **Render context**: node registration, pre-render lifecycle, the
//!   iteration loop
//! - **Tile scheduler**: worker pool over rendezvous channels with a
//!   running-mean accumulator
//! - **Path integrator**: fixed-depth estimator with next-event
//!   estimation
//! - **Boundaries**: preview window trait, tonemap, pinhole camera

mod context;
mod integrator;
mod pinhole;
mod preview;
mod tiles;
mod worker;

pub use context::RenderContext;
pub use integrator::MAX_DEPTH;
pub use pinhole::PinholeCamera;
pub use preview::{tonemap, PreviewWindow};
pub use tiles::{generate_tiles, Tile, TileResult, TILE_SIZE};
pub use worker::RenderStats;

/// Re-export the core types callers wire scenes with.
pub use ember_core::{
    Camera, Emitter, Globals, Light, Material, Matte, PolyMesh, Primitive, QuadLight, Scene,
    SceneNode, SpherePrim, TriMesh,
};
