//! Render-wide configuration.

/// The configuration boundary between the CLI/loader and the core.
///
/// Registered as a node; the last one registered wins.
#[derive(Debug, Clone)]
pub struct Globals {
    /// Output width in pixels.
    pub xres: u32,
    /// Output height in pixels.
    pub yres: u32,
    /// Worker thread count (>= 1).
    pub max_workers: usize,
    /// Show a progress bar while rendering.
    pub use_progress: bool,
    /// Base seed for the per-tile random streams. `None` draws one from
    /// the clock, which precludes reproducibility.
    pub seed: Option<u64>,
}

impl Default for Globals {
    fn default() -> Self {
        Self {
            xres: 256,
            yres: 256,
            max_workers: 5,
            use_progress: false,
            seed: None,
        }
    }
}
