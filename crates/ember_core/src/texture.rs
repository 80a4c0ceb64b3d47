//! Texture loading and sampling for bump/albedo maps.
//!
//! Provides a small cache that loads images from disk on first use and
//! answers the `sample_rgb` contract. Render-time texture failures are
//! best-effort: they are logged and a fallback value is returned, the
//! render continues.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

/// Errors that can occur during texture loading.
#[derive(Error, Debug)]
pub enum TextureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image decoding error: {0}")]
    Image(#[from] image::ImageError),
}

pub type TextureResult<T> = Result<T, TextureError>;

/// A loaded texture in linear RGB float format.
#[derive(Clone, Debug)]
pub struct Texture {
    pub width: u32,
    pub height: u32,
    /// `[R, G, B]` per pixel, row-major.
    pub pixels: Vec<[f32; 3]>,
}

impl Texture {
    /// A 1x1 solid texture, used as the fallback for failed loads.
    pub fn solid(rgb: [f32; 3]) -> Self {
        Self {
            width: 1,
            height: 1,
            pixels: vec![rgb],
        }
    }

    fn load(path: &str) -> TextureResult<Self> {
        let img = image::open(path)?.to_rgb32f();
        let (width, height) = (img.width(), img.height());
        let pixels = img.pixels().map(|p| p.0).collect();
        Ok(Self {
            width,
            height,
            pixels,
        })
    }

    fn pixel(&self, x: u32, y: u32) -> [f32; 3] {
        self.pixels[(y * self.width + x) as usize]
    }

    /// Bilinear sample with wrapping UVs; (0, 0) is bottom-left.
    pub fn sample(&self, u: f32, v: f32) -> [f32; 3] {
        let u = u.rem_euclid(1.0);
        let v = v.rem_euclid(1.0);

        let x = u * (self.width as f32 - 1.0);
        let y = (1.0 - v) * (self.height as f32 - 1.0);

        let x0 = x.floor() as u32;
        let y0 = y.floor() as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);
        let fx = x.fract();
        let fy = y.fract();

        let p00 = self.pixel(x0, y0);
        let p10 = self.pixel(x1, y0);
        let p01 = self.pixel(x0, y1);
        let p11 = self.pixel(x1, y1);

        let mut out = [0.0f32; 3];
        for c in 0..3 {
            let top = p00[c] * (1.0 - fx) + p10[c] * fx;
            let bottom = p01[c] * (1.0 - fx) + p11[c] * fx;
            out[c] = top * (1.0 - fy) + bottom * fy;
        }
        out
    }
}

/// Texture cache keyed by filename. Safe to share between workers.
#[derive(Default)]
pub struct TextureCache {
    textures: RwLock<HashMap<String, Arc<Texture>>>,
}

impl TextureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sample the named texture at (u, v). `du`/`dv` are the footprint
    /// hints of the lookup (unused by the bilinear filter). A failed
    /// load is logged once and resolved to mid-grey from then on.
    pub fn sample_rgb(&self, filename: &str, u: f32, v: f32, _du: f32, _dv: f32) -> [f32; 3] {
        self.get_or_load(filename).sample(u, v)
    }

    fn get_or_load(&self, filename: &str) -> Arc<Texture> {
        if let Some(tex) = self.textures.read().ok().and_then(|m| m.get(filename).cloned()) {
            return tex;
        }

        let tex = match Texture::load(filename) {
            Ok(t) => Arc::new(t),
            Err(err) => {
                log::warn!("texture `{filename}` failed to load: {err}");
                Arc::new(Texture::solid([0.5, 0.5, 0.5]))
            }
        };

        if let Ok(mut map) = self.textures.write() {
            map.entry(filename.to_string()).or_insert_with(|| tex.clone());
        }
        tex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_solid_sample() {
        let tex = Texture::solid([0.25, 0.5, 0.75]);
        assert_eq!(tex.sample(0.3, 0.9), [0.25, 0.5, 0.75]);
    }

    #[test]
    fn test_bilinear_interpolates() {
        let tex = Texture {
            width: 2,
            height: 1,
            pixels: vec![[0.0, 0.0, 0.0], [1.0, 1.0, 1.0]],
        };
        let mid = tex.sample(0.5, 0.5);
        assert!((mid[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_missing_file_falls_back() {
        let cache = TextureCache::new();
        let rgb = cache.sample_rgb("/nonexistent/ember-test.png", 0.5, 0.5, 1.0, 1.0);
        assert_eq!(rgb, [0.5, 0.5, 0.5]);
    }
}
