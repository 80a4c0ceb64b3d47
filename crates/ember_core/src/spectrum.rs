//! Single-wavelength radiance samples.
//!
//! Each path is evaluated at one wavelength drawn uniformly from
//! [`LAMBDA_MIN`, `LAMBDA_MAX`); the sample carries that wavelength as a
//! tag alongside its RGB payload so materials can shade spectrally if
//! they choose to.

use ember_math::Vec3;

/// Lower bound of the sampled wavelength range, in nanometres.
pub const LAMBDA_MIN: f32 = 450.0;
/// Upper bound of the sampled wavelength range, in nanometres.
pub const LAMBDA_MAX: f32 = 720.0;

/// A radiance (or reflectance) sample at a single wavelength.
#[derive(Debug, Clone, Copy)]
pub struct Spectrum {
    pub lambda: f32,
    c: Vec3,
}

impl Spectrum {
    /// A zero-valued sample at wavelength `lambda`.
    pub fn new(lambda: f32) -> Self {
        Self {
            lambda,
            c: Vec3::ZERO,
        }
    }

    /// A sample initialized from an RGB triple.
    pub fn from_rgb(lambda: f32, r: f32, g: f32, b: f32) -> Self {
        Self {
            lambda,
            c: Vec3::new(r, g, b),
        }
    }

    pub fn set_rgb(&mut self, r: f32, g: f32, b: f32) {
        self.c = Vec3::new(r, g, b);
    }

    /// Accumulate another sample.
    pub fn add(&mut self, other: &Spectrum) {
        self.c += other.c;
    }

    /// Modulate by another sample (componentwise).
    pub fn mul(&mut self, other: &Spectrum) {
        self.c *= other.c;
    }

    /// Scale by a scalar factor.
    pub fn scale(&mut self, s: f32) {
        self.c *= s;
    }

    /// Resolve to an RGB triple.
    pub fn to_rgb(&self) -> (f32, f32, f32) {
        (self.c.x, self.c.y, self.c.z)
    }
}
