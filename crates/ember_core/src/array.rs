//! Motion-key element arrays.
//!
//! These wrap arrays of elements (points, UVs, matrices) sampled at one
//! or more motion keys. Storage is a flat array of length
//! `motion_keys * elems_per_key`. The integrator currently evaluates at
//! a single time, so only key 0 is read, but loaders may fill all keys.

use ember_math::{Mat4, Vec2, Vec3};

#[derive(Debug, Clone, Default)]
pub struct PointArray {
    pub motion_keys: usize,
    pub elems_per_key: usize,
    pub elems: Vec<Vec3>,
}

impl PointArray {
    /// A single-key array over `elems`.
    pub fn from_slice(elems: &[Vec3]) -> Self {
        Self {
            motion_keys: 1,
            elems_per_key: elems.len(),
            elems: elems.to_vec(),
        }
    }

    /// The elements of motion key `key`.
    pub fn key(&self, key: usize) -> &[Vec3] {
        let base = key * self.elems_per_key;
        &self.elems[base..base + self.elems_per_key]
    }
}

#[derive(Debug, Clone, Default)]
pub struct Vec2Array {
    pub motion_keys: usize,
    pub elems_per_key: usize,
    pub elems: Vec<Vec2>,
}

impl Vec2Array {
    pub fn from_slice(elems: &[Vec2]) -> Self {
        Self {
            motion_keys: 1,
            elems_per_key: elems.len(),
            elems: elems.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Vec3Array {
    pub motion_keys: usize,
    pub elems_per_key: usize,
    pub elems: Vec<Vec3>,
}

impl Vec3Array {
    pub fn from_slice(elems: &[Vec3]) -> Self {
        Self {
            motion_keys: 1,
            elems_per_key: elems.len(),
            elems: elems.to_vec(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MatrixArray {
    pub motion_keys: usize,
    pub elems: Vec<Mat4>,
}

impl MatrixArray {
    pub fn from_matrix(m: Mat4) -> Self {
        Self {
            motion_keys: 1,
            elems: vec![m],
        }
    }

    /// Matrix at motion key `key`, or identity if the array is empty.
    pub fn key(&self, key: usize) -> Mat4 {
        self.elems.get(key).copied().unwrap_or(Mat4::IDENTITY)
    }
}
