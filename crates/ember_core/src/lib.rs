//! Ember core - geometry, acceleration structures, and shading contracts.
//!
//! This crate provides:
//!
//! - **Spatial index**: the four-wide BVH (`qbvh`) used at both the
//!   scene level and inside mesh primitives
//! - **Primitives**: triangle mesh, polygon mesh, analytic sphere
//! - **Scene**: the primitive/light store and its ray entry points
//! - **Contracts**: `Material`, `Light`, `Camera`, texture sampling:
//!   the narrow interfaces the path integrator consumes

pub mod array;
pub mod camera;
pub mod error;
pub mod globals;
pub mod light;
pub mod material;
pub mod mesh;
pub mod node;
pub mod polymesh;
pub mod primitive;
pub mod qbvh;
pub mod raydata;
pub mod scene;
pub mod shader;
pub mod spectrum;
pub mod sphere;
pub mod stats;
pub mod surface;
pub mod texture;

pub use array::{MatrixArray, PointArray, Vec2Array, Vec3Array};
pub use camera::Camera;
pub use error::{RenderError, RenderResult};
pub use globals::Globals;
pub use light::{Light, QuadLight};
pub use material::{gen_f32, BumpMap, Emitter, Material, MaterialSet, Matte};
pub use mesh::{FaceGeom, MeshLoader, TriMesh};
pub use node::SceneNode;
pub use polymesh::PolyMesh;
pub use primitive::Primitive;
pub use raydata::{HitResult, RayData, StackEntry, TraversalSupport, RAY_CAMERA, RAY_SHADOW};
pub use scene::Scene;
pub use shader::ShaderGlobals;
pub use spectrum::{Spectrum, LAMBDA_MAX, LAMBDA_MIN};
pub use sphere::SpherePrim;
pub use surface::SurfacePoint;
pub use texture::{Texture, TextureCache};

/// Re-export the math crate's types.
pub use ember_math::{Aabb, Ray, Vec2, Vec3};
