//! CPU software rasterizer with Phong/PBR shading and image-based
//! lighting.
//!
//! Softras renders three-dimensional scenes of textured, lit meshes into a
//! pixel buffer using the same geometry and shading contracts a modern GPU
//! pipeline provides, with every transformation, coverage test,
//! perspective-correct interpolation, depth test, and lighting evaluation
//! running in host memory.
//!
//! # Key entry points
//!
//! - [`rasterizer::Rasterizer`] - projection, coverage, depth, shading
//! - [`ibl::IblTextures`] - the three precomputed image-based-lighting
//!   textures with on-disk caching
//! - [`environment`] - HDR panorama loading and cubemap conversion
//! - [`options::RenderOptions`] - runtime configuration (TOML presets)
//!
//! # Architecture
//!
//! Scene data ([`mesh::Mesh`], [`material::Material`],
//! [`scene::Model`]) is immutable during a draw, so the pixel loops can
//! fan out across rows and cube faces. The [`texture`] module owns all
//! pixel storage, including the serialized container format the IBL cache
//! reuses across runs.

pub mod bounds;
pub mod camera;
pub mod environment;
pub mod error;
pub mod framebuffer;
pub mod ibl;
pub mod material;
pub mod mesh;
pub mod options;
pub mod rasterizer;
pub mod sampler;
pub mod scene;
pub mod shading;
pub mod texel;
pub mod texture;
