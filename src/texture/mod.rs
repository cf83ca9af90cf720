//! Pixel storage: typed 2D textures, mipmap chains, cubemaps, and the
//! direction <-> cube-face coordinate mapping.

pub mod mapping;
mod mipmap;
mod serialize;
mod texture2d;

mod cube;

pub use cube::TextureCube;
pub use mipmap::MIN_MIPMAP_SIZE;
pub use serialize::TEXTURE_MAGIC;
pub use texture2d::Texture2D;
