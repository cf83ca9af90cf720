//! Pixel element types usable inside [`crate::texture::Texture2D`].

/// A single pixel channel element.
///
/// Implemented for `u8` (LDR color/grayscale maps, the framebuffer color
/// target) and `f64` (HDR environment data, IBL textures, the depth target).
/// The `bytemuck::Pod` bound lets the serializer treat pixel buffers as raw
/// little-endian bytes without copying.
pub trait Texel:
    bytemuck::Pod + Copy + Default + PartialEq + Send + Sync + 'static
{
    /// Whether the element is floating point. Floating-point textures are
    /// tone-mapped `c / (c + 1)` when converted to an 8-bit image.
    const IS_FLOAT: bool;

    /// Convert to the unit range. `u8` maps 0..=255 onto 0.0..=1.0; `f64`
    /// passes through unchanged (HDR values may exceed 1.0).
    fn to_unit(self) -> f64;

    /// Convert from the unit range, saturating for integer elements.
    fn from_unit(value: f64) -> Self;
}

impl Texel for u8 {
    const IS_FLOAT: bool = false;

    #[inline]
    fn to_unit(self) -> f64 {
        f64::from(self) / 255.0
    }

    #[inline]
    fn from_unit(value: f64) -> Self {
        (value.clamp(0.0, 1.0) * 255.0).round() as u8
    }
}

impl Texel for f64 {
    const IS_FLOAT: bool = true;

    #[inline]
    fn to_unit(self) -> f64 {
        self
    }

    #[inline]
    fn from_unit(value: f64) -> Self {
        value
    }
}
