//! Render targets: an 8-bit RGBA color buffer paired with an f64 depth
//! buffer.

use crate::texture::Texture2D;

/// The rasterizer's output surface.
///
/// Clearing resets color to transparent black and depth to `+infinity`, so the
/// first fragment at any pixel always passes the strict less-than depth
/// test.
#[derive(Debug, Clone)]
pub struct Framebuffer {
    color: Texture2D<u8, 4>,
    depth: Texture2D<f64, 1>,
}

impl Framebuffer {
    /// Create a cleared framebuffer.
    pub fn new(width: usize, height: usize) -> Self {
        let mut fb = Self {
            color: Texture2D::new(width, height),
            depth: Texture2D::new(width, height),
        };
        fb.clear();
        fb
    }

    /// Reset color to (0, 0, 0, 0) and depth to `+infinity`.
    pub fn clear(&mut self) {
        self.color.clear([0, 0, 0, 0]);
        self.depth.clear([f64::INFINITY]);
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.color.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.color.height()
    }

    /// The color target.
    pub fn color(&self) -> &Texture2D<u8, 4> {
        &self.color
    }

    /// Mutable color target.
    pub fn color_mut(&mut self) -> &mut Texture2D<u8, 4> {
        &mut self.color
    }

    /// The depth target.
    pub fn depth(&self) -> &Texture2D<f64, 1> {
        &self.depth
    }

    /// Mutable depth target.
    pub fn depth_mut(&mut self) -> &mut Texture2D<f64, 1> {
        &mut self.depth
    }

    /// Mutable access to both targets at once, for code that interleaves
    /// depth tests and color writes.
    pub fn targets_mut(
        &mut self,
    ) -> (&mut Texture2D<u8, 4>, &mut Texture2D<f64, 1>) {
        (&mut self.color, &mut self.depth)
    }

    /// Produce the displayable 8-bit RGBA image of the color target.
    pub fn color_image(&self) -> image::RgbaImage {
        self.color.to_image()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_both_targets() {
        let mut fb = Framebuffer::new(4, 4);
        assert!(fb.color_mut().set_texel(1, 1, [9, 9, 9, 9]));
        assert!(fb.depth_mut().set_texel(1, 1, [0.5]));
        fb.clear();
        assert_eq!(fb.color().texel(1, 1), [0, 0, 0, 0]);
        assert_eq!(fb.depth().texel(1, 1), [f64::INFINITY]);
    }

    #[test]
    fn color_image_matches_dimensions() {
        let fb = Framebuffer::new(7, 3);
        assert_eq!(fb.color_image().dimensions(), (7, 3));
    }
}
