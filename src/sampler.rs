//! Reading material maps: filtered, wrapped, optionally gamma-linearized
//! access to 8-bit textures by normalized coordinates.

use glam::{DVec2, DVec4};

use crate::texture::Texture2D;

/// Texel filtering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Filter {
    /// Nearest texel.
    #[default]
    Nearest,
    /// 2x2 bilinear weighted average.
    Linear,
}

/// Out-of-range coordinate handling, applied after the v flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Wrap {
    /// Wrap into [0, 1) with positive fmod.
    #[default]
    Repeat,
    /// Saturate to [0, 1].
    ClampToEdge,
}

/// A read head over an 8-bit texture map.
///
/// Samplers hold their backing image immutably for reads, so they can be
/// shared freely across parallel pixel work. Texture coordinates follow the
/// source convention of v = 0 at the bottom: v is flipped before wrapping.
#[derive(Debug, Clone, PartialEq)]
pub struct Sampler<const C: usize> {
    map: Texture2D<u8, C>,
    filter: Filter,
    wrap: Wrap,
    linearize_gamma: bool,
}

/// Sampler over a four-channel color map.
pub type RgbaSampler = Sampler<4>;
/// Sampler over a single-channel map (roughness, metalness, opacity...).
pub type GraySampler = Sampler<1>;

impl<const C: usize> Sampler<C> {
    /// Wrap a texture map with default settings (nearest, repeat, no gamma
    /// linearization).
    pub fn new(map: Texture2D<u8, C>) -> Self {
        Self {
            map,
            filter: Filter::Nearest,
            wrap: Wrap::Repeat,
            linearize_gamma: false,
        }
    }

    /// Set the filtering mode.
    #[must_use]
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filter = filter;
        self
    }

    /// Set the wrapping mode.
    #[must_use]
    pub fn with_wrap(mut self, wrap: Wrap) -> Self {
        self.wrap = wrap;
        self
    }

    /// Enable sRGB-to-linear conversion: fetched values are raised to the
    /// 2.2 power componentwise.
    #[must_use]
    pub fn with_linearize_gamma(mut self, linearize: bool) -> Self {
        self.linearize_gamma = linearize;
        self
    }

    /// The backing map.
    pub fn map(&self) -> &Texture2D<u8, C> {
        &self.map
    }

    /// Whether the backing map holds no pixels.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    fn wrap_coord(&self, uv: DVec2) -> DVec2 {
        // Repeat leaves in-range coordinates untouched so that exactly 1.0
        // still addresses the edge texel instead of wrapping to 0.
        let repeat = |x: f64| {
            if (0.0..=1.0).contains(&x) {
                x
            } else {
                x.rem_euclid(1.0)
            }
        };
        match self.wrap {
            Wrap::Repeat => DVec2::new(repeat(uv.x), repeat(uv.y)),
            Wrap::ClampToEdge => uv.clamp(DVec2::ZERO, DVec2::ONE),
        }
    }

    /// Flip v, wrap, and split into base texel plus fractional offsets.
    fn resolve(&self, uv: DVec2) -> (i32, i32, f64, f64) {
        let uv = self.wrap_coord(DVec2::new(uv.x, 1.0 - uv.y));
        let fx = uv.x * (self.map.width().saturating_sub(1)) as f64;
        let fy = uv.y * (self.map.height().saturating_sub(1)) as f64;
        let px = fx.floor();
        let py = fy.floor();
        (px as i32, py as i32, fx - px, fy - py)
    }

    /// Fetch one texel in unit range with gamma linearization applied.
    fn fetch(&self, x: i32, y: i32) -> [f64; C] {
        let raw = self.map.texel(x, y);
        let mut out = [0.0; C];
        for (o, v) in out.iter_mut().zip(raw) {
            let mut value = f64::from(v) / 255.0;
            if self.linearize_gamma {
                value = value.powf(2.2);
            }
            *o = value;
        }
        out
    }

    fn sample(&self, uv: DVec2) -> [f64; C] {
        let (px, py, fx, fy) = self.resolve(uv);
        match self.filter {
            Filter::Nearest => self.fetch(px, py),
            Filter::Linear => {
                let c00 = self.fetch(px, py);
                let c10 = self.fetch(px + 1, py);
                let c01 = self.fetch(px, py + 1);
                let c11 = self.fetch(px + 1, py + 1);
                let mut out = [0.0; C];
                for i in 0..C {
                    let a = c00[i] * (1.0 - fx) + c10[i] * fx;
                    let b = c01[i] * (1.0 - fx) + c11[i] * fx;
                    out[i] = a * (1.0 - fy) + b * fy;
                }
                out
            }
        }
    }
}

impl Sampler<4> {
    /// Load a color map from an image file.
    pub fn from_path(
        path: &std::path::Path,
    ) -> Result<Self, crate::error::SoftrasError> {
        let img = image::open(path)
            .map_err(|e| crate::error::SoftrasError::Image(e.to_string()))?
            .to_rgba8();
        Ok(Self::new(Texture2D::from_rgba_image(&img)))
    }

    /// Sample a color in [0, 1] per channel.
    pub fn sample_rgba(&self, uv: DVec2) -> DVec4 {
        let c = self.sample(uv);
        DVec4::new(c[0], c[1], c[2], c[3])
    }

    /// Overwrite the texel nearest to `uv` with a color in [0, 1].
    pub fn write_rgba(&mut self, uv: DVec2, color: DVec4) {
        let (px, py, _, _) = self.resolve(uv);
        let c = color.clamp(DVec4::ZERO, DVec4::ONE) * 255.0;
        let _ = self.map.set_texel(
            px,
            py,
            [
                c.x.round() as u8,
                c.y.round() as u8,
                c.z.round() as u8,
                c.w.round() as u8,
            ],
        );
    }
}

impl Sampler<1> {
    /// Load a grayscale map from an image file; color inputs are
    /// luma-converted.
    pub fn from_path(
        path: &std::path::Path,
    ) -> Result<Self, crate::error::SoftrasError> {
        let img = image::open(path)
            .map_err(|e| crate::error::SoftrasError::Image(e.to_string()))?
            .to_luma8();
        Ok(Self::new(Texture2D::from_gray_image(&img)))
    }

    /// Sample a scalar in [0, 1].
    pub fn sample_grayscale(&self, uv: DVec2) -> f64 {
        self.sample(uv)[0]
    }
}
