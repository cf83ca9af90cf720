//! Per-pixel shading evaluators.

mod phong;
mod pbr;

use glam::{DVec2, DVec3, DVec4};

use crate::ibl::IblTextures;
use crate::material::MaterialModel;

/// Interpolated per-pixel inputs handed to an evaluator.
pub struct Fragment {
    /// World-space position.
    pub world_position: DVec3,
    /// Unit world-space normal (after normal mapping, if any).
    pub normal: DVec3,
    /// Texture coordinate.
    pub tex_coord: DVec2,
    /// Interpolated vertex color.
    pub color: DVec4,
}

/// The lighting context shared by every fragment of a draw call.
pub struct LightEnvironment<'a> {
    /// Unit direction the light travels.
    pub light_direction: DVec3,
    /// World-space camera position.
    pub camera_position: DVec3,
    /// Precomputed image-based-lighting textures, if attached.
    pub ibl: Option<&'a IblTextures>,
}

/// Evaluate the material's illumination model for one fragment.
pub fn shade(
    model: &MaterialModel,
    fragment: &Fragment,
    lights: &LightEnvironment<'_>,
) -> DVec4 {
    match model {
        MaterialModel::Phong(phong) => {
            phong::shade_phong(phong, fragment, lights)
        }
        MaterialModel::Pbr(pbr) => pbr::shade_pbr(pbr, fragment, lights),
    }
}
