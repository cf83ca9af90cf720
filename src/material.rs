//! Surface materials: the Phong and PBR parameter bundles.

use glam::DVec3;

use crate::sampler::{GraySampler, RgbaSampler};

/// Parameters of the Phong illumination model.
///
/// Each color constant is componentwise multiplied by its sampler's value
/// when that sampler is set.
#[derive(Debug, Clone, PartialEq)]
pub struct PhongMaterial {
    /// Take the diffuse base color from the interpolated vertex color
    /// instead of [`PhongMaterial::diffuse`].
    pub diffuse_from_vertex: bool,
    /// Ambient reflectance.
    pub ambient: DVec3,
    /// Diffuse reflectance.
    pub diffuse: DVec3,
    /// Specular reflectance.
    pub specular: DVec3,
    /// Specular exponent.
    pub specular_power: f64,
    /// Optional ambient map.
    pub ambient_map: Option<RgbaSampler>,
    /// Optional diffuse map.
    pub diffuse_map: Option<RgbaSampler>,
    /// Optional specular map.
    pub specular_map: Option<RgbaSampler>,
    /// Optional specular-exponent map, scaling `specular_power`.
    pub specular_power_map: Option<GraySampler>,
}

impl Default for PhongMaterial {
    fn default() -> Self {
        Self {
            diffuse_from_vertex: false,
            ambient: DVec3::splat(0.05),
            diffuse: DVec3::ZERO,
            specular: DVec3::splat(0.3),
            specular_power: 64.0,
            ambient_map: None,
            diffuse_map: None,
            specular_map: None,
            specular_power_map: None,
        }
    }
}

/// Parameters of the Cook-Torrance / image-based-lighting model.
///
/// Scalar parameters live in [0, 1] and are multiplied by their sampler's
/// value when that sampler is set. The three precomputed IBL textures are
/// deliberately not referenced here: the rasterizer captures them once as a
/// bundle shared by every PBR material in the scene.
#[derive(Debug, Clone, PartialEq)]
pub struct PbrMaterial {
    /// Take the albedo from the interpolated vertex color instead of
    /// [`PbrMaterial::albedo`].
    pub albedo_from_vertex: bool,
    /// Base color.
    pub albedo: DVec3,
    /// Microfacet roughness.
    pub roughness: f64,
    /// Metalness: 0 dielectric, 1 metal.
    pub metalness: f64,
    /// Ambient-occlusion factor.
    pub ambient_occlusion: f64,
    /// Optional albedo map.
    pub albedo_map: Option<RgbaSampler>,
    /// Optional roughness map.
    pub roughness_map: Option<GraySampler>,
    /// Optional metalness map.
    pub metalness_map: Option<GraySampler>,
    /// Optional ambient-occlusion map.
    pub ambient_occlusion_map: Option<GraySampler>,
}

impl Default for PbrMaterial {
    fn default() -> Self {
        Self {
            albedo_from_vertex: false,
            albedo: DVec3::splat(0.05),
            roughness: 0.5,
            metalness: 0.5,
            ambient_occlusion: 1.0,
            albedo_map: None,
            roughness_map: None,
            metalness_map: None,
            ambient_occlusion_map: None,
        }
    }
}

/// The illumination model of a material.
#[derive(Debug, Clone, PartialEq)]
pub enum MaterialModel {
    /// Phong shading.
    Phong(PhongMaterial),
    /// Cook-Torrance PBR shading.
    Pbr(PbrMaterial),
}

/// A surface material: an illumination model plus the maps shared by both
/// models.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    /// The illumination model and its parameters.
    pub model: MaterialModel,
    /// Optional tangent-space normal map.
    pub normal_map: Option<RgbaSampler>,
    /// Optional height map.
    pub height_map: Option<GraySampler>,
    /// Optional opacity map.
    pub opacity_map: Option<GraySampler>,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            model: MaterialModel::Phong(PhongMaterial::default()),
            normal_map: None,
            height_map: None,
            opacity_map: None,
        }
    }
}

impl Material {
    /// A Phong material with the given parameters and no maps.
    pub fn phong(phong: PhongMaterial) -> Self {
        Self {
            model: MaterialModel::Phong(phong),
            ..Default::default()
        }
    }

    /// A PBR material with the given parameters and no maps.
    pub fn pbr(pbr: PbrMaterial) -> Self {
        Self {
            model: MaterialModel::Pbr(pbr),
            ..Default::default()
        }
    }
}
