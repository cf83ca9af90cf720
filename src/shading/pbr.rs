//! Cook-Torrance PBR shading with optional image-based lighting.

use std::f64::consts::PI;

use glam::{DVec3, DVec4};

use crate::material::PbrMaterial;
use crate::shading::{Fragment, LightEnvironment};

/// GGX normal distribution with the Disney roughness remap (alpha = r^2).
fn distribution_ggx(n_dot_h: f64, roughness: f64) -> f64 {
    let a = roughness * roughness;
    let a2 = a * a;
    let q = n_dot_h * n_dot_h * (a2 - 1.0) + 1.0;
    a2 / (PI * q * q)
}

fn geometry_schlick_ggx(n_dot_x: f64, k: f64) -> f64 {
    n_dot_x / (n_dot_x * (1.0 - k) + k)
}

/// Smith shadowing/masking with the direct-lighting remap
/// k = (r + 1)^2 / 8.
fn geometry_smith_direct(n_dot_v: f64, n_dot_l: f64, roughness: f64) -> f64 {
    let k = (roughness + 1.0) * (roughness + 1.0) / 8.0;
    geometry_schlick_ggx(n_dot_v, k) * geometry_schlick_ggx(n_dot_l, k)
}

fn fresnel_schlick(cos_theta: f64, f0: DVec3) -> DVec3 {
    f0 + (DVec3::ONE - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

/// Roughness-aware Schlick used by the indirect terms.
fn fresnel_schlick_roughness(
    cos_theta: f64,
    f0: DVec3,
    roughness: f64,
) -> DVec3 {
    let max_reflectance = DVec3::splat(1.0 - roughness).max(f0);
    f0 + (max_reflectance - f0) * (1.0 - cos_theta).clamp(0.0, 1.0).powi(5)
}

pub(crate) fn shade_pbr(
    material: &PbrMaterial,
    fragment: &Fragment,
    lights: &LightEnvironment<'_>,
) -> DVec4 {
    let uv = fragment.tex_coord;

    let mut albedo = if material.albedo_from_vertex {
        fragment.color.truncate()
    } else {
        material.albedo
    };
    if let Some(map) = &material.albedo_map {
        albedo *= map.sample_rgba(uv).truncate();
    }
    let mut roughness = material.roughness;
    if let Some(map) = &material.roughness_map {
        roughness *= map.sample_grayscale(uv);
    }
    let mut metalness = material.metalness;
    if let Some(map) = &material.metalness_map {
        metalness *= map.sample_grayscale(uv);
    }
    let mut ambient_occlusion = material.ambient_occlusion;
    if let Some(map) = &material.ambient_occlusion_map {
        ambient_occlusion *= map.sample_grayscale(uv);
    }
    roughness = roughness.clamp(0.0, 1.0);
    metalness = metalness.clamp(0.0, 1.0);

    let n = fragment.normal;
    let l = -lights.light_direction;
    let v = (lights.camera_position - fragment.world_position)
        .normalize_or_zero();
    let n_dot_v = n.dot(v).max(0.0);
    let n_dot_l = n.dot(l).max(0.0);

    let f0 = DVec3::splat(0.04).lerp(albedo, metalness);

    // Direct Cook-Torrance term, unit white light radiance.
    let mut color = DVec3::ZERO;
    if n_dot_l > 0.0 && n_dot_v > 0.0 {
        let h = (v + l).normalize_or_zero();
        let n_dot_h = n.dot(h).max(0.0);
        let h_dot_v = h.dot(v).max(0.0);

        let d = distribution_ggx(n_dot_h, roughness);
        let g = geometry_smith_direct(n_dot_v, n_dot_l, roughness);
        let f = fresnel_schlick(h_dot_v, f0);

        let specular = d * g * f / (4.0 * n_dot_v * n_dot_l + 1e-4);
        let k_diffuse = (DVec3::ONE - f) * (1.0 - metalness);

        color += (k_diffuse * albedo / PI + specular) * n_dot_l;
    }

    // Indirect image-based term.
    if let Some(ibl) = lights.ibl {
        let f_rough = fresnel_schlick_roughness(n_dot_v, f0, roughness);
        let k_diffuse = (DVec3::ONE - f_rough) * (1.0 - metalness);

        let irr = ibl.irradiance.sample(n);
        let irradiance = DVec3::new(irr[0], irr[1], irr[2]);
        let diffuse = irradiance * k_diffuse * albedo / PI;

        let reflection = (-v).reflect(n);
        let level = (roughness * (ibl.prefilter_levels() - 1) as f64)
            .round() as usize;
        let pre = ibl.prefilter.sample_level(reflection, level);
        let prefiltered = DVec3::new(pre[0], pre[1], pre[2]);

        let brdf = ibl.brdf_lut.texel_uv(n_dot_v, roughness);
        let specular =
            prefiltered * (f_rough * brdf[0] + DVec3::splat(brdf[1]));

        color += diffuse + specular;
    }

    color *= ambient_occlusion;

    // HDR to LDR: Reinhard tone map, then gamma encode.
    color = color / (color + DVec3::ONE);
    color = DVec3::new(
        color.x.powf(1.0 / 2.2),
        color.y.powf(1.0 / 2.2),
        color.z.powf(1.0 / 2.2),
    );
    color.extend(1.0)
}
