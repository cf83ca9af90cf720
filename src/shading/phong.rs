//! The Phong illumination model.

use glam::{DVec3, DVec4};

use crate::material::PhongMaterial;
use crate::shading::{Fragment, LightEnvironment};

pub(crate) fn shade_phong(
    material: &PhongMaterial,
    fragment: &Fragment,
    lights: &LightEnvironment<'_>,
) -> DVec4 {
    let n = fragment.normal;
    let l = -lights.light_direction;
    let v = (lights.camera_position - fragment.world_position)
        .normalize_or_zero();
    let r = (-l).reflect(n);

    let n_dot_l = n.dot(l).clamp(0.0, 1.0);
    let v_dot_r = v.dot(r).clamp(0.0, 1.0);

    let mut ambient = material.ambient;
    if let Some(map) = &material.ambient_map {
        ambient *= map.sample_rgba(fragment.tex_coord).truncate();
    }

    let mut diffuse = if material.diffuse_from_vertex {
        fragment.color.truncate()
    } else {
        material.diffuse
    };
    if let Some(map) = &material.diffuse_map {
        diffuse *= map.sample_rgba(fragment.tex_coord).truncate();
    }

    let mut specular = material.specular;
    if let Some(map) = &material.specular_map {
        specular *= map.sample_rgba(fragment.tex_coord).truncate();
    }
    let mut specular_power = material.specular_power;
    if let Some(map) = &material.specular_power_map {
        specular_power *= map.sample_grayscale(fragment.tex_coord);
    }

    let color = ambient
        + diffuse * n_dot_l
        + specular * v_dot_r.powf(specular_power);
    color.extend(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::DVec2;

    fn fragment(normal: DVec3) -> Fragment {
        Fragment {
            world_position: DVec3::ZERO,
            normal,
            tex_coord: DVec2::ZERO,
            color: DVec4::new(0.25, 0.5, 0.75, 1.0),
        }
    }

    fn head_on_light() -> LightEnvironment<'static> {
        LightEnvironment {
            light_direction: DVec3::new(0.0, 0.0, -1.0),
            camera_position: DVec3::new(0.0, 0.0, 5.0),
            ibl: None,
        }
    }

    #[test]
    fn head_on_diffuse_is_full_strength() {
        let material = PhongMaterial {
            ambient: DVec3::ZERO,
            diffuse: DVec3::ONE,
            specular: DVec3::ZERO,
            ..Default::default()
        };
        let c = shade_phong(&material, &fragment(DVec3::Z), &head_on_light());
        assert!((c.truncate() - DVec3::ONE).length() < 1e-12);
        assert_eq!(c.w, 1.0);
    }

    #[test]
    fn grazing_diffuse_is_zero() {
        let material = PhongMaterial {
            ambient: DVec3::ZERO,
            diffuse: DVec3::ONE,
            specular: DVec3::ZERO,
            ..Default::default()
        };
        let c = shade_phong(&material, &fragment(DVec3::X), &head_on_light());
        assert_eq!(c.truncate(), DVec3::ZERO);
    }

    #[test]
    fn vertex_color_feeds_diffuse_when_enabled() {
        let material = PhongMaterial {
            diffuse_from_vertex: true,
            ambient: DVec3::ZERO,
            diffuse: DVec3::ONE,
            specular: DVec3::ZERO,
            ..Default::default()
        };
        let c = shade_phong(&material, &fragment(DVec3::Z), &head_on_light());
        assert!((c.truncate() - DVec3::new(0.25, 0.5, 0.75)).length() < 1e-12);
    }

    #[test]
    fn mirror_alignment_maximizes_specular() {
        // Camera along +Z, light along -Z, normal +Z: the reflection of
        // the incoming light lines up with the view direction exactly.
        let material = PhongMaterial {
            ambient: DVec3::ZERO,
            diffuse: DVec3::ZERO,
            specular: DVec3::splat(0.5),
            specular_power: 32.0,
            ..Default::default()
        };
        let c = shade_phong(&material, &fragment(DVec3::Z), &head_on_light());
        assert!((c.truncate() - DVec3::splat(0.5)).length() < 1e-9);
    }

    #[test]
    fn backlit_surface_keeps_only_ambient() {
        let material = PhongMaterial {
            ambient: DVec3::splat(0.1),
            diffuse: DVec3::ONE,
            specular: DVec3::ZERO,
            ..Default::default()
        };
        let c = shade_phong(&material, &fragment(-DVec3::Z), &head_on_light());
        assert!((c.truncate() - DVec3::splat(0.1)).length() < 1e-9);
    }
}
