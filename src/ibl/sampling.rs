//! Low-discrepancy importance sampling shared by the prefilter and BRDF
//! integration passes.

use std::f64::consts::PI;

use glam::{DVec2, DVec3};

/// Van der Corput radical inverse by bit reversal.
pub(crate) fn radical_inverse_vdc(mut bits: u32) -> f64 {
    bits = bits.rotate_left(16);
    bits = ((bits & 0x5555_5555) << 1) | ((bits & 0xAAAA_AAAA) >> 1);
    bits = ((bits & 0x3333_3333) << 2) | ((bits & 0xCCCC_CCCC) >> 2);
    bits = ((bits & 0x0F0F_0F0F) << 4) | ((bits & 0xF0F0_F0F0) >> 4);
    bits = ((bits & 0x00FF_00FF) << 8) | ((bits & 0xFF00_FF00) >> 8);
    f64::from(bits) * 2.328_306_436_538_696_3e-10 // / 0x1_0000_0000
}

/// The i-th point of an n-point Hammersley sequence on the unit square.
pub(crate) fn hammersley(i: u32, n: u32) -> DVec2 {
    DVec2::new(f64::from(i) / f64::from(n), radical_inverse_vdc(i))
}

/// Map a unit-square sample onto the GGX lobe around `n`.
pub(crate) fn importance_sample_ggx(
    xi: DVec2,
    n: DVec3,
    roughness: f64,
) -> DVec3 {
    let a = roughness * roughness;

    let phi = 2.0 * PI * xi.x;
    let cos_theta = ((1.0 - xi.y) / (1.0 + (a * a - 1.0) * xi.y)).sqrt();
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();

    // spherical to cartesian, in tangent space
    let h = DVec3::new(
        phi.cos() * sin_theta,
        phi.sin() * sin_theta,
        cos_theta,
    );

    // tangent space to world
    let up = if n.z.abs() < 0.999 { DVec3::Z } else { DVec3::X };
    let tangent = up.cross(n).normalize();
    let bitangent = n.cross(tangent);

    (tangent * h.x + bitangent * h.y + n * h.z).normalize()
}

fn geometry_schlick_ggx_ibl(n_dot_x: f64, roughness: f64) -> f64 {
    let k = roughness * roughness / 2.0;
    n_dot_x / (n_dot_x * (1.0 - k) + k)
}

/// Smith shadowing/masking with the IBL remap k = r^2 / 2.
pub(crate) fn geometry_smith_ibl(
    n_dot_v: f64,
    n_dot_l: f64,
    roughness: f64,
) -> f64 {
    geometry_schlick_ggx_ibl(n_dot_v, roughness)
        * geometry_schlick_ggx_ibl(n_dot_l, roughness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn radical_inverse_of_small_indices() {
        assert_eq!(radical_inverse_vdc(0), 0.0);
        assert!((radical_inverse_vdc(1) - 0.5).abs() < 1e-12);
        assert!((radical_inverse_vdc(2) - 0.25).abs() < 1e-12);
        assert!((radical_inverse_vdc(3) - 0.75).abs() < 1e-12);
    }

    #[test]
    fn hammersley_points_stay_in_the_unit_square() {
        for i in 0..64 {
            let p = hammersley(i, 64);
            assert!((0.0..1.0).contains(&p.x));
            assert!((0.0..1.0).contains(&p.y));
        }
    }

    #[test]
    fn zero_roughness_samples_collapse_onto_the_normal() {
        let n = DVec3::new(0.3, -0.5, 0.8).normalize();
        for i in 0..16 {
            let h = importance_sample_ggx(hammersley(i, 16), n, 0.0);
            assert!((h - n).length() < 1e-9);
        }
    }

    #[test]
    fn rough_samples_spread_around_the_normal() {
        let n = DVec3::Z;
        let mut spread = 0.0f64;
        for i in 0..64 {
            let h = importance_sample_ggx(hammersley(i, 64), n, 1.0);
            assert!(h.dot(n) > 0.0, "sample left the hemisphere");
            spread = spread.max(1.0 - h.dot(n));
        }
        assert!(spread > 0.1, "roughness 1 should scatter the lobe");
    }
}
