//! Diffuse irradiance convolution of an environment cubemap.

use std::f64::consts::PI;

use glam::DVec3;

use crate::ibl::{cube_pass, CancelToken};
use crate::texture::mapping::CubeFace;
use crate::texture::TextureCube;

/// Angular step of the hemisphere walk, radians, for both latitude and
/// longitude.
const SAMPLE_DELTA: f64 = 0.025;

/// Convolve the background into an irradiance cubemap of the given face
/// size.
///
/// Every output texel integrates the background over the hemisphere around
/// its direction, cosine-weighted, so that a constant environment of L
/// yields pi * L everywhere. Returns `None` when cancelled.
pub(crate) fn irradiance_cubemap(
    background: &TextureCube<f64, 4>,
    size: usize,
    cancel: &CancelToken,
) -> Option<TextureCube<f64, 4>> {
    let faces = cube_pass::render_cube_faces(size, cancel, |p| {
        let normal = p.normalize();

        // Local tangent frame around the normal; the pole guard keeps the
        // frame well-defined when the normal runs along +Y or -Y.
        let up = if normal.y.abs() < 0.999 {
            DVec3::Y
        } else {
            DVec3::X
        };
        let right = up.cross(normal).normalize();
        let up = normal.cross(right);

        let mut irradiance = DVec3::ZERO;
        let mut weight_sum = 0.0;

        let mut phi = 0.0;
        while phi < 2.0 * PI {
            let mut theta = 0.0;
            while theta < 0.5 * PI {
                // spherical to cartesian, in tangent space
                let tangent_sample = DVec3::new(
                    theta.sin() * phi.cos(),
                    theta.sin() * phi.sin(),
                    theta.cos(),
                );
                // tangent space to world
                let sample_dir = right * tangent_sample.x
                    + up * tangent_sample.y
                    + normal * tangent_sample.z;

                let texel = background.sample(sample_dir);
                let weight = theta.cos() * theta.sin();
                irradiance +=
                    DVec3::new(texel[0], texel[1], texel[2]) * weight;
                weight_sum += weight;

                theta += SAMPLE_DELTA;
            }
            phi += SAMPLE_DELTA;
        }

        let irradiance = irradiance * PI / weight_sum;
        [irradiance.x, irradiance.y, irradiance.z, 1.0]
    })?;

    let mut cube = TextureCube::new(size, size);
    for (i, face) in faces.into_iter().enumerate() {
        if let Some(f) = CubeFace::from_index(i) {
            let _ = cube.set_face(f, face);
        }
    }
    Some(cube)
}
