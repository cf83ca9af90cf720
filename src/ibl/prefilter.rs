//! Specular prefiltering of an environment cubemap over a roughness
//! mipmap chain.

use glam::DVec3;

use crate::ibl::sampling::{hammersley, importance_sample_ggx};
use crate::ibl::{cube_pass, CancelToken, PREFILTER_MIP_COUNT};
use crate::texture::mapping::CubeFace;
use crate::texture::TextureCube;

const SAMPLE_COUNT: u32 = 1024;

/// Build the prefiltered specular radiance cubemap.
///
/// The cubemap carries a mipmap chain; levels 0..N (N capped at
/// [`PREFILTER_MIP_COUNT`]) are each re-rendered with
/// `roughness = level / (N - 1)` by GGX importance sampling, n.l-weighted,
/// over 1024 Hammersley samples. Levels past N keep their box-filtered
/// content. Returns `None` when cancelled; cancellation is checked at face
/// boundaries.
pub(crate) fn prefilter_cubemap(
    background: &TextureCube<f64, 4>,
    size: usize,
    cancel: &CancelToken,
) -> Option<TextureCube<f64, 4>> {
    let mut cube: TextureCube<f64, 4> = TextureCube::new(size, size);
    if let Err(e) = cube.generate_mipmaps() {
        log::warn!(
            "prefilter cubemap of size {size} has no mipmap chain: {e}"
        );
    }

    let levels = cube.level_count().min(PREFILTER_MIP_COUNT);
    for level in 0..levels {
        log::info!("prefiltering level {level} of {levels}");
        let roughness = if levels > 1 {
            level as f64 / (levels - 1) as f64
        } else {
            0.0
        };
        let level_size = cube.face(CubeFace::PositiveX).level(level).width();

        let faces =
            cube_pass::render_cube_faces(level_size, cancel, |p| {
                prefilter_texel(background, p, roughness)
            })?;

        for (i, face) in faces.into_iter().enumerate() {
            if let Some(f) = CubeFace::from_index(i) {
                let target = cube.face_mut(f).level_mut(level);
                target.pixels_mut().copy_from_slice(face.pixels());
            }
        }
    }
    Some(cube)
}

fn prefilter_texel(
    background: &TextureCube<f64, 4>,
    p: DVec3,
    roughness: f64,
) -> [f64; 4] {
    let n = p.normalize();
    // The isotropic approximation: reflection and view both equal the
    // normal.
    let v = n;

    let mut color = DVec3::ZERO;
    let mut total_weight = 0.0;
    for i in 0..SAMPLE_COUNT {
        let xi = hammersley(i, SAMPLE_COUNT);
        let h = importance_sample_ggx(xi, n, roughness);
        let l = (2.0 * v.dot(h) * h - v).normalize_or_zero();

        let n_dot_l = n.dot(l).max(0.0);
        if n_dot_l > 0.0 {
            let texel = background.sample(l);
            color += DVec3::new(texel[0], texel[1], texel[2]) * n_dot_l;
            total_weight += n_dot_l;
        }
    }
    if total_weight > 0.0 {
        color /= total_weight;
    }
    [color.x, color.y, color.z, 1.0]
}
