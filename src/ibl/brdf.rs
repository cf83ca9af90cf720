//! The split-sum BRDF integration lookup table.

use glam::DVec3;
use rayon::prelude::*;

use crate::ibl::sampling::{
    geometry_smith_ibl, hammersley, importance_sample_ggx,
};
use crate::ibl::CancelToken;
use crate::texture::Texture2D;

const SAMPLE_COUNT: u32 = 1024;

/// Integrate the environment BRDF into a two-channel `size x size` lookup:
/// u addresses n.v, v addresses roughness, and the channels hold the scale
/// and bias applied to F0 at shade time.
///
/// Texels sit on a [0, 1] corner-inclusive grid so the LUT boundary holds
/// the analytic limits (n.v = 1, roughness = 0 integrates to exactly
/// (1, 0)). Rows run in parallel; cancellation is checked at row
/// boundaries and yields `None` with the partial output discarded.
pub(crate) fn brdf_integration_lut(
    size: usize,
    cancel: &CancelToken,
) -> Option<Texture2D<f64, 2>> {
    let mut tex: Texture2D<f64, 2> = Texture2D::new(size, size);
    if size == 0 {
        return Some(tex);
    }
    let step = 1.0 / (size.saturating_sub(1).max(1)) as f64;

    tex.pixels_mut()
        .par_chunks_mut(size * 2)
        .enumerate()
        .for_each(|(y, row)| {
            if cancel.is_cancelled() {
                return;
            }
            let roughness = y as f64 * step;
            for x in 0..size {
                let n_dot_v = x as f64 * step;
                let (scale, bias) = integrate_brdf(n_dot_v, roughness);
                row[x * 2] = scale;
                row[x * 2 + 1] = bias;
            }
        });

    if cancel.is_cancelled() {
        None
    } else {
        Some(tex)
    }
}

fn integrate_brdf(n_dot_v: f64, roughness: f64) -> (f64, f64) {
    if n_dot_v <= 0.0 {
        return (0.0, 0.0);
    }

    let v = DVec3::new((1.0 - n_dot_v * n_dot_v).sqrt(), 0.0, n_dot_v);
    let n = DVec3::Z;

    let mut scale = 0.0;
    let mut bias = 0.0;
    for i in 0..SAMPLE_COUNT {
        let xi = hammersley(i, SAMPLE_COUNT);
        let h = importance_sample_ggx(xi, n, roughness);
        let l = (2.0 * v.dot(h) * h - v).normalize_or_zero();

        let n_dot_l = l.z.max(0.0);
        let n_dot_h = h.z.max(0.0);
        let v_dot_h = v.dot(h).max(0.0);

        if n_dot_l > 0.0 {
            let g = geometry_smith_ibl(n_dot_v, n_dot_l, roughness);
            let g_vis = (g * v_dot_h) / (n_dot_h * n_dot_v);
            let fc = (1.0 - v_dot_h).powi(5);

            scale += (1.0 - fc) * g_vis;
            bias += fc * g_vis;
        }
    }
    (
        scale / f64::from(SAMPLE_COUNT),
        bias / f64::from(SAMPLE_COUNT),
    )
}
