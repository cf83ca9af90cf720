//! The rasterization skeleton shared by the IBL passes and the
//! equirectangular converter: render the unit NDC cube through a
//! [`CubeCamera`] so that every texel of every face receives exactly one
//! per-pixel callback carrying the reconstructed world position.

use glam::{DVec2, DVec3};
use rayon::prelude::*;

use crate::camera::CubeCamera;
use crate::ibl::CancelToken;
use crate::rasterizer::primitive::{edge_function, viewport_transform};
use crate::texture::Texture2D;

const NDC_CUBE_VERTICES: [DVec3; 8] = [
    DVec3::new(-1.0, -1.0, -1.0),
    DVec3::new(1.0, 1.0, -1.0),
    DVec3::new(1.0, -1.0, -1.0),
    DVec3::new(-1.0, 1.0, -1.0),
    DVec3::new(-1.0, -1.0, 1.0),
    DVec3::new(1.0, -1.0, 1.0),
    DVec3::new(1.0, 1.0, 1.0),
    DVec3::new(-1.0, 1.0, 1.0),
];

#[rustfmt::skip]
const NDC_CUBE_INDICES: [usize; 36] = [
    2, 1, 0,  3, 0, 1,
    6, 5, 4,  4, 7, 6,
    0, 3, 7,  7, 4, 0,
    1, 2, 6,  5, 6, 2,
    5, 2, 0,  0, 4, 5,
    1, 6, 3,  7, 3, 6,
];

/// Rasterize the cube into six `size x size` faces, invoking `shade` once
/// per texel with the interpolated (unnormalized) cube-surface position.
///
/// Faces run in parallel; cancellation is honored at face boundaries and
/// yields `None` with all partial output discarded.
pub(crate) fn render_cube_faces<F>(
    size: usize,
    cancel: &CancelToken,
    shade: F,
) -> Option<Vec<Texture2D<f64, 4>>>
where
    F: Fn(DVec3) -> [f64; 4] + Sync,
{
    if size == 0 {
        return Some(vec![Texture2D::new(0, 0); 6]);
    }
    let camera = CubeCamera::new(1.0);
    let faces: Vec<Option<Texture2D<f64, 4>>> = (0..6)
        .into_par_iter()
        .map(|face| {
            if cancel.is_cancelled() {
                return None;
            }
            log::debug!("rendering cube face {face}");
            Some(render_face(size, &camera, face, &shade))
        })
        .collect();
    faces.into_iter().collect()
}

fn render_face<F>(
    size: usize,
    camera: &CubeCamera,
    face: usize,
    shade: &F,
) -> Texture2D<f64, 4>
where
    F: Fn(DVec3) -> [f64; 4] + Sync,
{
    let matrix = camera.camera_matrix(face);
    let mut tex = Texture2D::new(size, size);

    for tri in NDC_CUBE_INDICES.chunks_exact(3) {
        let v = [
            NDC_CUBE_VERTICES[tri[0]],
            NDC_CUBE_VERTICES[tri[1]],
            NDC_CUBE_VERTICES[tri[2]],
        ];

        // Only the camera's own cube face has all three vertices strictly
        // in front; side and back triangles would fold through the origin
        // under the divide and corrupt the interpolation.
        let mut projected = [DVec3::ZERO; 3];
        let mut in_front = true;
        for (out, vertex) in projected.iter_mut().zip(v) {
            let clip = matrix * vertex.extend(1.0);
            if clip.w <= 0.0 {
                in_front = false;
                break;
            }
            *out = clip.truncate() / clip.w;
        }
        if !in_front {
            continue;
        }

        let screen: [DVec2; 3] = std::array::from_fn(|i| {
            viewport_transform(projected[i], size, size)
        });
        let area = edge_function(screen[0], screen[1], screen[2]);
        if area == 0.0 {
            continue;
        }

        let min = screen[0].min(screen[1]).min(screen[2]);
        let max = screen[0].max(screen[1]).max(screen[2]);
        let x_min = (min.x.floor().max(0.0)) as usize;
        let y_min = (min.y.floor().max(0.0)) as usize;
        let x_max = (max.x.floor().min((size - 1) as f64)) as usize;
        let y_max = (max.y.floor().min((size - 1) as f64)) as usize;

        let inv_z = [
            1.0 / projected[0].z,
            1.0 / projected[1].z,
            1.0 / projected[2].z,
        ];

        for y in y_min..=y_max {
            for x in x_min..=x_max {
                let pixel = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);

                let mut w1 = edge_function(screen[1], screen[2], pixel);
                let mut w2 = edge_function(screen[2], screen[0], pixel);
                let mut w3 = edge_function(screen[0], screen[1], pixel);
                if w1 < 0.0 || w2 < 0.0 || w3 < 0.0 {
                    continue;
                }
                let edge1 = screen[1] - screen[2];
                let edge2 = screen[2] - screen[0];
                let edge3 = screen[0] - screen[1];
                let admits = |w: f64, e: DVec2| {
                    if w == 0.0 {
                        (e.y == 0.0 && e.x < 0.0) || e.y < 0.0
                    } else {
                        w > 0.0
                    }
                };
                if !admits(w1, edge1)
                    || !admits(w2, edge2)
                    || !admits(w3, edge3)
                {
                    continue;
                }

                w1 /= area;
                w2 /= area;
                w3 /= area;

                let z = 1.0
                    / (w1 * inv_z[0] + w2 * inv_z[1] + w3 * inv_z[2]);
                let p = (v[0] * inv_z[0] * w1
                    + v[1] * inv_z[1] * w2
                    + v[2] * inv_z[2] * w3)
                    * z;

                let _ = tex.set_texel(x as i32, y as i32, shade(p));
            }
        }
    }
    tex
}
