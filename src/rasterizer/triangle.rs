//! Triangle rasterization: coverage, perspective-correct interpolation,
//! depth testing, and per-pixel shading dispatch.

use glam::{DMat3, DMat4, DVec2, DVec3, DVec4};
use rayon::prelude::*;

use crate::framebuffer::Framebuffer;
use crate::material::Material;
use crate::mesh::{Mesh, Vertex};
use crate::rasterizer::primitive::{
    edge_function, pack_rgba, project, viewport_transform,
};
use crate::rasterizer::NormalMode;
use crate::shading::{self, Fragment, LightEnvironment};

/// Below this many bounding-box rows a triangle is filled serially; the
/// rayon dispatch overhead dominates for slivers.
const PARALLEL_ROW_THRESHOLD: usize = 32;

/// Immutable per-draw state shared by every pixel of a triangle mesh.
pub(crate) struct TriangleDraw<'a> {
    pub camera_matrix: DMat4,
    pub model_matrix: DMat4,
    pub normal_matrix: DMat3,
    pub material: &'a Material,
    pub normal_mode: NormalMode,
    pub lights: LightEnvironment<'a>,
}

/// Vertex attributes divided by depth, ready for perspective-correct
/// interpolation.
struct Corner {
    screen: DVec2,
    z: f64,
    inv_z: f64,
    color: DVec4,
    tex_coord: DVec2,
    normal: DVec3,
    tangent: DVec3,
    bitangent: DVec3,
    world_position: DVec3,
}

pub(crate) fn rasterize_triangle_mesh(
    framebuffer: &mut Framebuffer,
    mesh: &Mesh,
    draw: &TriangleDraw<'_>,
) {
    for tri in mesh.indices().chunks_exact(3) {
        let v1 = &mesh.vertices()[tri[0] as usize];
        let v2 = &mesh.vertices()[tri[1] as usize];
        let v3 = &mesh.vertices()[tri[2] as usize];
        rasterize_triangle(framebuffer, [v1, v2, v3], draw);
    }
}

fn rasterize_triangle(
    framebuffer: &mut Framebuffer,
    vertices: [&Vertex; 3],
    draw: &TriangleDraw<'_>,
) {
    let width = framebuffer.width();
    let height = framebuffer.height();
    if width == 0 || height == 0 {
        return;
    }

    // Clip-space projection; a vertex with w == 0 or a non-finite result
    // drops the whole triangle.
    let mut projected = [DVec3::ZERO; 3];
    for (out, v) in projected.iter_mut().zip(vertices) {
        match project(&draw.camera_matrix, v.position) {
            Some(p) => *out = p,
            None => return,
        }
    }

    let linear_model = DMat3::from_mat4(draw.model_matrix);
    let world: [DVec3; 3] = std::array::from_fn(|i| {
        draw.model_matrix
            .transform_point3(vertices[i].position)
    });

    let face_normal = (world[1] - world[0]).cross(world[2] - world[0]);
    let face_normal = if face_normal.length_squared() > 0.0 {
        face_normal.normalize()
    } else {
        // Zero-area in world space; screen coverage will be empty too, but
        // bail early rather than shade with a garbage normal.
        log::debug!("skipping degenerate triangle");
        return;
    };

    let corners: [Corner; 3] = std::array::from_fn(|i| {
        let v = vertices[i];
        let p = projected[i];
        Corner {
            screen: viewport_transform(p, width, height),
            z: p.z,
            inv_z: if p.z == 0.0 { 0.0 } else { 1.0 / p.z },
            color: v.color,
            tex_coord: v.tex_coord,
            normal: draw.normal_matrix * v.normal,
            tangent: linear_model * v.tangent,
            bitangent: linear_model * v.bitangent,
            world_position: world[i],
        }
    });
    // Perspective-correct interpolation needs a finite 1/z at every
    // corner; with a vertex on the z = 0 plane (e.g. an identity camera)
    // attributes fall back to affine interpolation.
    let perspective = projected.iter().all(|p| p.z != 0.0);

    let area =
        edge_function(corners[0].screen, corners[1].screen, corners[2].screen);
    if area == 0.0 || !area.is_finite() {
        log::debug!("skipping zero-area triangle");
        return;
    }

    // Screen-space bounding box clipped to the framebuffer.
    let min = corners[0]
        .screen
        .min(corners[1].screen)
        .min(corners[2].screen);
    let max = corners[0]
        .screen
        .max(corners[1].screen)
        .max(corners[2].screen);
    let x_min = (min.x.floor().max(0.0)) as usize;
    let y_min = (min.y.floor().max(0.0)) as usize;
    let x_max = (max.x.floor().min((width - 1) as f64)) as usize;
    let y_max = (max.y.floor().min((height - 1) as f64)) as usize;
    if max.x < 0.0 || max.y < 0.0 || min.x > width as f64 || min.y > height as f64
    {
        return;
    }
    if x_max < x_min || y_max < y_min {
        return;
    }

    let fill_row = |y: usize, color_row: &mut [u8], depth_row: &mut [f64]| {
        for x in x_min..=x_max {
            let pixel = DVec2::new(x as f64 + 0.5, y as f64 + 0.5);

            // Edge-function coverage.
            let mut w1 = edge_function(corners[1].screen, corners[2].screen, pixel);
            let mut w2 = edge_function(corners[2].screen, corners[0].screen, pixel);
            let mut w3 = edge_function(corners[0].screen, corners[1].screen, pixel);
            if w1 < 0.0 || w2 < 0.0 || w3 < 0.0 {
                continue;
            }

            // Top-left tie rule: a zero edge only owns the pixel when it is
            // a top edge (horizontal, pointing -x) or a left edge
            // (pointing -y).
            let edge1 = corners[1].screen - corners[2].screen;
            let edge2 = corners[2].screen - corners[0].screen;
            let edge3 = corners[0].screen - corners[1].screen;
            let admits = |w: f64, e: DVec2| {
                if w == 0.0 {
                    (e.y == 0.0 && e.x < 0.0) || e.y < 0.0
                } else {
                    w > 0.0
                }
            };
            if !admits(w1, edge1) || !admits(w2, edge2) || !admits(w3, edge3) {
                continue;
            }

            // Barycentric weights.
            w1 /= area;
            w2 /= area;
            w3 /= area;

            let weights = [w1, w2, w3];
            let z = if perspective {
                1.0 / (w1 * corners[0].inv_z
                    + w2 * corners[1].inv_z
                    + w3 * corners[2].inv_z)
            } else {
                w1 * corners[0].z + w2 * corners[1].z + w3 * corners[2].z
            };

            // Depth test, strictly less than the stored value. The write
            // is deferred until the opacity cutout has accepted the
            // fragment.
            if !(z < depth_row[x]) {
                continue;
            }

            // Perspective-correct attribute interpolation:
            // a = z * sum(w_k * a_k / z_k).
            let lerp3 = |get: &dyn Fn(&Corner) -> DVec3| -> DVec3 {
                let mut acc = DVec3::ZERO;
                for (c, w) in corners.iter().zip(weights) {
                    let f = if perspective { w * c.inv_z } else { w };
                    acc += get(c) * f;
                }
                if perspective {
                    acc * z
                } else {
                    acc
                }
            };
            let lerp_scale = |a: f64, c: &Corner, w: f64| {
                if perspective {
                    a * w * c.inv_z
                } else {
                    a * w
                }
            };
            let mut color = DVec4::ZERO;
            let mut tex_coord = DVec2::ZERO;
            for (c, w) in corners.iter().zip(weights) {
                color += DVec4::new(
                    lerp_scale(c.color.x, c, w),
                    lerp_scale(c.color.y, c, w),
                    lerp_scale(c.color.z, c, w),
                    lerp_scale(c.color.w, c, w),
                );
                tex_coord += DVec2::new(
                    lerp_scale(c.tex_coord.x, c, w),
                    lerp_scale(c.tex_coord.y, c, w),
                );
            }
            if perspective {
                color *= z;
                tex_coord *= z;
            }

            let world_position = lerp3(&|c| c.world_position);

            // Normal selection: interpolated (smooth) or face (coarse),
            // then the optional tangent-space normal map on top.
            let base_normal = match draw.normal_mode {
                NormalMode::Smooth => {
                    let n = lerp3(&|c| c.normal);
                    if n.length_squared() > 0.0 {
                        n.normalize()
                    } else {
                        face_normal
                    }
                }
                NormalMode::Coarse => face_normal,
            };
            let normal = match &draw.material.normal_map {
                Some(map) if !map.is_empty() => {
                    let tangent = lerp3(&|c| c.tangent);
                    let bitangent = lerp3(&|c| c.bitangent);
                    apply_normal_map(
                        map.sample_rgba(tex_coord),
                        base_normal,
                        tangent,
                        bitangent,
                    )
                }
                _ => base_normal,
            };

            // Opacity cutout: fully discard the fragment, leaving depth
            // untouched so geometry behind the hole stays visible.
            if let Some(map) = &draw.material.opacity_map {
                if !map.is_empty() && map.sample_grayscale(tex_coord) < 0.5 {
                    continue;
                }
            }
            depth_row[x] = z;

            let fragment = Fragment {
                world_position,
                normal,
                tex_coord,
                color,
            };
            let shaded =
                shading::shade(&draw.material.model, &fragment, &draw.lights);

            color_row[x * 4..x * 4 + 4].copy_from_slice(&pack_rgba(shaded));
        }
    };

    // Fill, parallel across disjoint row bands for tall boxes. Each worker
    // owns its rows of both targets, so the depth-test/color-write critical
    // section needs no locking and the output is bit-identical to the
    // serial path.
    let rows = y_max - y_min + 1;
    let (color, depth) = framebuffer.targets_mut();
    let color_rows =
        &mut color.pixels_mut()[y_min * width * 4..(y_max + 1) * width * 4];
    let depth_rows = &mut depth.pixels_mut()[y_min * width..(y_max + 1) * width];

    if rows >= PARALLEL_ROW_THRESHOLD {
        color_rows
            .par_chunks_mut(width * 4)
            .zip(depth_rows.par_chunks_mut(width))
            .enumerate()
            .for_each(|(dy, (color_row, depth_row))| {
                fill_row(y_min + dy, color_row, depth_row);
            });
    } else {
        for (dy, (color_row, depth_row)) in color_rows
            .chunks_mut(width * 4)
            .zip(depth_rows.chunks_mut(width))
            .enumerate()
        {
            fill_row(y_min + dy, color_row, depth_row);
        }
    }
}

/// Remap a normal-map sample from [0, 1] to [-1, 1] and rotate it from
/// tangent space into world space.
fn apply_normal_map(
    sample: DVec4,
    normal: DVec3,
    tangent: DVec3,
    bitangent: DVec3,
) -> DVec3 {
    if tangent.length_squared() == 0.0 || bitangent.length_squared() == 0.0 {
        return normal;
    }
    let n_ts = DVec3::new(sample.x, sample.y, sample.z) * 2.0 - DVec3::ONE;
    let world = tangent.normalize() * n_ts.x
        + bitangent.normalize() * n_ts.y
        + normal * n_ts.z;
    if world.length_squared() > 0.0 {
        world.normalize()
    } else {
        normal
    }
}
