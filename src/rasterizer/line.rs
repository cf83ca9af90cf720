//! Line rasterization: uniform screen-space stepping with
//! perspective-correct depth.

use glam::{DMat4, DVec2, DVec4};

use crate::framebuffer::Framebuffer;
use crate::mesh::{Mesh, Vertex};
use crate::rasterizer::primitive::{pack_rgba, project, viewport_transform};

pub(crate) fn rasterize_line_mesh(
    framebuffer: &mut Framebuffer,
    mesh: &Mesh,
    camera_matrix: &DMat4,
) {
    for line in mesh.indices().chunks_exact(2) {
        let v1 = &mesh.vertices()[line[0] as usize];
        let v2 = &mesh.vertices()[line[1] as usize];
        rasterize_line(framebuffer, v1, v2, camera_matrix);
    }
}

fn rasterize_line(
    framebuffer: &mut Framebuffer,
    v1: &Vertex,
    v2: &Vertex,
    camera_matrix: &DMat4,
) {
    let width = framebuffer.width();
    let height = framebuffer.height();
    if width == 0 || height == 0 {
        return;
    }

    let (Some(p1), Some(p2)) = (
        project(camera_matrix, v1.position),
        project(camera_matrix, v2.position),
    ) else {
        return;
    };

    // Endpoints are clamped onto the framebuffer; lines leaving the screen
    // bend to its border rather than being clipped.
    let clamp_max = DVec2::new((width - 1) as f64, (height - 1) as f64);
    let s1 = viewport_transform(p1, width, height).clamp(DVec2::ZERO, clamp_max);
    let s2 = viewport_transform(p2, width, height).clamp(DVec2::ZERO, clamp_max);

    let diff = s2 - s1;
    let length = diff.length();
    let steps = length.ceil() as usize;
    let direction = if length > 0.0 { diff / length } else { DVec2::ZERO };

    let (color, depth) = framebuffer.targets_mut();
    for step in 0..=steps {
        let r = (step as f64).min(length);
        let t = if length > 0.0 { r / length } else { 0.0 };

        let p = s1 + direction * r;
        let (x, y) = (p.x.floor() as i32, p.y.floor() as i32);

        // Perspective-correct depth along the segment; endpoints on the
        // z = 0 plane interpolate linearly instead.
        let z = if p1.z != 0.0 && p2.z != 0.0 {
            1.0 / ((1.0 - t) / p1.z + t / p2.z)
        } else {
            (1.0 - t) * p1.z + t * p2.z
        };

        let stored = depth.texel(x, y)[0];
        if !(z < stored) {
            continue;
        }
        let _ = depth.set_texel(x, y, [z]);

        // Color interpolates linearly in screen space.
        let c: DVec4 = v1.color.lerp(v2.color, t);
        let _ = color.set_texel(x, y, pack_rgba(c));
    }
}
