//! Shared projection, viewport, and pixel-write helpers for the primitive
//! rasterizers.

use glam::{DMat4, DVec2, DVec3, DVec4};

/// Project an object-space point through a combined camera matrix and
/// divide by w.
///
/// Returns `None` (and emits a diagnostic) when w is zero or the result is
/// not finite; primitives containing such a vertex contribute nothing.
pub(crate) fn project(m: &DMat4, p: DVec3) -> Option<DVec3> {
    let v = *m * p.extend(1.0);
    if v.w == 0.0 {
        log::warn!("projection divides by w = 0 at {p:?}");
        return None;
    }
    let out = DVec3::new(v.x / v.w, v.y / v.w, v.z / v.w);
    if !out.is_finite() {
        log::warn!("projection produced a non-finite vertex from {p:?}");
        return None;
    }
    Some(out)
}

/// Map an NDC point to continuous screen coordinates.
///
/// x grows right, y grows down; the NDC square [-1, 1]^2 spans
/// [0, width] x [0, height] so that every pixel center of the target lies
/// strictly inside a fully-covering primitive.
pub(crate) fn viewport_transform(
    p: DVec3,
    width: usize,
    height: usize,
) -> DVec2 {
    let half = DVec2::new(width as f64, height as f64) * 0.5;
    DVec2::new(
        (p.x + 1.0) * half.x,
        height as f64 - (p.y + 1.0) * half.y,
    )
}

/// Signed parallelogram area of (a, b, c): positive when c lies to the
/// left of the edge a->b in screen space.
pub(crate) fn edge_function(a: DVec2, b: DVec2, c: DVec2) -> f64 {
    (c.x - a.x) * (b.y - a.y) - (c.y - a.y) * (b.x - a.x)
}

/// Saturate a shaded color to [0, 1] and quantize to 8-bit RGBA.
pub(crate) fn pack_rgba(c: DVec4) -> [u8; 4] {
    let c = c.clamp(DVec4::ZERO, DVec4::ONE) * 255.0;
    [
        c.x.round() as u8,
        c.y.round() as u8,
        c.z.round() as u8,
        c.w.round() as u8,
    ]
}
