//! The bijection between 3D directions and cubemap face coordinates.
//!
//! Both the shaders (sampling a cubemap by direction) and the IBL passes
//! (writing a cube texel for a direction) go through this mapping, so the
//! per-face (u, v) table below is load-bearing: cached IBL textures are only
//! comparable across runs if it never changes.

use glam::{DVec2, DVec3};

/// One face of a cubemap, in the standard OpenGL order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CubeFace {
    /// +X face (index 0).
    PositiveX,
    /// -X face (index 1).
    NegativeX,
    /// +Y face (index 2).
    PositiveY,
    /// -Y face (index 3).
    NegativeY,
    /// +Z face (index 4).
    PositiveZ,
    /// -Z face (index 5).
    NegativeZ,
}

impl CubeFace {
    /// All six faces in serialization order {+X, -X, +Y, -Y, +Z, -Z}.
    pub const ALL: [CubeFace; 6] = [
        CubeFace::PositiveX,
        CubeFace::NegativeX,
        CubeFace::PositiveY,
        CubeFace::NegativeY,
        CubeFace::PositiveZ,
        CubeFace::NegativeZ,
    ];

    /// Face index in {+X, -X, +Y, -Y, +Z, -Z} order.
    pub fn index(self) -> usize {
        match self {
            CubeFace::PositiveX => 0,
            CubeFace::NegativeX => 1,
            CubeFace::PositiveY => 2,
            CubeFace::NegativeY => 3,
            CubeFace::PositiveZ => 4,
            CubeFace::NegativeZ => 5,
        }
    }

    /// Face for an index in {+X, -X, +Y, -Y, +Z, -Z} order.
    pub fn from_index(index: usize) -> Option<CubeFace> {
        CubeFace::ALL.get(index).copied()
    }
}

/// A cubemap texture coordinate: a face plus normalized (u, v) on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceCoord {
    /// The face the direction lands on.
    pub face: CubeFace,
    /// Normalized coordinates on the face, each in [0, 1].
    pub uv: DVec2,
}

/// Map a direction to the cubemap face coordinate it pierces.
///
/// The face is the one whose axis matches the largest absolute component of
/// `direction`; exact ties resolve by X over Y over Z. The direction need
/// not be unit length. The mapping is total: every non-degenerate direction
/// yields a coordinate with u and v in [0, 1].
pub fn direction_to_face_uv(direction: DVec3) -> FaceCoord {
    let abs = direction.abs();

    let (face, max_axis, uc, vc) = if abs.x >= abs.y && abs.x >= abs.z {
        if direction.x >= 0.0 {
            // u: +z to -z, v: -y to +y
            (CubeFace::PositiveX, abs.x, -direction.z, direction.y)
        } else {
            // u: -z to +z, v: -y to +y
            (CubeFace::NegativeX, abs.x, direction.z, direction.y)
        }
    } else if abs.y >= abs.z {
        if direction.y >= 0.0 {
            // u: -x to +x, v: +z to -z
            (CubeFace::PositiveY, abs.y, direction.x, -direction.z)
        } else {
            // u: -x to +x, v: -z to +z
            (CubeFace::NegativeY, abs.y, direction.x, direction.z)
        }
    } else if direction.z >= 0.0 {
        // u: -x to +x, v: -y to +y
        (CubeFace::PositiveZ, abs.z, direction.x, direction.y)
    } else {
        // u: +x to -x, v: -y to +y
        (CubeFace::NegativeZ, abs.z, -direction.x, direction.y)
    };

    FaceCoord {
        face,
        uv: DVec2::new(
            0.5 * (uc / max_axis + 1.0),
            0.5 * (vc / max_axis + 1.0),
        ),
    }
}

/// Map a face coordinate back to a direction.
///
/// The inverse of [`direction_to_face_uv`]. The result is not normalized;
/// its largest-magnitude component is +/-1.
pub fn face_uv_to_direction(face: CubeFace, u: f64, v: f64) -> DVec3 {
    // convert range 0..1 to -1..1
    let uc = 2.0 * u - 1.0;
    let vc = 2.0 * v - 1.0;

    match face {
        CubeFace::PositiveX => DVec3::new(1.0, vc, -uc),
        CubeFace::NegativeX => DVec3::new(-1.0, vc, uc),
        CubeFace::PositiveY => DVec3::new(uc, 1.0, -vc),
        CubeFace::NegativeY => DVec3::new(uc, -1.0, vc),
        CubeFace::PositiveZ => DVec3::new(uc, vc, 1.0),
        CubeFace::NegativeZ => DVec3::new(-uc, vc, -1.0),
    }
}
