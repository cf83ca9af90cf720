//! Environment ingestion: Radiance HDR decoding, LDR image loading, and
//! the equirectangular-to-cubemap conversion.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use glam::{DVec2, DVec3};

use crate::error::SoftrasError;
use crate::ibl::{cube_pass, CancelToken};
use crate::texture::mapping::CubeFace;
use crate::texture::{Texture2D, TextureCube};

/// Load an environment image by extension: `.hdr`/`.pic` decode as
/// Radiance RGBE, anything else as an 8-bit image normalized to [0, 1].
pub fn load_environment(path: &Path) -> Result<Texture2D<f64, 4>, SoftrasError> {
    let is_radiance = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| {
            e.eq_ignore_ascii_case("hdr") || e.eq_ignore_ascii_case("pic")
        });
    if is_radiance {
        load_hdr(path)
    } else {
        load_ldr(path)
    }
}

/// Load a Radiance HDR panorama from disk.
pub fn load_hdr(path: &Path) -> Result<Texture2D<f64, 4>, SoftrasError> {
    let file = File::open(path)?;
    decode_hdr(BufReader::new(file))
}

/// Load an 8-bit image as a float texture with channels in [0, 1].
pub fn load_ldr(path: &Path) -> Result<Texture2D<f64, 4>, SoftrasError> {
    let img = image::open(path)
        .map_err(|e| SoftrasError::Image(e.to_string()))?
        .to_rgba8();
    let (w, h) = img.dimensions();
    let pixels = img
        .as_raw()
        .iter()
        .map(|&b| f64::from(b) / 255.0)
        .collect();
    Texture2D::from_pixels(w as usize, h as usize, pixels).ok_or_else(|| {
        SoftrasError::Image("decoded image has a bad buffer length".into())
    })
}

/// Decode a Radiance picture stream: an ASCII header (`#?RADIANCE`,
/// `FORMAT=32-bit_rle_rgbe`), a `-Y H +X W` dimension line, then H
/// scanlines of four run-length-encoded channel planes (R, G, B, E).
///
/// Each pixel decodes as `(byte + 0.5) x 2^(e - 128 + 8) x 10^-4`.
pub fn decode_hdr(
    mut reader: impl BufRead,
) -> Result<Texture2D<f64, 4>, SoftrasError> {
    let id = read_line(&mut reader)?;
    if id.trim_end() != "#?RADIANCE" {
        return Err(SoftrasError::HdrParse(
            "missing #?RADIANCE identifier".into(),
        ));
    }

    // Header options end at the first empty line.
    loop {
        let line = read_line(&mut reader)?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if line.starts_with('#') {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name == "FORMAT" && value != "32-bit_rle_rgbe" {
                return Err(SoftrasError::HdrParse(format!(
                    "unsupported format {value}"
                )));
            }
        }
    }

    // Dimensions: "-Y <height> +X <width>".
    let dims = read_line(&mut reader)?;
    let parts: Vec<&str> = dims.split_whitespace().collect();
    let (height, width) = match parts.as_slice() {
        ["-Y", h, "+X", w] => {
            let h: usize = h.parse().map_err(|_| {
                SoftrasError::HdrParse(format!("bad height in {dims:?}"))
            })?;
            let w: usize = w.parse().map_err(|_| {
                SoftrasError::HdrParse(format!("bad width in {dims:?}"))
            })?;
            (h, w)
        }
        _ => {
            return Err(SoftrasError::HdrParse(format!(
                "unsupported dimension line {dims:?}"
            )))
        }
    };
    if width == 0 || height == 0 || width > 0x7FFF {
        return Err(SoftrasError::HdrParse(format!(
            "implausible dimensions {width}x{height}"
        )));
    }

    let mut pixels = Vec::with_capacity(width * height * 4);
    let mut scanline = vec![0u8; width * 4];
    for _ in 0..height {
        decode_scanline(&mut reader, width, &mut scanline)?;

        // Channel planes: whole R row, then G, then B, then E.
        for i in 0..width {
            let r = scanline[i];
            let g = scanline[width + i];
            let b = scanline[2 * width + i];
            let e = scanline[3 * width + i];

            let exponent = 2f64.powi(i32::from(e) - 128 + 8);
            pixels.push((f64::from(r) + 0.5) * exponent * 1e-4);
            pixels.push((f64::from(g) + 0.5) * exponent * 1e-4);
            pixels.push((f64::from(b) + 0.5) * exponent * 1e-4);
            pixels.push(1.0);
        }
    }

    Texture2D::from_pixels(width, height, pixels).ok_or_else(|| {
        SoftrasError::HdrParse("scanline count mismatch".into())
    })
}

/// Decode one adaptive-RLE scanline: a `[2, 2, hi, lo]` indicator followed
/// by runs. A run byte above 128 repeats the next byte; otherwise it
/// prefixes that many literal bytes.
fn decode_scanline(
    reader: &mut impl BufRead,
    width: usize,
    out: &mut [u8],
) -> Result<(), SoftrasError> {
    let mut indicator = [0u8; 4];
    reader.read_exact(&mut indicator)?;
    if indicator[0] != 2 || indicator[1] != 2 {
        return Err(SoftrasError::HdrParse(format!(
            "invalid scanline indicator {:02x}{:02x}",
            indicator[0], indicator[1]
        )));
    }
    let declared = usize::from(u16::from_be_bytes([indicator[2], indicator[3]]));
    if declared != width {
        return Err(SoftrasError::HdrParse(format!(
            "scanline width {declared} does not match header width {width}"
        )));
    }

    let mut read = 0usize;
    while read < width * 4 {
        let mut run = [0u8; 1];
        reader.read_exact(&mut run)?;
        let run = run[0];
        if run > 128 {
            let count = usize::from(run) - 128;
            if read + count > width * 4 {
                return Err(SoftrasError::HdrParse("run overflow".into()));
            }
            let mut value = [0u8; 1];
            reader.read_exact(&mut value)?;
            out[read..read + count].fill(value[0]);
            read += count;
        } else {
            let count = usize::from(run);
            if count == 0 {
                return Err(SoftrasError::HdrParse("zero-length run".into()));
            }
            if read + count > width * 4 {
                return Err(SoftrasError::HdrParse("dump overflow".into()));
            }
            reader.read_exact(&mut out[read..read + count])?;
            read += count;
        }
    }
    Ok(())
}

fn read_line(reader: &mut impl BufRead) -> Result<String, SoftrasError> {
    let mut buf = Vec::new();
    let n = reader.read_until(b'\n', &mut buf)?;
    if n == 0 {
        return Err(SoftrasError::HdrParse("unexpected end of file".into()));
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Project an equirectangular panorama onto a cubemap of the given face
/// size.
///
/// For each cube texel the direction is reconstructed and mapped to
/// spherical coordinates: `u = atan2(z, x) x 0.1591 + 0.5`,
/// `v = asin(y) x 0.3183 + 0.5`.
pub fn equirectangular_to_cubemap(
    equirect: &Texture2D<f64, 4>,
    size: usize,
) -> TextureCube<f64, 4> {
    let faces =
        cube_pass::render_cube_faces(size, &CancelToken::default(), |p| {
            let n = p.normalize();
            let uv = spherical_uv(n);
            equirect.texel_uv(uv.x, uv.y)
        });

    let mut cube = TextureCube::new(size, size);
    // The pass only returns None on cancellation, and this conversion is
    // never cancelled.
    if let Some(faces) = faces {
        for (i, face) in faces.into_iter().enumerate() {
            if let Some(f) = CubeFace::from_index(i) {
                let _ = cube.set_face(f, face);
            }
        }
    }
    cube
}

fn spherical_uv(direction: DVec3) -> DVec2 {
    DVec2::new(
        direction.z.atan2(direction.x) * 0.1591 + 0.5,
        direction.y.clamp(-1.0, 1.0).asin() * 0.3183 + 0.5,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_PI_2;
    use std::io::Write as _;

    /// Build a Radiance stream of constant-color scanlines.
    fn radiance_bytes(width: usize, height: usize, rgbe: [u8; 4]) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(b"#?RADIANCE\n");
        out.extend_from_slice(b"FORMAT=32-bit_rle_rgbe\n");
        out.extend_from_slice(b"\n");
        let _ = writeln!(out, "-Y {height} +X {width}");
        for _ in 0..height {
            out.extend_from_slice(&[2, 2]);
            out.extend_from_slice(&(width as u16).to_be_bytes());
            for channel in rgbe {
                // One run per channel plane.
                out.push(128 + width as u8);
                out.push(channel);
            }
        }
        out
    }

    #[test]
    fn constant_hdr_roundtrips_within_tolerance() {
        // Bytes chosen so the decode formula lands on (1.0, 0.5, 0.25):
        // with e = 126 the scale is 2^6 * 1e-4.
        let bytes = radiance_bytes(4, 4, [156, 78, 39, 126]);
        let tex = decode_hdr(bytes.as_slice()).unwrap();
        assert_eq!(tex.width(), 4);
        assert_eq!(tex.height(), 4);
        for p in tex.pixels().chunks_exact(4) {
            assert!((p[0] - 1.0).abs() < 5e-3, "r = {}", p[0]);
            assert!((p[1] - 0.5).abs() < 5e-3, "g = {}", p[1]);
            assert!((p[2] - 0.25).abs() < 5e-3, "b = {}", p[2]);
            assert_eq!(p[3], 1.0);
        }
    }

    #[test]
    fn literal_runs_decode_too() {
        let mut out = Vec::new();
        out.extend_from_slice(b"#?RADIANCE\n");
        out.extend_from_slice(b"FORMAT=32-bit_rle_rgbe\n\n");
        out.extend_from_slice(b"-Y 1 +X 2\n");
        out.extend_from_slice(&[2, 2, 0, 2]);
        // Literal dumps: two bytes per channel plane.
        for plane in [[10u8, 20], [30, 40], [50, 60], [128, 128]] {
            out.push(2);
            out.extend_from_slice(&plane);
        }
        let tex = decode_hdr(out.as_slice()).unwrap();
        let p0 = tex.texel(0, 0);
        let p1 = tex.texel(1, 0);
        // e = 128 scales by 2^8 * 1e-4 = 0.0256.
        assert!((p0[0] - 10.5 * 0.0256).abs() < 1e-12);
        assert!((p1[1] - 40.5 * 0.0256).abs() < 1e-12);
    }

    #[test]
    fn missing_identifier_is_rejected() {
        let bytes = b"#?NOTRADIANCE\nFORMAT=32-bit_rle_rgbe\n\n-Y 1 +X 1\n";
        assert!(matches!(
            decode_hdr(&bytes[..]),
            Err(SoftrasError::HdrParse(_))
        ));
    }

    #[test]
    fn wrong_format_is_rejected() {
        let bytes = b"#?RADIANCE\nFORMAT=32-bit_rle_xyze\n\n-Y 1 +X 1\n";
        assert!(matches!(
            decode_hdr(&bytes[..]),
            Err(SoftrasError::HdrParse(_))
        ));
    }

    #[test]
    fn truncated_scanline_is_rejected() {
        let mut bytes = radiance_bytes(4, 4, [156, 78, 39, 126]);
        bytes.truncate(bytes.len() - 6);
        assert!(decode_hdr(bytes.as_slice()).is_err());
    }

    #[test]
    fn spherical_uv_covers_the_axes() {
        // +X is the panorama center column, +Y the top band.
        let px = spherical_uv(DVec3::X);
        assert!((px.x - 0.5).abs() < 1e-9);
        assert!((px.y - 0.5).abs() < 1e-9);
        let up = spherical_uv(DVec3::Y);
        assert!((up.y - (FRAC_PI_2 * 0.3183 + 0.5)).abs() < 1e-9);
    }

    #[test]
    fn constant_panorama_fills_every_cube_face() {
        let mut pano: Texture2D<f64, 4> = Texture2D::new(8, 4);
        pano.clear([0.25, 0.5, 0.75, 1.0]);
        let cube = equirectangular_to_cubemap(&pano, 4);
        for face in CubeFace::ALL {
            for texel in cube.face(face).pixels().chunks_exact(4) {
                assert_eq!(texel, [0.25, 0.5, 0.75, 1.0]);
            }
        }
    }
}
