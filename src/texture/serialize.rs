//! On-disk texture container format.
//!
//! A `Texture2D` stream is: `u32` magic, `i32` width, height, channel
//! count, byte count, the raw pixel bytes (row-major, channel-interleaved,
//! little-endian element width), then an `i32` mipmap count followed by the
//! mipmap entries recursively in the same format. A `TextureCube` stream is
//! a cube magic plus face dimensions, followed by six `Texture2D` streams
//! in {+X, -X, +Y, -Y, +Z, -Z} order.
//!
//! The layout is a compatibility contract: precomputed IBL textures are
//! cached with it and reused across runs. Any change breaks every existing
//! cache, so mismatches must fail loudly at read time.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use crate::error::SoftrasError;
use crate::texel::Texel;
use crate::texture::Texture2D;

/// Magic number identifying a serialized `Texture2D` stream.
pub const TEXTURE_MAGIC: u32 = 0x00DA_DCAC;

/// Sanity cap on the recursive mipmap count; a corrupt stream must not be
/// able to request unbounded allocation.
const MAX_MIPMAPS: i32 = 32;

pub(crate) fn write_u32(w: &mut impl Write, v: u32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub(crate) fn write_i32(w: &mut impl Write, v: i32) -> std::io::Result<()> {
    w.write_all(&v.to_le_bytes())
}

pub(crate) fn read_u32(r: &mut impl Read) -> std::io::Result<u32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

pub(crate) fn read_i32(r: &mut impl Read) -> std::io::Result<i32> {
    let mut buf = [0u8; 4];
    r.read_exact(&mut buf)?;
    Ok(i32::from_le_bytes(buf))
}

impl<T: Texel, const C: usize> Texture2D<T, C> {
    /// Serialize the texture and its mipmap chain to a stream.
    pub fn write_to(&self, w: &mut impl Write) -> Result<(), SoftrasError> {
        let byte_count = self.pixels().len() * std::mem::size_of::<T>();

        write_u32(w, TEXTURE_MAGIC)?;
        write_i32(w, self.width() as i32)?;
        write_i32(w, self.height() as i32)?;
        write_i32(w, C as i32)?;
        write_i32(w, byte_count as i32)?;
        w.write_all(bytemuck::cast_slice(self.pixels()))?;

        write_i32(w, self.mipmaps.len() as i32)?;
        for mipmap in &self.mipmaps {
            mipmap.write_to(w)?;
        }
        Ok(())
    }

    /// Deserialize a texture written by [`Texture2D::write_to`].
    ///
    /// Fails with [`SoftrasError::TextureDecode`] on a wrong magic number,
    /// a channel-count mismatch against `C`, or a byte count that does not
    /// match the declared dimensions.
    pub fn read_from(r: &mut impl Read) -> Result<Self, SoftrasError> {
        let magic = read_u32(r)?;
        if magic != TEXTURE_MAGIC {
            return Err(SoftrasError::TextureDecode(format!(
                "bad magic {magic:#08x}"
            )));
        }

        let width = read_i32(r)?;
        let height = read_i32(r)?;
        if width < 0 || height < 0 {
            return Err(SoftrasError::TextureDecode(format!(
                "negative dimensions {width}x{height}"
            )));
        }
        let channels = read_i32(r)?;
        if channels != C as i32 {
            return Err(SoftrasError::TextureDecode(format!(
                "channel count {channels} does not match expected {C}"
            )));
        }

        let byte_count = read_i32(r)?;
        let expected =
            width as usize * height as usize * C * std::mem::size_of::<T>();
        if byte_count < 0 || byte_count as usize != expected {
            return Err(SoftrasError::TextureDecode(format!(
                "byte count {byte_count} does not match {width}x{height}x{C}"
            )));
        }

        let mut pixels =
            vec![T::default(); width as usize * height as usize * C];
        r.read_exact(bytemuck::cast_slice_mut(&mut pixels))?;

        let mut tex = match Texture2D::from_pixels(
            width as usize,
            height as usize,
            pixels,
        ) {
            Some(tex) => tex,
            None => {
                return Err(SoftrasError::TextureDecode(
                    "pixel buffer length mismatch".into(),
                ))
            }
        };

        let mipmap_count = read_i32(r)?;
        if !(0..=MAX_MIPMAPS).contains(&mipmap_count) {
            return Err(SoftrasError::TextureDecode(format!(
                "implausible mipmap count {mipmap_count}"
            )));
        }
        for _ in 0..mipmap_count {
            tex.mipmaps.push(Texture2D::read_from(r)?);
        }
        Ok(tex)
    }

    /// Serialize to a file.
    pub fn save(&self, path: &Path) -> Result<(), SoftrasError> {
        let mut file = BufWriter::new(File::create(path)?);
        self.write_to(&mut file)?;
        file.flush()?;
        Ok(())
    }

    /// Deserialize from a file.
    pub fn load(path: &Path) -> Result<Self, SoftrasError> {
        let mut file = BufReader::new(File::open(path)?);
        Texture2D::read_from(&mut file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip_preserves_dimensions_and_bytes() {
        let mut tex: Texture2D<u8, 4> = Texture2D::new(32, 32);
        for (i, p) in tex.pixels_mut().iter_mut().enumerate() {
            *p = (i % 251) as u8;
        }
        tex.generate_mipmaps().unwrap();

        let mut buf = Vec::new();
        tex.write_to(&mut buf).unwrap();
        let back = Texture2D::<u8, 4>::read_from(&mut buf.as_slice()).unwrap();

        assert_eq!(back.width(), 32);
        assert_eq!(back.height(), 32);
        assert_eq!(back.channels(), 4);
        assert_eq!(back.pixels(), tex.pixels());
        assert_eq!(back.level_count(), tex.level_count());
        assert_eq!(back.level(1).pixels(), tex.level(1).pixels());
    }

    #[test]
    fn float_texture_roundtrips_exactly() {
        let mut tex: Texture2D<f64, 2> = Texture2D::new(8, 4);
        assert!(tex.set_texel(3, 2, [0.12345678901234, -7.5]));
        let mut buf = Vec::new();
        tex.write_to(&mut buf).unwrap();
        let back = Texture2D::<f64, 2>::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(back.texel(3, 2), [0.12345678901234, -7.5]);
    }

    #[test]
    fn bad_magic_is_rejected() {
        let tex: Texture2D<u8, 4> = Texture2D::new(4, 4);
        let mut buf = Vec::new();
        tex.write_to(&mut buf).unwrap();
        buf[0] ^= 0xFF;
        assert!(matches!(
            Texture2D::<u8, 4>::read_from(&mut buf.as_slice()),
            Err(SoftrasError::TextureDecode(_))
        ));
    }

    #[test]
    fn channel_mismatch_is_rejected() {
        let tex: Texture2D<u8, 4> = Texture2D::new(4, 4);
        let mut buf = Vec::new();
        tex.write_to(&mut buf).unwrap();
        assert!(matches!(
            Texture2D::<u8, 1>::read_from(&mut buf.as_slice()),
            Err(SoftrasError::TextureDecode(_))
        ));
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let tex: Texture2D<u8, 4> = Texture2D::new(8, 8);
        let mut buf = Vec::new();
        tex.write_to(&mut buf).unwrap();
        buf.truncate(buf.len() / 2);
        assert!(Texture2D::<u8, 4>::read_from(&mut buf.as_slice()).is_err());
    }
}
