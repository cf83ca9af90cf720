//! Six-face cubemap built on [`Texture2D`].

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use glam::DVec3;

use crate::error::{MipmapError, SoftrasError};
use crate::texel::Texel;
use crate::texture::mapping::{self, CubeFace};
use crate::texture::serialize::{
    read_i32, read_u32, write_i32, write_u32, TEXTURE_MAGIC,
};
use crate::texture::Texture2D;

/// A cubemap: six square [`Texture2D`] faces of identical dimensions in
/// {+X, -X, +Y, -Y, +Z, -Z} order, addressable by 3D direction.
///
/// Face storage follows the cube-camera raster order: texel row 0 holds
/// the smallest face v coordinate, so direction sampling reads (u, v)
/// without an axis flip.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureCube<T: Texel, const C: usize> {
    width: usize,
    height: usize,
    faces: [Texture2D<T, C>; 6],
}

impl<T: Texel, const C: usize> TextureCube<T, C> {
    /// Create a cubemap with six zero-filled faces.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            faces: std::array::from_fn(|_| Texture2D::new(width, height)),
        }
    }

    /// Whether the faces hold no pixels.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Face width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Face height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Borrow a face.
    pub fn face(&self, face: CubeFace) -> &Texture2D<T, C> {
        &self.faces[face.index()]
    }

    /// Mutably borrow a face.
    pub fn face_mut(&mut self, face: CubeFace) -> &mut Texture2D<T, C> {
        &mut self.faces[face.index()]
    }

    /// Replace a face. The replacement must match the cube dimensions.
    pub fn set_face(
        &mut self,
        face: CubeFace,
        texture: Texture2D<T, C>,
    ) -> bool {
        if texture.width() != self.width || texture.height() != self.height {
            return false;
        }
        self.faces[face.index()] = texture;
        true
    }

    /// Generate mipmap chains for all six faces.
    pub fn generate_mipmaps(&mut self) -> Result<(), MipmapError> {
        for face in &mut self.faces {
            face.generate_mipmaps()?;
        }
        Ok(())
    }

    /// Number of levels in each face chain, counting the base level.
    pub fn level_count(&self) -> usize {
        self.faces[0].level_count()
    }

    /// Sample the nearest base-level texel along a direction.
    pub fn sample(&self, direction: DVec3) -> [T; C] {
        self.sample_level(direction, 0)
    }

    /// Sample the nearest texel along a direction at a mipmap level.
    ///
    /// Levels past the end of the chain clamp to the smallest one.
    pub fn sample_level(&self, direction: DVec3, level: usize) -> [T; C] {
        let fc = mapping::direction_to_face_uv(direction);
        let tex = self.faces[fc.face.index()].level(level);
        tex.texel_uv(fc.uv.x, fc.uv.y)
    }

    /// Serialize the cubemap to a stream: cube magic, face dimensions, then
    /// the six face streams in {+X, -X, +Y, -Y, +Z, -Z} order.
    pub fn write_to(&self, w: &mut impl Write) -> Result<(), SoftrasError> {
        write_u32(w, TEXTURE_MAGIC)?;
        write_i32(w, self.width as i32)?;
        write_i32(w, self.height as i32)?;
        for face in &self.faces {
            face.write_to(w)?;
        }
        Ok(())
    }

    /// Deserialize a cubemap written by [`TextureCube::write_to`].
    pub fn read_from(r: &mut impl Read) -> Result<Self, SoftrasError> {
        let magic = read_u32(r)?;
        if magic != TEXTURE_MAGIC {
            return Err(SoftrasError::TextureDecode(format!(
                "bad cube magic {magic:#08x}"
            )));
        }
        let width = read_i32(r)?;
        let height = read_i32(r)?;
        if width < 0 || height < 0 {
            return Err(SoftrasError::TextureDecode(format!(
                "negative cube dimensions {width}x{height}"
            )));
        }

        let mut faces = Vec::with_capacity(6);
        for _ in 0..6 {
            let face = Texture2D::<T, C>::read_from(r)?;
            if face.width() != width as usize
                || face.height() != height as usize
            {
                return Err(SoftrasError::TextureDecode(
                    "cube face dimensions do not match header".into(),
                ));
            }
            faces.push(face);
        }
        let faces: [Texture2D<T, C>; 6] = match faces.try_into() {
            Ok(faces) => faces,
            Err(_) => {
                return Err(SoftrasError::TextureDecode(
                    "wrong cube face count".into(),
                ))
            }
        };

        Ok(Self {
            width: width as usize,
            height: height as usize,
            faces,
        })
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
        TextureCube::read_from(&mut file)
    }

    /// Render the cubemap as a 4w x 3h cross image for debugging and
    /// regression comparison: +Y top center; -X, +Z, +X, -Z across the
    /// middle row; -Z bottom center.
    pub fn to_image(&self) -> image::RgbaImage {
        self.to_image_level(0)
    }

    /// The cross image of one mipmap level.
    pub fn to_image_level(&self, level: usize) -> image::RgbaImage {
        let base = self.faces[0].level(level);
        let w = base.width() as i64;
        let h = base.height() as i64;
        let mut out = image::RgbaImage::new(4 * w as u32, 3 * h as u32);

        let placements = [
            (CubeFace::PositiveY, w, 0),
            (CubeFace::NegativeX, 0, h),
            (CubeFace::PositiveZ, w, h),
            (CubeFace::PositiveX, 2 * w, h),
            (CubeFace::NegativeZ, 3 * w, h),
            (CubeFace::NegativeZ, w, 2 * h),
        ];
        for (face, x, y) in placements {
            let img = self.face(face).level(level).to_image();
            image::imageops::replace(&mut out, &img, x, y);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampling_reads_the_face_the_direction_pierces() {
        let mut cube: TextureCube<u8, 4> = TextureCube::new(16, 16);
        cube.face_mut(CubeFace::PositiveX).clear([255, 0, 0, 255]);
        cube.face_mut(CubeFace::NegativeY).clear([0, 255, 0, 255]);

        assert_eq!(cube.sample(DVec3::X), [255, 0, 0, 255]);
        assert_eq!(cube.sample(-DVec3::Y), [0, 255, 0, 255]);
        assert_eq!(cube.sample(DVec3::Z), [0, 0, 0, 0]);
    }

    #[test]
    fn sample_reads_rows_in_v_order() {
        let mut cube: TextureCube<f64, 4> = TextureCube::new(8, 8);
        // v close to 0 on the +Z face is stored in row 0.
        assert!(cube
            .face_mut(CubeFace::PositiveZ)
            .set_texel(3, 0, [1.0, 2.0, 3.0, 4.0]));
        let d = mapping::face_uv_to_direction(CubeFace::PositiveZ, 0.5, 0.01);
        assert_eq!(cube.sample(d), [1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn serialization_roundtrips() {
        let mut cube: TextureCube<f64, 4> = TextureCube::new(8, 8);
        for (i, face) in CubeFace::ALL.into_iter().enumerate() {
            cube.face_mut(face).clear([i as f64, 0.5, 0.25, 1.0]);
        }
        let mut buf = Vec::new();
        cube.write_to(&mut buf).unwrap();
        let back = TextureCube::<f64, 4>::read_from(&mut buf.as_slice()).unwrap();
        assert_eq!(back.width(), 8);
        assert_eq!(back.height(), 8);
        for face in CubeFace::ALL {
            assert_eq!(back.face(face).pixels(), cube.face(face).pixels());
        }
    }

    #[test]
    fn channel_mismatch_on_faces_is_rejected() {
        let cube: TextureCube<f64, 4> = TextureCube::new(4, 4);
        let mut buf = Vec::new();
        cube.write_to(&mut buf).unwrap();
        assert!(TextureCube::<f64, 2>::read_from(&mut buf.as_slice()).is_err());
    }

    #[test]
    fn cross_image_places_faces() {
        let mut cube: TextureCube<u8, 4> = TextureCube::new(4, 4);
        cube.face_mut(CubeFace::PositiveY).clear([255, 0, 0, 255]);
        cube.face_mut(CubeFace::NegativeX).clear([0, 255, 0, 255]);
        cube.face_mut(CubeFace::NegativeZ).clear([0, 0, 255, 255]);
        cube.face_mut(CubeFace::NegativeY).clear([255, 255, 0, 255]);
        let img = cube.to_image();
        assert_eq!(img.dimensions(), (16, 12));
        // +Y occupies the top center cell, -X the middle-left cell.
        assert_eq!(img.get_pixel(6, 1).0, [255, 0, 0, 255]);
        assert_eq!(img.get_pixel(1, 6).0, [0, 255, 0, 255]);
        // -Z shows twice: at the end of the middle row and repeated in the
        // bottom center cell, which -Y must not overwrite.
        assert_eq!(img.get_pixel(13, 6).0, [0, 0, 255, 255]);
        assert_eq!(img.get_pixel(6, 10).0, [0, 0, 255, 255]);
        // Unused corner cells stay clear.
        assert_eq!(img.get_pixel(1, 1).0, [0, 0, 0, 0]);
    }
}
