//! Image-based-lighting precomputation: the irradiance, prefilter, and
//! BRDF-integration passes, plus the on-disk cache that avoids re-running
//! them per environment.

mod brdf;
pub(crate) mod cube_pass;
mod irradiance;
mod prefilter;
mod sampling;

use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rustc_hash::FxHasher;

use crate::error::SoftrasError;
use crate::texture::mapping::CubeFace;
use crate::texture::{Texture2D, TextureCube};

/// Number of roughness levels the prefilter pass renders (fewer when the
/// cubemap's mip chain is shorter).
pub const PREFILTER_MIP_COUNT: usize = 5;

/// Cooperative cancellation flag for the long-running passes.
///
/// Cancellation is observed at face boundaries (irradiance, prefilter) and
/// row boundaries (BRDF integration); a cancelled pass discards its
/// partial output and writes no cache file.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Sizes of the three precomputed textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IblConfig {
    /// Face size of the irradiance cubemap.
    pub irradiance_size: usize,
    /// Base face size of the prefilter cubemap (a power of two; 256 yields
    /// the full five-level roughness chain).
    pub prefilter_size: usize,
    /// Side length of the BRDF integration lookup.
    pub brdf_size: usize,
}

impl Default for IblConfig {
    fn default() -> Self {
        Self {
            irradiance_size: 64,
            prefilter_size: 256,
            brdf_size: 512,
        }
    }
}

/// The three precomputed IBL textures consumed by PBR shading.
///
/// Read-only after precomputation; any number of materials may sample them
/// concurrently.
#[derive(Debug, Clone)]
pub struct IblTextures {
    /// Cosine-convolved diffuse irradiance, pi-scaled.
    pub irradiance: TextureCube<f64, 4>,
    /// Roughness-prefiltered specular radiance with its mipmap chain.
    pub prefilter: TextureCube<f64, 4>,
    /// Two-channel split-sum BRDF lookup over (n.v, roughness).
    pub brdf_lut: Texture2D<f64, 2>,
}

impl IblTextures {
    /// Number of roughness levels the prefilter cubemap actually carries.
    pub fn prefilter_levels(&self) -> usize {
        self.prefilter.level_count().min(PREFILTER_MIP_COUNT)
    }

    /// Run all three passes without touching any cache.
    ///
    /// Returns `None` when cancelled.
    pub fn compute(
        background: &TextureCube<f64, 4>,
        config: &IblConfig,
        cancel: &CancelToken,
    ) -> Option<Self> {
        let irradiance = irradiance::irradiance_cubemap(
            background,
            config.irradiance_size,
            cancel,
        )?;
        let prefilter = prefilter::prefilter_cubemap(
            background,
            config.prefilter_size,
            cancel,
        )?;
        let brdf_lut = brdf::brdf_integration_lut(config.brdf_size, cancel)?;
        Some(Self {
            irradiance,
            prefilter,
            brdf_lut,
        })
    }

    /// Load the three textures from a cache directory, re-running only the
    /// passes whose file is missing or malformed, and writing back what was
    /// recomputed.
    ///
    /// The cache key is a hash of the environment's pixel content, so a
    /// changed environment never reuses stale output. Returns `Ok(None)`
    /// when cancelled.
    pub fn compute_or_load(
        background: &TextureCube<f64, 4>,
        config: &IblConfig,
        cache_dir: &Path,
        cancel: &CancelToken,
    ) -> Result<Option<Self>, SoftrasError> {
        let dir = cache_dir
            .join(format!("{:016x}", environment_hash(background)));
        std::fs::create_dir_all(&dir)?;

        let irradiance_path = dir.join("irradiance.tex");
        let irradiance = match TextureCube::load(&irradiance_path) {
            Ok(cube) => {
                log::info!("irradiance cache hit: {}", irradiance_path.display());
                cube
            }
            Err(e) => {
                log::info!("irradiance cache miss ({e}); running the pass");
                let Some(cube) = irradiance::irradiance_cubemap(
                    background,
                    config.irradiance_size,
                    cancel,
                ) else {
                    return Ok(None);
                };
                write_cache(&cube, &irradiance_path);
                cube
            }
        };

        let prefilter_path = dir.join("prefilter.tex");
        let prefilter = match TextureCube::load(&prefilter_path) {
            Ok(cube) => {
                log::info!("prefilter cache hit: {}", prefilter_path.display());
                cube
            }
            Err(e) => {
                log::info!("prefilter cache miss ({e}); running the pass");
                let Some(cube) = prefilter::prefilter_cubemap(
                    background,
                    config.prefilter_size,
                    cancel,
                ) else {
                    return Ok(None);
                };
                write_cache(&cube, &prefilter_path);
                cube
            }
        };

        let brdf_path = dir.join("brdf_lut.tex");
        let brdf_lut = match Texture2D::load(&brdf_path) {
            Ok(lut) => {
                log::info!("BRDF LUT cache hit: {}", brdf_path.display());
                lut
            }
            Err(e) => {
                log::info!("BRDF LUT cache miss ({e}); running the pass");
                let Some(lut) =
                    brdf::brdf_integration_lut(config.brdf_size, cancel)
                else {
                    return Ok(None);
                };
                if let Err(e) = lut.save(&brdf_path) {
                    log::warn!("failed to write BRDF cache: {e}");
                }
                lut
            }
        };

        Ok(Some(Self {
            irradiance,
            prefilter,
            brdf_lut,
        }))
    }
}

fn write_cache(cube: &TextureCube<f64, 4>, path: &Path) {
    if let Err(e) = cube.save(path) {
        log::warn!("failed to write IBL cache {}: {e}", path.display());
    }
}

/// Content hash of an environment cubemap, used as the cache directory
/// name.
fn environment_hash(background: &TextureCube<f64, 4>) -> u64 {
    let mut hasher = FxHasher::default();
    background.width().hash(&mut hasher);
    background.height().hash(&mut hasher);
    for face in CubeFace::ALL {
        let bytes: &[u8] =
            bytemuck::cast_slice(background.face(face).pixels());
        bytes.hash(&mut hasher);
    }
    hasher.finish()
}

/// Location of the IBL cache, overridable for tests and tooling.
pub fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache").join("ibl")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn tiny_config() -> IblConfig {
        IblConfig {
            irradiance_size: 4,
            prefilter_size: 16,
            brdf_size: 8,
        }
    }

    fn background() -> TextureCube<f64, 4> {
        let mut bg: TextureCube<f64, 4> = TextureCube::new(4, 4);
        for face in CubeFace::ALL {
            bg.face_mut(face).clear([0.5, 0.25, 1.0, 1.0]);
        }
        bg
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir()
            .join("softras-ibl-tests")
            .join(format!("{tag}-{}", std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn cache_roundtrip_reuses_all_three_files() {
        let dir = temp_dir("roundtrip");
        let bg = background();
        let cancel = CancelToken::default();

        let first = IblTextures::compute_or_load(
            &bg,
            &tiny_config(),
            &dir,
            &cancel,
        )
        .unwrap()
        .unwrap();
        let second = IblTextures::compute_or_load(
            &bg,
            &tiny_config(),
            &dir,
            &cancel,
        )
        .unwrap()
        .unwrap();

        for face in CubeFace::ALL {
            assert_eq!(
                first.irradiance.face(face).pixels(),
                second.irradiance.face(face).pixels()
            );
            assert_eq!(
                first.prefilter.face(face).pixels(),
                second.prefilter.face(face).pixels()
            );
        }
        assert_eq!(first.brdf_lut.pixels(), second.brdf_lut.pixels());
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn corrupt_cache_file_is_treated_as_a_miss() {
        let dir = temp_dir("corrupt");
        let bg = background();
        let cancel = CancelToken::default();

        let first = IblTextures::compute_or_load(
            &bg,
            &tiny_config(),
            &dir,
            &cancel,
        )
        .unwrap()
        .unwrap();

        // Truncate the irradiance file; the next load must recompute it
        // and produce the same content.
        let cache_root = dir
            .join(format!("{:016x}", environment_hash(&bg)))
            .join("irradiance.tex");
        let bytes = fs::read(&cache_root).unwrap();
        fs::write(&cache_root, &bytes[..bytes.len() / 3]).unwrap();

        let second = IblTextures::compute_or_load(
            &bg,
            &tiny_config(),
            &dir,
            &cancel,
        )
        .unwrap()
        .unwrap();
        for face in CubeFace::ALL {
            assert_eq!(
                first.irradiance.face(face).pixels(),
                second.irradiance.face(face).pixels()
            );
        }
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn different_environments_use_different_cache_keys() {
        let a = background();
        let mut b = background();
        b.face_mut(CubeFace::PositiveX).clear([0.0, 0.0, 0.0, 1.0]);
        assert_ne!(environment_hash(&a), environment_hash(&b));
    }

    #[test]
    fn cancelled_pipeline_produces_no_cache_files() {
        let dir = temp_dir("cancelled");
        let bg = background();
        let cancel = CancelToken::default();
        cancel.cancel();

        let result = IblTextures::compute_or_load(
            &bg,
            &tiny_config(),
            &dir,
            &cancel,
        )
        .unwrap();
        assert!(result.is_none());

        let cache_root =
            dir.join(format!("{:016x}", environment_hash(&bg)));
        assert!(
            fs::read_dir(&cache_root).map(|mut d| d.next().is_none()).unwrap_or(true),
            "cancelled run must not leave cache files"
        );
        let _ = fs::remove_dir_all(&dir);
    }
}
