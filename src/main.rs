//! CLI binary: render the demo sphere scene under an environment map.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use glam::{DQuat, DVec3};

use softras::camera::Camera;
use softras::environment;
use softras::error::SoftrasError;
use softras::ibl::{CancelToken, IblTextures};
use softras::material::{Material, PbrMaterial};
use softras::mesh::Mesh;
use softras::options::RenderOptions;
use softras::rasterizer::Rasterizer;
use softras::scene::{Model, Transform};

const OPTIONS_FILE: &str = "softras.toml";

/// A grid of spheres sweeping roughness along x and metalness along y,
/// all lit by the shared IBL textures.
fn sphere_grid() -> Result<Vec<Model>, SoftrasError> {
    let mesh = Arc::new(Mesh::sphere(0.45, 16, 32)?);
    let mut models = Vec::new();
    for (row, metalness) in [(0.5, 1.0), (-0.5, 0.0)] {
        for column in 0..3 {
            let roughness = 0.1 + 0.4 * column as f64;
            let material = Material::pbr(PbrMaterial {
                albedo: DVec3::new(0.8, 0.2, 0.2),
                roughness,
                metalness,
                ..Default::default()
            });
            models.push(Model {
                name: format!("sphere-r{roughness:.1}-m{metalness:.0}"),
                mesh: Arc::clone(&mesh),
                material,
                transform: Transform {
                    position: DVec3::new(column as f64 - 1.0, row, 0.0),
                    rotation: DQuat::IDENTITY,
                    scale: DVec3::ONE,
                },
            });
        }
    }
    Ok(models)
}

fn render(environment_path: &Path, output_path: &Path) -> Result<(), SoftrasError> {
    let options = if Path::new(OPTIONS_FILE).exists() {
        log::info!("loading options from {OPTIONS_FILE}");
        RenderOptions::load(Path::new(OPTIONS_FILE))?
    } else {
        RenderOptions::default()
    };

    log::info!("loading environment {}", environment_path.display());
    let panorama = environment::load_environment(environment_path)?;
    let background = environment::equirectangular_to_cubemap(
        &panorama,
        options.ibl.prefilter_size,
    );

    log::info!("preparing IBL textures");
    let cancel = CancelToken::default();
    let Some(ibl) = IblTextures::compute_or_load(
        &background,
        &options.ibl.config(),
        &options.ibl.cache_dir,
        &cancel,
    )?
    else {
        // Only reachable through an external cancellation.
        return Ok(());
    };

    let models = sphere_grid()?;

    let width = options.output.width;
    let height = options.output.height;
    let mut rasterizer = Rasterizer::new(width, height);

    // Pull the camera back just far enough to frame the whole grid.
    let camera = Camera {
        aspect_ratio: width as f64 / height as f64,
        ..Default::default()
    };
    let bounds = softras::bounds::BoundingBox::of_models(&models);
    let distance = softras::bounds::fitting_distance(
        bounds.size().truncate() * 1.2,
        camera.aspect_ratio,
        camera.field_of_view,
    );
    let camera = Camera {
        position: bounds.center() + DVec3::new(0.0, 0.0, distance),
        ..camera
    };
    rasterizer.set_camera(&camera);
    rasterizer.set_normal_mode(options.normal_mode);
    rasterizer.set_light_direction(DVec3::from_array(
        options.lighting.direction,
    ));
    rasterizer.set_ibl(Some(Arc::new(ibl)));

    log::info!("rasterizing {width}x{height}");
    rasterizer.draw_models(&models);

    rasterizer
        .framebuffer()
        .color_image()
        .save(output_path)
        .map_err(|e| SoftrasError::Image(e.to_string()))?;
    log::info!("wrote {}", output_path.display());
    Ok(())
}

fn main() {
    env_logger::init();

    let mut args = std::env::args().skip(1);
    let Some(environment_path) = args.next() else {
        log::error!("usage: softras <environment.hdr|image> [output.png]");
        std::process::exit(1);
    };
    let output_path = args
        .next()
        .map_or_else(|| PathBuf::from("render.png"), PathBuf::from);

    if let Err(e) = render(Path::new(&environment_path), &output_path) {
        log::error!("render failed: {e}");
        std::process::exit(1);
    }
}
