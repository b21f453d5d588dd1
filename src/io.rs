use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

use glob::glob;
use serde::{Serialize, de::DeserializeOwned};

use crate::camera::Camera;
use crate::elevation::ElevationSource;
use crate::error::{Error, Result};
use crate::image::Image;
use crate::pipeline::ConsolidationReport;
use crate::tracks::Track;

pub const CAMERA_FILE: &str = "camera.json";
pub const IMAGES_DIR: &str = "images";
pub const ELEVATION_FILE: &str = "elevation.json";
pub const SURFACE_FILE: &str = "surface.json";

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: impl AsRef<Path>, object: &T) -> Result<()> {
    let path = output_path.as_ref();
    let j = serde_json::to_string_pretty(object).map_err(|e| Error::json(path, e))?;
    let mut file = std::fs::File::create(path).map_err(|e| Error::io(path, e))?;
    file.write_all(j.as_bytes()).map_err(|e| Error::io(path, e))
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T> {
    let path = file_path.as_ref();
    let contents = std::fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&contents).map_err(|e| Error::json(path, e))
}

/// Image files of a project, in sorted path order.
pub fn image_paths(project_dir: &Path) -> Result<Vec<PathBuf>> {
    let pattern = project_dir.join(IMAGES_DIR).join("*.json");
    let mut paths: Vec<PathBuf> = glob(&pattern.to_string_lossy())?
        .filter_map(|p| match p {
            Ok(p) => Some(p),
            Err(e) => {
                log::warn!("skipping unreadable path: {}", e);
                None
            }
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Everything read from a project directory.
pub struct Project {
    pub camera: Camera,
    pub images: Vec<Image>,
    pub elevation: Option<ElevationSource>,
    pub surface: HashMap<String, f64>,
}

/// Loads `camera.json`, `images/*.json` and the optional elevation and
/// prior surface files of a project directory.
pub fn load_project(project_dir: impl AsRef<Path>) -> Result<Project> {
    let dir = project_dir.as_ref();
    let camera: Camera = object_from_json(dir.join(CAMERA_FILE))?;

    let paths = image_paths(dir)?;
    if paths.is_empty() {
        return Err(Error::NoImages(dir.join(IMAGES_DIR)));
    }
    log::info!("Loading {} images from {}", paths.len(), dir.display());
    let images = paths
        .iter()
        .map(|p| object_from_json::<Image>(p))
        .collect::<Result<Vec<_>>>()?;

    let elevation_path = dir.join(ELEVATION_FILE);
    let elevation = if elevation_path.exists() {
        Some(object_from_json::<ElevationSource>(&elevation_path)?)
    } else {
        None
    };

    let surface_path = dir.join(SURFACE_FILE);
    let surface = if surface_path.exists() {
        object_from_json(&surface_path)?
    } else {
        HashMap::new()
    };

    Ok(Project {
        camera,
        images,
        elevation,
        surface,
    })
}

/// Writes a project directory readable by [`load_project`].
pub fn save_project(project_dir: impl AsRef<Path>, project: &Project) -> Result<()> {
    let dir = project_dir.as_ref();
    let images_dir = dir.join(IMAGES_DIR);
    std::fs::create_dir_all(&images_dir).map_err(|e| Error::io(&images_dir, e))?;
    object_to_json(dir.join(CAMERA_FILE), &project.camera)?;
    for image in &project.images {
        object_to_json(images_dir.join(format!("{}.json", image.name)), image)?;
    }
    if let Some(elevation) = &project.elevation {
        object_to_json(dir.join(ELEVATION_FILE), elevation)?;
    }
    if !project.surface.is_empty() {
        object_to_json(dir.join(SURFACE_FILE), &project.surface)?;
    }
    Ok(())
}

pub fn write_tracks(output_path: impl AsRef<Path>, tracks: &[Track]) -> Result<()> {
    object_to_json(output_path, &tracks)
}

pub fn read_tracks(path: impl AsRef<Path>) -> Result<Vec<Track>> {
    object_from_json(path)
}

/// Writes the consolidation report as JSON.
pub fn write_report(output_path: impl AsRef<Path>, report: &ConsolidationReport) -> Result<()> {
    object_to_json(output_path, report)
}
