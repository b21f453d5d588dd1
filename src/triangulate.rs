use indicatif::{ParallelProgressIterator, ProgressIterator};
use nalgebra as na;
use rayon::prelude::*;

use crate::camera::{Camera, pixel_to_ned_matrix, project_vector};
use crate::config::ConsolidationConfig;
use crate::elevation::{ElevationModel, SurfaceElevation};
use crate::error::Result;
use crate::image::Image;
use crate::tracks::Track;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TriangulationStats {
    pub triangulated: usize,
    pub untriangulated: usize,
    pub above_horizon: usize,
}

/// Everything needed to turn a uv of one image into a ground point.
#[derive(Debug, Clone)]
pub struct ImageProjection {
    pub ned: na::Vector3<f64>,
    pub pixel_to_ned: na::Matrix3<f64>,
    pub base_elev: f64,
}

/// Picks the assumed ground height under every camera.
///
/// A prior surface estimate wins over the elevation model, which is sampled
/// at the camera's north/east. Either way the result is kept at least
/// `elevation_floor_margin` below the camera.
pub fn compute_base_elevations(
    images: &mut [Image],
    elevation: &dyn ElevationModel,
    surface: &dyn SurfaceElevation,
    config: &ConsolidationConfig,
) {
    log::info!("Looking up base elevation for each image location...");
    for image in images.iter_mut() {
        let ned = image.pose.ned;
        let mut base = surface
            .surface_elevation(&image.name)
            .unwrap_or_else(|| elevation.elevation_at(ned[0], ned[1]));
        let ceiling = image.pose.altitude() - config.elevation_floor_margin;
        if ceiling < base {
            base = ceiling;
        }
        log::trace!(
            "{}: base elevation {:.2} altitude {:.2}",
            image.name,
            base,
            image.pose.altitude()
        );
        image.base_elev = Some(base);
    }
}

/// Precomputes the per image projection state.
///
/// Images without a base elevation fall back to the floor under the camera.
pub fn image_projections(
    images: &[Image],
    camera: &Camera,
    config: &ConsolidationConfig,
) -> Result<Vec<ImageProjection>> {
    let inverse_k = camera.inverse_k()?;
    let cam2body = camera.cam2body();
    Ok(images
        .iter()
        .map(|image| ImageProjection {
            ned: image.pose.position(),
            pixel_to_ned: pixel_to_ned_matrix(&inverse_k, &cam2body, &image.pose.body2ned()),
            base_elev: image
                .base_elev
                .unwrap_or(image.pose.altitude() - config.elevation_floor_margin),
        })
        .collect())
}

/// Intersects `ray` from `ned` with the horizontal plane at `base_elev`.
///
/// Returns `None` for rays that do not point down.
pub fn intersect_ground(
    ray: &na::Vector3<f64>,
    ned: &na::Vector3<f64>,
    base_elev: f64,
) -> Option<na::Vector3<f64>> {
    if ray.z <= 0.0 {
        return None;
    }
    let d_proj = -(ned.z + base_elev);
    let factor = d_proj / ray.z;
    Some(ned + na::Vector3::new(ray.x * factor, ray.y * factor, d_proj))
}

/// Mean of the ground intersections of every observation of `track`.
///
/// Returns the position (if any ray hit the ground) and the number of rays
/// pointing above the horizon.
pub fn triangulate_track(
    track: &Track,
    projections: &[ImageProjection],
) -> (Option<[f64; 3]>, usize) {
    let mut sum = na::Vector3::zeros();
    let mut valid = 0;
    let mut above_horizon = 0;
    for obs in &track.observations {
        let Some(p) = projections.get(obs.image()) else {
            log::warn!("observation references unknown image {}", obs.image());
            continue;
        };
        let ray = project_vector(&p.pixel_to_ned, obs.uv());
        match intersect_ground(&ray, &p.ned, p.base_elev) {
            Some(point) => {
                sum += point;
                valid += 1;
            }
            None => {
                log::warn!(
                    "vector projected above horizon (image {}, uv [{:.2}, {:.2}])",
                    obs.image(),
                    obs.uv().x,
                    obs.uv().y
                );
                above_horizon += 1;
            }
        }
    }
    if valid == 0 {
        return (None, above_horizon);
    }
    let mean = sum / valid as f64;
    (Some([mean.x, mean.y, mean.z]), above_horizon)
}

/// Sets the seed position of every track.
pub fn triangulate_tracks(
    tracks: &mut [Track],
    projections: &[ImageProjection],
    config: &ConsolidationConfig,
) -> TriangulationStats {
    log::info!("Estimating initial projection for each feature...");
    let n = tracks.len() as u64;
    let solve = |track: &mut Track| {
        let (position, above_horizon) = triangulate_track(track, projections);
        track.position = position;
        above_horizon
    };
    let above_horizon: usize = if config.parallel {
        tracks.par_iter_mut().progress_count(n).map(solve).sum()
    } else {
        tracks.iter_mut().progress_count(n).map(solve).sum()
    };

    let triangulated = tracks.iter().filter(|t| t.position.is_some()).count();
    let stats = TriangulationStats {
        triangulated,
        untriangulated: tracks.len() - triangulated,
        above_horizon,
    };
    if stats.untriangulated > 0 {
        log::warn!(
            "{} tracks have no valid ground intersection",
            stats.untriangulated
        );
    }
    stats
}

/// Base elevation lookup followed by per track triangulation.
pub fn triangulate_smart(
    images: &mut [Image],
    tracks: &mut [Track],
    camera: &Camera,
    elevation: &dyn ElevationModel,
    surface: &dyn SurfaceElevation,
    config: &ConsolidationConfig,
) -> Result<TriangulationStats> {
    compute_base_elevations(images, elevation, surface, config);
    let projections = image_projections(images, camera, config)?;
    Ok(triangulate_tracks(tracks, &projections, config))
}
