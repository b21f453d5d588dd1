//! Deterministic synthetic projects: a strip of nadir images over flat
//! ground with known point positions.

use std::collections::HashMap;

use nalgebra as na;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::camera::{Camera, CameraPose};
use crate::elevation::ElevationSource;
use crate::image::Image;
use crate::io::Project;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub num_images: usize,
    pub num_points: usize,
    /// Distance between consecutive cameras along north.
    pub spacing_m: f64,
    pub altitude_m: f64,
    pub ground_m: f64,
    /// Chance that a keypoint is detected a second time at the same uv.
    pub duplicate_ratio: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            num_images: 6,
            num_points: 200,
            spacing_m: 20.0,
            altitude_m: 100.0,
            ground_m: 10.0,
            duplicate_ratio: 0.1,
            seed: 0,
        }
    }
}

pub fn default_camera() -> Camera {
    Camera {
        fx: 1000.0,
        fy: 1000.0,
        cu: 640.0,
        cv: 480.0,
        width: 1280,
        height: 960,
        mount_ypr_deg: [0.0, 0.0, 0.0],
    }
}

/// A generated project together with the ground truth point positions.
pub struct SyntheticProject {
    pub project: Project,
    pub points: Vec<[f64; 3]>,
}

/// Builds the project described by `config`.
///
/// Every image matches every later image that sees a common point, storing
/// the pairs on the earlier image only.
pub fn generate(config: &SyntheticConfig) -> SyntheticProject {
    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let camera = default_camera();
    let altitude = config.altitude_m;
    let half_width = 0.5 * (altitude - config.ground_m) * camera.cu / camera.fx;
    let strip_len = config.spacing_m * config.num_images.saturating_sub(1) as f64;

    let points: Vec<[f64; 3]> = (0..config.num_points)
        .map(|_| {
            [
                rng.random_range(-half_width..strip_len + half_width),
                rng.random_range(-half_width..half_width),
                -config.ground_m,
            ]
        })
        .collect();

    // point id -> keypoint indices, per image
    let mut seen: Vec<HashMap<usize, Vec<usize>>> = Vec::with_capacity(config.num_images);
    let mut images: Vec<Image> = (0..config.num_images)
        .map(|i| {
            let pose = CameraPose::new(
                [config.spacing_m * i as f64, 0.0, -altitude],
                [0.0, -90.0, 0.0],
            );
            let mut kp_list = Vec::new();
            let mut ids = HashMap::new();
            for (id, p) in points.iter().enumerate() {
                let Some(uv) = camera.project_point(&pose, &na::Vector3::from(*p)) else {
                    continue;
                };
                let mut kps = vec![kp_list.len()];
                kp_list.push(uv);
                if rng.random_bool(config.duplicate_ratio) {
                    kps.push(kp_list.len());
                    kp_list.push(uv);
                }
                ids.insert(id, kps);
            }
            seen.push(ids);
            Image::new(&format!("img{:04}", i), kp_list, pose)
        })
        .collect();

    for i in 0..images.len() {
        for j in (i + 1)..images.len() {
            let mut common: Vec<usize> = seen[i]
                .keys()
                .filter(|id| seen[j].contains_key(id))
                .copied()
                .collect();
            common.sort_unstable();
            let pairs: Vec<[usize; 2]> = common
                .iter()
                .map(|id| {
                    let a = &seen[i][id];
                    let b = &seen[j][id];
                    [a[rng.random_range(0..a.len())], b[rng.random_range(0..b.len())]]
                })
                .collect();
            if !pairs.is_empty() {
                let peer = images[j].name.clone();
                images[i].add_matches(&peer, &pairs);
            }
        }
    }

    SyntheticProject {
        project: Project {
            camera,
            images,
            elevation: Some(ElevationSource::Flat {
                elevation_m: config.ground_m,
            }),
            surface: HashMap::new(),
        },
        points,
    }
}
