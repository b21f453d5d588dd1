use std::collections::HashMap;

use indicatif::{ParallelProgressIterator, ProgressIterator};
use rayon::prelude::*;

use crate::config::ConsolidationConfig;
use crate::image::Image;
use crate::types::UvKey;

/// Counts produced while indexing keypoints by uv coordinate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DedupStats {
    pub used: usize,
    pub unique: usize,
}

/// Maps each uv key to the first used keypoint carrying it.
///
/// Feature detectors may report the same location several times (e.g. at
/// different scales). Under forward iteration the lowest index wins.
pub fn build_kp_remap(
    kp_list: &[glam::DVec2],
    kp_used: &[bool],
    uv_scale: f64,
) -> (HashMap<UvKey, usize>, usize) {
    let mut remap = HashMap::new();
    let mut used = 0;
    for (i, uv) in kp_list.iter().enumerate() {
        if !kp_used.get(i).copied().unwrap_or(false) {
            continue;
        }
        used += 1;
        remap.entry(UvKey::new(*uv, uv_scale)).or_insert(i);
    }
    (remap, used)
}

/// Rebuilds `kp_remap` of every image from its current `kp_used` flags.
pub fn index_unique_keypoints(images: &mut [Image], config: &ConsolidationConfig) -> DedupStats {
    log::info!("Indexing features by unique uv coordinates:");
    let scale = config.uv_scale();
    let n = images.len() as u64;
    let per_image: Vec<usize> = if config.parallel {
        images
            .par_iter_mut()
            .progress_count(n)
            .map(|image| remap_image(image, scale))
            .collect()
    } else {
        images
            .iter_mut()
            .progress_count(n)
            .map(|image| remap_image(image, scale))
            .collect()
    };

    let stats = DedupStats {
        used: per_image.iter().sum(),
        unique: images.iter().map(|i| i.kp_remap.len()).sum(),
    };
    log::info!(
        "features used: {}, unique by uv and used: {}",
        stats.used,
        stats.unique
    );
    stats
}

fn remap_image(image: &mut Image, scale: f64) -> usize {
    let (remap, used) = build_kp_remap(&image.kp_list, &image.kp_used, scale);
    log::trace!("{}: {} used, {} unique", image.name, used, remap.len());
    image.kp_remap = remap;
    used
}
