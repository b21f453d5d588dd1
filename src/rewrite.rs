use indicatif::{ParallelProgressIterator, ProgressIterator};
use rayon::prelude::*;

use crate::config::ConsolidationConfig;
use crate::image::{Image, ImageIndex};
use crate::types::{MatchPair, UvKey};

/// Counts produced while rewriting matches to canonical keypoints.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RewriteStats {
    /// Pairs with at least one index changed.
    pub rewritten: usize,
    /// Remaps that moved a keypoint to a noticeably different uv.
    pub mismatches: usize,
    /// Pairs left alone because an index or key could not be resolved.
    pub unresolved: usize,
}

impl std::ops::AddAssign for RewriteStats {
    fn add_assign(&mut self, other: RewriteStats) {
        self.rewritten += other.rewritten;
        self.mismatches += other.mismatches;
        self.unresolved += other.unresolved;
    }
}

/// Looks up the canonical index of keypoint `idx` through `kp_remap`.
fn canonical_index(image: &Image, idx: usize, scale: f64) -> Option<usize> {
    let uv = image.kp_list.get(idx)?;
    image.kp_remap.get(&UvKey::new(*uv, scale)).copied()
}

/// Sanity check that a remap did not move the keypoint.
fn check_remap(
    image: &Image,
    side: usize,
    idx: usize,
    new_idx: usize,
    config: &ConsolidationConfig,
) -> bool {
    let uv = image.kp_list[idx];
    let new_uv = image.kp_list[new_idx];
    if config.uv_close(uv, new_uv) {
        return true;
    }
    log::warn!(
        "{}: remap moved keypoint, index {}: {} -> {}  [{:.2}, {:.2}] -> [{:.2}, {:.2}]",
        image.name,
        side,
        idx,
        new_idx,
        uv.x,
        uv.y,
        new_uv.x,
        new_uv.y
    );
    false
}

/// Rewrites the pairs between `i1` and `i2` to canonical keypoint indices.
pub fn rewrite_pairs(
    i1: &Image,
    i2: &Image,
    pairs: &[MatchPair],
    config: &ConsolidationConfig,
) -> (Vec<MatchPair>, RewriteStats) {
    let scale = config.uv_scale();
    let mut stats = RewriteStats::default();
    let rewritten = pairs
        .iter()
        .map(|&[idx1, idx2]| {
            let (Some(new_idx1), Some(new_idx2)) = (
                canonical_index(i1, idx1, scale),
                canonical_index(i2, idx2, scale),
            ) else {
                log::warn!(
                    "{} vs {}: cannot resolve canonical keypoints for pair [{}, {}]",
                    i1.name,
                    i2.name,
                    idx1,
                    idx2
                );
                stats.unresolved += 1;
                return [idx1, idx2];
            };
            if idx1 != new_idx1 || idx2 != new_idx2 {
                stats.rewritten += 1;
            }
            if idx1 != new_idx1 && !check_remap(i1, 1, idx1, new_idx1, config) {
                stats.mismatches += 1;
            }
            if idx2 != new_idx2 && !check_remap(i2, 2, idx2, new_idx2, config) {
                stats.mismatches += 1;
            }
            [new_idx1, new_idx2]
        })
        .collect();
    (rewritten, stats)
}

/// Rewrites every match list so pairs reference canonical keypoints.
///
/// Requires `kp_remap` to be current (see
/// [`crate::dedup::index_unique_keypoints`]). Pairs with peers outside the
/// collection are left untouched.
pub fn merge_duplicates(images: &mut [Image], config: &ConsolidationConfig) -> RewriteStats {
    log::info!("Merging keypoints with duplicate uv coordinates:");
    let index = ImageIndex::new(images);
    let n = images.len() as u64;

    let rewrite_image = |i1: &Image| -> (Vec<Option<Vec<MatchPair>>>, RewriteStats) {
        let mut stats = RewriteStats::default();
        let lists = i1
            .match_list
            .iter()
            .map(|m| {
                let i2 = &images[index.find(&m.peer)?];
                let (pairs, s) = rewrite_pairs(i1, i2, &m.pairs, config);
                if s.rewritten > 0 {
                    log::debug!(
                        "Match: {} vs {} {}/{} rewrites",
                        i1.name,
                        i2.name,
                        s.rewritten,
                        m.pairs.len()
                    );
                }
                stats += s;
                Some(pairs)
            })
            .collect();
        (lists, stats)
    };

    let rewritten: Vec<_> = if config.parallel {
        images
            .par_iter()
            .progress_count(n)
            .map(rewrite_image)
            .collect()
    } else {
        images.iter().progress_count(n).map(rewrite_image).collect()
    };

    let mut total = RewriteStats::default();
    for (image, (lists, stats)) in images.iter_mut().zip(rewritten) {
        for (m, pairs) in image.match_list.iter_mut().zip(lists) {
            if let Some(pairs) = pairs {
                m.pairs = pairs;
            }
        }
        total += stats;
    }
    log::info!(
        "pairs rewritten: {}, remap mismatches: {}, unresolved: {}",
        total.rewritten,
        total.mismatches,
        total.unresolved
    );
    total
}
