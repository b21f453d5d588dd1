use std::collections::{HashMap, HashSet};

use indicatif::ProgressIterator;

use crate::config::ConsolidationConfig;
use crate::image::{Image, ImageIndex};
use crate::tracks::ProtoTrack;
use crate::types::MatchPair;

/// Drops exact repeats of a pair, keeping first occurrences in order.
pub fn dedup_pairs(pairs: &[MatchPair]) -> (Vec<MatchPair>, usize) {
    let mut seen = HashSet::with_capacity(pairs.len());
    let unique: Vec<MatchPair> = pairs.iter().copied().filter(|p| seen.insert(*p)).collect();
    let removed = pairs.len() - unique.len();
    (unique, removed)
}

/// Removes repeated pairs from every match list.
///
/// Collapsing keypoints by uv may leave the same pair twice (matched at
/// different scales). Returns the number of pairs removed.
pub fn check_for_pair_dups(images: &mut [Image]) -> usize {
    log::info!("Checking for pair duplicates (there never should be any):");
    let index = ImageIndex::new(images);
    let mut total = 0;
    for image in images.iter_mut().progress() {
        for m in image.match_list.iter_mut() {
            if index.find(&m.peer).is_none() {
                continue;
            }
            let (unique, removed) = dedup_pairs(&m.pairs);
            if removed > 0 {
                log::warn!(
                    "Match: {} vs {} matches: {} dups: {}",
                    image.name,
                    m.peer,
                    m.pairs.len(),
                    removed
                );
            }
            m.pairs = unique;
            total += removed;
        }
    }
    total
}

/// Counts pairs whose first index was already matched to another keypoint
/// of the same peer.
///
/// Conflicting pairs are reported but kept.
pub fn one_to_many_conflicts(
    i1: &Image,
    i2: &Image,
    pairs: &[MatchPair],
    config: &ConsolidationConfig,
) -> usize {
    let mut first_match: HashMap<usize, usize> = HashMap::with_capacity(pairs.len());
    let mut count = 0;
    for &[idx1, idx2] in pairs {
        let Some(&prev) = first_match.get(&idx1) else {
            first_match.insert(idx1, idx2);
            continue;
        };
        if prev == idx2 {
            continue;
        }
        log::warn!(
            "{} vs {}: keypoint idx {} already used in another match",
            i1.name,
            i2.name,
            idx1
        );
        if let (Some(a), Some(b)) = (i2.kp_list.get(prev), i2.kp_list.get(idx2)) {
            if !config.uv_close(*a, *b) {
                log::warn!("  [{:.2}, {:.2}] -> [{:.2}, {:.2}]", a.x, a.y, b.x, b.y);
            }
        }
        count += 1;
    }
    count
}

/// Looks for keypoints matched to several keypoints of one peer.
pub fn check_for_1vn_dups(images: &[Image], config: &ConsolidationConfig) -> usize {
    log::info!("Testing for 1 vs. n keypoint duplicates (there never should be any):");
    let index = ImageIndex::new(images);
    let mut total = 0;
    for i1 in images.iter().progress() {
        for m in &i1.match_list {
            let Some(j) = index.find(&m.peer) else {
                continue;
            };
            let count = one_to_many_conflicts(i1, &images[j], &m.pairs, config);
            if count > 0 {
                log::warn!(
                    "Match: {} vs {} matches: {} dups: {}",
                    i1.name,
                    m.peer,
                    m.pairs.len(),
                    count
                );
            }
            total += count;
        }
    }
    total
}

/// Reports tracks holding more than one observation of the same image.
pub fn check_track_integrity(tracks: &[ProtoTrack]) -> usize {
    let mut violations = 0;
    for (t, track) in tracks.iter().enumerate() {
        let mut images = HashSet::with_capacity(track.observations.len());
        for obs in &track.observations {
            if !images.insert(obs.image) {
                log::warn!(
                    "track {} observes image {} more than once ({} observations)",
                    t,
                    obs.image,
                    track.observations.len()
                );
                violations += 1;
            }
        }
    }
    violations
}
