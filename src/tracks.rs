use glam::DVec2;
use indicatif::ProgressIterator;
use serde::{Deserialize, Serialize};

use crate::image::{Image, ImageIndex};
use crate::types::ObservationKey;

/// Value of the usage flag before any downstream stage claims a track.
pub const UNUSED: i32 = -1;

/// A track while it still references keypoints by index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtoTrack {
    pub observations: Vec<ObservationKey>,
}

impl ProtoTrack {
    pub fn pair(a: ObservationKey, b: ObservationKey) -> ProtoTrack {
        ProtoTrack {
            observations: vec![a, b],
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn has_image(&self, image: usize) -> bool {
        self.observations.iter().any(|o| o.image == image)
    }
}

/// One observation of a finalized track: the image and the uv seen there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Observation(pub usize, pub DVec2);

impl Observation {
    pub fn image(&self) -> usize {
        self.0
    }

    pub fn uv(&self) -> DVec2 {
        self.1
    }
}

/// A physical point seen in two or more images.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    /// Seed position in the local north-east-down frame.
    pub position: Option<[f64; 3]>,
    pub used: i32,
    pub observations: Vec<Observation>,
}

impl Track {
    pub fn new(observations: Vec<Observation>) -> Track {
        Track {
            position: None,
            used: UNUSED,
            observations,
        }
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

/// Mean number of observations per track, zero for an empty list.
pub fn mean_observations<T>(tracks: &[T], len: impl Fn(&T) -> usize) -> f64 {
    if tracks.is_empty() {
        return 0.0;
    }
    tracks.iter().map(len).sum::<usize>() as f64 / tracks.len() as f64
}

/// Creates one two-observation track per match pair.
///
/// Image `i` contributes its matches with peer `j` only when `j > i`, so a
/// correspondence stored on both sides is counted once.
pub fn make_match_structure(images: &[Image]) -> Vec<ProtoTrack> {
    log::info!("Constructing unified match structure:");
    let index = ImageIndex::new(images);
    let mut tracks = Vec::new();
    for (i, image) in images.iter().enumerate().progress_count(images.len() as u64) {
        for m in &image.match_list {
            let Some(j) = index.find(&m.peer) else {
                continue;
            };
            if j <= i {
                continue;
            }
            tracks.extend(m.pairs.iter().map(|&[idx_i, idx_j]| {
                ProtoTrack::pair(ObservationKey::new(i, idx_i), ObservationKey::new(j, idx_j))
            }));
        }
    }

    if !tracks.is_empty() {
        log::info!("Total feature pairs in image set: {}", tracks.len());
        log::info!(
            "Keypoint average instances = {:.1} (should be 2.0 here)",
            mean_observations(&tracks, ProtoTrack::len)
        );
    }
    tracks
}

/// Replaces keypoint indices with their uv coordinates.
///
/// Observations pointing at an unknown image or outside an image's keypoint
/// list are dropped with a warning.
pub fn materialize(linked: Vec<ProtoTrack>, images: &[Image]) -> Vec<Track> {
    log::info!("Replacing keypoint indices with uv coordinates:");
    let n = linked.len() as u64;
    linked
        .into_iter()
        .progress_count(n)
        .map(|track| {
            let observations = track
                .observations
                .iter()
                .filter_map(|o| {
                    let Some(image) = images.get(o.image) else {
                        log::warn!("observation {:?} has no image, dropped", o);
                        return None;
                    };
                    let uv = image.kp_list.get(o.keypoint);
                    if uv.is_none() {
                        log::warn!("observation {:?} has no keypoint, dropped", o);
                    }
                    uv.map(|uv| Observation(o.image, *uv))
                })
                .collect();
            Track::new(observations)
        })
        .collect()
}

/// Longest tracks first; equal lengths keep their order.
pub fn sort_longest_first(tracks: &mut [Track]) {
    log::info!("Sorting matches by longest chain first.");
    tracks.sort_by(|a, b| b.len().cmp(&a.len()));
}
