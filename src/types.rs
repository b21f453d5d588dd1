use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Fixed point identity of a uv coordinate.
///
/// Two keypoints of one image with the same key are the same detection as
/// far as consolidation is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UvKey(pub i64, pub i64);

impl UvKey {
    pub fn new(uv: DVec2, scale: f64) -> UvKey {
        UvKey((uv.x * scale).round() as i64, (uv.y * scale).round() as i64)
    }
}

/// `(own_keypoint_index, peer_keypoint_index)`.
pub type MatchPair = [usize; 2];

/// `(image_index, keypoint_index)`, the node of the track graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObservationKey {
    pub image: usize,
    pub keypoint: usize,
}

impl ObservationKey {
    pub fn new(image: usize, keypoint: usize) -> ObservationKey {
        ObservationKey { image, keypoint }
    }
}
