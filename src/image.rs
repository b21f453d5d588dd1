use std::collections::HashMap;

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::camera::CameraPose;
use crate::types::{MatchPair, UvKey};

/// Matches from one image to a named peer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeerMatches {
    pub peer: String,
    pub pairs: Vec<MatchPair>,
}

/// One camera capture with its detected keypoints and pairwise matches.
///
/// `kp_used` and `kp_remap` are derived state, rebuilt by the consolidation
/// stages and never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    /// uv coordinate of every detected keypoint.
    pub kp_list: Vec<DVec2>,
    /// Matches in the order they were produced upstream.
    #[serde(default)]
    pub match_list: Vec<PeerMatches>,
    pub pose: CameraPose,
    #[serde(skip)]
    pub kp_used: Vec<bool>,
    #[serde(skip)]
    pub kp_remap: HashMap<UvKey, usize>,
    #[serde(skip)]
    pub base_elev: Option<f64>,
}

impl Image {
    pub fn new(name: &str, kp_list: Vec<DVec2>, pose: CameraPose) -> Image {
        Image {
            name: name.to_string(),
            kp_list,
            match_list: Vec::new(),
            pose,
            kp_used: Vec::new(),
            kp_remap: HashMap::new(),
            base_elev: None,
        }
    }

    pub fn matches_with(&self, peer: &str) -> Option<&[MatchPair]> {
        self.match_list
            .iter()
            .find(|m| m.peer == peer)
            .map(|m| m.pairs.as_slice())
    }

    /// Appends to the match list of `peer`, creating it on first use.
    pub fn add_matches(&mut self, peer: &str, pairs: &[MatchPair]) {
        match self.match_list.iter_mut().find(|m| m.peer == peer) {
            Some(m) => m.pairs.extend_from_slice(pairs),
            None => self.match_list.push(PeerMatches {
                peer: peer.to_string(),
                pairs: pairs.to_vec(),
            }),
        }
    }

    pub fn num_matches(&self) -> usize {
        self.match_list.iter().map(|m| m.pairs.len()).sum()
    }
}

/// Name to position lookup over an ordered image collection.
#[derive(Debug, Clone, Default)]
pub struct ImageIndex {
    by_name: HashMap<String, usize>,
}

impl ImageIndex {
    pub fn new(images: &[Image]) -> ImageIndex {
        let mut by_name = HashMap::with_capacity(images.len());
        for (i, image) in images.iter().enumerate() {
            if by_name.insert(image.name.clone(), i).is_some() {
                log::warn!("duplicate image name {}, keeping the last one", image.name);
            }
        }
        ImageIndex { by_name }
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.by_name.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

/// Marks every keypoint referenced by a match with a known peer as used.
///
/// Matches with peers outside the collection are ignored.
pub fn compute_kp_usage(images: &mut [Image]) {
    let index = ImageIndex::new(images);
    for image in images.iter_mut() {
        image.kp_used = vec![false; image.kp_list.len()];
    }
    for i in 0..images.len() {
        for m in 0..images[i].match_list.len() {
            let Some(j) = index.find(&images[i].match_list[m].peer) else {
                continue;
            };
            for k in 0..images[i].match_list[m].pairs.len() {
                let [idx1, idx2] = images[i].match_list[m].pairs[k];
                mark_used(&mut images[i], idx1);
                mark_used(&mut images[j], idx2);
            }
        }
    }
}

fn mark_used(image: &mut Image, idx: usize) {
    match image.kp_used.get_mut(idx) {
        Some(used) => *used = true,
        None => log::warn!(
            "{}: match references keypoint {} but only {} exist",
            image.name,
            idx,
            image.kp_list.len()
        ),
    }
}
