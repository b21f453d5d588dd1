//! Grouping of two-view tracks into connected components.
//!
//! Each pass walks the working list once, merging every track into the
//! first track already placed this pass that shares one of its
//! observations. A merge can reveal new overlaps that only the next pass
//! over the shorter list sees, so passes repeat until one of them merges
//! nothing.
//!
//! A pass is linear in the number of observations. The number of passes
//! grows with the longest merge chain, which for a path shaped graph is on
//! the order of the number of images. Very long flights can therefore take
//! many passes; set a checkpoint path to make them resumable.

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use indicatif::ProgressIterator;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::io::{object_from_json, object_to_json};
use crate::tracks::{ProtoTrack, mean_observations};
use crate::types::ObservationKey;

/// Identifies the proto-track input a checkpoint was made from.
///
/// `digest` hashes every observation in input order, so two inputs with the
/// same shape but different keypoints never match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fingerprint {
    pub tracks: usize,
    pub observations: usize,
    pub digest: u64,
}

impl Fingerprint {
    pub fn of(tracks: &[ProtoTrack]) -> Fingerprint {
        let mut hasher = DefaultHasher::new();
        for track in tracks {
            track.observations.hash(&mut hasher);
        }
        Fingerprint {
            tracks: tracks.len(),
            observations: tracks.iter().map(ProtoTrack::len).sum(),
            digest: hasher.finish(),
        }
    }
}

/// Working state persisted between passes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkCheckpoint {
    pub input: Fingerprint,
    pub passes: usize,
    pub tracks: Vec<ProtoTrack>,
}

#[derive(Debug, Clone)]
pub struct LinkOutcome {
    pub tracks: Vec<ProtoTrack>,
    pub passes: usize,
}

/// Runs one merge pass over `tracks`.
///
/// When a track overlaps an already placed one, only its observations of
/// images the placed track does not cover yet are appended. The earlier
/// track always absorbs the later one.
pub fn link_pass(tracks: &[ProtoTrack]) -> Vec<ProtoTrack> {
    let capacity = tracks.iter().map(ProtoTrack::len).sum();
    let mut lookup: HashMap<ObservationKey, usize> = HashMap::with_capacity(capacity);
    let mut linked: Vec<ProtoTrack> = Vec::with_capacity(tracks.len());

    for track in tracks.iter().progress_count(tracks.len() as u64) {
        let found = track
            .observations
            .iter()
            .find_map(|o| lookup.get(o).copied());
        match found {
            None => {
                for o in &track.observations {
                    lookup.insert(*o, linked.len());
                }
                linked.push(track.clone());
            }
            Some(index) => {
                let existing = &mut linked[index];
                for o in &track.observations {
                    if !existing.has_image(o.image) {
                        existing.observations.push(*o);
                        lookup.insert(*o, index);
                    }
                }
            }
        }
    }
    linked
}

/// Links proto-tracks until a pass merges nothing.
///
/// With `checkpoint` set, the working list is saved after every pass that
/// still merged something and a matching checkpoint found on start is
/// resumed. The file is removed once linking converges.
pub fn link_matches(proto: Vec<ProtoTrack>, checkpoint: Option<&Path>) -> Result<LinkOutcome> {
    log::info!("Linking common matches together into chains:");
    let input = Fingerprint::of(&proto);
    let (mut current, mut passes) = match checkpoint {
        Some(path) if path.exists() => {
            let saved: LinkCheckpoint = object_from_json(path)?;
            if saved.input != input {
                return Err(Error::CheckpointMismatch {
                    path: path.to_path_buf(),
                    expected_tracks: input.tracks,
                    expected_observations: input.observations,
                    found_tracks: saved.input.tracks,
                    found_observations: saved.input.observations,
                    expected_digest: input.digest,
                    found_digest: saved.input.digest,
                });
            }
            log::info!(
                "Resuming from {} after {} passes ({} tracks)",
                path.display(),
                saved.passes,
                saved.tracks.len()
            );
            (saved.tracks, saved.passes)
        }
        _ => (proto, 0),
    };

    loop {
        log::info!("Iteration {} ({}):", passes, current.len());
        passes += 1;
        let linked = link_pass(&current);
        let converged = linked.len() == current.len();
        current = linked;
        if converged {
            break;
        }
        if let Some(path) = checkpoint {
            let saved = LinkCheckpoint {
                input,
                passes,
                tracks: current,
            };
            object_to_json(path, &saved)?;
            current = saved.tracks;
        }
    }

    if let Some(path) = checkpoint {
        if path.exists() {
            std::fs::remove_file(path).map_err(|e| Error::io(path, e))?;
        }
    }

    log::info!("Total unique features in image set: {}", current.len());
    log::info!(
        "Keypoint average instances: {:.2}",
        mean_observations(&current, ProtoTrack::len)
    );
    Ok(LinkOutcome {
        tracks: current,
        passes,
    })
}
