use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;

use crate::config::ConsolidationConfig;
use crate::dedup::index_unique_keypoints;
use crate::elevation::{ElevationModel, FlatElevation};
use crate::error::Result;
use crate::image::{Image, compute_kp_usage};
use crate::inspect::{MatchInspector, show_all};
use crate::io::Project;
use crate::linker::link_matches;
use crate::rewrite::merge_duplicates;
use crate::tracks::{
    ProtoTrack, Track, make_match_structure, materialize, mean_observations, sort_longest_first,
};
use crate::triangulate::triangulate_smart;
use crate::validate::{check_for_1vn_dups, check_for_pair_dups, check_track_integrity};

/// Summary of one consolidation run, meant for a human reviewing the logs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConsolidationReport {
    pub timestamp: String,
    pub images: usize,
    pub used_keypoints: usize,
    pub unique_keypoints: usize,
    pub rewritten_pairs: usize,
    pub remap_mismatches: usize,
    pub unresolved_pairs: usize,
    pub duplicate_pairs_removed: usize,
    pub one_to_many_conflicts: usize,
    pub proto_tracks: usize,
    pub proto_mean_observations: f64,
    pub link_passes: usize,
    pub tracks: usize,
    pub mean_observations: f64,
    pub integrity_violations: usize,
    pub triangulated: usize,
    pub untriangulated: usize,
    pub above_horizon_rays: usize,
}

impl ConsolidationReport {
    /// Number of anomalies a reviewer should look at.
    pub fn anomalies(&self) -> usize {
        self.remap_mismatches
            + self.unresolved_pairs
            + self.duplicate_pairs_removed
            + self.one_to_many_conflicts
            + self.integrity_violations
            + self.above_horizon_rays
    }
}

fn now() -> String {
    OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&Rfc3339)
        .unwrap_or_default()
}

/// Collapses duplicate keypoints, validates the match lists and links them
/// into tracks sorted longest first.
///
/// Images are updated in place (`kp_used`, `kp_remap`, match lists). The
/// returned tracks have no position yet.
pub fn consolidate(
    images: &mut [Image],
    config: &ConsolidationConfig,
    inspector: Option<&dyn MatchInspector>,
) -> Result<(Vec<Track>, ConsolidationReport)> {
    let mut report = ConsolidationReport {
        timestamp: now(),
        images: images.len(),
        ..Default::default()
    };
    log::info!(
        "Consolidating {} images with {} stored match pairs",
        images.len(),
        images.iter().map(Image::num_matches).sum::<usize>()
    );

    compute_kp_usage(images);
    let dedup = index_unique_keypoints(images, config);
    report.used_keypoints = dedup.used;
    report.unique_keypoints = dedup.unique;

    let rewrite = merge_duplicates(images, config);
    report.rewritten_pairs = rewrite.rewritten;
    report.remap_mismatches = rewrite.mismatches;
    report.unresolved_pairs = rewrite.unresolved;
    if let Some(inspector) = inspector {
        show_all(inspector, images);
    }

    report.duplicate_pairs_removed = check_for_pair_dups(images);
    if let Some(inspector) = inspector {
        show_all(inspector, images);
    }
    report.one_to_many_conflicts = check_for_1vn_dups(images, config);

    let proto = make_match_structure(images);
    report.proto_tracks = proto.len();
    report.proto_mean_observations = mean_observations(&proto, ProtoTrack::len);

    let linked = link_matches(proto, config.checkpoint_path.as_deref())?;
    report.link_passes = linked.passes;
    report.integrity_violations = check_track_integrity(&linked.tracks);

    let mut tracks = materialize(linked.tracks, images);
    sort_longest_first(&mut tracks);
    report.tracks = tracks.len();
    report.mean_observations = mean_observations(&tracks, Track::len);
    Ok((tracks, report))
}

/// Full run over a loaded project: consolidation, then seed positions.
///
/// Without an elevation model the ground is assumed at the NED origin.
pub fn run(
    project: &mut Project,
    config: &ConsolidationConfig,
    inspector: Option<&dyn MatchInspector>,
) -> Result<(Vec<Track>, ConsolidationReport)> {
    let (mut tracks, mut report) = consolidate(&mut project.images, config, inspector)?;

    let flat = FlatElevation(0.0);
    let elevation: &dyn ElevationModel = match &project.elevation {
        Some(source) => source,
        None => {
            log::warn!("no elevation model, assuming ground at elevation 0");
            &flat
        }
    };
    let stats = triangulate_smart(
        &mut project.images,
        &mut tracks,
        &project.camera,
        elevation,
        &project.surface,
        config,
    )?;
    report.triangulated = stats.triangulated;
    report.untriangulated = stats.untriangulated;
    report.above_horizon_rays = stats.above_horizon;

    log::info!(
        "{} tracks, {} triangulated, {} anomalies",
        report.tracks,
        report.triangulated,
        report.anomalies()
    );
    Ok((tracks, report))
}
