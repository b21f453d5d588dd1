use std::collections::HashMap;

use glam::DVec2;
use match_tracks::Error;
use match_tracks::camera::{Camera, CameraPose};
use match_tracks::config::ConsolidationConfig;
use match_tracks::elevation::{
    ElevationModel, ElevationSource, FlatElevation, GridElevation, NoSurface,
};
use match_tracks::image::Image;
use match_tracks::synthetic::default_camera;
use match_tracks::tracks::{Observation, Track};
use match_tracks::triangulate::{
    compute_base_elevations, image_projections, intersect_ground, triangulate_smart,
    triangulate_tracks,
};
use nalgebra as na;

const NADIR: [f64; 3] = [0.0, -90.0, 0.0];
const LEVEL: [f64; 3] = [0.0, 0.0, 0.0];

fn image(name: &str, ned: [f64; 3], ypr: [f64; 3]) -> Image {
    Image::new(name, Vec::new(), CameraPose::new(ned, ypr))
}

fn center() -> DVec2 {
    DVec2::new(640.0, 480.0)
}

fn assert_position(actual: Option<[f64; 3]>, expected: [f64; 3]) {
    let actual = actual.expect("track should be triangulated");
    for (a, e) in actual.iter().zip(expected.iter()) {
        assert!((a - e).abs() < 1e-9, "{:?} != {:?}", actual, expected);
    }
}

fn solve(images: &mut [Image], tracks: &mut [Track], ground: f64) -> usize {
    let stats = triangulate_smart(
        images,
        tracks,
        &default_camera(),
        &FlatElevation(ground),
        &NoSurface,
        &ConsolidationConfig::default(),
    )
    .unwrap();
    stats.above_horizon
}

#[test]
fn test_two_nadir_views_meet_on_flat_ground() {
    let mut images = vec![
        image("a", [0.0, 0.0, -100.0], NADIR),
        image("b", [10.0, 0.0, -100.0], NADIR),
    ];
    let mut tracks = vec![Track::new(vec![
        Observation(0, center()),
        Observation(1, center()),
    ])];
    assert_eq!(solve(&mut images, &mut tracks, 20.0), 0);
    assert_position(tracks[0].position, [5.0, 0.0, -20.0]);
}

#[test]
fn test_altitude_does_not_move_nadir_point() {
    let mut images = vec![
        image("a", [0.0, 0.0, -100.0], NADIR),
        image("b", [0.0, 0.0, -150.0], NADIR),
    ];
    let mut tracks = vec![Track::new(vec![
        Observation(0, center()),
        Observation(1, center()),
    ])];
    solve(&mut images, &mut tracks, 20.0);
    assert_position(tracks[0].position, [0.0, 0.0, -20.0]);
}

#[test]
fn test_pixel_axes_map_to_east_and_south() {
    let mut images = vec![image("a", [0.0, 0.0, -100.0], NADIR)];
    let mut tracks = vec![
        Track::new(vec![Observation(0, center() + DVec2::new(100.0, 0.0))]),
        Track::new(vec![Observation(0, center() + DVec2::new(0.0, 100.0))]),
    ];
    solve(&mut images, &mut tracks, 20.0);
    // 80 m below the camera, 100 px off center at f = 1000
    assert_position(tracks[0].position, [0.0, 8.0, -20.0]);
    assert_position(tracks[1].position, [-8.0, 0.0, -20.0]);
}

#[test]
fn test_rays_above_horizon_leave_track_unplaced() {
    let mut images = vec![
        image("a", [0.0, 0.0, -100.0], LEVEL),
        image("b", [10.0, 0.0, -100.0], LEVEL),
    ];
    let mut tracks = vec![Track::new(vec![
        Observation(0, DVec2::new(640.0, 100.0)),
        Observation(1, DVec2::new(640.0, 100.0)),
    ])];
    let config = ConsolidationConfig::default();
    compute_base_elevations(&mut images, &FlatElevation(20.0), &NoSurface, &config);
    let projections = image_projections(&images, &default_camera(), &config).unwrap();
    let stats = triangulate_tracks(&mut tracks, &projections, &config);
    assert!(tracks[0].position.is_none());
    assert_eq!(stats.above_horizon, 2);
    assert_eq!(stats.triangulated, 0);
    assert_eq!(stats.untriangulated, 1);
}

#[test]
fn test_mixed_track_uses_valid_rays_only() {
    let mut images = vec![
        image("a", [0.0, 0.0, -100.0], NADIR),
        image("b", [10.0, 0.0, -100.0], LEVEL),
    ];
    let mut tracks = vec![Track::new(vec![
        Observation(0, center()),
        Observation(1, DVec2::new(640.0, 100.0)),
    ])];
    assert_eq!(solve(&mut images, &mut tracks, 20.0), 1);
    assert_position(tracks[0].position, [0.0, 0.0, -20.0]);
}

#[test]
fn test_intersect_ground() {
    let ned = na::Vector3::new(0.0, 0.0, -100.0);
    let down = na::Vector3::new(0.0, 0.0, 1.0);
    let hit = intersect_ground(&down, &ned, 20.0).unwrap();
    assert!((hit - na::Vector3::new(0.0, 0.0, -20.0)).norm() < 1e-12);
    assert!(intersect_ground(&na::Vector3::new(1.0, 0.0, 0.0), &ned, 20.0).is_none());
    assert!(intersect_ground(&na::Vector3::new(0.0, 0.0, -1.0), &ned, 20.0).is_none());
}

#[test]
fn test_base_elevation_is_floored_below_camera() {
    let mut images = vec![image("a", [0.0, 0.0, -100.0], NADIR)];
    let config = ConsolidationConfig::default();
    compute_base_elevations(&mut images, &FlatElevation(150.0), &NoSurface, &config);
    assert_eq!(images[0].base_elev, Some(99.0));

    let config = ConsolidationConfig {
        elevation_floor_margin: 5.0,
        ..Default::default()
    };
    compute_base_elevations(&mut images, &FlatElevation(150.0), &NoSurface, &config);
    assert_eq!(images[0].base_elev, Some(95.0));

    compute_base_elevations(&mut images, &FlatElevation(20.0), &NoSurface, &config);
    assert_eq!(images[0].base_elev, Some(20.0));
}

#[test]
fn test_surface_estimate_wins_and_is_floored() {
    let mut images = vec![
        image("a", [0.0, 0.0, -100.0], NADIR),
        image("b", [10.0, 0.0, -100.0], NADIR),
        image("c", [20.0, 0.0, -100.0], NADIR),
    ];
    let surface = HashMap::from([("a".to_string(), 30.0), ("c".to_string(), 150.0)]);
    let config = ConsolidationConfig::default();
    compute_base_elevations(&mut images, &FlatElevation(20.0), &surface, &config);
    assert_eq!(images[0].base_elev, Some(30.0));
    assert_eq!(images[1].base_elev, Some(20.0));
    assert_eq!(images[2].base_elev, Some(99.0));
}

#[test]
fn test_missing_base_elevation_defaults_to_floor() {
    let images = vec![image("a", [0.0, 0.0, -100.0], NADIR)];
    let projections =
        image_projections(&images, &default_camera(), &ConsolidationConfig::default()).unwrap();
    assert_eq!(projections[0].base_elev, 99.0);
}

#[test]
fn test_grid_interpolation() {
    let grid = GridElevation::new([0.0, 0.0], 10.0, 2, 2, vec![0.0, 10.0, 20.0, 30.0]).unwrap();
    assert!((grid.elevation_at(5.0, 5.0) - 15.0).abs() < 1e-12);
    assert!((grid.elevation_at(0.0, 10.0) - 10.0).abs() < 1e-12);
    assert!((grid.elevation_at(10.0, 0.0) - 20.0).abs() < 1e-12);
    // outside the grid the border value is used
    assert!((grid.elevation_at(-100.0, -100.0) - 0.0).abs() < 1e-12);
    assert!((grid.elevation_at(100.0, 100.0) - 30.0).abs() < 1e-12);
    assert!((grid.elevation_at(5.0, 100.0) - 20.0).abs() < 1e-12);
}

#[test]
fn test_single_sample_grid() {
    let grid = GridElevation::new([50.0, 50.0], 1.0, 1, 1, vec![7.0]).unwrap();
    assert_eq!(grid.elevation_at(0.0, 0.0), 7.0);
    assert_eq!(grid.elevation_at(50.0, 50.0), 7.0);
}

#[test]
fn test_invalid_grid_is_rejected() {
    let cases = [
        GridElevation::new([0.0, 0.0], 10.0, 2, 2, vec![0.0, 1.0, 2.0]),
        GridElevation::new([0.0, 0.0], 0.0, 1, 1, vec![0.0]),
        GridElevation::new([0.0, 0.0], 10.0, 0, 3, Vec::new()),
    ];
    for case in cases {
        assert!(matches!(case, Err(Error::InvalidGrid(_))));
    }
}

#[test]
fn test_elevation_source_from_json() {
    let flat: ElevationSource =
        serde_json::from_str(r#"{"type": "flat", "elevation_m": 12.5}"#).unwrap();
    assert_eq!(flat.elevation_at(3.0, 4.0), 12.5);

    let grid: ElevationSource = serde_json::from_str(
        r#"{"type": "grid", "origin_ne": [0.0, 0.0], "spacing": 10.0,
            "rows": 2, "cols": 2, "heights": [0.0, 10.0, 20.0, 30.0]}"#,
    )
    .unwrap();
    assert!((grid.elevation_at(5.0, 5.0) - 15.0).abs() < 1e-12);
}

#[test]
fn test_invalid_grid_json_is_rejected() {
    let cases = [
        r#"{"type": "grid", "origin_ne": [0.0, 0.0], "spacing": 10.0,
            "rows": 0, "cols": 0, "heights": []}"#,
        r#"{"type": "grid", "origin_ne": [0.0, 0.0], "spacing": 10.0,
            "rows": 2, "cols": 2, "heights": [1.0]}"#,
        r#"{"type": "grid", "origin_ne": [0.0, 0.0], "spacing": -1.0,
            "rows": 1, "cols": 1, "heights": [1.0]}"#,
    ];
    for case in cases {
        assert!(serde_json::from_str::<ElevationSource>(case).is_err(), "{}", case);
    }
}

#[test]
fn test_grid_json_round_trip() {
    let heights = vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
    let grid = GridElevation::new([1.0, 2.0], 5.0, 2, 3, heights).unwrap();
    let json = serde_json::to_string(&ElevationSource::Grid(grid.clone())).unwrap();
    let loaded: ElevationSource = serde_json::from_str(&json).unwrap();
    assert_eq!(loaded, ElevationSource::Grid(grid.clone()));
    assert_eq!(grid.shape(), (2, 3));
    assert_eq!(grid.origin_ne(), [1.0, 2.0]);
    assert_eq!(grid.spacing(), 5.0);
}

#[test]
fn test_singular_intrinsics() {
    let camera = Camera {
        fx: 0.0,
        ..default_camera()
    };
    let images = vec![image("a", [0.0, 0.0, -100.0], NADIR)];
    let result = image_projections(&images, &camera, &ConsolidationConfig::default());
    assert!(matches!(result, Err(Error::SingularIntrinsics)));
}

#[test]
fn test_project_point_matches_triangulation() {
    let camera = default_camera();
    let pose = CameraPose::new([3.0, -2.0, -100.0], NADIR);
    let point = na::Vector3::new(10.0, 5.0, -20.0);
    let uv = camera.project_point(&pose, &point).unwrap();

    let mut images = vec![Image::new("a", Vec::new(), pose)];
    let mut tracks = vec![Track::new(vec![Observation(0, uv)])];
    solve(&mut images, &mut tracks, 20.0);
    assert_position(tracks[0].position, [10.0, 5.0, -20.0]);

    // behind the camera
    assert!(camera.project_point(&pose, &na::Vector3::new(0.0, 0.0, -200.0)).is_none());
}

#[test]
fn test_sequential_matches_parallel() {
    let mut images = vec![
        image("a", [0.0, 0.0, -100.0], NADIR),
        image("b", [10.0, 0.0, -100.0], NADIR),
    ];
    let tracks: Vec<Track> = (0..50)
        .map(|k| {
            let uv = DVec2::new(100.0 + 10.0 * k as f64, 200.0 + 5.0 * k as f64);
            Track::new(vec![Observation(0, uv), Observation(1, uv)])
        })
        .collect();
    let parallel = ConsolidationConfig::default();
    let sequential = ConsolidationConfig {
        parallel: false,
        ..Default::default()
    };
    compute_base_elevations(&mut images, &FlatElevation(0.0), &NoSurface, &parallel);
    let projections = image_projections(&images, &default_camera(), &parallel).unwrap();

    let mut a = tracks.clone();
    let mut b = tracks;
    let stats_a = triangulate_tracks(&mut a, &projections, &parallel);
    let stats_b = triangulate_tracks(&mut b, &projections, &sequential);
    assert_eq!(a, b);
    assert_eq!(stats_a, stats_b);
    assert_eq!(stats_a.triangulated, 50);
}
