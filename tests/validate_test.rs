use glam::DVec2;
use match_tracks::camera::CameraPose;
use match_tracks::config::ConsolidationConfig;
use match_tracks::image::Image;
use match_tracks::tracks::ProtoTrack;
use match_tracks::types::ObservationKey;
use match_tracks::validate::{
    check_for_1vn_dups, check_for_pair_dups, check_track_integrity, dedup_pairs,
    one_to_many_conflicts,
};

fn image(name: &str, n: usize) -> Image {
    let kps = (0..n).map(|i| DVec2::new(i as f64 * 10.0, 5.0)).collect();
    Image::new(name, kps, CameraPose::new([0.0, 0.0, -50.0], [0.0, -90.0, 0.0]))
}

#[test]
fn test_dedup_pairs_keeps_first_occurrence_order() {
    let (unique, removed) = dedup_pairs(&[[0, 1], [2, 3], [0, 1], [4, 5], [2, 3]]);
    assert_eq!(unique, vec![[0, 1], [2, 3], [4, 5]]);
    assert_eq!(removed, 2);

    let (unique, removed) = dedup_pairs(&[]);
    assert!(unique.is_empty());
    assert_eq!(removed, 0);
}

#[test]
fn test_pair_dups_removed_from_match_lists() {
    let mut a = image("a", 6);
    a.add_matches("b", &[[0, 1], [0, 1], [2, 3]]);
    a.add_matches("ghost", &[[4, 4], [4, 4]]);
    let mut images = vec![a, image("b", 6)];

    assert_eq!(check_for_pair_dups(&mut images), 1);
    assert_eq!(images[0].matches_with("b").unwrap(), &[[0, 1], [2, 3]]);
    // pairs with unknown peers are not touched
    assert_eq!(images[0].matches_with("ghost").unwrap(), &[[4, 4], [4, 4]]);

    // no duplicates remain
    for m in &images[0].match_list {
        if m.peer == "b" {
            assert_eq!(dedup_pairs(&m.pairs).1, 0);
        }
    }
}

#[test]
fn test_one_to_many_detected_but_kept() {
    let mut a = image("a", 6);
    a.add_matches("b", &[[0, 1], [0, 2], [3, 4]]);
    let images = vec![a, image("b", 6)];
    let config = ConsolidationConfig::default();

    assert_eq!(check_for_1vn_dups(&images, &config), 1);
    assert_eq!(images[0].matches_with("b").unwrap(), &[[0, 1], [0, 2], [3, 4]]);
}

#[test]
fn test_repeated_pair_is_not_one_to_many() {
    let a = image("a", 4);
    let b = image("b", 4);
    let config = ConsolidationConfig::default();
    assert_eq!(one_to_many_conflicts(&a, &b, &[[0, 1], [0, 1]], &config), 0);
    assert_eq!(one_to_many_conflicts(&a, &b, &[[0, 1], [0, 2], [0, 3]], &config), 2);
}

#[test]
fn test_track_integrity() {
    let ok = ProtoTrack {
        observations: vec![ObservationKey::new(0, 1), ObservationKey::new(1, 1)],
    };
    let bad = ProtoTrack {
        observations: vec![
            ObservationKey::new(0, 1),
            ObservationKey::new(1, 1),
            ObservationKey::new(0, 2),
        ],
    };
    assert_eq!(check_track_integrity(&[ok.clone()]), 0);
    assert_eq!(check_track_integrity(&[ok, bad]), 1);
}
