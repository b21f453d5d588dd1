use crate::image::Image;
use crate::types::MatchPair;

/// Optional viewer for match lists, handed to the pipeline by the caller.
pub trait MatchInspector {
    fn show_matches(&self, i1: &Image, i2: &Image, pairs: &[MatchPair]);
}

/// Calls `inspector` once for every image pair stored in `i < j` order.
pub fn show_all(inspector: &dyn MatchInspector, images: &[Image]) {
    let index = crate::image::ImageIndex::new(images);
    for (i, i1) in images.iter().enumerate() {
        for m in &i1.match_list {
            match index.find(&m.peer) {
                Some(j) if j > i && !m.pairs.is_empty() => {
                    log::debug!("Showing {} vs {}", i1.name, images[j].name);
                    inspector.show_matches(i1, &images[j], &m.pairs);
                }
                _ => {}
            }
        }
    }
}
